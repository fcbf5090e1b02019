//! Variant identity and native build matrix resolution for mobile apps.
//!
//! `varmatrix-sdk` decides, before any native compiler runs, which identity
//! (display name, application id, icon, URL scheme) and which native build
//! target each variant of an application maps to, and flags every
//! configuration that would install the wrong binary or let one variant
//! overwrite another on device.
//!
//! # Quick Start
//!
//! ```
//! use varmatrix_sdk::{Declaration, EnvironmentSnapshot};
//!
//! let declaration = Declaration::from_toml_str(r#"
//! [identity]
//! display_name = "MyApp"
//! android_package = "com.example.myapp"
//! ios_bundle_identifier = "com.example.myapp"
//! icon = "./assets/icon.png"
//! scheme = "myapp"
//!
//! [[identity.overrides]]
//! when = { equals = { var = "APP_VARIANT", value = "development" } }
//! android_package = "com.example.myapp.dev"
//! ios_bundle_identifier = "com.example.myapp.dev"
//!
//! [profiles.development]
//! env = { APP_VARIANT = "development" }
//! android = { flavor = "development", build_type = "debug" }
//! ios = { scheme = "myapp-dev", build_configuration = "Debug" }
//!
//! [profiles.production]
//! android = { flavor = "production", build_type = "release" }
//! ios = { scheme = "myapp", build_configuration = "Release" }
//!
//! [android]
//! allow = [
//!     { flavor = "development", build_type = "debug" },
//!     { flavor = "production", build_type = "release" },
//! ]
//! "#)?;
//!
//! let registry = declaration.into_registry(&EnvironmentSnapshot::new())?;
//! let report = registry.audit()?;
//! assert!(report.is_clean());
//! # Ok::<(), varmatrix_sdk::VariantError>(())
//! ```
//!
//! # Architecture
//!
//! - **Identity**: resolves a variant's identity from a base spec, ordered
//!   override rules and an explicit environment snapshot
//! - **Registry**: holds build profiles and matrix rules; sealed before use
//! - **Matrix**: validates the Android flavor/build-type allow-list and the
//!   iOS scheme bijection
//! - **Drift**: audits every profile and aggregates all findings into a report
//! - **Declaration**: the serde format profiles are declared in
//!
//! Nothing in this crate reads the process environment, touches the file
//! system or spawns processes.

pub mod declaration;
pub mod drift;
pub mod identity;
pub mod matrix;
pub mod registry;
pub mod types;

pub use declaration::{Declaration, Format, ProfileDeclaration};
pub use drift::{Report, audit_all, audit_profile};
pub use identity::{
    EnvironmentSnapshot, IdentityPatch, IdentitySpec, OverrideRule, Predicate, ResolvedIdentity,
    VariantKey, resolve,
};
pub use registry::{
    AndroidDirective, BuildProfile, FlavorTypeRule, IosDirective, ProfileRegistry, RegistryState,
    SchemeBinding,
};
pub use types::{Platform, VariantError, Violation};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
