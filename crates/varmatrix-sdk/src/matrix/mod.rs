//! Native build matrix validation.
//!
//! This module checks that each profile's native directive selects exactly one
//! legal native target, on both native build models:
//!
//! | Module | Platform | Model | Checks |
//! |--------|----------|-------|--------|
//! | [`android`] | Android | flavor x build-type matrix | allow-list membership, Gradle task drift |
//! | [`ios`] | iOS | scheme/target pairing | scheme bijection, build configuration list |
//!
//! All checks are pure and run before any native tool is invoked. A negative
//! result is always fatal: a mismatched Android variant or a shared iOS scheme
//! installs the wrong binary or overwrites a sibling variant on device.
//!
//! ## Example
//!
//! ```
//! use std::collections::BTreeSet;
//! use varmatrix_sdk::matrix::validate_android;
//! use varmatrix_sdk::{AndroidDirective, FlavorTypeRule};
//!
//! let rules: BTreeSet<_> = [FlavorTypeRule::new("production", "release")].into();
//! let directive = AndroidDirective {
//!     flavor: "development".into(),
//!     build_type: "release".into(),
//!     native_command: None,
//! };
//! assert!(validate_android("development", &directive, &rules).is_err());
//! ```

pub mod android;
pub mod ios;

pub use android::{check_native_command, gradle_variant_name, validate_android};
pub use ios::{validate_build_configuration, validate_ios};
