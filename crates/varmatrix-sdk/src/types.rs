//! Core types for varmatrix-sdk.
//!
//! This module defines the fundamental types used throughout the SDK:
//!
//! - [`Platform`] - Native platform selection (Android or iOS)
//! - [`Violation`] - A configuration defect that can appear in a [`crate::Report`]
//! - [`VariantError`] - Error type for registry, resolution, and loading operations
//!
//! Every variant of [`Violation`] is a static configuration defect. None of them
//! are transient, and none of them are ever downgraded to warnings.

use serde::{Deserialize, Serialize};

/// Native platform a variant is built for.
///
/// # Example
///
/// ```
/// use varmatrix_sdk::Platform;
///
/// assert_eq!(Platform::Android.as_str(), "android");
/// assert_eq!(Platform::Ios.as_str(), "ios");
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Platform {
    /// Android (flavor x build-type matrix, Gradle).
    Android,
    /// iOS (scheme/target pairing, Xcode).
    Ios,
}

impl Platform {
    /// Both platforms, in a fixed order.
    pub const ALL: [Platform; 2] = [Platform::Android, Platform::Ios];

    /// Returns the string representation of the platform.
    pub fn as_str(&self) -> &'static str {
        match self {
            Platform::Android => "android",
            Platform::Ios => "ios",
        }
    }

    /// Name of the platform-scoped application identifier field.
    pub fn application_id_field(&self) -> &'static str {
        match self {
            Platform::Android => "android_package",
            Platform::Ios => "ios_bundle_identifier",
        }
    }
}

impl std::fmt::Display for Platform {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A configuration defect detected before any native tool runs.
///
/// Violations are plain data: they serialize losslessly into a report and
/// sort into a stable order so that aggregation does not depend on the order
/// in which profiles were checked.
#[derive(
    Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, thiserror::Error,
)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Violation {
    /// A required identity field is still unset after all patches were merged.
    #[error(
        "incomplete identity for profile '{profile}' on {platform}: field '{field}' is not set. \
         Set it on the base identity or in an override that matches this profile"
    )]
    IncompleteIdentity {
        profile: String,
        platform: Platform,
        field: String,
    },

    /// Two matching override rules set the same field to different values.
    #[error(
        "conflicting overrides for profile '{profile}' on {platform}: field '{field}' is set to \
         '{first_value}' by rule '{first_rule}' and to '{second_value}' by rule '{second_rule}'"
    )]
    ConflictingOverride {
        profile: String,
        platform: Platform,
        field: String,
        first_rule: String,
        first_value: String,
        second_rule: String,
        second_value: String,
    },

    /// Two resolved variants share an application identifier on one platform.
    #[error(
        "identity collision on {platform}: profiles '{first}' and '{second}' both resolve to \
         '{application_id}' and would overwrite each other on device"
    )]
    IdentityCollision {
        platform: Platform,
        application_id: String,
        first: String,
        second: String,
    },

    /// An Android directive selects a (flavor, buildType) pair outside the allow-list.
    #[error(
        "profile '{profile}' selects android variant ({flavor}, {build_type}) which is not in \
         the flavor/build-type allow-list. Allowed: {allowed:?}"
    )]
    FlavorTypeMismatch {
        profile: String,
        flavor: String,
        build_type: String,
        allowed: Vec<String>,
    },

    /// A Gradle command builds a different variant than the directive declares.
    #[error(
        "profile '{profile}' runs '{command}' which builds variant '{actual}', \
         but its directive declares '{expected}'"
    )]
    GradleCommandMismatch {
        profile: String,
        command: String,
        expected: String,
        actual: String,
    },

    /// One scheme is bound to more than one profile.
    #[error("scheme '{scheme}' is bound to more than one profile: {profiles:?}")]
    DuplicateScheme {
        scheme: String,
        profiles: Vec<String>,
    },

    /// A profile declares an iOS directive but no scheme is bound to it.
    #[error(
        "profile '{profile}' declares an ios directive but has no bound scheme. \
         Set ios.scheme on the profile or add an explicit binding"
    )]
    MissingScheme { profile: String },

    /// A profile is bound to more than one distinct scheme.
    #[error("profile '{profile}' is bound to more than one scheme: {schemes:?}")]
    AmbiguousScheme {
        profile: String,
        schemes: Vec<String>,
    },

    /// An iOS directive names a build configuration outside the declared list.
    #[error(
        "profile '{profile}' uses build configuration '{configuration}'. Allowed: {allowed:?}"
    )]
    UnknownBuildConfiguration {
        profile: String,
        configuration: String,
        allowed: Vec<String>,
    },

    /// A binding or reference names a profile that is not registered.
    #[error("{context} references unknown profile '{profile}'")]
    UnknownProfile { profile: String, context: String },
}

impl Violation {
    /// Profiles this finding names, in the order they appear in the message.
    pub fn profiles(&self) -> Vec<&str> {
        match self {
            Violation::IncompleteIdentity { profile, .. }
            | Violation::ConflictingOverride { profile, .. }
            | Violation::FlavorTypeMismatch { profile, .. }
            | Violation::GradleCommandMismatch { profile, .. }
            | Violation::MissingScheme { profile }
            | Violation::AmbiguousScheme { profile, .. }
            | Violation::UnknownBuildConfiguration { profile, .. }
            | Violation::UnknownProfile { profile, .. } => vec![profile.as_str()],
            Violation::IdentityCollision { first, second, .. } => {
                vec![first.as_str(), second.as_str()]
            }
            Violation::DuplicateScheme { profiles, .. } => {
                profiles.iter().map(String::as_str).collect()
            }
        }
    }

    /// Stable snake_case name of the violation kind.
    pub fn kind(&self) -> &'static str {
        match self {
            Violation::IncompleteIdentity { .. } => "incomplete_identity",
            Violation::ConflictingOverride { .. } => "conflicting_override",
            Violation::IdentityCollision { .. } => "identity_collision",
            Violation::FlavorTypeMismatch { .. } => "flavor_type_mismatch",
            Violation::GradleCommandMismatch { .. } => "gradle_command_mismatch",
            Violation::DuplicateScheme { .. } => "duplicate_scheme",
            Violation::MissingScheme { .. } => "missing_scheme",
            Violation::AmbiguousScheme { .. } => "ambiguous_scheme",
            Violation::UnknownBuildConfiguration { .. } => "unknown_build_configuration",
            Violation::UnknownProfile { .. } => "unknown_profile",
        }
    }
}

/// Error types for varmatrix-sdk operations.
///
/// # Example
///
/// ```
/// use varmatrix_sdk::{IdentitySpec, ProfileRegistry, VariantError};
///
/// let registry = ProfileRegistry::new(IdentitySpec::default());
/// match registry.audit() {
///     Err(VariantError::RegistryNotSealed) => {}
///     other => panic!("unexpected: {:?}", other),
/// }
/// ```
#[derive(Debug, thiserror::Error)]
pub enum VariantError {
    /// A profile with this name is already registered.
    #[error("duplicate profile '{0}': profile names must be unique within a registry")]
    DuplicateProfile(String),

    /// The requested profile is not registered.
    #[error("unknown profile '{name}'. Available profiles: {available:?}")]
    UnknownProfile { name: String, available: Vec<String> },

    /// The registry was mutated after `seal()`.
    #[error("registry is sealed; profiles, rules and bindings can no longer be added")]
    RegistrySealed,

    /// A resolution or validation operation ran before `seal()`.
    #[error("registry is not sealed; call seal() before resolving or validating")]
    RegistryNotSealed,

    /// Profile inheritance forms a cycle.
    #[error("profile inheritance cycle: {}", .0.join(" -> "))]
    InheritanceCycle(Vec<String>),

    /// A configuration defect raised by a single resolution or validation call.
    #[error(transparent)]
    Violation(#[from] Violation),

    /// The declaration could not be interpreted.
    #[error("configuration error: {0}. Check varmatrix.toml")]
    Config(String),

    /// An I/O error occurred while reading a declaration.
    #[error("I/O error: {0}. Check file paths and permissions")]
    Io(#[from] std::io::Error),
}
