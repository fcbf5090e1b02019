//! Declaration format
//!
//! A [`Declaration`] is the already-loaded, user-authored description of an
//! application's variants. It is usually written as `varmatrix.toml`:
//!
//! ```toml
//! [identity]
//! display_name = "MyApp"
//! android_package = "com.example.myapp"
//! ios_bundle_identifier = "com.example.myapp"
//! icon = "./assets/icon.png"
//! scheme = "myapp"
//!
//! [[identity.overrides]]
//! name = "development"
//! when = { equals = { var = "APP_VARIANT", value = "development" } }
//! display_name = "MyApp (Dev)"
//! android_package = "com.example.myapp.dev"
//! ios_bundle_identifier = "com.example.myapp.dev"
//!
//! [environment]
//! API_URL = "https://api.example.com"
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
//!
//! [ios]
//! configurations = ["Debug", "Release"]
//! ```
//!
//! YAML with the same shape is accepted as well.

use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::identity::{EnvironmentSnapshot, IdentitySpec};
use crate::registry::{
    AndroidDirective, BuildProfile, FlavorTypeRule, IosDirective, ProfileRegistry, SchemeBinding,
};
use crate::types::VariantError;

/// Serialization format of a declaration file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Format {
    Toml,
    Yaml,
}

impl Format {
    /// Picks the format from a file extension. Anything but `yaml`/`yml` is TOML.
    pub fn from_extension(ext: Option<&str>) -> Self {
        match ext.map(str::to_ascii_lowercase).as_deref() {
            Some("yaml") | Some("yml") => Format::Yaml,
            _ => Format::Toml,
        }
    }
}

/// One profile entry, keyed by name in [`Declaration::profiles`].
///
/// `android_directive` and `ios_directive` are accepted as long names for
/// `android` and `ios`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ProfileDeclaration {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub extends: Option<String>,
    #[serde(alias = "env", skip_serializing_if = "BTreeMap::is_empty")]
    pub environment_overrides: BTreeMap<String, String>,
    #[serde(alias = "android_directive", skip_serializing_if = "Option::is_none")]
    pub android: Option<AndroidDirective>,
    #[serde(alias = "ios_directive", skip_serializing_if = "Option::is_none")]
    pub ios: Option<IosDirective>,
}

impl ProfileDeclaration {
    fn into_profile(self, name: String) -> BuildProfile {
        BuildProfile {
            name,
            extends: self.extends,
            environment_overrides: self.environment_overrides,
            android: self.android,
            ios: self.ios,
        }
    }
}

/// Android matrix rules.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AndroidMatrix {
    /// Legal (flavor, buildType) pairs.
    pub allow: Vec<FlavorTypeRule>,
}

/// iOS matrix rules.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct IosMatrix {
    /// Allowed Xcode build configurations. Empty accepts any.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub configurations: Vec<String>,
    /// Explicit scheme bindings, in addition to those implied by profiles.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub bindings: Vec<SchemeBinding>,
}

/// Complete declaration of an application's variants.
///
/// Unknown keys anywhere in the file are rejected, so a misspelled directive
/// cannot drop a profile out of the matrix checks.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Declaration {
    pub identity: IdentitySpec,
    /// Session-wide environment bindings, below any caller-supplied snapshot.
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub environment: BTreeMap<String, String>,
    pub profiles: BTreeMap<String, ProfileDeclaration>,
    pub android: AndroidMatrix,
    pub ios: IosMatrix,
}

impl Declaration {
    /// Parses a declaration from a string in the given format.
    pub fn parse(contents: &str, format: Format) -> Result<Self, VariantError> {
        match format {
            Format::Toml => Self::from_toml_str(contents),
            Format::Yaml => Self::from_yaml_str(contents),
        }
    }

    /// Reads a declaration file, picking the format from its extension.
    pub fn from_path(path: &Path) -> Result<Self, VariantError> {
        let contents = std::fs::read_to_string(path)?;
        let format = Format::from_extension(path.extension().and_then(|e| e.to_str()));
        Self::parse(&contents, format)
    }

    pub fn from_toml_str(contents: &str) -> Result<Self, VariantError> {
        toml::from_str(contents).map_err(|e| VariantError::Config(e.to_string()))
    }

    pub fn from_yaml_str(contents: &str) -> Result<Self, VariantError> {
        serde_yaml::from_str(contents).map_err(|e| VariantError::Config(e.to_string()))
    }

    /// Builds and seals a registry.
    ///
    /// The session snapshot is this declaration's `environment` table with
    /// `env` layered on top.
    pub fn into_registry(self, env: &EnvironmentSnapshot) -> Result<ProfileRegistry, VariantError> {
        let session = EnvironmentSnapshot::from_pairs(self.environment).layered(env);

        let mut registry = ProfileRegistry::new(self.identity);
        registry.set_environment(session)?;
        for (name, profile) in self.profiles {
            registry.register(profile.into_profile(name))?;
        }
        for rule in self.android.allow {
            registry.allow(rule)?;
        }
        for configuration in self.ios.configurations {
            registry.allow_build_configuration(configuration)?;
        }
        for binding in self.ios.bindings {
            registry.bind_scheme(binding)?;
        }
        registry.seal()?;
        Ok(registry)
    }
}
