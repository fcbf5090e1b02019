//! Build profile registry
//!
//! The [`ProfileRegistry`] owns every declared [`BuildProfile`], the Android
//! [`FlavorTypeRule`] allow-list, the iOS build configuration list and the
//! explicit [`SchemeBinding`]s for one resolution session.
//!
//! ## Lifecycle
//!
//! ```text
//! Unsealed --seal()--> Sealed
//! ```
//!
//! Declarations are only accepted while unsealed. Resolution and validation
//! are only accepted once sealed, so a partially declared configuration can
//! never be audited. A sealed registry has no interior mutability and can be
//! shared across threads by reference.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use crate::drift::{self, Report};
use crate::identity::{self, EnvironmentSnapshot, IdentitySpec, ResolvedIdentity, VariantKey};
use crate::types::{Platform, VariantError};

/// Gradle side of a profile: which flavor and build type it builds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AndroidDirective {
    pub flavor: String,
    pub build_type: String,
    /// Gradle invocation used to build, e.g. `:app:assembleDevelopmentDebug`.
    #[serde(default, alias = "gradle_command", skip_serializing_if = "Option::is_none")]
    pub native_command: Option<String>,
}

/// Xcode side of a profile.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct IosDirective {
    /// Scheme to build. When set, it binds the profile to this scheme.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scheme: Option<String>,
    pub build_configuration: String,
    /// Native target built by the scheme. Defaults to the scheme name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target: Option<String>,
}

/// A named build profile.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct BuildProfile {
    pub name: String,
    /// Parent profile whose bindings and directives this profile inherits.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extends: Option<String>,
    /// Environment bindings layered over the session snapshot for this profile.
    #[serde(default, alias = "env", skip_serializing_if = "BTreeMap::is_empty")]
    pub environment_overrides: BTreeMap<String, String>,
    #[serde(default, alias = "android_directive", skip_serializing_if = "Option::is_none")]
    pub android: Option<AndroidDirective>,
    #[serde(default, alias = "ios_directive", skip_serializing_if = "Option::is_none")]
    pub ios: Option<IosDirective>,
}

impl BuildProfile {
    /// Creates a profile with no bindings and no directives.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            extends: None,
            environment_overrides: BTreeMap::new(),
            android: None,
            ios: None,
        }
    }

    pub fn extends(mut self, parent: impl Into<String>) -> Self {
        self.extends = Some(parent.into());
        self
    }

    pub fn env(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.environment_overrides.insert(name.into(), value.into());
        self
    }

    pub fn android(mut self, flavor: impl Into<String>, build_type: impl Into<String>) -> Self {
        self.android = Some(AndroidDirective {
            flavor: flavor.into(),
            build_type: build_type.into(),
            native_command: None,
        });
        self
    }

    pub fn ios(mut self, scheme: impl Into<String>, build_configuration: impl Into<String>) -> Self {
        self.ios = Some(IosDirective {
            scheme: Some(scheme.into()),
            build_configuration: build_configuration.into(),
            target: None,
        });
        self
    }

    /// Platforms this profile targets.
    ///
    /// Every platform with a directive; both platforms when none is declared.
    pub fn platforms(&self) -> Vec<Platform> {
        let mut platforms = Vec::with_capacity(2);
        if self.android.is_some() {
            platforms.push(Platform::Android);
        }
        if self.ios.is_some() {
            platforms.push(Platform::Ios);
        }
        if platforms.is_empty() {
            platforms.extend(Platform::ALL);
        }
        platforms
    }
}

/// One legal (flavor, buildType) pair.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FlavorTypeRule {
    pub flavor: String,
    pub build_type: String,
}

impl FlavorTypeRule {
    pub fn new(flavor: impl Into<String>, build_type: impl Into<String>) -> Self {
        Self {
            flavor: flavor.into(),
            build_type: build_type.into(),
        }
    }
}

impl std::fmt::Display for FlavorTypeRule {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({}, {})", self.flavor, self.build_type)
    }
}

/// Association of a profile with an Xcode scheme and target.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SchemeBinding {
    pub profile: String,
    pub scheme: String,
    pub target: String,
}

/// Registry lifecycle state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RegistryState {
    Unsealed,
    Sealed,
}

/// Holds the declared build profiles and native matrix rules of one session.
#[derive(Debug, Clone)]
pub struct ProfileRegistry {
    state: RegistryState,
    identity: IdentitySpec,
    environment: EnvironmentSnapshot,
    declared: BTreeMap<String, BuildProfile>,
    effective: BTreeMap<String, BuildProfile>,
    flavor_rules: BTreeSet<FlavorTypeRule>,
    build_configurations: BTreeSet<String>,
    explicit_bindings: BTreeSet<SchemeBinding>,
}

impl ProfileRegistry {
    /// Creates an unsealed registry for the given identity spec.
    pub fn new(identity: IdentitySpec) -> Self {
        Self {
            state: RegistryState::Unsealed,
            identity,
            environment: EnvironmentSnapshot::new(),
            declared: BTreeMap::new(),
            effective: BTreeMap::new(),
            flavor_rules: BTreeSet::new(),
            build_configurations: BTreeSet::new(),
            explicit_bindings: BTreeSet::new(),
        }
    }

    fn ensure_unsealed(&self) -> Result<(), VariantError> {
        match self.state {
            RegistryState::Unsealed => Ok(()),
            RegistryState::Sealed => Err(VariantError::RegistrySealed),
        }
    }

    fn ensure_sealed(&self) -> Result<(), VariantError> {
        match self.state {
            RegistryState::Sealed => Ok(()),
            RegistryState::Unsealed => Err(VariantError::RegistryNotSealed),
        }
    }

    fn unknown(&self, name: &str) -> VariantError {
        VariantError::UnknownProfile {
            name: name.to_string(),
            available: self.declared.keys().cloned().collect(),
        }
    }

    /// Sets the session environment snapshot every profile resolves against.
    pub fn set_environment(&mut self, environment: EnvironmentSnapshot) -> Result<(), VariantError> {
        self.ensure_unsealed()?;
        self.environment = environment;
        Ok(())
    }

    /// Inserts a profile.
    ///
    /// # Errors
    ///
    /// - [`VariantError::RegistrySealed`] after `seal()`
    /// - [`VariantError::DuplicateProfile`] if the name is taken
    pub fn register(&mut self, profile: BuildProfile) -> Result<(), VariantError> {
        self.ensure_unsealed()?;
        if self.declared.contains_key(&profile.name) {
            return Err(VariantError::DuplicateProfile(profile.name));
        }
        self.declared.insert(profile.name.clone(), profile);
        Ok(())
    }

    /// Adds a legal (flavor, buildType) pair to the Android allow-list.
    pub fn allow(&mut self, rule: FlavorTypeRule) -> Result<(), VariantError> {
        self.ensure_unsealed()?;
        self.flavor_rules.insert(rule);
        Ok(())
    }

    /// Adds an Xcode build configuration to the allowed list.
    pub fn allow_build_configuration(
        &mut self,
        configuration: impl Into<String>,
    ) -> Result<(), VariantError> {
        self.ensure_unsealed()?;
        self.build_configurations.insert(configuration.into());
        Ok(())
    }

    /// Declares an explicit scheme binding.
    pub fn bind_scheme(&mut self, binding: SchemeBinding) -> Result<(), VariantError> {
        self.ensure_unsealed()?;
        self.explicit_bindings.insert(binding);
        Ok(())
    }

    /// Flattens profile inheritance and freezes the registry.
    ///
    /// On error the registry stays unsealed.
    ///
    /// # Errors
    ///
    /// - [`VariantError::RegistrySealed`] if already sealed
    /// - [`VariantError::UnknownProfile`] if a profile extends an unregistered parent
    /// - [`VariantError::InheritanceCycle`] if `extends` chains loop
    pub fn seal(&mut self) -> Result<(), VariantError> {
        self.ensure_unsealed()?;
        let mut effective = BTreeMap::new();
        for name in self.declared.keys() {
            effective.insert(name.clone(), self.flatten(name)?);
        }
        self.effective = effective;
        self.state = RegistryState::Sealed;
        Ok(())
    }

    fn flatten(&self, name: &str) -> Result<BuildProfile, VariantError> {
        let mut chain = vec![name.to_string()];
        let mut current = &self.declared[name];
        while let Some(parent) = &current.extends {
            if chain.contains(parent) {
                chain.push(parent.clone());
                return Err(VariantError::InheritanceCycle(chain));
            }
            current = self.declared.get(parent).ok_or_else(|| self.unknown(parent))?;
            chain.push(parent.clone());
        }

        // root ancestor first, so nearer profiles win
        let mut flat = BuildProfile::new(name);
        flat.extends = self.declared[name].extends.clone();
        for link in chain.iter().rev() {
            let declared = &self.declared[link];
            flat.environment_overrides
                .extend(declared.environment_overrides.clone());
            if declared.android.is_some() {
                flat.android = declared.android.clone();
            }
            if declared.ios.is_some() {
                flat.ios = declared.ios.clone();
            }
        }
        Ok(flat)
    }

    pub fn state(&self) -> RegistryState {
        self.state
    }

    pub fn is_sealed(&self) -> bool {
        self.state == RegistryState::Sealed
    }

    /// Returns the profile as declared.
    pub fn get(&self, name: &str) -> Result<&BuildProfile, VariantError> {
        self.declared.get(name).ok_or_else(|| self.unknown(name))
    }

    /// Registered profile names, sorted.
    pub fn profile_names(&self) -> Vec<&str> {
        self.declared.keys().map(String::as_str).collect()
    }

    pub fn len(&self) -> usize {
        self.declared.len()
    }

    pub fn is_empty(&self) -> bool {
        self.declared.is_empty()
    }

    pub fn identity(&self) -> &IdentitySpec {
        &self.identity
    }

    pub fn environment(&self) -> &EnvironmentSnapshot {
        &self.environment
    }

    pub fn flavor_rules(&self) -> &BTreeSet<FlavorTypeRule> {
        &self.flavor_rules
    }

    pub fn build_configurations(&self) -> &BTreeSet<String> {
        &self.build_configurations
    }

    /// Returns the profile with inheritance applied.
    pub fn effective(&self, name: &str) -> Result<&BuildProfile, VariantError> {
        self.ensure_sealed()?;
        self.effective.get(name).ok_or_else(|| self.unknown(name))
    }

    /// All profiles with inheritance applied, sorted by name.
    pub fn effective_profiles(&self) -> Result<impl Iterator<Item = &BuildProfile>, VariantError> {
        self.ensure_sealed()?;
        Ok(self.effective.values())
    }

    /// Session snapshot with the profile's own bindings layered on top.
    pub fn environment_for(&self, name: &str) -> Result<EnvironmentSnapshot, VariantError> {
        let profile = self.effective(name)?;
        Ok(self.environment.overlay(&profile.environment_overrides))
    }

    /// Resolves the identity of one profile on one platform.
    pub fn resolve(
        &self,
        name: &str,
        platform: Platform,
    ) -> Result<ResolvedIdentity, VariantError> {
        let env = self.environment_for(name)?;
        let key = VariantKey::new(name, platform);
        Ok(identity::resolve(&key, &env, &self.identity)?)
    }

    /// Scheme bindings: implicit ones from iOS directives plus explicit ones.
    pub fn scheme_bindings(&self) -> Result<Vec<SchemeBinding>, VariantError> {
        self.ensure_sealed()?;
        let mut bindings: BTreeSet<SchemeBinding> = self.explicit_bindings.clone();
        for profile in self.effective.values() {
            if let Some(IosDirective {
                scheme: Some(scheme),
                target,
                ..
            }) = &profile.ios
            {
                bindings.insert(SchemeBinding {
                    profile: profile.name.clone(),
                    scheme: scheme.clone(),
                    target: target.clone().unwrap_or_else(|| scheme.clone()),
                });
            }
        }
        Ok(bindings.into_iter().collect())
    }

    /// Runs the full drift audit over this registry.
    pub fn audit(&self) -> Result<Report, VariantError> {
        drift::audit_all(self)
    }
}
