//! Variant identity resolution.
//!
//! An [`IdentitySpec`] is a base [`IdentityPatch`] plus an ordered list of
//! [`OverrideRule`]s. Each rule pairs a [`Predicate`] over an
//! [`EnvironmentSnapshot`] with a partial patch.
//!
//! ## Merge policy
//!
//! Every matching rule applies, in declaration order, field by field onto the
//! base. When two matching rules set the same field to different values the
//! resolution fails with [`Violation::ConflictingOverride`] instead of letting
//! the later rule win. Two rules agreeing on a value is not a conflict. The
//! resolved identity is therefore independent of rule order.
//!
//! Only the fields that matter for the requested platform take part: a rule
//! that sets only the iOS bundle identifier cannot conflict with anything on
//! Android.
//!
//! ## Example
//!
//! ```
//! use varmatrix_sdk::identity::{
//!     resolve, EnvironmentSnapshot, IdentityPatch, IdentitySpec, OverrideRule, Predicate,
//!     VariantKey,
//! };
//! use varmatrix_sdk::Platform;
//!
//! let spec = IdentitySpec {
//!     base: IdentityPatch {
//!         display_name: Some("Acme".into()),
//!         android_package: Some("com.acme.app".into()),
//!         ios_bundle_identifier: Some("com.acme.app".into()),
//!         icon: Some("./assets/icon.png".into()),
//!         scheme: Some("acme".into()),
//!         dev_client_scheme: None,
//!     },
//!     overrides: vec![OverrideRule {
//!         name: Some("dev".into()),
//!         when: Predicate::equals("APP_VARIANT", "development"),
//!         patch: IdentityPatch {
//!             display_name: Some("Acme (Dev)".into()),
//!             android_package: Some("com.acme.app.dev".into()),
//!             ..IdentityPatch::default()
//!         },
//!     }],
//! };
//!
//! let env = EnvironmentSnapshot::from_pairs([("APP_VARIANT", "development")]);
//! let key = VariantKey::new("development", Platform::Android);
//! let identity = resolve(&key, &env, &spec).unwrap();
//! assert_eq!(identity.application_id, "com.acme.app.dev");
//! assert_eq!(identity.display_name, "Acme (Dev)");
//! ```

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::types::{Platform, Violation};

/// Immutable mapping from environment variable name to value.
///
/// This is the only external signal resolution sees. It is never read from
/// the process environment by the SDK.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EnvironmentSnapshot(BTreeMap<String, String>);

impl EnvironmentSnapshot {
    /// Creates an empty snapshot.
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a snapshot from key/value pairs. Later duplicates win.
    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Self(
            pairs
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }

    /// Returns the value bound to `name`, if any.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.0.get(name).map(String::as_str)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.0.contains_key(name)
    }

    /// Returns a new snapshot with `bindings` layered on top of this one.
    pub fn overlay(&self, bindings: &BTreeMap<String, String>) -> Self {
        let mut merged = self.0.clone();
        merged.extend(bindings.iter().map(|(k, v)| (k.clone(), v.clone())));
        Self(merged)
    }

    /// Returns a new snapshot with every binding of `other` layered on top.
    pub fn layered(&self, other: &EnvironmentSnapshot) -> Self {
        self.overlay(&other.0)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for EnvironmentSnapshot {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self::from_pairs(iter)
    }
}

/// Condition over an [`EnvironmentSnapshot`] that selects an override rule.
///
/// In TOML, predicates are written as inline tables:
///
/// ```toml
/// when = { equals = { var = "APP_VARIANT", value = "development" } }
/// when = { present = "CI" }
/// when = { any = [{ equals = { var = "APP_VARIANT", value = "preview" } }, { present = "PREVIEW" }] }
/// when = "always"
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Predicate {
    /// Matches every snapshot.
    Always,
    /// Variable is set and equal to `value`.
    Equals { var: String, value: String },
    /// Variable is unset or differs from `value`.
    NotEquals { var: String, value: String },
    /// Variable is set to one of `values`.
    OneOf { var: String, values: Vec<String> },
    /// Variable is set, to any value.
    Present(String),
    /// Variable is not set.
    Absent(String),
    /// Every inner predicate matches. An empty list matches.
    All(Vec<Predicate>),
    /// At least one inner predicate matches. An empty list does not match.
    Any(Vec<Predicate>),
    /// Inner predicate does not match.
    Not(Box<Predicate>),
}

impl Predicate {
    /// Shorthand for [`Predicate::Equals`].
    pub fn equals(var: impl Into<String>, value: impl Into<String>) -> Self {
        Predicate::Equals {
            var: var.into(),
            value: value.into(),
        }
    }

    /// Evaluates the predicate against `env`.
    pub fn matches(&self, env: &EnvironmentSnapshot) -> bool {
        match self {
            Predicate::Always => true,
            Predicate::Equals { var, value } => env.get(var) == Some(value.as_str()),
            Predicate::NotEquals { var, value } => env.get(var) != Some(value.as_str()),
            Predicate::OneOf { var, values } => env
                .get(var)
                .is_some_and(|actual| values.iter().any(|v| v == actual)),
            Predicate::Present(var) => env.contains(var),
            Predicate::Absent(var) => !env.contains(var),
            Predicate::All(inner) => inner.iter().all(|p| p.matches(env)),
            Predicate::Any(inner) => inner.iter().any(|p| p.matches(env)),
            Predicate::Not(inner) => !inner.matches(env),
        }
    }
}

/// Partial identity. Used both for the base identity and for rule patches.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct IdentityPatch {
    /// User-visible application name.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
    /// Android application id (package name).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub android_package: Option<String>,
    /// iOS bundle identifier.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ios_bundle_identifier: Option<String>,
    /// Reference to the icon set used for this variant.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub icon: Option<String>,
    /// URL scheme the application registers.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scheme: Option<String>,
    /// Whether the development client URL scheme is registered as well.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dev_client_scheme: Option<bool>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum FieldValue {
    Text(String),
    Flag(bool),
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldValue::Text(s) => f.write_str(s),
            FieldValue::Flag(b) => write!(f, "{b}"),
        }
    }
}

impl IdentityPatch {
    /// Fields set by this patch that are relevant on `platform`.
    fn entries(&self, platform: Platform) -> Vec<(&'static str, FieldValue)> {
        let application_id = match platform {
            Platform::Android => &self.android_package,
            Platform::Ios => &self.ios_bundle_identifier,
        };
        let text = |v: &Option<String>| v.clone().map(FieldValue::Text);

        [
            ("display_name", text(&self.display_name)),
            (platform.application_id_field(), text(application_id)),
            ("icon", text(&self.icon)),
            ("scheme", text(&self.scheme)),
            ("dev_client_scheme", self.dev_client_scheme.map(FieldValue::Flag)),
        ]
        .into_iter()
        .filter_map(|(field, value)| value.map(|v| (field, v)))
        .collect()
    }
}

/// One conditional patch in an [`IdentitySpec`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawOverrideRule")]
pub struct OverrideRule {
    /// Optional label used in error messages.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    pub when: Predicate,
    #[serde(flatten)]
    pub patch: IdentityPatch,
}

impl OverrideRule {
    /// Label for messages: the rule name, or its position when unnamed.
    pub fn label(&self, index: usize) -> String {
        self.name
            .clone()
            .unwrap_or_else(|| format!("overrides[{index}]"))
    }
}

/// Base identity plus ordered override rules.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawIdentitySpec")]
pub struct IdentitySpec {
    #[serde(flatten)]
    pub base: IdentityPatch,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub overrides: Vec<OverrideRule>,
}

// Flattened structs cannot deny unknown fields, so leftover keys are
// collected here and rejected. A misspelled key must never vanish silently.
type UnknownKeys = BTreeMap<String, serde::de::IgnoredAny>;

fn reject_unknown(section: &str, unknown: UnknownKeys) -> Result<(), String> {
    if unknown.is_empty() {
        return Ok(());
    }
    let keys: Vec<&str> = unknown.keys().map(String::as_str).collect();
    Err(format!(
        "unknown field(s) {} in {}; expected display_name, android_package, \
         ios_bundle_identifier, icon, scheme, dev_client_scheme",
        keys.join(", "),
        section
    ))
}

#[derive(Deserialize)]
struct RawOverrideRule {
    #[serde(default)]
    name: Option<String>,
    when: Predicate,
    #[serde(flatten)]
    patch: IdentityPatch,
    #[serde(flatten)]
    unknown: UnknownKeys,
}

impl TryFrom<RawOverrideRule> for OverrideRule {
    type Error = String;

    fn try_from(raw: RawOverrideRule) -> Result<Self, Self::Error> {
        let section = match &raw.name {
            Some(name) => format!("override '{name}'"),
            None => "an override rule".to_string(),
        };
        reject_unknown(&section, raw.unknown)?;
        Ok(Self {
            name: raw.name,
            when: raw.when,
            patch: raw.patch,
        })
    }
}

#[derive(Deserialize)]
struct RawIdentitySpec {
    #[serde(flatten)]
    base: IdentityPatch,
    #[serde(default)]
    overrides: Vec<OverrideRule>,
    #[serde(flatten)]
    unknown: UnknownKeys,
}

impl TryFrom<RawIdentitySpec> for IdentitySpec {
    type Error = String;

    fn try_from(raw: RawIdentitySpec) -> Result<Self, Self::Error> {
        reject_unknown("[identity]", raw.unknown)?;
        Ok(Self {
            base: raw.base,
            overrides: raw.overrides,
        })
    }
}

/// Key of one variant: a profile built for one platform.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct VariantKey {
    pub profile: String,
    pub platform: Platform,
}

impl VariantKey {
    pub fn new(profile: impl Into<String>, platform: Platform) -> Self {
        Self {
            profile: profile.into(),
            platform,
        }
    }
}

impl fmt::Display for VariantKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.profile, self.platform)
    }
}

/// Fully populated identity of one variant.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ResolvedIdentity {
    pub profile: String,
    pub platform: Platform,
    pub display_name: String,
    /// Android package or iOS bundle identifier, depending on `platform`.
    pub application_id: String,
    pub icon: String,
    pub scheme: String,
    pub dev_client_scheme: bool,
}

/// Resolves the identity of `variant` under `env`.
///
/// Pure: the result depends only on the three arguments.
///
/// # Errors
///
/// - [`Violation::ConflictingOverride`] if two matching rules disagree on a field
/// - [`Violation::IncompleteIdentity`] if a required field is unset or blank after merging
pub fn resolve(
    variant: &VariantKey,
    env: &EnvironmentSnapshot,
    spec: &IdentitySpec,
) -> Result<ResolvedIdentity, Violation> {
    let platform = variant.platform;

    // field -> (rule label, value) for every field set by a matching rule
    let mut patched: BTreeMap<&'static str, (String, FieldValue)> = BTreeMap::new();
    for (index, rule) in spec.overrides.iter().enumerate() {
        if !rule.when.matches(env) {
            continue;
        }
        let label = rule.label(index);
        for (field, value) in rule.patch.entries(platform) {
            match patched.get(field) {
                Some((first_rule, first_value)) if *first_value != value => {
                    return Err(Violation::ConflictingOverride {
                        profile: variant.profile.clone(),
                        platform,
                        field: field.to_string(),
                        first_rule: first_rule.clone(),
                        first_value: first_value.to_string(),
                        second_rule: label,
                        second_value: value.to_string(),
                    });
                }
                Some(_) => {}
                None => {
                    patched.insert(field, (label.clone(), value));
                }
            }
        }
    }

    let mut merged: BTreeMap<&'static str, FieldValue> =
        spec.base.entries(platform).into_iter().collect();
    merged.extend(patched.into_iter().map(|(field, (_, value))| (field, value)));

    let mut text = |field: &'static str| -> Result<String, Violation> {
        match merged.remove(field) {
            Some(FieldValue::Text(s)) if !s.trim().is_empty() => Ok(s),
            _ => Err(Violation::IncompleteIdentity {
                profile: variant.profile.clone(),
                platform,
                field: field.to_string(),
            }),
        }
    };

    let display_name = text("display_name")?;
    let application_id = text(platform.application_id_field())?;
    let icon = text("icon")?;
    let scheme = text("scheme")?;
    let dev_client_scheme = matches!(
        merged.remove("dev_client_scheme"),
        Some(FieldValue::Flag(true))
    );

    Ok(ResolvedIdentity {
        profile: variant.profile.clone(),
        platform,
        display_name,
        application_id,
        icon,
        scheme,
        dev_client_scheme,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base() -> IdentityPatch {
        IdentityPatch {
            display_name: Some("Acme".into()),
            android_package: Some("com.acme.app".into()),
            ios_bundle_identifier: Some("com.acme.ios".into()),
            icon: Some("./assets/icon.png".into()),
            scheme: Some("acme".into()),
            dev_client_scheme: None,
        }
    }

    fn variant_rule(name: &str, variant: &str, suffix: &str) -> OverrideRule {
        OverrideRule {
            name: Some(name.into()),
            when: Predicate::equals("APP_VARIANT", variant),
            patch: IdentityPatch {
                display_name: Some(format!("Acme ({variant})")),
                android_package: Some(format!("com.acme.app.{suffix}")),
                ios_bundle_identifier: Some(format!("com.acme.ios.{suffix}")),
                icon: Some(format!("./assets/icon-{suffix}.png")),
                scheme: Some(format!("acme-{suffix}")),
                dev_client_scheme: Some(true),
            },
        }
    }

    fn spec() -> IdentitySpec {
        IdentitySpec {
            base: base(),
            overrides: vec![
                variant_rule("dev", "development", "dev"),
                variant_rule("preview", "preview", "preview"),
            ],
        }
    }

    #[test]
    fn base_identity_when_no_rule_matches() {
        let env = EnvironmentSnapshot::new();
        let id = resolve(&VariantKey::new("production", Platform::Ios), &env, &spec()).unwrap();
        assert_eq!(id.application_id, "com.acme.ios");
        assert_eq!(id.display_name, "Acme");
        assert!(!id.dev_client_scheme);
    }

    #[test]
    fn matching_rule_patches_by_field() {
        let env = EnvironmentSnapshot::from_pairs([("APP_VARIANT", "preview")]);
        let id = resolve(
            &VariantKey::new("preview", Platform::Android),
            &env,
            &spec(),
        )
        .unwrap();
        assert_eq!(id.application_id, "com.acme.app.preview");
        assert_eq!(id.scheme, "acme-preview");
        assert!(id.dev_client_scheme);
    }

    #[test]
    fn platform_selects_application_id_field() {
        let env = EnvironmentSnapshot::from_pairs([("APP_VARIANT", "development")]);
        let android = resolve(&VariantKey::new("dev", Platform::Android), &env, &spec()).unwrap();
        let ios = resolve(&VariantKey::new("dev", Platform::Ios), &env, &spec()).unwrap();
        assert_eq!(android.application_id, "com.acme.app.dev");
        assert_eq!(ios.application_id, "com.acme.ios.dev");
    }

    #[test]
    fn missing_required_field_is_incomplete() {
        let mut spec = spec();
        spec.base.icon = None;
        let err = resolve(
            &VariantKey::new("production", Platform::Android),
            &EnvironmentSnapshot::new(),
            &spec,
        )
        .unwrap_err();
        assert_eq!(
            err,
            Violation::IncompleteIdentity {
                profile: "production".into(),
                platform: Platform::Android,
                field: "icon".into(),
            }
        );
    }

    #[test]
    fn blank_application_id_is_incomplete() {
        let mut spec = spec();
        spec.base.android_package = Some("  ".into());
        let err = resolve(
            &VariantKey::new("production", Platform::Android),
            &EnvironmentSnapshot::new(),
            &spec,
        )
        .unwrap_err();
        assert!(matches!(
            err,
            Violation::IncompleteIdentity { ref field, .. } if field == "android_package"
        ));
    }

    #[test]
    fn patch_can_complete_a_partial_base() {
        let mut spec = spec();
        spec.base.android_package = None;
        let env = EnvironmentSnapshot::from_pairs([("APP_VARIANT", "development")]);
        let id = resolve(&VariantKey::new("dev", Platform::Android), &env, &spec).unwrap();
        assert_eq!(id.application_id, "com.acme.app.dev");
    }

    #[test]
    fn conflicting_matching_rules_fail() {
        let mut spec = spec();
        spec.overrides.push(OverrideRule {
            name: Some("ci".into()),
            when: Predicate::Present("CI".into()),
            patch: IdentityPatch {
                android_package: Some("com.acme.app.ci".into()),
                ..IdentityPatch::default()
            },
        });
        let env = EnvironmentSnapshot::from_pairs([("APP_VARIANT", "development"), ("CI", "1")]);
        let err = resolve(&VariantKey::new("dev", Platform::Android), &env, &spec).unwrap_err();
        assert_eq!(
            err,
            Violation::ConflictingOverride {
                profile: "dev".into(),
                platform: Platform::Android,
                field: "android_package".into(),
                first_rule: "dev".into(),
                first_value: "com.acme.app.dev".into(),
                second_rule: "ci".into(),
                second_value: "com.acme.app.ci".into(),
            }
        );
    }

    #[test]
    fn agreeing_rules_do_not_conflict() {
        let mut spec = spec();
        spec.overrides.push(OverrideRule {
            name: None,
            when: Predicate::Always,
            patch: IdentityPatch {
                dev_client_scheme: Some(true),
                ..IdentityPatch::default()
            },
        });
        let env = EnvironmentSnapshot::from_pairs([("APP_VARIANT", "development")]);
        let id = resolve(&VariantKey::new("dev", Platform::Ios), &env, &spec).unwrap();
        assert!(id.dev_client_scheme);
    }

    #[test]
    fn conflict_on_other_platform_is_ignored() {
        let mut spec = spec();
        spec.overrides.push(OverrideRule {
            name: None,
            when: Predicate::Always,
            patch: IdentityPatch {
                ios_bundle_identifier: Some("com.other".into()),
                ..IdentityPatch::default()
            },
        });
        let env = EnvironmentSnapshot::from_pairs([("APP_VARIANT", "development")]);
        assert!(resolve(&VariantKey::new("dev", Platform::Android), &env, &spec).is_ok());
        let err = resolve(&VariantKey::new("dev", Platform::Ios), &env, &spec).unwrap_err();
        match err {
            Violation::ConflictingOverride { second_rule, .. } => {
                assert_eq!(second_rule, "overrides[2]")
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn result_does_not_depend_on_rule_order() {
        let env = EnvironmentSnapshot::from_pairs([("APP_VARIANT", "preview"), ("CI", "true")]);
        let mut forward = spec();
        forward.overrides.push(OverrideRule {
            name: Some("ci-icon".into()),
            when: Predicate::Present("CI".into()),
            patch: IdentityPatch {
                dev_client_scheme: Some(true),
                ..IdentityPatch::default()
            },
        });
        let mut reversed = forward.clone();
        reversed.overrides.reverse();

        let key = VariantKey::new("preview", Platform::Android);
        assert_eq!(
            resolve(&key, &env, &forward).unwrap(),
            resolve(&key, &env, &reversed).unwrap()
        );
    }

    #[test]
    fn resolution_is_repeatable() {
        let env = EnvironmentSnapshot::from_pairs([("APP_VARIANT", "development")]);
        let key = VariantKey::new("dev", Platform::Android);
        let a = serde_json::to_vec(&resolve(&key, &env, &spec()).unwrap()).unwrap();
        let b = serde_json::to_vec(&resolve(&key, &env, &spec()).unwrap()).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn predicates_evaluate_against_snapshot() {
        let env = EnvironmentSnapshot::from_pairs([("APP_VARIANT", "preview"), ("CI", "")]);
        assert!(Predicate::Present("CI".into()).matches(&env));
        assert!(Predicate::Absent("EAS_BUILD".into()).matches(&env));
        assert!(
            Predicate::NotEquals {
                var: "MISSING".into(),
                value: "x".into()
            }
            .matches(&env)
        );
        assert!(
            Predicate::OneOf {
                var: "APP_VARIANT".into(),
                values: vec!["development".into(), "preview".into()],
            }
            .matches(&env)
        );
        assert!(Predicate::All(vec![]).matches(&env));
        assert!(!Predicate::Any(vec![]).matches(&env));
        assert!(
            Predicate::Not(Box::new(Predicate::equals("APP_VARIANT", "development"))).matches(&env)
        );
    }

    #[test]
    fn misspelled_identity_key_is_rejected() {
        #[derive(Debug, Deserialize)]
        struct Holder {
            #[allow(dead_code)]
            identity: IdentitySpec,
        }
        let err = toml::from_str::<Holder>(
            r#"
[identity]
display_name = "Acme"
andriod_package = "com.acme.app"
"#,
        )
        .unwrap_err();
        assert!(err.to_string().contains("andriod_package"), "{err}");

        let err = toml::from_str::<Holder>(
            r#"
[[identity.overrides]]
name = "dev"
when = "always"
bundle_id = "com.acme.dev"
"#,
        )
        .unwrap_err();
        let message = err.to_string();
        assert!(message.contains("bundle_id"), "{message}");
        assert!(message.contains("override 'dev'"), "{message}");
    }

    #[test]
    fn known_identity_keys_still_parse() {
        #[derive(Deserialize)]
        struct Holder {
            identity: IdentitySpec,
        }
        let h: Holder = toml::from_str(
            r#"
[identity]
display_name = "Acme"
scheme = "acme"

[[identity.overrides]]
when = { present = "CI" }
dev_client_scheme = true
"#,
        )
        .unwrap();
        assert_eq!(h.identity.base.scheme.as_deref(), Some("acme"));
        assert_eq!(h.identity.overrides[0].patch.dev_client_scheme, Some(true));
        assert_eq!(h.identity.overrides[0].name, None);
    }

    #[test]
    fn predicate_parses_from_toml() {
        #[derive(Deserialize)]
        struct Holder {
            when: Predicate,
        }
        let h: Holder = toml::from_str(
            r#"when = { any = [{ equals = { var = "APP_VARIANT", value = "preview" } }, { present = "PREVIEW" }] }"#,
        )
        .unwrap();
        assert_eq!(
            h.when,
            Predicate::Any(vec![
                Predicate::equals("APP_VARIANT", "preview"),
                Predicate::Present("PREVIEW".into()),
            ])
        );
        let h: Holder = toml::from_str(r#"when = "always""#).unwrap();
        assert_eq!(h.when, Predicate::Always);
    }

    #[test]
    fn snapshot_overlay_prefers_new_bindings() {
        let env = EnvironmentSnapshot::from_pairs([("A", "1"), ("B", "2")]);
        let mut extra = BTreeMap::new();
        extra.insert("B".to_string(), "3".to_string());
        let merged = env.overlay(&extra);
        assert_eq!(merged.get("A"), Some("1"));
        assert_eq!(merged.get("B"), Some("3"));
        assert_eq!(env.get("B"), Some("2"));
    }
}
