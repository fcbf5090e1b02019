//! iOS scheme/target validation
//!
//! Xcode selects what to build through a scheme. For side-by-side installs,
//! the mapping from profile to scheme must be a bijection: no scheme shared
//! by two profiles, no profile bound to two schemes, and no profile with an
//! iOS directive left without a scheme.

use std::collections::{BTreeMap, BTreeSet};

use crate::registry::{IosDirective, SchemeBinding};
use crate::types::Violation;

/// Validates the scheme bindings of a registry.
///
/// `ios_profiles` names every profile that declares an iOS directive.
///
/// Findings are returned sorted, one [`Violation::DuplicateScheme`] per
/// shared scheme naming all of its profiles.
///
/// # Errors
///
/// Every [`Violation::DuplicateScheme`], [`Violation::AmbiguousScheme`] and
/// [`Violation::MissingScheme`] found.
pub fn validate_ios(bindings: &[SchemeBinding], ios_profiles: &[&str]) -> Result<(), Vec<Violation>> {
    let mut by_scheme: BTreeMap<&str, BTreeSet<&str>> = BTreeMap::new();
    let mut by_profile: BTreeMap<&str, BTreeSet<&str>> = BTreeMap::new();
    for binding in bindings {
        by_scheme
            .entry(&binding.scheme)
            .or_default()
            .insert(&binding.profile);
        by_profile
            .entry(&binding.profile)
            .or_default()
            .insert(&binding.scheme);
    }

    let mut violations = Vec::new();
    for (scheme, profiles) in &by_scheme {
        if profiles.len() > 1 {
            violations.push(Violation::DuplicateScheme {
                scheme: scheme.to_string(),
                profiles: profiles.iter().map(|p| p.to_string()).collect(),
            });
        }
    }
    for (profile, schemes) in &by_profile {
        if schemes.len() > 1 {
            violations.push(Violation::AmbiguousScheme {
                profile: profile.to_string(),
                schemes: schemes.iter().map(|s| s.to_string()).collect(),
            });
        }
    }
    for profile in ios_profiles {
        if !by_profile.contains_key(profile) {
            violations.push(Violation::MissingScheme {
                profile: profile.to_string(),
            });
        }
    }

    if violations.is_empty() {
        Ok(())
    } else {
        violations.sort();
        Err(violations)
    }
}

/// Checks the directive's build configuration against `allowed`.
///
/// An empty list accepts any configuration.
pub fn validate_build_configuration(
    profile: &str,
    directive: &IosDirective,
    allowed: &BTreeSet<String>,
) -> Result<(), Violation> {
    if allowed.is_empty() || allowed.contains(&directive.build_configuration) {
        return Ok(());
    }
    Err(Violation::UnknownBuildConfiguration {
        profile: profile.to_string(),
        configuration: directive.build_configuration.clone(),
        allowed: allowed.iter().cloned().collect(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bind(profile: &str, scheme: &str) -> SchemeBinding {
        SchemeBinding {
            profile: profile.into(),
            scheme: scheme.into(),
            target: scheme.into(),
        }
    }

    #[test]
    fn distinct_schemes_pass() {
        let bindings = [bind("development", "myapp-dev"), bind("production", "myapp")];
        assert!(validate_ios(&bindings, &["development", "production"]).is_ok());
    }

    #[test]
    fn shared_scheme_yields_one_finding_naming_both() {
        let bindings = [bind("production", "myapp"), bind("development", "myapp")];
        let violations = validate_ios(&bindings, &["development", "production"]).unwrap_err();
        assert_eq!(
            violations,
            vec![Violation::DuplicateScheme {
                scheme: "myapp".into(),
                profiles: vec!["development".into(), "production".into()],
            }]
        );
    }

    #[test]
    fn three_profiles_on_one_scheme_yield_one_finding() {
        let bindings = [bind("a", "s"), bind("b", "s"), bind("c", "s")];
        let violations = validate_ios(&bindings, &[]).unwrap_err();
        assert_eq!(violations.len(), 1);
        assert_eq!(violations[0].profiles(), vec!["a", "b", "c"]);
    }

    #[test]
    fn ios_profile_without_binding_is_missing() {
        let bindings = [bind("production", "myapp")];
        let violations = validate_ios(&bindings, &["preview", "production"]).unwrap_err();
        assert_eq!(
            violations,
            vec![Violation::MissingScheme {
                profile: "preview".into()
            }]
        );
    }

    #[test]
    fn profile_with_two_schemes_is_ambiguous() {
        let bindings = [bind("production", "myapp"), bind("production", "myapp-prod")];
        let violations = validate_ios(&bindings, &["production"]).unwrap_err();
        assert_eq!(
            violations,
            vec![Violation::AmbiguousScheme {
                profile: "production".into(),
                schemes: vec!["myapp".into(), "myapp-prod".into()],
            }]
        );
    }

    #[test]
    fn build_configuration_list_is_enforced_when_present() {
        let directive = IosDirective {
            scheme: Some("myapp".into()),
            build_configuration: "Staging".into(),
            target: None,
        };
        assert!(validate_build_configuration("p", &directive, &BTreeSet::new()).is_ok());

        let allowed: BTreeSet<String> = ["Debug".to_string(), "Release".to_string()].into();
        assert_eq!(
            validate_build_configuration("p", &directive, &allowed).unwrap_err(),
            Violation::UnknownBuildConfiguration {
                profile: "p".into(),
                configuration: "Staging".into(),
                allowed: vec!["Debug".into(), "Release".into()],
            }
        );
    }
}
