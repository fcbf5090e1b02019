//! Android flavor x build-type validation
//!
//! Gradle produces one variant per (flavor, buildType) pair. Only the pairs in
//! the [`FlavorTypeRule`] allow-list may be built; everything else, such as a
//! development flavor signed with the release build type, is rejected.

use std::collections::BTreeSet;

use crate::registry::{AndroidDirective, FlavorTypeRule};
use crate::types::Violation;

/// Task prefixes whose suffix names the variant they build.
const VARIANT_TASK_PREFIXES: [&str; 3] = ["assemble", "bundle", "install"];

/// Suffixes Gradle appends to a variant for its test components,
/// as in `assembleDevelopmentDebugAndroidTest`.
const TEST_COMPONENT_SUFFIXES: [&str; 2] = ["AndroidTest", "UnitTest"];

/// Checks that the directive's (flavor, buildType) pair is in `rules`.
///
/// An empty allow-list rejects every directive.
///
/// # Errors
///
/// [`Violation::FlavorTypeMismatch`] naming the profile, the pair and the allow-list.
pub fn validate_android(
    profile: &str,
    directive: &AndroidDirective,
    rules: &BTreeSet<FlavorTypeRule>,
) -> Result<(), Violation> {
    let requested = FlavorTypeRule::new(&directive.flavor, &directive.build_type);
    if rules.contains(&requested) {
        return Ok(());
    }
    Err(Violation::FlavorTypeMismatch {
        profile: profile.to_string(),
        flavor: directive.flavor.clone(),
        build_type: directive.build_type.clone(),
        allowed: rules.iter().map(ToString::to_string).collect(),
    })
}

/// Gradle variant name for a pair: `development` + `debug` -> `developmentDebug`.
pub fn gradle_variant_name(flavor: &str, build_type: &str) -> String {
    if flavor.is_empty() {
        return build_type.to_string();
    }
    format!("{}{}", flavor, capitalize(build_type))
}

fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// Extracts the variant suffix from a task such as `:app:assembleDevelopmentDebug`.
fn task_variant(token: &str) -> Option<&str> {
    let task = token.rsplit(':').next().unwrap_or(token);
    VARIANT_TASK_PREFIXES.iter().find_map(|prefix| {
        let rest = task.strip_prefix(prefix)?;
        rest.chars()
            .next()
            .is_some_and(char::is_uppercase)
            .then_some(rest)
    })
}

/// Checks that every variant task in the directive's Gradle command builds
/// the variant the directive declares.
///
/// Commands without a recognisable `assemble`/`bundle`/`install` task are
/// accepted as-is.
///
/// # Errors
///
/// [`Violation::GradleCommandMismatch`] for the first task that builds another variant.
pub fn check_native_command(profile: &str, directive: &AndroidDirective) -> Result<(), Violation> {
    let Some(command) = &directive.native_command else {
        return Ok(());
    };
    let expected = gradle_variant_name(&directive.flavor, &directive.build_type);

    for token in command.split_whitespace() {
        let Some(actual) = task_variant(token) else {
            continue;
        };
        if !builds_variant(actual, &expected) {
            return Err(Violation::GradleCommandMismatch {
                profile: profile.to_string(),
                command: command.clone(),
                expected,
                actual: lowercase_first(actual),
            });
        }
    }
    Ok(())
}

/// True when a task variant is `expected` itself or one of its test components.
fn builds_variant(actual: &str, expected: &str) -> bool {
    if actual.eq_ignore_ascii_case(expected) {
        return true;
    }
    TEST_COMPONENT_SUFFIXES.iter().any(|suffix| {
        actual
            .strip_suffix(suffix)
            .is_some_and(|variant| variant.eq_ignore_ascii_case(expected))
    })
}

fn lowercase_first(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_lowercase().chain(chars).collect(),
        None => String::new(),
    }
}
