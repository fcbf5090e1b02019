//! Configuration drift detection
//!
//! [`audit_all`] runs identity resolution and native matrix validation over
//! every profile of a sealed [`ProfileRegistry`] and collects every finding
//! into one [`Report`]. It never stops at the first problem, so a single run
//! shows everything that has to be fixed.
//!
//! The work splits into a per-profile part ([`audit_profile`]) and a
//! cross-profile part (identity collisions, scheme bijection, dangling
//! bindings). Per-profile reports can be produced in any order, on any
//! thread, and combined with [`Report::merge`]: the merged report is sorted
//! and de-duplicated, so combination is commutative.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use crate::identity::ResolvedIdentity;
use crate::matrix;
use crate::registry::ProfileRegistry;
use crate::types::{Platform, VariantError, Violation};

/// Result of an audit: resolved identities plus all findings.
///
/// A report with no findings means every profile is safe to build.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Report {
    /// Every identity that resolved, sorted by profile then platform.
    pub identities: Vec<ResolvedIdentity>,
    /// Every violation found, sorted and de-duplicated.
    pub findings: Vec<Violation>,
}

impl Report {
    /// Builds a report in canonical order.
    pub fn new(mut identities: Vec<ResolvedIdentity>, mut findings: Vec<Violation>) -> Self {
        identities.sort();
        identities.dedup();
        findings.sort();
        findings.dedup();
        Self {
            identities,
            findings,
        }
    }

    /// Combines two reports. `a.merge(b) == b.merge(a)`.
    pub fn merge(mut self, other: Report) -> Self {
        self.identities.extend(other.identities);
        self.findings.extend(other.findings);
        Self::new(self.identities, self.findings)
    }

    /// True when there is nothing to fix.
    pub fn is_clean(&self) -> bool {
        self.findings.is_empty()
    }

    /// Findings that name `profile`.
    pub fn findings_for<'a>(&'a self, profile: &'a str) -> impl Iterator<Item = &'a Violation> {
        self.findings
            .iter()
            .filter(move |v| v.profiles().contains(&profile))
    }

    /// Number of findings per violation kind.
    pub fn counts_by_kind(&self) -> BTreeMap<&'static str, usize> {
        let mut counts = BTreeMap::new();
        for finding in &self.findings {
            *counts.entry(finding.kind()).or_insert(0) += 1;
        }
        counts
    }

    /// Identity of one variant, if it resolved.
    pub fn identity(&self, profile: &str, platform: Platform) -> Option<&ResolvedIdentity> {
        self.identities
            .iter()
            .find(|id| id.profile == profile && id.platform == platform)
    }
}

/// Audits a single profile: identity resolution on every targeted platform,
/// Android allow-list and Gradle task checks, iOS build configuration check.
pub fn audit_profile(registry: &ProfileRegistry, name: &str) -> Result<Report, VariantError> {
    let profile = registry.effective(name)?;
    let mut identities = Vec::new();
    let mut findings = Vec::new();

    for platform in profile.platforms() {
        match registry.resolve(name, platform) {
            Ok(identity) => identities.push(identity),
            Err(VariantError::Violation(violation)) => findings.push(violation),
            Err(other) => return Err(other),
        }
    }

    if let Some(android) = &profile.android {
        if let Err(violation) = matrix::validate_android(name, android, registry.flavor_rules()) {
            findings.push(violation);
        }
        if let Err(violation) = matrix::check_native_command(name, android) {
            findings.push(violation);
        }
    }

    if let Some(ios) = &profile.ios
        && let Err(violation) =
            matrix::validate_build_configuration(name, ios, registry.build_configurations())
    {
        findings.push(violation);
    }

    Ok(Report::new(identities, findings))
}

/// Pairwise application id collisions among `identities`, per platform.
pub fn identity_collisions(identities: &[ResolvedIdentity]) -> Vec<Violation> {
    let mut owners: BTreeMap<(Platform, &str), BTreeSet<&str>> = BTreeMap::new();
    for identity in identities {
        owners
            .entry((identity.platform, identity.application_id.as_str()))
            .or_default()
            .insert(identity.profile.as_str());
    }

    let mut collisions = Vec::new();
    for ((platform, application_id), profiles) in owners {
        let profiles: Vec<&str> = profiles.into_iter().collect();
        for (i, first) in profiles.iter().enumerate() {
            for second in &profiles[i + 1..] {
                collisions.push(Violation::IdentityCollision {
                    platform,
                    application_id: application_id.to_string(),
                    first: first.to_string(),
                    second: second.to_string(),
                });
            }
        }
    }
    collisions
}

/// Runs the full audit over a sealed registry.
///
/// # Errors
///
/// [`VariantError::RegistryNotSealed`] if the registry is still accepting
/// declarations. Configuration defects never surface as errors here; they
/// are findings in the returned [`Report`].
pub fn audit_all(registry: &ProfileRegistry) -> Result<Report, VariantError> {
    let mut report = Report::default();
    let mut ios_profiles = Vec::new();
    for profile in registry.effective_profiles()? {
        report = report.merge(audit_profile(registry, &profile.name)?);
        if profile.ios.is_some() {
            ios_profiles.push(profile.name.as_str());
        }
    }

    let mut findings = identity_collisions(&report.identities);

    let bindings = registry.scheme_bindings()?;
    if let Err(violations) = matrix::validate_ios(&bindings, &ios_profiles) {
        findings.extend(violations);
    }
    for binding in &bindings {
        if registry.effective(&binding.profile).is_err() {
            findings.push(Violation::UnknownProfile {
                profile: binding.profile.clone(),
                context: format!("scheme binding '{}'", binding.scheme),
            });
        }
    }

    Ok(report.merge(Report::new(Vec::new(), findings)))
}
