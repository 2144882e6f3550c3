//! Merge engine for the combined layout
//!
//! Folds employment-link and organization facts into the denormalized
//! employment records. Targets are found only through the typed indexes and
//! every write is conditional on the revision that was read, so a concurrent
//! writer makes the loser fail with `Conflict` instead of silently losing an
//! update.
//!
//! Facts are applied in two phases separated by a barrier: every link fact
//! first, then every organization fact. Organization facts match records on
//! `organizationName`, which only exists once the links are merged.

use futures::stream::{self, StreamExt};
use serde::{Deserialize, Serialize, Serializer};
use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::error::{Error, Result};
use crate::index::{ByLastName, ByOrganization, IndexAccessor, MatchPolicy};
use crate::model::{EmploymentLink, Organization};
use crate::storage::DocumentStore;

/// Merge tuning, the `[merge]` configuration section
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MergeSettings {
    #[serde(default)]
    pub policy: MatchPolicy,

    /// Maximum number of key groups merged at once within a phase
    #[serde(default = "default_concurrency")]
    pub concurrency: usize,
}

impl Default for MergeSettings {
    fn default() -> Self {
        Self {
            policy: MatchPolicy::default(),
            concurrency: default_concurrency(),
        }
    }
}

fn default_concurrency() -> usize {
    8
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Phase {
    Links,
    Organizations,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Phase::Links => write!(f, "links"),
            Phase::Organizations => write!(f, "organizations"),
        }
    }
}

/// A fact that could not be merged
#[derive(Debug, Serialize)]
pub struct MergeFailure {
    pub phase: Phase,
    pub fact: String,
    #[serde(serialize_with = "serialize_display")]
    pub error: Error,
}

fn serialize_display<S: Serializer>(error: &Error, serializer: S) -> std::result::Result<S::Ok, S::Error> {
    serializer.collect_str(error)
}

/// Outcome of a two-phase merge run
#[derive(Debug, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MergeReport {
    /// Link facts written onto a record
    pub links_applied: usize,
    /// Link facts whose last name matched no record
    pub links_unmatched: usize,
    /// Organization facts applied (including those matching zero records)
    pub organizations_applied: usize,
    /// Records that received an organization city
    pub records_patched: usize,
    /// Duplicate organization facts ignored under first-match
    pub skipped: Vec<String>,
    pub failures: Vec<MergeFailure>,
}

impl MergeReport {
    pub fn is_successful(&self) -> bool {
        self.failures.is_empty()
    }

    pub fn summary(&self) -> String {
        let merged = format!(
            "Merged {} link(s) and {} organization(s), {} record(s) patched",
            self.links_applied, self.organizations_applied, self.records_patched
        );
        if self.is_successful() {
            merged
        } else {
            format!("{}, {} failed", merged, self.failures.len())
        }
    }

    fn fail(&mut self, phase: Phase, fact: String, error: Error) {
        warn!("Failed to merge {} ({}): {}", fact, phase, error);
        self.failures.push(MergeFailure { phase, fact, error });
    }
}

/// Applies facts onto denormalized records in one collection
pub struct MergeEngine {
    store: Arc<dyn DocumentStore>,
    index: IndexAccessor,
    settings: MergeSettings,
}

impl MergeEngine {
    pub fn new(
        store: Arc<dyn DocumentStore>,
        collection: impl Into<String>,
        settings: MergeSettings,
    ) -> Self {
        let index = IndexAccessor::new(Arc::clone(&store), collection);
        Self {
            store,
            index,
            settings,
        }
    }

    pub fn policy(&self) -> MatchPolicy {
        self.settings.policy
    }

    /// Merge one link fact onto the record of its person
    ///
    /// Returns `false` when no record carries the link's last name.
    pub async fn merge_link(&self, link: &EmploymentLink) -> Result<bool> {
        let Some(target) = self
            .index
            .resolve::<ByLastName>(&link.last_name, self.settings.policy)
            .await?
        else {
            debug!("No record for {}", describe_link(link));
            return Ok(false);
        };

        let patched = target.content.with_employment(link);
        let rev = self
            .store
            .put(
                self.index.collection(),
                &target.id,
                &serde_json::to_value(&patched)?,
                &target.rev,
            )
            .await?;
        debug!("Merged {} into {} at {}", describe_link(link), target.id, rev);
        Ok(true)
    }

    /// Stamp the organization's city onto every record employed there
    ///
    /// Each record is written with its own revision. Returns the number of
    /// records patched; a write failure aborts the remaining records of this
    /// fact without undoing earlier ones.
    pub async fn merge_organization(&self, organization: &Organization) -> Result<usize> {
        let targets = self
            .index
            .lookup::<ByOrganization>(&organization.organization_name)
            .await?;

        let mut patched = 0;
        for target in targets {
            let content = target.content.with_organization_city(&organization.city);
            self.store
                .put(
                    self.index.collection(),
                    &target.id,
                    &serde_json::to_value(&content)?,
                    &target.rev,
                )
                .await?;
            patched += 1;
        }
        debug!(
            "Merged {} into {} record(s)",
            describe_organization(organization),
            patched
        );
        Ok(patched)
    }

    /// Run both phases and report per-fact outcomes
    ///
    /// Failures never stop the run; they are logged and collected.
    pub async fn run(&self, links: &[EmploymentLink], organizations: &[Organization]) -> MergeReport {
        let mut report = MergeReport::default();

        info!("Merging {} link fact(s)", links.len());
        self.merge_links(links, &mut report).await;

        // every link group has completed before any organization fact starts
        info!("Merging {} organization fact(s)", organizations.len());
        self.merge_organizations(organizations, &mut report).await;

        if report.is_successful() {
            info!("{}", report.summary());
        } else {
            warn!("{}", report.summary());
        }
        report
    }

    async fn merge_links(&self, links: &[EmploymentLink], report: &mut MergeReport) {
        let groups: Vec<_> = group_by_key(links, |link| link.last_name.as_str())
            .into_iter()
            .map(|group| self.link_group(group))
            .collect();
        let outcomes: Vec<Vec<(&EmploymentLink, Result<bool>)>> = stream::iter(groups)
            .buffer_unordered(self.settings.concurrency.max(1))
            .collect()
            .await;

        for (link, outcome) in outcomes.into_iter().flatten() {
            match outcome {
                Ok(true) => report.links_applied += 1,
                Ok(false) => report.links_unmatched += 1,
                Err(e) => report.fail(Phase::Links, describe_link(link), e),
            }
        }
    }

    async fn merge_organizations(&self, organizations: &[Organization], report: &mut MergeReport) {
        let groups: Vec<_> = group_by_key(organizations, |org| org.organization_name.as_str())
            .into_iter()
            .map(|group| self.organization_group(group))
            .collect();
        let outcomes: Vec<Vec<(&Organization, OrganizationOutcome)>> = stream::iter(groups)
            .buffer_unordered(self.settings.concurrency.max(1))
            .collect()
            .await;

        for (org, outcome) in outcomes.into_iter().flatten() {
            match outcome {
                OrganizationOutcome::Applied(patched) => {
                    report.organizations_applied += 1;
                    report.records_patched += patched;
                }
                OrganizationOutcome::Skipped => {
                    debug!("Skipping duplicate {}", describe_organization(org));
                    report.skipped.push(describe_organization(org));
                }
                OrganizationOutcome::Failed(e) => {
                    report.fail(Phase::Organizations, describe_organization(org), e)
                }
            }
        }
    }

    /// Links sharing a last name, merged one after another
    async fn link_group<'a>(
        &self,
        group: Vec<&'a EmploymentLink>,
    ) -> Vec<(&'a EmploymentLink, Result<bool>)> {
        let mut outcomes = Vec::with_capacity(group.len());
        for link in group {
            outcomes.push((link, self.merge_link(link).await));
        }
        outcomes
    }

    /// Organization facts sharing a name; only one of them may apply
    async fn organization_group<'a>(
        &self,
        group: Vec<&'a Organization>,
    ) -> Vec<(&'a Organization, OrganizationOutcome)> {
        let count = group.len();
        let mut outcomes = Vec::with_capacity(count);
        for (position, org) in group.into_iter().enumerate() {
            let outcome = match (self.settings.policy, position) {
                (MatchPolicy::RequireUnique, _) if count > 1 => OrganizationOutcome::Failed(
                    Error::ambiguous("organizations", &org.organization_name, count),
                ),
                (MatchPolicy::FirstMatch, p) if p > 0 => OrganizationOutcome::Skipped,
                _ => match self.merge_organization(org).await {
                    Ok(patched) => OrganizationOutcome::Applied(patched),
                    Err(e) => OrganizationOutcome::Failed(e),
                },
            };
            outcomes.push((org, outcome));
        }
        outcomes
    }
}

enum OrganizationOutcome {
    Applied(usize),
    Skipped,
    Failed(Error),
}

/// Group facts by key, keeping first-seen key order and fact order within a key
fn group_by_key<'a, T>(facts: &'a [T], key: impl Fn(&'a T) -> &'a str) -> Vec<Vec<&'a T>> {
    let mut positions: HashMap<&'a str, usize> = HashMap::new();
    let mut groups: Vec<Vec<&'a T>> = Vec::new();
    for fact in facts {
        match positions.entry(key(fact)) {
            Entry::Occupied(entry) => groups[*entry.get()].push(fact),
            Entry::Vacant(entry) => {
                entry.insert(groups.len());
                groups.push(vec![fact]);
            }
        }
    }
    groups
}

fn describe_link(link: &EmploymentLink) -> String {
    format!(
        "link {} -> {} ({})",
        link.last_name, link.organization_name, link.salary
    )
}

fn describe_organization(org: &Organization) -> String {
    format!("organization {} in {}", org.organization_name, org.city)
}
