//! In-memory join over a fully loaded separate-mode dataset
//!
//! Resolution mirrors the merge engine so both modes agree: a link resolves
//! its person by last name and its organization by name under the same
//! [`MatchPolicy`], and when several links resolve to one person the last
//! link in load order is that person's employment.

use std::collections::HashMap;

use crate::error::Result;
use crate::index::{ByLastName, ByOrganization, MatchPolicy, TypedIndex};
use crate::model::{CityPair, Dataset, EmploymentLink, Organization, Person};

#[derive(Debug, Clone, Copy, Default)]
pub struct JoinEvaluator {
    policy: MatchPolicy,
}

/// A person together with the link that employs them
struct Employment<'a> {
    person: &'a Person,
    link: &'a EmploymentLink,
}

impl JoinEvaluator {
    pub fn new(policy: MatchPolicy) -> Self {
        Self { policy }
    }

    /// Display names of people living in `cities.home_city` whose employer
    /// is in `cities.work_city`
    pub fn query_a(&self, dataset: &Dataset, cities: &CityPair) -> Result<Vec<String>> {
        let organizations = self.organizations(dataset)?;

        let mut results = Vec::new();
        for employment in self.employments(dataset)? {
            if employment.person.city != cities.home_city {
                continue;
            }
            let works_there = organizations
                .get(employment.link.organization_name.as_str())
                .is_some_and(|org| org.city == cities.work_city);
            if works_there {
                results.push(employment.person.display_name());
            }
        }
        Ok(results)
    }

    /// Salaries of people who live in the city their employer is in
    pub fn query_b(&self, dataset: &Dataset) -> Result<Vec<u64>> {
        let organizations = self.organizations(dataset)?;

        let mut results = Vec::new();
        for employment in self.employments(dataset)? {
            // links to unknown organizations are skipped
            let Some(org) = organizations.get(employment.link.organization_name.as_str()) else {
                continue;
            };
            if org.city == employment.person.city {
                results.push(employment.link.salary);
            }
        }
        Ok(results)
    }

    /// Organization each name resolves to under the policy
    fn organizations<'a>(&self, dataset: &'a Dataset) -> Result<HashMap<&'a str, &'a Organization>> {
        let candidates = group(&dataset.organizations, |o| o.organization_name.as_str());

        let mut resolved = HashMap::with_capacity(candidates.len());
        for (name, orgs) in candidates {
            let org = self
                .policy
                .select_ref(ByOrganization::NAME, name, orgs.iter().copied())?;
            if let Some(org) = org {
                resolved.insert(name, org);
            }
        }
        Ok(resolved)
    }

    /// Effective employment per person, in people load order
    fn employments<'a>(&self, dataset: &'a Dataset) -> Result<Vec<Employment<'a>>> {
        let indexed: Vec<(usize, &Person)> = dataset.people.iter().enumerate().collect();
        let candidates = group(&indexed, |(_, p)| p.last_name.as_str());

        let mut employed: Vec<Option<&EmploymentLink>> = vec![None; dataset.people.len()];
        for link in &dataset.links {
            let Some(people) = candidates.get(link.last_name.as_str()) else {
                continue;
            };
            let person = self
                .policy
                .select_ref(ByLastName::NAME, &link.last_name, people.iter().copied())?;
            if let Some((position, _)) = person {
                employed[*position] = Some(link);
            }
        }

        Ok(dataset
            .people
            .iter()
            .zip(employed)
            .filter_map(|(person, link)| link.map(|link| Employment { person, link }))
            .collect())
    }
}

fn group<'a, T>(items: &'a [T], key: impl Fn(&'a T) -> &'a str) -> HashMap<&'a str, Vec<&'a T>> {
    let mut groups: HashMap<&'a str, Vec<&'a T>> = HashMap::new();
    for item in items {
        groups.entry(key(item)).or_default().push(item);
    }
    groups
}
