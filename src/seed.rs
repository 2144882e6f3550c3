//! Seed data for both layouts
//!
//! A built-in dataset ships with the binary. A JSON seed file named in the
//! configuration replaces it; the file holds either a dataset object
//! (`{"employees": [...], "companies": [...], "works": [...]}`) or an array of
//! normalized records.

use serde::Deserialize;
use std::path::Path;
use tracing::info;

use crate::error::{Error, Result};
use crate::model::{Dataset, EmploymentLink, NormalizedRecord, Organization, Person};

#[derive(Deserialize)]
#[serde(untagged)]
enum SeedFile {
    Dataset(Dataset),
    Records(Vec<NormalizedRecord>),
}

/// The configured seed file if any, the built-in dataset otherwise
pub fn load(path: Option<&Path>) -> Result<Dataset> {
    match path {
        Some(path) => load_file(path),
        None => Ok(builtin()),
    }
}

pub fn load_file(path: &Path) -> Result<Dataset> {
    let raw = std::fs::read_to_string(path)
        .map_err(|e| Error::Seed(format!("Failed to read {}: {}", path.display(), e)))?;
    let dataset = parse(&raw)
        .map_err(|e| Error::Seed(format!("Failed to parse {}: {}", path.display(), e)))?;
    info!(
        "Loaded seed file {} ({} people, {} organizations, {} links)",
        path.display(),
        dataset.people.len(),
        dataset.organizations.len(),
        dataset.links.len()
    );
    Ok(dataset)
}

fn parse(raw: &str) -> serde_json::Result<Dataset> {
    Ok(match serde_json::from_str(raw)? {
        SeedFile::Dataset(dataset) => dataset,
        SeedFile::Records(records) => Dataset::from_records(records),
    })
}

fn person(first: &str, mi: &str, last: &str, street: &str, city: &str, gender: &str) -> Person {
    Person {
        first_name: first.to_string(),
        last_name: last.to_string(),
        middle_initial: mi.to_string(),
        street: street.to_string(),
        city: city.to_string(),
        gender: gender.to_string(),
    }
}

fn organization(name: &str, city: &str) -> Organization {
    Organization {
        organization_name: name.to_string(),
        city: city.to_string(),
    }
}

fn link(first: &str, mi: &str, last: &str, organization: &str, salary: u64) -> EmploymentLink {
    EmploymentLink {
        first_name: Some(first.to_string()),
        middle_initial: Some(mi.to_string()),
        ..EmploymentLink::new(last, organization, salary)
    }
}

/// Built-in dataset; every last name and organization name is unique
pub fn builtin() -> Dataset {
    Dataset {
        people: vec![
            person("Alice", "M", "Anderson", "12 Elm St", "Lincoln", "F"),
            person("Brian", "T", "Baker", "48 O St", "Lincoln", "M"),
            person("Carla", "J", "Chen", "7 Dodge St", "Omaha", "F"),
            person("Derek", "L", "Dunn", "301 Farnam St", "Omaha", "M"),
            person("Elena", "R", "Estrada", "95 Central Ave", "Kearney", "F"),
            person("Frank", "W", "Fischer", "220 Capitol Pkwy", "Lincoln", "M"),
            person("Grace", "K", "Gomez", "16 Leavenworth St", "Omaha", "F"),
            person("Henry", "P", "Holt", "3 Railroad St", "Kearney", "M"),
        ],
        organizations: vec![
            organization("Prairie Mutual", "Omaha"),
            organization("Cornhusker Analytics", "Lincoln"),
            organization("Platte Logistics", "Kearney"),
            organization("Union Freight", "Omaha"),
        ],
        links: vec![
            link("Alice", "M", "Anderson", "Prairie Mutual", 72000),
            link("Brian", "T", "Baker", "Cornhusker Analytics", 64000),
            link("Carla", "J", "Chen", "Union Freight", 81000),
            link("Derek", "L", "Dunn", "Cornhusker Analytics", 58000),
            link("Elena", "R", "Estrada", "Platte Logistics", 49000),
            link("Frank", "W", "Fischer", "Union Freight", 67000),
            link("Grace", "K", "Gomez", "Prairie Mutual", 90000),
            link("Henry", "P", "Holt", "Prairie Mutual", 53000),
        ],
    }
}
