//! Record model for people, organizations and employment links
//!
//! The same three record kinds are stored two ways:
//! - separate mode wraps each record in a [`NormalizedRecord`] tagged union
//! - combined mode keeps one [`DenormalizedEmploymentRecord`] per person and
//!   enriches it as employment and organization facts are merged in

use serde::{Deserialize, Serialize};

/// A person, keyed for joins by last name
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Person {
    pub first_name: String,
    pub last_name: String,
    pub middle_initial: String,
    pub street: String,
    pub city: String,
    pub gender: String,
}

impl Person {
    /// Render the name as `First M. Last`
    pub fn display_name(&self) -> String {
        display_name(&self.first_name, &self.middle_initial, &self.last_name)
    }
}

/// An organization, keyed for joins by name
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Organization {
    #[serde(alias = "companyName")]
    pub organization_name: String,
    pub city: String,
}

/// The fact that a person works for an organization at a salary
///
/// Seed data may also carry the employee's first name and middle initial.
/// They are kept for display in logs only; joins go through `last_name`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EmploymentLink {
    pub last_name: String,
    #[serde(alias = "companyName")]
    pub organization_name: String,
    pub salary: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub first_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub middle_initial: Option<String>,
}

impl EmploymentLink {
    pub fn new(
        last_name: impl Into<String>,
        organization_name: impl Into<String>,
        salary: u64,
    ) -> Self {
        Self {
            last_name: last_name.into(),
            organization_name: organization_name.into(),
            salary,
            first_name: None,
            middle_initial: None,
        }
    }
}

/// Storage unit of the separate (normalized) layout
///
/// Serialized as `{"type": "employee" | "company" | "works", "data": {...}}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum NormalizedRecord {
    #[serde(rename = "employee")]
    Person(Person),
    #[serde(rename = "company")]
    Organization(Organization),
    #[serde(rename = "works")]
    EmploymentLink(EmploymentLink),
}

impl NormalizedRecord {
    pub fn kind(&self) -> &'static str {
        match self {
            NormalizedRecord::Person(_) => "employee",
            NormalizedRecord::Organization(_) => "company",
            NormalizedRecord::EmploymentLink(_) => "works",
        }
    }
}

/// Storage unit of the combined (denormalized) layout
///
/// Starts as the person's fields and is enriched in place: an employment
/// link owns `organization_name` and `salary`, an organization owns
/// `organization_city`. Person fields are never written by a merge.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DenormalizedEmploymentRecord {
    #[serde(flatten)]
    pub person: Person,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub organization_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub salary: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub organization_city: Option<String>,
}

impl DenormalizedEmploymentRecord {
    pub fn from_person(person: Person) -> Self {
        Self {
            person,
            organization_name: None,
            salary: None,
            organization_city: None,
        }
    }

    /// Copy with the fields owned by an employment link applied
    pub fn with_employment(&self, link: &EmploymentLink) -> Self {
        Self {
            organization_name: Some(link.organization_name.clone()),
            salary: Some(link.salary),
            ..self.clone()
        }
    }

    /// Copy with the field owned by an organization applied
    pub fn with_organization_city(&self, city: &str) -> Self {
        Self {
            organization_city: Some(city.to_string()),
            ..self.clone()
        }
    }
}

/// The home and work cities asked about by the "lives in / works in" question
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CityPair {
    pub home_city: String,
    pub work_city: String,
}

impl CityPair {
    pub fn new(home_city: impl Into<String>, work_city: impl Into<String>) -> Self {
        Self {
            home_city: home_city.into(),
            work_city: work_city.into(),
        }
    }
}

impl Default for CityPair {
    fn default() -> Self {
        Self::new("Lincoln", "Omaha")
    }
}

/// A fully loaded separate-mode dataset, in load order
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dataset {
    #[serde(default, alias = "employees")]
    pub people: Vec<Person>,
    #[serde(default, alias = "companies")]
    pub organizations: Vec<Organization>,
    #[serde(default, alias = "works")]
    pub links: Vec<EmploymentLink>,
}

impl Dataset {
    /// Split a sequence of normalized records by kind, keeping order
    pub fn from_records(records: impl IntoIterator<Item = NormalizedRecord>) -> Self {
        let mut dataset = Dataset::default();
        for record in records {
            match record {
                NormalizedRecord::Person(p) => dataset.people.push(p),
                NormalizedRecord::Organization(o) => dataset.organizations.push(o),
                NormalizedRecord::EmploymentLink(l) => dataset.links.push(l),
            }
        }
        dataset
    }

    /// All records in ingestion order: people, then organizations, then links
    pub fn to_records(&self) -> Vec<NormalizedRecord> {
        self.people
            .iter()
            .cloned()
            .map(NormalizedRecord::Person)
            .chain(
                self.organizations
                    .iter()
                    .cloned()
                    .map(NormalizedRecord::Organization),
            )
            .chain(self.links.iter().cloned().map(NormalizedRecord::EmploymentLink))
            .collect()
    }

    pub fn is_empty(&self) -> bool {
        self.people.is_empty() && self.organizations.is_empty() && self.links.is_empty()
    }
}

pub(crate) fn display_name(first: &str, middle_initial: &str, last: &str) -> String {
    format!("{} {}. {}", first, middle_initial, last)
}
