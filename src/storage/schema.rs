//! Collection schema declarations: secondary indexes and aggregates
//!
//! A schema is declared once in Rust and interpreted by every backend. The
//! memory backend evaluates [`IndexDefinition::key_of`] and
//! [`AggregateRule::emit`] directly; the CouchDB backend installs the
//! equivalent JavaScript map functions in design documents.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::model::{display_name, CityPair};

/// Secondary index keyed on one top-level string field
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexDefinition {
    pub name: String,
    pub key_field: String,
}

impl IndexDefinition {
    pub fn new(name: impl Into<String>, key_field: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            key_field: key_field.into(),
        }
    }

    /// Index key of a document, if it carries the key field
    pub fn key_of(&self, content: &Value) -> Option<String> {
        content
            .get(&self.key_field)
            .and_then(Value::as_str)
            .map(str::to_string)
    }

    /// CouchDB map function emitting the key field
    pub fn map_function(&self) -> String {
        let field = js_string(&self.key_field);
        format!(
            "function (doc) {{ if (typeof doc[{field}] === \"string\") {{ emit(doc[{field}], null); }} }}"
        )
    }
}

/// What an aggregate emits per document
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "rule", rename_all = "snake_case")]
pub enum AggregateRule {
    /// `First M. Last` of records living in `home_city` and working in `work_city`
    DisplayNameByCities { cities: CityPair },
    /// `salary` of records whose home city equals their organization's city
    SalaryWhereCitiesMatch,
}

impl AggregateRule {
    /// Value emitted for a document, or `None` when it does not qualify
    pub fn emit(&self, content: &Value) -> Option<Value> {
        let field = |name: &str| content.get(name).and_then(Value::as_str);

        match self {
            AggregateRule::DisplayNameByCities { cities } => {
                if field("city")? != cities.home_city
                    || field("organizationCity")? != cities.work_city
                {
                    return None;
                }
                Some(Value::String(display_name(
                    field("firstName")?,
                    field("middleInitial")?,
                    field("lastName")?,
                )))
            }
            AggregateRule::SalaryWhereCitiesMatch => {
                if field("city")? != field("organizationCity")? {
                    return None;
                }
                content.get("salary").filter(|s| s.is_number()).cloned()
            }
        }
    }

    /// CouchDB map function equivalent to [`AggregateRule::emit`]
    pub fn map_function(&self) -> String {
        match self {
            AggregateRule::DisplayNameByCities { cities } => format!(
                "function (doc) {{ if (doc.city === {home} && doc.organizationCity === {work} \
                 && typeof doc.firstName === \"string\" && typeof doc.middleInitial === \"string\" \
                 && typeof doc.lastName === \"string\") {{ \
                 emit(doc.lastName, doc.firstName + \" \" + doc.middleInitial + \". \" + doc.lastName); }} }}",
                home = js_string(&cities.home_city),
                work = js_string(&cities.work_city),
            ),
            AggregateRule::SalaryWhereCitiesMatch => "function (doc) { \
                 if (typeof doc.city === \"string\" && doc.city === doc.organizationCity \
                 && typeof doc.salary === \"number\") { emit(doc.lastName, doc.salary); } }"
                .to_string(),
        }
    }
}

/// Named aggregate over a collection
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AggregateDefinition {
    pub name: String,
    pub rule: AggregateRule,
}

impl AggregateDefinition {
    pub fn new(name: impl Into<String>, rule: AggregateRule) -> Self {
        Self {
            name: name.into(),
            rule,
        }
    }
}

/// A collection together with the derived structures the store maintains for it
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CollectionSchema {
    pub name: String,
    #[serde(default)]
    pub indexes: Vec<IndexDefinition>,
    #[serde(default)]
    pub aggregates: Vec<AggregateDefinition>,
}

impl CollectionSchema {
    /// Collection without indexes or aggregates
    pub fn plain(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            indexes: Vec::new(),
            aggregates: Vec::new(),
        }
    }

    pub fn with_index(mut self, index: IndexDefinition) -> Self {
        self.indexes.push(index);
        self
    }

    pub fn with_aggregate(mut self, aggregate: AggregateDefinition) -> Self {
        self.aggregates.push(aggregate);
        self
    }

    pub fn index(&self, name: &str) -> Option<&IndexDefinition> {
        self.indexes.iter().find(|i| i.name == name)
    }

    pub fn aggregate(&self, name: &str) -> Option<&AggregateDefinition> {
        self.aggregates.iter().find(|a| a.name == name)
    }
}

/// Quote a string as a JavaScript literal
fn js_string(s: &str) -> String {
    Value::String(s.to_string()).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn lincoln_omaha() -> AggregateRule {
        AggregateRule::DisplayNameByCities {
            cities: CityPair::new("Lincoln", "Omaha"),
        }
    }

    #[test]
    fn test_index_key_of() {
        let index = IndexDefinition::new("by-name", "lastName");
        assert_eq!(
            index.key_of(&json!({"lastName": "Doe"})),
            Some("Doe".to_string())
        );
        assert_eq!(index.key_of(&json!({"firstName": "Jane"})), None);
        assert_eq!(index.key_of(&json!({"lastName": 7})), None);
    }

    #[test]
    fn test_display_name_rule() {
        let doc = json!({
            "firstName": "Jane", "middleInitial": "A", "lastName": "Doe",
            "city": "Lincoln", "organizationCity": "Omaha"
        });
        assert_eq!(lincoln_omaha().emit(&doc), Some(json!("Jane A. Doe")));

        let elsewhere = json!({
            "firstName": "Jane", "middleInitial": "A", "lastName": "Doe",
            "city": "Lincoln", "organizationCity": "Denver"
        });
        assert_eq!(lincoln_omaha().emit(&elsewhere), None);
    }

    #[test]
    fn test_display_name_rule_skips_unmerged_records() {
        let doc = json!({
            "firstName": "Jane", "middleInitial": "A", "lastName": "Doe", "city": "Lincoln"
        });
        assert_eq!(lincoln_omaha().emit(&doc), None);
    }

    #[test]
    fn test_salary_rule() {
        let rule = AggregateRule::SalaryWhereCitiesMatch;
        assert_eq!(
            rule.emit(&json!({"city": "Omaha", "organizationCity": "Omaha", "salary": 70000})),
            Some(json!(70000))
        );
        assert_eq!(
            rule.emit(&json!({"city": "Lincoln", "organizationCity": "Omaha", "salary": 50000})),
            None
        );
        assert_eq!(
            rule.emit(&json!({"city": "Omaha", "organizationCity": "Omaha"})),
            None
        );
        assert_eq!(rule.emit(&json!({"city": "Omaha", "salary": 1})), None);
    }

    #[test]
    fn test_map_functions_quote_cities() {
        let rule = AggregateRule::DisplayNameByCities {
            cities: CityPair::new("O\"Neill", "Omaha"),
        };
        let source = rule.map_function();
        assert!(source.contains(r#"doc.city === "O\"Neill""#));
        assert!(source.contains(r#"doc.organizationCity === "Omaha""#));

        let index = IndexDefinition::new("by-company", "organizationName");
        assert!(index.map_function().contains(r#"emit(doc["organizationName"], null)"#));
    }

    #[test]
    fn test_display_name_map_requires_name_fields() {
        let source = lincoln_omaha().map_function();
        for field in ["firstName", "middleInitial", "lastName"] {
            assert!(
                source.contains(&format!("typeof doc.{} === \"string\"", field)),
                "{} is not guarded in {}",
                field,
                source
            );
        }

        // the in-memory rule agrees: a record missing a name part emits nothing
        let nameless = json!({
            "middleInitial": "A", "lastName": "Doe",
            "city": "Lincoln", "organizationCity": "Omaha"
        });
        assert_eq!(lincoln_omaha().emit(&nameless), None);
    }

    #[test]
    fn test_schema_lookup() {
        let schema = CollectionSchema::plain("employment-combined")
            .with_index(IndexDefinition::new("by-name", "lastName"))
            .with_aggregate(AggregateDefinition::new(
                "query-2",
                AggregateRule::SalaryWhereCitiesMatch,
            ));

        assert!(schema.index("by-name").is_some());
        assert!(schema.index("by-company").is_none());
        assert!(schema.aggregate("query-2").is_some());
    }
}
