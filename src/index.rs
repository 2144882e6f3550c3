//! Index accessor: typed exact-key lookups over store-maintained indexes
//!
//! Each index is declared as a [`TypedIndex`], which fixes its name, the
//! field it is keyed on, and the shape its matches deserialize into. The
//! merge engine only discovers records through this accessor.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

use crate::error::{Error, Result};
use crate::model::DenormalizedEmploymentRecord;
use crate::storage::{DocumentId, DocumentStore, IndexDefinition, Revision, StorageError};

/// A secondary index with a checked projection type
pub trait TypedIndex {
    const NAME: &'static str;
    const KEY_FIELD: &'static str;
    type Content: DeserializeOwned + Send;

    fn definition() -> IndexDefinition {
        IndexDefinition::new(Self::NAME, Self::KEY_FIELD)
    }
}

/// Combined-mode records keyed by the person's last name
pub struct ByLastName;

impl TypedIndex for ByLastName {
    const NAME: &'static str = "by-name";
    const KEY_FIELD: &'static str = "lastName";
    type Content = DenormalizedEmploymentRecord;
}

/// Combined-mode records keyed by the merged organization name
pub struct ByOrganization;

impl TypedIndex for ByOrganization {
    const NAME: &'static str = "by-company";
    const KEY_FIELD: &'static str = "organizationName";
    type Content = DenormalizedEmploymentRecord;
}

/// One index hit: identity, revision and typed content
#[derive(Debug, Clone, PartialEq)]
pub struct IndexMatch<T> {
    pub id: DocumentId,
    pub rev: Revision,
    pub content: T,
}

/// How a key that resolves to several records is handled
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum MatchPolicy {
    /// Take the first record in index order
    #[default]
    FirstMatch,
    /// Fail with `Error::Ambiguous` unless exactly one record matches
    RequireUnique,
}

impl MatchPolicy {
    /// Pick at most one of `matches`
    ///
    /// Zero matches is `Ok(None)`; the caller decides whether that is fatal.
    pub fn select<T>(self, index: &str, key: &str, matches: Vec<T>) -> Result<Option<T>> {
        if self == MatchPolicy::RequireUnique && matches.len() > 1 {
            return Err(Error::ambiguous(index, key, matches.len()));
        }
        Ok(matches.into_iter().next())
    }

    /// Borrowing variant of [`MatchPolicy::select`] for in-memory candidates
    pub fn select_ref<'a, T>(
        self,
        index: &str,
        key: &str,
        mut candidates: impl Iterator<Item = &'a T>,
    ) -> Result<Option<&'a T>> {
        let first = candidates.next();
        if self == MatchPolicy::RequireUnique && first.is_some() {
            let extra = candidates.count();
            if extra > 0 {
                return Err(Error::ambiguous(index, key, extra + 1));
            }
        }
        Ok(first)
    }
}

impl fmt::Display for MatchPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MatchPolicy::FirstMatch => write!(f, "first-match"),
            MatchPolicy::RequireUnique => write!(f, "require-unique"),
        }
    }
}

impl std::str::FromStr for MatchPolicy {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "first-match" | "first" => Ok(MatchPolicy::FirstMatch),
            "require-unique" | "unique" => Ok(MatchPolicy::RequireUnique),
            other => Err(Error::Config(format!("Unknown match policy: {}", other))),
        }
    }
}

/// Typed lookups against one collection
#[derive(Clone)]
pub struct IndexAccessor {
    store: Arc<dyn DocumentStore>,
    collection: String,
}

impl IndexAccessor {
    pub fn new(store: Arc<dyn DocumentStore>, collection: impl Into<String>) -> Self {
        Self {
            store,
            collection: collection.into(),
        }
    }

    pub fn collection(&self) -> &str {
        &self.collection
    }

    /// All records whose index key equals `key`, in index order
    pub async fn lookup<I: TypedIndex>(&self, key: &str) -> Result<Vec<IndexMatch<I::Content>>> {
        let docs = self
            .store
            .get_by_index(&self.collection, I::NAME, key)
            .await?;

        let mut matches = Vec::with_capacity(docs.len());
        for doc in docs {
            let content = serde_json::from_value(doc.content).map_err(|e| {
                StorageError::malformed(format!(
                    "{} hit {} in {}: {}",
                    I::NAME,
                    doc.id,
                    self.collection,
                    e
                ))
            })?;
            matches.push(IndexMatch {
                id: doc.id,
                rev: doc.rev,
                content,
            });
        }
        Ok(matches)
    }

    /// At most one record for `key`, chosen by `policy`
    pub async fn resolve<I: TypedIndex>(
        &self,
        key: &str,
        policy: MatchPolicy,
    ) -> Result<Option<IndexMatch<I::Content>>> {
        let matches = self.lookup::<I>(key).await?;
        policy.select(I::NAME, key, matches)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::{CollectionSchema, MemoryBackend};
    use serde_json::json;

    async fn accessor() -> (Arc<dyn DocumentStore>, IndexAccessor) {
        let store: Arc<dyn DocumentStore> = Arc::new(MemoryBackend::new());
        store
            .create(
                &CollectionSchema::plain("combined")
                    .with_index(ByLastName::definition())
                    .with_index(ByOrganization::definition()),
            )
            .await
            .unwrap();
        let accessor = IndexAccessor::new(Arc::clone(&store), "combined");
        (store, accessor)
    }

    fn person(first: &str, last: &str) -> serde_json::Value {
        json!({
            "firstName": first, "lastName": last, "middleInitial": "Q",
            "street": "1 Main", "city": "Lincoln", "gender": "F"
        })
    }

    #[test]
    fn test_select_policies() {
        let first = MatchPolicy::FirstMatch.select("by-name", "Doe", vec![1, 2]).unwrap();
        assert_eq!(first, Some(1));

        let err = MatchPolicy::RequireUnique
            .select("by-name", "Doe", vec![1, 2])
            .unwrap_err();
        assert!(err.is_ambiguous());

        let none = MatchPolicy::RequireUnique
            .select::<i32>("by-name", "Doe", vec![])
            .unwrap();
        assert_eq!(none, None);
    }

    #[test]
    fn test_select_ref_counts_all_matches() {
        let values = [1, 2, 3];
        let err = MatchPolicy::RequireUnique
            .select_ref("by-name", "Doe", values.iter())
            .unwrap_err();
        match err {
            Error::Ambiguous { matches, .. } => assert_eq!(matches, 3),
            other => panic!("Expected ambiguity, got {:?}", other),
        }

        let one = MatchPolicy::RequireUnique
            .select_ref("by-name", "Doe", values.iter().take(1))
            .unwrap();
        assert_eq!(one, Some(&1));
    }

    #[test]
    fn test_policy_parsing() {
        assert_eq!(
            "require-unique".parse::<MatchPolicy>().unwrap(),
            MatchPolicy::RequireUnique
        );
        assert_eq!(MatchPolicy::default().to_string(), "first-match");
        assert!("whatever".parse::<MatchPolicy>().is_err());

        let policy: MatchPolicy = serde_json::from_str(r#""require-unique""#).unwrap();
        assert_eq!(policy, MatchPolicy::RequireUnique);
    }

    #[tokio::test]
    async fn test_lookup_typed_matches() {
        let (store, accessor) = accessor().await;
        store.insert("combined", &person("Jane", "Doe")).await.unwrap();

        let matches = accessor.lookup::<ByLastName>("Doe").await.unwrap();
        assert_eq!(matches.len(), 1);
        assert_eq!(matches[0].content.person.first_name, "Jane");
        assert_eq!(matches[0].content.organization_name, None);
    }

    #[tokio::test]
    async fn test_lookup_missing_key_is_empty() {
        let (_store, accessor) = accessor().await;
        assert!(accessor.lookup::<ByLastName>("Nobody").await.unwrap().is_empty());
        assert!(accessor
            .resolve::<ByLastName>("Nobody", MatchPolicy::RequireUnique)
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn test_lookup_malformed_content() {
        let (store, accessor) = accessor().await;
        store
            .insert("combined", &json!({"lastName": "Doe", "salary": "lots"}))
            .await
            .unwrap();

        let err = accessor.lookup::<ByLastName>("Doe").await.unwrap_err();
        assert!(matches!(err, Error::Storage(StorageError::Malformed(_))));
    }

    #[tokio::test]
    async fn test_resolve_first_match() {
        let (store, accessor) = accessor().await;
        store.insert("combined", &person("Jane", "Doe")).await.unwrap();
        store.insert("combined", &person("John", "Doe")).await.unwrap();

        let hit = accessor
            .resolve::<ByLastName>("Doe", MatchPolicy::FirstMatch)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(hit.content.person.first_name, "Jane");

        let err = accessor
            .resolve::<ByLastName>("Doe", MatchPolicy::RequireUnique)
            .await
            .unwrap_err();
        assert!(err.is_ambiguous());
    }
}
