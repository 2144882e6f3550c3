//! CouchBackend against a small in-process CouchDB stand-in
//!
//! The stand-in keeps documents per database in id order, checks `?rev=` on
//! writes and answers 409 on a stale revision, like CouchDB does.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, put};
use axum::{Json, Router};
use serde_json::{json, Value};
use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::net::TcpListener;
use workforce::index::{ByLastName, ByOrganization, TypedIndex};
use workforce::storage::{
    CollectionSchema, CouchBackend, CouchConfig, DocumentStore, Revision, StorageError,
};

/// database -> document id -> (generation, content)
type Databases = Arc<Mutex<HashMap<String, BTreeMap<String, (u64, Value)>>>>;

fn revision(generation: u64) -> String {
    format!("{}-{:032x}", generation, generation)
}

fn with_meta(id: &str, generation: u64, content: &Value) -> Value {
    let mut doc = content.clone();
    if let Value::Object(fields) = &mut doc {
        fields.insert("_id".to_string(), json!(id));
        fields.insert("_rev".to_string(), json!(revision(generation)));
    }
    doc
}

fn couch_error(status: StatusCode, error: &str) -> Response {
    (status, Json(json!({"error": error, "reason": error}))).into_response()
}

async fn welcome() -> Json<Value> {
    Json(json!({"couchdb": "Welcome", "version": "3.3.3"}))
}

async fn create_db(State(dbs): State<Databases>, Path(db): Path<String>) -> Response {
    let mut dbs = dbs.lock().unwrap();
    if dbs.contains_key(&db) {
        return couch_error(StatusCode::PRECONDITION_FAILED, "file_exists");
    }
    dbs.insert(db, BTreeMap::new());
    (StatusCode::CREATED, Json(json!({"ok": true}))).into_response()
}

async fn db_info(State(dbs): State<Databases>, Path(db): Path<String>) -> Response {
    match dbs.lock().unwrap().get(&db) {
        Some(docs) => Json(json!({"db_name": db, "doc_count": docs.len()})).into_response(),
        None => couch_error(StatusCode::NOT_FOUND, "not_found"),
    }
}

fn write(
    dbs: &Databases,
    db: &str,
    id: String,
    rev: Option<&String>,
    content: Value,
) -> Response {
    let mut dbs = dbs.lock().unwrap();
    let Some(docs) = dbs.get_mut(db) else {
        return couch_error(StatusCode::NOT_FOUND, "not_found");
    };

    let current = docs.get(&id).map(|(generation, _)| revision(*generation));
    if current.as_ref() != rev {
        return couch_error(StatusCode::CONFLICT, "conflict");
    }

    let generation = docs.get(&id).map_or(1, |(generation, _)| generation + 1);
    docs.insert(id.clone(), (generation, content));
    (
        StatusCode::CREATED,
        Json(json!({"ok": true, "id": id, "rev": revision(generation)})),
    )
        .into_response()
}

async fn put_doc(
    State(dbs): State<Databases>,
    Path((db, id)): Path<(String, String)>,
    Query(params): Query<HashMap<String, String>>,
    Json(content): Json<Value>,
) -> Response {
    write(&dbs, &db, id, params.get("rev"), content)
}

async fn put_design(
    State(dbs): State<Databases>,
    Path((db, design)): Path<(String, String)>,
    Json(content): Json<Value>,
) -> Response {
    write(&dbs, &db, format!("_design/{}", design), None, content)
}

async fn all_docs(
    State(dbs): State<Databases>,
    Path((db, id)): Path<(String, String)>,
) -> Response {
    if id != "_all_docs" {
        return couch_error(StatusCode::NOT_FOUND, "not_found");
    }
    let dbs = dbs.lock().unwrap();
    let Some(docs) = dbs.get(&db) else {
        return couch_error(StatusCode::NOT_FOUND, "not_found");
    };
    let rows: Vec<Value> = docs
        .iter()
        .map(|(id, (generation, content))| {
            json!({
                "id": id,
                "key": id,
                "value": {"rev": revision(*generation)},
                "doc": with_meta(id, *generation, content),
            })
        })
        .collect();
    Json(json!({"total_rows": rows.len(), "offset": 0, "rows": rows})).into_response()
}

/// Index views only; rows with equal keys come back in id order
async fn view(
    State(dbs): State<Databases>,
    Path((db, _design, view)): Path<(String, String, String)>,
    Query(params): Query<HashMap<String, String>>,
) -> Response {
    let field = match view.as_str() {
        "by-name" => "lastName",
        "by-company" => "organizationName",
        _ => return couch_error(StatusCode::NOT_FOUND, "missing_named_view"),
    };
    let key: Value = match params.get("key").map(|k| serde_json::from_str(k)) {
        Some(Ok(key)) => key,
        _ => return couch_error(StatusCode::BAD_REQUEST, "bad_request"),
    };

    let dbs = dbs.lock().unwrap();
    let Some(docs) = dbs.get(&db) else {
        return couch_error(StatusCode::NOT_FOUND, "not_found");
    };
    let rows: Vec<Value> = docs
        .iter()
        .filter(|(_, (_, content))| content.get(field) == Some(&key))
        .map(|(id, (generation, content))| {
            json!({"id": id, "key": key, "value": null, "doc": with_meta(id, *generation, content)})
        })
        .collect();
    Json(json!({"rows": rows})).into_response()
}

async fn spawn_couch() -> CouchBackend {
    let dbs: Databases = Arc::default();
    let app = Router::new()
        .route("/", get(welcome))
        .route("/{db}", put(create_db).get(db_info))
        .route("/{db}/{id}", put(put_doc).get(all_docs))
        .route("/{db}/_design/{design}", put(put_design))
        .route("/{db}/_design/{design}/_view/{view}", get(view))
        .with_state(dbs);

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    CouchBackend::new(&CouchConfig {
        url: format!("http://{}", addr),
        username: Some("admin".to_string()),
        password: Some("secret".to_string()),
        timeout: Duration::from_secs(5),
    })
    .unwrap()
}

fn schema() -> CollectionSchema {
    CollectionSchema::plain("employment-combined")
        .with_index(ByLastName::definition())
        .with_index(ByOrganization::definition())
}

#[tokio::test]
async fn test_create_and_exists() {
    let couch = spawn_couch().await;

    assert!(!couch.exists("employment-combined").await.unwrap());
    couch.create(&schema()).await.unwrap();
    assert!(couch.exists("employment-combined").await.unwrap());

    let err = couch.create(&schema()).await.unwrap_err();
    assert!(matches!(err, StorageError::AlreadyExists(_)));
}

#[tokio::test]
async fn test_lookup_returns_duplicates_in_insertion_order() {
    let couch = spawn_couch().await;
    couch.create(&schema()).await.unwrap();

    for first in ["Jane", "John", "Jill"] {
        couch
            .insert(
                "employment-combined",
                &json!({"firstName": first, "lastName": "Doe"}),
            )
            .await
            .unwrap();
    }
    couch
        .insert("employment-combined", &json!({"firstName": "Amy", "lastName": "Lee"}))
        .await
        .unwrap();

    let matches = couch
        .get_by_index("employment-combined", "by-name", "Doe")
        .await
        .unwrap();
    let firsts: Vec<_> = matches
        .iter()
        .map(|doc| doc.content["firstName"].as_str().unwrap())
        .collect();
    assert_eq!(firsts, vec!["Jane", "John", "Jill"]);
    assert!(matches.iter().all(|doc| doc.content.get("_id").is_none()));

    let none = couch
        .get_by_index("employment-combined", "by-name", "Nobody")
        .await
        .unwrap();
    assert!(none.is_empty());
}

#[tokio::test]
async fn test_stale_revision_is_conflict() {
    let couch = spawn_couch().await;
    couch.create(&schema()).await.unwrap();

    let receipt = couch
        .insert("employment-combined", &json!({"lastName": "Doe"}))
        .await
        .unwrap();
    let fresh = couch
        .put(
            "employment-combined",
            &receipt.id,
            &json!({"lastName": "Doe", "salary": 1}),
            &receipt.rev,
        )
        .await
        .unwrap();
    assert_eq!(fresh.generation(), Some(2));

    let err = couch
        .put(
            "employment-combined",
            &receipt.id,
            &json!({"lastName": "Doe", "salary": 2}),
            &receipt.rev,
        )
        .await
        .unwrap_err();
    assert!(err.is_conflict());

    let current = couch
        .get_by_index("employment-combined", "by-name", "Doe")
        .await
        .unwrap()
        .remove(0);
    assert_eq!(current.rev, fresh);
    assert_eq!(current.content["salary"], 1);

    let bogus = Revision("9-ffff".to_string());
    assert!(couch
        .put("employment-combined", &receipt.id, &json!({}), &bogus)
        .await
        .unwrap_err()
        .is_conflict());
}

#[tokio::test]
async fn test_all_documents_skips_design_documents() {
    let couch = spawn_couch().await;
    couch.create(&schema()).await.unwrap();

    for n in 0..5 {
        couch
            .insert("employment-combined", &json!({"kind": "person", "n": n}))
            .await
            .unwrap();
    }

    let docs = couch.all_documents("employment-combined").await.unwrap();
    let order: Vec<_> = docs.iter().map(|doc| doc.content["n"].as_u64().unwrap()).collect();
    assert_eq!(order, vec![0, 1, 2, 3, 4]);
    assert!(docs.iter().all(|doc| !doc.id.as_str().starts_with("_design/")));
}

#[tokio::test]
async fn test_missing_collection_is_not_found() {
    let couch = spawn_couch().await;

    let err = couch.all_documents("employment").await.unwrap_err();
    assert!(err.is_not_found());
}

#[tokio::test]
async fn test_health_check() {
    let couch = spawn_couch().await;

    let health = couch.health_check().await.unwrap();
    assert!(health.healthy);
    assert_eq!(health.backend_type, "couch");
    assert!(health.errors.is_empty());
}
