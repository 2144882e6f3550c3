//! HTTP surface: create, insert and query endpoints for both layouts

pub mod envelope;

use anyhow::Result;
use axum::{extract::State, routing::get, Router};
use serde_json::json;
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::cors::CorsLayer;
use tracing::{error, info};

use crate::model::{CityPair, Dataset};
use crate::modes::{Mode, Services};
use crate::storage::DocumentStore;
pub use envelope::Envelope;

/// Shared handler state
#[derive(Clone)]
pub struct AppState {
    pub services: Services,
    pub store: Arc<dyn DocumentStore>,
    /// Dataset written by the insert endpoints
    pub dataset: Arc<Dataset>,
    pub cities: CityPair,
}

/// One endpoint per layout
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    Create,
    Insert,
    QueryA,
    QueryB,
}

impl Operation {
    pub const ALL: [Operation; 4] = [
        Operation::Create,
        Operation::Insert,
        Operation::QueryA,
        Operation::QueryB,
    ];

    pub fn path_segment(&self) -> &'static str {
        match self {
            Operation::Create => "create",
            Operation::Insert => "insert",
            Operation::QueryA => "q1",
            Operation::QueryB => "q2",
        }
    }
}

pub fn router(state: AppState) -> Router {
    let mut router = Router::new().route("/v1/health", get(health));

    for mode in Mode::ALL {
        for operation in Operation::ALL {
            let path = format!("/v1/couch/{}/{}", mode, operation.path_segment());
            router = router.route(
                &path,
                get(move |State(state): State<AppState>| async move {
                    execute(&state, mode, operation).await
                }),
            );
        }
    }

    router
        .fallback(not_found)
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Serve until ctrl-c
pub async fn serve(listener: TcpListener, state: AppState) -> Result<()> {
    info!("Listening on {}", listener.local_addr()?);
    axum::serve(listener, router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
}

/// Run one operation against one layout and wrap the outcome
pub async fn execute(state: &AppState, mode: Mode, operation: Operation) -> Envelope {
    info!("{} {}", mode, operation.path_segment());
    let service = state.services.get(mode);

    let outcome = match operation {
        Operation::Create => service.create().await.map(|_| Envelope::done()),
        Operation::Insert => service.insert(&state.dataset).await.and_then(|summary| {
            Ok(Envelope::done().with_summary(serde_json::to_value(&summary)?))
        }),
        Operation::QueryA => service
            .query_a()
            .await
            .map(|names| Envelope::answers(mode, &task_query_a(&state.cities), json!(names))),
        Operation::QueryB => service
            .query_b()
            .await
            .map(|salaries| Envelope::answers(mode, envelope::TASK_QUERY_B, json!(salaries))),
    };

    outcome.unwrap_or_else(|e| {
        error!("{} {} failed: {}", mode, operation.path_segment(), e);
        Envelope::error(e.to_string())
    })
}

pub fn task_query_a(cities: &CityPair) -> String {
    format!(
        "Find the name of an employee who lives in {} and works in {}.",
        cities.home_city, cities.work_city
    )
}

async fn health(State(state): State<AppState>) -> Envelope {
    match state.store.health_check().await {
        Ok(status) => Envelope::ok(json!(status)),
        Err(e) => Envelope::error(e.to_string()),
    }
}

async fn not_found() -> Envelope {
    Envelope::not_found()
}
