//! # workforce
//!
//! Two fixed employment questions answered over a document store, under two
//! data layouts:
//!
//! - *separate*: people, organizations and employment links stored as tagged
//!   records in one collection and joined in memory
//! - *combined*: one denormalized record per person, enriched by the merge
//!   engine through index lookups and revision-checked writes, with the
//!   answers read from store-maintained aggregates
//!
//! ## Modules
//!
//! - `model` - record shapes for both layouts
//! - `storage` - the `DocumentStore` capability with memory and CouchDB backends
//! - `index` - typed secondary-index lookups and the match policy
//! - `merge` - two-phase merge of link and organization facts
//! - `join` - in-memory evaluation of both questions
//! - `aggregate` - typed reads of the precomputed answers
//! - `modes` - the two layouts behind one service trait
//! - `server` - HTTP endpoints and the response envelope
//! - `app` / `cli` - configuration, logging and process entry points
pub mod aggregate;
pub mod app;
pub mod cli;
pub mod error;
pub mod index;
pub mod join;
pub mod merge;
pub mod model;
pub mod modes;
pub mod seed;
pub mod server;
pub mod storage;

pub use error::{Error, Result};
