//! # Memory Recall
//!
//! Answers a free-text memory query ("that evening by the tower") with a
//! single media item and its metadata.
//!
//! The decision logic lives in [`memory_recall_core`]; this crate supplies
//! the concrete collaborators, configuration, HTTP server, and CLI.
//!
//! ## Architecture
//!
//! ```text
//!                 ┌──────────────┐
//!   GET /gif_…  ─▶│   Resolver   │◀─ recall resolve
//!                 └──────┬───────┘
//!         ┌──────────────┼───────────────┐
//!         ▼              ▼               ▼
//!  ┌────────────┐ ┌─────────────┐ ┌─────────────┐
//!  │ Retriever  │ │  Metadata   │ │  Rewriter   │
//!  │   (HTTP)   │ │ SQLite/REST │ │ viarag/oai  │
//!  └────────────┘ └─────────────┘ └─────────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```bash
//! recall init                         # create the metadata table
//! recall import ./gifs.json           # load records
//! recall select "paris at night" --explain
//! recall resolve "paris at night"
//! recall serve                        # start HTTP server
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration parsing |
//! | [`retriever`] | HTTP context retriever |
//! | [`rewriter`] | Rewriter providers |
//! | [`sqlite_store`] | SQLite metadata store |
//! | [`postgrest_store`] | PostgREST metadata store |
//! | [`migrate`] | Schema creation |
//! | [`import`] | Bulk record import |
//! | [`resolve`] | Resolver wiring and CLI commands |
//! | [`server`] | HTTP server |
//! | [`logging`] | Tracing setup |

pub mod config;
pub mod http_client;
pub mod import;
pub mod logging;
pub mod migrate;
pub mod postgrest_store;
pub mod resolve;
pub mod retriever;
pub mod rewriter;
pub mod server;
pub mod sqlite_store;
