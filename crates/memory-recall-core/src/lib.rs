//! # Memory Recall Core
//!
//! Runtime-agnostic logic for Memory Recall: the fragment and record models,
//! the error taxonomy, the collaborator traits, the majority-vote selector,
//! and the [`Resolver`](resolve::Resolver) pipeline that ties them together.
//!
//! This crate contains no tokio runtime, sqlx, or HTTP client. Concrete
//! collaborators (HTTP retriever, SQLite store, rewriter clients) live in
//! the `memory-recall` application crate; [`memory`] provides in-process
//! implementations for tests.
//!
//! ## Pipeline
//!
//! ```text
//! query ─▶ normalize ─▶ match_context ─▶ majority vote ─▶ lookup ─▶ enrich ─▶ record
//!          (rewriter)    (retriever)     + τ gate        (store)   (rewriter)
//! ```

pub mod collaborators;
pub mod error;
pub mod memory;
pub mod models;
pub mod prompts;
pub mod resolve;
pub mod select;
