//! # Content Sync Core
//!
//! Runtime-free logic for content-sync: document models, the nbformat
//! serializer, the action alphabet, the state reducer, and the content
//! store trait.
//!
//! This crate contains no tokio, HTTP, or filesystem I/O. Everything that
//! waits on the outside world lives in the `content-sync` crate.

pub mod actions;
pub mod errors;
pub mod models;
pub mod notebook;
pub mod serialize;
pub mod state;
pub mod store;
