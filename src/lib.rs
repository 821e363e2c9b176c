//! # Content Sync
//!
//! Keeps open notebooks and files in sync with a Jupyter contents server.
//!
//! Intents (fetch, save, download) are dispatched onto one ordered action
//! stream. Two pipelines consume it and answer every intent with a result
//! event on the same stream, which also updates document state.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────┐  intents  ┌──────────────────┐  results
//! │ application  │──────────▶│  action stream   │◀──────────────┐
//! └──────────────┘           │ (reduce + fanout)│               │
//!                            └───┬──────────┬───┘               │
//!                                ▼          ▼                   │
//!                     ┌──────────────┐ ┌─────────────────┐      │
//!                     │    fetch     │ │  save/download  │──────┤
//!                     │ latest-wins  │ │ fire-and-forget │      │
//!                     └──────┬───────┘ └───┬─────────┬───┘      │
//!                            ▼             ▼         ▼          │
//!                     ┌─────────────────────┐ ┌─────────────┐   │
//!                     │ contents server     │ │ materializer│   │
//!                     │ (GET/PUT /api/...)  │ │ (downloads) │   │
//!                     └─────────────────────┘ └─────────────┘   │
//!                            └──────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration parsing |
//! | [`jupyter`] | HTTP client for the Jupyter contents API |
//! | [`materialize`] | Local download sink |
//! | [`stream`] | Ordered action stream with single-writer state |
//! | [`fetch`] | Fetch pipeline |
//! | [`save`] | Save/download pipeline |
//! | [`runtime`] | Pipeline wiring and shutdown |
//! | [`commands`] | CLI subcommands |
//!
//! Document models, the notebook serializer, events and the reducer live
//! in the `content_sync_core` crate.

pub mod commands;
pub mod config;
pub mod fetch;
pub mod jupyter;
pub mod materialize;
pub mod runtime;
pub mod save;
pub mod stream;
