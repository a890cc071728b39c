//! # PressPaper
//!
//! Ingests government publication listings into a local SQLite article
//! store: link discovery across paginated category listings, HTML and PDF
//! text extraction, junk filtering, keyword topic tagging, and idempotent
//! upsert by URL. Stored articles can then be browsed, saved, annotated,
//! summarised and translated from the CLI.
//!
//! ## Architecture
//!
//! ```text
//! ┌───────────┐   ┌───────────┐   ┌───────────┐   ┌──────────┐
//! │ Collector │──▶│ Extractor │──▶│ Topics    │──▶│  SQLite  │
//! │ listings  │   │ HTML/PDF  │   │ keywords  │   │ articles │
//! └───────────┘   └───────────┘   └───────────┘   └────┬─────┘
//!       ▲                                              │
//!       │ Pipeline::run                    ┌───────────┤
//!  ┌────┴──────────────┐                   ▼           ▼
//!  │ CLI / POST /run / │             ┌──────────┐ ┌──────────┐
//!  │ scheduler         │             │   CLI    │ │ AI text  │
//!  └───────────────────┘             │  (list)  │ │ services │
//!                                    └──────────┘ └──────────┘
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration parsing and env overrides |
//! | [`error`] | Typed errors |
//! | [`models`] | Core data types |
//! | [`fetch`] | Fetcher trait, HTTP and headless-browser strategies |
//! | [`html`] | Shared HTML text helpers |
//! | [`collect`] | Listing walk and link filtering |
//! | [`extract`] | HTML/PDF text extraction and junk sizing |
//! | [`topics`] | Keyword topic classifier |
//! | [`store`] | Article store trait and SQLite implementation |
//! | [`ingest`] | Pipeline orchestration |
//! | [`scheduler`] | Repeating background runs |
//! | [`server`] | HTTP trigger surface |
//! | [`ai`] | Summary, translation and context services |
//! | [`articles`] | CLI commands over stored articles |
//! | [`db`] | Database connection |
//! | [`migrate`] | Schema migrations |

pub mod ai;
pub mod articles;
pub mod collect;
pub mod config;
pub mod db;
pub mod error;
pub mod extract;
pub mod fetch;
pub mod html;
pub mod ingest;
pub mod migrate;
pub mod models;
pub mod scheduler;
pub mod server;
pub mod store;
pub mod topics;
