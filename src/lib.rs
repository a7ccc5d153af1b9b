//! # clipvault
//!
//! A self-hosted content-capture service: upload images, PDFs, and text
//! files together with AI-derived metadata (summary, tags, category), then
//! browse the captured clips through a filtered, searchable listing.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────┐   ┌──────────────┐   ┌───────────────┐
//! │  HTTP / CLI  │──▶│ ClipService  │──▶│  BlobStore     │
//! │  upload      │   │ orchestrate  │   │ (filesystem)  │
//! └──────────────┘   └──────┬───────┘   └───────────────┘
//!                           │
//!                           ▼
//!                    ┌──────────────┐
//!                    │ Repository   │
//!                    │  (SQLite)    │
//!                    └──────────────┘
//! ```
//!
//! Ingest writes the blob before the metadata row and cleans up the blob if
//! the insert fails; remove deletes the blob before the row. The analysis
//! call is an injected provider — a failed analysis aborts the capture.
//!
//! ## Quick Start
//!
//! ```bash
//! clipvault init                    # create database
//! clipvault ingest photo.png        # capture a file (needs an analysis provider)
//! clipvault search "beach"          # find clips
//! clipvault serve                   # start the HTTP API
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration parsing |
//! | [`models`] | Core data types |
//! | [`store`] | Blob storage abstraction + filesystem backend |
//! | [`repo`] | Clip metadata repository + SQLite backend |
//! | [`analysis`] | AI analysis provider abstraction |
//! | [`extract`] | Text extraction for PDFs and text files |
//! | [`service`] | Ingest/search/remove orchestration |
//! | [`server`] | HTTP API server |
//! | [`db`] | Database connection |
//! | [`migrate`] | Schema migrations |

pub mod analysis;
pub mod config;
pub mod db;
pub mod error;
pub mod extract;
pub mod ingest;
pub mod migrate;
pub mod models;
pub mod repo;
pub mod server;
pub mod service;
pub mod stats;
pub mod store;
pub mod tags;
