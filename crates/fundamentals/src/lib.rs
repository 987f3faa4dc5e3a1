#![doc(issue_tracker_base_url = "https://github.com/factordynamics/fundamentals/issues/")]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

//! Reconcile XBRL company facts into a normalized metric store.
//!
//! This crate ties the workspace together. It re-exports the core types, the
//! extraction engine, the store implementations and the SEC EDGAR provider,
//! and provides the [`Reconciler`] that runs a company's facts through
//! extraction and into a [`MetricStore`] in a single transaction.
//!
//! # Features
//!
//! - `edgar` - SEC EDGAR facts provider
//! - `store-sqlite` - SQLite-based metric store
//!
//! # Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use fundamentals::{CikDirectory, Cik, EdgarProvider, InMemoryStore, Reconciler, ReconcilerConfig, Symbol};
//!
//! #[tokio::main]
//! async fn main() -> fundamentals::Result<()> {
//!     let provider = EdgarProvider::new("MyApp/1.0 (contact@example.com)")?;
//!     let config = ReconcilerConfig::default()
//!         .with_ciks(CikDirectory::new().with("AAPL", Cik::new("320193")?));
//!     let reconciler = Reconciler::new(Arc::new(provider), Arc::new(InMemoryStore::new()))
//!         .with_config(config);
//!
//!     let symbol = Symbol::new("AAPL");
//!     reconciler.import_filings(&symbol).await?;
//!     let summary = reconciler.reconcile(&symbol).await?;
//!     println!("{:?}", summary.metrics_updated);
//!     println!("{}", reconciler.metrics_frame(&symbol)?);
//!
//!     Ok(())
//! }
//! ```

// Core types and traits
pub use fundamentals_core::*;

// Extraction engine
pub use fundamentals_extract as extract;
pub use fundamentals_extract::{ExtractOptions, Series, extract_metrics};

// Store implementations
#[cfg(feature = "store-sqlite")]
pub use fundamentals_store::SqliteStore;
pub use fundamentals_store::InMemoryStore;

// Providers
#[cfg(feature = "edgar")]
pub use fundamentals_edgar::EdgarProvider;

/// Reconciler configuration.
pub mod config;
/// Wide DataFrame export.
pub mod frame;
mod reconciler;
/// Run summaries.
pub mod summary;

pub use config::{CikDirectory, ReconcilerConfig};
pub use frame::series_frame;
pub use reconciler::{IMPORTED_STATUS, Reconciler};
pub use summary::{ImportSummary, ReconcileStatus, ReconcileSummary};
