//! # Stellar Lineage
//!
//! Crawl pipeline and genealogy reconstruction for Stellar account lineage.
//!
//! An account's lineage is the chain of accounts that funded its creation.
//! This crate discovers that chain one record at a time:
//!
//! - **Status ledger**: one durable record per (account, network), whose
//!   status drives everything else
//! - **Stage drivers**: independent workers that claim one record, call an
//!   upstream API, store the raw response and advance the status
//! - **Fleet health**: exhausted retries halt every driver until the health
//!   check clears the fleet after a recovery buffer
//! - **Genealogy**: a cycle-safe creator-chain walker and a tree assembler
//!   rooted at the oldest ancestor
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use stellar_lineage::prelude::*;
//!
//! let ctx = StageContext::builder()
//!     .ledger(Arc::new(InMemoryStatusLedger::new()))
//!     .documents(Arc::new(InMemoryDocumentStore::new()))
//!     .horizon(Arc::new(HorizonClient::new(config.http_timeout())?))
//!     .directory(Arc::new(StellarExpertClient::new(config.http_timeout())?))
//!     .config(config)
//!     .build()?;
//!
//! InquiryService::from_context(&ctx).submit(account, "public").await?;
//! Fleet::standard(&ctx).run(ctx.config().tick_interval(), shutdown).await;
//!
//! let tree = GenealogyService::new(ctx.ledger().clone())
//!     .tree(account, "public")
//!     .await?;
//! ```

#![forbid(unsafe_code)]
#![warn(
    clippy::all,
    clippy::pedantic,
    missing_docs,
    rust_2018_idioms
)]
#![allow(
    clippy::module_name_repetitions,
    clippy::must_use_candidate,
    clippy::missing_errors_doc,
    clippy::missing_panics_doc
)]

pub mod config;
pub mod context;
pub mod core;
pub mod documents;
pub mod errors;
pub mod events;
pub mod genealogy;
pub mod health;
pub mod inquiry;
pub mod ledger;
pub mod observability;
pub mod pipeline;
pub mod stages;
pub mod testing;
pub mod upstream;
pub mod utils;

/// Prelude module for convenient imports
pub mod prelude {
    pub use std::sync::Arc;

    pub use crate::config::{CrawlerConfig, DocumentStoreConfig, NetworkConfig};
    pub use crate::context::{StageContext, StageContextBuilder};
    pub use crate::core::{
        HealthStatus, LineageRecord, LineageStatus, RecordPatch, NO_CREATOR, NO_HOME_DOMAIN,
    };
    #[cfg(feature = "http")]
    pub use crate::documents::HttpDocumentStore;
    pub use crate::documents::{DocumentStore, InMemoryDocumentStore};
    pub use crate::errors::{CycleDetectedError, LineageError, Result, UpstreamError};
    pub use crate::events::{EventSink, LoggingEventSink, NoOpEventSink};
    pub use crate::genealogy::{AncestorChainWalker, GenealogyService, TreeAssembler, TreeNode};
    pub use crate::health::{HealthCheckStage, HealthMonitor, InMemoryCronHealthStore};
    pub use crate::inquiry::{InquiryOutcome, InquiryService};
    pub use crate::ledger::{InMemoryStatusLedger, StatusLedger};
    pub use crate::observability::{init_tracing, LogFormat};
    pub use crate::pipeline::{Fleet, RetryConfig, RetryPolicy, StageDriver, StageOutcome};
    pub use crate::stages::{all_stages, LineageStage};
    #[cfg(feature = "http")]
    pub use crate::upstream::{HorizonClient, StellarExpertClient};
    pub use crate::upstream::{DirectoryApi, HorizonApi};
    pub use crate::utils::{Clock, ManualClock, SystemClock};
}
