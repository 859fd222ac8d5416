//! Testing utilities for lineage pipelines.
//!
//! This module provides:
//! - Static upstream doubles with canned Horizon and directory responses
//! - JSON fixtures shaped like real Horizon payloads
//! - A harness wiring in-memory stores, a manual clock and fast retries

pub mod fixtures;
mod harness;
mod upstream;

pub use harness::{fast_retry_config, TestHarness};
pub use upstream::{StaticDirectoryApi, StaticHorizonApi};
