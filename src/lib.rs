//! # Seller Sync
//!
//! Ingestion engine for marketplace seller reports and catalogue cards: a
//! job-queue-driven poller that paces and retries calls to the marketplace API,
//! splits long periods into API-compatible windows, normalizes and deduplicates
//! records, and drives each job to a terminal status.

pub mod config;
pub mod db;
pub mod error;
pub mod hashing;
pub mod marketplace;
pub mod models;
pub mod normalization;
pub mod paginator;
pub mod planner;
pub mod repositories;
pub mod scheduler;
pub mod sync_executor;
pub mod telemetry;
pub use migration;
