//! harvest - incremental listing-site harvester.
//!
//! Crawls paginated listing sites into a deduplicated record store with
//! resumable checkpoints, and merges selected downloadable files into a
//! single artifact through a small web picker.

pub mod cli;
pub mod config;
pub mod models;
pub mod repository;
pub mod scrapers;
pub mod server;
pub mod services;
pub mod utils;
