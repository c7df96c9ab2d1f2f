//! cryptofolio-rebalancer: periodic target-weight rebalancing of a crypto basket.
//!
//! Reads the basket and schedule from a TOML file, pulls a snapshot from a
//! market/position source, computes trades with the `cryptofolio` core,
//! submits them to an execution venue, and records every step in a JSONL
//! audit trail.

pub mod audit;
pub mod config;
pub mod cycle;
pub mod error;
pub mod scheduler;
pub mod source;
