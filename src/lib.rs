//! Attributor - influencer attribution and analytics engine
//!
//! Credits conversion events to influencers (coupon, then referral code, then
//! landing URL), computes revenue-share payouts and serves dashboard
//! aggregations over clicks and events.
//!
//! # Architecture
//! - `storage`: SeaORM backend (SQLite / MySQL / PostgreSQL) and repository traits
//! - `services`: attribution, payouts, ingestion, stats, code issuance, redirects
//! - `analytics`: click logging
//! - `api`: HTTP handlers and middleware
//! - `config`: static configuration (TOML + environment)
//! - `runtime`: startup wiring, HTTP server and CLI commands
//! - `system`: logging

pub mod analytics;
pub mod api;
pub mod cli;
pub mod config;
pub mod errors;
pub mod runtime;
pub mod services;
pub mod storage;
pub mod system;
pub mod utils;
