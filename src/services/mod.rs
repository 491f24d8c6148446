//! Service layer for business logic
//!
//! Attribution, payouts, ingestion, stats and code issuance. HTTP handlers
//! and the CLI both go through these types.

pub mod attribution;
mod code_issuer;
mod ingestion;
mod redirect;
pub mod revenue_share;
mod stats_service;

pub use attribution::{AttributionResolver, extract_ref_code};
pub use code_issuer::*;
pub use ingestion::*;
pub use redirect::*;
pub use revenue_share::{RevenueShareCalculator, compute_payout, group_payout};
pub use stats_service::*;
