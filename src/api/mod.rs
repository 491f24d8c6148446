//! HTTP layer
//!
//! - `middleware`: request id span, tenant resolution
//! - `services`: handlers, response envelope, route tables

pub mod middleware;
pub mod services;
