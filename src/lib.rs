//! A/B search gateway
//!
//! Serves the same document corpus through several named index
//! configurations so ranking and synonym changes can be compared on live
//! traffic. See [`search`] for the request pipeline and [`engine`] for the
//! engine contract.

pub mod api;
pub mod config;
pub mod corpus;
pub mod engine;
pub mod error;
pub mod metrics;
pub mod search;

pub use error::{AppError, Result};
