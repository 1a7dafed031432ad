//! # Vellum Common Library
//!
//! Shared code for the Vellum fulfillment services including:
//! - Domain model (orders, tiers, books, bonus assets)
//! - Event types (VellumEvent enum) and the EventBus
//! - Common error types

pub mod error;
pub mod events;
pub mod model;

pub use error::{Error, Result};
