//! Test helper modules for vellum-of integration tests
//!
//! Provides reusable test infrastructure:
//! - MockProvider: scripted content provider with failure injection
//! - test_app: in-memory store, app state and router construction

pub mod mock_provider;
pub mod test_app;

pub use mock_provider::MockProvider;
pub use test_app::{
    degraded_state, memory_store, mock_notifier, seed_order, test_state, wait_for_status,
};
