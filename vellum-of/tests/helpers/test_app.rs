//! Shared state and store construction for integration tests

use std::sync::Arc;
use std::time::Duration;

use sqlx::sqlite::SqlitePoolOptions;
use vellum_common::events::EventBus;
use vellum_common::model::{Order, OrderStatus, Tier};
use vellum_of::config::{CommunityConfig, MailerConfig};
use vellum_of::db::{init_tables, NewOrder, OrderStore};
use vellum_of::services::Notifier;
use vellum_of::AppState;

use super::MockProvider;

/// In-memory order store
///
/// The pool is capped at one connection: each pooled connection to
/// `sqlite::memory:` would otherwise open its own blank database, and the
/// spawned generation task must see the same tables as the test body.
pub async fn memory_store(events: EventBus) -> OrderStore {
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect("sqlite::memory:")
        .await
        .expect("connect to in-memory database");
    init_tables(&pool).await.expect("initialize tables");
    OrderStore::new(pool, events)
}

/// Notifier with both platform keys absent, so every call runs in mock
/// mode and reports success without network traffic
pub fn mock_notifier() -> Arc<Notifier> {
    let notifier = Notifier::new(
        MailerConfig {
            api_key: None,
            base_url: "http://mailer.invalid/api".to_string(),
            group: "test-buyers".to_string(),
        },
        CommunityConfig {
            api_key: None,
            base_url: "http://community.invalid/v1".to_string(),
            community: "test-community".to_string(),
        },
    )
    .expect("build notifier");
    Arc::new(notifier)
}

/// App state backed by an in-memory store and the given provider
pub async fn test_state(provider: Arc<MockProvider>) -> AppState {
    let events = EventBus::new(100);
    let store = memory_store(events.clone()).await;
    AppState::new(store, provider, mock_notifier(), events)
}

/// App state running without a database
pub fn degraded_state(provider: Arc<MockProvider>) -> AppState {
    let events = EventBus::new(100);
    let store = OrderStore::degraded(events.clone());
    AppState::new(store, provider, mock_notifier(), events)
}

/// Insert one pending_form order with fixed customer details
pub async fn seed_order(store: &OrderStore, id: &str, tier: Tier) -> Order {
    store
        .create(NewOrder {
            id: id.to_string(),
            customer_name: "Ada Lovelace".to_string(),
            customer_email: "ada@example.com".to_string(),
            tier,
            niche: "Biohacking".to_string(),
        })
        .await
        .expect("seed order")
}

/// Poll the store until the order reaches `status` or five seconds pass
pub async fn wait_for_status(store: &OrderStore, id: &str, status: OrderStatus) -> Order {
    let deadline = tokio::time::Instant::now() + Duration::from_secs(5);
    loop {
        let order = store.get_by_id(id).await.expect("load order");
        if order.status == status {
            return order;
        }
        if tokio::time::Instant::now() >= deadline {
            panic!(
                "order {} never reached {:?}, last seen {:?} at progress {}",
                id, status, order.status, order.progress
            );
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
}
