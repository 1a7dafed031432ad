//! Order persistence adapter
//!
//! Wraps the SQLite pool behind a small adapter so the rest of the service
//! never touches SQL directly. The store also owns change notification:
//! every successful mutation emits `OrderChanged` on the event bus, and
//! consumers re-fetch rather than trust event payloads.
//!
//! A store without a database runs in declared degraded mode: reads serve a
//! fixed mock order, writes are accepted as logged no-ops (explicitly
//! non-durable), and order creation refuses outright.

use chrono::{DateTime, Utc};
use sqlx::{Row, SqlitePool};
use thiserror::Error;
use tokio::sync::broadcast;
use tracing::{debug, info, warn};

use vellum_common::events::{EventBus, VellumEvent};
use vellum_common::model::{Book, Order, OrderStatus, Tier};

use crate::models::BookDraft;

/// Order store errors
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("order not found: {0}")]
    NotFound(String),

    #[error("order already exists: {0}")]
    Duplicate(String),

    /// Degraded mode refused a write that must not silently vanish
    #[error("order store is not configured, refusing to {0}")]
    NotConfigured(&'static str),

    /// A stored column failed to decode
    #[error("stored payload corrupt: {0}")]
    Corrupt(String),
}

/// Input for order creation (everything the sale webhook knows)
#[derive(Debug, Clone)]
pub struct NewOrder {
    pub id: String,
    pub customer_name: String,
    pub customer_email: String,
    pub tier: Tier,
    pub niche: String,
}

#[derive(Debug, Clone)]
enum Backend {
    Sqlite(SqlitePool),
    Degraded,
}

/// Persistence adapter for orders
#[derive(Debug, Clone)]
pub struct OrderStore {
    backend: Backend,
    events: EventBus,
}

impl OrderStore {
    /// Store backed by an open SQLite pool
    pub fn new(pool: SqlitePool, events: EventBus) -> Self {
        Self {
            backend: Backend::Sqlite(pool),
            events,
        }
    }

    /// Store without a database: mock reads, no-op writes
    pub fn degraded(events: EventBus) -> Self {
        warn!("Order store running in degraded mode: writes are not durable");
        Self {
            backend: Backend::Degraded,
            events,
        }
    }

    pub fn is_degraded(&self) -> bool {
        matches!(self.backend, Backend::Degraded)
    }

    /// Subscribe to store change notifications
    ///
    /// Events signal that a row changed; subscribers re-fetch current state.
    pub fn subscribe(&self) -> broadcast::Receiver<VellumEvent> {
        self.events.subscribe()
    }

    /// Create a new order in `pending_form`
    pub async fn create(&self, new: NewOrder) -> Result<Order, StoreError> {
        let pool = match &self.backend {
            Backend::Sqlite(pool) => pool,
            Backend::Degraded => return Err(StoreError::NotConfigured("create orders")),
        };

        let order = Order {
            id: new.id,
            customer_name: new.customer_name,
            customer_email: new.customer_email,
            tier: new.tier,
            niche: new.niche,
            status: OrderStatus::PendingForm,
            progress: 0,
            ebook_content: None,
            created_at: Utc::now(),
        };

        let result = sqlx::query(
            r#"
            INSERT INTO orders (id, customer_name, customer_email, tier, niche, status, progress, created_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&order.id)
        .bind(&order.customer_name)
        .bind(&order.customer_email)
        .bind(order.tier.as_str())
        .bind(&order.niche)
        .bind(order.status.as_str())
        .bind(order.progress as i64)
        .bind(order.created_at.to_rfc3339())
        .execute(pool)
        .await;

        if let Err(e) = result {
            if let sqlx::Error::Database(db_err) = &e {
                if db_err.kind() == sqlx::error::ErrorKind::UniqueViolation {
                    return Err(StoreError::Duplicate(order.id));
                }
            }
            return Err(e.into());
        }

        info!(order_id = %order.id, tier = order.tier.as_str(), "Order created");
        self.events.emit_lossy(VellumEvent::OrderCreated {
            order_id: order.id.clone(),
            tier: order.tier,
            niche: order.niche.clone(),
            timestamp: Utc::now(),
        });
        self.notify_changed(&order.id);

        Ok(order)
    }

    /// Fetch one order
    pub async fn get_by_id(&self, id: &str) -> Result<Order, StoreError> {
        let pool = match &self.backend {
            Backend::Sqlite(pool) => pool,
            Backend::Degraded => {
                debug!(order_id = %id, "Degraded store serving mock order");
                return Ok(Self::mock_order(id));
            }
        };

        let row = sqlx::query(
            r#"
            SELECT id, customer_name, customer_email, tier, niche, status,
                   progress, ebook_content, created_at
            FROM orders WHERE id = ?
            "#,
        )
        .bind(id)
        .fetch_optional(pool)
        .await?;

        match row {
            Some(row) => map_order_row(&row),
            None => Err(StoreError::NotFound(id.to_string())),
        }
    }

    /// Update lifecycle status and progress percentage in one write
    pub async fn update_status_and_progress(
        &self,
        id: &str,
        status: OrderStatus,
        progress: u8,
    ) -> Result<(), StoreError> {
        let pool = match &self.backend {
            Backend::Sqlite(pool) => pool,
            Backend::Degraded => {
                warn!(order_id = %id, status = status.as_str(), progress,
                      "Degraded store dropping status update (not durable)");
                return Ok(());
            }
        };

        let result = sqlx::query("UPDATE orders SET status = ?, progress = ? WHERE id = ?")
            .bind(status.as_str())
            .bind(progress as i64)
            .bind(id)
            .execute(pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound(id.to_string()));
        }

        debug!(order_id = %id, status = status.as_str(), progress, "Order status updated");
        self.notify_changed(id);
        Ok(())
    }

    /// Persist the in-flight draft
    pub async fn save_draft(&self, id: &str, draft: &BookDraft) -> Result<(), StoreError> {
        let pool = match &self.backend {
            Backend::Sqlite(pool) => pool,
            Backend::Degraded => {
                debug!(order_id = %id, "Degraded store dropping draft save");
                return Ok(());
            }
        };

        let json = serde_json::to_string(draft)
            .map_err(|e| StoreError::Corrupt(format!("serialize draft: {}", e)))?;

        let result = sqlx::query("UPDATE orders SET draft_content = ? WHERE id = ?")
            .bind(json)
            .bind(id)
            .execute(pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound(id.to_string()));
        }

        self.notify_changed(id);
        Ok(())
    }

    /// Load the in-flight draft, if one was persisted
    pub async fn load_draft(&self, id: &str) -> Result<Option<BookDraft>, StoreError> {
        let pool = match &self.backend {
            Backend::Sqlite(pool) => pool,
            Backend::Degraded => return Ok(None),
        };

        let row = sqlx::query("SELECT draft_content FROM orders WHERE id = ?")
            .bind(id)
            .fetch_optional(pool)
            .await?;

        let row = row.ok_or_else(|| StoreError::NotFound(id.to_string()))?;
        let draft_json: Option<String> = row.get("draft_content");

        match draft_json {
            Some(json) => {
                let draft = serde_json::from_str(&json)
                    .map_err(|e| StoreError::Corrupt(format!("decode draft: {}", e)))?;
                Ok(Some(draft))
            }
            None => Ok(None),
        }
    }

    /// The completion write: artifact, `completed`, progress 100, draft
    /// cleared, all in one UPDATE so no intermediate state is observable
    pub async fn save_artifact(&self, id: &str, book: &Book) -> Result<(), StoreError> {
        let pool = match &self.backend {
            Backend::Sqlite(pool) => pool,
            Backend::Degraded => {
                info!(order_id = %id, chapters = book.chapters.len(),
                      "Degraded store acknowledging artifact save (not durable)");
                return Ok(());
            }
        };

        let json = serde_json::to_string(book)
            .map_err(|e| StoreError::Corrupt(format!("serialize book: {}", e)))?;

        let result = sqlx::query(
            r#"
            UPDATE orders
            SET ebook_content = ?, status = 'completed', progress = 100, draft_content = NULL
            WHERE id = ?
            "#,
        )
        .bind(json)
        .bind(id)
        .execute(pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound(id.to_string()));
        }

        info!(order_id = %id, chapters = book.chapters.len(), bonuses = book.bonuses.len(),
              "Artifact saved, order completed");
        self.notify_changed(id);
        Ok(())
    }

    /// All orders, newest first
    pub async fn list_all(&self) -> Result<Vec<Order>, StoreError> {
        let pool = match &self.backend {
            Backend::Sqlite(pool) => pool,
            Backend::Degraded => return Ok(Vec::new()),
        };

        let rows = sqlx::query(
            r#"
            SELECT id, customer_name, customer_email, tier, niche, status,
                   progress, ebook_content, created_at
            FROM orders ORDER BY created_at DESC
            "#,
        )
        .fetch_all(pool)
        .await?;

        rows.iter().map(map_order_row).collect()
    }

    fn notify_changed(&self, id: &str) {
        self.events.emit_lossy(VellumEvent::OrderChanged {
            order_id: id.to_string(),
            timestamp: Utc::now(),
        });
    }

    /// Fixed order served by degraded reads so the flow stays demonstrable
    fn mock_order(id: &str) -> Order {
        Order {
            id: id.to_string(),
            customer_name: "Sample Customer (offline)".to_string(),
            customer_email: "sample@vellum.invalid".to_string(),
            tier: Tier::Premium,
            niche: "Biohacking".to_string(),
            status: OrderStatus::PendingForm,
            progress: 0,
            ebook_content: None,
            created_at: Utc::now(),
        }
    }
}

fn map_order_row(row: &sqlx::sqlite::SqliteRow) -> Result<Order, StoreError> {
    let tier_str: String = row.get("tier");
    let tier = Tier::from_str(&tier_str)
        .ok_or_else(|| StoreError::Corrupt(format!("unknown tier: {}", tier_str)))?;

    let status_str: String = row.get("status");
    let status = OrderStatus::from_str(&status_str)
        .ok_or_else(|| StoreError::Corrupt(format!("unknown status: {}", status_str)))?;

    let ebook_json: Option<String> = row.get("ebook_content");
    let ebook_content = match ebook_json {
        Some(json) => Some(
            serde_json::from_str(&json)
                .map_err(|e| StoreError::Corrupt(format!("decode ebook: {}", e)))?,
        ),
        None => None,
    };

    let created_str: String = row.get("created_at");
    let created_at = DateTime::parse_from_rfc3339(&created_str)
        .map_err(|e| StoreError::Corrupt(format!("decode created_at: {}", e)))?
        .with_timezone(&Utc);

    let progress: i64 = row.get("progress");

    Ok(Order {
        id: row.get("id"),
        customer_name: row.get("customer_name"),
        customer_email: row.get("customer_email"),
        tier,
        niche: row.get("niche"),
        status,
        progress: progress.clamp(0, 100) as u8,
        ebook_content,
        created_at,
    })
}
