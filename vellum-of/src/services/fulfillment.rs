//! Fulfillment pipeline
//!
//! Drives a paid order from diagnostic intake to a delivered ebook: plan the
//! chapters, generate them strictly in order, persist after every completed
//! chapter, then attach the bonus assets in one atomic completion write.
//! Every stage is re-entrant; `resume` restarts an interrupted run from the
//! persisted per-chapter statuses without regenerating finished work.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::Utc;
use thiserror::Error;
use tracing::{debug, error, info, warn};

use vellum_common::events::{EventBus, VellumEvent};
use vellum_common::model::{Book, ChapterStatus, Language, Order, OrderStatus, Tier};

use crate::db::{OrderStore, StoreError};
use crate::models::BookDraft;
use crate::services::chapter_plan::{chapter_plan, PlanPolicy};
use crate::services::notifier::{Notifier, TAG_EBOOK_READY};
use crate::services::provider::{ChapterRequest, ContentProvider, ProviderError};

/// Progress written when an order enters `generating`, before any chapter
pub const INITIAL_PROGRESS: u8 = 5;

/// Pipeline failure
#[derive(Debug, Error)]
pub enum FulfillmentError {
    /// The order is not in the status the operation requires
    #[error("order {order_id} is {}, expected {expected}", .status.as_str())]
    InvalidState {
        order_id: String,
        status: OrderStatus,
        expected: &'static str,
    },

    /// A `generating` order has no persisted draft to resume from
    #[error("order {0} has no stored draft to resume")]
    MissingDraft(String),

    #[error(transparent)]
    Provider(#[from] ProviderError),

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Progress after the 1-indexed `position`th chapter of `total` completes
///
/// The first 10% is reserved for intake and the last 10% for bonus assets
/// and finalization, so chapter completions always land in (10, 90].
pub fn chapter_progress(position: usize, total: usize) -> u8 {
    (10.0 + (position as f64 / total as f64) * 80.0).round() as u8
}

/// Orchestrates one order's generation run
///
/// Instances share no mutable state; the order store is the sole
/// serialization point, so independent orders can run concurrently.
#[derive(Clone)]
pub struct FulfillmentPipeline {
    store: OrderStore,
    provider: Arc<dyn ContentProvider>,
    notifier: Arc<Notifier>,
    events: EventBus,
}

impl FulfillmentPipeline {
    pub fn new(
        store: OrderStore,
        provider: Arc<dyn ContentProvider>,
        notifier: Arc<Notifier>,
        events: EventBus,
    ) -> Self {
        Self {
            store,
            provider,
            notifier,
            events,
        }
    }

    fn ensure_status(
        &self,
        order: &Order,
        want: OrderStatus,
        expected: &'static str,
    ) -> Result<(), FulfillmentError> {
        if order.status != want {
            return Err(FulfillmentError::InvalidState {
                order_id: order.id.clone(),
                status: order.status,
                expected,
            });
        }
        Ok(())
    }

    /// Diagnostic intake questions for the order's niche and tier
    ///
    /// No persistence: the order is unchanged whether or not the provider
    /// call succeeds.
    pub async fn begin_diagnosis(
        &self,
        order: &Order,
        language: Language,
    ) -> Result<Vec<String>, FulfillmentError> {
        self.ensure_status(order, OrderStatus::PendingForm, "pending_form")?;
        let questions = self
            .provider
            .questions_for(&order.niche, order.tier, language)
            .await?;
        Ok(questions)
    }

    /// Move the order into `generating` and persist the initial draft
    ///
    /// Returns the refreshed order snapshot alongside the draft; the caller
    /// hands both to [`run`](Self::run) on a spawned task.
    pub async fn prepare_generation(
        &self,
        order: &Order,
        answers: &HashMap<String, String>,
        language: Language,
    ) -> Result<(Order, BookDraft), FulfillmentError> {
        self.ensure_status(order, OrderStatus::PendingForm, "pending_form")?;

        let plan = chapter_plan(order.tier, PlanPolicy::Fulfillment);
        let persona_context = serde_json::to_string(answers).unwrap_or_default();
        let draft = BookDraft::new(order.niche.clone(), language, persona_context, plan);

        self.store
            .update_status_and_progress(&order.id, OrderStatus::Generating, INITIAL_PROGRESS)
            .await?;
        self.store.save_draft(&order.id, &draft).await?;

        self.events.emit_lossy(VellumEvent::GenerationStarted {
            order_id: order.id.clone(),
            chapter_count: draft.chapter_count(),
            timestamp: Utc::now(),
        });
        info!(
            order_id = %order.id,
            tier = order.tier.as_str(),
            chapters = draft.chapter_count(),
            "Order entered generation"
        );

        let refreshed = Order {
            status: OrderStatus::Generating,
            progress: INITIAL_PROGRESS,
            ..order.clone()
        };
        Ok((refreshed, draft))
    }

    /// Chapter loop plus finalization; the spawned-task entry point
    pub async fn run(&self, order: &Order, mut draft: BookDraft) -> Result<Book, FulfillmentError> {
        self.run_chapter_loop(order, &mut draft).await?;
        self.finalize(order, draft).await
    }

    /// Generate every non-completed chapter strictly in plan order
    ///
    /// After each successful chapter the draft and the order's progress are
    /// persisted, so an interruption loses at most the chapter in flight.
    /// The first failure halts the loop, reverts that chapter to `pending`
    /// and flips the order to `error` while keeping the last written
    /// progress.
    pub async fn run_chapter_loop(
        &self,
        order: &Order,
        draft: &mut BookDraft,
    ) -> Result<(), FulfillmentError> {
        let total = draft.chapter_count();
        let mut last_progress = order.progress;

        for index in 0..total {
            if draft.chapters[index].status == ChapterStatus::Completed {
                debug!(
                    order_id = %order.id,
                    chapter = %draft.chapters[index].title,
                    "Skipping completed chapter"
                );
                continue;
            }

            let title = draft.chapters[index].title.clone();
            draft.chapters[index].status = ChapterStatus::Generating;
            self.events.emit_lossy(VellumEvent::ChapterStarted {
                order_id: order.id.clone(),
                index,
                title: title.clone(),
                timestamp: Utc::now(),
            });
            info!(
                order_id = %order.id,
                chapter = %title,
                position = index + 1,
                total,
                "Generating chapter"
            );

            let request = ChapterRequest {
                title: &title,
                niche: &order.niche,
                tier: order.tier,
                customer_name: &order.customer_name,
                persona_context: &draft.persona_context,
                language: draft.language,
            };

            // One chapter is one failure unit: no text means no image call
            let produced = match self.provider.chapter_for(&request).await {
                Ok(copy) if copy.image_prompt.trim().is_empty() => Ok((copy.content, None)),
                Ok(copy) => self
                    .provider
                    .image_for(&copy.image_prompt, order.tier)
                    .await
                    .map(|image_url| (copy.content, image_url)),
                Err(e) => Err(e),
            };

            let (content, image_url) = match produced {
                Ok(result) => result,
                Err(e) => {
                    // The persisted draft never saw `generating`; resume
                    // retries this chapter from `pending`
                    draft.chapters[index].status = ChapterStatus::Pending;
                    warn!(order_id = %order.id, chapter = %title, error = %e, "Chapter generation failed");
                    self.mark_failed(&order.id, &title, e.to_string(), last_progress)
                        .await;
                    return Err(e.into());
                }
            };

            let chapter = &mut draft.chapters[index];
            chapter.content = content;
            chapter.image_url = image_url;
            chapter.status = ChapterStatus::Completed;

            let progress = chapter_progress(index + 1, total);
            if let Err(e) = self.persist_chapter(&order.id, draft, progress).await {
                error!(order_id = %order.id, chapter = %title, error = %e, "Failed to persist chapter");
                self.mark_failed(&order.id, &title, e.to_string(), last_progress)
                    .await;
                return Err(e.into());
            }
            last_progress = progress;

            self.events.emit_lossy(VellumEvent::ChapterCompleted {
                order_id: order.id.clone(),
                index,
                title,
                progress,
                timestamp: Utc::now(),
            });
        }

        Ok(())
    }

    async fn persist_chapter(
        &self,
        order_id: &str,
        draft: &BookDraft,
        progress: u8,
    ) -> Result<(), StoreError> {
        self.store.save_draft(order_id, draft).await?;
        self.store
            .update_status_and_progress(order_id, OrderStatus::Generating, progress)
            .await
    }

    async fn mark_failed(&self, order_id: &str, stage: &str, message: String, last_progress: u8) {
        if let Err(e) = self
            .store
            .update_status_and_progress(order_id, OrderStatus::Error, last_progress)
            .await
        {
            error!(order_id = %order_id, error = %e, "Could not persist error status");
        }
        self.events.emit_lossy(VellumEvent::GenerationFailed {
            order_id: order_id.to_string(),
            stage: stage.to_string(),
            message,
            timestamp: Utc::now(),
        });
    }

    /// Attach bonus assets and complete the order
    ///
    /// A failure here leaves the order `generating` at its last progress,
    /// not `error`: a stuck finalization is resumable, a failed chapter is
    /// not.
    pub async fn finalize(
        &self,
        order: &Order,
        draft: BookDraft,
    ) -> Result<Book, FulfillmentError> {
        info!(order_id = %order.id, "Generating bonus assets");
        let language = draft.language;

        let bonuses = match self
            .provider
            .bonuses_for(&order.customer_name, &order.niche, order.tier, language)
            .await
        {
            Ok(bonuses) => bonuses,
            Err(e) => {
                warn!(order_id = %order.id, error = %e, "Bonus generation failed");
                self.events.emit_lossy(VellumEvent::GenerationFailed {
                    order_id: order.id.clone(),
                    stage: "bonuses".to_string(),
                    message: e.to_string(),
                    timestamp: Utc::now(),
                });
                return Err(e.into());
            }
        };

        let book = draft.into_book(bonuses);
        if let Err(e) = self.store.save_artifact(&order.id, &book).await {
            warn!(order_id = %order.id, error = %e, "Artifact save failed");
            self.events.emit_lossy(VellumEvent::GenerationFailed {
                order_id: order.id.clone(),
                stage: "finalize".to_string(),
                message: e.to_string(),
                timestamp: Utc::now(),
            });
            return Err(e.into());
        }

        // The completion write above is authoritative; delivery email and
        // community access are best-effort
        self.notifier
            .notify(&order.customer_email, &order.customer_name, TAG_EBOOK_READY)
            .await;
        if order.tier == Tier::Premium {
            self.notifier
                .grant_community_access(&order.customer_email)
                .await;
        }

        self.events.emit_lossy(VellumEvent::OrderCompleted {
            order_id: order.id.clone(),
            chapter_count: book.chapters.len(),
            bonus_count: book.bonuses.len(),
            timestamp: Utc::now(),
        });
        info!(
            order_id = %order.id,
            chapters = book.chapters.len(),
            bonuses = book.bonuses.len(),
            "Order fulfilled"
        );
        Ok(book)
    }

    /// Validate that an order can resume and load its persisted draft
    ///
    /// Only `generating` orders resume; anything else refuses with an
    /// invalid-state error, and a `generating` order without a stored draft
    /// refuses with [`FulfillmentError::MissingDraft`].
    pub async fn prepare_resume(
        &self,
        order_id: &str,
    ) -> Result<(Order, BookDraft), FulfillmentError> {
        let order = self.store.get_by_id(order_id).await?;
        self.ensure_status(&order, OrderStatus::Generating, "generating")?;

        let draft = self
            .store
            .load_draft(order_id)
            .await?
            .ok_or_else(|| FulfillmentError::MissingDraft(order_id.to_string()))?;

        info!(
            order_id = %order_id,
            completed = draft.completed_count(),
            total = draft.chapter_count(),
            "Resuming generation"
        );
        Ok((order, draft))
    }

    /// Restart an interrupted run from the persisted per-chapter statuses
    ///
    /// Completed chapters are skipped, so no provider call is repeated for
    /// finished work.
    pub async fn resume(&self, order_id: &str) -> Result<Book, FulfillmentError> {
        let (order, draft) = self.prepare_resume(order_id).await?;
        self.run(&order, draft).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn progress_reserves_head_and_tail() {
        assert_eq!(chapter_progress(1, 3), 37);
        assert_eq!(chapter_progress(2, 3), 63);
        assert_eq!(chapter_progress(3, 3), 90);
    }

    #[test]
    fn progress_sequence_for_five_chapters() {
        let seq: Vec<u8> = (1..=5).map(|i| chapter_progress(i, 5)).collect();
        assert_eq!(seq, vec![26, 42, 58, 74, 90]);
    }

    #[test]
    fn progress_is_strictly_increasing_and_ends_at_ninety() {
        for total in 1..=10 {
            let mut prev = INITIAL_PROGRESS;
            for position in 1..=total {
                let progress = chapter_progress(position, total);
                assert!(progress > prev, "{} of {}", position, total);
                prev = progress;
            }
            assert_eq!(chapter_progress(total, total), 90);
        }
    }
}
