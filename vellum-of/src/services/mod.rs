//! Service modules for order fulfillment
//!
//! The content provider seam and its Gemini implementation, the fulfillment
//! pipeline that drives orders through it, chapter planning, and the
//! best-effort marketing notifier.

pub mod chapter_plan;
pub mod fulfillment;
pub mod gemini;
pub mod notifier;
pub mod provider;

pub use chapter_plan::PlanPolicy;
pub use fulfillment::{FulfillmentError, FulfillmentPipeline, INITIAL_PROGRESS};
pub use gemini::GeminiClient;
pub use notifier::Notifier;
pub use provider::{ChapterCopy, ChapterRequest, ContentProvider, ProviderError};
