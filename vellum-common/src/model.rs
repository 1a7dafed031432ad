//! Domain model shared across the Vellum services
//!
//! Orders progress through a fixed lifecycle while the fulfillment pipeline
//! turns a niche + customer answers into a finished ebook:
//! pending_form → generating → completed | error

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Product tier purchased by the customer
///
/// Wire names (`TIER_1`..`TIER_3`) come from the checkout platform and are
/// stored verbatim; everything tier-dependent (question count, chapter
/// counts, word minimums) hangs off this enum.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Tier {
    #[serde(rename = "TIER_1")]
    Entry,
    #[serde(rename = "TIER_2")]
    Standard,
    #[serde(rename = "TIER_3")]
    Premium,
}

impl Tier {
    /// Wire/database representation
    pub fn as_str(&self) -> &'static str {
        match self {
            Tier::Entry => "TIER_1",
            Tier::Standard => "TIER_2",
            Tier::Premium => "TIER_3",
        }
    }

    /// Parse the wire/database representation
    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "TIER_1" => Some(Tier::Entry),
            "TIER_2" => Some(Tier::Standard),
            "TIER_3" => Some(Tier::Premium),
            _ => None,
        }
    }

    /// Customer-facing tier name, used in prompts and sales copy
    pub fn display_name(&self) -> &'static str {
        match self {
            Tier::Entry => "Essential",
            Tier::Standard => "Professional",
            Tier::Premium => "Elite",
        }
    }

    /// Number of diagnostic questions asked during intake
    pub fn question_count(&self) -> usize {
        match self {
            Tier::Entry => 3,
            Tier::Standard => 6,
            Tier::Premium => 10,
        }
    }

    /// Thematic focus of the diagnostic questions
    pub fn question_focus(&self) -> &'static str {
        match self {
            Tier::Entry => "basic pains and emotional hooks",
            Tier::Standard => "current processes and workflow obstacles",
            Tier::Premium => "deep strategy, KPIs and scaling ambitions",
        }
    }

    /// Chapter count used by the authoring (studio) plan
    pub fn authoring_chapter_count(&self) -> usize {
        match self {
            Tier::Entry => 3,
            Tier::Standard => 7,
            Tier::Premium => 10,
        }
    }

    /// Minimum words per chapter the provider is asked for, if any
    pub fn min_chapter_words(&self) -> Option<usize> {
        match self {
            Tier::Entry => None,
            Tier::Standard => Some(800),
            Tier::Premium => Some(1500),
        }
    }
}

/// Order lifecycle status
///
/// `completed` and `error` are terminal: no pipeline operation moves an
/// order out of them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    PendingForm,
    Generating,
    Completed,
    Error,
}

impl OrderStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::PendingForm => "pending_form",
            OrderStatus::Generating => "generating",
            OrderStatus::Completed => "completed",
            OrderStatus::Error => "error",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "pending_form" => Some(OrderStatus::PendingForm),
            "generating" => Some(OrderStatus::Generating),
            "completed" => Some(OrderStatus::Completed),
            "error" => Some(OrderStatus::Error),
            _ => None,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, OrderStatus::Completed | OrderStatus::Error)
    }
}

/// Output language for generated content
///
/// Carried as a prompt parameter, not an i18n framework.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    #[default]
    Es,
    En,
    Pt,
}

impl Language {
    /// English name of the language, spliced into prompts
    pub fn display_name(&self) -> &'static str {
        match self {
            Language::Es => "Spanish",
            Language::En => "English",
            Language::Pt => "Portuguese",
        }
    }
}

/// A customer order as persisted and served by the API
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Order {
    pub id: String,
    pub customer_name: String,
    pub customer_email: String,
    pub tier: Tier,
    pub niche: String,
    pub status: OrderStatus,
    /// Coarse completion percentage (0-100)
    pub progress: u8,
    /// The finished ebook, present once status is `completed`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ebook_content: Option<Book>,
    pub created_at: DateTime<Utc>,
}

/// Per-chapter generation status (draft bookkeeping)
///
/// A failed chapter reverts from `generating` to `pending` so a resumed run
/// retries it; `completed` chapters are never regenerated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChapterStatus {
    Pending,
    Generating,
    Completed,
}

/// A finished chapter as it appears in the delivered artifact
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Chapter {
    pub title: String,
    pub content: String,
    /// Data URL of the chapter illustration; absent when the image model
    /// returned no picture (a valid outcome)
    #[serde(rename = "imageUrl", skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
}

/// Kind discriminator for bonus assets
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BonusKind {
    Checklist,
    Worksheet,
    Roadmap,
}

impl BonusKind {
    /// The fixed kind order a complete bonus set is delivered in
    pub const ALL: [BonusKind; 3] = [BonusKind::Checklist, BonusKind::Worksheet, BonusKind::Roadmap];
}

/// Supplementary asset delivered alongside the ebook
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BonusAsset {
    #[serde(rename = "type")]
    pub kind: BonusKind,
    pub title: String,
    pub content: String,
}

/// The delivered artifact: a complete ebook with bonus assets
///
/// A completed book carries exactly three bonuses, one of each kind.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Book {
    pub title: String,
    pub chapters: Vec<Chapter>,
    #[serde(default)]
    pub bonuses: Vec<BonusAsset>,
}

/// Structured community launch kit produced by the strategy generator
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommunityStrategy {
    pub about_page: String,
    pub welcome_post: String,
    /// Three direct-message scripts for member outreach
    pub dm_scripts: Vec<String>,
    /// Three short ad copy variants
    pub ad_copy: Vec<String>,
    /// 30-day growth plan
    pub growth_plan: String,
}
