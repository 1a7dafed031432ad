//! Content provider seam
//!
//! The pipeline talks to generative models only through `ContentProvider`,
//! so tests script a mock and a different backend slots in without touching
//! pipeline code. Model replies are JSON-mode but still arrive messy in
//! practice (code fences, string arrays, nulls); the lenient decoding
//! helpers here are shared by implementations and unit-tested on their own.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use vellum_common::model::{BonusAsset, BonusKind, CommunityStrategy, Language, Tier};

/// Content provider errors
///
/// All variants are fatal for the current pipeline run; the run's effects
/// up to the failure stay persisted and resumable.
#[derive(Debug, Error)]
pub enum ProviderError {
    /// Connect failure, timeout, or transport-level error
    #[error("network error: {0}")]
    Network(String),

    /// Non-success HTTP status from the provider
    #[error("API error (HTTP {status}): {body}")]
    Api { status: u16, body: String },

    /// Response decoded but did not contain what was asked for
    #[error("malformed provider response: {0}")]
    Malformed(String),
}

/// Everything the provider needs to write one chapter
#[derive(Debug, Clone)]
pub struct ChapterRequest<'a> {
    pub title: &'a str,
    pub niche: &'a str,
    pub tier: Tier,
    pub customer_name: &'a str,
    /// Serialized customer diagnostic answers
    pub persona_context: &'a str,
    pub language: Language,
}

/// One generated chapter: body text plus the prompt for its illustration
#[derive(Debug, Clone)]
pub struct ChapterCopy {
    pub content: String,
    /// English image prompt regardless of the text language
    pub image_prompt: String,
}

/// Per-tier string values (prices, checkout links)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PerTier {
    pub tier_1: String,
    pub tier_2: String,
    pub tier_3: String,
}

impl PerTier {
    pub fn get(&self, tier: Tier) -> &str {
        match tier {
            Tier::Entry => &self.tier_1,
            Tier::Standard => &self.tier_2,
            Tier::Premium => &self.tier_3,
        }
    }
}

/// Inputs for the landing page generator
#[derive(Debug, Clone, Deserialize)]
pub struct LandingPageRequest {
    pub title: String,
    pub niche: String,
    pub prices: PerTier,
    pub checkout_links: PerTier,
    #[serde(default)]
    pub language: Language,
}

/// Generative backend for every content capability the service sells
#[async_trait]
pub trait ContentProvider: Send + Sync {
    /// Diagnostic intake questions: exactly `tier.question_count()` of
    /// them, themed by `tier.question_focus()`, in the given language
    async fn questions_for(
        &self,
        niche: &str,
        tier: Tier,
        language: Language,
    ) -> Result<Vec<String>, ProviderError>;

    /// One chapter personalized by the customer's answers
    async fn chapter_for(&self, request: &ChapterRequest<'_>)
        -> Result<ChapterCopy, ProviderError>;

    /// Chapter illustration as a data URL; `Ok(None)` when the model
    /// returns no image (a valid outcome, not an error)
    async fn image_for(&self, image_prompt: &str, tier: Tier)
        -> Result<Option<String>, ProviderError>;

    /// Exactly three bonus assets: a checklist, a system worksheet and a
    /// 90-day roadmap
    async fn bonuses_for(
        &self,
        title: &str,
        niche: &str,
        tier: Tier,
        language: Language,
    ) -> Result<Vec<BonusAsset>, ProviderError>;

    /// A complete standalone HTML sales page for the three tiers
    async fn landing_page_for(
        &self,
        request: &LandingPageRequest,
    ) -> Result<String, ProviderError>;

    /// Structured community launch kit
    async fn strategy_for(
        &self,
        niche: &str,
        target_audience: &str,
    ) -> Result<CommunityStrategy, ProviderError>;
}

/// Strip a Markdown code fence wrapper from a model reply, if present
pub fn strip_code_fences(text: &str) -> &str {
    let trimmed = text.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    // Drop an optional language tag on the opening fence
    let rest = match rest.split_once('\n') {
        Some((_lang, body)) => body,
        None => rest,
    };
    rest.strip_suffix("```").unwrap_or(rest).trim()
}

/// Coerce a loosely-typed JSON value into text
///
/// Models asked for a string sometimes return an array of paragraphs or
/// null instead. String passes through, arrays join with blank lines,
/// null becomes empty.
pub fn coerce_text(value: &serde_json::Value) -> String {
    match value {
        serde_json::Value::String(s) => s.clone(),
        serde_json::Value::Array(items) => items
            .iter()
            .map(coerce_text)
            .collect::<Vec<_>>()
            .join("\n\n"),
        serde_json::Value::Null => String::new(),
        serde_json::Value::Number(n) => n.to_string(),
        serde_json::Value::Bool(b) => b.to_string(),
        other => other.to_string(),
    }
}

/// A bonus asset as the model labeled it, before validation
#[derive(Debug, Clone)]
pub struct RawBonus {
    pub kind: Option<String>,
    pub title: String,
    pub content: String,
}

/// Validate a bonus set: exactly three assets, one of each kind
///
/// When the model's own labels form one-of-each (in any order) they are
/// kept; otherwise kinds are assigned positionally, since the prompt fixes
/// the order checklist, worksheet, roadmap.
pub fn normalize_bonuses(raw: Vec<RawBonus>) -> Result<Vec<BonusAsset>, ProviderError> {
    if raw.len() != 3 {
        return Err(ProviderError::Malformed(format!(
            "expected 3 bonus assets, got {}",
            raw.len()
        )));
    }

    let labeled: Option<Vec<BonusKind>> = raw
        .iter()
        .map(|b| match b.kind.as_deref() {
            Some("checklist") => Some(BonusKind::Checklist),
            Some("worksheet") => Some(BonusKind::Worksheet),
            Some("roadmap") => Some(BonusKind::Roadmap),
            _ => None,
        })
        .collect();

    let kinds = match labeled {
        Some(kinds)
            if BonusKind::ALL
                .iter()
                .all(|expected| kinds.contains(expected)) =>
        {
            kinds
        }
        _ => BonusKind::ALL.to_vec(),
    };

    Ok(raw
        .into_iter()
        .zip(kinds)
        .map(|(b, kind)| BonusAsset {
            kind,
            title: b.title,
            content: b.content,
        })
        .collect())
}
