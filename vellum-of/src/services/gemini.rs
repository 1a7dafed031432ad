//! Gemini content provider
//!
//! Implements `ContentProvider` against the Google Generative Language API
//! (`v1beta` `generateContent`). Text capabilities run in JSON mode and are
//! decoded leniently; images come back as inline base64 payloads that are
//! embedded verbatim into data URLs.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use vellum_common::model::{BonusAsset, CommunityStrategy, Language, Tier};
use vellum_common::Error;

use crate::config::ProviderConfig;
use crate::services::provider::{
    coerce_text, normalize_bonuses, strip_code_fences, ChapterCopy, ChapterRequest,
    ContentProvider, LandingPageRequest, ProviderError, RawBonus,
};

const GEMINI_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";
const USER_AGENT: &str = "vellum-of/0.1.0 (https://github.com/vellum/vellum)";
const REQUEST_TIMEOUT_SECS: u64 = 120;
const RATE_LIMIT_MS: u64 = 500;

const QUESTION_MODEL: &str = "gemini-3-flash-preview";
const CONTENT_MODEL: &str = "gemini-3-pro-preview";
const IMAGE_MODEL: &str = "gemini-3-pro-image-preview";

const CHAPTER_THINKING_BUDGET: u32 = 25000;
const LANDING_THINKING_BUDGET: u32 = 15000;

// ---------------------------------------------------------------------------
// Wire types
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentRequest {
    contents: Vec<Content>,
    #[serde(skip_serializing_if = "Option::is_none")]
    system_instruction: Option<Content>,
    #[serde(skip_serializing_if = "Option::is_none")]
    generation_config: Option<GenerationConfig>,
}

#[derive(Debug, Serialize)]
struct Content {
    parts: Vec<Part>,
}

impl Content {
    fn text(text: impl Into<String>) -> Self {
        Self {
            parts: vec![Part { text: text.into() }],
        }
    }
}

#[derive(Debug, Serialize)]
struct Part {
    text: String,
}

#[derive(Debug, Default, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    response_mime_type: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    response_schema: Option<serde_json::Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    thinking_config: Option<ThinkingConfig>,
    #[serde(skip_serializing_if = "Option::is_none")]
    image_config: Option<ImageConfig>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ThinkingConfig {
    thinking_budget: u32,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ImageConfig {
    aspect_ratio: &'static str,
    image_size: &'static str,
}

#[derive(Debug, Deserialize)]
struct GenerateContentResponse {
    candidates: Option<Vec<Candidate>>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    parts: Option<Vec<ResponsePart>>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ResponsePart {
    text: Option<String>,
    inline_data: Option<InlineData>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct InlineData {
    mime_type: Option<String>,
    data: String,
}

impl GenerateContentResponse {
    /// Concatenated text of the first candidate
    fn first_text(&self) -> Result<String, ProviderError> {
        let text: String = self
            .candidates
            .as_deref()
            .and_then(|c| c.first())
            .and_then(|c| c.content.as_ref())
            .and_then(|c| c.parts.as_deref())
            .map(|parts| {
                parts
                    .iter()
                    .filter_map(|p| p.text.as_deref())
                    .collect::<Vec<_>>()
                    .join("")
            })
            .unwrap_or_default();

        if text.trim().is_empty() {
            return Err(ProviderError::Malformed(
                "response contained no text".to_string(),
            ));
        }
        Ok(text)
    }

    /// First inline image of the first candidate, as a data URL
    fn first_inline_image(&self) -> Option<String> {
        self.candidates
            .as_deref()?
            .first()?
            .content
            .as_ref()?
            .parts
            .as_deref()?
            .iter()
            .find_map(|p| p.inline_data.as_ref())
            .map(|inline| {
                let mime = inline.mime_type.as_deref().unwrap_or("image/png");
                format!("data:{};base64,{}", mime, inline.data)
            })
    }
}

// ---------------------------------------------------------------------------
// Prompts
// ---------------------------------------------------------------------------

fn question_prompt(niche: &str, tier: Tier, language: Language) -> String {
    format!(
        "Act as a diagnostic expert in {niche}. For a {tier} premium program, generate \
         {count} high-level questions in {lang} to extract the user's personal context. \
         Focus on {focus}. Return ONLY a JSON array of strings.",
        niche = niche,
        tier = tier.as_str(),
        count = tier.question_count(),
        lang = language.display_name(),
        focus = tier.question_focus(),
    )
}

fn ghostwriter_instruction() -> String {
    "You are \"Vellum\", the world's most sophisticated AI ghostwriter for high-ticket mentors.\n\
     TONE: Professional, luxury, authoritative, yet transformational.\n\
     TIER LOGIC:\n\
     - TIER_1: Focus on quick wins and emotional connection.\n\
     - TIER_2: Focus on the \"Unique Mechanism\" and step-by-step implementation.\n\
     - TIER_3: Focus on systems, scaling, advanced psychological shifts, and institutional-grade frameworks.\n\
     Always use beautiful Markdown with bold highlights."
        .to_string()
}

fn chapter_prompt(request: &ChapterRequest<'_>) -> String {
    let length = match request.tier.min_chapter_words() {
        Some(words) => format!("minimum {} words", words),
        None => "concise and punchy".to_string(),
    };
    format!(
        "Write the chapter \"{title}\" for a {tier} ebook for {name}.\n\
         Niche: {niche}.\n\
         Client Context: {context}.\n\
         Language: {lang}.\n\
         Return a JSON object with:\n\
         \"content\": \"Full markdown content ({length})\",\n\
         \"imagePrompt\": \"A cinematic high-end visual description for an image generator \
         representing this chapter's soul, in English.\"",
        title = request.title,
        tier = request.tier.as_str(),
        name = request.customer_name,
        niche = request.niche,
        context = request.persona_context,
        lang = request.language.display_name(),
        length = length,
    )
}

fn bonus_prompt(title: &str, niche: &str, tier: Tier, language: Language) -> String {
    format!(
        "Create 3 elite companion assets for the Masterpiece \"{title}\" ({niche}).\n\
         Tier: {tier}. Language: {lang}.\n\
         The bonuses must be: a Checklist, a System Worksheet, and a 90-day Roadmap.\n\
         Return ONLY a JSON array of objects: [{{\"type\", \"title\", \"content\" (detailed markdown)}}].",
        title = title,
        niche = niche,
        tier = tier.as_str(),
        lang = language.display_name(),
    )
}

fn image_prompt_for(tier: Tier, image_prompt: &str) -> String {
    format!(
        "Masterpiece Art for a {} book. Style: Luxury, minimal, 8k, dramatic lighting, \
         obsidian and gold accents. {}",
        tier.as_str(),
        image_prompt
    )
}

fn landing_page_prompt(request: &LandingPageRequest) -> String {
    format!(
        "Create a high-converting, luxury, minimal single-file HTML/CSS landing page for an \
         ebook titled \"{title}\" in the {niche} niche.\n\
         Language: {lang}.\n\
         Include pricing sections: Tier 1 at ${p1}, Tier 2 at ${p2}, Tier 3 at ${p3}.\n\
         Checkout links: Tier 1 ({l1}), Tier 2 ({l2}), Tier 3 ({l3}).\n\
         Use Tailwind CSS (via CDN) and FontAwesome.\n\
         The design must be dramatic, with dark backgrounds, gold and blue highlights, and \
         high-end typography.\n\
         Return ONLY the raw HTML code starting with <!DOCTYPE html>.",
        title = request.title,
        niche = request.niche,
        lang = request.language.display_name(),
        p1 = request.prices.tier_1,
        p2 = request.prices.tier_2,
        p3 = request.prices.tier_3,
        l1 = request.checkout_links.tier_1,
        l2 = request.checkout_links.tier_2,
        l3 = request.checkout_links.tier_3,
    )
}

fn strategy_prompt(niche: &str, target_audience: &str) -> String {
    format!(
        "Generate a comprehensive community launch strategy for the niche \"{niche}\" \
         targeting \"{target}\".\n\
         The strategy must include:\n\
         1. A high-converting \"About Page\" description.\n\
         2. A \"Welcome Post\" to pin at the top.\n\
         3. 3 DM scripts for closing clients.\n\
         4. 3 Ad copy variants.\n\
         5. A 30-day growth roadmap.",
        niche = niche,
        target = target_audience,
    )
}

fn strategy_response_schema() -> serde_json::Value {
    serde_json::json!({
        "type": "OBJECT",
        "properties": {
            "aboutPage": { "type": "STRING" },
            "welcomePost": { "type": "STRING" },
            "dmScripts": { "type": "ARRAY", "items": { "type": "STRING" } },
            "adCopy": { "type": "ARRAY", "items": { "type": "STRING" } },
            "growthPlan": { "type": "STRING" }
        },
        "required": ["aboutPage", "welcomePost", "dmScripts", "adCopy", "growthPlan"]
    })
}

// ---------------------------------------------------------------------------
// Client
// ---------------------------------------------------------------------------

/// Serializes outbound requests so bursts of chapter calls stay polite
struct RateLimiter {
    last_request: Mutex<Option<Instant>>,
    min_interval: Duration,
}

impl RateLimiter {
    fn new(min_interval_ms: u64) -> Self {
        Self {
            last_request: Mutex::new(None),
            min_interval: Duration::from_millis(min_interval_ms),
        }
    }

    /// Wait if necessary to comply with the rate limit
    async fn wait(&self) {
        let mut last = self.last_request.lock().await;

        if let Some(last_time) = *last {
            let elapsed = last_time.elapsed();
            if elapsed < self.min_interval {
                let wait_time = self.min_interval - elapsed;
                debug!("Rate limiting: waiting {:?}", wait_time);
                tokio::time::sleep(wait_time).await;
            }
        }

        *last = Some(Instant::now());
    }
}

/// Gemini API client
pub struct GeminiClient {
    http_client: reqwest::Client,
    api_key: String,
    base_url: String,
    rate_limiter: Arc<RateLimiter>,
}

impl GeminiClient {
    pub fn new(config: &ProviderConfig) -> vellum_common::Result<Self> {
        if config.api_key.trim().is_empty() {
            return Err(Error::Config("Gemini API key is empty".to_string()));
        }

        let timeout = config.timeout_secs.unwrap_or(REQUEST_TIMEOUT_SECS);
        let http_client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(Duration::from_secs(timeout))
            .build()
            .map_err(|e| Error::Internal(format!("build HTTP client: {}", e)))?;

        Ok(Self {
            http_client,
            api_key: config.api_key.clone(),
            base_url: config
                .base_url
                .clone()
                .unwrap_or_else(|| GEMINI_BASE_URL.to_string()),
            rate_limiter: Arc::new(RateLimiter::new(RATE_LIMIT_MS)),
        })
    }

    async fn generate(
        &self,
        model: &str,
        request: GenerateContentRequest,
    ) -> Result<GenerateContentResponse, ProviderError> {
        self.rate_limiter.wait().await;

        let url = format!("{}/models/{}:generateContent", self.base_url, model);
        debug!(model = model, url = %url, "Querying Gemini API");

        let response = self
            .http_client
            .post(&url)
            .header("x-goog-api-key", &self.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    ProviderError::Network(format!("request to {} timed out", model))
                } else {
                    ProviderError::Network(e.to_string())
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ProviderError::Api {
                status: status.as_u16(),
                body,
            });
        }

        response
            .json()
            .await
            .map_err(|e| ProviderError::Malformed(e.to_string()))
    }

    /// Parse a JSON-mode reply, tolerating code fences
    fn parse_json_reply(text: &str) -> Result<serde_json::Value, ProviderError> {
        serde_json::from_str(strip_code_fences(text))
            .map_err(|e| ProviderError::Malformed(format!("reply is not JSON: {}", e)))
    }
}

#[async_trait]
impl ContentProvider for GeminiClient {
    async fn questions_for(
        &self,
        niche: &str,
        tier: Tier,
        language: Language,
    ) -> Result<Vec<String>, ProviderError> {
        let request = GenerateContentRequest {
            contents: vec![Content::text(question_prompt(niche, tier, language))],
            system_instruction: None,
            generation_config: Some(GenerationConfig {
                response_mime_type: Some("application/json"),
                ..Default::default()
            }),
        };

        let response = self.generate(QUESTION_MODEL, request).await?;
        let value = Self::parse_json_reply(&response.first_text()?)?;

        let items = value.as_array().ok_or_else(|| {
            ProviderError::Malformed("questions reply is not an array".to_string())
        })?;
        let questions: Vec<String> = items
            .iter()
            .map(coerce_text)
            .filter(|q| !q.trim().is_empty())
            .collect();

        if questions.is_empty() {
            return Err(ProviderError::Malformed(
                "questions reply was empty".to_string(),
            ));
        }
        if questions.len() != tier.question_count() {
            warn!(
                tier = tier.as_str(),
                expected = tier.question_count(),
                got = questions.len(),
                "Model returned unexpected question count"
            );
        }

        info!(niche = %niche, tier = tier.as_str(), count = questions.len(), "Generated diagnosis questions");
        Ok(questions)
    }

    async fn chapter_for(
        &self,
        request: &ChapterRequest<'_>,
    ) -> Result<ChapterCopy, ProviderError> {
        let api_request = GenerateContentRequest {
            contents: vec![Content::text(chapter_prompt(request))],
            system_instruction: Some(Content::text(ghostwriter_instruction())),
            generation_config: Some(GenerationConfig {
                response_mime_type: Some("application/json"),
                thinking_config: Some(ThinkingConfig {
                    thinking_budget: CHAPTER_THINKING_BUDGET,
                }),
                ..Default::default()
            }),
        };

        let response = self.generate(CONTENT_MODEL, api_request).await?;
        let value = Self::parse_json_reply(&response.first_text()?)?;

        let content = coerce_text(&value["content"]);
        if content.trim().is_empty() {
            return Err(ProviderError::Malformed(
                "chapter reply missing content".to_string(),
            ));
        }

        info!(title = %request.title, chars = content.len(), "Generated chapter");
        Ok(ChapterCopy {
            content,
            image_prompt: coerce_text(&value["imagePrompt"]),
        })
    }

    async fn image_for(
        &self,
        image_prompt: &str,
        tier: Tier,
    ) -> Result<Option<String>, ProviderError> {
        let request = GenerateContentRequest {
            contents: vec![Content::text(image_prompt_for(tier, image_prompt))],
            system_instruction: None,
            generation_config: Some(GenerationConfig {
                image_config: Some(ImageConfig {
                    aspect_ratio: "16:9",
                    image_size: "1K",
                }),
                ..Default::default()
            }),
        };

        let response = self.generate(IMAGE_MODEL, request).await?;

        // No inline image is a valid outcome: the chapter ships without one
        let image = response.first_inline_image();
        if image.is_none() {
            debug!("Image model returned no inline image");
        }
        Ok(image)
    }

    async fn bonuses_for(
        &self,
        title: &str,
        niche: &str,
        tier: Tier,
        language: Language,
    ) -> Result<Vec<BonusAsset>, ProviderError> {
        let request = GenerateContentRequest {
            contents: vec![Content::text(bonus_prompt(title, niche, tier, language))],
            system_instruction: None,
            generation_config: Some(GenerationConfig {
                response_mime_type: Some("application/json"),
                ..Default::default()
            }),
        };

        let response = self.generate(CONTENT_MODEL, request).await?;
        let value = Self::parse_json_reply(&response.first_text()?)?;

        let items = value
            .as_array()
            .ok_or_else(|| ProviderError::Malformed("bonus reply is not an array".to_string()))?;
        let raw: Vec<RawBonus> = items
            .iter()
            .map(|item| RawBonus {
                kind: item["type"].as_str().map(|s| s.to_string()),
                title: coerce_text(&item["title"]),
                content: coerce_text(&item["content"]),
            })
            .collect();

        let bonuses = normalize_bonuses(raw)?;
        info!(title = %title, "Generated bonus assets");
        Ok(bonuses)
    }

    async fn landing_page_for(
        &self,
        request: &LandingPageRequest,
    ) -> Result<String, ProviderError> {
        let api_request = GenerateContentRequest {
            contents: vec![Content::text(landing_page_prompt(request))],
            system_instruction: None,
            generation_config: Some(GenerationConfig {
                thinking_config: Some(ThinkingConfig {
                    thinking_budget: LANDING_THINKING_BUDGET,
                }),
                ..Default::default()
            }),
        };

        let response = self.generate(CONTENT_MODEL, api_request).await?;
        let html = strip_code_fences(&response.first_text()?).to_string();

        info!(title = %request.title, bytes = html.len(), "Generated landing page");
        Ok(html)
    }

    async fn strategy_for(
        &self,
        niche: &str,
        target_audience: &str,
    ) -> Result<CommunityStrategy, ProviderError> {
        let request = GenerateContentRequest {
            contents: vec![Content::text(strategy_prompt(niche, target_audience))],
            system_instruction: None,
            generation_config: Some(GenerationConfig {
                response_mime_type: Some("application/json"),
                response_schema: Some(strategy_response_schema()),
                ..Default::default()
            }),
        };

        let response = self.generate(CONTENT_MODEL, request).await?;
        let value = Self::parse_json_reply(&response.first_text()?)?;

        let string_list = |v: &serde_json::Value| -> Vec<String> {
            v.as_array()
                .map(|items| items.iter().map(coerce_text).collect())
                .unwrap_or_default()
        };

        let strategy = CommunityStrategy {
            about_page: coerce_text(&value["aboutPage"]),
            welcome_post: coerce_text(&value["welcomePost"]),
            dm_scripts: string_list(&value["dmScripts"]),
            ad_copy: string_list(&value["adCopy"]),
            growth_plan: coerce_text(&value["growthPlan"]),
        };

        info!(niche = %niche, "Generated community strategy");
        Ok(strategy)
    }
}
