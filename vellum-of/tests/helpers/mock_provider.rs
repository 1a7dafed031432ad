//! Scripted content provider for pipeline and API tests
//!
//! Produces deterministic copy for every capability, counts calls per
//! capability, and supports failure injection keyed by chapter title so
//! tests can stop a run at an exact point and resume it later.

use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use vellum_common::model::{BonusAsset, BonusKind, CommunityStrategy, Language, Tier};
use vellum_of::services::provider::{
    ChapterCopy, ChapterRequest, ContentProvider, LandingPageRequest, ProviderError,
};

pub struct MockProvider {
    pub question_calls: AtomicUsize,
    pub chapter_calls: AtomicUsize,
    pub image_calls: AtomicUsize,
    pub bonus_calls: AtomicUsize,
    failing_chapters: Mutex<HashSet<String>>,
    failing_bonuses: Mutex<bool>,
    with_images: bool,
    images_come_back_empty: bool,
    chapter_delay: Option<Duration>,
}

impl MockProvider {
    pub fn new() -> Self {
        Self {
            question_calls: AtomicUsize::new(0),
            chapter_calls: AtomicUsize::new(0),
            image_calls: AtomicUsize::new(0),
            bonus_calls: AtomicUsize::new(0),
            failing_chapters: Mutex::new(HashSet::new()),
            failing_bonuses: Mutex::new(false),
            with_images: true,
            images_come_back_empty: false,
            chapter_delay: None,
        }
    }

    /// Provider whose chapters carry no illustration prompt
    pub fn without_images() -> Self {
        Self {
            with_images: false,
            ..Self::new()
        }
    }

    /// Provider whose image model answers every prompt with no image
    pub fn with_empty_image_replies() -> Self {
        Self {
            images_come_back_empty: true,
            ..Self::new()
        }
    }

    /// Provider that sleeps inside every chapter call, keeping a
    /// background run in flight long enough to race requests against it
    pub fn with_chapter_delay(delay: Duration) -> Self {
        Self {
            chapter_delay: Some(delay),
            ..Self::new()
        }
    }

    /// Make chapter generation fail for this title until healed
    pub fn fail_chapter(&self, title: &str) {
        self.failing_chapters
            .lock()
            .unwrap()
            .insert(title.to_string());
    }

    /// Make bonus generation fail until healed
    pub fn fail_bonuses(&self) {
        *self.failing_bonuses.lock().unwrap() = true;
    }

    /// Clear every injected failure
    pub fn heal(&self) {
        self.failing_chapters.lock().unwrap().clear();
        *self.failing_bonuses.lock().unwrap() = false;
    }
}

#[async_trait]
impl ContentProvider for MockProvider {
    async fn questions_for(
        &self,
        niche: &str,
        tier: Tier,
        language: Language,
    ) -> Result<Vec<String>, ProviderError> {
        self.question_calls.fetch_add(1, Ordering::SeqCst);
        Ok((1..=tier.question_count())
            .map(|i| {
                format!(
                    "Question {} about {} ({})",
                    i,
                    niche,
                    language.display_name()
                )
            })
            .collect())
    }

    async fn chapter_for(
        &self,
        request: &ChapterRequest<'_>,
    ) -> Result<ChapterCopy, ProviderError> {
        self.chapter_calls.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.chapter_delay {
            tokio::time::sleep(delay).await;
        }
        if self.failing_chapters.lock().unwrap().contains(request.title) {
            return Err(ProviderError::Network(format!(
                "injected failure for {}",
                request.title
            )));
        }
        let image_prompt = if self.with_images {
            format!("Artwork for {}", request.title)
        } else {
            String::new()
        };
        Ok(ChapterCopy {
            content: format!(
                "# {}\n\nWritten for {} in the {} niche.",
                request.title, request.customer_name, request.niche
            ),
            image_prompt,
        })
    }

    async fn image_for(
        &self,
        _image_prompt: &str,
        _tier: Tier,
    ) -> Result<Option<String>, ProviderError> {
        self.image_calls.fetch_add(1, Ordering::SeqCst);
        if self.images_come_back_empty {
            return Ok(None);
        }
        Ok(Some("data:image/png;base64,dGVzdA==".to_string()))
    }

    async fn bonuses_for(
        &self,
        title: &str,
        _niche: &str,
        _tier: Tier,
        _language: Language,
    ) -> Result<Vec<BonusAsset>, ProviderError> {
        self.bonus_calls.fetch_add(1, Ordering::SeqCst);
        if *self.failing_bonuses.lock().unwrap() {
            return Err(ProviderError::Network(
                "injected bonus failure".to_string(),
            ));
        }
        Ok(BonusKind::ALL
            .iter()
            .map(|kind| BonusAsset {
                kind: *kind,
                title: format!("{:?} for {}", kind, title),
                content: "- First action item\n- Second action item".to_string(),
            })
            .collect())
    }

    async fn landing_page_for(
        &self,
        request: &LandingPageRequest,
    ) -> Result<String, ProviderError> {
        Ok(format!(
            "<!DOCTYPE html><html><body><h1>{}</h1></body></html>",
            request.title
        ))
    }

    async fn strategy_for(
        &self,
        niche: &str,
        target_audience: &str,
    ) -> Result<CommunityStrategy, ProviderError> {
        Ok(CommunityStrategy {
            about_page: format!("A community about {}", niche),
            welcome_post: "Welcome aboard".to_string(),
            dm_scripts: vec!["Script one".to_string(), "Script two".to_string()],
            ad_copy: vec!["Ad one".to_string(), "Ad two".to_string()],
            growth_plan: format!("Reach {} in 90 days", target_audience),
        })
    }
}
