//! In-flight generation state
//!
//! The pipeline persists a `BookDraft` to the order's `draft_content`
//! column after every completed chapter, so an interrupted run resumes
//! from persisted per-chapter statuses instead of regenerating work.

use serde::{Deserialize, Serialize};
use vellum_common::model::{Book, Chapter, ChapterStatus, Language};

/// Working copy of an ebook while the pipeline generates it
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BookDraft {
    /// Book title (the order's niche in the fulfillment flow)
    pub title: String,

    /// Output language for all generated text
    pub language: Language,

    /// Serialized customer diagnostic answers, spliced into chapter prompts
    pub persona_context: String,

    /// Chapters in plan order with their generation status
    pub chapters: Vec<DraftChapter>,
}

/// A chapter while it is being generated
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DraftChapter {
    pub title: String,
    pub status: ChapterStatus,
    #[serde(default)]
    pub content: String,
    #[serde(rename = "imageUrl", skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
}

impl DraftChapter {
    pub fn pending(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            status: ChapterStatus::Pending,
            content: String::new(),
            image_url: None,
        }
    }
}

impl BookDraft {
    /// Fresh draft with every chapter pending
    pub fn new(
        title: impl Into<String>,
        language: Language,
        persona_context: impl Into<String>,
        plan: Vec<String>,
    ) -> Self {
        Self {
            title: title.into(),
            language,
            persona_context: persona_context.into(),
            chapters: plan.into_iter().map(DraftChapter::pending).collect(),
        }
    }

    pub fn chapter_count(&self) -> usize {
        self.chapters.len()
    }

    pub fn completed_count(&self) -> usize {
        self.chapters
            .iter()
            .filter(|c| c.status == ChapterStatus::Completed)
            .count()
    }

    /// True once every chapter has completed
    pub fn is_complete(&self) -> bool {
        self.chapters
            .iter()
            .all(|c| c.status == ChapterStatus::Completed)
    }

    /// Convert into the delivered artifact, dropping per-chapter statuses
    pub fn into_book(self, bonuses: Vec<vellum_common::model::BonusAsset>) -> Book {
        Book {
            title: self.title,
            chapters: self
                .chapters
                .into_iter()
                .map(|c| Chapter {
                    title: c.title,
                    content: c.content,
                    image_url: c.image_url,
                })
                .collect(),
            bonuses,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn plan() -> Vec<String> {
        vec![
            "Introduction".to_string(),
            "Method".to_string(),
            "Steps".to_string(),
        ]
    }

    #[test]
    fn new_draft_has_all_chapters_pending() {
        let draft = BookDraft::new("Biohacking", Language::Es, "{}", plan());
        assert_eq!(draft.chapter_count(), 3);
        assert_eq!(draft.completed_count(), 0);
        assert!(!draft.is_complete());
        assert!(draft
            .chapters
            .iter()
            .all(|c| c.status == ChapterStatus::Pending));
    }

    #[test]
    fn into_book_strips_statuses_and_keeps_images() {
        let mut draft = BookDraft::new("Biohacking", Language::En, "{}", plan());
        for chapter in &mut draft.chapters {
            chapter.status = ChapterStatus::Completed;
            chapter.content = format!("{} body", chapter.title);
        }
        draft.chapters[1].image_url = Some("data:image/png;base64,AAAA".to_string());

        let book = draft.into_book(vec![]);
        assert_eq!(book.chapters.len(), 3);
        assert_eq!(book.chapters[0].content, "Introduction body");
        assert_eq!(
            book.chapters[1].image_url.as_deref(),
            Some("data:image/png;base64,AAAA")
        );
        assert!(book.chapters[2].image_url.is_none());
    }

    #[test]
    fn draft_round_trips_through_json() {
        let mut draft = BookDraft::new("Fitness", Language::Pt, r#"{"q":"a"}"#, plan());
        draft.chapters[0].status = ChapterStatus::Completed;
        draft.chapters[0].content = "done".to_string();

        let json = serde_json::to_string(&draft).unwrap();
        let back: BookDraft = serde_json::from_str(&json).unwrap();
        assert_eq!(back.chapters[0].status, ChapterStatus::Completed);
        assert_eq!(back.chapters[1].status, ChapterStatus::Pending);
        assert_eq!(back.persona_context, r#"{"q":"a"}"#);
    }
}
