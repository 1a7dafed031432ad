//! Service-local models for vellum-of

pub mod draft;

pub use draft::{BookDraft, DraftChapter};
