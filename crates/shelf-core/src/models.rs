//! Core data models for shelf.
//!
//! These types are shared across all shelf crates and represent the two
//! persisted collections plus the handles used to address them remotely.

use chrono::{DateTime, Utc};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use crate::defaults;
use crate::error::{Error, Result};

// =============================================================================
// CONTENT TYPES
// =============================================================================

/// Kind of content a star or note refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContentType {
    Repo,
    Paper,
    Model,
    Post,
}

impl ContentType {
    pub const ALL: [ContentType; 4] = [
        ContentType::Repo,
        ContentType::Paper,
        ContentType::Model,
        ContentType::Post,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ContentType::Repo => "repo",
            ContentType::Paper => "paper",
            ContentType::Model => "model",
            ContentType::Post => "post",
        }
    }

    /// Map a digest source type ("github", "arxiv", ...) onto a content type.
    pub fn from_source_type(source_type: &str) -> Option<Self> {
        match source_type {
            "github" => Some(ContentType::Repo),
            "arxiv" => Some(ContentType::Paper),
            "huggingface" => Some(ContentType::Model),
            "blog" | "twitter" | "youtube" => Some(ContentType::Post),
            _ => None,
        }
    }
}

impl fmt::Display for ContentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ContentType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let lowered = s.trim().to_ascii_lowercase();
        ContentType::ALL
            .into_iter()
            .find(|t| t.as_str() == lowered)
            .or_else(|| ContentType::from_source_type(&lowered))
            .ok_or_else(|| Error::InvalidInput(format!("unknown content type '{}'", s)))
    }
}

// =============================================================================
// DOCUMENTS
// =============================================================================

/// The two documents kept in the backing repository.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DocumentKind {
    Stars,
    Notes,
}

impl DocumentKind {
    pub const ALL: [DocumentKind; 2] = [DocumentKind::Stars, DocumentKind::Notes];

    /// Path of the document inside the backing repository.
    pub fn path(&self) -> &'static str {
        match self {
            DocumentKind::Stars => defaults::STARS_PATH,
            DocumentKind::Notes => defaults::NOTES_PATH,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            DocumentKind::Stars => "stars",
            DocumentKind::Notes => "notes",
        }
    }
}

impl fmt::Display for DocumentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An item stored in one of the two collections.
pub trait Document: Serialize + DeserializeOwned + Clone + Send + Sync + 'static {
    /// Which document holds items of this type.
    const KIND: DocumentKind;

    /// Identifier, unique within the collection.
    fn id(&self) -> &str;

    /// Timestamp the collection is ordered by (newest first).
    fn timestamp(&self) -> DateTime<Utc>;
}

/// Sort newest-first by timestamp. Stable, so ties keep their stored order.
pub fn sort_newest_first<T: Document>(items: &mut [T]) {
    items.sort_by(|a, b| b.timestamp().cmp(&a.timestamp()));
}

/// Synchronization state of one document for the current session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SyncState {
    /// Backing repository or file not confirmed yet.
    #[default]
    Unprovisioned,
    /// Repository and file exist, not read in this session.
    Provisioned,
    /// Last remote read or write succeeded.
    Synced,
}

// =============================================================================
// STARS
// =============================================================================

/// A saved item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StarItem {
    pub id: String,
    pub title: String,
    pub url: String,
    #[serde(rename = "type")]
    pub content_type: ContentType,
    /// Origin date of the content (ISO date).
    #[serde(default)]
    pub date: String,
    pub starred_at: DateTime<Utc>,
    #[serde(default)]
    pub tags: BTreeSet<String>,
    /// Note annotating this star, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub note_id: Option<String>,
}

impl StarItem {
    pub fn new(
        id: impl Into<String>,
        title: impl Into<String>,
        url: impl Into<String>,
        content_type: ContentType,
        date: impl Into<String>,
        starred_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            url: url.into(),
            content_type,
            date: date.into(),
            starred_at,
            tags: BTreeSet::new(),
            note_id: None,
        }
    }

    pub fn with_tags<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.tags = normalize_tags(tags);
        self
    }
}

impl Document for StarItem {
    const KIND: DocumentKind = DocumentKind::Stars;

    fn id(&self) -> &str {
        &self.id
    }

    fn timestamp(&self) -> DateTime<Utc> {
        self.starred_at
    }
}

/// Trim tags and drop empty ones.
pub fn normalize_tags<I, S>(tags: I) -> BTreeSet<String>
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    tags.into_iter()
        .map(|t| t.into().trim().to_string())
        .filter(|t| !t.is_empty())
        .collect()
}

// =============================================================================
// NOTES
// =============================================================================

/// A note annotating a piece of content.
///
/// Carries a snapshot of the content metadata so it stays readable after the
/// star it was written for is removed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NoteItem {
    pub id: String,
    /// Identifier of the star this note annotates.
    pub content_id: String,
    pub content_title: String,
    pub content_url: String,
    pub content_type: ContentType,
    #[serde(default)]
    pub content_date: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(default)]
    pub ai_enhanced: bool,
    #[serde(default)]
    pub thoughts: String,
    #[serde(default)]
    pub questions: String,
    #[serde(default)]
    pub todos: String,
}

impl Document for NoteItem {
    const KIND: DocumentKind = DocumentKind::Notes;

    fn id(&self) -> &str {
        &self.id
    }

    fn timestamp(&self) -> DateTime<Utc> {
        self.created_at
    }
}

/// Input for creating (or refreshing) the note of a content item.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NoteDraft {
    pub content_id: String,
    pub title: String,
    pub url: String,
    pub content_type: Option<ContentType>,
    pub date: String,
    pub thoughts: String,
    pub questions: String,
    pub todos: String,
}

impl NoteDraft {
    /// Draft pre-filled with the metadata of a star.
    pub fn for_star(star: &StarItem) -> Self {
        Self {
            content_id: star.id.clone(),
            title: star.title.clone(),
            url: star.url.clone(),
            content_type: Some(star.content_type),
            date: star.date.clone(),
            ..Default::default()
        }
    }

    pub fn with_text(
        mut self,
        thoughts: impl Into<String>,
        questions: impl Into<String>,
        todos: impl Into<String>,
    ) -> Self {
        self.thoughts = thoughts.into();
        self.questions = questions.into();
        self.todos = todos.into();
        self
    }

    /// Build a new note with a fresh identifier.
    pub fn into_note(self, now: DateTime<Utc>) -> NoteItem {
        NoteItem {
            id: new_note_id(),
            content_id: self.content_id,
            content_title: self.title,
            content_url: self.url,
            content_type: self.content_type.unwrap_or(ContentType::Post),
            content_date: self.date,
            created_at: now,
            updated_at: now,
            ai_enhanced: false,
            thoughts: self.thoughts,
            questions: self.questions,
            todos: self.todos,
        }
    }
}

/// Partial update of a note. `None` fields are left untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NotePatch {
    pub thoughts: Option<String>,
    pub questions: Option<String>,
    pub todos: Option<String>,
    pub ai_enhanced: Option<bool>,
}

impl NotePatch {
    pub fn is_empty(&self) -> bool {
        self.thoughts.is_none()
            && self.questions.is_none()
            && self.todos.is_none()
            && self.ai_enhanced.is_none()
    }

    /// Merge into `note` and bump `updated_at`.
    pub fn apply(&self, note: &mut NoteItem, now: DateTime<Utc>) {
        if let Some(ref thoughts) = self.thoughts {
            note.thoughts = thoughts.clone();
        }
        if let Some(ref questions) = self.questions {
            note.questions = questions.clone();
        }
        if let Some(ref todos) = self.todos {
            note.todos = todos.clone();
        }
        if let Some(ai_enhanced) = self.ai_enhanced {
            note.ai_enhanced = ai_enhanced;
        }
        note.updated_at = now;
    }
}

/// Generate a time-ordered note identifier.
pub fn new_note_id() -> String {
    Uuid::now_v7().to_string()
}

// =============================================================================
// REMOTE HANDLES
// =============================================================================

/// Signed-in user as reported by the authentication collaborator.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct User {
    pub handle: String,
}

impl User {
    pub fn new(handle: impl Into<String>) -> Self {
        Self {
            handle: handle.into(),
        }
    }
}

/// Address of a backing repository.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RepoRef {
    pub owner: String,
    pub name: String,
}

impl RepoRef {
    pub fn new(owner: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            owner: owner.into(),
            name: name.into(),
        }
    }

    /// The backing repository of `user`.
    pub fn for_user(user: &User, name: &str) -> Self {
        Self::new(user.handle.clone(), name)
    }
}

impl fmt::Display for RepoRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.owner, self.name)
    }
}

/// Content hash identifying one revision of a remote file.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct VersionToken(String);

impl VersionToken {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for VersionToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Decoded text of a remote file and the version it was read at.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteFile {
    pub content: String,
    pub version: VersionToken,
}
