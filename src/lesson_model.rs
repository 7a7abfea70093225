//! Data model definitions for the lesson catalog.
//!
//! A [`Lesson`] carries the fields every lesson shares (id, category, title,
//! description and timestamps) and flattens a [`LessonKind`] that holds the
//! type-specific payload. Serialized records use camelCase keys and a `type`
//! tag, so a stored lesson looks like:
//!
//! ```json
//! {
//!   "id": "lq2w9x1k3j4h5g6f",
//!   "category": "math",
//!   "title": "Algebra Basics",
//!   "description": "Introduction to algebra concepts",
//!   "type": "video",
//!   "videoUrl": "https://www.youtube.com/watch?v=NybHckSEQBI",
//!   "createdAt": "2024-01-15T10:30:00Z"
//! }
//! ```

use std::fmt::{Display, Formatter};
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::app_response::AppResponse;

/// Subject tag used to group lessons.
///
/// The wire form is kebab-case (`arts-crafts`, `coding`, ...).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Category {
    ArtsCrafts,
    Coding,
    Cooking,
    Languages,
    Mechanics,
    Math,
    Science,
    Reading,
}

impl Category {
    /// Every category, in display order.
    pub const ALL: [Category; 8] = [
        Category::ArtsCrafts,
        Category::Coding,
        Category::Cooking,
        Category::Languages,
        Category::Mechanics,
        Category::Math,
        Category::Science,
        Category::Reading,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Category::ArtsCrafts => "arts-crafts",
            Category::Coding => "coding",
            Category::Cooking => "cooking",
            Category::Languages => "languages",
            Category::Mechanics => "mechanics",
            Category::Math => "math",
            Category::Science => "science",
            Category::Reading => "reading",
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            Category::ArtsCrafts => "Arts & Crafts",
            Category::Coding => "Coding",
            Category::Cooking => "Cooking",
            Category::Languages => "Languages",
            Category::Mechanics => "Mechanics",
            Category::Math => "Math",
            Category::Science => "Science",
            Category::Reading => "Reading",
        }
    }
}

impl Display for Category {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Category {
    type Err = AppResponse;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Category::ALL
            .iter()
            .copied()
            .find(|category| category.as_str() == s)
            .ok_or_else(|| AppResponse::ValidationError(format!("Unknown category: {s}")))
    }
}

/// Category selector for filtering and counting.
///
/// Parses the sentinel `"all"` as [`CategoryFilter::All`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CategoryFilter {
    All,
    Only(Category),
}

impl CategoryFilter {
    pub fn matches(&self, category: Category) -> bool {
        match self {
            CategoryFilter::All => true,
            CategoryFilter::Only(wanted) => *wanted == category,
        }
    }
}

impl From<Category> for CategoryFilter {
    fn from(category: Category) -> Self {
        CategoryFilter::Only(category)
    }
}

impl FromStr for CategoryFilter {
    type Err = AppResponse;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s == "all" {
            Ok(CategoryFilter::All)
        } else {
            s.parse().map(CategoryFilter::Only)
        }
    }
}

/// The `type` discriminator on its own.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LessonType {
    Video,
    Interactive,
}

/// Type-specific lesson payload, tagged by `type`.
///
/// Video lessons reference their media either by URL or by an embedded
/// data URI; interactive lessons carry text content. Empty strings in the
/// optional video fields count as absent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum LessonKind {
    #[serde(rename_all = "camelCase")]
    Video {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        video_url: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        video_data: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        video_file_name: Option<String>,
    },
    Interactive {
        content: String,
    },
}

impl LessonKind {
    /// A video lesson pointing at an external URL.
    pub fn from_url(url: impl Into<String>) -> Self {
        LessonKind::Video {
            video_url: Some(url.into()),
            video_data: None,
            video_file_name: None,
        }
    }

    pub fn interactive(content: impl Into<String>) -> Self {
        LessonKind::Interactive {
            content: content.into(),
        }
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            LessonKind::Video { .. } => "video",
            LessonKind::Interactive { .. } => "interactive",
        }
    }

    pub fn lesson_type(&self) -> LessonType {
        match self {
            LessonKind::Video { .. } => LessonType::Video,
            LessonKind::Interactive { .. } => LessonType::Interactive,
        }
    }

    pub fn video_url(&self) -> Option<&str> {
        match self {
            LessonKind::Video { video_url, .. } => non_empty(video_url),
            LessonKind::Interactive { .. } => None,
        }
    }

    pub fn video_data(&self) -> Option<&str> {
        match self {
            LessonKind::Video { video_data, .. } => non_empty(video_data),
            LessonKind::Interactive { .. } => None,
        }
    }

    pub fn content(&self) -> Option<&str> {
        match self {
            LessonKind::Interactive { content } => Some(content.as_str()),
            LessonKind::Video { .. } => None,
        }
    }

    /// Checks the payload: interactive content must be non-blank and a video
    /// must have exactly one source (URL or embedded data).
    pub fn validate(&self) -> Result<(), AppResponse> {
        match self {
            LessonKind::Interactive { content } => {
                if content.trim().is_empty() {
                    return Err(AppResponse::ValidationError(
                        "Please enter lesson content for interactive lessons.".to_string(),
                    ));
                }
            }
            LessonKind::Video { .. } => match (self.video_url(), self.video_data()) {
                (None, None) => {
                    return Err(AppResponse::ValidationError(
                        "Please provide either a video URL or upload a video file.".to_string(),
                    ))
                }
                (Some(_), Some(_)) => {
                    return Err(AppResponse::ValidationError(
                        "Provide a video URL or an uploaded video file, not both.".to_string(),
                    ))
                }
                _ => {}
            },
        }
        Ok(())
    }

    /// The payload that results from merging `patch` over this one.
    ///
    /// Fields that do not belong to the resulting type are rejected unless
    /// empty. The result is validated.
    fn patched(&self, patch: &LessonPatch) -> Result<LessonKind, AppResponse> {
        let target = patch.lesson_type.unwrap_or_else(|| self.lesson_type());

        let kind = match target {
            LessonType::Interactive => {
                if [&patch.video_url, &patch.video_data, &patch.video_file_name]
                    .into_iter()
                    .any(|field| non_empty(field).is_some())
                {
                    return Err(AppResponse::ValidationError(
                        "Video fields cannot be set on an interactive lesson.".to_string(),
                    ));
                }
                let content = match (&patch.content, self) {
                    (Some(content), _) => content.clone(),
                    (None, LessonKind::Interactive { content }) => content.clone(),
                    (None, LessonKind::Video { .. }) => String::new(),
                };
                LessonKind::Interactive { content }
            }
            LessonType::Video => {
                if non_empty(&patch.content).is_some() {
                    return Err(AppResponse::ValidationError(
                        "Content cannot be set on a video lesson.".to_string(),
                    ));
                }
                let (url, data, file_name) = match self {
                    LessonKind::Video {
                        video_url,
                        video_data,
                        video_file_name,
                    } => (video_url.clone(), video_data.clone(), video_file_name.clone()),
                    LessonKind::Interactive { .. } => (None, None, None),
                };
                LessonKind::Video {
                    video_url: patch.video_url.clone().or(url),
                    video_data: patch.video_data.clone().or(data),
                    video_file_name: patch.video_file_name.clone().or(file_name),
                }
            }
        };

        kind.validate()?;
        Ok(kind)
    }
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|v| !v.trim().is_empty())
}

fn required_fields_error() -> AppResponse {
    AppResponse::ValidationError("Please fill in all required fields.".to_string())
}

fn validate_fields(title: &str, description: &str, kind: &LessonKind) -> Result<(), AppResponse> {
    if title.trim().is_empty() || description.trim().is_empty() {
        return Err(required_fields_error());
    }
    kind.validate()
}

/// A persisted lesson record.
///
/// `id` and `created_at` are assigned by the store when the lesson is added
/// and never change afterwards. `updated_at` stays absent until the first
/// update.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Lesson {
    pub id: String,
    pub category: Category,
    pub title: String,
    pub description: String,
    #[serde(flatten)]
    pub kind: LessonKind,
    pub created_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

impl Lesson {
    pub fn from_new(id: String, data: NewLesson, created_at: DateTime<Utc>) -> Self {
        Self {
            id,
            category: data.category,
            title: data.title,
            description: data.description,
            kind: data.kind,
            created_at,
            updated_at: None,
        }
    }

    /// Overwrites every field present in `patch` and stamps `updated_at`.
    ///
    /// Only what the patch sets is checked: a present title or description
    /// must be non-blank, and the payload is validated only when the patch
    /// touches it. On error the lesson is left unchanged.
    pub fn apply(&mut self, patch: LessonPatch, now: DateTime<Utc>) -> Result<(), AppResponse> {
        let blank = |field: &Option<String>| field.as_deref().is_some_and(|v| v.trim().is_empty());
        if blank(&patch.title) || blank(&patch.description) {
            return Err(required_fields_error());
        }

        let kind = if patch.touches_kind() {
            Some(self.kind.patched(&patch)?)
        } else {
            None
        };

        if let Some(category) = patch.category {
            self.category = category;
        }
        if let Some(title) = patch.title {
            self.title = title;
        }
        if let Some(description) = patch.description {
            self.description = description;
        }
        if let Some(kind) = kind {
            self.kind = kind;
        }
        self.updated_at = Some(now);
        Ok(())
    }

    pub fn validate(&self) -> Result<(), AppResponse> {
        validate_fields(&self.title, &self.description, &self.kind)
    }

    /// `needle` must already be lowercased.
    pub(crate) fn matches_query(&self, needle: &str) -> bool {
        self.title.to_lowercase().contains(needle)
            || self.description.to_lowercase().contains(needle)
            || self
                .kind
                .content()
                .is_some_and(|content| content.to_lowercase().contains(needle))
    }
}

/// Caller-supplied data for a lesson that does not exist yet.
///
/// ```rust
/// use lesson_library_core::lesson_model::{Category, LessonKind, NewLesson};
///
/// let lesson = NewLesson {
///     category: Category::Math,
///     title: "Algebra Basics".to_string(),
///     description: "Introduction to algebra concepts".to_string(),
///     kind: LessonKind::from_url("https://www.youtube.com/watch?v=NybHckSEQBI"),
/// };
/// assert!(lesson.validate().is_ok());
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewLesson {
    pub category: Category,
    pub title: String,
    pub description: String,
    #[serde(flatten)]
    pub kind: LessonKind,
}

impl NewLesson {
    pub fn validate(&self) -> Result<(), AppResponse> {
        validate_fields(&self.title, &self.description, &self.kind)
    }
}

/// Partial update for an existing lesson.
///
/// Every present field overwrites the stored one. Type-specific fields merge
/// into the lesson's current payload; a `type` different from the current one
/// rebuilds the payload from the patch alone, so switching a lesson from
/// video to interactive never leaves stale video fields behind.
///
/// ```rust
/// use lesson_library_core::lesson_model::LessonPatch;
///
/// let patch: LessonPatch = serde_json::from_str(r#"{"content":"new text"}"#).unwrap();
/// assert_eq!(patch.content.as_deref(), Some("new text"));
/// assert!(patch.touches_kind());
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LessonPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<Category>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub lesson_type: Option<LessonType>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub video_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub video_data: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub video_file_name: Option<String>,
}

impl LessonPatch {
    /// A patch that swaps in `kind` wholesale.
    pub fn replace_kind(kind: LessonKind) -> Self {
        let lesson_type = Some(kind.lesson_type());
        match kind {
            LessonKind::Video {
                video_url,
                video_data,
                video_file_name,
            } => Self {
                lesson_type,
                video_url,
                video_data,
                video_file_name,
                ..Default::default()
            },
            LessonKind::Interactive { content } => Self {
                lesson_type,
                content: Some(content),
                ..Default::default()
            },
        }
    }

    /// Whether the patch sets the type or any type-specific field.
    pub fn touches_kind(&self) -> bool {
        self.lesson_type.is_some()
            || self.content.is_some()
            || self.video_url.is_some()
            || self.video_data.is_some()
            || self.video_file_name.is_some()
    }
}
