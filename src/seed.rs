//! Initial catalog seeding and the session-scoped video URL catalog.

use std::collections::BTreeMap;

use chrono::Utc;
use log::{info, warn};
use serde::{Deserialize, Serialize};

use crate::app_response::AppResponse;
use crate::lesson_model::{Category, Lesson, LessonKind, NewLesson};
use crate::lesson_store::{generate_id, LessonStore};
use crate::local_storage::KeyValueStorage;

/// Session storage key for the video URL catalog.
pub const VIDEO_URLS_KEY: &str = "learningLibraryVideoUrls";

/// Ordered fallback video URLs per category.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct VideoUrlCatalog(pub BTreeMap<Category, Vec<String>>);

impl VideoUrlCatalog {
    pub fn urls_for(&self, category: Category) -> &[String] {
        self.0.get(&category).map(Vec::as_slice).unwrap_or_default()
    }
}

/// Writes `catalog` to session storage so later page loads in the same
/// session see the current URLs.
pub fn sync_video_urls_to_session<S: KeyValueStorage>(
    session: &S,
    catalog: &VideoUrlCatalog,
) -> Result<(), AppResponse> {
    let json = serde_json::to_string(catalog)?;
    session.set_item(VIDEO_URLS_KEY, &json)
}

/// Reads the catalog back; absent or unreadable entries yield `None`.
pub fn load_session_video_urls<S: KeyValueStorage>(session: &S) -> Option<VideoUrlCatalog> {
    let json = session.get_item(VIDEO_URLS_KEY).ok().flatten()?;
    match serde_json::from_str(&json) {
        Ok(catalog) => Some(catalog),
        Err(e) => {
            warn!("Ignoring unreadable video URL catalog: {e}");
            None
        }
    }
}

/// Populates an empty store with `lessons` in a single write.
///
/// Returns how many lessons were seeded; a store that already holds lessons
/// is left alone and yields 0.
pub fn seed_if_empty<S: KeyValueStorage>(
    store: &LessonStore<S>,
    lessons: Vec<NewLesson>,
) -> Result<usize, AppResponse> {
    for lesson in &lessons {
        lesson.validate()?;
    }

    let seeded = store.mutate(|existing| {
        if !existing.is_empty() {
            return Ok((0, false));
        }
        let now = Utc::now();
        existing.extend(
            lessons
                .into_iter()
                .map(|data| Lesson::from_new(generate_id(), data, now)),
        );
        Ok((existing.len(), true))
    })?;

    if seeded > 0 {
        info!("Seeded store with {} lessons", seeded);
    }
    Ok(seeded)
}

/// Points URL-backed video lessons at the catalog's URLs.
///
/// The lesson at position `i` in the collection gets `urls[i % urls.len()]`
/// of its category. Lessons with embedded media, interactive lessons and
/// categories without URLs are skipped. Returns how many lessons changed.
pub fn refresh_video_urls<S: KeyValueStorage>(
    store: &LessonStore<S>,
    catalog: &VideoUrlCatalog,
) -> Result<usize, AppResponse> {
    let updated = store.mutate(|lessons| {
        let mut updated = 0;
        for (index, lesson) in lessons.iter_mut().enumerate() {
            let urls = catalog.urls_for(lesson.category);
            if urls.is_empty() || lesson.kind.video_data().is_some() {
                continue;
            }
            if let LessonKind::Video { video_url, .. } = &mut lesson.kind {
                let replacement = &urls[index % urls.len()];
                if video_url.as_deref() != Some(replacement.as_str()) {
                    *video_url = Some(replacement.clone());
                    updated += 1;
                }
            }
        }
        Ok((updated, updated > 0))
    })?;

    if updated > 0 {
        info!("Updated {} video URLs", updated);
    } else {
        info!("No videos to update");
    }
    Ok(updated)
}
