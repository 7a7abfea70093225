//! The lesson store: CRUD, filtering and search over the persisted collection.
//!
//! The whole collection lives as one JSON array under [`LESSONS_KEY`] and is
//! rewritten on every mutation. Every operation re-reads the backend, so
//! results always reflect the latest persisted state. Mutations run their
//! load-modify-save sequence under a store-owned lock.

use std::sync::{Mutex, PoisonError};

use chrono::Utc;
use log::{debug, error, info, warn};
use rand::Rng;

use crate::app_response::AppResponse;
use crate::lesson_model::{Category, CategoryFilter, Lesson, LessonPatch, NewLesson};
use crate::local_storage::KeyValueStorage;

/// Storage key holding the serialized lesson collection.
pub const LESSONS_KEY: &str = "learningLibraryLessons";

pub struct LessonStore<S: KeyValueStorage> {
    storage: S,
    write_lock: Mutex<()>,
}

impl<S: KeyValueStorage> LessonStore<S> {
    pub fn new(storage: S) -> Self {
        Self {
            storage,
            write_lock: Mutex::new(()),
        }
    }

    pub fn storage(&self) -> &S {
        &self.storage
    }

    /// Returns every lesson in insertion order.
    ///
    /// An absent or unreadable collection is logged and reported as empty.
    /// Individual records that do not fit the lesson schema are logged and
    /// skipped; the next write drops them.
    pub fn load(&self) -> Vec<Lesson> {
        let stored = match self.storage.get_item(LESSONS_KEY) {
            Ok(Some(json)) => json,
            Ok(None) => return Vec::new(),
            Err(e) => {
                error!("Error loading lessons: {e}");
                return Vec::new();
            }
        };

        let records: Vec<serde_json::Value> = match serde_json::from_str(&stored) {
            Ok(records) => records,
            Err(e) => {
                error!("Error loading lessons: stored collection is not valid JSON: {e}");
                return Vec::new();
            }
        };

        records
            .into_iter()
            .enumerate()
            .filter_map(|(index, record)| match serde_json::from_value(record) {
                Ok(lesson) => Some(lesson),
                Err(e) => {
                    error!("Skipping unreadable lesson at position {index}: {e}");
                    None
                }
            })
            .collect()
    }

    /// Replaces the persisted collection in a single write.
    pub fn save(&self, lessons: &[Lesson]) -> Result<(), AppResponse> {
        let json = serde_json::to_string(lessons).map_err(|e| {
            error!("Error saving lessons: {e}");
            AppResponse::from(e)
        })?;

        self.storage.set_item(LESSONS_KEY, &json).map_err(|e| {
            if e.is_quota_exceeded() {
                error!("Storage quota exceeded while saving {} lessons", lessons.len());
            } else {
                error!("Error saving lessons: {e}");
            }
            e
        })
    }

    pub fn get_by_id(&self, id: &str) -> Option<Lesson> {
        self.load().into_iter().find(|lesson| lesson.id == id)
    }

    /// Validates `data`, assigns an id and creation time, and appends it.
    pub fn add(&self, data: NewLesson) -> Result<Lesson, AppResponse> {
        data.validate()?;

        self.mutate(|lessons| {
            let lesson = Lesson::from_new(generate_id(), data, Utc::now());
            lessons.push(lesson.clone());
            Ok((lesson, true))
        })
        .inspect(|lesson| info!("Added lesson {} ({})", lesson.id, lesson.category))
    }

    /// Merges `patch` over the lesson with `id`.
    ///
    /// Returns `Ok(None)` without writing when no such lesson exists. Only
    /// the fields the patch sets are validated, so records written by older
    /// clients stay editable.
    pub fn update(&self, id: &str, patch: LessonPatch) -> Result<Option<Lesson>, AppResponse> {
        self.mutate(|lessons| {
            let Some(existing) = lessons.iter_mut().find(|lesson| lesson.id == id) else {
                debug!("Update skipped, no lesson with id {id}");
                return Ok((None, false));
            };

            existing.apply(patch, Utc::now())?;
            Ok((Some(existing.clone()), true))
        })
    }

    /// Removes the lesson with `id`.
    ///
    /// `Ok(false)` means there was nothing to remove and nothing was written.
    pub fn delete(&self, id: &str) -> Result<bool, AppResponse> {
        self.mutate(|lessons| {
            let before = lessons.len();
            lessons.retain(|lesson| lesson.id != id);
            let removed = lessons.len() != before;
            Ok((removed, removed))
        })
        .inspect(|removed| {
            if *removed {
                info!("Deleted lesson {id}");
            }
        })
    }

    pub fn filter_by_category(&self, filter: CategoryFilter) -> Vec<Lesson> {
        let lessons = self.load();
        match filter {
            CategoryFilter::All => lessons,
            CategoryFilter::Only(_) => lessons
                .into_iter()
                .filter(|lesson| filter.matches(lesson.category))
                .collect(),
        }
    }

    /// Case-insensitive substring search over title, description and content.
    ///
    /// A blank query returns every lesson. Otherwise the query is matched as
    /// given, surrounding whitespace included.
    pub fn search(&self, query: &str) -> Vec<Lesson> {
        self.query(CategoryFilter::All, query)
    }

    /// Category filter followed by search, in one pass over the collection.
    pub fn query(&self, filter: CategoryFilter, query: &str) -> Vec<Lesson> {
        let match_all = query.trim().is_empty();
        let needle = query.to_lowercase();
        self.load()
            .into_iter()
            .filter(|lesson| filter.matches(lesson.category))
            .filter(|lesson| match_all || lesson.matches_query(&needle))
            .collect()
    }

    pub fn count(&self, filter: CategoryFilter) -> usize {
        self.load()
            .iter()
            .filter(|lesson| filter.matches(lesson.category))
            .count()
    }

    /// Lesson count for each category, in display order.
    pub fn count_by_category(&self) -> Vec<(Category, usize)> {
        let lessons = self.load();
        Category::ALL
            .iter()
            .map(|category| {
                let count = lessons
                    .iter()
                    .filter(|lesson| lesson.category == *category)
                    .count();
                (*category, count)
            })
            .collect()
    }

    /// Runs a load-modify-save sequence under the write lock.
    ///
    /// `apply` returns its result and whether the collection changed; the
    /// collection is saved only when it did. If `apply` or the save fails,
    /// nothing is persisted.
    pub(crate) fn mutate<T, F>(&self, apply: F) -> Result<T, AppResponse>
    where
        F: FnOnce(&mut Vec<Lesson>) -> Result<(T, bool), AppResponse>,
    {
        let _guard = self.write_lock.lock().unwrap_or_else(PoisonError::into_inner);

        let mut lessons = self.load();
        let (result, changed) = apply(&mut lessons)?;
        if changed {
            self.save(&lessons).inspect_err(|e| {
                warn!("Discarding in-memory change after failed save: {e}");
            })?;
        }
        Ok(result)
    }
}

/// Produces a fresh lesson id.
///
/// The id is the current time in milliseconds followed by a random 64-bit
/// value, both in base 36. Uniqueness is probabilistic.
pub fn generate_id() -> String {
    let millis = Utc::now().timestamp_millis().max(0) as u64;
    let random: u64 = rand::thread_rng().gen();
    format!("{}{}", to_base36(millis), to_base36(random))
}

fn to_base36(mut value: u64) -> String {
    const DIGITS: &[u8; 36] = b"0123456789abcdefghijklmnopqrstuvwxyz";

    if value == 0 {
        return "0".to_string();
    }

    let mut out = Vec::new();
    while value > 0 {
        out.push(DIGITS[(value % 36) as usize]);
        value /= 36;
    }
    out.reverse();
    String::from_utf8_lossy(&out).into_owned()
}
