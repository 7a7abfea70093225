//! # Lesson Library Core
//!
//! Local persistence and query layer for a catalog of learning lessons grouped
//! by category. Lessons are stored as one JSON collection in an LMDB-backed
//! key-value store and exposed both as a Rust API ([`lesson_store::LessonStore`])
//! and as C-compatible functions for UI shells.
//!
//! ## Features
//!
//! - **Pluggable storage**: the store runs over any [`local_storage::KeyValueStorage`];
//!   LMDB for durable data, in-memory for session data and tests
//! - **Typed lessons**: video and interactive lessons are distinct variants
//! - **Filtering and search**: by category, and case-insensitive text search
//! - **Quota-aware saves**: a full store is reported as `QuotaExceeded`
//! - **Media ingestion**: async, cancellable encoding of video files into data URIs
//!
//! ## Quick Start
//!
//! ```no_run
//! use lesson_library_core::{add_lesson, create_store, free_response};
//! use std::ffi::CString;
//!
//! let name = CString::new("learning_library").unwrap();
//! let state = create_store(name.as_ptr());
//!
//! let json = CString::new(
//!     r#"{"category":"math","title":"Algebra Basics","description":"Intro","type":"interactive","content":"x + 1 = 2"}"#,
//! ).unwrap();
//! let result = add_lesson(state, json.as_ptr());
//! free_response(result);
//! ```
//!
//! ## FFI Functions
//!
//! Every function returns a serialized [`app_response::AppResponse`]; payloads
//! travel as JSON inside `Ok`. Returned strings must be released with
//! [`free_response`].
//!
//! - [`create_store`] / [`close_store`] - Open and close a library handle
//! - [`add_lesson`], [`get_lesson_by_id`], [`get_all_lessons`], [`update_lesson`], [`delete_lesson`]
//! - [`filter_lessons`], [`search_lessons`], [`query_lessons`], [`count_lessons`], [`count_lessons_by_category`]
//! - [`validate_media_file`], [`ingest_media_file`] - Video upload helpers
//! - [`admin_login`], [`admin_logout`], [`is_admin`] - Admin editing gate

pub mod admin;
pub mod app_response;
pub mod config;
pub mod lesson_model;
pub mod lesson_store;
pub mod local_storage;
pub mod media;
pub mod seed;

use std::ffi::{CStr, CString};
use std::os::raw::c_char;

use log::{info, warn};
use serde::Serialize;
use tokio_util::sync::CancellationToken;

use crate::app_response::AppResponse;
use crate::config::StoreConfig;
use crate::lesson_model::{CategoryFilter, LessonPatch, NewLesson};
use crate::lesson_store::LessonStore;
use crate::local_storage::LmdbStorage;
use crate::media::MediaSource;

/// State behind the opaque pointer handed to FFI callers.
pub struct LibraryState {
    pub store: LessonStore<LmdbStorage>,
    pub config: StoreConfig,
}

impl LibraryState {
    /// Opens the LMDB-backed store named `name`, taking the remaining
    /// settings from `config`. A blank `name` falls back to
    /// [`StoreConfig::db_name`].
    pub fn open(name: &str, config: StoreConfig) -> Result<Self, AppResponse> {
        let name = if name.trim().is_empty() {
            config.db_name.clone()
        } else {
            name.to_string()
        };
        let storage = LmdbStorage::init(name, config.map_size_bytes())?;
        Ok(Self {
            store: LessonStore::new(storage),
            config,
        })
    }
}

/// Opens (or creates) a lesson library and returns an opaque handle.
///
/// Settings other than the name come from [`StoreConfig::from_env`]. The
/// storage directory is `<name>.lmdb`; an empty name uses the configured
/// `LESSON_LIBRARY_DB_NAME`.
///
/// # Parameters
///
/// * `name` - Null-terminated C string with the storage name or path prefix
///
/// # Returns
///
/// A pointer to the library state on success, or null on failure. Release it
/// with [`close_store`].
///
/// # Safety
///
/// `name` must be null or point to a valid null-terminated C string.
///
/// # Examples
///
/// ```no_run
/// use std::ffi::CString;
/// use lesson_library_core::{close_store, create_store, free_response};
///
/// let name = CString::new("learning_library").unwrap();
/// let state = create_store(name.as_ptr());
/// if !state.is_null() {
///     free_response(close_store(state));
/// }
/// ```
///
/// # Errors
///
/// Returns null pointer if:
/// - Input name pointer is null
/// - Input string contains invalid UTF-8
/// - The LMDB environment cannot be opened
#[no_mangle]
#[allow(clippy::not_unsafe_ptr_arg_deref)]
pub extern "C" fn create_store(name: *const c_char) -> *mut LibraryState {
    if name.is_null() {
        warn!("Null name pointer passed to create_store");
        return std::ptr::null_mut();
    }

    let name_str = match unsafe { CStr::from_ptr(name).to_str() } {
        Ok(s) => s,
        Err(e) => {
            warn!("Invalid UTF-8 in name parameter: {e}");
            return std::ptr::null_mut();
        }
    };

    info!("Opening lesson library at: {}.lmdb", name_str);

    match LibraryState::open(name_str, StoreConfig::from_env()) {
        Ok(state) => {
            info!("Lesson library opened");
            Box::into_raw(Box::new(state))
        }
        Err(e) => {
            warn!("Failed to open lesson library: {e}");
            std::ptr::null_mut()
        }
    }
}

/// Adds a lesson to the library.
///
/// The store assigns the id and `createdAt`, validates the lesson and
/// appends it to the collection.
///
/// # Parameters
///
/// * `state` - Pointer returned by [`create_store`]
/// * `json_ptr` - Null-terminated C string with the lesson JSON
///
/// # Returns
///
/// The created lesson inside `Ok`, or `SerializationError`,
/// `ValidationError` or `QuotaExceeded`. The returned string must be freed
/// with [`free_response`].
///
/// # Safety
///
/// Both pointers must be valid or null.
///
/// # JSON Format
///
/// ```json
/// {"category":"math","title":"Algebra Basics","description":"Intro","type":"video","videoUrl":"https://..."}
/// ```
#[no_mangle]
#[allow(clippy::not_unsafe_ptr_arg_deref)]
pub extern "C" fn add_lesson(state: *mut LibraryState, json_ptr: *const c_char) -> *const c_char {
    let state = match state_ref(state, "add_lesson") {
        Ok(state) => state,
        Err(error_ptr) => return error_ptr,
    };

    let json_str = match c_ptr_to_string(json_ptr, "JSON") {
        Ok(json) => json,
        Err(error_ptr) => return error_ptr,
    };

    let data: NewLesson = match serde_json::from_str(&json_str) {
        Ok(data) => data,
        Err(e) => {
            let error = AppResponse::SerializationError(format!("Invalid JSON: {e}"));
            return response_to_c_string(&error);
        }
    };

    match state.store.add(data) {
        Ok(lesson) => payload_to_c_string(&lesson),
        Err(e) => response_to_c_string(&e),
    }
}

/// Retrieves a lesson by id.
///
/// # Parameters
///
/// * `state` - Pointer returned by [`create_store`]
/// * `id` - Null-terminated C string with the lesson id
///
/// # Returns
///
/// The lesson inside `Ok`, or `NotFound` when there is none.
///
/// # Safety
///
/// Both pointers must be valid or null.
#[no_mangle]
#[allow(clippy::not_unsafe_ptr_arg_deref)]
pub extern "C" fn get_lesson_by_id(state: *mut LibraryState, id: *const c_char) -> *const c_char {
    let state = match state_ref(state, "get_lesson_by_id") {
        Ok(state) => state,
        Err(error_ptr) => return error_ptr,
    };

    let id_str = match c_ptr_to_string(id, "id") {
        Ok(id) => id,
        Err(error_ptr) => return error_ptr,
    };

    match state.store.get_by_id(&id_str) {
        Some(lesson) => payload_to_c_string(&lesson),
        None => {
            let error = AppResponse::NotFound(format!("No lesson found with id: {id_str}"));
            response_to_c_string(&error)
        }
    }
}

/// Retrieves every lesson in insertion order as a JSON array.
///
/// # Safety
///
/// `state` must be a pointer returned by [`create_store`] or null.
#[no_mangle]
#[allow(clippy::not_unsafe_ptr_arg_deref)]
pub extern "C" fn get_all_lessons(state: *mut LibraryState) -> *const c_char {
    match state_ref(state, "get_all_lessons") {
        Ok(state) => payload_to_c_string(&state.store.load()),
        Err(error_ptr) => error_ptr,
    }
}

/// Merges a partial lesson over the lesson with `id`.
///
/// Present fields overwrite stored ones (`{"title":"New title"}`,
/// `{"content":"..."}`, `{"videoUrl":"..."}`). A different `type` rebuilds the
/// type-specific fields from the patch. `id` and `createdAt` never change and
/// `updatedAt` is stamped.
///
/// # Parameters
///
/// * `state` - Pointer returned by [`create_store`]
/// * `id` - Null-terminated C string with the lesson id
/// * `json_ptr` - Null-terminated C string with the partial lesson JSON
///
/// # Returns
///
/// The merged lesson inside `Ok`, `NotFound` when the id does not exist, or
/// `ValidationError` when a set field is invalid.
///
/// # Safety
///
/// All pointers must be valid or null.
#[no_mangle]
#[allow(clippy::not_unsafe_ptr_arg_deref)]
pub extern "C" fn update_lesson(
    state: *mut LibraryState,
    id: *const c_char,
    json_ptr: *const c_char,
) -> *const c_char {
    let state = match state_ref(state, "update_lesson") {
        Ok(state) => state,
        Err(error_ptr) => return error_ptr,
    };

    let id_str = match c_ptr_to_string(id, "id") {
        Ok(id) => id,
        Err(error_ptr) => return error_ptr,
    };

    let json_str = match c_ptr_to_string(json_ptr, "JSON") {
        Ok(json) => json,
        Err(error_ptr) => return error_ptr,
    };

    let patch: LessonPatch = match serde_json::from_str(&json_str) {
        Ok(patch) => patch,
        Err(e) => {
            let error = AppResponse::SerializationError(format!("Error deserializing JSON: {e}"));
            return response_to_c_string(&error);
        }
    };

    match state.store.update(&id_str, patch) {
        Ok(Some(lesson)) => payload_to_c_string(&lesson),
        Ok(None) => {
            let error = AppResponse::NotFound(format!("No lesson found with id: {id_str}"));
            response_to_c_string(&error)
        }
        Err(e) => response_to_c_string(&e),
    }
}

/// Deletes the lesson with `id`.
///
/// # Returns
///
/// `Ok` on removal, `NotFound` when there was nothing to delete. Deleting an
/// unknown id leaves the stored collection untouched.
///
/// # Safety
///
/// Both pointers must be valid or null.
#[no_mangle]
#[allow(clippy::not_unsafe_ptr_arg_deref)]
pub extern "C" fn delete_lesson(state: *mut LibraryState, id: *const c_char) -> *const c_char {
    let state = match state_ref(state, "delete_lesson") {
        Ok(state) => state,
        Err(error_ptr) => return error_ptr,
    };

    let id_str = match c_ptr_to_string(id, "id") {
        Ok(id) => id,
        Err(error_ptr) => return error_ptr,
    };

    match state.store.delete(&id_str) {
        Ok(true) => response_to_c_string(&AppResponse::success("Lesson deleted successfully")),
        Ok(false) => {
            let not_found = AppResponse::NotFound(format!("No lesson found with id: {id_str}"));
            response_to_c_string(&not_found)
        }
        Err(e) => response_to_c_string(&e),
    }
}

/// Lessons in `category`, in insertion order.
///
/// # Parameters
///
/// * `state` - Pointer returned by [`create_store`]
/// * `category` - A category id (`"math"`, `"arts-crafts"`, ...) or `"all"`
///
/// # Returns
///
/// A JSON array inside `Ok`; an unknown category is a `ValidationError`.
#[no_mangle]
#[allow(clippy::not_unsafe_ptr_arg_deref)]
pub extern "C" fn filter_lessons(state: *mut LibraryState, category: *const c_char) -> *const c_char {
    let state = match state_ref(state, "filter_lessons") {
        Ok(state) => state,
        Err(error_ptr) => return error_ptr,
    };

    let filter = match category_filter(category) {
        Ok(filter) => filter,
        Err(error_ptr) => return error_ptr,
    };

    payload_to_c_string(&state.store.filter_by_category(filter))
}

/// Lessons whose title, description or content contain `query`,
/// ignoring case. A blank query returns every lesson.
#[no_mangle]
#[allow(clippy::not_unsafe_ptr_arg_deref)]
pub extern "C" fn search_lessons(state: *mut LibraryState, query: *const c_char) -> *const c_char {
    let state = match state_ref(state, "search_lessons") {
        Ok(state) => state,
        Err(error_ptr) => return error_ptr,
    };

    let query_str = match c_ptr_to_string(query, "query") {
        Ok(query) => query,
        Err(error_ptr) => return error_ptr,
    };

    payload_to_c_string(&state.store.search(&query_str))
}

/// Category filter and text search combined.
///
/// # Parameters
///
/// * `state` - Pointer returned by [`create_store`]
/// * `category` - A category id or `"all"`
/// * `query` - Search text; blank matches everything
///
/// # Safety
///
/// All pointers must be valid or null.
#[no_mangle]
#[allow(clippy::not_unsafe_ptr_arg_deref)]
pub extern "C" fn query_lessons(
    state: *mut LibraryState,
    category: *const c_char,
    query: *const c_char,
) -> *const c_char {
    let state = match state_ref(state, "query_lessons") {
        Ok(state) => state,
        Err(error_ptr) => return error_ptr,
    };

    let filter = match category_filter(category) {
        Ok(filter) => filter,
        Err(error_ptr) => return error_ptr,
    };

    let query_str = match c_ptr_to_string(query, "query") {
        Ok(query) => query,
        Err(error_ptr) => return error_ptr,
    };

    payload_to_c_string(&state.store.query(filter, &query_str))
}

/// Number of lessons in `category` (or `"all"`).
///
/// # Returns
///
/// A JSON number inside `Ok`.
#[no_mangle]
#[allow(clippy::not_unsafe_ptr_arg_deref)]
pub extern "C" fn count_lessons(state: *mut LibraryState, category: *const c_char) -> *const c_char {
    let state = match state_ref(state, "count_lessons") {
        Ok(state) => state,
        Err(error_ptr) => return error_ptr,
    };

    let filter = match category_filter(category) {
        Ok(filter) => filter,
        Err(error_ptr) => return error_ptr,
    };

    payload_to_c_string(&state.store.count(filter))
}

/// Per-category counts as a JSON object (`{"arts-crafts": 3, ...}`), with
/// every category present.
#[no_mangle]
#[allow(clippy::not_unsafe_ptr_arg_deref)]
pub extern "C" fn count_lessons_by_category(state: *mut LibraryState) -> *const c_char {
    let state = match state_ref(state, "count_lessons_by_category") {
        Ok(state) => state,
        Err(error_ptr) => return error_ptr,
    };

    let counts: serde_json::Map<String, serde_json::Value> = state
        .store
        .count_by_category()
        .into_iter()
        .map(|(category, count)| (category.as_str().to_string(), count.into()))
        .collect();

    payload_to_c_string(&counts)
}

/// Checks the file at `path` against a size limit.
///
/// # Parameters
///
/// * `state` - Pointer returned by [`create_store`]
/// * `path` - Null-terminated C string with the file path
/// * `limit_mb` - Limit in megabytes; zero or negative means the configured
///   `LESSON_LIBRARY_MAX_MEDIA_MB`
///
/// # Returns
///
/// A `{"valid": bool, "message": string}` object inside `Ok`. Files that are
/// not videos are reported as `ValidationError`, unreadable ones as
/// `MediaError`.
///
/// # Safety
///
/// Both pointers must be valid or null.
#[no_mangle]
#[allow(clippy::not_unsafe_ptr_arg_deref)]
pub extern "C" fn validate_media_file(
    state: *mut LibraryState,
    path: *const c_char,
    limit_mb: f64,
) -> *const c_char {
    let state = match state_ref(state, "validate_media_file") {
        Ok(state) => state,
        Err(error_ptr) => return error_ptr,
    };

    let source = match media_source(path) {
        Ok(source) => source,
        Err(error_ptr) => return error_ptr,
    };

    if !source.is_video() {
        let error = AppResponse::ValidationError("Please select a valid video file.".to_string());
        return response_to_c_string(&error);
    }

    let limit = if limit_mb > 0.0 {
        limit_mb
    } else {
        state.config.max_media_mb
    };
    payload_to_c_string(&source.validate_size(limit))
}

/// Validates the file at `path` against the configured limit and encodes it
/// as a data URI.
///
/// Blocks the calling thread until the file has been read.
///
/// # Returns
///
/// `{"data": "data:<mime>;base64,...", "fileName": ..., "size": ...}` inside
/// `Ok`, `ValidationError` when the file is too large, or `MediaError` when
/// it cannot be read.
///
/// # Safety
///
/// Both pointers must be valid or null.
#[no_mangle]
#[allow(clippy::not_unsafe_ptr_arg_deref)]
pub extern "C" fn ingest_media_file(state: *mut LibraryState, path: *const c_char) -> *const c_char {
    let state = match state_ref(state, "ingest_media_file") {
        Ok(state) => state,
        Err(error_ptr) => return error_ptr,
    };

    let source = match media_source(path) {
        Ok(source) => source,
        Err(error_ptr) => return error_ptr,
    };

    let validation = source.validate_size(state.config.max_media_mb);
    if !validation.valid {
        return response_to_c_string(&AppResponse::ValidationError(validation.message));
    }

    let runtime = match tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(e) => {
            let error = AppResponse::MediaError(format!("Could not start media runtime: {e}"));
            return response_to_c_string(&error);
        }
    };

    let cancel = CancellationToken::new();
    match runtime.block_on(media::ingest_media(&source, &cancel)) {
        Ok(ingested) => payload_to_c_string(&ingested),
        Err(e) => response_to_c_string(&e),
    }
}

/// Starts an admin session when `password` matches the configured one.
///
/// # Returns
///
/// `Ok` on success, `ValidationError` ("Incorrect password") otherwise.
///
/// # Safety
///
/// Both pointers must be valid or null.
#[no_mangle]
#[allow(clippy::not_unsafe_ptr_arg_deref)]
pub extern "C" fn admin_login(state: *mut LibraryState, password: *const c_char) -> *const c_char {
    let state = match state_ref(state, "admin_login") {
        Ok(state) => state,
        Err(error_ptr) => return error_ptr,
    };

    let password_str = match c_ptr_to_string(password, "password") {
        Ok(password) => password,
        Err(error_ptr) => return error_ptr,
    };

    match admin::login_admin(state.store.storage(), &password_str, &state.config.admin_password) {
        Ok(true) => response_to_c_string(&AppResponse::success("Admin session started")),
        Ok(false) => {
            let error = AppResponse::ValidationError("Incorrect password".to_string());
            response_to_c_string(&error)
        }
        Err(e) => response_to_c_string(&e),
    }
}

/// Ends the admin session. Logging out without a session is not an error.
#[no_mangle]
#[allow(clippy::not_unsafe_ptr_arg_deref)]
pub extern "C" fn admin_logout(state: *mut LibraryState) -> *const c_char {
    let state = match state_ref(state, "admin_logout") {
        Ok(state) => state,
        Err(error_ptr) => return error_ptr,
    };

    match admin::logout_admin(state.store.storage()) {
        Ok(()) => response_to_c_string(&AppResponse::success("Admin session ended")),
        Err(e) => response_to_c_string(&e),
    }
}

/// Whether an admin session is active, as `true` or `false` inside `Ok`.
#[no_mangle]
#[allow(clippy::not_unsafe_ptr_arg_deref)]
pub extern "C" fn is_admin(state: *mut LibraryState) -> *const c_char {
    match state_ref(state, "is_admin") {
        Ok(state) => payload_to_c_string(&admin::is_admin(state.store.storage())),
        Err(error_ptr) => error_ptr,
    }
}

/// Flushes and releases a handle obtained from [`create_store`].
///
/// # Returns
///
/// `Ok` once the environment has been synced and closed; `BadRequest` for a
/// null pointer.
///
/// # Safety
///
/// The pointer is consumed and must not be used afterwards, nor passed to
/// this function twice.
#[no_mangle]
#[allow(clippy::not_unsafe_ptr_arg_deref)]
pub extern "C" fn close_store(state: *mut LibraryState) -> *const c_char {
    if state.is_null() {
        let error = AppResponse::BadRequest("Null state pointer passed to close_store".to_string());
        return response_to_c_string(&error);
    }

    let state = unsafe { Box::from_raw(state) };
    let result = state.store.storage().sync();
    drop(state);

    match result {
        Ok(()) => response_to_c_string(&AppResponse::success("Lesson library closed successfully")),
        Err(e) => response_to_c_string(&e),
    }
}

/// Releases a string returned by any function in this library.
///
/// # Safety
///
/// `ptr` must come from this library and be freed at most once. Null is
/// ignored.
#[no_mangle]
#[allow(clippy::not_unsafe_ptr_arg_deref)]
pub extern "C" fn free_response(ptr: *const c_char) {
    if ptr.is_null() {
        return;
    }
    unsafe {
        drop(CString::from_raw(ptr as *mut c_char));
    }
}

fn state_ref<'a>(
    state: *mut LibraryState,
    caller: &str,
) -> Result<&'a LibraryState, *const c_char> {
    match unsafe { state.as_ref() } {
        Some(state) => Ok(state),
        None => {
            let error = AppResponse::BadRequest(format!("Null state pointer passed to {caller}"));
            Err(response_to_c_string(&error))
        }
    }
}

fn category_filter(ptr: *const c_char) -> Result<CategoryFilter, *const c_char> {
    let category = c_ptr_to_string(ptr, "category")?;
    category
        .parse()
        .map_err(|e: AppResponse| response_to_c_string(&e))
}

fn media_source(ptr: *const c_char) -> Result<MediaSource, *const c_char> {
    let path = c_ptr_to_string(ptr, "path")?;
    MediaSource::from_path(&path).map_err(|e| response_to_c_string(&e))
}

/// Serializes `payload` to JSON and wraps it in `AppResponse::Ok`.
fn payload_to_c_string<T: Serialize + ?Sized>(payload: &T) -> *const c_char {
    match serde_json::to_string(payload) {
        Ok(json) => response_to_c_string(&AppResponse::Ok(json)),
        Err(e) => {
            let error = AppResponse::SerializationError(format!("Failed to serialize result: {e}"));
            response_to_c_string(&error)
        }
    }
}

/// Converts an [`AppResponse`] to a C string owned by the caller.
///
/// Returns null if serialization or C string creation fails.
fn response_to_c_string(response: &AppResponse) -> *const c_char {
    let json = match serde_json::to_string(response) {
        Ok(j) => j,
        Err(e) => {
            warn!("Error serializing response: {e}");
            return std::ptr::null();
        }
    };

    match CString::new(json) {
        Ok(c_str) => c_str.into_raw(),
        Err(e) => {
            warn!("Error creating CString: {e}");
            std::ptr::null()
        }
    }
}

/// Converts a C string pointer to a Rust String.
///
/// On a null pointer or invalid UTF-8 the error holds a ready-made
/// `BadRequest` response naming `field_name`.
fn c_ptr_to_string(ptr: *const c_char, field_name: &str) -> Result<String, *const c_char> {
    if ptr.is_null() {
        let error = AppResponse::BadRequest(format!("Null {field_name} pointer"));
        return Err(response_to_c_string(&error));
    }

    match unsafe { CStr::from_ptr(ptr).to_str() } {
        Ok(s) => Ok(s.to_string()),
        Err(e) => {
            let error = AppResponse::BadRequest(format!("Invalid UTF-8 in {field_name}: {e}"));
            Err(response_to_c_string(&error))
        }
    }
}
