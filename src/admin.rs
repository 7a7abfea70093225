//! Admin session flag.
//!
//! Editing is gated on a flag stored under [`ADMIN_KEY`]. The password check
//! is a UI gate only: the flag lives in the same local storage as the lessons.

use log::info;
use subtle::ConstantTimeEq;

use crate::app_response::AppResponse;
use crate::local_storage::KeyValueStorage;

pub const ADMIN_KEY: &str = "learningLibraryAdmin";

const ADMIN_FLAG: &str = "true";

pub fn is_admin<S: KeyValueStorage>(storage: &S) -> bool {
    matches!(storage.get_item(ADMIN_KEY), Ok(Some(flag)) if flag == ADMIN_FLAG)
}

/// Sets the admin flag when `password` matches `expected`.
///
/// Returns `Ok(false)` on a wrong password and leaves the flag untouched.
pub fn login_admin<S: KeyValueStorage>(
    storage: &S,
    password: &str,
    expected: &str,
) -> Result<bool, AppResponse> {
    if !constant_time_compare(password, expected) {
        info!("Admin login rejected");
        return Ok(false);
    }

    storage.set_item(ADMIN_KEY, ADMIN_FLAG)?;
    info!("Admin session started");
    Ok(true)
}

pub fn logout_admin<S: KeyValueStorage>(storage: &S) -> Result<(), AppResponse> {
    storage.remove_item(ADMIN_KEY)?;
    info!("Admin session ended");
    Ok(())
}

fn constant_time_compare(a: &str, b: &str) -> bool {
    a.as_bytes().ct_eq(b.as_bytes()).into()
}
