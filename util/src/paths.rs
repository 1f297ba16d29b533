//! Filesystem layout for stored check-in photos.
//!
//! Layout: `{ATTENDANCE_STORAGE_ROOT}/session_{session_id}/student_{student_id}.jpg`

use crate::config;
use std::{
    fs, io,
    path::{Path, PathBuf},
};

/// Ensure the parent directory of a *file path* exists (no-op if none).
pub fn ensure_parent_dir<P: AsRef<Path>>(file_path: P) -> io::Result<()> {
    if let Some(parent) = file_path.as_ref().parent() {
        fs::create_dir_all(parent)?;
    }
    Ok(())
}

/// Global storage root (absolute), from `config::attendance_storage_root()`.
/// If relative in env, resolve against current_dir().
pub fn storage_root() -> PathBuf {
    let root = config::attendance_storage_root();
    let p = PathBuf::from(root);
    if p.is_absolute() {
        p
    } else {
        std::env::current_dir()
            .unwrap_or_else(|_| PathBuf::from("."))
            .join(p)
    }
}

/// Folder for one session's photos: `{STORAGE_ROOT}/session_{session_id}`
pub fn session_photo_dir(session_id: i64) -> PathBuf {
    storage_root().join(format!("session_{session_id}"))
}

/// Path of one student's check-in photo (does not create).
pub fn checkin_photo_path(session_id: i64, student_id: i64) -> PathBuf {
    session_photo_dir(session_id).join(format!("student_{student_id}.jpg"))
}
