//! Local-disk file store for optional check-in photos.

use std::{fs, io};

use util::paths;

/// Persists a check-in photo and returns the stored reference (path).
///
/// Any IO failure here is fatal to the verification submission; there is no
/// partial success.
pub fn store_checkin_photo(session_id: i64, student_id: i64, bytes: &[u8]) -> io::Result<String> {
    let path = paths::checkin_photo_path(session_id, student_id);
    paths::ensure_parent_dir(&path)?;
    fs::write(&path, bytes)?;
    Ok(path.to_string_lossy().into_owned())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use util::config::AppConfig;

    #[test]
    #[serial]
    fn stores_photo_under_session_dir() {
        let dir = tempfile::tempdir().unwrap();
        AppConfig::set_attendance_storage_root(dir.path().to_string_lossy().into_owned());

        let stored = store_checkin_photo(11, 22, b"jpegbytes").unwrap();
        assert!(stored.contains("session_11"));
        assert_eq!(fs::read(&stored).unwrap(), b"jpegbytes");
    }
}
