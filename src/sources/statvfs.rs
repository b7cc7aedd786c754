use super::{FieldMap, PlatformFieldSource};
use crate::error::CollectorError;
use log::debug;
use std::ffi::CString;
use std::io;
use std::os::unix::ffi::OsStrExt;
use std::path::{Path, PathBuf};

/// Capacity figures for one mounted volume
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VolumeStats {
    pub total_bytes: i64,
    pub available_bytes: i64,
    pub read_only: bool,
}

/// Query `statvfs(3)` for the filesystem containing `path`
pub fn volume_stats(path: &Path) -> io::Result<VolumeStats> {
    let c_path = CString::new(path.as_os_str().as_bytes())
        .map_err(|e| io::Error::new(io::ErrorKind::InvalidInput, e))?;
    // SAFETY: statvfs is a plain C struct of integers, so all-zero is a valid value
    let mut stat: libc::statvfs = unsafe { std::mem::zeroed() };

    // SAFETY: c_path is NUL-terminated and stat is a valid out pointer
    let rc = unsafe { libc::statvfs(c_path.as_ptr(), &mut stat) };
    if rc != 0 {
        return Err(io::Error::last_os_error());
    }

    let block_size = stat.f_frsize as i64;
    Ok(VolumeStats {
        total_bytes: (stat.f_blocks as i64).saturating_mul(block_size),
        available_bytes: (stat.f_bavail as i64).saturating_mul(block_size),
        read_only: (stat.f_flag & libc::ST_RDONLY) != 0,
    })
}

/// Internal and external volume capacity
///
/// Keys: `internal_path`, `internal_total`, `internal_available`,
/// `external_state` (`mounted`, `mounted_ro` or `absent`) and, when the
/// external volume is mounted, `external_path`, `external_total`,
/// `external_available`, `external_writeable`.
#[derive(Debug, Clone)]
pub struct StatvfsStorageSource {
    internal_path: PathBuf,
    external_path: Option<PathBuf>,
}

impl StatvfsStorageSource {
    pub fn new(internal_path: impl Into<PathBuf>, external_path: Option<PathBuf>) -> Self {
        Self {
            internal_path: internal_path.into(),
            external_path,
        }
    }
}

impl PlatformFieldSource for StatvfsStorageSource {
    fn read(&self) -> Result<FieldMap, CollectorError> {
        let internal = volume_stats(&self.internal_path).map_err(|e| match e.kind() {
            io::ErrorKind::PermissionDenied => {
                CollectorError::AccessDenied(format!("{}: {}", self.internal_path.display(), e))
            }
            _ => CollectorError::acquisition(
                format!("statvfs {}", self.internal_path.display()),
                e.to_string(),
            ),
        })?;

        let mut fields = FieldMap::new()
            .with("internal_path", self.internal_path.display().to_string())
            .with("internal_total", internal.total_bytes)
            .with("internal_available", internal.available_bytes);

        let external = self
            .external_path
            .as_ref()
            .filter(|path| path.exists())
            .map(|path| (path, volume_stats(path)));

        match external {
            Some((path, Ok(stats))) => {
                let state = if stats.read_only { "mounted_ro" } else { "mounted" };
                fields.insert("external_state", state);
                fields.insert("external_path", path.display().to_string());
                fields.insert("external_total", stats.total_bytes);
                fields.insert("external_available", stats.available_bytes);
                fields.insert("external_writeable", !stats.read_only);
            }
            Some((path, Err(e))) => {
                debug!("External volume {} unavailable: {}", path.display(), e);
                fields.insert("external_state", "absent");
            }
            None => fields.insert("external_state", "absent"),
        }

        Ok(fields)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_volume_stats_for_temp_dir() {
        let dir = TempDir::new().unwrap();
        let stats = volume_stats(dir.path()).unwrap();
        assert!(stats.total_bytes > 0);
        assert!(stats.available_bytes <= stats.total_bytes);
    }

    #[test]
    fn test_volume_stats_missing_path() {
        assert!(volume_stats(Path::new("/nonexistent/devprobe/volume")).is_err());
    }

    #[test]
    fn test_read_with_external_volume() {
        let internal = TempDir::new().unwrap();
        let external = TempDir::new().unwrap();
        let source =
            StatvfsStorageSource::new(internal.path(), Some(external.path().to_path_buf()));

        let fields = source.read().unwrap();
        assert!(fields.get_i64("internal_total").unwrap() > 0);
        assert!(matches!(
            fields.get_text("external_state"),
            Some("mounted") | Some("mounted_ro")
        ));
        assert!(fields.contains("external_available"));
    }

    #[test]
    fn test_read_with_absent_external_volume() {
        let internal = TempDir::new().unwrap();
        let source = StatvfsStorageSource::new(
            internal.path(),
            Some(PathBuf::from("/nonexistent/devprobe/sdcard")),
        );

        let fields = source.read().unwrap();
        assert_eq!(fields.get_text("external_state"), Some("absent"));
        assert!(!fields.contains("external_total"));
    }

    #[test]
    fn test_missing_internal_volume_fails() {
        let source = StatvfsStorageSource::new("/nonexistent/devprobe/data", None);
        assert!(matches!(
            source.read(),
            Err(CollectorError::Acquisition { .. })
        ));
    }
}
