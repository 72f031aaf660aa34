//! Persistence collaborator: save a retrieved payload under a filename.
//!
//! [`DirectoryStorage`] writes into a download directory through a `.part`
//! temp file, fsyncs, then links it into place so a crash never leaves a
//! truncated file under the final name. Both the temp file and the final
//! name are claimed with create-if-absent operations, so concurrent saves of
//! the same name end up side by side instead of clobbering each other.

use std::fs::{self, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Temporary file suffix used before the final link.
pub const TEMP_SUFFIX: &str = ".part";

/// Saves payloads. Called exactly once per successful transfer, from
/// tokio's blocking pool.
pub trait Storage: Send + Sync + 'static {
    /// Persists `payload` as `filename`; returns where it ended up.
    fn save(&self, payload: &[u8], filename: &str) -> io::Result<PathBuf>;
}

impl<S: Storage> Storage for Arc<S> {
    fn save(&self, payload: &[u8], filename: &str) -> io::Result<PathBuf> {
        (**self).save(payload, filename)
    }
}

/// Path for the temp file: appends `.part` to the final path (e.g. `file.pdf` → `file.pdf.part`).
pub fn temp_path(final_path: &Path) -> PathBuf {
    let mut o = final_path.as_os_str().to_owned();
    o.push(TEMP_SUFFIX);
    PathBuf::from(o)
}

/// `name`, then `name (1).ext`, `name (2).ext`, ...
fn candidate_name(filename: &str, n: u32) -> String {
    if n == 0 {
        return filename.to_string();
    }
    match filename.rsplit_once('.') {
        Some((stem, ext)) if !stem.is_empty() => format!("{} ({}).{}", stem, n, ext),
        _ => format!("{} ({})", filename, n),
    }
}

/// Writes into one directory, never overwriting existing files.
#[derive(Debug, Clone)]
pub struct DirectoryStorage {
    dir: PathBuf,
}

impl DirectoryStorage {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Writes `payload` to a freshly created `tmp`. `Ok(false)` if `tmp` is
    /// already taken by another save.
    fn write_temp(tmp: &Path, payload: &[u8]) -> io::Result<bool> {
        let mut file = match OpenOptions::new().write(true).create_new(true).open(tmp) {
            Ok(f) => f,
            Err(e) if e.kind() == io::ErrorKind::AlreadyExists => return Ok(false),
            Err(e) => return Err(e),
        };
        let written = file.write_all(payload).and_then(|()| file.sync_all());
        if let Err(e) = written {
            let _ = fs::remove_file(tmp);
            return Err(e);
        }
        Ok(true)
    }

    /// Moves `tmp` to `final_path` unless something already lives there.
    /// `Ok(false)` if the name was taken; `tmp` is removed either way.
    fn publish(tmp: &Path, final_path: &Path) -> io::Result<bool> {
        let linked = match fs::hard_link(tmp, final_path) {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == io::ErrorKind::AlreadyExists => Ok(false),
            // No hard links on this filesystem: best effort without overwrite.
            Err(_) if !final_path.exists() => return fs::rename(tmp, final_path).map(|()| true),
            Err(e) => Err(e),
        };
        let _ = fs::remove_file(tmp);
        linked
    }
}

impl Storage for DirectoryStorage {
    fn save(&self, payload: &[u8], filename: &str) -> io::Result<PathBuf> {
        fs::create_dir_all(&self.dir)?;
        for n in 0u32.. {
            let final_path = self.dir.join(candidate_name(filename, n));
            if final_path.exists() {
                continue;
            }
            let tmp = temp_path(&final_path);
            if !Self::write_temp(&tmp, payload)? {
                continue;
            }
            if Self::publish(&tmp, &final_path)? {
                tracing::debug!(path = %final_path.display(), bytes = payload.len(), "saved");
                return Ok(final_path);
            }
        }
        Err(io::Error::new(
            io::ErrorKind::AlreadyExists,
            format!("no free name for {} in {}", filename, self.dir.display()),
        ))
    }
}
