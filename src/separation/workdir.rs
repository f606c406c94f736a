//! Scoped ownership of a tool's scratch output
//!
//! A [`WorkingArea`] is only created for a directory confirmed to exist. From
//! then on the directory is deleted exactly once: explicitly through
//! [`WorkingArea::close`], or on drop along any early-return path.

use std::io;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// A directory deleted when this guard goes away
#[derive(Debug)]
pub struct WorkingArea {
    path: PathBuf,
    armed: bool,
}

impl WorkingArea {
    /// Take ownership of `path` if it is an existing directory
    pub fn adopt(path: impl Into<PathBuf>) -> Option<Self> {
        let path = path.into();
        if path.is_dir() {
            debug!("Working area: {}", path.display());
            Some(Self { path, armed: true })
        } else {
            None
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Delete the directory now, reporting failure
    pub fn close(mut self) -> io::Result<()> {
        self.armed = false;
        remove(&self.path)
    }
}

impl Drop for WorkingArea {
    fn drop(&mut self) {
        if self.armed {
            if let Err(e) = remove(&self.path) {
                warn!("Failed to remove {}: {}", self.path.display(), e);
            }
        }
    }
}

fn remove(path: &Path) -> io::Result<()> {
    match std::fs::remove_dir_all(path) {
        Ok(()) => {
            debug!("Removed {}", path.display());
            Ok(())
        }
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(e),
    }
}
