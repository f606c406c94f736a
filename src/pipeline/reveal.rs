//! Open the output folder in the platform file manager

use std::path::Path;
use std::process::Command;
use tracing::{debug, warn};

/// File-manager launcher for the current platform
pub fn opener() -> &'static str {
    if cfg!(target_os = "macos") {
        "open"
    } else if cfg!(target_os = "windows") {
        "explorer"
    } else {
        "xdg-open"
    }
}

/// Show `path` to the user; failures are logged only
pub fn reveal(path: &Path) {
    let program = opener();
    debug!("Revealing {} with {}", path.display(), program);

    match Command::new(program).arg(path).status() {
        // explorer.exe exits non-zero even when it opened the folder
        Ok(status) if status.success() || cfg!(target_os = "windows") => {}
        Ok(status) => warn!("{} exited with {} while opening {}", program, status, path.display()),
        Err(e) => warn!("Could not open {}: {}", path.display(), e),
    }
}
