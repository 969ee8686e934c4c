use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use tracing::{debug, warn};

/// apktool's cached framework resource table, relative to the app-data dir.
pub const RESOURCE_TABLE_SUBPATH: &str = "apktool/framework/1.apk";

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum HostOs {
    MacOs,
    Linux,
    Windows,
}

impl HostOs {
    /// The OS this binary was built for, if apktool has a known cache
    /// location there.
    pub fn current() -> Option<Self> {
        if cfg!(target_os = "macos") {
            Some(HostOs::MacOs)
        } else if cfg!(target_os = "linux") {
            Some(HostOs::Linux)
        } else if cfg!(target_os = "windows") {
            Some(HostOs::Windows)
        } else {
            None
        }
    }

    /// Per-user app-data directory, relative to the home directory.
    pub fn app_data_dir(self) -> &'static str {
        match self {
            HostOs::MacOs => "Library",
            HostOs::Linux => ".local/share",
            HostOs::Windows => "AppData/Local",
        }
    }
}

pub fn resource_table_path(home: &Path, os: HostOs) -> PathBuf {
    home.join(os.app_data_dir()).join(RESOURCE_TABLE_SUBPATH)
}

/// Delete the cached framework table so apktool rebuilds it.
///
/// Best effort: any failure is logged and swallowed. Returns whether a file
/// was actually removed.
pub fn invalidate_resource_table(home: Option<&Path>, os: Option<HostOs>) -> bool {
    println!("[*]  Clearing existing resource table");

    let (Some(home), Some(os)) = (home, os) else {
        debug!("no home directory or unsupported OS; skipping resource table cleanup");
        return false;
    };

    let path = resource_table_path(home, os);
    match fs::remove_file(&path) {
        Ok(()) => {
            debug!("removed {}", path.display());
            true
        }
        Err(err) if err.kind() == io::ErrorKind::NotFound => {
            debug!("no resource table at {}", path.display());
            false
        }
        Err(err) => {
            warn!("could not remove {}: {err}", path.display());
            false
        }
    }
}
