//! Input APK and the paths derived from it

use std::env;
use std::ffi::OsString;
use std::path::{Component, Path, PathBuf};

use crate::error::{PatchError, Result};

/// Inserted between the file stem and the extension of the patched APK
pub const PATCHED_MARKER: &str = "_proxy";
/// Appended to the decompiled directory name when the source has no extension
const DECOMPILED_SUFFIX: &str = "_decompiled";

/// The APK being patched. Paths are derived once and never change.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Target {
    source: PathBuf,
    base_name: String,
    decompiled_dir: PathBuf,
    patched_apk: PathBuf,
}

impl Target {
    /// Resolve a user-supplied path (`~` expanded, made absolute).
    pub fn new(path: impl AsRef<Path>) -> Result<Self> {
        let path = expand_home(path.as_ref());
        let absolute = if path.is_absolute() {
            path
        } else {
            env::current_dir()
                .map_err(|err| PatchError::from_io_error(&path, err))?
                .join(path)
        };
        Self::from_absolute(normalize(&absolute))
    }

    /// Derive paths for an already absolute source.
    pub fn from_absolute(source: PathBuf) -> Result<Self> {
        let (Some(parent), Some(stem)) = (source.parent(), source.file_stem()) else {
            return Err(PatchError::InvalidTarget(source));
        };
        let extension = source.extension();

        let mut decompiled_name = stem.to_os_string();
        if extension.is_none() {
            decompiled_name.push(DECOMPILED_SUFFIX);
        }

        let mut patched_name: OsString = stem.to_os_string();
        patched_name.push(PATCHED_MARKER);
        if let Some(ext) = extension {
            patched_name.push(".");
            patched_name.push(ext);
        }

        Ok(Self {
            base_name: stem.to_string_lossy().into_owned(),
            decompiled_dir: parent.join(decompiled_name),
            patched_apk: parent.join(patched_name),
            source,
        })
    }

    pub fn source(&self) -> &Path {
        &self.source
    }

    pub fn base_name(&self) -> &str {
        &self.base_name
    }

    pub fn decompiled_dir(&self) -> &Path {
        &self.decompiled_dir
    }

    pub fn patched_apk(&self) -> &Path {
        &self.patched_apk
    }
}

fn expand_home(path: &Path) -> PathBuf {
    let mut components = path.components();
    match components.next() {
        Some(Component::Normal(first)) if first == "~" => match dirs::home_dir() {
            Some(home) => home.join(components.as_path()),
            None => path.to_path_buf(),
        },
        _ => path.to_path_buf(),
    }
}

/// Lexically drop `.` and resolve `..` without touching the filesystem.
fn normalize(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                out.pop();
            }
            other => out.push(other.as_os_str()),
        }
    }
    out
}
