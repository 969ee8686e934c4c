//! Unified error handling for apk-proxy-helper
//!
//! This module defines the domain-specific error type returned by every
//! pipeline stage, together with the process exit code each failure maps to.

use std::io;
use std::path::PathBuf;

use quick_xml::events::attributes::AttrError;
use thiserror::Error;

use crate::process::CommandStatus;
use crate::workflow::PipelineStage;

/// Exit code when the APK was patched successfully.
pub const EXIT_OK: u8 = 0;
/// Exit code when the source APK does not exist (nothing to do).
pub const EXIT_SOURCE_NOT_FOUND: u8 = 1;
/// Exit code when the manifest could not be patched.
pub const EXIT_MANIFEST: u8 = 2;
/// Exit code when an external tool could not be run or produced nothing.
pub const EXIT_TOOL: u8 = 3;
/// Exit code for any other filesystem or configuration failure.
pub const EXIT_OTHER: u8 = 4;

/// Main error type for patch operations
#[derive(Debug, Error)]
pub enum PatchError {
    /// The manifest has no `<application>` element under its root
    #[error("AndroidManifest.xml has no <application> element")]
    ApplicationElementMissing,

    /// The decompiled tree has no manifest and the run requires one
    #[error("manifest not found at '{}'", .0.display())]
    ManifestMissing(PathBuf),

    /// The manifest parsed but cannot carry the proxy attributes
    #[error("malformed manifest: {0}")]
    MalformedManifest(String),

    /// XML syntax error while reading the manifest
    #[error("XML error: {0}")]
    Xml(#[from] quick_xml::Error),

    /// Attribute syntax error while reading the manifest
    #[error("XML attribute error: {0}")]
    XmlAttribute(#[from] AttrError),

    /// The network security config to inject is missing or unreadable
    #[error("cannot read network security config '{}': {source}", .path.display())]
    NetworkConfigUnreadable {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// An external tool could not be started
    #[error("failed to launch '{program}': {source}")]
    ToolLaunch {
        program: String,
        #[source]
        source: io::Error,
    },

    /// A configured tool jar does not exist
    #[error("tool not found at '{}'", .0.display())]
    ToolMissing(PathBuf),

    /// The signer ran but exited unsuccessfully
    #[error("signing '{}' failed with {status}", .apk.display())]
    SigningFailed { apk: PathBuf, status: CommandStatus },

    /// Both repackage attempts finished without writing the patched APK
    #[error("repackaging produced no output at '{}'", .0.display())]
    RepackageOutputMissing(PathBuf),

    /// The input path cannot be turned into a target
    #[error("invalid target path '{}'", .0.display())]
    InvalidTarget(PathBuf),

    /// File I/O error
    #[error("file I/O error for '{}': {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// Failure raised inside a pipeline stage
    #[error("{stage} failed: {source}")]
    Stage {
        stage: PipelineStage,
        #[source]
        source: Box<PatchError>,
    },
}

/// Result type alias for patch operations
pub type Result<T> = std::result::Result<T, PatchError>;

impl PatchError {
    /// Wrap an error with the stage it was raised in
    pub fn in_stage(self, stage: PipelineStage) -> Self {
        match self {
            already @ PatchError::Stage { .. } => already,
            other => PatchError::Stage {
                stage,
                source: Box::new(other),
            },
        }
    }

    /// The stage that failed, if known
    pub fn stage(&self) -> Option<PipelineStage> {
        match self {
            PatchError::Stage { stage, .. } => Some(*stage),
            _ => None,
        }
    }

    /// Process exit code for this failure
    pub fn exit_code(&self) -> u8 {
        match self {
            PatchError::Stage { source, .. } => source.exit_code(),
            PatchError::ApplicationElementMissing
            | PatchError::ManifestMissing(_)
            | PatchError::MalformedManifest(_)
            | PatchError::Xml(_)
            | PatchError::XmlAttribute(_) => EXIT_MANIFEST,
            PatchError::ToolLaunch { .. }
            | PatchError::ToolMissing(_)
            | PatchError::SigningFailed { .. }
            | PatchError::RepackageOutputMissing(_) => EXIT_TOOL,
            PatchError::NetworkConfigUnreadable { .. }
            | PatchError::InvalidTarget(_)
            | PatchError::Io { .. } => EXIT_OTHER,
        }
    }

    /// Get a user-friendly error message
    pub fn user_message(&self) -> String {
        match self {
            PatchError::Stage { stage, source } => {
                format!("{stage} failed: {}", source.user_message())
            }
            PatchError::ToolLaunch { program, .. } => format!(
                "Could not start '{program}'. Check that Java is installed and the deps/ jars are present."
            ),
            PatchError::ToolMissing(path) => format!(
                "'{}' does not exist. Put the jar in deps/ or pass --deps-dir, --apktool or --signer.",
                path.display()
            ),
            PatchError::NetworkConfigUnreadable { path, .. } => format!(
                "Place a network_security_config.xml at '{}' or pass --network-config.",
                path.display()
            ),
            PatchError::RepackageOutputMissing(path) => format!(
                "apktool did not write '{}' with either resource compiler. Re-run with --keep-decompiled to inspect the tree.",
                path.display()
            ),
            _ => self.to_string(),
        }
    }
}

/// Convert IO errors with path context
impl PatchError {
    pub fn from_io_error(path: impl Into<PathBuf>, error: io::Error) -> Self {
        PatchError::Io {
            path: path.into(),
            source: error,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = PatchError::ManifestMissing(PathBuf::from("/tmp/app/AndroidManifest.xml"));
        assert_eq!(
            err.to_string(),
            "manifest not found at '/tmp/app/AndroidManifest.xml'"
        );
    }

    #[test]
    fn test_exit_codes() {
        assert_eq!(PatchError::ApplicationElementMissing.exit_code(), EXIT_MANIFEST);

        let err = PatchError::ToolLaunch {
            program: "java".to_string(),
            source: io::Error::new(io::ErrorKind::NotFound, "missing"),
        };
        assert_eq!(err.exit_code(), EXIT_TOOL);

        let err = PatchError::from_io_error("/tmp/x", io::Error::other("boom"));
        assert_eq!(err.exit_code(), EXIT_OTHER);

        assert_eq!(
            PatchError::ToolMissing(PathBuf::from("deps/apk-signer.jar")).exit_code(),
            EXIT_TOOL
        );
        let err = PatchError::SigningFailed {
            apk: PathBuf::from("/tmp/app_proxy.apk"),
            status: CommandStatus::from_code(1),
        };
        assert_eq!(err.exit_code(), EXIT_TOOL);
        assert_eq!(
            err.to_string(),
            "signing '/tmp/app_proxy.apk' failed with exit code 1"
        );
    }

    #[test]
    fn test_stage_wrapping_keeps_exit_code() {
        let err = PatchError::ApplicationElementMissing.in_stage(PipelineStage::UpdateManifest);
        assert_eq!(err.stage(), Some(PipelineStage::UpdateManifest));
        assert_eq!(err.exit_code(), EXIT_MANIFEST);
        assert!(err.to_string().starts_with("update manifest failed"));

        let rewrapped = err.in_stage(PipelineStage::Cleanup);
        assert_eq!(rewrapped.stage(), Some(PipelineStage::UpdateManifest));
    }

    #[test]
    fn test_user_message() {
        let err = PatchError::ToolLaunch {
            program: "java".to_string(),
            source: io::Error::new(io::ErrorKind::NotFound, "missing"),
        };
        assert!(err.user_message().contains("deps/"));

        let err = PatchError::RepackageOutputMissing(PathBuf::from("/tmp/app_proxy.apk"));
        assert!(err.user_message().contains("--keep-decompiled"));

        let err = PatchError::ToolMissing(PathBuf::from("deps/apktool.jar"));
        assert!(err.user_message().contains("--deps-dir"));
    }
}
