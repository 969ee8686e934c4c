//! Invocation contracts for apktool and the APK signer

use std::path::{Path, PathBuf};

use crate::config::ToolPaths;
use crate::process::ToolCommand;

/// Flag switching apktool's build to the aapt2 resource compiler
pub const AAPT2_FLAG: &str = "--use-aapt2";

#[derive(Clone, Debug)]
pub struct ExternalTools {
    java: PathBuf,
    decompiler: PathBuf,
    signer: PathBuf,
}

impl ExternalTools {
    pub fn new(paths: &ToolPaths) -> Self {
        Self {
            java: paths.java.clone(),
            decompiler: paths.decompiler(),
            signer: paths.signer(),
        }
    }

    fn jar(&self, jar: &Path) -> ToolCommand {
        ToolCommand::new(&self.java).arg("-jar").arg(jar)
    }

    /// `apktool -f d <apk> -o <out_dir>`
    pub fn decompile(&self, apk: &Path, out_dir: &Path) -> ToolCommand {
        self.jar(&self.decompiler)
            .arg("-f")
            .arg("d")
            .arg(apk)
            .arg("-o")
            .arg(out_dir)
    }

    /// `apktool -f b [--use-aapt2] <dir> -o <out_apk>`
    pub fn build(&self, dir: &Path, out_apk: &Path, use_aapt2: bool) -> ToolCommand {
        let mut cmd = self.jar(&self.decompiler).arg("-f").arg("b");
        if use_aapt2 {
            cmd = cmd.arg(AAPT2_FLAG);
        }
        cmd.arg(dir).arg("-o").arg(out_apk)
    }

    /// `signer --allowResign -a <apk>`
    pub fn resign(&self, apk: &Path) -> ToolCommand {
        self.jar(&self.signer).arg("--allowResign").arg("-a").arg(apk)
    }
}
