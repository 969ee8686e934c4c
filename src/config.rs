use std::env;
use std::path::PathBuf;

pub const DEPS_DIR: &str = "deps";
pub const DEFAULT_JAVA: &str = "java";
pub const DEFAULT_DECOMPILER_JAR: &str = "apktool.jar";
pub const DEFAULT_SIGNER_JAR: &str = "apk-signer.jar";
pub const DEFAULT_NETWORK_CONFIG: &str = "network_security_config.xml";

/// Where the external tools live.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ToolPaths {
    /// Java launcher used to run both jars.
    pub java: PathBuf,
    /// Directory holding the tool jars.
    pub deps_dir: PathBuf,
    /// apktool jar, relative to `deps_dir` unless absolute.
    pub decompiler_jar: PathBuf,
    /// Signer jar, relative to `deps_dir` unless absolute.
    pub signer_jar: PathBuf,
}

impl ToolPaths {
    pub fn decompiler(&self) -> PathBuf {
        self.deps_dir.join(&self.decompiler_jar)
    }

    pub fn signer(&self) -> PathBuf {
        self.deps_dir.join(&self.signer_jar)
    }
}

impl Default for ToolPaths {
    fn default() -> Self {
        Self {
            java: PathBuf::from(DEFAULT_JAVA),
            deps_dir: default_deps_dir(),
            decompiler_jar: PathBuf::from(DEFAULT_DECOMPILER_JAR),
            signer_jar: PathBuf::from(DEFAULT_SIGNER_JAR),
        }
    }
}

/// `deps/` next to the running executable, or `./deps` when that is absent.
pub fn default_deps_dir() -> PathBuf {
    env::current_exe()
        .ok()
        .and_then(|exe| exe.parent().map(|dir| dir.join(DEPS_DIR)))
        .filter(|dir| dir.is_dir())
        .unwrap_or_else(|| PathBuf::from(DEPS_DIR))
}

#[derive(Clone, Debug)]
pub struct Config {
    pub tools: ToolPaths,
    pub network_config: PathBuf,
    pub pause_before_repackage: bool,
    pub require_manifest: bool,
    pub require_repackaged_output: bool,
    pub prefer_aapt2: bool,
    pub keep_decompiled: bool,
    pub clear_framework_cache: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            tools: ToolPaths::default(),
            network_config: PathBuf::from(DEFAULT_NETWORK_CONFIG),
            pause_before_repackage: true,
            require_manifest: false,
            require_repackaged_output: true,
            prefer_aapt2: false,
            keep_decompiled: false,
            clear_framework_cache: true,
        }
    }
}
