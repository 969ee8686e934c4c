use std::path::PathBuf;

use clap::{ArgAction, Args, Parser, Subcommand};

use crate::config::Config;

#[derive(Parser, Debug)]
#[command(
    name = "apk-proxy-helper",
    about = "Patch an APK to trust user CAs so its traffic can be proxied",
    version,
    propagate_version = true,
    arg_required_else_help = true
)]
pub struct Cli {
    /// Verbosity level (-v warnings, -vv info, -vvv debug)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Decompile, inject the network config, rebuild and re-sign an APK.
    Patch(PatchCommand),
    /// Delete apktool's cached framework resource table.
    ClearCache,
}

#[derive(Args, Debug, Clone)]
pub struct PatchCommand {
    /// APK to patch. The result is written next to it as `<name>_proxy.apk`.
    pub apk: PathBuf,

    /// Network security config to inject.
    #[arg(long = "network-config", value_name = "PATH")]
    pub network_config: Option<PathBuf>,

    /// Directory holding apktool.jar and apk-signer.jar.
    #[arg(long = "deps-dir", value_name = "DIR")]
    pub deps_dir: Option<PathBuf>,

    /// Java launcher used to run the tool jars.
    #[arg(long, value_name = "PATH")]
    pub java: Option<PathBuf>,

    /// apktool jar, relative to the deps directory unless absolute.
    #[arg(long, value_name = "JAR")]
    pub apktool: Option<PathBuf>,

    /// Signer jar, relative to the deps directory unless absolute.
    #[arg(long, value_name = "JAR")]
    pub signer: Option<PathBuf>,

    /// Do not wait for Enter before repackaging.
    #[arg(short = 'y', long = "no-pause", action = ArgAction::SetTrue)]
    pub no_pause: bool,

    /// Fail when the decompiled tree has no AndroidManifest.xml.
    #[arg(long = "require-manifest", action = ArgAction::SetTrue)]
    pub require_manifest: bool,

    /// Continue when neither build attempt writes the patched APK.
    #[arg(long = "allow-missing-output", action = ArgAction::SetTrue)]
    pub allow_missing_output: bool,

    /// Build with aapt2 first and fall back to aapt.
    #[arg(long, action = ArgAction::SetTrue)]
    pub aapt2: bool,

    /// Leave the decompiled directory in place.
    #[arg(long = "keep-decompiled", action = ArgAction::SetTrue)]
    pub keep_decompiled: bool,

    /// Do not delete apktool's cached framework table first.
    #[arg(long = "keep-framework-cache", action = ArgAction::SetTrue)]
    pub keep_framework_cache: bool,
}

impl PatchCommand {
    pub fn to_config(&self) -> Config {
        let mut cfg = Config::default();

        if let Some(path) = &self.network_config {
            cfg.network_config = path.clone();
        }
        if let Some(dir) = &self.deps_dir {
            cfg.tools.deps_dir = dir.clone();
        }
        if let Some(java) = &self.java {
            cfg.tools.java = java.clone();
        }
        if let Some(jar) = &self.apktool {
            cfg.tools.decompiler_jar = jar.clone();
        }
        if let Some(jar) = &self.signer {
            cfg.tools.signer_jar = jar.clone();
        }

        cfg.pause_before_repackage = !self.no_pause;
        cfg.require_manifest = self.require_manifest;
        cfg.require_repackaged_output = !self.allow_missing_output;
        cfg.prefer_aapt2 = self.aapt2;
        cfg.keep_decompiled = self.keep_decompiled;
        cfg.clear_framework_cache = !self.keep_framework_cache;
        cfg
    }
}
