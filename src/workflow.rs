use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::checkpoint::Checkpoint;
use crate::clear_cache::{invalidate_resource_table, HostOs};
use crate::config::Config;
use crate::error::{PatchError, Result};
use crate::manifest::{update_manifest, MANIFEST_FILE};
use crate::network_config::inject_network_config;
use crate::process::{CommandExecutor, CommandStatus};
use crate::target::Target;
use crate::tools::ExternalTools;

const REPACKAGE_PROMPT: &str = "Press enter to continue ...";

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum PipelineStage {
    Decompile,
    InjectNetworkConfig,
    UpdateManifest,
    Repackage,
    Resign,
    Cleanup,
}

impl PipelineStage {
    pub const ALL: [PipelineStage; 6] = [
        PipelineStage::Decompile,
        PipelineStage::InjectNetworkConfig,
        PipelineStage::UpdateManifest,
        PipelineStage::Repackage,
        PipelineStage::Resign,
        PipelineStage::Cleanup,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            PipelineStage::Decompile => "decompile",
            PipelineStage::InjectNetworkConfig => "inject network config",
            PipelineStage::UpdateManifest => "update manifest",
            PipelineStage::Repackage => "repackage",
            PipelineStage::Resign => "re-sign",
            PipelineStage::Cleanup => "cleanup",
        }
    }
}

impl fmt::Display for PipelineStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What a completed run did.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PatchReport {
    pub patched_apk: PathBuf,
    /// Stages in the order they ran.
    pub stages: Vec<PipelineStage>,
    pub manifest_updated: bool,
    pub used_fallback_build: bool,
    /// The signer ran and exited successfully.
    pub resigned: bool,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum PatchOutcome {
    /// The source APK does not exist; nothing was touched.
    SourceMissing(PathBuf),
    Patched(PatchReport),
}

/// Drives one target through decompile → inject → manifest → repackage →
/// re-sign → cleanup.
pub struct PatchPipeline<E, C> {
    cfg: Config,
    tools: ExternalTools,
    executor: E,
    checkpoint: C,
    home: Option<PathBuf>,
    host_os: Option<HostOs>,
}

impl<E: CommandExecutor, C: Checkpoint> PatchPipeline<E, C> {
    pub fn new(cfg: Config, executor: E, checkpoint: C) -> Self {
        Self {
            tools: ExternalTools::new(&cfg.tools),
            cfg,
            executor,
            checkpoint,
            home: dirs::home_dir(),
            host_os: HostOs::current(),
        }
    }

    /// Override where the stale apktool framework table is looked up.
    pub fn with_cache_location(mut self, home: Option<PathBuf>, host_os: Option<HostOs>) -> Self {
        self.home = home;
        self.host_os = host_os;
        self
    }

    pub fn executor(&self) -> &E {
        &self.executor
    }

    pub fn checkpoint(&self) -> &C {
        &self.checkpoint
    }

    pub fn patch(&mut self, target: &Target) -> Result<PatchOutcome> {
        if !target.source().is_file() {
            println!("[*]  {} not found, nothing to do", target.source().display());
            return Ok(PatchOutcome::SourceMissing(target.source().to_path_buf()));
        }

        self.check_tools()?;

        if self.cfg.clear_framework_cache {
            invalidate_resource_table(self.home.as_deref(), self.host_os);
        }

        let mut report = PatchReport {
            patched_apk: target.patched_apk().to_path_buf(),
            stages: Vec::with_capacity(PipelineStage::ALL.len()),
            manifest_updated: false,
            used_fallback_build: false,
            resigned: false,
        };

        for stage in PipelineStage::ALL {
            debug!(%stage, "entering stage");
            self.run_stage(stage, target, &mut report)
                .map_err(|err| err.in_stage(stage))?;
            report.stages.push(stage);
        }

        Ok(PatchOutcome::Patched(report))
    }

    /// Both jars must exist before anything is written.
    fn check_tools(&self) -> Result<()> {
        for jar in [self.cfg.tools.decompiler(), self.cfg.tools.signer()] {
            if !jar.is_file() {
                return Err(PatchError::ToolMissing(jar));
            }
        }
        Ok(())
    }

    fn run_stage(
        &mut self,
        stage: PipelineStage,
        target: &Target,
        report: &mut PatchReport,
    ) -> Result<()> {
        match stage {
            PipelineStage::Decompile => self.decompile(target),
            PipelineStage::InjectNetworkConfig => {
                inject_network_config(&self.cfg.network_config, target.decompiled_dir())?;
                Ok(())
            }
            PipelineStage::UpdateManifest => {
                report.manifest_updated = self.update_manifest(target)?;
                Ok(())
            }
            PipelineStage::Repackage => {
                report.used_fallback_build = self.repackage(target)?;
                Ok(())
            }
            PipelineStage::Resign => {
                report.resigned = self.resign(target)?;
                Ok(())
            }
            PipelineStage::Cleanup => {
                if self.cfg.keep_decompiled {
                    println!(
                        "[*]  Keeping decompiled directory {}",
                        target.decompiled_dir().display()
                    );
                } else {
                    clean_up(target.decompiled_dir());
                }
                Ok(())
            }
        }
    }

    fn decompile(&mut self, target: &Target) -> Result<()> {
        println!("[*]  Decompiling {}", target.source().display());
        let cmd = self
            .tools
            .decompile(target.source(), target.decompiled_dir());
        let status = self.executor.execute(&cmd)?;
        warn_on_failure(PipelineStage::Decompile, status);
        Ok(())
    }

    fn update_manifest(&mut self, target: &Target) -> Result<bool> {
        let path = target.decompiled_dir().join(MANIFEST_FILE);
        if update_manifest(&path)? {
            return Ok(true);
        }
        if self.cfg.require_manifest {
            return Err(PatchError::ManifestMissing(path));
        }
        eprintln!("[!]  No manifest at {}, skipping", path.display());
        Ok(false)
    }

    /// Returns whether the fallback build had to run.
    fn repackage(&mut self, target: &Target) -> Result<bool> {
        let out = target.patched_apk();
        println!("[*]  Repackaging to {}", out.display());
        if self.cfg.pause_before_repackage {
            self.checkpoint.wait(REPACKAGE_PROMPT)?;
        }

        // A leftover APK from an earlier run would satisfy the output check.
        if fs::remove_file(out).is_ok() {
            debug!("removed stale {}", out.display());
        }

        let primary_aapt2 = self.cfg.prefer_aapt2;
        self.build(target, primary_aapt2)?;
        if out.is_file() {
            return Ok(false);
        }

        println!(
            "[*]  Repackaging using {} to {}",
            compiler_name(!primary_aapt2),
            out.display()
        );
        self.build(target, !primary_aapt2)?;
        if !out.is_file() {
            if self.cfg.require_repackaged_output {
                return Err(PatchError::RepackageOutputMissing(out.to_path_buf()));
            }
            eprintln!("[!]  Repackaging produced no output at {}", out.display());
        }
        Ok(true)
    }

    fn build(&mut self, target: &Target, use_aapt2: bool) -> Result<()> {
        let cmd = self
            .tools
            .build(target.decompiled_dir(), target.patched_apk(), use_aapt2);
        let status = self.executor.execute(&cmd)?;
        warn_on_failure(PipelineStage::Repackage, status);
        Ok(())
    }

    /// Returns whether the APK was signed. An unsigned APK is never reported
    /// as patched.
    fn resign(&mut self, target: &Target) -> Result<bool> {
        let apk = target.patched_apk();
        if !apk.is_file() {
            eprintln!("[!]  {} missing, skipping re-sign", apk.display());
            return Ok(false);
        }

        println!("[*]  Re-signing apk {}", apk.display());
        let status = self.executor.execute(&self.tools.resign(apk))?;
        if !status.success() {
            return Err(PatchError::SigningFailed {
                apk: apk.to_path_buf(),
                status,
            });
        }
        Ok(true)
    }
}

/// Remove the decompiled tree. Missing or partially removable directories
/// are not an error.
pub fn clean_up(dir: &Path) {
    println!("[*]  Cleaning up directory {}", dir.display());
    if let Err(err) = fs::remove_dir_all(dir) {
        debug!("cleanup of {} incomplete: {err}", dir.display());
    }
}

fn compiler_name(use_aapt2: bool) -> &'static str {
    if use_aapt2 {
        "aapt2"
    } else {
        "aapt"
    }
}

fn warn_on_failure(stage: PipelineStage, status: CommandStatus) {
    if !status.success() {
        eprintln!("[!]  {stage}: tool finished with {status}");
    }
}
