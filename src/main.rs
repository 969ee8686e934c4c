use std::process::ExitCode;

use anyhow::{Context, Result};
use apk_proxy_helper::checkpoint::LineCheckpoint;
use apk_proxy_helper::clear_cache::{invalidate_resource_table, HostOs};
use apk_proxy_helper::cli::{Cli, Commands, PatchCommand};
use apk_proxy_helper::error::{EXIT_OK, EXIT_OTHER, EXIT_SOURCE_NOT_FOUND};
use apk_proxy_helper::process::SystemExecutor;
use apk_proxy_helper::{PatchError, PatchOutcome, PatchPipeline, Target};
use clap::Parser;
use tracing::{debug, Level};
use tracing_subscriber::FmtSubscriber;

fn main() -> ExitCode {
    let cli = Cli::parse();
    setup_logging(cli.verbose);

    match run(cli) {
        Ok(code) => ExitCode::from(code),
        Err(err) => {
            debug!("{err:?}");
            match err.downcast_ref::<PatchError>() {
                Some(patch_err) => {
                    eprintln!("[!]  {}", patch_err.user_message());
                    ExitCode::from(patch_err.exit_code())
                }
                None => {
                    eprintln!("[!]  {err:#}");
                    ExitCode::from(EXIT_OTHER)
                }
            }
        }
    }
}

fn run(cli: Cli) -> Result<u8> {
    match cli.command {
        Commands::Patch(opts) => patch(&opts),
        Commands::ClearCache => {
            if invalidate_resource_table(dirs::home_dir().as_deref(), HostOs::current()) {
                println!("[+]  Removed stale resource table");
            } else {
                println!("[*]  No resource table to remove");
            }
            Ok(EXIT_OK)
        }
    }
}

fn patch(opts: &PatchCommand) -> Result<u8> {
    let cfg = opts.to_config();
    let target = Target::new(&opts.apk)
        .with_context(|| format!("resolving {}", opts.apk.display()))?;
    debug!(?target, "resolved target");

    let mut pipeline = PatchPipeline::new(cfg, SystemExecutor, LineCheckpoint::stdin());
    match pipeline.patch(&target)? {
        PatchOutcome::SourceMissing(_) => Ok(EXIT_SOURCE_NOT_FOUND),
        PatchOutcome::Patched(report) => {
            if report.resigned {
                println!("[+]  Patched apk at {}", report.patched_apk.display());
            } else {
                println!(
                    "[*]  Finished without a signed apk at {}",
                    report.patched_apk.display()
                );
            }
            println!("[*]  Done.");
            Ok(EXIT_OK)
        }
    }
}

fn setup_logging(verbosity: u8) {
    let level = match verbosity {
        0 => Level::ERROR,
        1 => Level::WARN,
        2 => Level::INFO,
        _ => Level::DEBUG,
    };

    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .without_time()
        .with_writer(std::io::stderr)
        .finish();

    tracing::subscriber::set_global_default(subscriber).ok();
}
