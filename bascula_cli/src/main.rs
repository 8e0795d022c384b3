#![cfg_attr(not(test), deny(clippy::unwrap_used, clippy::expect_used))]
//! `bascula` binary: config loading, logging setup, and command dispatch.

mod cli;
mod error_fmt;
mod rt;
mod run;

use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use clap::Parser;
use eyre::WrapErr;
use tracing_subscriber::prelude::*;
use tracing_subscriber::{EnvFilter, Layer, fmt};

use crate::cli::{Cli, Commands, FILE_GUARD, JSON_MODE};
use crate::error_fmt::{exit_code_for_error, format_error_json, humanize};
use crate::run::RunArgs;

fn main() {
    let cli = Cli::parse();
    let _ = JSON_MODE.set(cli.json);

    if let Err(err) = real_main(cli) {
        // stdout may be the host link; reports always go to stderr
        if JSON_MODE.get().copied().unwrap_or(false) {
            eprintln!("{}", format_error_json(&err));
        } else {
            eprintln!("{}", humanize(&err));
        }
        std::process::exit(exit_code_for_error(&err));
    }
}

fn real_main(cli: Cli) -> eyre::Result<()> {
    color_eyre::install()?;

    let cfg = bascula_config::load_file(&cli.config)?;
    init_tracing(cli.json, cli.log_level.as_deref(), &cfg.logging)?;
    tracing::debug!(config = %cli.config.display(), "config loaded");

    match cli.cmd {
        Commands::Run {
            sim,
            port,
            baud,
            cycles,
            stats,
            rt,
            rt_prio,
            rt_lock,
        } => {
            let shutdown = Arc::new(AtomicBool::new(false));
            let flag = shutdown.clone();
            ctrlc::set_handler(move || flag.store(true, Ordering::Relaxed))
                .wrap_err("install ctrl-c handler")?;

            let args = RunArgs {
                sim,
                port,
                baud,
                cycles,
                stats,
                rt,
                rt_prio,
                rt_lock,
            };
            run::run_firmware(&cfg, &args, shutdown)?;
        }
        Commands::SelfCheck { sim, samples } => {
            let readings = run::self_check(&cfg, sim, samples)?;
            for (i, r) in readings.iter().enumerate() {
                if cli.json {
                    println!(
                        "{}",
                        serde_json::json!({ "sample": i, "raw": r.raw, "grams": r.grams })
                    );
                } else {
                    println!("sample {i}: raw={} grams={:.2}", r.raw, r.grams);
                }
            }
            if !cli.json {
                println!("self-check ok ({} samples)", readings.len());
            }
        }
        Commands::ShowCalibration => {
            let cal = run::show_calibration(&cfg)?;
            if cli.json {
                println!(
                    "{}",
                    serde_json::json!({
                        "scale_factor": cal.scale_factor,
                        "tare_offset": cal.tare_offset,
                        "store": cfg.storage.path,
                    })
                );
            } else {
                println!("store: {}", cfg.storage.path);
                println!("scale_factor: {:.8}", cal.scale_factor);
                println!("tare_offset: {}", cal.tare_offset);
            }
        }
    }
    Ok(())
}

/// Console layer on stderr (pretty or JSON), plus an optional JSON file layer
/// from `[logging]`. Level precedence: RUST_LOG, --log-level, [logging].level,
/// then "info".
fn init_tracing(
    json: bool,
    cli_level: Option<&str>,
    logging: &bascula_config::Logging,
) -> eyre::Result<()> {
    let filter = match EnvFilter::try_from_default_env() {
        Ok(f) => f,
        Err(_) => {
            let level = cli_level.or(logging.level.as_deref()).unwrap_or("info");
            EnvFilter::try_new(level).wrap_err_with(|| format!("invalid log level {level:?}"))?
        }
    };

    let console = if json {
        fmt::layer()
            .json()
            .with_writer(std::io::stderr)
            .boxed()
    } else {
        fmt::layer()
            .with_writer(std::io::stderr)
            .with_target(false)
            .boxed()
    };

    let file = match logging.file.as_deref() {
        Some(path) => {
            let path = Path::new(path);
            let dir = path
                .parent()
                .filter(|p| !p.as_os_str().is_empty())
                .unwrap_or_else(|| Path::new("."));
            let name = path
                .file_name()
                .ok_or_else(|| eyre::eyre!("logging.file has no file name: {}", path.display()))?;
            let appender = match logging.rotation.as_deref() {
                Some("daily") => tracing_appender::rolling::daily(dir, name),
                Some("hourly") => tracing_appender::rolling::hourly(dir, name),
                _ => tracing_appender::rolling::never(dir, name),
            };
            let (writer, guard) = tracing_appender::non_blocking(appender);
            let _ = FILE_GUARD.set(guard);
            Some(fmt::layer().json().with_ansi(false).with_writer(writer))
        }
        None => None,
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(console)
        .with(file)
        .try_init()
        .wrap_err("init tracing")?;
    Ok(())
}
