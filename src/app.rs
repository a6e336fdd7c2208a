//! Application orchestrator.
//! Loads/merges config, initializes logging, installs the Ctrl-C handler,
//! reads the payload and performs the atomic write.
//!
//! Exit status: 0 on success, otherwise the failing stage's error code
//! (`AtomicWriteError::code`), 130 if interrupted before the write started,
//! including while still waiting on the payload.

use anyhow::{Context, Result};
use std::io::Read;
use std::process::ExitCode;
use std::sync::{Arc, Mutex};
use tracing::{debug, error, info};

use atomwrite::cli::Args;
use atomwrite::config::{CONFIG_ENV, ensure_default_config_exists, load_config};
use atomwrite::output as out;
use atomwrite::{default_config_path, io_error_with_help, shutdown};
use atomwrite::{AtomicWriteError, WriteReport, atomic_write};

use crate::logging::init_tracing;

const EXIT_INTERRUPTED: u8 = 130;

/// Run the CLI application.
pub fn run(args: Args) -> Result<ExitCode> {
    // Handle --print-config / --init-config before logging init
    if args.print_config {
        print_config_location()?;
        return Ok(ExitCode::SUCCESS);
    }
    if args.init_config {
        match ensure_default_config_exists()? {
            Some(path) => {
                out::print_success(&format!("A template atomwrite config was written to: {}", path.display()))
            }
            None => out::print_info("A config file already exists; nothing written."),
        }
        return Ok(ExitCode::SUCCESS);
    }

    let dest = args
        .dest
        .clone()
        .context("missing destination path")?;

    // Config file first, CLI flags win.
    let mut cfg = load_config()?;
    args.apply_overrides(&mut cfg);

    // Initialize logging and capture the guard so we can drop it on signal
    let guard_opt = init_tracing(cfg.log_level, cfg.log_file.as_deref(), args.json)?;
    let guard_slot = Arc::new(Mutex::new(guard_opt));
    {
        let guard_slot = Arc::clone(&guard_slot);
        ctrlc::set_handler(move || {
            shutdown::request();
            let exit_now = shutdown::claim_exit_during_read();
            if exit_now {
                out::print_warn("Interrupted while reading the payload; destination not touched.");
            } else {
                out::print_warn("Received interrupt; stopping before the write starts...");
            }
            if let Ok(mut g) = guard_slot.lock() {
                let _ = g.take(); // drop guard here to flush tracing_appender
            }
            // A blocked stdin read would otherwise wait for EOF.
            if exit_now {
                std::process::exit(EXIT_INTERRUPTED.into());
            }
        })
        .context("install signal handler")?;
    }

    debug!(?args, options = ?cfg.options, "starting atomwrite");

    shutdown::begin_payload_read();
    let payload = read_payload(&args);
    let read_completed = shutdown::finish_payload_read();
    let payload = payload?;

    let code = if !read_completed || shutdown::is_requested() {
        out::print_warn("Interrupted; destination not touched.");
        ExitCode::from(EXIT_INTERRUPTED)
    } else {
        // Past this point the write runs to commit or cleanup regardless of Ctrl-C.
        match atomic_write(&payload, &dest, &cfg.options) {
            Ok(report) => {
                log_report(&report);
                ExitCode::SUCCESS
            }
            Err(e) => {
                log_failure(&e);
                out::print_write_error(&e);
                ExitCode::from(e.code().min(u8::MAX as u16) as u8)
            }
        }
    };

    // Ensure logs are flushed before exit
    if let Ok(mut g) = guard_slot.lock() {
        let _ = g.take();
    }

    Ok(code)
}

fn print_config_location() -> Result<()> {
    if let Ok(cfg_env) = std::env::var(CONFIG_ENV) {
        out::print_info(&format!("Using {CONFIG_ENV} (explicit):\n  {cfg_env}\n"));
    }
    let p = default_config_path()?;
    out::print_info(&format!("Config path in effect:\n  {}\n", p.display()));
    if p.exists() {
        out::print_info("A config file exists at that location.");
    } else {
        out::print_info("No config file exists there yet. Run with --init-config to create a template.");
    }
    Ok(())
}

fn read_payload(args: &Args) -> Result<Vec<u8>> {
    match &args.input {
        Some(p) => std::fs::read(p).map_err(io_error_with_help("read input", p)),
        None => {
            let mut buf = Vec::new();
            std::io::stdin()
                .lock()
                .read_to_end(&mut buf)
                .context("read payload from stdin")?;
            Ok(buf)
        }
    }
}

fn log_report(report: &WriteReport) {
    for m in &report.metadata {
        debug!(op = %m.op, status = ?m.status, "metadata");
    }
    info!(
        dest = %report.destination.display(),
        bytes = report.bytes_written,
        replaced = report.replaced,
        "Write completed"
    );
}

fn log_failure(e: &AtomicWriteError) {
    let code = e.code();
    let kind = e.kind_name();
    let disposition = e.disposition();
    match e.raw_os_error() {
        Some(os_code) => {
            error!(code, kind, %disposition, os_code, error = %e, "Write failed")
        }
        None => error!(code, kind, %disposition, error = %e, "Write failed"),
    }
}
