//! User-facing terminal output for the `atomwrite` binary.
//! Colors are used only when the stream is a TTY; logs go through tracing.

use owo_colors::OwoColorize;
use std::fmt::Display;

use crate::errors::AtomicWriteError;

#[derive(Clone, Copy)]
enum Stream {
    Out,
    Err,
}

fn is_tty(stream: Stream) -> bool {
    match stream {
        Stream::Out => atty::is(atty::Stream::Stdout),
        Stream::Err => atty::is(atty::Stream::Stderr),
    }
}

fn emit<L: Display>(stream: Stream, label: &str, colored: L, msg: &str) {
    let line = if is_tty(stream) {
        format!("{colored} {msg}")
    } else {
        format!("{label} {msg}")
    };
    match stream {
        Stream::Out => println!("{line}"),
        Stream::Err => eprintln!("{line}"),
    }
}

pub fn print_info(msg: &str) {
    emit(Stream::Out, "info:", "info:".cyan().bold(), msg);
}

pub fn print_warn(msg: &str) {
    emit(Stream::Err, "warn:", "warn:".yellow().bold(), msg);
}

pub fn print_error(msg: &str) {
    emit(Stream::Err, "error:", "error:".red().bold(), msg);
}

pub fn print_success(msg: &str) {
    emit(Stream::Out, "ok:", "ok:".green().bold(), msg);
}

/// Describe a failed write: the error, an OS hint if any, and what it means
/// for the destination.
pub fn print_write_error(err: &AtomicWriteError) {
    print_error(&err.to_string());
    if let Some(hint) = err.hint() {
        emit(Stream::Err, "hint:", "hint:".cyan().bold(), hint);
    }
    if err.is_committed() {
        print_warn("the new content is in place, but the rename may not survive a crash");
    } else {
        emit(Stream::Err, "note:", "note:".cyan().bold(), "destination left unchanged");
    }
}
