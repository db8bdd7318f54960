//! Consistent, colored user-facing messages on stdout/stderr.
//! Colors are enabled only when the stream is a TTY.

use std::io::{self, Write};

use owo_colors::OwoColorize;

fn stdout_is_tty() -> bool {
    atty::is(atty::Stream::Stdout)
}

pub fn print_info(msg: &str) {
    if stdout_is_tty() {
        println!("{} {}", "info:".cyan().bold(), msg);
    } else {
        println!("info: {}", msg);
    }
}

pub fn print_warn(msg: &str) {
    if stdout_is_tty() {
        eprintln!("{} {}", "warn:".yellow().bold(), msg);
    } else {
        eprintln!("warn: {}", msg);
    }
}

pub fn print_error(msg: &str) {
    if stdout_is_tty() {
        eprintln!("{} {}", "error:".red().bold(), msg);
    } else {
        eprintln!("error: {}", msg);
    }
}

pub fn print_success(msg: &str) {
    if stdout_is_tty() {
        println!("{} {}", "ok:".green().bold(), msg);
    } else {
        println!("ok: {}", msg);
    }
}

/// Print a plain user-facing line (no prefix). Use this for primary outputs
/// such as "Transferred N files" which users may script against.
pub fn print_user(msg: &str) {
    println!("{}", msg);
}

/// Print an inline prompt (no newline) and flush so the cursor waits on it.
pub fn print_prompt(msg: &str) {
    if stdout_is_tty() {
        print!("{} {}", "?".magenta().bold(), msg);
    } else {
        print!("? {}", msg);
    }
    let _ = io::stdout().flush();
}
