//! Interactive console decision surface.
//!
//! Presents collisions, rename prompts and retryable errors on the terminal
//! and blocks on stdin for the answer. A closed stdin counts as dismissing
//! the prompt, which the engine treats as an abort.

use std::io::{self, BufRead};

use crate::job::{
    CollisionAction, CollisionPrompt, CollisionVerdict, DecisionProvider, FileFacts, RetryChoice,
};
use crate::output as out;
use crate::utils::next_candidate_name;

#[derive(Debug, Default)]
pub struct ConsoleDecider;

impl ConsoleDecider {
    pub fn new() -> Self {
        Self
    }
}

/// One trimmed line from stdin; None when the stream is closed.
fn read_line() -> Option<String> {
    let mut line = String::new();
    match io::stdin().lock().read_line(&mut line) {
        Ok(0) | Err(_) => None,
        Ok(_) => Some(line.trim().to_string()),
    }
}

fn format_side(label: &str, facts: &FileFacts) -> String {
    if facts.is_dir {
        format!("  {label}: {} (folder)", facts.path.display())
    } else {
        format!(
            "  {label}: {} ({} bytes, modified {})",
            facts.path.display(),
            facts.size,
            format_date(facts.modified_ms)
        )
    }
}

fn format_date(ms: i64) -> String {
    chrono::DateTime::from_timestamp_millis(ms)
        .map(|dt| {
            dt.with_timezone(&chrono::Local)
                .format("%d/%m/%y %H:%M:%S")
                .to_string()
        })
        .unwrap_or_else(|| "unknown".to_string())
}

impl DecisionProvider for ConsoleDecider {
    fn ask_collision(&mut self, prompt: &CollisionPrompt) -> CollisionVerdict {
        out::print_warn(&prompt.kind.to_string());
        out::print_user(&format_side("source", &prompt.source));
        out::print_user(&format_side("target", &prompt.destination));

        let mut options =
            "[o]verwrite, [s]kip, [r]esume, [t]ime-newer, [d]iff-size, [c]ancel".to_string();
        if prompt.allow_rename {
            options.push_str(", re[n]ame");
        }
        if prompt.allow_apply_to_all {
            options.push_str(" (capital letter = apply to all)");
        }

        loop {
            out::print_prompt(&format!("{options}: "));
            let Some(line) = read_line() else {
                return CollisionVerdict::once(CollisionAction::Dismissed);
            };

            let all = prompt.allow_apply_to_all
                && line.chars().next().is_some_and(|c| c.is_uppercase());
            let action = match line.to_ascii_lowercase().as_str() {
                "o" => Some(CollisionAction::Overwrite),
                "s" => Some(CollisionAction::Skip),
                "r" => Some(CollisionAction::Resume),
                "t" => Some(CollisionAction::OverwriteIfOlder),
                "d" => Some(CollisionAction::OverwriteIfSizeDiffers),
                "c" => Some(CollisionAction::Cancel),
                "n" if prompt.allow_rename => Some(CollisionAction::Rename),
                _ => None,
            };

            match action {
                Some(action) if all => return CollisionVerdict::for_all(action),
                Some(action) => return CollisionVerdict::once(action),
                None => out::print_warn("unrecognized choice"),
            }
        }
    }

    fn ask_rename_target(&mut self, current_name: &str) -> Option<String> {
        let suggestion = next_candidate_name(current_name);
        out::print_prompt(&format!("new name [{suggestion}]: "));
        let line = read_line()?;
        if line.is_empty() {
            Some(suggestion)
        } else {
            Some(line)
        }
    }

    fn ask_retry_on_error(&mut self, title: &str, message: &str) -> RetryChoice {
        out::print_error(&format!("{title}: {message}"));
        loop {
            out::print_prompt("[r]etry / [a]bort: ");
            let Some(line) = read_line() else {
                return RetryChoice::Abort;
            };
            match line.to_ascii_lowercase().as_str() {
                "r" => return RetryChoice::Retry,
                "a" | "" => return RetryChoice::Abort,
                _ => out::print_warn("unrecognized choice"),
            }
        }
    }
}
