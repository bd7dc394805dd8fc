//! Terminal interaction: colored status lines, prompts and the progress
//! spinner.
//!
//! The spinner is cosmetic only. It runs on indicatif's own ticker and is
//! scoped to the surrounding operation, so there is no shared shutdown flag
//! to coordinate.

use crate::error::{Result, WorkflowError};
use crate::policy::{severity, FailureKind, Severity};
use indicatif::{ProgressBar, ProgressStyle};
use inquire::{Confirm, Text};
use std::io::Write;
use std::time::Duration;
use termcolor::{Color, ColorChoice, ColorSpec, StandardStream, WriteColor};

fn colored_line(color: Color, bold: bool, msg: &str) {
    let mut stdout = StandardStream::stdout(ColorChoice::Auto);
    let _ = stdout.set_color(ColorSpec::new().set_fg(Some(color)).set_bold(bold));
    let _ = writeln!(stdout, "{}", msg);
    let _ = stdout.reset();
}

/// Green OK line.
pub fn ok(msg: &str) {
    colored_line(Color::Green, false, &format!("OK: {}", msg));
}

/// Yellow warning line.
pub fn warn(msg: &str) {
    colored_line(Color::Yellow, false, &format!("WARNING: {}", msg));
}

/// Red failure line.
pub fn fail(msg: &str) {
    colored_line(Color::Red, false, &format!("FAIL: {}", msg));
}

/// Blue informational line.
pub fn info(msg: &str) {
    colored_line(Color::Blue, false, msg);
}

/// Magenta section header between rules.
pub fn header(msg: &str) {
    let rule = "-".repeat(81);
    println!("{}", rule);
    colored_line(Color::Magenta, true, msg);
    println!("{}", rule);
}

/// Report a classified failure with the coloring its severity calls for.
/// Fatal and recorded kinds print red; warnings print yellow.
pub fn report(kind: FailureKind, msg: &str) {
    match severity(kind) {
        Severity::Warning => warn(msg),
        Severity::Fatal | Severity::Recorded => fail(msg),
    }
    log::warn!("{}: {}", kind.as_str(), msg);
}

/// Yes/no question with a default.
pub fn confirm(msg: &str, default: bool) -> Result<bool> {
    Ok(Confirm::new(msg).with_default(default).prompt()?)
}

/// Free-text question.
pub fn ask_text(msg: &str) -> Result<String> {
    Ok(Text::new(msg).prompt()?)
}

/// Strict y/n question where any other answer quits the workflow, matching
/// the discard/keep gate.
pub fn ask_yes_no_or_quit(msg: &str) -> Result<bool> {
    let answer = ask_text(msg)?.trim().to_uppercase();
    match answer.as_str() {
        "Y" => Ok(true),
        "N" => Ok(false),
        _ => Err(WorkflowError::UserQuit),
    }
}

/// Enter-to-continue gate; Q quits.
pub fn press_enter_or_quit(msg: &str) -> Result<()> {
    let answer = ask_text(msg)?;
    if answer.trim().eq_ignore_ascii_case("q") {
        return Err(WorkflowError::UserQuit);
    }
    Ok(())
}

/// Start a steady-tick spinner with a message. Callers finish or clear it
/// when their operation completes.
pub fn spinner(msg: &str) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    if let Ok(style) = ProgressStyle::default_spinner().template("{spinner:.cyan} {msg}") {
        pb.set_style(style);
    }
    pb.set_message(msg.to_string());
    pb.enable_steady_tick(Duration::from_millis(150));
    pb
}
