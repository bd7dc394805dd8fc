//! Build runner: sequential make targets, output streaming, transcript
//! scanning.
//!
//! The build environment travels in an explicit `BuildEnv` applied to each
//! spawned command; the workflow never mutates its own process environment.
//! Success/failure is decided by scanning the retained stdout transcript,
//! not by make's exit code or anything written to stderr.

use crate::error::{BuildError, Result};
use crate::models::{BuildFailureRecord, BuildOutcome, FailureReason, KernelVersion};
use crate::policy::FailureKind;
use crate::profile::DeviceProfile;
use crate::store::StateStore;
use crate::ui;
use indicatif::ProgressBar;
use std::io::{BufRead, BufReader};
use std::path::Path;
use std::process::{Command, Stdio};

/// Environment handed to every build-system invocation.
#[derive(Debug, Clone)]
pub struct BuildEnv {
    pub arch: String,
    pub subarch: String,
    pub localversion: String,
    pub cross_compile: String,
}

impl BuildEnv {
    pub fn new(profile: &DeviceProfile, version: &KernelVersion, cross_compile: &str) -> Self {
        BuildEnv {
            arch: profile.arch.clone(),
            subarch: profile.subarch.clone(),
            localversion: version.as_str().to_string(),
            cross_compile: cross_compile.to_string(),
        }
    }

    fn apply(&self, cmd: &mut Command) {
        cmd.env("ARCH", &self.arch)
            .env("SUBARCH", &self.subarch)
            .env("LOCALVERSION", &self.localversion)
            .env("CROSS_COMPILE", &self.cross_compile);
    }
}

/// What the transcript scan found.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanResult {
    /// Line immediately preceding the last error-marker line, if any.
    pub last_error_context: Option<String>,
    /// A success-marker line was present somewhere in the output.
    pub succeeded: bool,
}

fn is_error_line(line: &str) -> bool {
    line.contains("Error") || line.contains("error") || line.contains("ERROR")
}

/// Scan a retained build transcript. For error markers the last match wins;
/// when the marker sits on the very first line the marker line itself is
/// kept as context.
pub fn scan_transcript(lines: &[String], success_marker: &str) -> ScanResult {
    let mut last_error_context = None;
    let mut succeeded = false;

    for (i, line) in lines.iter().enumerate() {
        if is_error_line(line) {
            let context = if i > 0 { &lines[i - 1] } else { line };
            last_error_context = Some(context.clone());
        }
        if line.contains(success_marker) {
            succeeded = true;
        }
    }

    ScanResult {
        last_error_context,
        succeeded,
    }
}

/// Classify a scan. The success marker takes precedence over earlier error
/// markers; a run fails only when an error was seen and the target image
/// was never reported ready.
pub fn classify(scan: &ScanResult) -> BuildOutcome {
    match &scan.last_error_context {
        None => BuildOutcome::Success,
        Some(_) if scan.succeeded => BuildOutcome::Success,
        Some(last_file) => BuildOutcome::Failed {
            last_file: last_file.clone(),
        },
    }
}

fn spawn_error(label: &str, reason: String) -> BuildError {
    BuildError::Spawn {
        cmd: label.to_string(),
        reason,
    }
}

/// Run a command with piped output, streaming both pipes to the console.
/// Only standard output is retained for the transcript; stderr is shown
/// but never scanned.
fn stream_command(
    label: &str,
    mut cmd: Command,
    pb: Option<&ProgressBar>,
) -> std::result::Result<Vec<String>, BuildError> {
    cmd.stdout(Stdio::piped()).stderr(Stdio::piped());

    let mut child = cmd
        .spawn()
        .map_err(|e| spawn_error(label, e.to_string()))?;
    let stdout = child
        .stdout
        .take()
        .ok_or_else(|| spawn_error(label, "failed to capture stdout".to_string()))?;
    let stderr = child
        .stderr
        .take()
        .ok_or_else(|| spawn_error(label, "failed to capture stderr".to_string()))?;

    // Drain stderr on a worker so neither pipe can fill up and stall make.
    let stderr_handle = std::thread::spawn(move || -> Vec<String> {
        BufReader::new(stderr)
            .lines()
            .map_while(|line| line.ok())
            .collect()
    });

    let mut transcript = Vec::new();
    for line in BufReader::new(stdout).lines() {
        let line = line?;
        match pb {
            Some(pb) => pb.println(&line),
            None => println!("{}", line),
        }
        transcript.push(line);
    }

    for line in stderr_handle.join().unwrap_or_default() {
        match pb {
            Some(pb) => pb.println(&line),
            None => eprintln!("{}", line),
        }
    }

    // Reap the child; the transcript scan decides the outcome.
    let status = child.wait()?;
    log::info!("{} exited with {}", label, status);

    Ok(transcript)
}

fn stream_make(
    env: &BuildEnv,
    root: &Path,
    args: &[&str],
    pb: Option<&ProgressBar>,
) -> std::result::Result<Vec<String>, BuildError> {
    let mut cmd = Command::new("make");
    cmd.args(args).current_dir(root);
    env.apply(&mut cmd);
    stream_command(&format!("make {}", args.join(" ")), cmd, pb)
}

/// Run a make target with inherited stdio (interactive curses targets).
fn interactive_make(env: &BuildEnv, root: &Path, target: &str) -> std::result::Result<(), BuildError> {
    let mut cmd = Command::new("make");
    cmd.arg(target).current_dir(root);
    env.apply(&mut cmd);
    let status = cmd
        .status()
        .map_err(|e| spawn_error(&format!("make {}", target), e.to_string()))?;
    log::info!("make {} exited with {}", target, status);
    Ok(())
}

/// Run a make target and capture its combined stdout.
fn captured_make(
    env: &BuildEnv,
    root: &Path,
    target: &str,
) -> std::result::Result<String, BuildError> {
    let mut cmd = Command::new("make");
    cmd.arg(target).current_dir(root);
    env.apply(&mut cmd);
    let output = cmd
        .output()
        .map_err(|e| spawn_error(&format!("make {}", target), e.to_string()))?;
    Ok(String::from_utf8_lossy(&output.stdout).into_owned())
}

/// Drive the build: defconfig, menuconfig, kernelrelease check, parallel
/// make, then the transcript scan. On failure a BuildFailureRecord is
/// persisted before the typed error is returned; there is no retry.
pub fn run(
    version: &KernelVersion,
    cross_compile: &str,
    profile: &DeviceProfile,
    root: &Path,
    cores: u32,
    store: &mut StateStore,
) -> Result<BuildOutcome> {
    let env = BuildEnv::new(profile, version, cross_compile);

    println!("Preparing defconfig...");
    stream_make(&env, root, &[&profile.defconfig], None)?;

    println!("Preparing menuconfig...");
    interactive_make(&env, root, "menuconfig")?;

    println!("Preparing kernelrelease...");
    let release = captured_make(&env, root, "kernelrelease")?;
    if release.contains(version.as_str()) {
        ui::ok("Kernel Version set correctly");
    } else {
        ui::report(FailureKind::VersionMismatch, "Kernel Version not set correctly");
    }

    ui::header("Building...");
    let jobs = format!("-j{}", cores.max(1));
    let pb = ui::spinner("Building kernel");
    let transcript = stream_make(&env, root, &[jobs.as_str()], Some(&pb));
    pb.finish_and_clear();
    let transcript = transcript?;

    let scan = scan_transcript(&transcript, &profile.success_marker);
    match classify(&scan) {
        BuildOutcome::Success => {
            ui::ok("Build succeeded");
            Ok(BuildOutcome::Success)
        }
        BuildOutcome::Failed { last_file } => {
            let truncated: String = last_file.chars().take(60).collect();
            let record = BuildFailureRecord {
                reason: FailureReason::CompileError,
                file_name: truncated.clone(),
                kernel_version: version.as_str().to_string(),
                timestamp: chrono::Local::now().format("%a %d %b %H:%M").to_string(),
            };
            store.record_failure(record)?;
            ui::report(FailureKind::BuildError, "Build error");
            Err(BuildError::CompileFailed(truncated).into())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MARKER: &str = "arch/arm/boot/zImage-dtb is ready";

    fn lines(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_success_marker_overrides_earlier_errors() {
        // Synthetic transcript from the workflow contract: the success
        // marker wins even though an error marker appears earlier.
        let transcript = lines(&["foo", "error: bar", "baz", "arch/arm/boot/zImage-dtb is ready"]);
        let scan = scan_transcript(&transcript, MARKER);
        assert!(scan.succeeded);
        assert_eq!(scan.last_error_context.as_deref(), Some("foo"));
        assert_eq!(classify(&scan), BuildOutcome::Success);
    }

    #[test]
    fn test_clean_transcript_is_success() {
        let transcript = lines(&["  CC  init/main.o", "  LD  vmlinux"]);
        let scan = scan_transcript(&transcript, MARKER);
        assert_eq!(classify(&scan), BuildOutcome::Success);
    }

    #[test]
    fn test_last_error_wins() {
        let transcript = lines(&[
            "  CC  drivers/first.o",
            "first.c:1: error: one",
            "  CC  drivers/second.o",
            "second.c:9: Error: two",
            "make: *** [drivers] stopped",
        ]);
        let scan = scan_transcript(&transcript, MARKER);
        // The line preceding the LAST error marker is kept. The final make
        // summary does not contain a marker spelling, so "second" wins.
        assert_eq!(
            scan.last_error_context.as_deref(),
            Some("  CC  drivers/second.o")
        );
        assert_eq!(
            classify(&scan),
            BuildOutcome::Failed {
                last_file: "  CC  drivers/second.o".to_string()
            }
        );
    }

    #[test]
    fn test_error_on_first_line_keeps_the_line_itself() {
        let transcript = lines(&["error: no rule to make target", "stopping"]);
        let scan = scan_transcript(&transcript, MARKER);
        assert_eq!(
            scan.last_error_context.as_deref(),
            Some("error: no rule to make target")
        );
    }

    #[test]
    fn test_uppercase_marker_detected() {
        let transcript = lines(&["  LD  vmlinux", "ld: ERROR: undefined reference"]);
        let scan = scan_transcript(&transcript, MARKER);
        assert_eq!(scan.last_error_context.as_deref(), Some("  LD  vmlinux"));
        assert!(matches!(classify(&scan), BuildOutcome::Failed { .. }));
    }

    #[test]
    fn test_empty_transcript_is_success() {
        let scan = scan_transcript(&[], MARKER);
        assert_eq!(classify(&scan), BuildOutcome::Success);
    }

    #[test]
    fn test_stderr_never_enters_the_scanned_transcript() {
        // Compiler diagnostics on stderr must not flip the classification;
        // only the streamed stdout is scanned.
        let mut cmd = Command::new("sh");
        cmd.arg("-c")
            .arg("echo '  CC  drivers/ok.o'; echo 'gcc: error: boom' >&2");
        let transcript = stream_command("sh -c", cmd, None).unwrap();
        assert_eq!(transcript, vec!["  CC  drivers/ok.o".to_string()]);

        let scan = scan_transcript(&transcript, MARKER);
        assert_eq!(scan.last_error_context, None);
        assert_eq!(classify(&scan), BuildOutcome::Success);
    }

    #[test]
    fn test_build_env_carries_profile_and_version() {
        let profile = DeviceProfile::hammerhead();
        let version = KernelVersion::new("-Neutron-", "r9");
        let env = BuildEnv::new(&profile, &version, "/opt/tc/bin/arm-eabi-");
        assert_eq!(env.arch, "arm");
        assert_eq!(env.subarch, "arm");
        assert_eq!(env.localversion, "-Neutron-r9");
        assert_eq!(env.cross_compile, "/opt/tc/bin/arm-eabi-");
    }
}
