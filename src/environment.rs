//! Host environment prober: CPU, required packages, Java runtime.
//!
//! The Java policy is asymmetric on purpose, matching long-standing
//! behavior: a wrong version is fatal, while a missing binary only triggers
//! an install attempt. See DESIGN.md before changing either branch.

use crate::error::EnvError;
use crate::hardware;
use crate::models::{EnvironmentReport, JavaStatus};
use crate::ui;
use std::path::Path;
use std::process::Command;

/// Debian packages the build workflow depends on.
pub const REQUIRED_PACKAGES: &[&str] = &[
    "bison",
    "build-essential",
    "curl",
    "flex",
    "git",
    "gnupg",
    "gperf",
    "libesd0-dev",
    "liblz4-tool",
    "libncurses5-dev",
    "libsdl1.2-dev",
    "libwxgtk2.8-dev",
    "libxml2",
    "libxml2-utils",
    "lzop",
    "openjdk-7-jdk",
    "openjdk-7-jre",
    "pngcrush",
    "schedtool",
    "squashfs-tools",
    "xsltproc",
    "zip",
    "g++-multilib",
    "gcc-multilib",
    "lib32ncurses5-dev",
    "lib32readline-gplv2-dev",
    "lib32z1-dev",
    "pv",
    "openjdk-7-jre-headless",
    "abootimg",
];

/// Required packages absent from an `apt --installed list` transcript.
/// Substring matching against the raw listing.
pub fn missing_packages(installed_listing: &str) -> Vec<&'static str> {
    REQUIRED_PACKAGES
        .iter()
        .copied()
        .filter(|pkg| !installed_listing.contains(pkg))
        .collect()
}

/// True when `java -version` output names a supported runtime.
pub fn java_version_supported(version_output: &str) -> bool {
    version_output.contains("\"1.7.0") && version_output.contains("OpenJDK")
}

fn installed_listing() -> Result<String, EnvError> {
    let output = Command::new("apt")
        .arg("--installed")
        .arg("list")
        .output()
        .map_err(|e| EnvError::PackageListFailed(e.to_string()))?;
    if !output.status.success() {
        return Err(EnvError::PackageListFailed(format!(
            "apt exited with {}",
            output.status
        )));
    }
    Ok(String::from_utf8_lossy(&output.stdout).into_owned())
}

fn install_package(name: &str) {
    ui::info(&format!("Installing {}...", name));
    let status = Command::new("sudo")
        .args(["apt-get", "install", "-y", name])
        .status();
    match status {
        Ok(s) if s.success() => log::info!("installed {}", name),
        Ok(s) => ui::warn(&format!("apt-get install {} exited with {}", name, s)),
        Err(e) => ui::warn(&format!("could not run apt-get for {}: {}", name, e)),
    }
}

fn check_java() -> Result<JavaStatus, EnvError> {
    println!("Checking Java version...");
    if !Path::new("/usr/bin/java").exists() {
        ui::fail("Java not installed");
        println!("Installing OpenJDK 7...");
        for pkg in ["openjdk-7-jre", "openjdk-7-jdk", "openjdk-7-jre-headless"] {
            install_package(pkg);
        }
        return Ok(JavaStatus::InstallAttempted);
    }

    let output = Command::new("java").arg("-version").output()?;
    // java -version reports on stderr
    let version = String::from_utf8_lossy(&output.stderr).into_owned();
    if java_version_supported(&version) {
        ui::ok("Java Runtime Environment version: OpenJDK 1.7.0");
        Ok(JavaStatus::Ok(version.lines().next().unwrap_or("").to_string()))
    } else {
        println!("{}", version.trim_end());
        Err(EnvError::UnsupportedJava(
            version.lines().next().unwrap_or("unknown").to_string(),
        ))
    }
}

/// Probe the host: CPU info, required packages (installing any that are
/// missing), Java runtime. A wrong Java version is the only fatal outcome.
pub fn probe() -> Result<EnvironmentReport, EnvError> {
    let cpu = hardware::detect_cpu();
    log::info!("cpu: {} with {} core(s)", cpu.model, cpu.count);

    println!("Checking build environment...");
    let listing = installed_listing()?;
    let missing: Vec<String> = missing_packages(&listing)
        .into_iter()
        .map(String::from)
        .collect();
    for pkg in &missing {
        install_package(pkg);
    }
    ui::ok("Build Environment");

    let java = check_java()?;

    Ok(EnvironmentReport {
        cpu_cores: cpu.count,
        cpu_model: cpu.model,
        missing_packages: missing,
        java,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_packages_empty_when_all_listed() {
        let listing = REQUIRED_PACKAGES.join("\n");
        assert!(missing_packages(&listing).is_empty());
    }

    #[test]
    fn test_missing_packages_reports_absent_entries() {
        let listing = "bison/stable 2:3.8.2 amd64 [installed]\nzip/stable 3.0 amd64 [installed]";
        let missing = missing_packages(listing);
        assert!(missing.contains(&"flex"));
        assert!(missing.contains(&"abootimg"));
        assert!(!missing.contains(&"bison"));
        assert!(!missing.contains(&"zip"));
    }

    #[test]
    fn test_java_version_supported_openjdk_17() {
        let out = "java version \"1.7.0_261\"\nOpenJDK Runtime Environment (IcedTea 2.6.22)";
        assert!(java_version_supported(out));
    }

    #[test]
    fn test_java_version_rejects_oracle_and_newer() {
        let oracle = "java version \"1.7.0_80\"\nJava(TM) SE Runtime Environment";
        assert!(!java_version_supported(oracle));

        let newer = "openjdk version \"11.0.2\"\nOpenJDK Runtime Environment";
        assert!(!java_version_supported(newer));
    }
}
