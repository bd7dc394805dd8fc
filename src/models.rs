//! Core data types for Neutron Build.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Why a recorded build attempt failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FailureReason {
    CompileError,
    LinkerError,
}

impl fmt::Display for FailureReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FailureReason::CompileError => write!(f, "Compile Error"),
            FailureReason::LinkerError => write!(f, "Linker Error"),
        }
    }
}

/// Persisted record of the last failed build, offered for resume/discard on
/// the next run and deleted once consumed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BuildFailureRecord {
    pub reason: FailureReason,
    /// Snippet of the output line preceding the last error marker, truncated
    /// for display.
    pub file_name: String,
    /// Full kernel version string (prefix + suffix) of the failed attempt.
    pub kernel_version: String,
    pub timestamp: String,
}

/// Kernel version string: a fixed per-profile prefix plus a user- or
/// store-supplied suffix. Embedded in build metadata and archive names.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KernelVersion(String);

impl KernelVersion {
    pub fn new(prefix: &str, suffix: &str) -> Self {
        KernelVersion(format!("{}{}", prefix, suffix))
    }

    /// Rehydrate from a stored full version string.
    pub fn from_full(full: impl Into<String>) -> Self {
        KernelVersion(full.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Archive stem: the version string minus its leading dash.
    pub fn archive_stem(&self) -> &str {
        self.0.strip_prefix('-').unwrap_or(&self.0)
    }
}

impl fmt::Display for KernelVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Status of the Java runtime check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JavaStatus {
    /// Supported runtime found; carries the reported version line.
    Ok(String),
    /// Binary was absent; an install was attempted.
    InstallAttempted,
}

/// Result of probing the host environment.
#[derive(Debug, Clone)]
pub struct EnvironmentReport {
    pub cpu_cores: u32,
    pub cpu_model: String,
    /// Required packages that were absent (install was attempted for each).
    pub missing_packages: Vec<String>,
    pub java: JavaStatus,
}

/// Resolved cross-compiler information.
#[derive(Debug, Clone)]
pub struct ToolchainInfo {
    /// Value of CROSS_COMPILE.
    pub path: String,
    /// Version substring extracted from the path, when the path matches the
    /// expected pattern.
    pub version: Option<String>,
    /// Whether the user's persisted choice names the extended GCC variant.
    pub variant: bool,
}

/// Everything the build runner and packager need for one run.
#[derive(Debug, Clone)]
pub struct BuildPlan {
    /// None only in package-only mode, where the archive name falls back to
    /// the placeholder.
    pub version: Option<KernelVersion>,
    /// True when resuming a previously recorded failure.
    pub resume: bool,
    /// Skip the build and package an existing image.
    pub package_only: bool,
    pub toolchain: ToolchainInfo,
}

/// Classification of a finished build run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BuildOutcome {
    Success,
    /// Carries the output line preceding the last error marker.
    Failed { last_file: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kernel_version_concatenates_prefix_and_suffix() {
        let v = KernelVersion::new("-Neutron-", "r42");
        assert_eq!(v.as_str(), "-Neutron-r42");
    }

    #[test]
    fn test_archive_stem_strips_leading_dash() {
        let v = KernelVersion::new("-Neutron-", "r42");
        assert_eq!(v.archive_stem(), "Neutron-r42");
    }

    #[test]
    fn test_archive_stem_without_leading_dash() {
        let v = KernelVersion::from_full("Neutron-r1");
        assert_eq!(v.archive_stem(), "Neutron-r1");
    }

    #[test]
    fn test_failure_reason_display() {
        assert_eq!(FailureReason::CompileError.to_string(), "Compile Error");
        assert_eq!(FailureReason::LinkerError.to_string(), "Linker Error");
    }

    #[test]
    fn test_failure_record_serialization_roundtrip() {
        let rec = BuildFailureRecord {
            reason: FailureReason::CompileError,
            file_name: "  CC  drivers/gpu/msm/kgsl.o".to_string(),
            kernel_version: "-Neutron-r7".to_string(),
            timestamp: "Mon 03 Aug 14:22".to_string(),
        };
        let json = serde_json::to_string(&rec).unwrap();
        let back: BuildFailureRecord = serde_json::from_str(&json).unwrap();
        assert_eq!(back, rec);
    }
}
