//! Failure taxonomy and per-kind handling policy.
//!
//! The workflow never retries on its own; every failure falls into one of
//! three buckets. Fatal conditions stop the process, a build error is
//! recorded for the next run and then stops the process, and everything
//! else is reported and skipped over.

use serde::{Deserialize, Serialize};

/// How a failure kind is handled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Severity {
    /// Terminate immediately; nothing is rolled back.
    Fatal,
    /// Persist a failure record for resume/discard on the next run, then terminate.
    Recorded,
    /// Report to the user and continue the workflow.
    Warning,
}

/// Closed set of failure kinds the workflow can produce.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FailureKind {
    /// CROSS_COMPILE missing from the process environment.
    CrossCompileUnset,
    /// Java runtime present but not the supported version.
    UnsupportedJava,
    /// A required input artifact (stock image, kernel image) is absent.
    MissingInputArtifact,
    /// The user answered Q, or gave a non-answer where only y/n is valid.
    UserQuit,
    /// The external signing tool or certificate generation failed.
    SigningFailed,
    /// The kernel build produced an error marker and no success marker.
    BuildError,
    /// Extra toolchain-variant libraries are not installed.
    OptionalLibsMissing,
    /// `make clean && make mrproper` exited non-zero.
    CleanFailed,
    /// `make kernelrelease` output did not contain the expected version.
    VersionMismatch,
    /// The toolchain path did not match the version extraction pattern.
    VersionUnparsed,
}

impl FailureKind {
    /// Human-readable name.
    pub fn as_str(&self) -> &'static str {
        match self {
            FailureKind::CrossCompileUnset => "cross_compile_unset",
            FailureKind::UnsupportedJava => "unsupported_java",
            FailureKind::MissingInputArtifact => "missing_input_artifact",
            FailureKind::UserQuit => "user_quit",
            FailureKind::SigningFailed => "signing_failed",
            FailureKind::BuildError => "build_error",
            FailureKind::OptionalLibsMissing => "optional_libs_missing",
            FailureKind::CleanFailed => "clean_failed",
            FailureKind::VersionMismatch => "version_mismatch",
            FailureKind::VersionUnparsed => "version_unparsed",
        }
    }
}

/// Total policy table mapping each failure kind to its handling.
pub fn severity(kind: FailureKind) -> Severity {
    match kind {
        FailureKind::CrossCompileUnset
        | FailureKind::UnsupportedJava
        | FailureKind::MissingInputArtifact
        | FailureKind::UserQuit
        | FailureKind::SigningFailed => Severity::Fatal,

        FailureKind::BuildError => Severity::Recorded,

        FailureKind::OptionalLibsMissing
        | FailureKind::CleanFailed
        | FailureKind::VersionMismatch
        | FailureKind::VersionUnparsed => Severity::Warning,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_only_build_error_is_recorded() {
        let kinds = [
            FailureKind::CrossCompileUnset,
            FailureKind::UnsupportedJava,
            FailureKind::MissingInputArtifact,
            FailureKind::UserQuit,
            FailureKind::SigningFailed,
            FailureKind::BuildError,
            FailureKind::OptionalLibsMissing,
            FailureKind::CleanFailed,
            FailureKind::VersionMismatch,
            FailureKind::VersionUnparsed,
        ];
        for kind in kinds {
            let recorded = severity(kind) == Severity::Recorded;
            assert_eq!(recorded, kind == FailureKind::BuildError, "{:?}", kind);
        }
    }

    #[test]
    fn test_clean_failure_is_warning() {
        assert_eq!(severity(FailureKind::CleanFailed), Severity::Warning);
    }

    #[test]
    fn test_missing_artifact_is_fatal() {
        assert_eq!(severity(FailureKind::MissingInputArtifact), Severity::Fatal);
    }

    #[test]
    fn test_unparsed_version_is_warning_not_fatal() {
        assert_eq!(severity(FailureKind::VersionUnparsed), Severity::Warning);
    }
}
