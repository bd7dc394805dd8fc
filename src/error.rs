//! Unified error type hierarchy for Neutron Build
//!
//! Provides structured error handling with EnvError, ToolchainError,
//! StoreError, SetupError, BuildError and PackageError, plus the top-level
//! WorkflowError that the binary reports from.

use std::io;
use thiserror::Error;

/// Host environment probing errors.
#[derive(Error, Debug)]
pub enum EnvError {
    #[error("Unsupported Java runtime: {0}")]
    UnsupportedJava(String),

    #[error("Installed package listing failed: {0}")]
    PackageListFailed(String),

    #[error("IO error during environment probing: {0}")]
    IoError(#[from] io::Error),
}

/// Cross-compiler resolution errors.
#[derive(Error, Debug)]
pub enum ToolchainError {
    #[error("CROSS_COMPILE is not set. Compilation will fail.")]
    CrossCompileUnset,

    #[error("Toolchain path '{0}' does not contain an 'el/<version>/b' segment")]
    VersionPatternMismatch(String),
}

/// Persisted build-state store errors.
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Invalid JSON in state file: {0}")]
    InvalidJson(#[from] serde_json::Error),

    #[error("IO error on state file: {0}")]
    IoError(#[from] io::Error),
}

/// Build preparation errors.
#[derive(Error, Debug)]
pub enum SetupError {
    #[error("Stock boot image not found: {0}")]
    StockImageMissing(String),

    #[error("Boot image extraction failed: {0}")]
    ExtractFailed(String),

    #[error("IO error during build setup: {0}")]
    IoError(#[from] io::Error),
}

/// Kernel build invocation errors.
#[derive(Error, Debug)]
pub enum BuildError {
    #[error("Failed to spawn '{cmd}': {reason}")]
    Spawn { cmd: String, reason: String },

    #[error("Build error near: {0}")]
    CompileFailed(String),

    #[error("IO error while streaming build output: {0}")]
    IoError(#[from] io::Error),
}

/// Flashable-archive packaging and signing errors.
#[derive(Error, Debug)]
pub enum PackageError {
    #[error("Kernel image not found at {0}; nothing to package")]
    ImageMissing(String),

    #[error("Required tool '{0}' not found on PATH")]
    ToolMissing(String),

    #[error("Archiver failed: {0}")]
    ZipFailed(String),

    #[error("Certificate generation failed: {0}")]
    KeygenFailed(String),

    #[error("Signing failed: {0}")]
    SignFailed(String),

    #[error("IO error during packaging: {0}")]
    IoError(#[from] io::Error),
}

/// Top-level workflow error. Every component error converts into this so
/// the binary has a single boundary to classify and report from.
#[derive(Error, Debug)]
pub enum WorkflowError {
    #[error(transparent)]
    Env(#[from] EnvError),

    #[error(transparent)]
    Toolchain(#[from] ToolchainError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Setup(#[from] SetupError),

    #[error(transparent)]
    Build(#[from] BuildError),

    #[error(transparent)]
    Package(#[from] PackageError),

    #[error("Prompt failed: {0}")]
    Prompt(String),

    #[error("Aborted by user")]
    UserQuit,
}

impl From<inquire::InquireError> for WorkflowError {
    fn from(e: inquire::InquireError) -> Self {
        match e {
            inquire::InquireError::OperationCanceled
            | inquire::InquireError::OperationInterrupted => WorkflowError::UserQuit,
            other => WorkflowError::Prompt(other.to_string()),
        }
    }
}

/// Result alias used throughout the workflow.
pub type Result<T> = std::result::Result<T, WorkflowError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_toolchain_error_display() {
        let err = ToolchainError::VersionPatternMismatch("/opt/gcc/bin".to_string());
        assert!(err.to_string().contains("/opt/gcc/bin"));
        assert!(err.to_string().contains("el/<version>/b"));
    }

    #[test]
    fn test_package_error_display() {
        let err = PackageError::ImageMissing("arch/arm/boot/zImage-dtb".to_string());
        assert_eq!(
            err.to_string(),
            "Kernel image not found at arch/arm/boot/zImage-dtb; nothing to package"
        );
    }

    #[test]
    fn test_workflow_error_is_transparent_for_build() {
        let err: WorkflowError = BuildError::CompileFailed("drivers/foo.c".to_string()).into();
        assert_eq!(err.to_string(), "Build error near: drivers/foo.c");
    }

    #[test]
    fn test_user_quit_from_cancelled_prompt() {
        let err: WorkflowError = inquire::InquireError::OperationCanceled.into();
        assert!(matches!(err, WorkflowError::UserQuit));
    }
}
