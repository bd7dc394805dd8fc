//! Neutron Build
//!
//! Interactive helper that automates an Android-style kernel
//! cross-compilation workflow on a Debian/Linux host: environment and
//! toolchain checks, the sequential make targets, build-output scanning,
//! and packaging of the boot image into a signed flashable archive.
//!
//! The system is organized into functional modules:
//! - **error**: Unified error type hierarchy
//! - **policy**: Closed failure taxonomy with a per-kind handling table
//! - **models**: Core data structures and types
//! - **profile**: Per-device build and packaging parameters
//! - **store**: Persisted preferences and the last-failure record
//! - **hardware**: CPU detection
//! - **environment**: Host prerequisite probing
//! - **toolchain**: Cross-compiler resolution
//! - **setup**: Build preparation and resume handling
//! - **runner**: Make invocation, streaming and transcript scanning
//! - **package**: Archive staging, compression and signing
//! - **ui**: Prompts, colored status lines and the progress spinner

pub mod environment;
pub mod error;
pub mod hardware;
pub mod models;
pub mod package;
pub mod policy;
pub mod profile;
pub mod runner;
pub mod setup;
pub mod store;
pub mod toolchain;
pub mod ui;

pub use error::{Result, WorkflowError};
pub use models::{BuildFailureRecord, BuildOutcome, BuildPlan, KernelVersion};
pub use profile::DeviceProfile;
pub use store::StateStore;
