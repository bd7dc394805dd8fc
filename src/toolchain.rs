//! Cross-compiler resolution: CROSS_COMPILE, version extraction, variant
//! preference.

use crate::error::{Result, ToolchainError};
use crate::models::ToolchainInfo;
use crate::policy::FailureKind;
use crate::store::StateStore;
use crate::ui;
use regex::Regex;
use std::env;
use std::path::Path;

/// Preferences-table key for the toolchain-variant choice.
pub const VARIANT_KEY: &str = "ToolchainVariant";

const VERSION_PATTERN: &str = r"el/(.*)/b";

/// Extra prebuilt paths an affirmed variant toolchain expects.
const VARIANT_LIBRARY_PATHS: &[&str] = &["/usr/include/cloog", "/usr/lib/libisl.a"];

/// Extract the toolchain version substring from a CROSS_COMPILE path.
/// A path without the `el/<version>/b` segment yields a typed error rather
/// than a silent default.
pub fn extract_version(path: &str) -> std::result::Result<String, ToolchainError> {
    let re = match Regex::new(VERSION_PATTERN) {
        Ok(re) => re,
        Err(_) => return Err(ToolchainError::VersionPatternMismatch(path.to_string())),
    };
    re.captures(path)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().to_string())
        .ok_or_else(|| ToolchainError::VersionPatternMismatch(path.to_string()))
}

/// Resolve the cross-compiler: read CROSS_COMPILE (absence is fatal),
/// extract the version (mismatch is a warning), and settle the persisted
/// variant preference, prompting only on the first run.
pub fn resolve(store: &mut StateStore) -> Result<ToolchainInfo> {
    println!("Checking toolchain path...");
    let path = env::var("CROSS_COMPILE").map_err(|_| ToolchainError::CrossCompileUnset)?;
    ui::ok("Toolchain path");
    ui::info(&format!("Using toolchain path {}", path));

    let version = match extract_version(&path) {
        Ok(v) => Some(v),
        Err(e) => {
            ui::report(FailureKind::VersionUnparsed, &e.to_string());
            None
        }
    };

    let choice = store.get_or_insert_preference(VARIANT_KEY, || {
        let yes = ui::confirm("Are you using a SaberMod GCC toolchain?", false)?;
        Ok(if yes { "Y" } else { "N" }.to_string())
    })?;
    let variant = choice == "Y";

    if variant {
        let missing: Vec<&str> = VARIANT_LIBRARY_PATHS
            .iter()
            .copied()
            .filter(|p| !Path::new(p).exists())
            .collect();
        if missing.is_empty() {
            ui::ok("SaberMod libraries detected");
        } else {
            ui::report(
                FailureKind::OptionalLibsMissing,
                &format!(
                    "Extra SaberMod prebuilts are not installed correctly: {}",
                    missing.join(", ")
                ),
            );
        }
    }

    Ok(ToolchainInfo {
        path,
        version,
        variant,
    })
}
