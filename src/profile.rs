//! Device profiles: per-target build and packaging parameters.
//!
//! The workflow is device-agnostic; everything target-specific (defconfig
//! name, image location, success marker, archive naming) lives here so one
//! code path serves every device.

use crate::error::StoreError;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Build and packaging parameters for one target device.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeviceProfile {
    pub name: String,
    /// Defconfig make target, e.g. `hammerhead_defconfig`.
    pub defconfig: String,
    pub arch: String,
    pub subarch: String,
    /// Kernel image path relative to the source root.
    pub image_path: String,
    /// Secondary image artifact cleaned up alongside the primary one.
    pub alt_image_path: Option<String>,
    /// Line the build system prints when the image is ready.
    pub success_marker: String,
    /// Fixed prefix the user's version suffix is appended to.
    pub version_prefix: String,
    /// Archive family name, used for stale-archive cleanup and the
    /// placeholder archive name.
    pub archive_stem: String,
    /// Staging directory for the flashable archive (setup/ and modules/
    /// subdirectories).
    pub staging_dir: String,
    /// Directory holding the signing certificate and key.
    pub signing_dir: String,
    /// Path to the signapk jar.
    pub signapk_jar: String,
    /// Stock boot image consumed by ramdisk regeneration.
    pub stock_image: String,
}

impl DeviceProfile {
    /// Built-in profile for the Nexus 5 (hammerhead) target.
    pub fn hammerhead() -> Self {
        DeviceProfile {
            name: "hammerhead".to_string(),
            defconfig: "hammerhead_defconfig".to_string(),
            arch: "arm".to_string(),
            subarch: "arm".to_string(),
            image_path: "arch/arm/boot/zImage-dtb".to_string(),
            alt_image_path: Some("arch/arm/boot/zImage".to_string()),
            success_marker: "arch/arm/boot/zImage-dtb is ready".to_string(),
            version_prefix: "-Neutron-".to_string(),
            archive_stem: "Neutron".to_string(),
            staging_dir: "zip".to_string(),
            signing_dir: "build/openssl".to_string(),
            signapk_jar: "build/signapk.jar".to_string(),
            stock_image: "bootimg/stock.img".to_string(),
        }
    }

    /// Load a profile from a JSON file.
    pub fn load(path: &Path) -> Result<Self, StoreError> {
        let content = fs::read_to_string(path)?;
        let profile: DeviceProfile = serde_json::from_str(&content)?;
        Ok(profile)
    }

    /// Load the profile override if the file exists, otherwise the built-in
    /// default.
    pub fn load_or_default(path: &Path) -> Result<Self, StoreError> {
        if path.exists() {
            Self::load(path)
        } else {
            Ok(Self::hammerhead())
        }
    }

    /// Save a profile to a JSON file, creating parent directories.
    pub fn save(&self, path: &Path) -> Result<(), StoreError> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        let json = serde_json::to_string_pretty(self)?;
        fs::write(path, json)?;
        Ok(())
    }

    /// Primary image path resolved against the source root.
    pub fn image(&self, root: &Path) -> PathBuf {
        root.join(&self.image_path)
    }

    /// True when a previously built image is present.
    pub fn image_exists(&self, root: &Path) -> bool {
        if self.image(root).exists() {
            return true;
        }
        self.alt_image_path
            .as_deref()
            .map(|p| root.join(p).exists())
            .unwrap_or(false)
    }
}

impl Default for DeviceProfile {
    fn default() -> Self {
        Self::hammerhead()
    }
}
