//! Build preparation: resume/discard of a recorded failure, cleaning,
//! optional boot-image regeneration, version prompt.

use crate::error::{Result, SetupError};
use crate::models::{BuildPlan, KernelVersion, ToolchainInfo};
use crate::policy::FailureKind;
use crate::profile::DeviceProfile;
use crate::store::StateStore;
use crate::ui;
use std::fs;
use std::path::Path;
use std::process::Command;

/// Prepare one build run. Consults the prior-failure record, optionally
/// cleans the tree, optionally regenerates the boot image and settles the
/// kernel version string.
pub fn setup(
    store: &mut StateStore,
    profile: &DeviceProfile,
    root: &Path,
    toolchain: ToolchainInfo,
) -> Result<BuildPlan> {
    ui::header("Neutron Build preparation");

    // The record is cleared up front; whichever path the user picks, it is
    // never offered again on a later run.
    if let Some(record) = store.take_failure()? {
        ui::fail("An incomplete build was detected.");
        println!("Error Reason: {}", record.reason);
        println!(
            "File Name: {}",
            record.file_name.chars().take(60).collect::<String>()
        );
        println!("Kernel Version: {}", record.kernel_version);
        println!("Date: {}", record.timestamp);
        println!("{}", "-".repeat(81));

        let discard = ui::ask_yes_no_or_quit("Do you want to discard this build? (y/n):")?;
        if !discard {
            // Resume with the stored version string; no version prompt.
            return Ok(BuildPlan {
                version: Some(KernelVersion::from_full(record.kernel_version)),
                resume: true,
                package_only: false,
                toolchain,
            });
        }
    } else if profile.image_exists(root) {
        let clean = ui::ask_text("Previous kernel image found. Do you want to make clean? (y/n):")?;
        if clean.trim().eq_ignore_ascii_case("n") {
            // Package the image that is already on disk.
            return Ok(BuildPlan {
                version: None,
                resume: false,
                package_only: true,
                toolchain,
            });
        }
    }

    clean_tree(profile, root);
    maybe_regenerate_boot_image(profile, root)?;

    let suffix = ui::ask_text("Enter new version string:")?;
    let version = KernelVersion::new(&profile.version_prefix, suffix.trim());

    Ok(BuildPlan {
        version: Some(version),
        resume: false,
        package_only: false,
        toolchain,
    })
}

/// `make clean && make mrproper`, then best-effort removal of stale
/// artifacts. A failed clean is a warning, never fatal.
fn clean_tree(profile: &DeviceProfile, root: &Path) {
    println!("Running make clean...");
    let pb = ui::spinner("Cleaning build directories");
    let status = Command::new("sh")
        .arg("-c")
        .arg("make clean && make mrproper")
        .current_dir(root)
        .output();
    pb.finish_and_clear();

    match status {
        Ok(out) if out.status.success() => {
            remove_stale_artifacts(profile, root);
            ui::ok("Cleaned build directories");
        }
        Ok(_) => ui::report(FailureKind::CleanFailed, "make clean failed"),
        Err(e) => ui::report(FailureKind::CleanFailed, &format!("make clean failed: {}", e)),
    }
}

/// Delete leftovers from a previous run. Absence of any of these is fine.
fn remove_stale_artifacts(profile: &DeviceProfile, root: &Path) {
    let _ = fs::remove_file(profile.image(root));
    if let Some(alt) = profile.alt_image_path.as_deref() {
        let _ = fs::remove_file(root.join(alt));
    }

    let staging = root.join(&profile.staging_dir);
    if let Some(name) = Path::new(&profile.image_path).file_name() {
        let _ = fs::remove_file(staging.join("setup").join(name));
    }

    // Old packaged archives of the same family.
    if let Ok(entries) = fs::read_dir(&staging) {
        for entry in entries.flatten() {
            let name = entry.file_name();
            let name = name.to_string_lossy();
            if name.starts_with(&profile.archive_stem) && name.ends_with(".zip") {
                let _ = fs::remove_file(entry.path());
            }
        }
    }

    // Previously staged modules.
    if let Ok(entries) = fs::read_dir(staging.join("modules")) {
        for entry in entries.flatten() {
            let _ = fs::remove_file(entry.path());
        }
    }
}

/// Offer to rebuild the ramdisk/boot image from the stock image. Choosing
/// to regenerate with no stock image on disk is fatal.
fn maybe_regenerate_boot_image(profile: &DeviceProfile, root: &Path) -> Result<()> {
    let regenerate = ui::confirm("Regenerate boot image from the stock image?", false)?;
    if !regenerate {
        return Ok(());
    }

    let stock = root.join(&profile.stock_image);
    if !stock.exists() {
        ui::report(
            FailureKind::MissingInputArtifact,
            &format!("Stock boot image not found at {}", stock.display()),
        );
        return Err(SetupError::StockImageMissing(stock.display().to_string()).into());
    }

    let workdir = stock.parent().unwrap_or(root);
    let pb = ui::spinner("Extracting boot image");
    let status = Command::new("abootimg")
        .arg("-x")
        .arg(&stock)
        .current_dir(workdir)
        .output();
    pb.finish_and_clear();

    match status {
        Ok(out) if out.status.success() => {
            ui::ok("Boot image extracted");
            Ok(())
        }
        Ok(out) => Err(SetupError::ExtractFailed(format!(
            "abootimg exited with {}",
            out.status
        ))
        .into()),
        Err(e) => Err(SetupError::ExtractFailed(e.to_string()).into()),
    }
}
