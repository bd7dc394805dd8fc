//! Flashable-archive packaging and signing.
//!
//! Stages kernel modules and the boot image, compresses the staging tree
//! with the external zip tool, generates signing material on first use and
//! signs the archive with signapk. Every external step's exit status is
//! checked; a signing failure is fatal.

use crate::error::{PackageError, Result};
use crate::models::KernelVersion;
use crate::profile::DeviceProfile;
use crate::ui;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;
use walkdir::WalkDir;

/// Archive file name for a version string, with the fixed placeholder when
/// no version is defined.
pub fn archive_name(version: Option<&KernelVersion>, stem: &str) -> String {
    match version {
        Some(v) => format!("{}.zip", v.archive_stem()),
        None => format!("{}-undefined.zip", stem),
    }
}

/// Signed-archive file name derived from the unsigned one.
pub fn signed_name(archive: &str) -> String {
    match archive.strip_suffix(".zip") {
        Some(stem) => format!("{}-signed.zip", stem),
        None => format!("{}-signed.zip", archive),
    }
}

fn require_tool(name: &str) -> std::result::Result<(), PackageError> {
    which::which(name).map_err(|_| PackageError::ToolMissing(name.to_string()))?;
    Ok(())
}

/// Copy every kernel module under the source root into the staging modules
/// directory, skipping the staging tree itself. Returns the number of
/// modules staged.
fn stage_modules(root: &Path, modules_dir: &Path) -> std::result::Result<usize, PackageError> {
    fs::create_dir_all(modules_dir)?;
    let staging = modules_dir.parent().unwrap_or(modules_dir).to_path_buf();
    let mut staged = 0;
    for entry in WalkDir::new(root)
        .into_iter()
        .filter_entry(|e| !e.path().starts_with(&staging))
        .filter_map(|e| e.ok())
    {
        let path = entry.path();
        if path.extension().map_or(false, |ext| ext == "ko") {
            if let Some(name) = path.file_name() {
                fs::copy(path, modules_dir.join(name))?;
                staged += 1;
            }
        }
    }
    Ok(staged)
}

/// Top-level staging entries handed to the archiver. Leftover archives are
/// excluded so a zip never swallows another zip.
fn zip_targets(staging: &Path) -> std::result::Result<Vec<std::ffi::OsString>, PackageError> {
    let mut targets = Vec::new();
    for entry in fs::read_dir(staging)? {
        let entry = entry?;
        let name = entry.file_name();
        if name.to_string_lossy().ends_with(".zip") {
            continue;
        }
        targets.push(name);
    }
    targets.sort();
    Ok(targets)
}

fn remove_previous_archives(staging: &Path, stem: &str) {
    if let Ok(entries) = fs::read_dir(staging) {
        for entry in entries.flatten() {
            let name = entry.file_name();
            let name = name.to_string_lossy();
            if name.starts_with(stem) && name.ends_with(".zip") {
                let _ = fs::remove_file(entry.path());
            }
        }
    }
}

/// Generate the signing certificate and key interactively when the signing
/// directory is empty or missing.
fn ensure_signing_material(signing_dir: &Path) -> std::result::Result<(), PackageError> {
    let populated = fs::read_dir(signing_dir)
        .map(|mut entries| entries.next().is_some())
        .unwrap_or(false);
    if populated {
        return Ok(());
    }

    fs::create_dir_all(signing_dir)?;
    println!("Generating OpenSSL certificates...");
    println!("Follow the prompts on screen.");
    let script = "openssl genrsa -out sign.key 8192 && \
                  openssl req -new -key sign.key -out request.pem && \
                  openssl x509 -req -days 9999 -in request.pem -signkey sign.key -out certificate.pem && \
                  openssl pkcs8 -topk8 -outform DER -in sign.key -inform PEM -out key.pk8 -nocrypt";
    let status = Command::new("sh")
        .arg("-c")
        .arg(script)
        .current_dir(signing_dir)
        .status()
        .map_err(|e| PackageError::KeygenFailed(e.to_string()))?;
    if !status.success() {
        return Err(PackageError::KeygenFailed(format!(
            "openssl exited with {}",
            status
        )));
    }
    Ok(())
}

/// Package the built image into a signed flashable zip. The kernel image
/// must already exist; its absence is fatal before any staging happens.
pub fn package(
    version: Option<&KernelVersion>,
    profile: &DeviceProfile,
    root: &Path,
) -> Result<PathBuf> {
    let image = profile.image(root);
    if !image.exists() {
        return Err(PackageError::ImageMissing(image.display().to_string()).into());
    }

    require_tool("zip")?;
    require_tool("java")?;

    let staging = root.join(&profile.staging_dir);
    fs::create_dir_all(staging.join("setup")).map_err(PackageError::IoError)?;

    ui::info("Moving kernel modules...");
    let staged = stage_modules(root, &staging.join("modules"))?;
    log::info!("staged {} kernel module(s)", staged);

    ui::info("Packing into flashable zip...");
    remove_previous_archives(&staging, &profile.archive_stem);

    let image_name = image
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_else(|| "zImage".into());
    fs::copy(&image, staging.join("setup").join(&image_name)).map_err(PackageError::IoError)?;

    // The archive name comes from free-form user input; it is passed to zip
    // as a plain argument, never through a shell.
    let name = archive_name(version, &profile.archive_stem);
    let targets = zip_targets(&staging)?;
    let status = Command::new("zip")
        .arg("-r")
        .arg("-9")
        .arg(&name)
        .args(&targets)
        .current_dir(&staging)
        .status()
        .map_err(|e| PackageError::ZipFailed(e.to_string()))?;
    if !status.success() {
        return Err(PackageError::ZipFailed(format!("zip exited with {}", status)).into());
    }

    ui::info("Signing zip file...");
    let signing_dir = root.join(&profile.signing_dir);
    ensure_signing_material(&signing_dir)?;

    let signed = signed_name(&name);
    let status = Command::new("java")
        .arg("-jar")
        .arg(root.join(&profile.signapk_jar))
        .arg(signing_dir.join("certificate.pem"))
        .arg(signing_dir.join("key.pk8"))
        .arg(staging.join(&name))
        .arg(staging.join(&signed))
        .status()
        .map_err(|e| PackageError::SignFailed(e.to_string()))?;
    if !status.success() {
        return Err(PackageError::SignFailed(format!("signapk exited with {}", status)).into());
    }

    // Generated intermediates from the build; absence is fine.
    let _ = fs::remove_file(root.join("include/generated/compile.h"));

    ui::ok(&format!("Done! Signed archive: {}", signed));
    Ok(staging.join(signed))
}
