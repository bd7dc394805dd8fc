use std::path::Path;
use std::process::{exit, Command};

use neutron_build::error::{Result, WorkflowError};
use neutron_build::{environment, package, runner, setup, toolchain, ui};
use neutron_build::{DeviceProfile, StateStore};

/// Profile override file, read when present next to the kernel sources.
const PROFILE_FILE: &str = "build/neutron-profile.json";
/// Persisted preferences and last-failure record.
const STATE_FILE: &str = "build/neutron-build.json";

fn main() {
    env_logger::Builder::from_default_env()
        .filter_level(log::LevelFilter::Info)
        .init();

    match run_workflow() {
        Ok(()) => {}
        Err(WorkflowError::UserQuit) => {
            ui::info("Aborted by user.");
            exit(1);
        }
        Err(e) => {
            ui::fail(&e.to_string());
            exit(1);
        }
    }
}

fn host_description() -> String {
    Command::new("uname")
        .args(["-o", "-n", "-i", "-v", "-r"])
        .output()
        .ok()
        .map(|out| String::from_utf8_lossy(&out.stdout).trim().to_string())
        .unwrap_or_else(|| "unknown".to_string())
}

fn run_workflow() -> Result<()> {
    let root = Path::new(".");
    let profile = DeviceProfile::load_or_default(&root.join(PROFILE_FILE))?;

    ui::header(&format!(
        "Neutron {} Debian/Linux build tool\nPlease only run on Linux (Debian, Ubuntu, etc).\nVersion v3.0",
        profile.name
    ));

    let report = environment::probe()?;

    let mut store = StateStore::open(root.join(STATE_FILE))?;
    let toolchain = toolchain::resolve(&mut store)?;

    let plan = setup::setup(&mut store, &profile, root, toolchain)?;

    if !plan.package_only {
        ui::header("Neutron Build Process");
        println!("BUILD VARIABLES");
        let version_label = match (&plan.toolchain.version, plan.toolchain.variant) {
            (Some(v), true) => format!("{} SaberMod GCC", v),
            (Some(v), false) => v.clone(),
            (None, _) => "unknown".to_string(),
        };
        ui::info(&format!("Toolchain version: {}", version_label));
        ui::info(&format!("Toolchain path: {}", plan.toolchain.path));
        if let Some(version) = &plan.version {
            ui::info(&format!("Kernel version: {}", version));
        }
        ui::info(&format!("Host: {}", host_description()));
        ui::info(&format!(
            "CPU: {} with {} core(s)",
            report.cpu_model, report.cpu_cores
        ));
        println!();
        ui::press_enter_or_quit("If this is okay, press Enter to continue or Q to quit...")?;

        if let Some(version) = &plan.version {
            runner::run(
                version,
                &plan.toolchain.path,
                &profile,
                root,
                report.cpu_cores,
                &mut store,
            )?;
        }
    }

    package::package(plan.version.as_ref(), &profile, root)?;
    Ok(())
}
