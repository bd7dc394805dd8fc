//! Integration tests for the persisted build-state store: the
//! resume/discard lifecycle and first-run preference capture across
//! separate "runs" (separate store handles over the same file).

use neutron_build::models::{BuildFailureRecord, FailureReason};
use neutron_build::StateStore;
use tempfile::TempDir;

fn failure() -> BuildFailureRecord {
    BuildFailureRecord {
        reason: FailureReason::CompileError,
        file_name: "  CC  drivers/gpu/msm/kgsl.o".to_string(),
        kernel_version: "-Neutron-r5".to_string(),
        timestamp: "Wed 05 Aug 21:40".to_string(),
    }
}

#[test]
fn recorded_failure_is_offered_once_and_cleared() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("build/state.json");

    // Run 1: the build fails and records.
    {
        let mut store = StateStore::open(&path).unwrap();
        store.record_failure(failure()).unwrap();
    }

    // Run 2: setup consumes the record, whichever answer the user gives.
    {
        let mut store = StateStore::open(&path).unwrap();
        let record = store.take_failure().unwrap();
        assert_eq!(record, Some(failure()));
    }

    // Run 3: no stale record remains.
    {
        let mut store = StateStore::open(&path).unwrap();
        assert!(store.failure().is_none());
        assert_eq!(store.take_failure().unwrap(), None);
    }
}

#[test]
fn resume_keeps_the_stored_version_string() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("state.json");

    let mut store = StateStore::open(&path).unwrap();
    store.record_failure(failure()).unwrap();

    let record = store.take_failure().unwrap().unwrap();
    assert_eq!(record.kernel_version, "-Neutron-r5");
}

#[test]
fn variant_preference_never_reprompts_on_second_run() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("state.json");

    // First invocation prompts and stores the normalized answer.
    {
        let mut store = StateStore::open(&path).unwrap();
        let answer = store
            .get_or_insert_preference(neutron_build::toolchain::VARIANT_KEY, || {
                Ok("y".to_string())
            })
            .unwrap();
        assert_eq!(answer, "Y");
    }

    // Second invocation against the same store must not invoke the prompt.
    {
        let mut store = StateStore::open(&path).unwrap();
        let answer = store
            .get_or_insert_preference(neutron_build::toolchain::VARIANT_KEY, || {
                panic!("re-prompted on a second run")
            })
            .unwrap();
        assert_eq!(answer, "Y");
    }
}

#[test]
fn preference_and_failure_tables_are_independent() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("state.json");

    let mut store = StateStore::open(&path).unwrap();
    store
        .get_or_insert_preference("ToolchainVariant", || Ok("N".to_string()))
        .unwrap();
    store.record_failure(failure()).unwrap();

    // Consuming the failure must not disturb the preference.
    store.take_failure().unwrap();
    assert_eq!(store.preference("ToolchainVariant"), Some("N"));
}
