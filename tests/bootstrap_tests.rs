use hr_pulse_lib::bootstrap;
use tempfile::tempdir;

#[test]
fn bootstrap_coexists_with_host_subscriber() {
    tracing_subscriber::fmt()
        .with_test_writer()
        .try_init()
        .expect("host subscriber installed first");

    let first_dir = tempdir().expect("temp dir");
    let first = bootstrap(first_dir.path()).expect("first bootstrap");
    assert!(first.demo().is_ok());

    let second_dir = tempdir().expect("temp dir");
    let second = bootstrap(second_dir.path()).expect("second bootstrap");
    assert!(second_dir.path().join("hr-pulse.sqlite").exists());
    assert!(second.demo().is_ok());
}
