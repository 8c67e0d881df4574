//! Unit tests for bootstrap classification and the top-level entry point.

use std::process::ExitCode;

use nix::errno::Errno;
use rstest::rstest;

use crate::bootstrap::{
    Arguments, BootstrapError, BootstrapOutcome, bootstrap_outcome, clear_outcome,
    process_arguments, record_failure, recorded_outcome, run_in, thread_count,
    validate_instance_name,
};
use crate::run_with_loader;
use crate::tests::support::{FailingConfigLoader, Layout, StubConfigLoader, lock_outcome};

#[rstest]
#[case("foo")]
#[case("foo-bar")]
#[case("foo_bar")]
#[case("foo_1")]
#[case("0ad")]
#[case("a0")]
fn accepts_valid_instance_names(#[case] name: &str) {
    assert!(validate_instance_name(name), "{name} should be valid");
}

#[rstest]
#[case("")]
#[case("a")]
#[case("Foo")]
#[case("foo--bar")]
#[case("-foo")]
#[case("foo-")]
#[case("123")]
#[case("foo_")]
#[case("foo_Bar")]
#[case("foo_bar_baz")]
#[case("foo_12345678901")]
#[case("this-snap-name-is-far-too-long-to-be-valid-x")]
fn rejects_invalid_instance_names(#[case] name: &str) {
    assert!(!validate_instance_name(name), "{name} should be invalid");
}

#[rstest]
#[case(&["snap-update-ns", "foo"], "foo", true, false)]
#[case(&["snap-update-ns", "--from-snap-confine", "foo_bar"], "foo_bar", false, false)]
#[case(&["snap-update-ns", "--user-mounts", "foo"], "foo", true, true)]
#[case(&["snap-update-ns", "foo", "--from-snap-confine", "--user-mounts"], "foo", false, true)]
fn parses_arguments(
    #[case] args: &[&str],
    #[case] instance: &str,
    #[case] should_enter_namespace: bool,
    #[case] process_user_fstab: bool,
) {
    let arguments = process_arguments(args.iter().copied()).expect("arguments parse");
    assert_eq!(
        arguments,
        Arguments {
            instance: instance.to_owned(),
            should_enter_namespace,
            process_user_fstab,
        }
    );
}

#[rstest]
#[case(&["snap-update-ns"], "snap name not provided")]
#[case(&["snap-update-ns", "--from-snap-confine"], "snap name not provided")]
#[case(&["snap-update-ns", "--verbose", "foo"], "unsupported option")]
#[case(&["snap-update-ns", "foo", "bar"], "too many positional arguments")]
#[case(&["snap-update-ns", "Foo"], "snap name must use lower case letters, digits or dashes")]
#[case(&["snap-update-ns", "foo_"], "instance key must contain at least one letter or digit")]
fn rejects_bad_arguments(#[case] args: &[&str], #[case] message: &str) {
    let error = process_arguments(args.iter().copied()).expect_err("arguments rejected");
    assert_eq!(
        error,
        BootstrapError::Rejected {
            message: message.to_owned(),
        }
    );
}

#[test]
fn unset_outcome_is_success() {
    let _guard = lock_outcome();
    clear_outcome();
    assert_eq!(recorded_outcome(), BootstrapOutcome::Unset);
    assert_eq!(bootstrap_outcome(), Ok(()));
}

#[rstest]
#[case(Errno::ENOENT)]
#[case(Errno::EINVAL)]
fn missing_namespace_errors_classify_as_no_namespace(#[case] errno: Errno) {
    let _guard = lock_outcome();
    record_failure("cannot open mount namespace file", errno as i32);
    let error = bootstrap_outcome().expect_err("failure recorded");
    assert_eq!(error, BootstrapError::NoNamespace);
    assert_eq!(
        error.to_string(),
        "cannot update mount namespace that was not created yet"
    );
    clear_outcome();
}

#[test]
fn other_errors_carry_message_and_errno() {
    let _guard = lock_outcome();
    record_failure("cannot join namespace", Errno::ENOMEM as i32);
    let error = bootstrap_outcome().expect_err("failure recorded");
    assert_eq!(
        error.to_string(),
        format!("cannot join namespace: {}", Errno::ENOMEM.desc())
    );
    clear_outcome();
    assert_eq!(bootstrap_outcome(), Ok(()));
}

#[test]
fn errno_zero_reports_message_alone() {
    let _guard = lock_outcome();
    record_failure("snap name not provided", 0);
    let error = bootstrap_outcome().expect_err("failure recorded");
    assert_eq!(error.to_string(), "snap name not provided");
    clear_outcome();
}

#[test]
fn missing_namespace_file_is_recorded_and_classified() {
    let _guard = lock_outcome();
    let layout = Layout::new();
    let error = run_in(layout.ns_dir(), ["snap-update-ns", "foo"]).expect_err("no namespace");
    assert_eq!(error, BootstrapError::NoNamespace);
    assert_eq!(
        recorded_outcome(),
        BootstrapOutcome::Failure {
            message: String::from("cannot open mount namespace file"),
            errno: Errno::ENOENT as i32,
        }
    );
    clear_outcome();
}

#[test]
fn from_snap_confine_skips_namespace_entry() {
    let _guard = lock_outcome();
    let layout = Layout::new();
    let arguments = run_in(
        layout.ns_dir(),
        ["snap-update-ns", "--from-snap-confine", "foo"],
    )
    .expect("bootstrap succeeds");
    assert!(!arguments.should_enter_namespace);
    assert_eq!(recorded_outcome(), BootstrapOutcome::Success);
    clear_outcome();
}

#[test]
fn symlinked_namespace_file_is_refused() {
    let _guard = lock_outcome();
    let layout = Layout::new();
    let real = layout.root().join("real.mnt");
    std::fs::write(&real, "").expect("write target");
    std::os::unix::fs::symlink(&real, layout.namespace_file("foo")).expect("create symlink");
    let error = run_in(layout.ns_dir(), ["snap-update-ns", "foo"]).expect_err("symlink refused");
    assert_eq!(
        error,
        BootstrapError::Os {
            message: String::from("cannot open mount namespace file"),
            errno: Errno::ELOOP,
        }
    );
    clear_outcome();
}

#[test]
fn thread_count_sees_the_test_thread() {
    let count = thread_count().expect("status readable");
    assert!(count >= 1);
}

#[test]
fn no_namespace_ends_successfully() {
    let layout = Layout::new();
    let loader = StubConfigLoader::new(layout.config().clone());
    let mut stderr = Vec::new();
    let code = run_with_loader(Err(BootstrapError::NoNamespace), &mut stderr, &loader);
    assert_eq!(code, ExitCode::SUCCESS);
    assert!(stderr.is_empty());
}

#[test]
fn rejected_bootstrap_is_reported() {
    let layout = Layout::new();
    let loader = StubConfigLoader::new(layout.config().clone());
    let mut stderr = Vec::new();
    let bootstrap = Err(BootstrapError::Rejected {
        message: String::from("unsupported option"),
    });
    let code = run_with_loader(bootstrap, &mut stderr, &loader);
    assert_eq!(code, ExitCode::FAILURE);
    assert_eq!(String::from_utf8_lossy(&stderr), "unsupported option\n");
}

#[test]
fn configuration_failures_are_reported() {
    let mut stderr = Vec::new();
    let bootstrap = Ok(Arguments {
        instance: String::from("foo"),
        should_enter_namespace: false,
        process_user_fstab: false,
    });
    let code = run_with_loader(bootstrap, &mut stderr, &FailingConfigLoader);
    assert_eq!(code, ExitCode::FAILURE);
    assert!(String::from_utf8_lossy(&stderr).starts_with("failed to load configuration"));
}

#[test]
fn system_update_saves_current_profile_and_thaws() {
    let layout = Layout::new();
    layout.create_cgroup("foo");
    layout.write_desired("foo", "/snap/foo/1/lib /usr/lib/foo none bind,ro 0 0\n");
    layout.write_current("foo", "/snap/foo/1/etc /etc/foo none bind 0 0\n");
    let loader = StubConfigLoader::new(layout.config().clone());
    let mut stderr = Vec::new();
    let bootstrap = Ok(Arguments {
        instance: String::from("foo"),
        should_enter_namespace: false,
        process_user_fstab: false,
    });
    let code = run_with_loader(bootstrap, &mut stderr, &loader);
    assert_eq!(code, ExitCode::SUCCESS, "{}", String::from_utf8_lossy(&stderr));
    assert_eq!(layout.freezer_state("foo").as_deref(), Some("THAWED"));
    assert_eq!(
        layout.current("foo").as_deref(),
        Some("/snap/foo/1/etc /etc/foo none bind 0 0\n")
    );
}
