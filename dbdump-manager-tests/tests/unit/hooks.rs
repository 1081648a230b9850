//! Unit tests for the hook runner and the after_script policy

use dbdump_manager::managers::hooks::{
    after_script_action, combine_outcome, run_hook, AfterAction, Hook, HookError, OnExit,
};
use rstest::rstest;
use test_utils::{MockExecutor, TestContext};

#[rstest]
#[case::success_without_script(true, false, None, AfterAction::Run)]
#[case::success_with_script(true, true, Some("success"), AfterAction::Run)]
#[case::failure_without_script(false, false, Some("always"), AfterAction::Skip)]
#[case::failure_unset(false, true, None, AfterAction::Skip)]
#[case::failure_always(false, true, Some("always"), AfterAction::Run)]
#[case::failure_success(false, true, Some("success"), AfterAction::Skip)]
#[case::failure_failure(false, true, Some("failure"), AfterAction::Run)]
#[case::failure_other(false, true, Some("never"), AfterAction::Skip)]
#[case::failure_case_sensitive(false, true, Some("ALWAYS"), AfterAction::Skip)]
fn test_after_script_policy(
    #[case] perform_ok: bool,
    #[case] has_script: bool,
    #[case] on_exit: Option<&str>,
    #[case] expected: AfterAction,
) {
    assert_eq!(
        after_script_action(perform_ok, has_script, &OnExit::parse(on_exit)),
        expected
    );
}

#[test]
fn test_hook_runs_in_working_dir() {
    let ctx = TestContext::new();
    let executor = MockExecutor::new();

    run_hook(
        &executor,
        "dump before_script",
        &Hook::parse("pg_ctl reload -D '/var/lib/my data'"),
        Some(ctx.temp_dir()),
    )
    .unwrap();

    let call = executor.last_call("pg_ctl").unwrap();
    assert_eq!(call.args, vec!["reload", "-D", "/var/lib/my data"]);
    assert_eq!(call.working_dir.as_deref(), Some(ctx.temp_dir()));
}

#[test]
fn test_ignored_hook_never_fails() {
    let executor = MockExecutor::new().failing("notify.sh", "boom");

    let result = run_hook(&executor, "dump after_script", &Hook::parse("-notify.sh"), None);
    assert!(result.is_ok());
    assert_eq!(executor.call_count("notify.sh"), 1);

    // Untokenizable commands are ignored too
    let result = run_hook(&executor, "dump after_script", &Hook::parse("-echo 'oops"), None);
    assert!(result.is_ok());
}

#[test]
fn test_failing_hook_reports_action() {
    let executor = MockExecutor::new().failing("exit", "exit status 1");

    let err = run_hook(&executor, "dump before_script", &Hook::parse("exit 1"), None).unwrap_err();
    assert!(matches!(err, HookError::Failed { .. }));
    assert!(err.to_string().contains("dump before_script"));
}

#[test]
fn test_combine_outcome_prefers_hook_error() {
    let executor = MockExecutor::new().failing("cleanup.sh", "disk full");
    let hook = run_hook(&executor, "dump after_script", &Hook::parse("cleanup.sh"), None);

    let result = combine_outcome(Err(anyhow::anyhow!("dump failed")), Some(hook));
    assert!(result.unwrap_err().to_string().contains("dump after_script"));

    let result = combine_outcome(Err(anyhow::anyhow!("dump failed")), Some(Ok(())));
    assert_eq!(result.unwrap_err().to_string(), "dump failed");

    assert!(combine_outcome(Ok(()), None).is_ok());
}
