// tests/publish_deploy.rs
use async_trait::async_trait;
use std::env;
use std::path::PathBuf;
use std::sync::Mutex;
use std::time::Duration;

use signal_digest::executor::{CommandRunner, CommandSpec, ExecFailure, RetryingExecutor};
use signal_digest::publish::{deploy_pages, DeployTarget, ENV_ACCOUNT_ID, ENV_PROJECT_NAME};

#[derive(Default)]
struct CapturingRunner {
    fail_with: Option<ExecFailure>,
    seen: Mutex<Vec<(CommandSpec, Duration)>>,
}

#[async_trait]
impl CommandRunner for CapturingRunner {
    async fn run(&self, cmd: &CommandSpec, timeout: Duration) -> Result<(), ExecFailure> {
        self.seen.lock().unwrap().push((cmd.clone(), timeout));
        match &self.fail_with {
            Some(f) => Err(f.clone()),
            None => Ok(()),
        }
    }
}

fn target(project: &str) -> DeployTarget {
    DeployTarget {
        site_dir: PathBuf::from("site"),
        project_name: project.to_string(),
        account_id: "acc-123".to_string(),
        timeout_secs: 0,
    }
}

#[tokio::test]
#[serial_test::serial]
async fn deploy_runs_wrangler_with_project_and_account() {
    env::remove_var(ENV_PROJECT_NAME);
    let exec = RetryingExecutor::new(CapturingRunner::default(), 3, Duration::ZERO);
    assert!(deploy_pages(&exec, &target("digest-site")).await);

    let seen = exec.runner().seen.lock().unwrap();
    assert_eq!(seen.len(), 1);
    let (cmd, timeout) = &seen[0];
    assert_eq!(
        cmd.to_string(),
        "wrangler pages deploy site --project-name digest-site"
    );
    assert!(cmd
        .envs
        .contains(&(ENV_ACCOUNT_ID.to_string(), "acc-123".to_string())));
    assert_eq!(*timeout, Duration::from_secs(120));
}

#[tokio::test]
#[serial_test::serial]
async fn project_name_falls_back_to_env() {
    env::set_var(ENV_PROJECT_NAME, "from-env");
    let t = target("");
    let cmd = t.command().unwrap();
    assert!(cmd.args.contains(&"from-env".to_string()));
    env::remove_var(ENV_PROJECT_NAME);
}

#[tokio::test]
#[serial_test::serial]
async fn missing_project_name_fails_without_running() {
    env::remove_var(ENV_PROJECT_NAME);
    let exec = RetryingExecutor::new(CapturingRunner::default(), 3, Duration::ZERO);
    assert!(!deploy_pages(&exec, &target("  ")).await);
    assert!(exec.runner().seen.lock().unwrap().is_empty());
}

#[tokio::test]
#[serial_test::serial]
async fn failing_deploy_uses_the_whole_budget() {
    env::remove_var(ENV_PROJECT_NAME);
    let runner = CapturingRunner {
        fail_with: Some(ExecFailure::NonZeroExit { code: Some(1) }),
        ..Default::default()
    };
    let exec = RetryingExecutor::new(runner, 3, Duration::ZERO);
    assert!(!deploy_pages(&exec, &target("digest-site")).await);
    assert_eq!(exec.runner().seen.lock().unwrap().len(), 3);
}
