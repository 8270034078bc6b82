// src/publish.rs
//! Static-site deploy through the `wrangler` CLI, run by the retrying executor.

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{error, info};

use crate::executor::{CommandRunner, CommandSpec, RetryingExecutor};

pub const ENV_PROJECT_NAME: &str = "CLOUDFLARE_PROJECT_NAME";
pub const ENV_ACCOUNT_ID: &str = "CLOUDFLARE_ACCOUNT_ID";

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DeployTarget {
    pub site_dir: PathBuf,
    pub project_name: String,
    pub account_id: String,
    /// Per-attempt timeout.
    pub timeout_secs: u64,
}

impl DeployTarget {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(if self.timeout_secs == 0 {
            120
        } else {
            self.timeout_secs
        })
    }

    /// Project name from config, falling back to `$CLOUDFLARE_PROJECT_NAME`.
    pub fn resolved_project_name(&self) -> Option<String> {
        let from_cfg = self.project_name.trim();
        if !from_cfg.is_empty() {
            return Some(from_cfg.to_string());
        }
        std::env::var(ENV_PROJECT_NAME)
            .ok()
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
    }

    /// `None` when no project name is configured anywhere.
    pub fn command(&self) -> Option<CommandSpec> {
        let project = self.resolved_project_name()?;
        let mut cmd = CommandSpec::new("wrangler")
            .arg("pages")
            .arg("deploy")
            .arg(self.site_dir.display().to_string())
            .arg("--project-name")
            .arg(project);
        if !self.account_id.trim().is_empty() {
            cmd = cmd.env(ENV_ACCOUNT_ID, self.account_id.trim());
        }
        Some(cmd)
    }
}

/// Deploy the built site. Returns the executor's success signal.
pub async fn deploy_pages<R: CommandRunner>(
    executor: &RetryingExecutor<R>,
    target: &DeployTarget,
) -> bool {
    let Some(cmd) = target.command() else {
        error!(
            "deploy project name not configured; set deploy.project_name or {}",
            ENV_PROJECT_NAME
        );
        return false;
    };
    info!(site_dir = %target.site_dir.display(), command = %cmd, "deploying site");
    let report = executor.execute(&cmd, target.timeout()).await;
    if report.fatal() {
        error!("wrangler is not installed or not executable; install it with `npm install -g wrangler`");
    }
    report.success
}
