// src/metrics.rs
//! Prometheus recorder for a batch run. There is no scrape endpoint; the
//! rendered exposition is written to a textfile at the end of the run.

use std::path::Path;

use anyhow::{Context, Result};
use metrics::gauge;
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};

use crate::persist::write_atomic;

pub struct Metrics {
    pub handle: PrometheusHandle,
}

impl Metrics {
    /// Install the global recorder. Fails if one is already installed.
    pub fn init() -> Result<Self> {
        let handle = PrometheusBuilder::new()
            .install_recorder()
            .context("prometheus: install recorder")?;
        crate::ingest::ensure_metrics_described();
        Ok(Self { handle })
    }

    pub fn render(&self) -> String {
        self.handle.render()
    }

    /// Stamp the run and write the exposition text (temp file + rename).
    pub fn write_textfile(&self, path: &Path) -> Result<()> {
        gauge!("digest_pipeline_last_run_ts").set(chrono::Utc::now().timestamp() as f64);
        write_atomic(path, self.render().as_bytes())
            .with_context(|| format!("writing metrics textfile {}", path.display()))
    }
}

