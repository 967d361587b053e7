//! Join configuration.
//!
//! Tunables for the grid join: evaluation batch size, the statistic that
//! drives the cell-size heuristic and the size of the evaluation pool.
use serde::de::Error;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

pub use topolink_types::StatMeasure;

/// Join configuration
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
#[serde(deny_unknown_fields)]
pub struct JoinConfig {
    /// Candidate pairs per evaluation unit
    #[serde(default = "JoinConfig::default_batch_size")]
    pub batch_size: usize,

    #[serde(default)]
    pub stat_measure: StatMeasure,

    /// Evaluation pool size. `None` derives it from the hardware.
    #[serde(default)]
    pub workers: Option<usize>,

    #[serde(skip)]
    pub cancellation: Option<CancellationToken>,
}

impl JoinConfig {
    const fn default_batch_size() -> usize {
        1000
    }

    /// Half the available hardware parallelism, rounded up.
    pub fn default_workers() -> usize {
        let cores = std::thread::available_parallelism()
            .map(|n| n.get())
            .unwrap_or(1);
        cores.div_ceil(2).max(1)
    }

    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        assert!(batch_size > 0, "Batch size must be greater than zero");
        self.batch_size = batch_size;
        self
    }

    pub fn with_stat_measure(mut self, measure: StatMeasure) -> Self {
        self.stat_measure = measure;
        self
    }

    pub fn with_workers(mut self, workers: usize) -> Self {
        assert!(workers > 0, "Worker count must be greater than zero");
        if workers > 4 * Self::default_workers() {
            log::warn!(
                "{} evaluation workers requested on a machine with far fewer cores; \
                expect contention",
                workers
            );
        }
        self.workers = Some(workers);
        self
    }

    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancellation = Some(token);
        self
    }

    /// Effective evaluation pool size.
    pub fn worker_count(&self) -> usize {
        self.workers.unwrap_or_else(Self::default_workers)
    }

    pub(crate) fn is_cancelled(&self) -> bool {
        self.cancellation
            .as_ref()
            .is_some_and(CancellationToken::is_cancelled)
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.batch_size == 0 {
            return Err("Batch size must be greater than zero".to_string());
        }

        if let Some(workers) = self.workers
            && workers == 0
        {
            return Err("Worker count must be greater than zero".to_string());
        }

        Ok(())
    }

    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        let config: JoinConfig = serde_json::from_str(json)?;
        if let Err(e) = config.validate() {
            return Err(serde_json::Error::custom(e));
        }
        Ok(config)
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    #[cfg(feature = "toml")]
    pub fn from_toml(toml_str: &str) -> Result<Self, toml::de::Error> {
        let config: JoinConfig = toml::from_str(toml_str)?;
        if let Err(e) = config.validate() {
            return Err(toml::de::Error::custom(e));
        }
        Ok(config)
    }

    #[cfg(feature = "toml")]
    pub fn to_toml(&self) -> Result<String, toml::ser::Error> {
        toml::to_string_pretty(self)
    }
}

impl Default for JoinConfig {
    fn default() -> Self {
        Self {
            batch_size: Self::default_batch_size(),
            stat_measure: StatMeasure::default(),
            workers: None,
            cancellation: None,
        }
    }
}

/// Shared flag used to stop a running join at the next batch boundary.
#[derive(Debug, Clone, Default)]
pub struct CancellationToken(Arc<AtomicBool>);

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::Release);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }
}
