//! Configuration loading from scientist.toml
//!
//! Experiment defaults can be kept in a `scientist.toml` file in the project
//! root. The file is discovered by walking up from the current directory.

use crate::experiment::{DEFAULT_NAME, ExperimentBuilder};
use crate::order::{DEFAULT_CANDIDATE_FIRST_RATIO, RandomOrder};
use rayon::{ThreadPool, ThreadPoolBuilder};
use scientist_core::{ConfigError, DEFAULT_MAX_ATTEMPTS, TrialExecutor, panic_message};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::Arc;
use thiserror::Error;

/// File name looked up by [`ScientistConfig::discover`]
pub const CONFIG_FILE: &str = "scientist.toml";

/// Failure to obtain a usable configuration
#[derive(Debug, Error)]
pub enum ConfigFileError {
    /// The file could not be read
    #[error("failed to read {}: {source}", path.display())]
    Io {
        /// File that was being read
        path: PathBuf,
        /// Underlying I/O error
        #[source]
        source: std::io::Error,
    },
    /// The file is not valid TOML for this schema
    #[error("invalid configuration: {0}")]
    Parse(#[from] toml::de::Error),
    /// A value is out of range
    #[error(transparent)]
    Invalid(#[from] ConfigError),
    /// The worker pool could not be started
    #[error("failed to build worker pool: {0}")]
    Pool(#[from] rayon::ThreadPoolBuildError),
}

/// Scientist configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct ScientistConfig {
    /// Experiment defaults
    #[serde(default)]
    pub experiment: ExperimentConfig,
    /// Retry defaults
    #[serde(default)]
    pub retry: RetryConfig,
    /// Worker pool; absent means blocking mode
    #[serde(default)]
    pub pool: Option<PoolConfig>,
}

/// `[experiment]` section
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExperimentConfig {
    /// Experiment name
    #[serde(default = "default_name")]
    pub name: String,
    /// Whether candidates run at all
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    /// Probability of running the candidate first, in `[0, 1]`
    #[serde(default = "default_candidate_first_ratio")]
    pub candidate_first_ratio: f64,
}

impl Default for ExperimentConfig {
    fn default() -> Self {
        Self {
            name: default_name(),
            enabled: default_enabled(),
            candidate_first_ratio: default_candidate_first_ratio(),
        }
    }
}

fn default_name() -> String {
    DEFAULT_NAME.to_string()
}
fn default_enabled() -> bool {
    true
}
fn default_candidate_first_ratio() -> f64 {
    DEFAULT_CANDIDATE_FIRST_RATIO
}

/// `[retry]` section
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetryConfig {
    /// Attempt bound of the retry wrapper, at least 1
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
        }
    }
}

fn default_max_attempts() -> u32 {
    DEFAULT_MAX_ATTEMPTS
}

/// `[pool]` section
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct PoolConfig {
    /// Worker threads; 0 lets rayon decide
    #[serde(default)]
    pub threads: usize,
}

impl ScientistConfig {
    /// Load configuration from a TOML file
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigFileError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|source| ConfigFileError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        content.parse()
    }

    /// Discover configuration by walking up from the current directory.
    ///
    /// `Ok(None)` when no file exists; a file that exists but is broken is
    /// an error rather than silently skipped.
    pub fn discover() -> Result<Option<Self>, ConfigFileError> {
        match std::env::current_dir() {
            Ok(dir) => Self::discover_from(dir),
            Err(_) => Ok(None),
        }
    }

    /// Discover configuration by walking up from `dir`
    pub fn discover_from(dir: impl Into<PathBuf>) -> Result<Option<Self>, ConfigFileError> {
        let mut dir = dir.into();
        loop {
            let config_path = dir.join(CONFIG_FILE);
            if config_path.is_file() {
                tracing::debug!(path = %config_path.display(), "loading configuration");
                return Self::load(&config_path).map(Some);
            }
            if !dir.pop() {
                return Ok(None);
            }
        }
    }

    /// Check every value is in range
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.experiment.name.trim().is_empty() {
            return Err(ConfigError::EmptyName);
        }
        RandomOrder::new(self.experiment.candidate_first_ratio)?;
        TrialExecutor::new(self.retry.max_attempts)?;
        Ok(())
    }

    /// Retry wrapper with the configured attempt bound
    pub fn trial_executor(&self) -> Result<TrialExecutor, ConfigError> {
        TrialExecutor::new(self.retry.max_attempts)
    }

    /// Order policy with the configured candidate-first ratio
    pub fn order_policy(&self) -> Result<RandomOrder, ConfigError> {
        RandomOrder::new(self.experiment.candidate_first_ratio)
    }

    /// Start the configured worker pool, if any
    pub fn build_pool(&self) -> Result<Option<Arc<ThreadPool>>, ConfigFileError> {
        let Some(pool) = &self.pool else {
            return Ok(None);
        };
        let name = self.experiment.name.clone();
        let pool = ThreadPoolBuilder::new()
            .num_threads(pool.threads)
            .thread_name(|i| format!("scientist-worker-{i}"))
            .panic_handler(move |payload| {
                tracing::warn!(
                    experiment = %name,
                    panic = %panic_message(payload.as_ref()),
                    "worker task panicked"
                );
            })
            .build()?;
        Ok(Some(Arc::new(pool)))
    }

    /// Experiment builder preloaded with the configured name, enablement,
    /// order ratio and pool
    pub fn experiment_builder<V, E>(&self) -> Result<ExperimentBuilder<V, E>, ConfigFileError> {
        self.validate()?;
        let enabled = self.experiment.enabled;
        let mut builder = ExperimentBuilder::new(self.experiment.name.clone())
            .enabled(move || enabled)
            .order(self.order_policy()?);
        if let Some(pool) = self.build_pool()? {
            builder = builder.pool(pool);
        }
        Ok(builder)
    }

    /// Generate a default configuration as TOML string
    pub fn default_toml() -> String {
        r#"# Scientist Configuration

[experiment]
# Name reported with every result
name = "experiment"
# Run candidates at all
enabled = true
# Probability of running the candidate before the control (0.0 to 1.0)
candidate_first_ratio = 0.5

[retry]
# Attempt bound of the retry wrapper
max_attempts = 5

# Uncomment to run control and candidate on a worker pool
# [pool]
# Worker threads, 0 for one per core
# threads = 0
"#
        .to_string()
    }
}

impl FromStr for ScientistConfig {
    type Err = ConfigFileError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(toml::from_str(s)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ExperimentResult;
    use scientist_core::Executor;
    use std::sync::Mutex;
    use std::sync::mpsc;
    use std::time::Duration;

    #[test]
    fn test_default_config() {
        let config = ScientistConfig::default();
        assert_eq!(config.experiment.name, "experiment");
        assert!(config.experiment.enabled);
        assert_eq!(config.experiment.candidate_first_ratio, 0.5);
        assert_eq!(config.retry.max_attempts, 5);
        assert!(config.pool.is_none());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_parse_toml() {
        let config: ScientistConfig = r#"
            [experiment]
            name = "checkout-pricing"
            candidate_first_ratio = 0.25

            [pool]
            threads = 2
        "#
        .parse()
        .unwrap();
        assert_eq!(config.experiment.name, "checkout-pricing");
        assert_eq!(config.experiment.candidate_first_ratio, 0.25);
        assert_eq!(config.pool, Some(PoolConfig { threads: 2 }));
        // Defaults should still apply
        assert!(config.experiment.enabled);
        assert_eq!(config.retry.max_attempts, 5);
    }

    #[test]
    fn test_default_toml_parses() {
        let config: ScientistConfig = ScientistConfig::default_toml().parse().unwrap();
        assert_eq!(config, ScientistConfig::default());
    }

    #[test]
    fn test_validate_rejects_out_of_range() {
        let mut config = ScientistConfig::default();
        config.retry.max_attempts = 0;
        assert_eq!(config.validate(), Err(ConfigError::InvalidAttempts(0)));

        let mut config = ScientistConfig::default();
        config.experiment.candidate_first_ratio = 2.0;
        assert_eq!(config.validate(), Err(ConfigError::InvalidRatio(2.0)));

        let mut config = ScientistConfig::default();
        config.experiment.name = String::new();
        assert_eq!(config.validate(), Err(ConfigError::EmptyName));
        assert!(matches!(
            config.experiment_builder::<(), ()>(),
            Err(ConfigFileError::Invalid(ConfigError::EmptyName))
        ));
    }

    #[test]
    fn test_malformed_file_reports_parse_error() {
        let err = "[retry]\nmax_attempts = \"many\"".parse::<ScientistConfig>().unwrap_err();
        assert!(matches!(err, ConfigFileError::Parse(_)));
    }

    #[test]
    fn test_missing_file_reports_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("absent.toml");
        let err = ScientistConfig::load(&path).unwrap_err();
        assert!(matches!(err, ConfigFileError::Io { .. }));
        assert!(err.to_string().contains("absent.toml"));
    }

    #[test]
    fn test_discover_walks_up() {
        let root = tempfile::tempdir().unwrap();
        std::fs::write(
            root.path().join(CONFIG_FILE),
            "[experiment]\nname = \"found\"\n",
        )
        .unwrap();
        let nested = root.path().join("a").join("b");
        std::fs::create_dir_all(&nested).unwrap();

        let config = ScientistConfig::discover_from(&nested).unwrap().unwrap();
        assert_eq!(config.experiment.name, "found");
    }

    #[test]
    fn test_discover_without_file() {
        let root = tempfile::tempdir().unwrap();
        let nested = root.path().join("a").join("b");
        std::fs::create_dir_all(&nested).unwrap();

        assert_eq!(ScientistConfig::discover_from(&nested).unwrap(), None);
    }

    #[test]
    fn test_discover_stops_at_nearest_file() {
        let root = tempfile::tempdir().unwrap();
        std::fs::write(
            root.path().join(CONFIG_FILE),
            "[experiment]\nname = \"outer\"\n",
        )
        .unwrap();
        let nested = root.path().join("a");
        std::fs::create_dir_all(&nested).unwrap();
        std::fs::write(nested.join(CONFIG_FILE), "[experiment]\nname = \"inner\"\n")
            .unwrap();

        let config = ScientistConfig::discover_from(nested.join("deeper"))
            .unwrap()
            .unwrap();
        assert_eq!(config.experiment.name, "inner");
    }

    #[test]
    fn test_discover_reports_broken_file() {
        let root = tempfile::tempdir().unwrap();
        std::fs::write(root.path().join(CONFIG_FILE), "[retry\n").unwrap();
        let nested = root.path().join("a");
        std::fs::create_dir_all(&nested).unwrap();

        let err = ScientistConfig::discover_from(&nested).unwrap_err();
        assert!(matches!(err, ConfigFileError::Parse(_)));
    }

    #[test]
    fn test_trial_executor_uses_bound() {
        let mut config = ScientistConfig::default();
        config.retry.max_attempts = 2;
        let executor = config.trial_executor().unwrap();
        assert_eq!(executor.max_attempts(), 2);

        let err = executor.run(|| Err::<(), _>("down")).unwrap_err();
        assert_eq!(err.trials(), Some(2));
    }

    #[test]
    fn test_build_pool_names_workers() {
        let config: ScientistConfig = "[pool]\nthreads = 1".parse().unwrap();
        let pool = config.build_pool().unwrap().unwrap();
        assert_eq!(pool.current_num_threads(), 1);
        let name = pool.install(|| std::thread::current().name().map(str::to_owned));
        assert_eq!(name.as_deref(), Some("scientist-worker-0"));

        assert!(ScientistConfig::default().build_pool().unwrap().is_none());
    }

    #[test]
    fn test_experiment_builder_applies_config() {
        let config: ScientistConfig = r#"
            [experiment]
            name = "configured"
            enabled = false

            [pool]
            threads = 1
        "#
        .parse()
        .unwrap();

        let (sender, receiver) = mpsc::channel();
        let sender = Mutex::new(sender);
        let experiment = config
            .experiment_builder::<u32, String>()
            .unwrap()
            .publisher(move |result: &ExperimentResult<u32, String>| -> anyhow::Result<()> {
                sender
                    .lock()
                    .unwrap()
                    .send((result.name().to_string(), result.candidate().is_some()))?;
                Ok(())
            })
            .build()
            .unwrap();

        assert!(experiment.mode().is_pooled());
        assert_eq!(experiment.run(|| Ok(1), || Ok(2)), Ok(1));
        let (name, had_candidate) = receiver.recv_timeout(Duration::from_secs(5)).unwrap();
        assert_eq!(name, "configured");
        assert!(!had_candidate);
    }
}
