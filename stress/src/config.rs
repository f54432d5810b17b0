//! Tool configuration
//!
//! Process-level settings (feed address, where the run document lives) are
//! loaded from environment variables. The load schedule, target and payloads
//! come from a JSON run document loaded once before anything is spawned.

use serde::{Deserialize, Serialize};
use std::env;
use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

/// Errors raised while loading or validating configuration. All of them are
/// fatal at startup.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read run config {path:?}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Malformed run config: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Invalid schedule: {0}")]
    Invalid(String),

    #[error("No target pid configured (pass it as the first argument or set target_pid)")]
    MissingPid,
}

/// Main process configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Feed bind address
    pub host: String,
    /// Feed port
    pub port: u16,
    /// Whether to serve the live event feed at all
    pub feed_enabled: bool,
    /// Path of the JSON run document
    pub run_config_path: PathBuf,
    /// Keep sampling and serving after the last loop until Ctrl-C
    pub hold_after_run: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8090,
            feed_enabled: true,
            run_config_path: PathBuf::from("stress.json"),
            hold_after_run: true,
        }
    }
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(host) = env::var("FEED_HOST") {
            config.host = host;
        }
        if let Ok(port) = env::var("FEED_PORT")
            && let Ok(p) = port.parse()
        {
            config.port = p;
        }
        if let Ok(val) = env::var("FEED_ENABLED") {
            config.feed_enabled = parse_flag(&val);
        }
        if let Ok(path) = env::var("STRESS_CONFIG")
            && !path.is_empty()
        {
            config.run_config_path = PathBuf::from(path);
        }
        if let Ok(val) = env::var("HOLD_AFTER_RUN") {
            config.hold_after_run = parse_flag(&val);
        }

        config
    }
}

fn parse_flag(val: &str) -> bool {
    val.to_lowercase() == "true" || val == "1"
}

/// Starting value of an escalating parameter: either a scalar that grows by
/// the configured increment, or an explicit value per loop iteration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Escalation {
    Fixed(usize),
    PerLoop(Vec<usize>),
}

impl Escalation {
    /// Value the running counter starts from and resets to
    pub fn min(&self) -> usize {
        match self {
            Escalation::Fixed(n) => *n,
            Escalation::PerLoop(values) => values.first().copied().unwrap_or(0),
        }
    }

    /// Explicit value for `iteration`, if this parameter is a sequence
    pub fn override_for(&self, iteration: usize) -> Option<usize> {
        match self {
            Escalation::Fixed(_) => None,
            Escalation::PerLoop(values) => values.get(iteration).copied(),
        }
    }
}

impl fmt::Display for Escalation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Escalation::Fixed(n) => write!(f, "{}", n),
            Escalation::PerLoop(values) => {
                let parts: Vec<String> = values.iter().map(|v| v.to_string()).collect();
                write!(f, "[{}]", parts.join(","))
            }
        }
    }
}

/// Load schedule: loop → burst → request escalation and pacing.
///
/// In a run document every escalation and pacing field is required; only the
/// mode flags and the read loop settings may be left out. Unknown keys are
/// rejected so a misspelled field cannot silently fall back to a default.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ScheduleConfig {
    /// Bursts launched in the first loop (or per loop, when a sequence)
    pub bursts_per_loop_min: Escalation,
    /// Added to the burst count after every loop
    pub bursts_per_loop_incr: usize,
    /// Requests in the first burst of every loop (or per loop, when a sequence)
    pub requests_per_burst_min: Escalation,
    /// Added to the burst size after every burst launch
    pub requests_per_burst_incr: usize,
    /// Delay between request launches inside a burst
    #[serde(with = "secs")]
    pub request_delay: Duration,
    /// Delay between burst launches inside a loop
    #[serde(with = "secs")]
    pub burst_delay: Duration,
    /// Delay after each loop
    #[serde(with = "secs")]
    pub loop_delay: Duration,
    pub loop_count: usize,
    /// Telemetry tick interval
    #[serde(with = "secs")]
    pub measurement_delay: Duration,
    /// Fully serialize bursts: join each burst before launching the next
    #[serde(default)]
    pub wait_for_bursts_to_complete: bool,
    /// Gate each burst launch on the previous burst finishing its dispatch
    #[serde(default)]
    pub constant_burst_gap: bool,
    #[serde(default)]
    pub use_read_loop: bool,
    /// Delay between read launches
    #[serde(default = "default_read_delay", with = "secs")]
    pub read_delay: Duration,
    /// How long the read loop outlives the last loop
    #[serde(default = "default_kill_read_delay", with = "secs")]
    pub kill_read_delay: Duration,
}

fn default_read_delay() -> Duration {
    Duration::from_millis(100)
}

fn default_kill_read_delay() -> Duration {
    Duration::from_secs(90)
}

impl Default for ScheduleConfig {
    fn default() -> Self {
        Self {
            bursts_per_loop_min: Escalation::Fixed(3),
            bursts_per_loop_incr: 2,
            requests_per_burst_min: Escalation::Fixed(20),
            requests_per_burst_incr: 10,
            request_delay: Duration::from_millis(100),
            burst_delay: Duration::from_secs(6),
            loop_delay: Duration::from_secs(30),
            loop_count: 4,
            measurement_delay: Duration::from_millis(500),
            wait_for_bursts_to_complete: false,
            constant_burst_gap: false,
            use_read_loop: false,
            read_delay: default_read_delay(),
            kill_read_delay: default_kill_read_delay(),
        }
    }
}

impl ScheduleConfig {
    /// Reject schedules that cannot be run
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.loop_count == 0 {
            return Err(ConfigError::Invalid(
                "loop_count must be at least 1".to_string(),
            ));
        }
        if self.measurement_delay.is_zero() {
            return Err(ConfigError::Invalid(
                "measurement_delay must be greater than zero".to_string(),
            ));
        }
        if self.use_read_loop && self.read_delay.is_zero() {
            return Err(ConfigError::Invalid(
                "read_delay must be greater than zero when the read loop is enabled".to_string(),
            ));
        }
        for (name, escalation) in [
            ("bursts_per_loop_min", &self.bursts_per_loop_min),
            ("requests_per_burst_min", &self.requests_per_burst_min),
        ] {
            if let Escalation::PerLoop(values) = escalation
                && values.len() < self.loop_count
            {
                return Err(ConfigError::Invalid(format!(
                    "{} lists {} values but loop_count is {}",
                    name,
                    values.len(),
                    self.loop_count
                )));
            }
        }
        Ok(())
    }

    /// One-line description of the schedule, used as the chart title
    pub fn title(&self) -> String {
        format!(
            "{}(+{}) reqs + {}s > {}(+{}) bursts + {}s > {} loops + {}s",
            self.requests_per_burst_min,
            self.requests_per_burst_incr,
            self.request_delay.as_secs_f64(),
            self.bursts_per_loop_min,
            self.bursts_per_loop_incr,
            self.burst_delay.as_secs_f64(),
            self.loop_count,
            self.loop_delay.as_secs_f64(),
        )
    }
}

/// Payload files handed to the request executor
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Payloads {
    /// Payload for burst (mutation) traffic
    pub mutation: PathBuf,
    /// Payload for the background read loop
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub read: Option<PathBuf>,
}

/// How a single request is issued
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ExecutorConfig {
    /// Run a program with the payload path as its last argument
    Command {
        program: PathBuf,
        #[serde(default)]
        args: Vec<String>,
    },
    /// POST the payload file's contents to a URL
    Http { url: String },
}

impl Default for ExecutorConfig {
    fn default() -> Self {
        ExecutorConfig::Command {
            program: PathBuf::from("./run_query.sh"),
            args: Vec::new(),
        }
    }
}

fn default_metrics_timeout() -> Duration {
    Duration::from_secs(2)
}

/// The JSON run document
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RunConfig {
    /// Process whose resident memory is sampled
    #[serde(default)]
    pub target_pid: Option<u32>,
    pub payloads: Payloads,
    #[serde(default)]
    pub executor: ExecutorConfig,
    /// Metrics endpoint; polling is enabled when set
    #[serde(default)]
    pub metrics_url: Option<String>,
    /// Upper bound on a single metrics poll
    #[serde(default = "default_metrics_timeout", with = "secs")]
    pub metrics_timeout: Duration,
    pub schedule: ScheduleConfig,
}

impl RunConfig {
    /// Read, parse and validate a run document
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json(&content)
    }

    /// Parse and validate a run document
    pub fn from_json(content: &str) -> Result<Self, ConfigError> {
        let config: RunConfig = serde_json::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.schedule.validate()?;
        if self.schedule.use_read_loop && self.payloads.read.is_none() {
            return Err(ConfigError::Invalid(
                "use_read_loop is set but payloads.read is missing".to_string(),
            ));
        }
        Ok(())
    }

    /// Target pid, failing if none was configured
    pub fn require_pid(&self) -> Result<u32, ConfigError> {
        self.target_pid.ok_or(ConfigError::MissingPid)
    }
}

/// Durations written as (fractional) seconds
mod secs {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_f64(value.as_secs_f64())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        let secs = f64::deserialize(deserializer)?;
        Duration::try_from_secs_f64(secs).map_err(serde::de::Error::custom)
    }
}
