use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Main configuration structure for faultline
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct Config {
    /// Generation backend (OpenAI Responses API)
    #[serde(default)]
    pub backend: BackendConfig,

    /// Test framework used to validate generated tests
    #[serde(default)]
    pub framework: FrameworkConfig,

    /// Convergence loop limits and targets
    #[serde(default)]
    pub generation: GenerationConfig,

    /// Artifact output
    #[serde(default)]
    pub output: OutputConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Generation backend configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct BackendConfig {
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// API key; falls back to `OPENAI_API_KEY` when unset
    #[serde(default)]
    pub api_key: Option<String>,

    #[serde(default = "default_model")]
    pub model: String,

    /// HTTP request timeout in seconds
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// Delay between status polls
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,

    /// Consecutive failed retrievals before a poll gives up
    #[serde(default = "default_max_poll_failures")]
    pub max_poll_failures: u32,

    /// Retries for transient HTTP failures
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,

    #[serde(default = "default_initial_backoff_ms")]
    pub initial_backoff_ms: u64,

    #[serde(default = "default_max_backoff_ms")]
    pub max_backoff_ms: u64,

    #[serde(default = "default_requests_per_second")]
    pub requests_per_second: u32,

    /// Extra request fields per tool (temperature, text format, ...)
    #[serde(default)]
    pub options: ToolOptions,
}

fn default_base_url() -> String {
    "https://api.openai.com/v1".to_string()
}

fn default_model() -> String {
    "gpt-4o".to_string()
}

const fn default_timeout_secs() -> u64 {
    60
}

const fn default_poll_interval_ms() -> u64 {
    3000
}

const fn default_max_poll_failures() -> u32 {
    3
}

const fn default_max_retries() -> u32 {
    3
}

const fn default_initial_backoff_ms() -> u64 {
    1000
}

const fn default_max_backoff_ms() -> u64 {
    30_000
}

const fn default_requests_per_second() -> u32 {
    5
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            api_key: None,
            model: default_model(),
            timeout_secs: default_timeout_secs(),
            poll_interval_ms: default_poll_interval_ms(),
            max_poll_failures: default_max_poll_failures(),
            max_retries: default_max_retries(),
            initial_backoff_ms: default_initial_backoff_ms(),
            max_backoff_ms: default_max_backoff_ms(),
            requests_per_second: default_requests_per_second(),
            options: ToolOptions::default(),
        }
    }
}

/// Per-tool request options merged into every request body
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct ToolOptions {
    #[serde(default = "default_json_options")]
    pub finder: Map<String, Value>,

    #[serde(default = "default_json_options")]
    pub negative: Map<String, Value>,

    #[serde(default = "default_json_options")]
    pub positive: Map<String, Value>,
}

/// Ask for a JSON object answer.
fn default_json_options() -> Map<String, Value> {
    let mut options = Map::new();
    options.insert(
        "text".to_string(),
        serde_json::json!({ "format": { "type": "json_object" } }),
    );
    options
}

impl Default for ToolOptions {
    fn default() -> Self {
        Self {
            finder: default_json_options(),
            negative: default_json_options(),
            positive: default_json_options(),
        }
    }
}

/// Test framework configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct FrameworkConfig {
    /// Python interpreter with pytest and pytest-json-report installed
    #[serde(default = "default_python")]
    pub python: String,

    /// Per-test execution timeout in seconds
    #[serde(default = "default_framework_timeout_secs")]
    pub timeout_secs: u64,

    /// Directory generated test files are written to
    #[serde(default = "default_work_dir")]
    pub work_dir: String,

    /// Directory pytest JSON reports are written to
    #[serde(default = "default_report_dir")]
    pub report_dir: String,
}

fn default_python() -> String {
    "python".to_string()
}

const fn default_framework_timeout_secs() -> u64 {
    20
}

fn default_work_dir() -> String {
    "test".to_string()
}

fn default_report_dir() -> String {
    "test/reports".to_string()
}

impl Default for FrameworkConfig {
    fn default() -> Self {
        Self {
            python: default_python(),
            timeout_secs: default_framework_timeout_secs(),
            work_dir: default_work_dir(),
            report_dir: default_report_dir(),
        }
    }
}

/// Convergence loop configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct GenerationConfig {
    /// Rounds per test generator run
    #[serde(default = "default_iterations")]
    pub iterations: usize,

    /// Rounds per error-line finder run
    #[serde(default = "default_finder_iterations")]
    pub finder_iterations: usize,

    /// Tests requested from the model per round
    #[serde(default = "default_candidates_per_round")]
    pub candidates_per_round: usize,

    #[serde(default = "default_negative_target")]
    pub negative_target: usize,

    #[serde(default = "default_positive_target")]
    pub positive_target: usize,

    /// Fault kind negative tests must raise
    #[serde(default = "default_fault")]
    pub fault: String,

    /// Functions processed in parallel by the pipeline
    #[serde(default = "default_concurrency")]
    pub concurrency: usize,
}

const fn default_iterations() -> usize {
    1
}

const fn default_finder_iterations() -> usize {
    5
}

const fn default_candidates_per_round() -> usize {
    5
}

const fn default_negative_target() -> usize {
    3
}

const fn default_positive_target() -> usize {
    7
}

fn default_fault() -> String {
    "TypeError".to_string()
}

const fn default_concurrency() -> usize {
    1
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            iterations: default_iterations(),
            finder_iterations: default_finder_iterations(),
            candidates_per_round: default_candidates_per_round(),
            negative_target: default_negative_target(),
            positive_target: default_positive_target(),
            fault: default_fault(),
            concurrency: default_concurrency(),
        }
    }
}

/// Artifact output configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct OutputConfig {
    #[serde(default = "default_output_dir")]
    pub dir: String,
}

fn default_output_dir() -> String {
    "out".to_string()
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            dir: default_output_dir(),
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct LoggingConfig {
    /// Log level: trace, debug, info, warn, error
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Log format: json or pretty
    #[serde(default = "default_log_format")]
    pub format: String,

    /// Directory for rolling log files; stderr only when unset
    #[serde(default)]
    pub log_dir: Option<String>,

    /// Rotation: daily, hourly or never
    #[serde(default = "default_rotation")]
    pub rotation: String,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "pretty".to_string()
}

fn default_rotation() -> String {
    "daily".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
            log_dir: None,
            rotation: default_rotation(),
        }
    }
}

#[cfg(test)]
mod tests {
    use figment::providers::{Format, Serialized, Yaml};
    use figment::Figment;

    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.backend.model, "gpt-4o");
        assert_eq!(config.backend.poll_interval_ms, 3000);
        assert_eq!(config.generation.fault, "TypeError");
        assert_eq!(
            config.generation.negative_target + config.generation.positive_target,
            10
        );
        assert_eq!(config.logging.level, "info");
    }

    #[test]
    fn test_tool_options_default_to_json_answers() {
        let options = ToolOptions::default();
        assert_eq!(options.finder["text"]["format"]["type"], "json_object");
    }

    #[test]
    fn test_deserialize_partial_yaml() {
        let yaml = r"
backend:
  model: gpt-4.1
  options:
    negative:
      temperature: 0.2
generation:
  iterations: 3
";
        let config: Config = Figment::from(Serialized::defaults(Config::default()))
            .merge(Yaml::string(yaml))
            .extract()
            .unwrap();
        assert_eq!(config.backend.model, "gpt-4.1");
        assert_eq!(config.backend.options.negative["temperature"], 0.2);
        assert!(config.backend.options.finder.contains_key("text"));
        assert_eq!(config.generation.iterations, 3);
        assert_eq!(config.generation.candidates_per_round, 5);
        assert_eq!(config.framework.python, "python");
    }
}
