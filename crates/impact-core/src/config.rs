use crate::error::{ImpactError, Result};
use crate::model::ImpactThresholds;
use crate::paths;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

// ---------------------------------------------------------------------------
// ConfigWarning / WarnLevel
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfigWarning {
    pub level: WarnLevel,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WarnLevel {
    Warning,
    Error,
}

// ---------------------------------------------------------------------------
// ServerConfig
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServerConfig {
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default = "default_bind")]
    pub bind: String,
}

fn default_port() -> u16 {
    8080
}

fn default_bind() -> String {
    "0.0.0.0".to_string()
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: default_port(),
            bind: default_bind(),
        }
    }
}

// ---------------------------------------------------------------------------
// StoreConfig
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoreConfig {
    /// Relative paths resolve against the project root.
    #[serde(default = "default_store_path")]
    pub path: PathBuf,
}

fn default_store_path() -> PathBuf {
    PathBuf::from(paths::DB_FILE)
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            path: default_store_path(),
        }
    }
}

// ---------------------------------------------------------------------------
// AnalysisConfig
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisConfig {
    #[serde(flatten)]
    pub thresholds: ImpactThresholds,
    /// Minimum fraction of the change description's keywords a component
    /// must contain to count as impacted.
    #[serde(default = "default_min_score")]
    pub min_score: f64,
    /// Minimum number of shared keywords.
    #[serde(default = "default_min_overlap")]
    pub min_overlap: usize,
    /// Upper bound on systems analyzed at the same time.
    #[serde(default = "default_max_concurrency")]
    pub max_concurrency: usize,
    /// Extra words ignored by the keyword matcher.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub stop_words: Vec<String>,
}

fn default_min_score() -> f64 {
    0.2
}

fn default_min_overlap() -> usize {
    1
}

fn default_max_concurrency() -> usize {
    4
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            thresholds: ImpactThresholds::default(),
            min_score: default_min_score(),
            min_overlap: default_min_overlap(),
            max_concurrency: default_max_concurrency(),
            stop_words: Vec::new(),
        }
    }
}

// ---------------------------------------------------------------------------
// RetryConfig
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RetryConfig {
    #[serde(default = "default_attempts")]
    pub attempts: u32,
    #[serde(default = "default_base_delay_ms")]
    pub base_delay_ms: u64,
    /// Per-attempt timeout for a single external call.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_attempts() -> u32 {
    3
}

fn default_base_delay_ms() -> u64 {
    200
}

fn default_timeout_secs() -> u64 {
    10
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            attempts: default_attempts(),
            base_delay_ms: default_base_delay_ms(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

// ---------------------------------------------------------------------------
// TicketsConfig
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TicketsConfig {
    /// How often the server drains the ticket outbox. 0 disables the worker.
    #[serde(default = "default_drain_interval")]
    pub drain_interval_secs: u64,
}

fn default_drain_interval() -> u64 {
    30
}

impl Default for TicketsConfig {
    fn default() -> Self {
        Self {
            drain_interval_secs: default_drain_interval(),
        }
    }
}

// ---------------------------------------------------------------------------
// Collaborator endpoints
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfluenceConfig {
    /// e.g. `https://wiki.example.com/rest/api`
    pub base_url: String,
    /// Environment variable holding the API token.
    #[serde(default = "default_confluence_token_env")]
    pub token_env: String,
}

fn default_confluence_token_env() -> String {
    "CONFLUENCE_API_TOKEN".to_string()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JiraConfig {
    /// e.g. `https://jira.example.com/rest/api/2`
    pub base_url: String,
    pub project_key: String,
    #[serde(default = "default_issue_type")]
    pub issue_type: String,
    #[serde(default = "default_jira_token_env")]
    pub token_env: String,
}

fn default_issue_type() -> String {
    "Task".to_string()
}

fn default_jira_token_env() -> String {
    "JIRA_API_TOKEN".to_string()
}

/// Read the token named by `token_env`, if set and non-empty.
pub fn token_from_env(token_env: &str) -> Option<String> {
    std::env::var(token_env)
        .ok()
        .filter(|v| !v.trim().is_empty())
}

// ---------------------------------------------------------------------------
// Config (top-level)
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Config {
    #[serde(default = "default_version")]
    pub version: u32,
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub store: StoreConfig,
    #[serde(default)]
    pub analysis: AnalysisConfig,
    #[serde(default)]
    pub retry: RetryConfig,
    #[serde(default)]
    pub tickets: TicketsConfig,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub confluence: Option<ConfluenceConfig>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub jira: Option<JiraConfig>,
}

fn default_version() -> u32 {
    1
}

impl Default for Config {
    fn default() -> Self {
        Self {
            version: default_version(),
            server: ServerConfig::default(),
            store: StoreConfig::default(),
            analysis: AnalysisConfig::default(),
            retry: RetryConfig::default(),
            tickets: TicketsConfig::default(),
            confluence: None,
            jira: None,
        }
    }
}

impl Config {
    pub fn load(root: &Path) -> Result<Self> {
        let path = paths::config_path(root);
        if !path.exists() {
            return Err(ImpactError::NotInitialized);
        }
        let data = std::fs::read_to_string(&path)?;
        let cfg: Config = serde_yaml::from_str(&data)?;
        Ok(cfg)
    }

    /// Like `load`, but a missing file yields the defaults.
    pub fn load_or_default(root: &Path) -> Result<Self> {
        match Self::load(root) {
            Err(ImpactError::NotInitialized) => Ok(Self::default()),
            other => other,
        }
    }

    pub fn save(&self, root: &Path) -> Result<()> {
        let path = paths::config_path(root);
        let data = serde_yaml::to_string(self)?;
        crate::io::atomic_write(&path, data.as_bytes())
    }

    pub fn store_path(&self, root: &Path) -> PathBuf {
        paths::resolve(root, &self.store.path)
    }

    // -----------------------------------------------------------------------
    // Validation
    // -----------------------------------------------------------------------

    pub fn validate(&self) -> Vec<ConfigWarning> {
        let mut warnings = Vec::new();
        let t = &self.analysis.thresholds;

        if t.medium_above >= t.high_above {
            warnings.push(ConfigWarning {
                level: WarnLevel::Error,
                message: format!(
                    "analysis.mediumAbove ({}) must be below analysis.highAbove ({})",
                    t.medium_above, t.high_above
                ),
            });
        }

        if !(0.0..=1.0).contains(&self.analysis.min_score) {
            warnings.push(ConfigWarning {
                level: WarnLevel::Error,
                message: format!(
                    "analysis.minScore ({}) must be within [0, 1]",
                    self.analysis.min_score
                ),
            });
        }

        if self.analysis.max_concurrency == 0 {
            warnings.push(ConfigWarning {
                level: WarnLevel::Error,
                message: "analysis.maxConcurrency must be at least 1".to_string(),
            });
        }

        if self.retry.attempts == 0 {
            warnings.push(ConfigWarning {
                level: WarnLevel::Error,
                message: "retry.attempts must be at least 1".to_string(),
            });
        }

        if self.retry.timeout_secs == 0 {
            warnings.push(ConfigWarning {
                level: WarnLevel::Error,
                message: "retry.timeoutSecs must be at least 1; every collaborator call would time out"
                    .to_string(),
            });
        }

        if let Some(c) = &self.confluence {
            if token_from_env(&c.token_env).is_none() {
                warnings.push(ConfigWarning {
                    level: WarnLevel::Warning,
                    message: format!(
                        "confluence token env var '{}' is not set; requests will be anonymous",
                        c.token_env
                    ),
                });
            }
        }

        match &self.jira {
            Some(j) => {
                if j.project_key.trim().is_empty() {
                    warnings.push(ConfigWarning {
                        level: WarnLevel::Error,
                        message: "jira.projectKey is empty".to_string(),
                    });
                }
                if token_from_env(&j.token_env).is_none() {
                    warnings.push(ConfigWarning {
                        level: WarnLevel::Warning,
                        message: format!(
                            "jira token env var '{}' is not set; requests will be anonymous",
                            j.token_env
                        ),
                    });
                }
            }
            None => warnings.push(ConfigWarning {
                level: WarnLevel::Warning,
                message: "no jira section: tickets are minted locally".to_string(),
            }),
        }

        warnings
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn default_config_roundtrip() {
        let dir = TempDir::new().unwrap();
        let cfg = Config::default();
        cfg.save(dir.path()).unwrap();
        let loaded = Config::load(dir.path()).unwrap();
        assert_eq!(loaded.server.port, 8080);
        assert_eq!(loaded.analysis.thresholds, ImpactThresholds::default());
        assert_eq!(loaded.retry.attempts, 3);
        assert!(loaded.jira.is_none());
    }

    #[test]
    fn missing_config_is_not_initialized() {
        let dir = TempDir::new().unwrap();
        assert!(matches!(
            Config::load(dir.path()),
            Err(ImpactError::NotInitialized)
        ));
        let cfg = Config::load_or_default(dir.path()).unwrap();
        assert_eq!(cfg.analysis.max_concurrency, 4);
    }

    #[test]
    fn partial_yaml_fills_defaults() {
        let yaml = r#"
analysis:
  highAbove: 10
  minScore: 0.5
jira:
  baseUrl: https://jira.example.com/rest/api/2
  projectKey: REG
"#;
        let cfg: Config = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(cfg.analysis.thresholds.high_above, 10);
        assert_eq!(cfg.analysis.thresholds.medium_above, 5);
        assert_eq!(cfg.analysis.min_score, 0.5);
        assert_eq!(cfg.analysis.min_overlap, 1);
        let jira = cfg.jira.unwrap();
        assert_eq!(jira.issue_type, "Task");
        assert_eq!(jira.token_env, "JIRA_API_TOKEN");
    }

    #[test]
    fn store_path_resolves_against_root() {
        let cfg = Config::default();
        let root = Path::new("/srv/impact");
        assert_eq!(
            cfg.store_path(root),
            PathBuf::from("/srv/impact/.impact/impact.db")
        );
    }

    #[test]
    fn validate_flags_inverted_thresholds() {
        let mut cfg = Config::default();
        cfg.analysis.thresholds = ImpactThresholds {
            high_above: 5,
            medium_above: 5,
        };
        let warnings = cfg.validate();
        assert!(warnings
            .iter()
            .any(|w| w.level == WarnLevel::Error && w.message.contains("mediumAbove")));
    }

    #[test]
    fn validate_flags_zero_concurrency_and_attempts() {
        let mut cfg = Config::default();
        cfg.analysis.max_concurrency = 0;
        cfg.retry.attempts = 0;
        let warnings = cfg.validate();
        assert!(warnings.iter().any(|w| w.message.contains("maxConcurrency")));
        assert!(warnings.iter().any(|w| w.message.contains("retry.attempts")));
    }

    #[test]
    fn validate_flags_zero_timeout() {
        let mut cfg = Config::default();
        cfg.retry.timeout_secs = 0;
        let warnings = cfg.validate();
        assert!(warnings
            .iter()
            .any(|w| w.level == WarnLevel::Error && w.message.contains("retry.timeoutSecs")));
    }

    #[test]
    fn validate_default_only_warns_about_local_tickets() {
        let warnings = Config::default().validate();
        assert_eq!(warnings.len(), 1);
        assert_eq!(warnings[0].level, WarnLevel::Warning);
        assert!(warnings[0].message.contains("minted locally"));
    }
}
