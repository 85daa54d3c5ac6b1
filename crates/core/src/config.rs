use std::env;
use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Load .env file (silently ignores if missing).
pub fn load_dotenv() {
    dotenvy::dotenv().ok();
}

fn env_or(key: &str, default: &str) -> String {
    env::var(key).unwrap_or_else(|_| default.to_string())
}

fn env_opt(key: &str) -> Option<String> {
    env::var(key).ok().filter(|s| !s.is_empty())
}

/// Read a profiled env var: tries {PROFILE}_{KEY} first, falls back to {KEY}.
fn profiled_env_opt(profile: &str, key: &str) -> Option<String> {
    if !profile.is_empty() {
        let prefixed = format!("{}_{}", profile, key);
        if let Some(v) = env_opt(&prefixed) {
            return Some(v);
        }
    }
    env_opt(key)
}

fn profiled_env_or(profile: &str, key: &str, default: &str) -> String {
    profiled_env_opt(profile, key).unwrap_or_else(|| default.to_string())
}

fn profiled_env_u16(profile: &str, key: &str, default: u16) -> u16 {
    profiled_env_opt(profile, key)
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

fn profiled_env_u64(profile: &str, key: &str, default: u64) -> u64 {
    profiled_env_opt(profile, key)
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

// ── Top-level config ──────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Active profile name (empty = default).
    pub profile: String,
    pub server: ServerConfig,
    pub smtp: SmtpConfig,
    pub workflow: WorkflowConfig,
}

impl Config {
    /// Build config from environment variables (call `load_dotenv()` first).
    /// Profile is read from `CASEFLOW_PROFILE`. When set (e.g. `PROD`),
    /// every key is first looked up as `{PROFILE}_{KEY}`, falling back to `{KEY}`.
    pub fn from_env() -> Self {
        let profile = env_or("CASEFLOW_PROFILE", "").to_uppercase();
        Self::for_profile(&profile)
    }

    /// Build config for a specific named profile (empty string = default).
    pub fn for_profile(profile: &str) -> Self {
        let p = profile.to_uppercase();
        let p = p.as_str();
        Self {
            profile: p.to_string(),
            server: ServerConfig::from_env_profiled(p),
            smtp: SmtpConfig::from_env_profiled(p),
            workflow: WorkflowConfig::from_env_profiled(p),
        }
    }

    pub fn profile_label(&self) -> &str {
        if self.profile.is_empty() { "default" } else { &self.profile }
    }

    /// Print a redacted summary for startup logs.
    pub fn log_summary(&self) {
        tracing::info!("Config loaded (profile: {}):", self.profile_label());
        tracing::info!("  server:    {}:{}", self.server.host, self.server.port);
        tracing::info!(
            "  smtp:      host={}, configured={}",
            self.smtp.host.as_deref().unwrap_or("(none)"),
            self.smtp.is_configured()
        );
        tracing::info!(
            "  workflow:  workdir={}, timeout={}s, delay={}ms, maintenance='{}'",
            self.workflow.working_dir.display(),
            self.workflow.command_timeout_secs,
            self.workflow.rule_delay_ms,
            self.workflow.maintenance_cron
        );
        if let Some(ref path) = self.workflow.rules_file {
            tracing::info!("  rules:     overrides from {}", path.display());
        }
    }

    /// Return a redacted view safe for API responses (no secrets).
    pub fn redacted_summary(&self) -> serde_json::Value {
        serde_json::json!({
            "profile": self.profile_label(),
            "server": { "host": self.server.host, "port": self.server.port },
            "smtp": {
                "host": self.smtp.host,
                "port": self.smtp.port,
                "configured": self.smtp.is_configured(),
            },
            "workflow": {
                "working_dir": self.workflow.working_dir,
                "command_timeout_secs": self.workflow.command_timeout_secs,
                "rule_delay_ms": self.workflow.rule_delay_ms,
                "maintenance_cron": self.workflow.maintenance_cron,
                "rules_file": self.workflow.rules_file,
            },
        })
    }
}

// ── Server ────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl ServerConfig {
    fn from_env_profiled(p: &str) -> Self {
        Self {
            host: profiled_env_or(p, "HOST", "0.0.0.0"),
            port: profiled_env_u16(p, "PORT", 5000),
        }
    }

    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

// ── SMTP ──────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SmtpConfig {
    pub host: Option<String>,
    pub port: u16,
    pub username: Option<String>,
    #[serde(skip_serializing)]
    pub password: Option<String>,
    /// Sender address; falls back to the username.
    pub from: Option<String>,
}

impl SmtpConfig {
    fn from_env_profiled(p: &str) -> Self {
        Self {
            host: profiled_env_opt(p, "EMAIL_HOST"),
            port: profiled_env_u16(p, "EMAIL_PORT", 587),
            username: profiled_env_opt(p, "EMAIL_USER"),
            password: profiled_env_opt(p, "EMAIL_PASS"),
            from: profiled_env_opt(p, "EMAIL_FROM"),
        }
    }

    /// Email delivery needs at least a host and a user.
    pub fn is_configured(&self) -> bool {
        self.host.is_some() && self.username.is_some()
    }

    pub fn sender(&self) -> Option<&str> {
        self.from.as_deref().or(self.username.as_deref())
    }
}

impl Default for SmtpConfig {
    fn default() -> Self {
        Self {
            host: None,
            port: 587,
            username: None,
            password: None,
            from: None,
        }
    }
}

// ── Workflow scheduler ────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkflowConfig {
    /// Directory rule commands run in.
    pub working_dir: PathBuf,
    /// Per-command wall-clock limit.
    pub command_timeout_secs: u64,
    /// Pause between consecutive rules of a chain or group.
    pub rule_delay_ms: u64,
    /// 5-field cron expression for the daily maintenance run (UTC).
    pub maintenance_cron: String,
    /// Optional YAML file overriding built-in rule definitions.
    pub rules_file: Option<PathBuf>,
}

impl WorkflowConfig {
    fn from_env_profiled(p: &str) -> Self {
        Self {
            working_dir: PathBuf::from(profiled_env_or(p, "WORKFLOW_WORKDIR", ".")),
            command_timeout_secs: profiled_env_u64(p, "WORKFLOW_COMMAND_TIMEOUT_SECS", 600),
            rule_delay_ms: profiled_env_u64(p, "WORKFLOW_RULE_DELAY_MS", 2000),
            maintenance_cron: profiled_env_or(p, "WORKFLOW_MAINTENANCE_CRON", "0 6 * * *"),
            rules_file: profiled_env_opt(p, "WORKFLOW_RULES_FILE").map(PathBuf::from),
        }
    }

    pub fn command_timeout(&self) -> Duration {
        Duration::from_secs(self.command_timeout_secs.max(1))
    }

    pub fn rule_delay(&self) -> Duration {
        Duration::from_millis(self.rule_delay_ms)
    }
}

impl Default for WorkflowConfig {
    fn default() -> Self {
        Self {
            working_dir: PathBuf::from("."),
            command_timeout_secs: 600,
            rule_delay_ms: 2000,
            maintenance_cron: "0 6 * * *".to_string(),
            rules_file: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn profiled_keys_take_precedence() {
        env::set_var("CFTESTPROFILE_PORT", "7777");
        env::set_var("CFTESTPROFILE_WORKFLOW_RULE_DELAY_MS", "250");
        let cfg = Config::for_profile("cftestprofile");
        assert_eq!(cfg.profile, "CFTESTPROFILE");
        assert_eq!(cfg.server.port, 7777);
        assert_eq!(cfg.workflow.rule_delay(), Duration::from_millis(250));
        env::remove_var("CFTESTPROFILE_PORT");
        env::remove_var("CFTESTPROFILE_WORKFLOW_RULE_DELAY_MS");
    }

    #[test]
    fn unparseable_numbers_fall_back_to_defaults() {
        env::set_var("CFTESTBAD_WORKFLOW_COMMAND_TIMEOUT_SECS", "soon");
        let cfg = Config::for_profile("cftestbad");
        assert_eq!(cfg.workflow.command_timeout_secs, 600);
        env::remove_var("CFTESTBAD_WORKFLOW_COMMAND_TIMEOUT_SECS");
    }

    #[test]
    fn smtp_requires_host_and_user() {
        let mut smtp = SmtpConfig {
            host: Some("smtp.example.com".into()),
            port: 587,
            username: None,
            password: None,
            from: None,
        };
        assert!(!smtp.is_configured());
        smtp.username = Some("robot@example.com".into());
        assert!(smtp.is_configured());
        assert_eq!(smtp.sender(), Some("robot@example.com"));
    }

    #[test]
    fn zero_timeout_is_clamped() {
        let wf = WorkflowConfig {
            command_timeout_secs: 0,
            ..Default::default()
        };
        assert_eq!(wf.command_timeout(), Duration::from_secs(1));
    }

    #[test]
    fn redacted_summary_omits_password() {
        let mut cfg = Config::for_profile("cftestredact");
        cfg.smtp.password = Some("hunter2".into());
        let text = cfg.redacted_summary().to_string();
        assert!(!text.contains("hunter2"));
    }
}
