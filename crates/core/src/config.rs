use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::calendar::{CalendarConfig, CalendarWatcher};
use crate::pull_request::PullRequestMatcher;
use crate::reaction::ReactionNames;

pub const DEFAULT_GITHUB_API_URL: &str = "https://api.github.com";
pub const DEFAULT_SLACK_API_BASE_URL: &str = "https://slack.com/api";
pub const GITHUB_DEFAULT_PATTERN: &str =
    r"github\.com/(?P<project>[\w.-]+)/(?P<repo>[\w.-]+)/pull/(?P<number>\d+)";

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub slack: SlackConfig,
    pub server: ServerConfig,
    pub http: HttpConfig,
    pub logging: LoggingConfig,
    pub pull_request: PullRequestConfig,
    pub bitbucket: BitbucketConfig,
    pub github: GithubConfig,
    pub gitlab: GitlabConfig,
    pub calendar: CalendarSettings,
    pub calendars: Vec<CalendarConfig>,
}

#[derive(Clone, Debug)]
pub struct SlackConfig {
    pub app_token: SecretString,
    pub bot_token: SecretString,
    pub api_base_url: String,
}

#[derive(Clone, Debug)]
pub struct ServerConfig {
    pub bind_address: String,
    pub health_check_port: u16,
}

#[derive(Clone, Debug)]
pub struct HttpConfig {
    pub timeout_secs: u64,
}

#[derive(Clone, Debug)]
pub struct LoggingConfig {
    pub level: String,
    pub format: LogFormat,
}

#[derive(Clone, Debug, Default)]
pub struct PullRequestConfig {
    pub reactions: ReactionNames,
}

/// Bitbucket Server integration. Enabled when `host` is set.
#[derive(Clone, Debug, Default)]
pub struct BitbucketConfig {
    pub host: Option<String>,
    pub api_key: Option<SecretString>,
    pub pattern: Option<String>,
}

/// GitHub integration. Enabled when `access_token` is set.
#[derive(Clone, Debug)]
pub struct GithubConfig {
    pub access_token: Option<SecretString>,
    pub api_url: String,
    pub pattern: Option<String>,
}

/// GitLab integration. Enabled when `host` is set.
#[derive(Clone, Debug, Default)]
pub struct GitlabConfig {
    pub host: Option<String>,
    pub access_token: Option<SecretString>,
    pub pattern: Option<String>,
}

#[derive(Clone, Debug)]
pub struct CalendarSettings {
    pub poll_interval_secs: u64,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogFormat {
    Compact,
    Pretty,
    Json,
}

#[derive(Clone, Debug, Default)]
pub struct ConfigOverrides {
    pub log_level: Option<String>,
    pub slack_app_token: Option<String>,
    pub slack_bot_token: Option<String>,
    pub slack_api_base_url: Option<String>,
    pub bitbucket_host: Option<String>,
    pub bitbucket_api_key: Option<String>,
    pub github_access_token: Option<String>,
    pub github_api_url: Option<String>,
    pub gitlab_host: Option<String>,
    pub gitlab_access_token: Option<String>,
}

#[derive(Clone, Debug, Default)]
pub struct LoadOptions {
    pub config_path: Option<PathBuf>,
    pub require_file: bool,
    pub overrides: ConfigOverrides,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("could not read config file `{path}`: {source}")]
    ReadFile { path: PathBuf, source: std::io::Error },
    #[error("could not parse config file `{path}`: {source}")]
    ParseFile { path: PathBuf, source: toml::de::Error },
    #[error("required config file was not found: `{0}`")]
    MissingConfigFile(PathBuf),
    #[error("environment variable interpolation failed for `{var}`")]
    MissingEnvInterpolation { var: String },
    #[error("unterminated environment interpolation expression")]
    UnterminatedInterpolation,
    #[error("invalid environment override for `{key}`: `{value}`")]
    InvalidEnvOverride { key: String, value: String },
    #[error("configuration validation failed: {0}")]
    Validation(String),
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            slack: SlackConfig {
                app_token: String::new().into(),
                bot_token: String::new().into(),
                api_base_url: DEFAULT_SLACK_API_BASE_URL.to_string(),
            },
            server: ServerConfig { bind_address: "127.0.0.1".to_string(), health_check_port: 8080 },
            http: HttpConfig { timeout_secs: 10 },
            logging: LoggingConfig { level: "info".to_string(), format: LogFormat::Compact },
            pull_request: PullRequestConfig::default(),
            bitbucket: BitbucketConfig::default(),
            github: GithubConfig::default(),
            gitlab: GitlabConfig::default(),
            calendar: CalendarSettings { poll_interval_secs: 60 },
            calendars: Vec::new(),
        }
    }
}

impl Default for GithubConfig {
    fn default() -> Self {
        Self { access_token: None, api_url: DEFAULT_GITHUB_API_URL.to_string(), pattern: None }
    }
}

impl BitbucketConfig {
    pub fn is_enabled(&self) -> bool {
        non_blank(self.host.as_deref()).is_some()
    }

    pub fn effective_pattern(&self) -> Option<String> {
        if let Some(pattern) = non_blank(self.pattern.as_deref()) {
            return Some(pattern.to_string());
        }
        let host = host_pattern(non_blank(self.host.as_deref())?);
        let project_repo = r"/projects/(?P<project>[^/\s]+)/repos/(?P<repo>[^/\s]+)";
        Some(format!(r"{host}{project_repo}/pull-requests/(?P<number>\d+)"))
    }
}

impl GithubConfig {
    pub fn is_enabled(&self) -> bool {
        self.access_token.as_ref().is_some_and(|token| !token.expose_secret().trim().is_empty())
    }

    pub fn effective_pattern(&self) -> String {
        non_blank(self.pattern.as_deref()).unwrap_or(GITHUB_DEFAULT_PATTERN).to_string()
    }
}

impl GitlabConfig {
    pub fn is_enabled(&self) -> bool {
        non_blank(self.host.as_deref()).is_some()
    }

    pub fn effective_pattern(&self) -> Option<String> {
        if let Some(pattern) = non_blank(self.pattern.as_deref()) {
            return Some(pattern.to_string());
        }
        let host = host_pattern(non_blank(self.host.as_deref())?);
        Some(format!(
            r"{host}/(?P<project>[^\s]+)/(?P<repo>[^/\s]+)/-/merge_requests/(?P<number>\d+)"
        ))
    }
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|value| !value.is_empty())
}

/// Regex-escaped host without scheme or trailing slash, so links match with
/// or without `https://`.
fn host_pattern(host: &str) -> String {
    let bare = host
        .trim_start_matches("https://")
        .trim_start_matches("http://")
        .trim_end_matches('/');
    regex::escape(bare)
}

fn secret_value(value: String) -> SecretString {
    value.into()
}

impl std::str::FromStr for LogFormat {
    type Err = ConfigError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "compact" => Ok(Self::Compact),
            "pretty" => Ok(Self::Pretty),
            "json" => Ok(Self::Json),
            other => Err(ConfigError::Validation(format!(
                "unsupported log format `{other}` (expected compact|pretty|json)"
            ))),
        }
    }
}

impl AppConfig {
    pub fn load(options: LoadOptions) -> Result<Self, ConfigError> {
        let mut config = Self::default();
        let maybe_path = resolve_config_path(options.config_path.as_deref());

        if let Some(path) = maybe_path {
            let patch = read_patch(&path)?;
            config.apply_patch(patch);
        } else if options.require_file {
            let expected = options.config_path.unwrap_or_else(|| PathBuf::from("prwatch.toml"));
            return Err(ConfigError::MissingConfigFile(expected));
        }

        config.apply_env_overrides()?;
        config.apply_overrides(options.overrides);
        config.validate()?;

        Ok(config)
    }

    /// Names of the pull-request integrations that will register a command.
    pub fn enabled_integrations(&self) -> Vec<&'static str> {
        let mut enabled = Vec::new();
        if self.bitbucket.is_enabled() {
            enabled.push("bitbucket");
        }
        if self.github.is_enabled() {
            enabled.push("github");
        }
        if self.gitlab.is_enabled() {
            enabled.push("gitlab");
        }
        enabled
    }

    fn apply_patch(&mut self, patch: ConfigPatch) {
        if let Some(slack) = patch.slack {
            if let Some(slack_app_token_value) = slack.app_token {
                self.slack.app_token = secret_value(slack_app_token_value);
            }
            if let Some(slack_bot_token_value) = slack.bot_token {
                self.slack.bot_token = secret_value(slack_bot_token_value);
            }
            if let Some(api_base_url) = slack.api_base_url {
                self.slack.api_base_url = api_base_url;
            }
        }

        if let Some(server) = patch.server {
            if let Some(bind_address) = server.bind_address {
                self.server.bind_address = bind_address;
            }
            if let Some(health_check_port) = server.health_check_port {
                self.server.health_check_port = health_check_port;
            }
        }

        if let Some(http) = patch.http {
            if let Some(timeout_secs) = http.timeout_secs {
                self.http.timeout_secs = timeout_secs;
            }
        }

        if let Some(logging) = patch.logging {
            if let Some(level) = logging.level {
                self.logging.level = level;
            }
            if let Some(format) = logging.format {
                self.logging.format = format;
            }
        }

        if let Some(reactions) = patch.pull_request.and_then(|pull_request| pull_request.reactions)
        {
            let names = &mut self.pull_request.reactions;
            if let Some(in_review) = reactions.in_review {
                names.in_review = in_review;
            }
            if let Some(approved) = reactions.approved {
                names.approved = approved;
            }
            if let Some(declined) = reactions.declined {
                names.declined = declined;
            }
            if let Some(merged) = reactions.merged {
                names.merged = merged;
            }
        }

        if let Some(bitbucket) = patch.bitbucket {
            if let Some(host) = bitbucket.host {
                self.bitbucket.host = Some(host);
            }
            if let Some(bitbucket_api_key_value) = bitbucket.api_key {
                self.bitbucket.api_key = Some(secret_value(bitbucket_api_key_value));
            }
            if let Some(pattern) = bitbucket.pattern {
                self.bitbucket.pattern = Some(pattern);
            }
        }

        if let Some(github) = patch.github {
            if let Some(github_token_value) = github.access_token {
                self.github.access_token = Some(secret_value(github_token_value));
            }
            if let Some(api_url) = github.api_url {
                self.github.api_url = api_url;
            }
            if let Some(pattern) = github.pattern {
                self.github.pattern = Some(pattern);
            }
        }

        if let Some(gitlab) = patch.gitlab {
            if let Some(host) = gitlab.host {
                self.gitlab.host = Some(host);
            }
            if let Some(gitlab_token_value) = gitlab.access_token {
                self.gitlab.access_token = Some(secret_value(gitlab_token_value));
            }
            if let Some(pattern) = gitlab.pattern {
                self.gitlab.pattern = Some(pattern);
            }
        }

        if let Some(calendar) = patch.calendar {
            if let Some(poll_interval_secs) = calendar.poll_interval_secs {
                self.calendar.poll_interval_secs = poll_interval_secs;
            }
        }

        if let Some(calendars) = patch.calendars {
            self.calendars = calendars;
        }
    }

    fn apply_env_overrides(&mut self) -> Result<(), ConfigError> {
        if let Some(value) = read_env("PRWATCH_SLACK_APP_TOKEN") {
            self.slack.app_token = secret_value(value);
        }
        if let Some(value) = read_env("PRWATCH_SLACK_BOT_TOKEN") {
            self.slack.bot_token = secret_value(value);
        }
        if let Some(value) = read_env("PRWATCH_SLACK_API_BASE_URL") {
            self.slack.api_base_url = value;
        }

        if let Some(value) = read_env("PRWATCH_SERVER_BIND_ADDRESS") {
            self.server.bind_address = value;
        }
        if let Some(value) = read_env("PRWATCH_SERVER_HEALTH_CHECK_PORT") {
            self.server.health_check_port = parse_u16("PRWATCH_SERVER_HEALTH_CHECK_PORT", &value)?;
        }
        if let Some(value) = read_env("PRWATCH_HTTP_TIMEOUT_SECS") {
            self.http.timeout_secs = parse_u64("PRWATCH_HTTP_TIMEOUT_SECS", &value)?;
        }

        if let Some(value) = read_env("PRWATCH_BITBUCKET_HOST") {
            self.bitbucket.host = Some(value);
        }
        if let Some(value) = read_env("PRWATCH_BITBUCKET_API_KEY") {
            self.bitbucket.api_key = Some(secret_value(value));
        }
        if let Some(value) = read_env("PRWATCH_GITHUB_ACCESS_TOKEN") {
            self.github.access_token = Some(secret_value(value));
        }
        if let Some(value) = read_env("PRWATCH_GITLAB_HOST") {
            self.gitlab.host = Some(value);
        }
        if let Some(value) = read_env("PRWATCH_GITLAB_ACCESS_TOKEN") {
            self.gitlab.access_token = Some(secret_value(value));
        }

        if let Some(value) = read_env("PRWATCH_CALENDAR_POLL_INTERVAL_SECS") {
            self.calendar.poll_interval_secs =
                parse_u64("PRWATCH_CALENDAR_POLL_INTERVAL_SECS", &value)?;
        }

        let log_level = read_env("PRWATCH_LOGGING_LEVEL").or_else(|| read_env("PRWATCH_LOG_LEVEL"));
        if let Some(value) = log_level {
            self.logging.level = value;
        }
        let log_format =
            read_env("PRWATCH_LOGGING_FORMAT").or_else(|| read_env("PRWATCH_LOG_FORMAT"));
        if let Some(value) = log_format {
            self.logging.format = value.parse()?;
        }

        Ok(())
    }

    fn apply_overrides(&mut self, overrides: ConfigOverrides) {
        if let Some(log_level) = overrides.log_level {
            self.logging.level = log_level;
        }
        if let Some(slack_app_token) = overrides.slack_app_token {
            self.slack.app_token = secret_value(slack_app_token);
        }
        if let Some(slack_bot_token) = overrides.slack_bot_token {
            self.slack.bot_token = secret_value(slack_bot_token);
        }
        if let Some(api_base_url) = overrides.slack_api_base_url {
            self.slack.api_base_url = api_base_url;
        }
        if let Some(host) = overrides.bitbucket_host {
            self.bitbucket.host = Some(host);
        }
        if let Some(api_key) = overrides.bitbucket_api_key {
            self.bitbucket.api_key = Some(secret_value(api_key));
        }
        if let Some(access_token) = overrides.github_access_token {
            self.github.access_token = Some(secret_value(access_token));
        }
        if let Some(api_url) = overrides.github_api_url {
            self.github.api_url = api_url;
        }
        if let Some(host) = overrides.gitlab_host {
            self.gitlab.host = Some(host);
        }
        if let Some(access_token) = overrides.gitlab_access_token {
            self.gitlab.access_token = Some(secret_value(access_token));
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        validate_slack(&self.slack)?;
        validate_server(&self.server)?;
        validate_http(&self.http)?;
        validate_logging(&self.logging)?;
        validate_reactions(&self.pull_request.reactions)?;
        validate_integrations(self)?;
        validate_calendars(&self.calendar, &self.calendars)?;
        Ok(())
    }
}

fn resolve_config_path(explicit_path: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = explicit_path {
        return path.exists().then_some(path.to_path_buf());
    }

    [PathBuf::from("prwatch.toml"), PathBuf::from("config/prwatch.toml")]
        .into_iter()
        .find(|path| path.exists())
}

fn read_patch(path: &Path) -> Result<ConfigPatch, ConfigError> {
    let raw = fs::read_to_string(path)
        .map_err(|source| ConfigError::ReadFile { path: path.to_path_buf(), source })?;

    let interpolated = interpolate_env_vars(&raw)?;
    toml::from_str::<ConfigPatch>(&interpolated)
        .map_err(|source| ConfigError::ParseFile { path: path.to_path_buf(), source })
}

fn interpolate_env_vars(input: &str) -> Result<String, ConfigError> {
    let mut output = String::with_capacity(input.len());
    let mut chars = input.chars().peekable();

    while let Some(ch) = chars.next() {
        if ch == '$' && matches!(chars.peek(), Some('{')) {
            chars.next();
            let mut key = String::new();

            loop {
                match chars.next() {
                    Some('}') => break,
                    Some(next) => key.push(next),
                    None => return Err(ConfigError::UnterminatedInterpolation),
                }
            }

            let value = env::var(&key)
                .map_err(|_| ConfigError::MissingEnvInterpolation { var: key.clone() })?;
            output.push_str(&value);
            continue;
        }

        output.push(ch);
    }

    Ok(output)
}

fn validate_slack(slack: &SlackConfig) -> Result<(), ConfigError> {
    let app_token = slack.app_token.expose_secret();
    if app_token.is_empty() {
        return Err(ConfigError::Validation(
            "slack.app_token is required. Get it from https://api.slack.com/apps > Your App > \
             Basic Information > App-Level Tokens"
                .to_string(),
        ));
    }
    if !app_token.starts_with("xapp-") {
        let hint = if app_token.starts_with("xoxb-") {
            " (hint: you may have used the bot token instead of the app token)"
        } else {
            ""
        };
        return Err(ConfigError::Validation(format!(
            "slack.app_token must start with `xapp-`{hint}. Get it from https://api.slack.com/apps"
        )));
    }

    let bot_token = slack.bot_token.expose_secret();
    if bot_token.is_empty() {
        return Err(ConfigError::Validation(
            "slack.bot_token is required. Get it from https://api.slack.com/apps > Your App > \
             OAuth & Permissions > Bot User OAuth Token"
                .to_string(),
        ));
    }
    if !bot_token.starts_with("xoxb-") {
        let hint = if bot_token.starts_with("xapp-") {
            " (hint: you may have used the app token instead of the bot token)"
        } else {
            ""
        };
        return Err(ConfigError::Validation(format!(
            "slack.bot_token must start with `xoxb-`{hint}. Get it from https://api.slack.com/apps"
        )));
    }

    validate_http_url("slack.api_base_url", &slack.api_base_url)
}

fn validate_server(server: &ServerConfig) -> Result<(), ConfigError> {
    if server.health_check_port == 0 {
        return Err(ConfigError::Validation(
            "server.health_check_port must be greater than zero".to_string(),
        ));
    }

    Ok(())
}

fn validate_http(http: &HttpConfig) -> Result<(), ConfigError> {
    if http.timeout_secs == 0 || http.timeout_secs > 300 {
        return Err(ConfigError::Validation(
            "http.timeout_secs must be in range 1..=300".to_string(),
        ));
    }

    Ok(())
}

fn validate_logging(logging: &LoggingConfig) -> Result<(), ConfigError> {
    let level = logging.level.trim().to_ascii_lowercase();
    match level.as_str() {
        "trace" | "debug" | "info" | "warn" | "error" => Ok(()),
        _ => Err(ConfigError::Validation(
            "logging.level must be one of trace|debug|info|warn|error".to_string(),
        )),
    }
}

fn validate_reactions(reactions: &ReactionNames) -> Result<(), ConfigError> {
    let names = [
        ("in_review", &reactions.in_review),
        ("approved", &reactions.approved),
        ("declined", &reactions.declined),
        ("merged", &reactions.merged),
    ];
    for (key, name) in names {
        let trimmed = name.trim();
        if trimmed.is_empty() || trimmed.contains(char::is_whitespace) || trimmed.contains(':') {
            return Err(ConfigError::Validation(format!(
                "pull_request.reactions.{key} must be a bare emoji name such as `eyes`"
            )));
        }
    }

    Ok(())
}

fn validate_integrations(config: &AppConfig) -> Result<(), ConfigError> {
    if config.bitbucket.is_enabled() {
        if let Some(host) = &config.bitbucket.host {
            validate_http_url("bitbucket.host", host)?;
        }
        if let Some(pattern) = config.bitbucket.effective_pattern() {
            validate_pattern("bitbucket.pattern", &pattern)?;
        }
    }

    if config.github.is_enabled() {
        validate_http_url("github.api_url", &config.github.api_url)?;
        validate_pattern("github.pattern", &config.github.effective_pattern())?;
    }

    if config.gitlab.is_enabled() {
        if let Some(host) = &config.gitlab.host {
            validate_http_url("gitlab.host", host)?;
        }
        let has_token = config
            .gitlab
            .access_token
            .as_ref()
            .is_some_and(|token| !token.expose_secret().trim().is_empty());
        if !has_token {
            return Err(ConfigError::Validation(
                "gitlab.access_token is required when gitlab.host is configured".to_string(),
            ));
        }
        if let Some(pattern) = config.gitlab.effective_pattern() {
            validate_pattern("gitlab.pattern", &pattern)?;
        }
    }

    Ok(())
}

fn validate_pattern(key: &str, pattern: &str) -> Result<(), ConfigError> {
    PullRequestMatcher::new(pattern)
        .map(|_| ())
        .map_err(|error| ConfigError::Validation(format!("{key}: {error}")))
}

fn validate_calendars(
    settings: &CalendarSettings,
    calendars: &[CalendarConfig],
) -> Result<(), ConfigError> {
    if settings.poll_interval_secs == 0 {
        return Err(ConfigError::Validation(
            "calendar.poll_interval_secs must be greater than zero".to_string(),
        ));
    }

    for calendar in calendars {
        if calendar.name.trim().is_empty() || calendar.path.trim().is_empty() {
            return Err(ConfigError::Validation(
                "calendars entries require a non-empty name and path".to_string(),
            ));
        }
        for event in &calendar.events {
            if event.channel.trim().is_empty() {
                return Err(ConfigError::Validation(format!(
                    "calendar `{}` event `{}` requires a channel",
                    calendar.name, event.name
                )));
            }
            if event.commands.is_empty() {
                return Err(ConfigError::Validation(format!(
                    "calendar `{}` event `{}` requires at least one command",
                    calendar.name, event.name
                )));
            }
        }
        CalendarWatcher::new(calendar)
            .map_err(|error| ConfigError::Validation(error.to_string()))?;
    }

    Ok(())
}

fn validate_http_url(key: &str, value: &str) -> Result<(), ConfigError> {
    if !value.starts_with("http://") && !value.starts_with("https://") {
        return Err(ConfigError::Validation(format!(
            "{key} must start with http:// or https://"
        )));
    }

    Ok(())
}

fn read_env(key: &str) -> Option<String> {
    env::var(key).ok().filter(|value| !value.trim().is_empty())
}

fn parse_u16(key: &str, value: &str) -> Result<u16, ConfigError> {
    value.parse::<u16>().map_err(|_| ConfigError::InvalidEnvOverride {
        key: key.to_string(),
        value: value.to_string(),
    })
}

fn parse_u64(key: &str, value: &str) -> Result<u64, ConfigError> {
    value.parse::<u64>().map_err(|_| ConfigError::InvalidEnvOverride {
        key: key.to_string(),
        value: value.to_string(),
    })
}

#[derive(Debug, Default, Deserialize)]
struct ConfigPatch {
    slack: Option<SlackPatch>,
    server: Option<ServerPatch>,
    http: Option<HttpPatch>,
    logging: Option<LoggingPatch>,
    pull_request: Option<PullRequestPatch>,
    bitbucket: Option<BitbucketPatch>,
    github: Option<GithubPatch>,
    gitlab: Option<GitlabPatch>,
    calendar: Option<CalendarSettingsPatch>,
    calendars: Option<Vec<CalendarConfig>>,
}

#[derive(Debug, Default, Deserialize)]
struct SlackPatch {
    app_token: Option<String>,
    bot_token: Option<String>,
    api_base_url: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct ServerPatch {
    bind_address: Option<String>,
    health_check_port: Option<u16>,
}

#[derive(Debug, Default, Deserialize)]
struct HttpPatch {
    timeout_secs: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
struct LoggingPatch {
    level: Option<String>,
    format: Option<LogFormat>,
}

#[derive(Debug, Default, Deserialize)]
struct PullRequestPatch {
    reactions: Option<ReactionsPatch>,
}

#[derive(Debug, Default, Deserialize)]
struct ReactionsPatch {
    in_review: Option<String>,
    approved: Option<String>,
    declined: Option<String>,
    merged: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct BitbucketPatch {
    host: Option<String>,
    api_key: Option<String>,
    pattern: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct GithubPatch {
    access_token: Option<String>,
    api_url: Option<String>,
    pattern: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct GitlabPatch {
    host: Option<String>,
    access_token: Option<String>,
    pattern: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct CalendarSettingsPatch {
    poll_interval_secs: Option<u64>,
}
