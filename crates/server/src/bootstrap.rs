use std::sync::Arc;

use prwatch_core::config::{AppConfig, ConfigError};
use prwatch_core::{MatcherError, PullRequestFetcher, PullRequestMatcher};
use prwatch_review::{build_client, BitbucketFetcher, GithubFetcher, GitlabFetcher};
use prwatch_slack::client::{ChatClient, SlackWebClient};
use prwatch_slack::commands::Command;
use prwatch_slack::events::CommandDispatcher;
use prwatch_slack::pull_request::PullRequestCommand;
use prwatch_slack::socket::{ReconnectPolicy, SocketModeRunner};
use prwatch_slack::websocket::SlackSocketTransport;
use reqwest::Client;
use thiserror::Error;
use tracing::info;

pub struct Application {
    pub config: AppConfig,
    pub http: Client,
    pub chat: Arc<dyn ChatClient>,
    pub dispatcher: Arc<CommandDispatcher>,
    pub slack_runner: SocketModeRunner,
}

#[derive(Debug, Error)]
pub enum BootstrapError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("http client could not be built: {0}")]
    HttpClient(#[source] reqwest::Error),
    #[error("{integration} pull request pattern is invalid: {source}")]
    Pattern {
        integration: &'static str,
        #[source]
        source: MatcherError,
    },
    #[error("{0} integration is enabled but incomplete")]
    IncompleteIntegration(&'static str),
}

pub fn bootstrap(config: AppConfig) -> Result<Application, BootstrapError> {
    info!(
        event_name = "system.bootstrap.start",
        correlation_id = "bootstrap",
        "starting application bootstrap"
    );

    let http = build_client(config.http.timeout_secs).map_err(BootstrapError::HttpClient)?;
    let chat: Arc<dyn ChatClient> = Arc::new(SlackWebClient::new(
        http.clone(),
        config.slack.api_base_url.clone(),
        config.slack.bot_token.clone(),
    ));

    let commands = build_commands(&config, &http, chat.clone())?;
    let dispatcher = Arc::new(CommandDispatcher::with_help(commands, chat.clone()));
    info!(
        event_name = "system.bootstrap.commands_registered",
        correlation_id = "bootstrap",
        commands = ?dispatcher.command_names(),
        integrations = ?config.enabled_integrations(),
        "commands registered"
    );

    let transport = SlackSocketTransport::new(
        http.clone(),
        config.slack.api_base_url.clone(),
        config.slack.app_token.clone(),
    );
    let slack_runner =
        SocketModeRunner::new(Arc::new(transport), dispatcher.clone(), ReconnectPolicy::default());

    Ok(Application { config, http, chat, dispatcher, slack_runner })
}

/// One pull request command per enabled integration, in the order
/// bitbucket, github, gitlab.
pub fn build_commands(
    config: &AppConfig,
    http: &Client,
    chat: Arc<dyn ChatClient>,
) -> Result<Vec<Arc<dyn Command>>, BootstrapError> {
    let mut integrations: Vec<(&'static str, String, Arc<dyn PullRequestFetcher>)> = Vec::new();

    if config.bitbucket.is_enabled() {
        let (Some(host), Some(pattern)) =
            (&config.bitbucket.host, config.bitbucket.effective_pattern())
        else {
            return Err(BootstrapError::IncompleteIntegration("bitbucket"));
        };
        let fetcher =
            BitbucketFetcher::new(http.clone(), host.clone(), config.bitbucket.api_key.clone());
        integrations.push(("bitbucket", pattern, Arc::new(fetcher) as Arc<dyn PullRequestFetcher>));
    }

    if config.github.is_enabled() {
        let Some(access_token) = &config.github.access_token else {
            return Err(BootstrapError::IncompleteIntegration("github"));
        };
        let fetcher =
            GithubFetcher::new(http.clone(), config.github.api_url.clone(), access_token.clone());
        let pattern = config.github.effective_pattern();
        integrations.push(("github", pattern, Arc::new(fetcher) as Arc<dyn PullRequestFetcher>));
    }

    if config.gitlab.is_enabled() {
        let (Some(host), Some(access_token), Some(pattern)) = (
            &config.gitlab.host,
            &config.gitlab.access_token,
            config.gitlab.effective_pattern(),
        ) else {
            return Err(BootstrapError::IncompleteIntegration("gitlab"));
        };
        let fetcher = GitlabFetcher::new(http.clone(), host.clone(), access_token.clone());
        integrations.push(("gitlab", pattern, Arc::new(fetcher) as Arc<dyn PullRequestFetcher>));
    }

    integrations
        .into_iter()
        .map(|(integration, pattern, fetcher)| {
            let matcher = PullRequestMatcher::new(&pattern)
                .map_err(|source| BootstrapError::Pattern { integration, source })?;
            let command = PullRequestCommand::new(
                integration,
                matcher,
                fetcher,
                chat.clone(),
                config.pull_request.reactions.clone(),
            );
            Ok(Arc::new(command) as Arc<dyn Command>)
        })
        .collect()
}
