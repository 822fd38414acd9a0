use std::path::Path;

use prwatch_core::config::{AppConfig, LoadOptions};
use prwatch_core::{CalendarWatcher, PullRequestMatcher};
use serde::Serialize;

use super::CommandResult;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CheckStatus {
    Pass,
    Fail,
    Skipped,
}

#[derive(Debug, Serialize)]
pub struct DoctorCheck {
    pub name: &'static str,
    pub status: CheckStatus,
    pub details: String,
}

#[derive(Debug, Serialize)]
pub struct DoctorReport {
    pub overall_status: CheckStatus,
    pub summary: String,
    pub checks: Vec<DoctorCheck>,
}

pub fn run(json_output: bool) -> CommandResult {
    let report = build_report(LoadOptions::default());
    let exit_code = if report.overall_status == CheckStatus::Fail { 1 } else { 0 };

    let output = if json_output {
        serde_json::to_string_pretty(&report).unwrap_or_else(|error| {
            serde_json::json!({
                "overall_status": "fail",
                "summary": "doctor serialization failed",
                "error": error.to_string(),
            })
            .to_string()
        })
    } else {
        render_human(&report)
    };

    CommandResult { exit_code, output }
}

/// Skipped checks do not fail the report; only `Fail` does.
pub fn build_report(options: LoadOptions) -> DoctorReport {
    let checks = match AppConfig::load(options) {
        Ok(config) => vec![
            DoctorCheck {
                name: "config_validation",
                status: CheckStatus::Pass,
                details: "configuration loaded and validated".to_owned(),
            },
            DoctorCheck {
                name: "slack_token_readiness",
                status: CheckStatus::Pass,
                details: "app and bot token prefixes validated".to_owned(),
            },
            check_integrations(&config),
            check_calendars(&config),
        ],
        Err(error) => {
            let mut checks = vec![DoctorCheck {
                name: "config_validation",
                status: CheckStatus::Fail,
                details: error.to_string(),
            }];
            for name in ["slack_token_readiness", "pull_request_integrations", "calendars"] {
                checks.push(DoctorCheck {
                    name,
                    status: CheckStatus::Skipped,
                    details: "skipped because configuration did not load".to_owned(),
                });
            }
            checks
        }
    };

    let failed = checks.iter().any(|check| check.status == CheckStatus::Fail);
    let (overall_status, summary) = if failed {
        (CheckStatus::Fail, "doctor: one or more readiness checks failed")
    } else {
        (CheckStatus::Pass, "doctor: all readiness checks passed")
    };

    DoctorReport { overall_status, summary: summary.to_owned(), checks }
}

fn check_integrations(config: &AppConfig) -> DoctorCheck {
    let name = "pull_request_integrations";
    let integrations = config.enabled_integrations();
    if integrations.is_empty() {
        return DoctorCheck {
            name,
            status: CheckStatus::Skipped,
            details: "no integrations configured; pull request links will be ignored".to_owned(),
        };
    }

    let bitbucket = config.bitbucket.is_enabled().then(|| config.bitbucket.effective_pattern());
    let github = config.github.is_enabled().then(|| Some(config.github.effective_pattern()));
    let gitlab = config.gitlab.is_enabled().then(|| config.gitlab.effective_pattern());
    let patterns = [
        ("bitbucket", bitbucket.flatten()),
        ("github", github.flatten()),
        ("gitlab", gitlab.flatten()),
    ];
    let mut described = Vec::new();
    for (integration, pattern) in patterns {
        let Some(pattern) = pattern else {
            continue;
        };
        if let Err(error) = PullRequestMatcher::new(&pattern) {
            return DoctorCheck {
                name,
                status: CheckStatus::Fail,
                details: format!("{integration}: {error}"),
            };
        }
        described.push(format!("{integration} (`{pattern}`)"));
    }

    DoctorCheck { name, status: CheckStatus::Pass, details: described.join(", ") }
}

fn check_calendars(config: &AppConfig) -> DoctorCheck {
    let name = "calendars";
    if config.calendars.is_empty() {
        return DoctorCheck {
            name,
            status: CheckStatus::Skipped,
            details: "no calendars configured".to_owned(),
        };
    }

    let mut problems = Vec::new();
    for calendar in &config.calendars {
        if let Err(error) = CalendarWatcher::new(calendar) {
            problems.push(error.to_string());
        }
        if !calendar.is_remote() && !Path::new(&calendar.path).exists() {
            problems.push(format!(
                "calendar `{}` file `{}` does not exist",
                calendar.name, calendar.path
            ));
        }
    }

    if problems.is_empty() {
        DoctorCheck {
            name,
            status: CheckStatus::Pass,
            details: format!("{} calendars configured", config.calendars.len()),
        }
    } else {
        DoctorCheck { name, status: CheckStatus::Fail, details: problems.join("; ") }
    }
}

fn render_human(report: &DoctorReport) -> String {
    let mut lines = vec![report.summary.clone()];

    for check in &report.checks {
        let marker = match check.status {
            CheckStatus::Pass => "ok",
            CheckStatus::Fail => "fail",
            CheckStatus::Skipped => "skip",
        };
        lines.push(format!("- [{marker}] {}: {}", check.name, check.details));
    }

    lines.join("\n")
}
