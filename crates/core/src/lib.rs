//! Domain core for prwatch: configuration, pull-request model, the reaction
//! decision table and calendar triggers. Nothing in this crate talks to Slack
//! or to a review service directly.

pub mod calendar;
pub mod config;
pub mod help;
pub mod pull_request;
pub mod reaction;

pub use calendar::{CalendarConfig, CalendarEventConfig, CalendarWatcher, TriggeredCommand};
pub use help::HelpEntry;
pub use pull_request::{
    FetchError, MatcherError, PullRequestFetcher, PullRequestMatcher, PullRequestRef,
    PullRequestState,
};
pub use reaction::{plan_reactions, ReactionChange, ReactionKind, ReactionNames};
