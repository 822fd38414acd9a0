//! Slack side of prwatch.
//!
//! - **Events** (`events`) - envelopes from Socket Mode and the command dispatcher
//! - **Socket Mode** (`socket`, `websocket`) - the runner and its websocket transport
//! - **Commands** (`commands`) - the `Command` trait and the `help` command
//! - **Pull requests** (`pull_request`) - link matching, fetching and reaction updates
//! - **Client** (`client`) - reactions and messages over the Slack Web API
//! - **Block Kit** (`blocks`) - message builders for replies and notices
//!
//! ```text
//! Socket Mode → CommandDispatcher → PullRequestCommand → PullRequestFetcher
//!                                          ↓
//!                              ReactionReconciler → ChatClient
//! ```

pub mod blocks;
pub mod client;
pub mod commands;
pub mod events;
pub mod pull_request;
pub mod reconcile;
pub mod socket;
pub mod websocket;

#[cfg(test)]
pub(crate) mod testing;
