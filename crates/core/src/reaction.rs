//! Reaction decision table.
//!
//! Maps a fetched [`PullRequestState`] to the ordered reaction changes that
//! should be applied to the message linking the pull request. The plan is
//! computed from the state alone; the message's current reactions are not
//! consulted, so applying a plan twice is harmless as long as the chat service
//! treats duplicate adds and missing removes as no-ops.

use serde::{Deserialize, Serialize};

use crate::pull_request::PullRequestState;

/// Symbolic reactions the bot manages.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReactionKind {
    InReview,
    Approved,
    Declined,
    Merged,
}

impl ReactionKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::InReview => "in_review",
            Self::Approved => "approved",
            Self::Declined => "declined",
            Self::Merged => "merged",
        }
    }
}

/// Emoji names used for each [`ReactionKind`].
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReactionNames {
    pub in_review: String,
    pub approved: String,
    pub declined: String,
    pub merged: String,
}

impl Default for ReactionNames {
    fn default() -> Self {
        Self {
            in_review: "eyes".to_owned(),
            approved: "white_check_mark".to_owned(),
            declined: "x".to_owned(),
            merged: "twisted_rightwards_arrows".to_owned(),
        }
    }
}

impl ReactionNames {
    pub fn name(&self, kind: ReactionKind) -> &str {
        match kind {
            ReactionKind::InReview => &self.in_review,
            ReactionKind::Approved => &self.approved,
            ReactionKind::Declined => &self.declined,
            ReactionKind::Merged => &self.merged,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
#[serde(tag = "op", content = "reaction", rename_all = "snake_case")]
pub enum ReactionChange {
    Remove(ReactionKind),
    Add(ReactionKind),
}

impl ReactionChange {
    pub fn kind(&self) -> ReactionKind {
        match self {
            Self::Remove(kind) | Self::Add(kind) => *kind,
        }
    }
}

/// Returns the changes for `state`, removals first. Only the first matching
/// rule applies: merged, declined, approved, in review.
pub fn plan_reactions(state: &PullRequestState) -> Vec<ReactionChange> {
    use ReactionChange::{Add, Remove};
    use ReactionKind::{Approved, Declined, InReview, Merged};

    if state.merged {
        vec![Remove(InReview), Add(Approved), Add(Merged)]
    } else if state.declined {
        vec![Remove(InReview), Remove(Approved), Add(Declined)]
    } else if !state.approvers.is_empty() {
        vec![Remove(InReview), Remove(Declined), Add(Approved)]
    } else if state.in_review {
        vec![Add(InReview)]
    } else {
        Vec::new()
    }
}
