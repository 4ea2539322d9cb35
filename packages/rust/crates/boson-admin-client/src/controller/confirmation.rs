//! Mutations that wait for explicit operator confirmation.

use std::fmt;

use crate::access::Action;
use crate::models::{JobStatus, Role};

/// A destructive or privileged member mutation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MemberMutation {
    /// Move a member from one role to another.
    ChangeRole {
        /// Role shown in the list when the change was requested.
        from: Role,
        /// Requested role.
        to: Role,
    },
    /// Remove the member.
    Remove,
}

/// A job posting mutation that needs confirmation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobMutation {
    /// Move a posting from one status to another.
    ChangeStatus {
        /// Status shown in the list when the change was requested.
        from: JobStatus,
        /// Requested status.
        to: JobStatus,
    },
    /// Delete the posting.
    Delete,
}

/// Shared surface of confirmable mutations.
pub trait Mutation: Copy + fmt::Debug + Send + Sync + 'static {
    /// Capability the mutation requires.
    fn action(&self) -> Action;

    /// Short heading for the confirmation dialog.
    fn title(&self) -> &'static str;

    /// Question put to the operator about `name`.
    fn prompt(&self, name: &str) -> String;
}

impl Mutation for MemberMutation {
    fn action(&self) -> Action {
        match self {
            Self::ChangeRole { .. } => Action::ChangeMemberRole,
            Self::Remove => Action::RemoveMember,
        }
    }

    fn title(&self) -> &'static str {
        match self {
            Self::ChangeRole { .. } => "Changing roles",
            Self::Remove => "Removing member",
        }
    }

    fn prompt(&self, name: &str) -> String {
        match self {
            Self::ChangeRole { from, to } => {
                format!("Are you sure you want to change role of {name} from {from} to {to}?")
            }
            Self::Remove => format!("Are you sure you want to remove {name}?"),
        }
    }
}

impl Mutation for JobMutation {
    fn action(&self) -> Action {
        match self {
            Self::ChangeStatus { .. } => Action::ChangeJobStatus,
            Self::Delete => Action::DeleteJob,
        }
    }

    fn title(&self) -> &'static str {
        match self {
            Self::ChangeStatus { .. } => "Changing status",
            Self::Delete => "Deleting job",
        }
    }

    fn prompt(&self, name: &str) -> String {
        match self {
            Self::ChangeStatus { from, to } => {
                format!("Are you sure you want to change status of {name} from {from} to {to}?")
            }
            Self::Delete => format!("Are you sure you want to delete {name}?"),
        }
    }
}

/// A mutation staged for one item, waiting for confirm or cancel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingConfirmation<M> {
    /// Target item id.
    pub target_id: u64,
    /// Display name of the target (username or job title).
    pub target_name: String,
    /// What will be sent on confirm.
    pub mutation: M,
}

impl<M: Mutation> PendingConfirmation<M> {
    /// Dialog heading.
    #[must_use]
    pub fn title(&self) -> &'static str {
        self.mutation.title()
    }

    /// Dialog question, e.g. `Are you sure you want to change role of alice from editor to admin?`.
    #[must_use]
    pub fn prompt(&self) -> String {
        self.mutation.prompt(&self.target_name)
    }
}

/// Where an item sits in the mutation workflow.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ItemPhase {
    /// Nothing staged or running.
    Viewing,
    /// A mutation is staged and waiting for the operator.
    PendingConfirmation,
    /// A confirmed mutation is running; further mutations are refused.
    InFlight,
}
