//! Role-based capability checks for mutation entry points.
//!
//! This gate is advisory UX only. The backend re-validates every call; a
//! modified client can bypass anything decided here.

use std::fmt;

use crate::error::{ClientError, Result};
use crate::models::Role;

/// Operation a view controller can attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Action {
    /// List members.
    ViewMembers,
    /// Invite a new member.
    AddMember,
    /// Change a member's role.
    ChangeMemberRole,
    /// Remove a member.
    RemoveMember,
    /// List or open job postings.
    ViewJobs,
    /// Create a job posting.
    AddJob,
    /// Edit a job posting's content.
    EditJob,
    /// Change a job posting's status.
    ChangeJobStatus,
    /// Delete a job posting.
    DeleteJob,
}

impl Action {
    /// Every action.
    pub const ALL: [Self; 9] = [
        Self::ViewMembers,
        Self::AddMember,
        Self::ChangeMemberRole,
        Self::RemoveMember,
        Self::ViewJobs,
        Self::AddJob,
        Self::EditJob,
        Self::ChangeJobStatus,
        Self::DeleteJob,
    ];

    /// Whether the action changes server state.
    #[must_use]
    pub const fn is_mutation(self) -> bool {
        !matches!(self, Self::ViewMembers | Self::ViewJobs)
    }

    /// Whether the action manages members (as opposed to job postings).
    #[must_use]
    pub const fn is_member_management(self) -> bool {
        matches!(
            self,
            Self::AddMember | Self::ChangeMemberRole | Self::RemoveMember
        )
    }

    const fn describe(self) -> &'static str {
        match self {
            Self::ViewMembers => "view members",
            Self::AddMember => "add members",
            Self::ChangeMemberRole => "change member roles",
            Self::RemoveMember => "remove members",
            Self::ViewJobs => "view jobs",
            Self::AddJob => "add jobs",
            Self::EditJob => "edit jobs",
            Self::ChangeJobStatus => "change job status",
            Self::DeleteJob => "delete jobs",
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.describe())
    }
}

/// Result of a capability check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Permission {
    /// The action may proceed.
    Allowed,
    /// The action must be rejected before any network call.
    Denied {
        /// Role of the session.
        role: Role,
        /// Rejected action.
        action: Action,
    },
}

impl Permission {
    /// Whether the action may proceed.
    #[must_use]
    pub const fn is_allowed(self) -> bool {
        matches!(self, Self::Allowed)
    }

    /// Convert a denial into [`ClientError::PermissionDenied`].
    ///
    /// # Errors
    /// Returns [`ClientError::PermissionDenied`] when denied.
    pub fn require(self) -> Result<()> {
        match self {
            Self::Allowed => Ok(()),
            Self::Denied { role, action } => Err(ClientError::PermissionDenied { role, action }),
        }
    }
}

/// Decide whether `role` may perform `action`.
///
/// - admin: everything
/// - editor: viewing plus job posting mutations
/// - viewer: viewing only
#[must_use]
pub fn authorize(role: Role, action: Action) -> Permission {
    let allowed = match role {
        Role::Admin => true,
        Role::Editor => !action.is_member_management(),
        Role::Viewer => !action.is_mutation(),
    };
    if allowed {
        Permission::Allowed
    } else {
        Permission::Denied { role, action }
    }
}
