//! Wire types for the admin REST backend.
//!
//! Each endpoint has one explicit shape. A body that does not match it is a
//! decode error, never an empty default.

use std::fmt;
use std::str::FromStr;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Member primary key.
pub type MemberId = u64;

/// Job primary key.
pub type JobId = u64;

/// `{ "data": T }` envelope used by list, login and current-user endpoints.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DataEnvelope<T> {
    /// Wrapped payload.
    pub data: T,
}

/// Authorization level of a member.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// Full access, including member management.
    Admin,
    /// May manage job postings.
    Editor,
    /// Read-only.
    Viewer,
}

impl Role {
    /// All roles in display order.
    pub const ALL: [Self; 3] = [Self::Admin, Self::Editor, Self::Viewer];

    /// Lowercase wire value, also used in `change-role` paths.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Admin => "admin",
            Self::Editor => "editor",
            Self::Viewer => "viewer",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = String;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        let normalized = raw.trim().to_ascii_lowercase();
        Self::ALL
            .into_iter()
            .find(|role| role.as_str() == normalized)
            .ok_or_else(|| format!("unknown role '{}'", raw.trim()))
    }
}

/// Visibility of a job posting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    /// Draft, not listed publicly.
    Private,
    /// Published and accepting applications.
    Active,
    /// No longer accepting applications.
    Closed,
}

impl JobStatus {
    /// All statuses in display order.
    pub const ALL: [Self; 3] = [Self::Private, Self::Active, Self::Closed];

    /// Lowercase wire value, also used in `status` paths.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Private => "private",
            Self::Active => "active",
            Self::Closed => "closed",
        }
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for JobStatus {
    type Err = String;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        let normalized = raw.trim().to_ascii_lowercase();
        Self::ALL
            .into_iter()
            .find(|status| status.as_str() == normalized)
            .ok_or_else(|| format!("unknown job status '{}'", raw.trim()))
    }
}

/// Internal user with a role.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Member {
    /// Primary key.
    pub id: MemberId,
    /// Display name.
    pub username: String,
    /// Login email.
    pub email: String,
    /// Authorization level.
    pub role: Role,
}

/// Body of `POST /members/create/` (email invite).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewMember {
    /// Display name.
    pub username: String,
    /// Login email; receives the invite.
    pub email: String,
    /// Initial role.
    pub role: Role,
    /// Initial password.
    pub password: String,
}

/// Job posting fields without the server-assigned id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobDraft {
    /// Posting title.
    pub title: String,
    /// Category, e.g. `Design`.
    pub category: String,
    /// Years of experience required.
    pub experience_required: u32,
    /// Last day to apply.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_date: Option<NaiveDate>,
    /// Visibility.
    pub status: JobStatus,
    /// Office or remote location.
    pub location: String,
    /// Working hours, e.g. `Full time`.
    pub timing: String,
    /// Free-text description.
    pub about: String,
    /// Ordered responsibilities.
    #[serde(default)]
    pub responsibilities: Vec<String>,
}

/// Career posting as stored by the backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Job {
    /// Primary key.
    pub id: JobId,
    /// All other fields.
    #[serde(flatten)]
    pub draft: JobDraft,
}

/// Body of `POST /users/login/`.
#[derive(Debug, Clone, Serialize)]
pub struct LoginRequest<'a> {
    /// Login email.
    pub email: &'a str,
    /// Password.
    pub password: &'a str,
}

/// Token pair carried by the login envelope.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub(crate) struct LoginTokens {
    pub(crate) access_token: String,
    pub(crate) refresh_token: String,
}

/// Signed-in user as reported by `GET /users/user/`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CurrentUser {
    /// Display name.
    pub username: String,
    /// Authorization level of the session.
    pub role: Role,
}

/// Anything held in a view controller's list state.
pub trait Identified {
    /// Primary key.
    fn id(&self) -> u64;

    /// Human label used in confirmation prompts.
    fn label(&self) -> &str;
}

impl Identified for Member {
    fn id(&self) -> u64 {
        self.id
    }

    fn label(&self) -> &str {
        &self.username
    }
}

impl Identified for Job {
    fn id(&self) -> u64 {
        self.id
    }

    fn label(&self) -> &str {
        &self.draft.title
    }
}
