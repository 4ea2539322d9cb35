//! Form state and validation for member invites and job postings.
//!
//! A form that fails validation is never submitted.

use chrono::NaiveDate;
use thiserror::Error;

use crate::models::{Job, JobDraft, JobStatus, NewMember, Role};

/// A required field is missing or malformed.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{field}: {message}")]
pub struct ValidationError {
    /// Form field name.
    pub field: &'static str,
    /// Inline message for the operator.
    pub message: String,
}

impl ValidationError {
    fn new(field: &'static str, message: impl Into<String>) -> Self {
        Self {
            field,
            message: message.into(),
        }
    }
}

fn required(field: &'static str, value: &str) -> Result<String, ValidationError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(ValidationError::new(field, "is required"));
    }
    Ok(trimmed.to_string())
}

fn is_plausible_email(email: &str) -> bool {
    let Some((local, domain)) = email.split_once('@') else {
        return false;
    };
    !local.is_empty()
        && !domain.contains('@')
        && domain
            .split_once('.')
            .is_some_and(|(host, tld)| !host.is_empty() && !tld.is_empty())
        && !email.chars().any(char::is_whitespace)
}

/// Member invite form, as typed by the operator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MemberForm {
    /// Display name.
    pub username: String,
    /// Login email.
    pub email: String,
    /// Role name, any case (`Editor`, `admin`, ...).
    pub role: String,
    /// Initial password.
    pub password: String,
}

impl Default for MemberForm {
    fn default() -> Self {
        Self {
            username: String::new(),
            email: String::new(),
            role: Role::Editor.to_string(),
            password: String::new(),
        }
    }
}

impl MemberForm {
    /// Check every field and build the request body.
    ///
    /// # Errors
    /// Returns the first [`ValidationError`] found.
    pub fn validate(&self) -> Result<NewMember, ValidationError> {
        let username = required("username", &self.username)?;
        let email = required("email", &self.email)?;
        if !is_plausible_email(&email) {
            return Err(ValidationError::new("email", "is not a valid email address"));
        }
        let role = self
            .role
            .parse::<Role>()
            .map_err(|message| ValidationError::new("role", message))?;
        if self.password.is_empty() {
            return Err(ValidationError::new("password", "is required"));
        }
        Ok(NewMember {
            username,
            email,
            role,
            password: self.password.clone(),
        })
    }
}

/// Job posting form, holding raw field text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobForm {
    /// Posting title.
    pub title: String,
    /// Category name.
    pub category: String,
    /// Years of experience, as typed.
    pub experience_required: String,
    /// Last day to apply (`YYYY-MM-DD`), or empty.
    pub last_date: String,
    /// Location.
    pub location: String,
    /// Working hours.
    pub timing: String,
    /// Description.
    pub about: String,
    /// Responsibilities, one per input row.
    pub responsibilities: Vec<String>,
    /// Status to submit with unless overridden.
    pub status: JobStatus,
}

impl Default for JobForm {
    fn default() -> Self {
        Self {
            title: String::new(),
            category: String::new(),
            experience_required: String::new(),
            last_date: String::new(),
            location: String::new(),
            timing: String::new(),
            about: String::new(),
            responsibilities: vec![String::new()],
            status: JobStatus::Private,
        }
    }
}

impl JobForm {
    /// Form pre-filled from an existing posting (edit flow).
    #[must_use]
    pub fn from_job(job: &Job) -> Self {
        let draft = &job.draft;
        let mut responsibilities = draft.responsibilities.clone();
        if responsibilities.is_empty() {
            responsibilities.push(String::new());
        }
        Self {
            title: draft.title.clone(),
            category: draft.category.clone(),
            experience_required: draft.experience_required.to_string(),
            last_date: draft
                .last_date
                .map(|date| date.format("%Y-%m-%d").to_string())
                .unwrap_or_default(),
            location: draft.location.clone(),
            timing: draft.timing.clone(),
            about: draft.about.clone(),
            responsibilities,
            status: draft.status,
        }
    }

    /// Append an empty responsibility row.
    pub fn add_responsibility(&mut self) {
        self.responsibilities.push(String::new());
    }

    /// Validate with the form's own status.
    ///
    /// # Errors
    /// Returns the first [`ValidationError`] found.
    pub fn validate(&self) -> Result<JobDraft, ValidationError> {
        self.validate_as(self.status)
    }

    /// Validate and build a draft carrying `status` ("save as draft" vs "publish").
    ///
    /// # Errors
    /// Returns the first [`ValidationError`] found.
    pub fn validate_as(&self, status: JobStatus) -> Result<JobDraft, ValidationError> {
        let title = required("title", &self.title)?;
        let category = required("category", &self.category)?;
        let experience = required("experience_required", &self.experience_required)?;
        let experience_required = experience.parse::<u32>().map_err(|_| {
            ValidationError::new("experience_required", "must be a whole number of years")
        })?;
        let last_date = match self.last_date.trim() {
            "" => None,
            raw => Some(NaiveDate::parse_from_str(raw, "%Y-%m-%d").map_err(|_| {
                ValidationError::new("last_date", "must be a date formatted YYYY-MM-DD")
            })?),
        };
        let location = required("location", &self.location)?;
        let timing = required("timing", &self.timing)?;
        let about = required("about", &self.about)?;
        let responsibilities: Vec<String> = self
            .responsibilities
            .iter()
            .map(|entry| entry.trim())
            .filter(|entry| !entry.is_empty())
            .map(str::to_string)
            .collect();
        if responsibilities.is_empty() {
            return Err(ValidationError::new(
                "responsibilities",
                "at least one responsibility is required",
            ));
        }
        Ok(JobDraft {
            title,
            category,
            experience_required,
            last_date,
            status,
            location,
            timing,
            about,
            responsibilities,
        })
    }
}

/// Job categories offered by the posting form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CategoryCatalog {
    categories: Vec<String>,
}

impl Default for CategoryCatalog {
    fn default() -> Self {
        Self {
            categories: ["Design", "Development", "Marketing"]
                .into_iter()
                .map(str::to_string)
                .collect(),
        }
    }
}

impl CategoryCatalog {
    /// Categories in insertion order.
    #[must_use]
    pub fn categories(&self) -> &[String] {
        &self.categories
    }

    /// Whether `name` is known (case-insensitive).
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        let name = name.trim();
        self.categories
            .iter()
            .any(|existing| existing.eq_ignore_ascii_case(name))
    }

    /// Add a category and return its canonical spelling.
    ///
    /// An existing category (any case) is returned unchanged.
    ///
    /// # Errors
    /// Returns a [`ValidationError`] for a blank name.
    pub fn add(&mut self, name: &str) -> Result<String, ValidationError> {
        let name = required("category", name)?;
        if let Some(existing) = self
            .categories
            .iter()
            .find(|existing| existing.eq_ignore_ascii_case(&name))
        {
            return Ok(existing.clone());
        }
        self.categories.push(name.clone());
        Ok(name)
    }
}
