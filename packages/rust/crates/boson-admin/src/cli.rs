use std::path::PathBuf;

use boson_admin_client::{JobStatus, Role};
use clap::{Args, Parser, Subcommand};

#[derive(Parser)]
#[command(name = "boson-admin")]
#[command(about = "Boson admin console: manage members and job postings from the terminal.")]
pub(crate) struct Cli {
    /// Override config directory (settings and default session file live under it).
    #[arg(long, global = true)]
    pub(crate) conf: Option<PathBuf>,

    /// Skip confirmation prompts for role, status and delete mutations.
    #[arg(long, short = 'y', global = true)]
    pub(crate) yes: bool,

    /// Debug-level tracing on stderr (RUST_LOG still wins when set).
    #[arg(long, short = 'v', global = true)]
    pub(crate) verbose: bool,

    #[command(subcommand)]
    pub(crate) command: Command,
}

#[derive(Subcommand)]
pub(crate) enum Command {
    /// Log in and store the session tokens.
    Login {
        /// Account email.
        #[arg(long)]
        email: String,

        /// Password (or BOSON_ADMIN_PASSWORD env; read from stdin when neither is set).
        #[arg(long)]
        password: Option<String>,
    },
    /// Drop the stored session.
    Logout,
    /// Show the signed-in user and role.
    Whoami,
    /// Member management.
    #[command(subcommand)]
    Members(MembersCommand),
    /// Job posting management.
    #[command(subcommand)]
    Jobs(JobsCommand),
}

#[derive(Subcommand)]
pub(crate) enum MembersCommand {
    /// List members.
    List,
    /// Invite a new member.
    Add {
        /// Display name.
        #[arg(long)]
        username: String,

        /// Login email; receives the invite.
        #[arg(long)]
        email: String,

        /// Initial role (admin, editor, viewer).
        #[arg(long, default_value = "editor")]
        role: String,

        /// Initial password.
        #[arg(long)]
        password: String,
    },
    /// Change a member's role.
    Role {
        /// Member id.
        id: u64,

        /// New role.
        role: Role,
    },
    /// Remove a member.
    Remove {
        /// Member id.
        id: u64,
    },
}

#[derive(Subcommand)]
pub(crate) enum JobsCommand {
    /// List job postings.
    List,
    /// Show one posting in full.
    Show {
        /// Job id.
        id: u64,
    },
    /// Create a posting.
    Add {
        #[command(flatten)]
        fields: JobFields,

        /// Status to create with (private saves a draft, active publishes).
        #[arg(long, default_value = "private")]
        status: JobStatus,
    },
    /// Edit a posting; omitted fields keep their current value.
    Edit {
        /// Job id.
        id: u64,

        #[command(flatten)]
        fields: JobFields,
    },
    /// Change a posting's status.
    Status {
        /// Job id.
        id: u64,

        /// New status (private, active, closed).
        status: JobStatus,
    },
    /// Delete a posting.
    Delete {
        /// Job id.
        id: u64,
    },
}

#[derive(Args, Debug, Default)]
pub(crate) struct JobFields {
    /// Posting title.
    #[arg(long)]
    pub(crate) title: Option<String>,

    /// Category (Design, Development, Marketing, or a new one).
    #[arg(long)]
    pub(crate) category: Option<String>,

    /// Years of experience required.
    #[arg(long)]
    pub(crate) experience: Option<String>,

    /// Last day to apply (YYYY-MM-DD); empty clears it.
    #[arg(long)]
    pub(crate) last_date: Option<String>,

    /// Location.
    #[arg(long)]
    pub(crate) location: Option<String>,

    /// Working hours.
    #[arg(long)]
    pub(crate) timing: Option<String>,

    /// Description.
    #[arg(long)]
    pub(crate) about: Option<String>,

    /// Responsibility; repeat for several. Replaces the whole list when given.
    #[arg(long = "responsibility")]
    pub(crate) responsibilities: Vec<String>,
}

impl JobFields {
    /// Overwrite the form fields that were given on the command line.
    pub(crate) fn apply_to(self, form: &mut boson_admin_client::JobForm) {
        let Self {
            title,
            category,
            experience,
            last_date,
            location,
            timing,
            about,
            responsibilities,
        } = self;
        if let Some(title) = title {
            form.title = title;
        }
        if let Some(category) = category {
            form.category = category;
        }
        if let Some(experience) = experience {
            form.experience_required = experience;
        }
        if let Some(last_date) = last_date {
            form.last_date = last_date;
        }
        if let Some(location) = location {
            form.location = location;
        }
        if let Some(timing) = timing {
            form.timing = timing;
        }
        if let Some(about) = about {
            form.about = about;
        }
        if !responsibilities.is_empty() {
            form.responsibilities = responsibilities;
        }
    }
}
