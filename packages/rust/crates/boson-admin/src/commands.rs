//! Command dispatch: each subcommand drives one view controller operation.

use std::io::{self, BufRead, Write};
use std::sync::Arc;

use anyhow::{Context, Result, bail};
use boson_admin::{ConsoleEvent, RuntimeSettings};
use boson_admin::render::{job_detail, job_table, member_table};
use boson_admin_client::{
    AdminApi, FileTokenStore, JobForm, JobsController, MemberForm, MembersController, Mutation,
    PendingConfirmation, SessionSignal,
};

use crate::cli::{Command, JobsCommand, MembersCommand};

const PASSWORD_ENV: &str = "BOSON_ADMIN_PASSWORD";

pub(crate) struct Console {
    api: AdminApi,
    assume_yes: bool,
}

impl Console {
    pub(crate) fn open(settings: &RuntimeSettings, assume_yes: bool) -> Result<Self> {
        let store = FileTokenStore::new(settings.token_path());
        let config = settings.client_config();
        tracing::debug!(
            event = ConsoleEvent::Configured.as_str(),
            base_url = %config.normalized_base_url(),
            token_path = %store.path().display(),
            "console configured"
        );
        Ok(Self {
            api: AdminApi::connect(config, Arc::new(store))
                .context("failed to build the HTTP client")?,
            assume_yes,
        })
    }

    pub(crate) async fn run(&self, command: Command) -> Result<()> {
        let mut signals = self.api.client.subscribe();
        let result = self.dispatch(command).await;
        while let Ok(signal) = signals.try_recv() {
            if signal == SessionSignal::Expired {
                eprintln!("session expired; run `boson-admin login` again");
            }
        }
        result
    }

    async fn dispatch(&self, command: Command) -> Result<()> {
        match command {
            Command::Login { email, password } => {
                let password = match password.or_else(|| std::env::var(PASSWORD_ENV).ok()) {
                    Some(password) => password,
                    None => read_line("password: ")?,
                };
                self.api
                    .auth
                    .login(&email, &password)
                    .await
                    .context("login failed")?;
                let user = self.api.user.current_user().await?;
                println!("logged in as {} ({})", user.username, user.role);
            }
            Command::Logout => {
                self.api.auth.logout()?;
                println!("logged out");
            }
            Command::Whoami => {
                let user = self
                    .api
                    .user
                    .current_user()
                    .await
                    .context("failed to fetch current user")?;
                println!("{} ({})", user.username, user.role);
            }
            Command::Members(command) => self.members(command).await?,
            Command::Jobs(command) => self.jobs(command).await?,
        }
        Ok(())
    }

    async fn members(&self, command: MembersCommand) -> Result<()> {
        let controller = MembersController::load(&self.api)
            .await
            .context("failed to load members")?;
        match command {
            MembersCommand::List => print!("{}", member_table(&controller.items())),
            MembersCommand::Add {
                username,
                email,
                role,
                password,
            } => {
                let form = MemberForm {
                    username,
                    email,
                    role,
                    password,
                };
                let member = controller.add_member(&form).await?;
                println!(
                    "invited {} <{}> as {} (id {})",
                    member.username, member.email, member.role, member.id
                );
            }
            MembersCommand::Role { id, role } => {
                let pending = controller.request_role_change(id, role)?;
                if self.confirmed(&pending)? {
                    controller.confirm().await?;
                    println!("{} is now {role}", pending.target_name);
                } else {
                    controller.cancel()?;
                    println!("cancelled");
                }
            }
            MembersCommand::Remove { id } => {
                let pending = controller.request_remove(id)?;
                if self.confirmed(&pending)? {
                    controller.confirm().await?;
                    println!("removed {}", pending.target_name);
                } else {
                    controller.cancel()?;
                    println!("cancelled");
                }
            }
        }
        Ok(())
    }

    async fn jobs(&self, command: JobsCommand) -> Result<()> {
        if let JobsCommand::Show { id } = command {
            let job = self
                .api
                .jobs
                .get(id)
                .await
                .with_context(|| format!("failed to load job {id}"))?;
            print!("{}", job_detail(&job));
            return Ok(());
        }

        let controller = JobsController::load(&self.api)
            .await
            .context("failed to load job postings")?;
        match command {
            JobsCommand::List => print!("{}", job_table(&controller.items())),
            JobsCommand::Show { .. } => {}
            JobsCommand::Add { fields, status } => {
                let mut form = JobForm::default();
                fields.apply_to(&mut form);
                if !form.category.trim().is_empty() {
                    let mut catalog = controller.categories();
                    if !catalog.contains(&form.category) {
                        println!("adding new category '{}'", form.category.trim());
                    }
                    form.category = catalog.add(&form.category)?;
                }
                let job = controller.add_job(&form, status).await?;
                println!("created job {} '{}' ({})", job.id, job.draft.title, job.draft.status);
            }
            JobsCommand::Edit { id, fields } => {
                let mut form = controller.load_for_edit(id).await?;
                fields.apply_to(&mut form);
                let job = controller.save_edit(id, &form).await?;
                println!("updated job {} '{}'", job.id, job.draft.title);
            }
            JobsCommand::Status { id, status } => {
                let pending = controller.request_status_change(id, status)?;
                if self.confirmed(&pending)? {
                    controller.confirm().await?;
                    println!("{} is now {status}", pending.target_name);
                } else {
                    controller.cancel()?;
                    println!("cancelled");
                }
            }
            JobsCommand::Delete { id } => {
                let pending = controller.request_delete(id)?;
                if self.confirmed(&pending)? {
                    controller.confirm().await?;
                    println!("deleted {}", pending.target_name);
                } else {
                    controller.cancel()?;
                    println!("cancelled");
                }
            }
        }
        Ok(())
    }

    fn confirmed<M: Mutation>(&self, pending: &PendingConfirmation<M>) -> Result<bool> {
        if self.assume_yes {
            return Ok(true);
        }
        eprintln!("{}", pending.title());
        let answer = read_line(&format!("{} [y/N] ", pending.prompt()))?;
        Ok(is_yes(&answer))
    }
}

fn is_yes(answer: &str) -> bool {
    matches!(answer.trim().to_ascii_lowercase().as_str(), "y" | "yes")
}

fn read_line(prompt: &str) -> Result<String> {
    eprint!("{prompt}");
    io::stderr().flush()?;
    let mut line = String::new();
    if io::stdin().lock().read_line(&mut line)? == 0 {
        bail!("stdin closed while waiting for input");
    }
    Ok(line.trim_end_matches(['\r', '\n']).to_string())
}
