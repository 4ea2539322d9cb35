//! Plain-text tables for the terminal.

use std::fmt::Write as _;

use boson_admin_client::{Job, Member};

fn table(headers: &[&str], rows: &[Vec<String>]) -> String {
    let mut widths: Vec<usize> = headers.iter().map(|header| header.len()).collect();
    for row in rows {
        for (width, cell) in widths.iter_mut().zip(row) {
            *width = (*width).max(cell.chars().count());
        }
    }
    let mut out = String::new();
    push_row(&mut out, headers.iter().copied(), &widths);
    for row in rows {
        push_row(&mut out, row.iter().map(String::as_str), &widths);
    }
    out
}

fn push_row<'a>(out: &mut String, cells: impl Iterator<Item = &'a str>, widths: &[usize]) {
    let line = cells
        .zip(widths)
        .map(|(cell, &width)| format!("{cell:<width$}"))
        .collect::<Vec<_>>()
        .join("  ");
    out.push_str(line.trim_end());
    out.push('\n');
}

/// Member list as an aligned table.
#[must_use]
pub fn member_table(members: &[Member]) -> String {
    if members.is_empty() {
        return "no members\n".to_string();
    }
    let rows: Vec<Vec<String>> = members
        .iter()
        .map(|member| {
            vec![
                member.id.to_string(),
                member.username.clone(),
                member.email.clone(),
                member.role.to_string(),
            ]
        })
        .collect();
    table(&["ID", "USERNAME", "EMAIL", "ROLE"], &rows)
}

/// Job posting list as an aligned table.
#[must_use]
pub fn job_table(jobs: &[Job]) -> String {
    if jobs.is_empty() {
        return "no job postings\n".to_string();
    }
    let rows: Vec<Vec<String>> = jobs
        .iter()
        .map(|job| {
            vec![
                job.id.to_string(),
                job.draft.title.clone(),
                job.draft.category.clone(),
                job.draft.status.to_string(),
                job.draft
                    .last_date
                    .map(|date| date.to_string())
                    .unwrap_or_else(|| "-".to_string()),
            ]
        })
        .collect();
    table(&["ID", "TITLE", "CATEGORY", "STATUS", "LAST DATE"], &rows)
}

/// Every field of one posting.
#[must_use]
pub fn job_detail(job: &Job) -> String {
    let draft = &job.draft;
    let mut out = String::new();
    let _ = writeln!(out, "#{} {}", job.id, draft.title);
    let _ = writeln!(out, "status:     {}", draft.status);
    let _ = writeln!(out, "category:   {}", draft.category);
    let _ = writeln!(out, "experience: {} years", draft.experience_required);
    if let Some(date) = draft.last_date {
        let _ = writeln!(out, "last date:  {date}");
    }
    let _ = writeln!(out, "location:   {}", draft.location);
    let _ = writeln!(out, "timing:     {}", draft.timing);
    let _ = writeln!(out, "\n{}", draft.about);
    if !draft.responsibilities.is_empty() {
        out.push_str("\nresponsibilities:\n");
        for item in &draft.responsibilities {
            let _ = writeln!(out, "  - {item}");
        }
    }
    out
}
