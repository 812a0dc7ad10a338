// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Job-path routing gate
//!
//! The one path-sensitive rule of the protocol: events under
//! `app_data/job/<name>/` are visible only to the job's original submitter,
//! read from the job's `config.yaml`. Everything else broadcasts to every
//! approved peer. A general permission model replaces this seam later.

use serde::Deserialize;
use syftbox_core::DatasitePath;

/// Relative path of a job's config file within its datasite.
pub fn job_config_key(job: &str) -> String {
    format!("app_data/job/{job}/config.yaml")
}

#[derive(Debug, Deserialize)]
struct JobConfig {
    #[serde(default)]
    submitted_by: Option<String>,
}

/// True for paths under `app_data/job/<name>/`.
pub fn is_job_path(path: &DatasitePath) -> bool {
    job_name(path).is_some()
}

/// The `<name>` segment of a job path.
pub fn job_name(path: &DatasitePath) -> Option<&str> {
    let mut segments = path.segments();
    if segments.next() != Some("app_data") || segments.next() != Some("job") {
        return None;
    }
    segments.next().filter(|name| !name.is_empty())
}

/// `submitted_by` from a job config file, `None` when absent or unparseable.
pub fn submitter_from_config(config: &[u8]) -> Option<String> {
    match serde_yaml::from_slice::<JobConfig>(config) {
        Ok(parsed) => parsed.submitted_by,
        Err(err) => {
            tracing::warn!(error = %err, "unparseable job config");
            None
        }
    }
}

/// Which approved peers may receive an event for `path`.
///
/// Job paths route to the submitter alone; an undetermined submitter means
/// the event is not broadcast at all.
pub fn recipients_for(
    path: &DatasitePath,
    submitter: Option<&str>,
    approved: &[String],
) -> Vec<String> {
    if !is_job_path(path) {
        return approved.to_vec();
    }
    match submitter {
        Some(submitter) if approved.iter().any(|email| email == submitter) => {
            vec![submitter.to_string()]
        }
        _ => Vec::new(),
    }
}

#[cfg(test)]
#[path = "jobs_tests.rs"]
mod tests;
