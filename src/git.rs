use crate::cancel::CancelFlag;
use crate::project::{CloneOutcome, ProjectCatalog, Summary};
use anyhow::{bail, Context, Result};
use git2::build::CheckoutBuilder;
use git2::{Cred, RemoteCallbacks};
use serde::Deserialize;
use std::cell::RefCell;
use std::fs;
use std::path::Path;
use std::str::FromStr;
use thiserror::Error;

#[derive(Debug, PartialEq, Copy, Clone, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CloneMethod {
    Ssh,
    Https,
}

impl Default for CloneMethod {
    fn default() -> Self {
        CloneMethod::Https
    }
}

impl FromStr for CloneMethod {
    type Err = &'static str;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "https" => Ok(CloneMethod::Https),
            "ssh" => Ok(CloneMethod::Ssh),
            _ => Err("no match"),
        }
    }
}

/// Failure modes of a single clone attempt, classified at the call site:
/// `Git` marks the project failed and the run moves on, `Io` aborts the run.
#[derive(Debug, Error)]
pub enum CloneError {
    #[error(transparent)]
    Git(#[from] git2::Error),
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

#[derive(Debug, Default, PartialEq)]
pub struct CloneStats {
    pub received_bytes: usize,
    pub received_objects: usize,
}

fn clone_project(
    url: &str,
    path: &Path,
    clone_method: CloneMethod,
) -> Result<CloneStats, CloneError> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }

    let received_bytes = RefCell::new(0usize);
    let received_objects = RefCell::new(0usize);

    let mut builder = git2::build::RepoBuilder::new();
    let mut callbacks = RemoteCallbacks::new();
    callbacks.transfer_progress(|stats| {
        received_bytes.replace(stats.received_bytes());
        received_objects.replace(stats.received_objects());
        true
    });
    let mut co = CheckoutBuilder::new();
    co.progress(|path, cur, total| {
        log::debug!("{:?} {}/{}", path, cur, total);
    });
    builder.with_checkout(co);
    // Prepare fetch options.
    let mut fo = git2::FetchOptions::new();

    if clone_method == CloneMethod::Ssh {
        callbacks.credentials(|_url, username_from_url, _allowed_types| {
            let home = dirs::home_dir()
                .ok_or_else(|| git2::Error::from_str("Cannot find home directory"))?;
            Cred::ssh_key(
                username_from_url.unwrap_or("git"),
                None,
                &home.join(".ssh").join("id_rsa"),
                None,
            )
        });
    }
    fo.remote_callbacks(callbacks);
    builder.fetch_options(fo);

    builder.clone(url, path)?;

    Ok(CloneStats {
        received_bytes: received_bytes.take(),
        received_objects: received_objects.take(),
    })
}

/// Drains the catalog in key order, one clone at a time. A pre-existing
/// destination is skipped untouched, a git failure is recorded and the run
/// continues, anything else aborts with no summary.
pub fn clone_all(
    catalog: &ProjectCatalog,
    output: &Path,
    clone_method: CloneMethod,
    cancel: &CancelFlag,
) -> Result<Summary> {
    let mut summary = Summary::default();

    for (i, (project_path, project)) in catalog.iter().enumerate() {
        if cancel.is_cancelled() {
            bail!("Interrupted while cloning: done={}/{}", i, catalog.len());
        }
        log::info!(
            "Cloning: progress={}/{} project={}",
            i + 1,
            catalog.len(),
            project_path
        );

        let path = output.join(project_path);
        if path.exists() {
            log::warn!(
                "Destination exists, skipping: project={} fs_path={:?}",
                project_path,
                path
            );
            summary.record(project_path.clone(), CloneOutcome::Skipped);
            continue;
        }

        let url = match clone_method {
            CloneMethod::Ssh => &project.ssh_url_to_repo,
            CloneMethod::Https => &project.http_url_to_repo,
        };
        log::debug!("Cloning project={:?} url={} fs_path={:?}", project, url, path);

        match clone_project(url, &path, clone_method) {
            Ok(stats) => {
                log::info!("Cloned project={} fs_path={:?}", project_path, path);
                summary.record(
                    project_path.clone(),
                    CloneOutcome::Cloned {
                        received_bytes: stats.received_bytes,
                        received_objects: stats.received_objects,
                    },
                );
            }
            Err(CloneError::Git(e)) => {
                log::error!("Failed to clone: project={} err={}", project_path, e);
                summary.record(
                    project_path.clone(),
                    CloneOutcome::Failed { err: e.to_string() },
                );
            }
            Err(CloneError::Io(e)) => {
                return Err(e).with_context(|| {
                    format!("Unexpected error while cloning: project={}", project_path)
                });
            }
        }
    }

    log::debug!("Finished cloning");
    Ok(summary)
}
