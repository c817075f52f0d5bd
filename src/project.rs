use bytesize::ByteSize;
use console::style;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// A project as returned by the GitLab "simple" representation.
#[derive(Debug, Deserialize, Serialize, PartialEq, Clone)]
pub struct Project {
    pub id: u64,
    pub ssh_url_to_repo: String,
    pub http_url_to_repo: String,
    pub path_with_namespace: String,
}

/// Complete `path_with_namespace` -> project mapping for one run.
/// A `BTreeMap` so that clones happen in a stable order.
pub type ProjectCatalog = BTreeMap<String, Project>;

/// Terminal state of one catalog entry. Every entry gets exactly one.
#[derive(Debug, PartialEq)]
pub enum CloneOutcome {
    Cloned {
        received_bytes: usize,
        received_objects: usize,
    },
    Skipped,
    Failed {
        err: String,
    },
}

#[derive(Debug, Default, PartialEq)]
pub struct Summary {
    pub cloned: Vec<String>,
    pub skipped: Vec<String>,
    pub failed: Vec<String>,
    pub received_bytes: usize,
    pub received_objects: usize,
}

impl Summary {
    pub fn record(&mut self, project_path: String, outcome: CloneOutcome) {
        match outcome {
            CloneOutcome::Cloned {
                received_bytes,
                received_objects,
            } => {
                self.received_bytes += received_bytes;
                self.received_objects += received_objects;
                self.cloned.push(project_path);
            }
            CloneOutcome::Skipped => self.skipped.push(project_path),
            CloneOutcome::Failed { err } => {
                log::debug!("Recording failed project={} err={}", project_path, err);
                self.failed.push(project_path);
            }
        }
    }

    pub fn total(&self) -> usize {
        self.cloned.len() + self.skipped.len() + self.failed.len()
    }
}

impl fmt::Display for Summary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "Cloned {} projects ({} objects, {})",
            style(self.cloned.len()).green(),
            self.received_objects,
            ByteSize(self.received_bytes as u64)
        )?;
        writeln!(f, "Skipped {} projects", style(self.skipped.len()).yellow())?;
        write!(f, "Failed {} projects", style(self.failed.len()).red())?;
        for project_path in &self.failed {
            write!(f, "\n  {}", project_path)?;
        }
        Ok(())
    }
}
