//! Command templates
//!
//! Task commands arrive as templates such as
//! `python train.py --ps={ps_hosts} --workers={worker_hosts} --role={job_name}:{task_index}`.
//! Only a fixed set of placeholders exists; anything else is rejected rather
//! than left in the command. `{{` and `}}` produce literal braces.

use meshboot_core::domain::cluster::{ClusterDef, PS_ROLE, TopologyError, WORKER_ROLE};
use thiserror::Error;

/// Errors raised while expanding a command template
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TemplateError {
    #[error("unknown placeholder '{{{name}}}' at byte {position}")]
    UnknownPlaceholder { name: String, position: usize },

    #[error("empty placeholder at byte {position}")]
    EmptyPlaceholder { position: usize },

    #[error("unterminated placeholder starting at byte {position}")]
    Unterminated { position: usize },

    #[error("unmatched '}}' at byte {position}")]
    StrayBrace { position: usize },
}

/// Values available to command templates
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TemplateVars {
    pub ps_hosts: String,
    pub worker_hosts: String,
    pub job_name: String,
    pub task_index: usize,
}

impl TemplateVars {
    /// Derives template values from the topology
    ///
    /// Host lists always come from the `ps` and `worker` roles, whatever this
    /// task's own role is. Both roles must exist.
    pub fn from_cluster(
        cluster: &ClusterDef,
        job_name: &str,
        task_index: usize,
    ) -> Result<Self, TopologyError> {
        Ok(Self {
            ps_hosts: cluster.joined_hosts(PS_ROLE)?,
            worker_hosts: cluster.joined_hosts(WORKER_ROLE)?,
            job_name: job_name.to_string(),
            task_index,
        })
    }

    fn lookup(&self, name: &str) -> Option<String> {
        match name {
            "ps_hosts" => Some(self.ps_hosts.clone()),
            "worker_hosts" => Some(self.worker_hosts.clone()),
            "job_name" => Some(self.job_name.clone()),
            "task_index" => Some(self.task_index.to_string()),
            _ => None,
        }
    }
}

/// Expands every placeholder of `template`
pub fn render(template: &str, vars: &TemplateVars) -> Result<String, TemplateError> {
    let mut out = String::with_capacity(template.len());
    let mut chars = template.char_indices().peekable();

    while let Some((position, c)) = chars.next() {
        match c {
            '{' => {
                if chars.next_if(|&(_, next)| next == '{').is_some() {
                    out.push('{');
                    continue;
                }

                let mut name = String::new();
                loop {
                    match chars.next() {
                        Some((_, '}')) => break,
                        Some((_, ch)) => name.push(ch),
                        None => return Err(TemplateError::Unterminated { position }),
                    }
                }

                if name.is_empty() {
                    return Err(TemplateError::EmptyPlaceholder { position });
                }

                let value = vars
                    .lookup(&name)
                    .ok_or(TemplateError::UnknownPlaceholder { name, position })?;
                out.push_str(&value);
            }
            '}' => {
                if chars.next_if(|&(_, next)| next == '}').is_none() {
                    return Err(TemplateError::StrayBrace { position });
                }
                out.push('}');
            }
            other => out.push(other),
        }
    }

    Ok(out)
}
