use serde::Serialize;
use refguard::{Summary, TransclusionReport};

use crate::error::ExitStatus;

pub mod check;
pub mod fix;
pub mod map;

#[derive(Debug, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum CommandResult {
    Fix {
        root: String,
        summary: Summary,
        logs: Option<String>,
    },
    Check {
        root: String,
        summary: Summary,
        pending: Vec<String>,
    },
    Map {
        root: String,
        report: TransclusionReport,
    },
}

impl CommandResult {
    pub fn exit_status(&self) -> ExitStatus {
        match self {
            CommandResult::Check { pending, .. } if !pending.is_empty() => ExitStatus::Data,
            _ => ExitStatus::Ok,
        }
    }
}
