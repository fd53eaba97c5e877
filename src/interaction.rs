//! User-facing surface the dashboard talks through: confirmation prompts,
//! the report file picker and notices (alerts).

use std::collections::VecDeque;
use std::path::PathBuf;

use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum NoticeLevel {
    Info,
    Error,
}

/// A message shown to the user after an action.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Notice {
    pub level: NoticeLevel,
    pub message: String,
}

impl Notice {
    pub fn info(message: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Info,
            message: message.into(),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Error,
            message: message.into(),
        }
    }

    pub fn is_error(&self) -> bool {
        self.level == NoticeLevel::Error
    }
}

pub trait Interaction {
    /// Blocking yes/no question. `false` aborts the action.
    fn confirm(&mut self, prompt: &str) -> bool;

    /// Let the user choose one report file. `None` when they cancel.
    fn pick_report_file(&mut self, accepted_extensions: &[&str]) -> Option<PathBuf>;

    fn notify(&mut self, notice: Notice);
}

/// Pre-scripted answers plus a log of everything asked and shown.
///
/// Unscripted confirmations answer `true`; unscripted file picks cancel.
#[derive(Debug, Default)]
pub struct ScriptedInteraction {
    confirmations: VecDeque<bool>,
    files: VecDeque<Option<PathBuf>>,
    prompts: Vec<String>,
    notices: Vec<Notice>,
}

impl ScriptedInteraction {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn answer_confirm(mut self, answer: bool) -> Self {
        self.confirmations.push_back(answer);
        self
    }

    pub fn choose_file(mut self, file: Option<PathBuf>) -> Self {
        self.files.push_back(file);
        self
    }

    pub fn prompts(&self) -> &[String] {
        &self.prompts
    }

    pub fn notices(&self) -> &[Notice] {
        &self.notices
    }

    pub fn last_notice(&self) -> Option<&Notice> {
        self.notices.last()
    }
}

impl Interaction for ScriptedInteraction {
    fn confirm(&mut self, prompt: &str) -> bool {
        self.prompts.push(prompt.to_string());
        self.confirmations.pop_front().unwrap_or(true)
    }

    fn pick_report_file(&mut self, _accepted_extensions: &[&str]) -> Option<PathBuf> {
        self.files.pop_front().flatten()
    }

    fn notify(&mut self, notice: Notice) {
        self.notices.push(notice);
    }
}
