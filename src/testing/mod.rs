//! # Step outcomes & run report
//!
//! Each step of a run records what it expected and what it got. The report
//! collects those outcomes, the status lines shown to the user, and the books
//! the run issued, and turns them into a process exit code.

use std::fmt::{self, Display};

use serde::Serialize;
use tracing::debug;

use crate::library::IssuedBook;

pub const EXIT_OK: u8 = 0;
pub const EXIT_STEP_FAILED: u8 = 1;
pub const EXIT_LOGIN_FAILED: u8 = 2;
pub const EXIT_FAULT: u8 = 3;

/// The six steps of a run, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Step {
    Register,
    Login,
    ListBooks,
    IssueBook,
    UserIssued,
    ReturnBook,
}

impl Display for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Step::Register => "register",
            Step::Login => "login",
            Step::ListBooks => "list books",
            Step::IssueBook => "issue book",
            Step::UserIssued => "user issued books",
            Step::ReturnBook => "return book",
        };
        write!(f, "{label}")
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    Passed,
    /// Failed, but the run tolerates it (registering an existing account).
    Warned,
    Failed,
    /// Nothing to do given earlier results.
    Skipped,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StepOutcome {
    pub step: Step,
    pub status: Status,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subject: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub http_status: Option<u16>,
    pub message: String,
}

impl StepOutcome {
    pub fn new(step: Step, status: Status, message: impl Into<String>) -> Self {
        Self {
            step,
            status,
            subject: None,
            http_status: None,
            message: message.into(),
        }
    }

    pub fn with_subject(mut self, subject: impl Into<String>) -> Self {
        self.subject = Some(subject.into());
        self
    }

    pub fn with_http_status(mut self, status: u16) -> Self {
        self.http_status = Some(status);
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Marker {
    Success,
    Warning,
    Failure,
    Info,
    /// A listing row under the previous line.
    Item,
}

impl Marker {
    pub fn symbol(&self) -> &'static str {
        match self {
            Marker::Success => "✅",
            Marker::Warning => "⚠️",
            Marker::Failure => "❌",
            Marker::Info => "ℹ️",
            Marker::Item => "-",
        }
    }
}

/// One human-readable line of run output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusLine {
    pub marker: Marker,
    pub text: String,
}

impl Display for StatusLine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.marker.symbol(), self.text)
    }
}

#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RunReport {
    pub outcomes: Vec<StepOutcome>,
    #[serde(skip)]
    pub lines: Vec<StatusLine>,
    pub issued: Vec<IssuedBook>,
    pub returned: Vec<String>,
    /// Set when login failed and the remaining steps never ran.
    pub aborted: bool,
    pub duration_ms: u64,
}

impl RunReport {
    pub fn record(&mut self, outcome: StepOutcome) {
        debug!(
            step = %outcome.step,
            status = ?outcome.status,
            message = %outcome.message,
            "step finished"
        );
        self.outcomes.push(outcome);
    }

    pub fn count(&self, status: Status) -> usize {
        self.outcomes.iter().filter(|o| o.status == status).count()
    }

    pub fn outcomes_for(&self, step: Step) -> impl Iterator<Item = &StepOutcome> {
        self.outcomes.iter().filter(move |o| o.step == step)
    }

    pub fn has_failures(&self) -> bool {
        self.count(Status::Failed) > 0
    }

    pub fn exit_code(&self) -> u8 {
        if self.aborted {
            EXIT_LOGIN_FAILED
        } else if self.has_failures() {
            EXIT_STEP_FAILED
        } else {
            EXIT_OK
        }
    }

    pub fn summary(&self) -> String {
        format!(
            "{} passed, {} warned, {} failed, {} skipped in {} ms",
            self.count(Status::Passed),
            self.count(Status::Warned),
            self.count(Status::Failed),
            self.count(Status::Skipped),
            self.duration_ms
        )
    }
}
