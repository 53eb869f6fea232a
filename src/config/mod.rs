//! # Run configuration
//!
//! Where the service lives, which account the run uses, and the policy that
//! decides how many books get issued and which of them get returned.

use std::time::Duration;

use clap::ValueEnum;

use crate::auth::Credentials;
use crate::error::{Error, Result};
use crate::library::IssuedBook;

pub const DEFAULT_BASE_URL: &str = "http://127.0.0.1:5000/api";

/// The service refuses a member more than two active issues, so the run never asks for more.
pub const DEFAULT_MAX_ISSUES: usize = 2;

/// Which of the books issued during the run are handed back at the end.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum ReturnPolicy {
    /// Only the first book issued.
    #[default]
    First,
    /// Every book issued.
    All,
    /// Keep everything.
    Keep,
}

impl ReturnPolicy {
    pub fn select<'a>(&self, issued: &'a [IssuedBook]) -> &'a [IssuedBook] {
        match self {
            ReturnPolicy::First => &issued[..issued.len().min(1)],
            ReturnPolicy::All => issued,
            ReturnPolicy::Keep => &[],
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IssuePolicy {
    pub max_issues: usize,
    pub return_policy: ReturnPolicy,
}

impl Default for IssuePolicy {
    fn default() -> Self {
        Self {
            max_issues: DEFAULT_MAX_ISSUES,
            return_policy: ReturnPolicy::default(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct RunConfig {
    pub base_url: String,
    pub credentials: Credentials,
    pub policy: IssuePolicy,
    /// `None` leaves the HTTP client's default in place.
    pub timeout: Option<Duration>,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.into(),
            credentials: Credentials::default(),
            policy: IssuePolicy::default(),
            timeout: None,
        }
    }
}

impl RunConfig {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            ..Self::default()
        }
    }

    pub fn with_credentials(mut self, credentials: Credentials) -> Self {
        self.credentials = credentials;
        self
    }

    pub fn with_max_issues(mut self, max_issues: usize) -> Self {
        self.policy.max_issues = max_issues;
        self
    }

    pub fn with_return_policy(mut self, return_policy: ReturnPolicy) -> Self {
        self.policy.return_policy = return_policy;
        self
    }

    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.base_url.trim().is_empty() {
            return Err(Error::config("base URL cannot be empty"));
        }
        if self.credentials.email.trim().is_empty() {
            return Err(Error::config("email cannot be empty"));
        }
        if self.credentials.password.is_empty() {
            return Err(Error::config("password cannot be empty"));
        }
        if self.policy.max_issues == 0 {
            return Err(Error::config("max issues must be at least 1"));
        }
        if self.timeout.is_some_and(|t| t.is_zero()) {
            return Err(Error::config("timeout must be greater than zero"));
        }
        Ok(())
    }
}
