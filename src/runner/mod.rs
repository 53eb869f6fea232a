//! # Smoke run
//!
//! The six steps run strictly in order, each feeding the next: login yields
//! the session, the book list yields issue candidates, and the issued books
//! drive the membership check and the return.

use std::time::Instant;

use chrono::Utc;
use tracing::{error, info, warn};

use crate::auth::{Credentials, Session};
use crate::config::{IssuePolicy, RunConfig};
use crate::error::{Error, Result};
use crate::http::ApiClient;
use crate::library::{BookSummary, IssuedBook, LibraryApi};
use crate::testing::{Marker, RunReport, Status, StatusLine, Step, StepOutcome};

pub struct Runner {
    api: LibraryApi,
    credentials: Credentials,
    policy: IssuePolicy,
    echo: bool,
}

impl Runner {
    pub fn new(api: LibraryApi, credentials: Credentials, policy: IssuePolicy) -> Self {
        Self {
            api,
            credentials,
            policy,
            echo: false,
        }
    }

    pub fn from_config(config: &RunConfig) -> Result<Self> {
        config.validate()?;
        let client = ApiClient::new(&config.base_url, config.timeout)?;
        Ok(Self::new(
            LibraryApi::new(client),
            config.credentials.clone(),
            config.policy,
        ))
    }

    /// Print each status line to stdout as it happens.
    pub fn echo(mut self, echo: bool) -> Self {
        self.echo = echo;
        self
    }

    /// Runs every step and returns the report.
    ///
    /// A failed login ends the run early with `aborted` set. Transport faults
    /// and undecodable success bodies are returned as errors.
    pub async fn run(&self) -> Result<RunReport> {
        let started = Instant::now();
        let mut report = RunReport::default();
        info!(base_url = %self.api.client().base_url(), "starting smoke run");

        self.register(&mut report).await?;

        let Some(session) = self.login(&mut report).await? else {
            report.aborted = true;
            report.duration_ms = started.elapsed().as_millis() as u64;
            return Ok(report);
        };

        let books = self.list_books(&session, &mut report).await?;
        let issued = self.issue_books(&session, &books, &mut report).await?;
        self.check_user_issued(&session, &issued, &mut report).await?;
        let returned = self.return_books(&session, &issued, &mut report).await?;

        report.issued = issued;
        report.returned = returned;
        report.duration_ms = started.elapsed().as_millis() as u64;
        info!(summary = %report.summary(), "smoke run finished");
        Ok(report)
    }

    async fn register(&self, report: &mut RunReport) -> Result<()> {
        match self.api.register(&self.credentials).await? {
            Ok(()) => {
                self.emit(report, Marker::Success, "Test user registered");
                report.record(
                    StepOutcome::new(Step::Register, Status::Passed, "registered")
                        .with_http_status(201),
                );
            }
            Err(rejection) => {
                let reason = rejection.describe();
                warn!(status = rejection.status, %reason, "registration refused, continuing");
                self.emit(
                    report,
                    Marker::Warning,
                    format!("Could not register user: {reason}"),
                );
                report.record(
                    StepOutcome::new(Step::Register, Status::Warned, reason)
                        .with_http_status(rejection.status),
                );
            }
        }
        Ok(())
    }

    async fn login(&self, report: &mut RunReport) -> Result<Option<Session>> {
        match self.api.login(&self.credentials).await {
            Ok(session) => {
                self.emit(report, Marker::Success, "Logged in as test user");
                report.record(
                    StepOutcome::new(Step::Login, Status::Passed, "token received")
                        .with_http_status(200),
                );
                Ok(Some(session))
            }
            Err(Error::LoginFailed { status, message }) => {
                let reason = message.unwrap_or_else(|| format!("status {status}"));
                error!(status, %reason, "login failed, aborting run");
                self.emit(report, Marker::Failure, "Login failed");
                report.record(
                    StepOutcome::new(Step::Login, Status::Failed, reason).with_http_status(status),
                );
                Ok(None)
            }
            Err(err) => Err(err),
        }
    }

    async fn list_books(
        &self,
        session: &Session,
        report: &mut RunReport,
    ) -> Result<Vec<BookSummary>> {
        match self.api.list_books(session).await? {
            Ok(books) => {
                self.emit(
                    report,
                    Marker::Success,
                    format!("Total books fetched: {}", books.len()),
                );
                for book in &books {
                    self.emit(
                        report,
                        Marker::Item,
                        format!(
                            "{} | Issued: {} | Available: {}",
                            book.title, book.issued_count, book.available_quantity
                        ),
                    );
                }
                let message = format!("{} books", books.len());
                report.record(
                    StepOutcome::new(Step::ListBooks, Status::Passed, message)
                        .with_http_status(200),
                );
                Ok(books)
            }
            Err(rejection) => {
                warn!(status = rejection.status, "book list unavailable, continuing with none");
                self.emit(report, Marker::Failure, "Failed to fetch books");
                report.record(
                    StepOutcome::new(Step::ListBooks, Status::Failed, rejection.describe())
                        .with_http_status(rejection.status),
                );
                Ok(Vec::new())
            }
        }
    }

    /// Tries available books in list order until `max_issues` have been issued.
    async fn issue_books(
        &self,
        session: &Session,
        books: &[BookSummary],
        report: &mut RunReport,
    ) -> Result<Vec<IssuedBook>> {
        let mut issued: Vec<IssuedBook> = Vec::new();

        for book in books.iter().filter(|b| b.is_available()) {
            if issued.len() >= self.policy.max_issues {
                break;
            }
            match self.api.issue_book(session, &book.id).await? {
                Ok(receipt) => {
                    let due_at = receipt.due_at();
                    let due = match due_at {
                        Some(due) => due.to_rfc3339(),
                        None => "unknown".to_string(),
                    };
                    self.emit(
                        report,
                        Marker::Success,
                        format!("Issued book: {} (due {due})", book.title),
                    );
                    let message = match receipt.message.as_deref() {
                        Some(message) => format!("{message}, due {due}"),
                        None => format!("due {due}"),
                    };
                    report.record(
                        StepOutcome::new(Step::IssueBook, Status::Passed, message)
                            .with_subject(&book.title)
                            .with_http_status(201),
                    );
                    issued.push(IssuedBook {
                        id: book.id.clone(),
                        title: book.title.clone(),
                        due_at,
                    });
                }
                Err(rejection) => {
                    warn!(
                        book = %book.title,
                        status = rejection.status,
                        "issue refused, trying next book"
                    );
                    self.emit(
                        report,
                        Marker::Failure,
                        format!("Could not issue book: {}", book.title),
                    );
                    report.record(
                        StepOutcome::new(Step::IssueBook, Status::Failed, rejection.describe())
                            .with_subject(&book.title)
                            .with_http_status(rejection.status),
                    );
                }
            }
        }

        if report.outcomes_for(Step::IssueBook).next().is_none() {
            self.emit(report, Marker::Info, "No available books to issue");
            report.record(StepOutcome::new(
                Step::IssueBook,
                Status::Skipped,
                "no available books",
            ));
        }

        Ok(issued)
    }

    /// Fetches the member's active issues and checks every book issued this run is among them.
    async fn check_user_issued(
        &self,
        session: &Session,
        issued: &[IssuedBook],
        report: &mut RunReport,
    ) -> Result<()> {
        let records = match self.api.user_issued_books(session).await? {
            Ok(records) => records,
            Err(rejection) => {
                warn!(status = rejection.status, "user issued list unavailable, continuing");
                self.emit(report, Marker::Failure, "Could not fetch user issued books");
                report.record(
                    StepOutcome::new(Step::UserIssued, Status::Failed, rejection.describe())
                        .with_http_status(rejection.status),
                );
                return Ok(());
            }
        };

        let now = Utc::now();
        let overdue = records.iter().filter(|r| r.overdue_at(now)).count();
        self.emit(
            report,
            Marker::Info,
            format!("Total issued books for user: {} ({overdue} overdue)", records.len()),
        );

        let missing: Vec<&str> = issued
            .iter()
            .filter(|book| !records.iter().any(|r| r.book_id() == Some(book.id.as_str())))
            .map(|book| book.title.as_str())
            .collect();

        if missing.is_empty() {
            let message = format!("{} active issues", records.len());
            report.record(
                StepOutcome::new(Step::UserIssued, Status::Passed, message).with_http_status(200),
            );
        } else {
            let titles = missing.join(", ");
            warn!(missing = %titles, "issued books absent from user list");
            self.emit(
                report,
                Marker::Failure,
                format!("Issued books not listed for user: {titles}"),
            );
            report.record(
                StepOutcome::new(
                    Step::UserIssued,
                    Status::Failed,
                    format!("missing from user list: {titles}"),
                )
                .with_http_status(200),
            );
        }
        Ok(())
    }

    async fn return_books(
        &self,
        session: &Session,
        issued: &[IssuedBook],
        report: &mut RunReport,
    ) -> Result<Vec<String>> {
        let selected = self.policy.return_policy.select(issued);
        if selected.is_empty() {
            report.record(StepOutcome::new(
                Step::ReturnBook,
                Status::Skipped,
                "nothing to return",
            ));
            return Ok(Vec::new());
        }

        let mut returned = Vec::new();
        for book in selected {
            match self.api.return_book(session, &book.id).await? {
                Ok(()) => {
                    self.emit(report, Marker::Success, format!("Returned book: {}", book.title));
                    report.record(
                        StepOutcome::new(Step::ReturnBook, Status::Passed, "returned")
                            .with_subject(&book.title)
                            .with_http_status(200),
                    );
                    returned.push(book.id.clone());
                }
                Err(rejection) => {
                    warn!(
                        book = %book.title,
                        status = rejection.status,
                        "return refused, continuing"
                    );
                    self.emit(
                        report,
                        Marker::Failure,
                        format!("Could not return book: {}", book.title),
                    );
                    report.record(
                        StepOutcome::new(Step::ReturnBook, Status::Failed, rejection.describe())
                            .with_subject(&book.title)
                            .with_http_status(rejection.status),
                    );
                }
            }
        }
        Ok(returned)
    }

    fn emit(&self, report: &mut RunReport, marker: Marker, text: impl Into<String>) {
        let line = StatusLine {
            marker,
            text: text.into(),
        };
        if self.echo {
            println!("{line}");
        }
        report.lines.push(line);
    }
}
