use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One element of `GET /books`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BookSummary {
    #[serde(rename = "_id")]
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub issued_count: i64,
    #[serde(default)]
    pub available_quantity: i64,
    #[serde(default)]
    pub quantity: Option<i64>,
}

impl BookSummary {
    pub fn is_available(&self) -> bool {
        self.available_quantity > 0
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct LoginResponse {
    #[serde(default)]
    pub token: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
}

/// Body of a `201` from `POST /issued/issue`.
///
/// The due date is either top level or nested in the created record.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IssueReceipt {
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub due_at: Option<String>,
    #[serde(default)]
    pub issued_book: Option<IssuedBookBody>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IssuedBookBody {
    #[serde(default)]
    pub due_at: Option<String>,
}

impl IssueReceipt {
    pub fn due_at_raw(&self) -> Option<&str> {
        self.due_at
            .as_deref()
            .or_else(|| self.issued_book.as_ref()?.due_at.as_deref())
    }

    pub fn due_at(&self) -> Option<DateTime<Utc>> {
        parse_timestamp(self.due_at_raw()?)
    }
}

/// The `bookId` of an issued record: populated with the book document, or a bare id.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum BookRef {
    Populated {
        #[serde(rename = "_id")]
        id: String,
        #[serde(default)]
        title: Option<String>,
    },
    Id(String),
}

impl BookRef {
    pub fn id(&self) -> &str {
        match self {
            BookRef::Populated { id, .. } => id,
            BookRef::Id(id) => id,
        }
    }
}

/// One element of `GET /issued/user`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IssuedRecord {
    #[serde(default)]
    pub book_id: Option<BookRef>,
    #[serde(default)]
    pub due_at: Option<String>,
    #[serde(default)]
    pub is_overdue: bool,
}

impl IssuedRecord {
    pub fn book_id(&self) -> Option<&str> {
        self.book_id.as_ref().map(BookRef::id)
    }

    /// Overdue as of `now`: the service's flag, or a due date already passed.
    pub fn overdue_at(&self, now: DateTime<Utc>) -> bool {
        self.is_overdue
            || self
                .due_at
                .as_deref()
                .and_then(parse_timestamp)
                .is_some_and(|due| due < now)
    }
}

/// A book this run issued, kept until the return step.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IssuedBook {
    #[serde(rename = "_id")]
    pub id: String,
    pub title: String,
    pub due_at: Option<DateTime<Utc>>,
}

fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .ok()
        .map(|ts| ts.with_timezone(&Utc))
}
