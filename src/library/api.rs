use serde_json::json;
use tracing::debug;

use crate::auth::{Credentials, Session};
use crate::error::{Error, Result};
use crate::http::{ApiClient, HttpResponse, RequestInput};

use super::models::{BookSummary, IssueReceipt, IssuedRecord, LoginResponse};

pub const REGISTER_PATH: &str = "auth/register";
pub const LOGIN_PATH: &str = "auth/login";
pub const BOOKS_PATH: &str = "books";
pub const ISSUE_PATH: &str = "issued/issue";
pub const USER_ISSUED_PATH: &str = "issued/user";
pub const RETURN_PATH: &str = "issued/return";

/// A non-success HTTP answer. Not an error: the caller decides what it means.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rejection {
    pub status: u16,
    pub message: Option<String>,
}

impl Rejection {
    fn from_response(response: &HttpResponse) -> Self {
        Self {
            status: response.status,
            message: response.message(),
        }
    }

    /// The service's message, or the bare status when it sent none.
    pub fn describe(&self) -> String {
        match &self.message {
            Some(message) => message.clone(),
            None => format!("status {}", self.status),
        }
    }
}

pub type Outcome<T> = std::result::Result<T, Rejection>;

/// Typed calls against the library service.
#[derive(Debug, Clone)]
pub struct LibraryApi {
    client: ApiClient,
}

impl LibraryApi {
    pub fn new(client: ApiClient) -> Self {
        Self { client }
    }

    pub fn client(&self) -> &ApiClient {
        &self.client
    }

    /// `201` on success. An existing account answers with some other status.
    pub async fn register(&self, credentials: &Credentials) -> Result<Outcome<()>> {
        let response = self
            .client
            .send(RequestInput::post(REGISTER_PATH, credentials.registration_body()))
            .await?;
        Ok(expect_status(&response, 201).map(|_| ()))
    }

    /// Logs in and returns the bearer session.
    ///
    /// Needs `200` and a non-empty `token`; anything else is
    /// [`Error::LoginFailed`].
    pub async fn login(&self, credentials: &Credentials) -> Result<Session> {
        let response = self
            .client
            .send(RequestInput::post(LOGIN_PATH, credentials.login_body()))
            .await?;

        let body: LoginResponse = response.json().unwrap_or_default();
        if !response.is_status(200) {
            return Err(Error::LoginFailed {
                status: response.status,
                message: body.message,
            });
        }

        body.token
            .and_then(Session::new)
            .ok_or_else(|| Error::LoginFailed {
                status: response.status,
                message: Some("response carried no token".into()),
            })
    }

    pub async fn list_books(&self, session: &Session) -> Result<Outcome<Vec<BookSummary>>> {
        let response = self
            .client
            .send(RequestInput::get(BOOKS_PATH).with_bearer(session.token()))
            .await?;
        if let Err(rejection) = expect_status(&response, 200) {
            return Ok(Err(rejection));
        }
        let books = response
            .json()
            .map_err(|e| Error::json("book list", e))?;
        Ok(Ok(books))
    }

    pub async fn issue_book(
        &self,
        session: &Session,
        book_id: &str,
    ) -> Result<Outcome<IssueReceipt>> {
        let request = RequestInput::post(ISSUE_PATH, json!({ "bookId": book_id }))
            .with_bearer(session.token());
        let response = self.client.send(request).await?;
        if let Err(rejection) = expect_status(&response, 201) {
            return Ok(Err(rejection));
        }
        let receipt = response
            .json()
            .map_err(|e| Error::json("issue receipt", e))?;
        Ok(Ok(receipt))
    }

    pub async fn user_issued_books(
        &self,
        session: &Session,
    ) -> Result<Outcome<Vec<IssuedRecord>>> {
        let response = self
            .client
            .send(RequestInput::get(USER_ISSUED_PATH).with_bearer(session.token()))
            .await?;
        if let Err(rejection) = expect_status(&response, 200) {
            return Ok(Err(rejection));
        }
        let records = response
            .json()
            .map_err(|e| Error::json("issued book list", e))?;
        Ok(Ok(records))
    }

    pub async fn return_book(&self, session: &Session, book_id: &str) -> Result<Outcome<()>> {
        let request = RequestInput::post(RETURN_PATH, json!({ "bookId": book_id }))
            .with_bearer(session.token());
        let response = self.client.send(request).await?;
        Ok(expect_status(&response, 200).map(|_| ()))
    }
}

fn expect_status(response: &HttpResponse, expected: u16) -> Outcome<&HttpResponse> {
    if response.is_status(expected) {
        Ok(response)
    } else {
        let rejection = Rejection::from_response(response);
        debug!(expected, actual = rejection.status, "unexpected status");
        Err(rejection)
    }
}
