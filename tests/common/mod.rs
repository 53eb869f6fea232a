//! In-process stand-in for the library service, served over hyper on an
//! ephemeral port. Mirrors the member-facing behavior of the real API:
//! the two-active-issues cap, `availableQuantity` derived from active
//! issues, and `{message}` bodies on every refusal.

#![allow(dead_code)]

use std::convert::Infallible;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};

use chrono::{DateTime, Duration, SecondsFormat, Utc};
use http_body_util::{BodyExt, Full};
use hyper::body::{Bytes, Incoming};
use hyper::header::{AUTHORIZATION, CONTENT_TYPE};
use hyper::service::service_fn;
use hyper::{Method, Request, Response, StatusCode};
use hyper_util::rt::TokioIo;
use serde_json::{Value, json};
use tokio::net::TcpListener;

pub const MEMBER_ISSUE_CAP: usize = 2;

#[derive(Debug, Clone)]
pub struct MockBook {
    pub id: String,
    pub title: String,
    pub quantity: i64,
}

pub fn book(id: &str, title: &str, quantity: i64) -> MockBook {
    MockBook {
        id: id.into(),
        title: title.into(),
        quantity,
    }
}

#[derive(Debug, Clone)]
struct Issue {
    email: String,
    book_id: String,
    due_at: String,
    returned: bool,
}

/// Switches that make the mock misbehave in specific ways.
#[derive(Debug, Clone, Default)]
pub struct Faults {
    /// `GET /books` answers 500.
    pub books_unavailable: bool,
    /// `GET /books` answers 200 with an object instead of a list.
    pub books_malformed: bool,
    /// Login answers 200 with an empty token.
    pub empty_token: bool,
    /// `GET /issued/user` answers an empty list regardless of state.
    pub hide_user_issues: bool,
    /// `POST /issued/return` answers 500.
    pub return_broken: bool,
}

#[derive(Debug, Default)]
pub struct LibraryState {
    users: Vec<(String, String)>,
    books: Vec<MockBook>,
    issues: Vec<Issue>,
    pub faults: Faults,
}

impl LibraryState {
    fn active_for_book(&self, book_id: &str) -> i64 {
        self.issues
            .iter()
            .filter(|i| !i.returned && i.book_id == book_id)
            .count() as i64
    }

    fn active_for_user(&self, email: &str) -> usize {
        self.issues
            .iter()
            .filter(|i| !i.returned && i.email == email)
            .count()
    }

    fn user_for_token(&self, token: Option<&str>) -> Option<String> {
        let email = token?.strip_prefix("token-")?;
        self.users
            .iter()
            .find(|(e, _)| e == email)
            .map(|(e, _)| e.clone())
    }

    fn route(
        &mut self,
        method: &Method,
        path: &str,
        token: Option<&str>,
        body: &Value,
    ) -> (StatusCode, Value) {
        let path = path.trim_end_matches('/');
        match (method, path) {
            (&Method::POST, "/api/auth/register") => self.register(body),
            (&Method::POST, "/api/auth/login") => self.login(body),
            _ => {
                let Some(email) = self.user_for_token(token) else {
                    return (
                        StatusCode::UNAUTHORIZED,
                        json!({ "message": "Not authorized, token failed" }),
                    );
                };
                match (method, path) {
                    (&Method::GET, "/api/books") => self.books(),
                    (&Method::POST, "/api/issued/issue") => self.issue(&email, body),
                    (&Method::GET, "/api/issued/user") => self.user_issues(&email),
                    (&Method::POST, "/api/issued/return") => self.return_book(&email, body),
                    _ => (StatusCode::NOT_FOUND, json!({ "message": "Not found" })),
                }
            }
        }
    }

    fn register(&mut self, body: &Value) -> (StatusCode, Value) {
        let email = body["email"].as_str().unwrap_or_default().to_string();
        let password = body["password"].as_str().unwrap_or_default().to_string();
        if email.is_empty() || password.is_empty() || body["name"].as_str().is_none() {
            return (StatusCode::BAD_REQUEST, json!({ "message": "All fields are required" }));
        }
        if self.users.iter().any(|(e, _)| *e == email) {
            return (StatusCode::BAD_REQUEST, json!({ "message": "User already exists" }));
        }
        self.users.push((email, password));
        (StatusCode::CREATED, json!({ "message": "User registered successfully" }))
    }

    fn login(&mut self, body: &Value) -> (StatusCode, Value) {
        let email = body["email"].as_str().unwrap_or_default();
        let password = body["password"].as_str().unwrap_or_default();
        if !self.users.iter().any(|(e, p)| e == email && p == password) {
            return (StatusCode::UNAUTHORIZED, json!({ "message": "Invalid email or password" }));
        }
        let token = if self.faults.empty_token {
            String::new()
        } else {
            format!("token-{email}")
        };
        (
            StatusCode::OK,
            json!({
                "message": "Login successful",
                "token": token,
                "user": { "_id": format!("user-{email}"), "email": email, "role": "member" },
            }),
        )
    }

    fn books(&self) -> (StatusCode, Value) {
        if self.faults.books_unavailable {
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                json!({ "message": "Database unavailable" }),
            );
        }
        if self.faults.books_malformed {
            return (StatusCode::OK, json!({ "books": "coming soon" }));
        }
        let books: Vec<Value> = self
            .books
            .iter()
            .map(|b| {
                let active = self.active_for_book(&b.id);
                json!({
                    "_id": b.id,
                    "title": b.title,
                    "quantity": b.quantity,
                    "issuedCount": active,
                    "availableQuantity": (b.quantity - active).max(0),
                })
            })
            .collect();
        (StatusCode::OK, Value::Array(books))
    }

    fn issue(&mut self, email: &str, body: &Value) -> (StatusCode, Value) {
        let Some(book_id) = body["bookId"].as_str() else {
            return (StatusCode::BAD_REQUEST, json!({ "message": "Valid book ID is required" }));
        };
        let Some(book) = self.books.iter().find(|b| b.id == book_id).cloned() else {
            return (StatusCode::NOT_FOUND, json!({ "message": "Book not found" }));
        };
        if self.active_for_user(email) >= MEMBER_ISSUE_CAP {
            return (
                StatusCode::BAD_REQUEST,
                json!({ "message": "You can only issue a maximum of 2 books at a time" }),
            );
        }
        if self.active_for_book(book_id) >= book.quantity {
            return (StatusCode::BAD_REQUEST, json!({ "message": "Book not available" }));
        }
        let due_at = (Utc::now() + Duration::days(7)).to_rfc3339_opts(SecondsFormat::Millis, true);
        self.issues.push(Issue {
            email: email.into(),
            book_id: book_id.into(),
            due_at: due_at.clone(),
            returned: false,
        });
        (
            StatusCode::CREATED,
            json!({
                "message": "Book issued successfully",
                "issuedBook": {
                    "_id": format!("issue-{}", self.issues.len()),
                    "bookId": book_id,
                    "dueAt": due_at,
                    "returned": false,
                },
            }),
        )
    }

    fn user_issues(&self, email: &str) -> (StatusCode, Value) {
        if self.faults.hide_user_issues {
            return (StatusCode::OK, json!([]));
        }
        let records: Vec<Value> = self
            .issues
            .iter()
            .enumerate()
            .filter(|(_, i)| !i.returned && i.email == email)
            .map(|(n, i)| {
                let title = self
                    .books
                    .iter()
                    .find(|b| b.id == i.book_id)
                    .map(|b| b.title.clone());
                json!({
                    "_id": format!("issue-{}", n + 1),
                    "bookId": { "_id": i.book_id, "title": title },
                    "dueAt": i.due_at,
                    "returned": false,
                    "isOverdue": is_past(&i.due_at),
                })
            })
            .collect();
        (StatusCode::OK, Value::Array(records))
    }

    fn return_book(&mut self, email: &str, body: &Value) -> (StatusCode, Value) {
        if self.faults.return_broken {
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                json!({ "message": "Database unavailable" }),
            );
        }
        let book_id = body["bookId"].as_str().unwrap_or_default();
        let Some(issue) = self
            .issues
            .iter_mut()
            .find(|i| !i.returned && i.email == email && i.book_id == book_id)
        else {
            return (
                StatusCode::NOT_FOUND,
                json!({ "message": "No active issued book found for you" }),
            );
        };
        issue.returned = true;
        (StatusCode::OK, json!({ "message": "Book returned successfully" }))
    }
}

fn is_past(due_at: &str) -> bool {
    DateTime::parse_from_rfc3339(due_at).is_ok_and(|due| due.with_timezone(&Utc) < Utc::now())
}

pub struct MockLibrary {
    pub addr: SocketAddr,
    state: Arc<Mutex<LibraryState>>,
}

impl MockLibrary {
    pub async fn start(books: Vec<MockBook>) -> Self {
        let state = Arc::new(Mutex::new(LibraryState {
            books,
            ..LibraryState::default()
        }));

        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        let server_state = state.clone();
        tokio::spawn(async move {
            loop {
                let Ok((stream, _)) = listener.accept().await else {
                    break;
                };
                let io = TokioIo::new(stream);
                let state = server_state.clone();
                tokio::spawn(async move {
                    let svc = service_fn(move |req| handle(state.clone(), req));
                    let _ = hyper::server::conn::http1::Builder::new()
                        .serve_connection(io, svc)
                        .await;
                });
            }
        });

        Self { addr, state }
    }

    pub fn base_url(&self) -> String {
        format!("http://{}/api", self.addr)
    }

    pub fn with_faults(self, faults: Faults) -> Self {
        self.state.lock().unwrap().faults = faults;
        self
    }

    pub fn seed_user(&self, email: &str, password: &str) {
        self.state
            .lock()
            .unwrap()
            .users
            .push((email.into(), password.into()));
    }

    /// Adds an active issue that fell due in 2020.
    pub fn seed_issue(&self, email: &str, book_id: &str) {
        self.state.lock().unwrap().issues.push(Issue {
            email: email.into(),
            book_id: book_id.into(),
            due_at: "2020-01-01T00:00:00.000Z".into(),
            returned: false,
        });
    }

    /// Book ids the member currently holds, in issue order.
    pub fn active_issues(&self, email: &str) -> Vec<String> {
        self.state
            .lock()
            .unwrap()
            .issues
            .iter()
            .filter(|i| !i.returned && i.email == email)
            .map(|i| i.book_id.clone())
            .collect()
    }
}

async fn handle(
    state: Arc<Mutex<LibraryState>>,
    req: Request<Incoming>,
) -> Result<Response<Full<Bytes>>, Infallible> {
    let method = req.method().clone();
    let path = req.uri().path().to_string();
    let token = req
        .headers()
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(str::to_string);

    let bytes = match req.into_body().collect().await {
        Ok(collected) => collected.to_bytes(),
        Err(_) => Bytes::new(),
    };
    let body: Value = serde_json::from_slice(&bytes).unwrap_or(Value::Null);

    let (status, payload) = state
        .lock()
        .unwrap()
        .route(&method, &path, token.as_deref(), &body);

    Ok(Response::builder()
        .status(status)
        .header(CONTENT_TYPE, "application/json")
        .body(Full::new(Bytes::from(payload.to_string())))
        .unwrap())
}

/// An address nothing is listening on.
pub async fn closed_addr() -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    addr
}
