use hearth_core::{Member, TransactionRecord};
use hearth_import::{BatchSink, SubmitError, UploadResponse};
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::config::ApiConfig;
use crate::error::ClientError;
use crate::session::Session;

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct User {
    #[serde(rename = "_id", default)]
    pub id: String,
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub email: String,
}

#[derive(Serialize)]
struct LoginRequest<'a> {
    email: &'a str,
    password: &'a str,
}

#[derive(Serialize)]
struct RegisterRequest<'a> {
    username: &'a str,
    email: &'a str,
    password: &'a str,
}

#[derive(Deserialize)]
struct TokenResponse {
    token: String,
}

#[derive(Serialize)]
struct BatchRequest<'a> {
    transactions: &'a [TransactionRecord],
}

#[derive(Deserialize)]
struct MessageResponse {
    #[serde(default)]
    message: String,
}

/// Thin client over the tracker's REST API. Holds no auth state; every
/// authenticated call takes a [`Session`].
#[derive(Debug, Clone)]
pub struct ApiClient {
    http: reqwest::Client,
    base_url: String,
}

impl ApiClient {
    pub fn new(config: &ApiConfig) -> Result<Self, ClientError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;
        Ok(Self {
            http,
            base_url: config.base_url.trim().trim_end_matches('/').to_string(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    pub async fn login(&self, email: &str, password: &str) -> Result<Session, ClientError> {
        let resp = self
            .http
            .post(self.url("/api/auth/login"))
            .json(&LoginRequest { email, password })
            .send()
            .await?;
        let body: TokenResponse = check(resp).await?.json().await?;
        tracing::info!("Logged in as {email}");
        Ok(Session::new(body.token))
    }

    pub async fn register(
        &self,
        username: &str,
        email: &str,
        password: &str,
    ) -> Result<Session, ClientError> {
        let resp = self
            .http
            .post(self.url("/api/auth/register"))
            .json(&RegisterRequest { username, email, password })
            .send()
            .await?;
        let body: TokenResponse = check(resp).await?.json().await?;
        tracing::info!("Registered {username} <{email}>");
        Ok(Session::new(body.token))
    }

    /// Confirms the session is still accepted by the server.
    pub async fn current_user(&self, session: &Session) -> Result<User, ClientError> {
        let resp = self
            .http
            .get(self.url("/api/auth/me"))
            .bearer_auth(session.token())
            .send()
            .await?;
        Ok(check(resp).await?.json().await?)
    }

    pub async fn members(&self, session: &Session) -> Result<Vec<Member>, ClientError> {
        let resp = self
            .http
            .get(self.url("/api/household"))
            .bearer_auth(session.token())
            .send()
            .await?;
        let members: Vec<Member> = check(resp).await?.json().await?;
        tracing::debug!("Fetched {} household members", members.len());
        Ok(members)
    }

    /// Sends a CSV file for server-side parsing and type matching.
    pub async fn upload_csv(
        &self,
        session: &Session,
        file_name: &str,
        data: Vec<u8>,
    ) -> Result<UploadResponse, ClientError> {
        let part = reqwest::multipart::Part::bytes(data)
            .file_name(file_name.to_string())
            .mime_str("text/csv")?;
        let form = reqwest::multipart::Form::new().part("file", part);
        let resp = self
            .http
            .post(self.url("/api/transactions/upload"))
            .bearer_auth(session.token())
            .multipart(form)
            .send()
            .await?;
        let body: UploadResponse = check(resp).await?.json().await?;
        tracing::info!(
            "Upload parsed: {} rows ({} in preview)",
            body.total_rows,
            body.preview.len()
        );
        Ok(body)
    }

    /// Commits a batch and returns the server's acknowledgement message.
    pub async fn submit_batch(
        &self,
        session: &Session,
        records: &[TransactionRecord],
    ) -> Result<String, ClientError> {
        let resp = self
            .http
            .post(self.url("/api/transactions/batch"))
            .bearer_auth(session.token())
            .json(&BatchRequest { transactions: records })
            .send()
            .await?;
        let body: MessageResponse = check(resp).await?.json().await?;
        Ok(body.message)
    }

    pub fn sink<'a>(&'a self, session: &'a Session) -> AuthorizedSink<'a> {
        AuthorizedSink { client: self, session }
    }
}

/// Maps non-2xx responses to [`ClientError::Status`], using the body's
/// `message` when the server sent one.
async fn check(resp: reqwest::Response) -> Result<reqwest::Response, ClientError> {
    let status = resp.status();
    if status.is_success() {
        return Ok(resp);
    }
    let body = resp.text().await.unwrap_or_default();
    let message = serde_json::from_str::<MessageResponse>(&body)
        .ok()
        .map(|m| m.message)
        .filter(|m| !m.is_empty())
        .unwrap_or_else(|| status.canonical_reason().unwrap_or("request failed").to_string());
    Err(ClientError::Status {
        status: status.as_u16(),
        message,
    })
}

/// The batch endpoint bound to one session.
pub struct AuthorizedSink<'a> {
    client: &'a ApiClient,
    session: &'a Session,
}

impl BatchSink for AuthorizedSink<'_> {
    async fn submit_batch(&self, records: &[TransactionRecord]) -> Result<String, SubmitError> {
        self.client
            .submit_batch(self.session, records)
            .await
            .map_err(|e| {
                tracing::warn!("Batch endpoint error: {e}");
                SubmitError::with_source(e)
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Bytes;
    use axum::extract::State;
    use axum::http::{header, HeaderMap, StatusCode};
    use axum::response::IntoResponse;
    use axum::routing::{get, post};
    use axum::{Json, Router};
    use hearth_core::Money;
    use hearth_import::{ColumnMapping, ImportError, ImportSession, LogicalField};
    use serde_json::{json, Value};
    use std::sync::{Arc, Mutex};

    const TOKEN: &str = "test-token";
    const MEMBER: &str = "abc123abc123abc123abc123";

    #[derive(Clone, Default)]
    struct Received {
        batches: Arc<Mutex<Vec<Value>>>,
    }

    fn authorized(headers: &HeaderMap) -> bool {
        headers
            .get("authorization")
            .and_then(|v| v.to_str().ok())
            .is_some_and(|v| v == format!("Bearer {TOKEN}"))
    }

    async fn login(Json(body): Json<Value>) -> Result<Json<Value>, (StatusCode, Json<Value>)> {
        if body["password"] == "hunter2" {
            Ok(Json(json!({ "token": TOKEN })))
        } else {
            Err((StatusCode::UNAUTHORIZED, Json(json!({ "message": "Invalid credentials" }))))
        }
    }

    async fn register(Json(body): Json<Value>) -> Result<Json<Value>, (StatusCode, Json<Value>)> {
        if body["email"] == "taken@example.org" {
            Err((StatusCode::BAD_REQUEST, Json(json!({ "message": "User already exists" }))))
        } else if body["username"].as_str().is_some_and(|u| !u.is_empty()) {
            Ok(Json(json!({ "token": TOKEN })))
        } else {
            Err((StatusCode::BAD_REQUEST, Json(json!({}))))
        }
    }

    async fn me(headers: HeaderMap) -> Result<Json<Value>, StatusCode> {
        if !authorized(&headers) {
            return Err(StatusCode::UNAUTHORIZED);
        }
        Ok(Json(json!({ "_id": "u1", "username": "alex", "email": "alex@example.org" })))
    }

    async fn household(headers: HeaderMap) -> Result<Json<Value>, StatusCode> {
        if !authorized(&headers) {
            return Err(StatusCode::UNAUTHORIZED);
        }
        Ok(Json(json!([{ "_id": MEMBER, "name": "Alex" }])))
    }

    // Written out by hand so `raw` keeps its column order on the wire.
    const UPLOAD_BODY: &str = r#"{
        "preview": [{"raw": {"Posted": "2024-01-05", "Desc": "Coffee", "Credit": "0", "Debit": "4.50", "Cat": ""}, "match": "wants"}],
        "fullData": [{"raw": {"Posted": "2024-01-05", "Desc": "Coffee", "Credit": "0", "Debit": "4.50", "Cat": ""}, "match": "wants"}],
        "totalRows": 1
    }"#;

    async fn upload(headers: HeaderMap, body: Bytes) -> Result<impl IntoResponse, StatusCode> {
        let is_multipart = headers
            .get("content-type")
            .and_then(|v| v.to_str().ok())
            .is_some_and(|v| v.starts_with("multipart/form-data"));
        let text = String::from_utf8_lossy(&body);
        if !authorized(&headers) || !is_multipart || !text.contains("filename=\"statement.csv\"") {
            return Err(StatusCode::BAD_REQUEST);
        }
        Ok(([(header::CONTENT_TYPE, "application/json")], UPLOAD_BODY))
    }

    async fn batch(
        State(received): State<Received>,
        headers: HeaderMap,
        Json(body): Json<Value>,
    ) -> Result<Json<Value>, StatusCode> {
        if !authorized(&headers) {
            return Err(StatusCode::UNAUTHORIZED);
        }
        let count = body["transactions"].as_array().map_or(0, Vec::len);
        received
            .batches
            .lock()
            .unwrap()
            .push(body);
        Ok(Json(json!({ "message": format!("{count} transactions saved") })))
    }

    async fn broken() -> StatusCode {
        StatusCode::INTERNAL_SERVER_ERROR
    }

    async fn serve(received: Received, batch_fails: bool) -> ApiClient {
        let batch_route = if batch_fails { post(broken) } else { post(batch) };
        let app = Router::new()
            .route("/api/auth/login", post(login))
            .route("/api/auth/register", post(register))
            .route("/api/auth/me", get(me))
            .route("/api/household", get(household))
            .route("/api/transactions/upload", post(upload))
            .route("/api/transactions/batch", batch_route)
            .with_state(received);
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        ApiClient::new(&ApiConfig {
            base_url: format!("http://{addr}/"),
            token: None,
            timeout_secs: 5,
        })
        .unwrap()
    }

    fn mapping() -> ColumnMapping {
        ColumnMapping {
            date: "Posted".to_string(),
            description: "Desc".to_string(),
            category: "Cat".to_string(),
            amount_primary: "Credit".to_string(),
            amount_secondary: "Debit".to_string(),
        }
    }

    #[tokio::test]
    async fn login_returns_session() {
        let client = serve(Received::default(), false).await;
        let session = client.login("alex@example.org", "hunter2").await.unwrap();
        assert_eq!(session.token(), TOKEN);
        let user = client.current_user(&session).await.unwrap();
        assert_eq!(user.username, "alex");
    }

    #[tokio::test]
    async fn login_failure_carries_server_message() {
        let client = serve(Received::default(), false).await;
        let err = client.login("alex@example.org", "wrong").await.unwrap_err();
        assert!(err.is_unauthorized());
        assert_eq!(err.to_string(), "Server returned 401: Invalid credentials");
    }

    #[tokio::test]
    async fn register_returns_session() {
        let client = serve(Received::default(), false).await;
        let session = client
            .register("alex", "alex@example.org", "hunter2")
            .await
            .unwrap();
        assert_eq!(session.token(), TOKEN);
    }

    #[tokio::test]
    async fn register_conflict_carries_server_message() {
        let client = serve(Received::default(), false).await;
        let err = client
            .register("alex", "taken@example.org", "hunter2")
            .await
            .unwrap_err();
        assert!(!err.is_unauthorized());
        assert_eq!(err.to_string(), "Server returned 400: User already exists");
    }

    #[tokio::test]
    async fn stale_session_is_rejected() {
        let client = serve(Received::default(), false).await;
        let err = client.members(&Session::new("expired")).await.unwrap_err();
        assert!(err.is_unauthorized());
        let err = client.current_user(&Session::new("expired")).await.unwrap_err();
        assert!(err.is_unauthorized());
    }

    #[tokio::test]
    async fn fetches_members() {
        let client = serve(Received::default(), false).await;
        let members = client.members(&Session::new(TOKEN)).await.unwrap();
        assert_eq!(members.len(), 1);
        assert_eq!(members[0].name, "Alex");
        assert!(members[0].member_id().is_some());
    }

    #[tokio::test]
    async fn upload_then_submit_round_trip() {
        let received = Received::default();
        let client = serve(received.clone(), false).await;
        let session = Session::new(TOKEN);

        let csv = b"Posted,Desc,Credit,Debit,Cat\n2024-01-05,Coffee,0,4.50,\n".to_vec();
        let response = client.upload_csv(&session, "statement.csv", csv).await.unwrap();
        assert_eq!(response.total_rows, 1);

        let mut import = ImportSession::from_upload_response(response).with_mapping(mapping());
        assert_eq!(import.headers(), ["Posted", "Desc", "Credit", "Debit", "Cat"]);
        import.assign_member(0, MEMBER).unwrap();

        let message = import.submit(&client.sink(&session)).await.unwrap();
        assert_eq!(message, "1 transactions saved");

        let batches = received.batches.lock().unwrap();
        assert_eq!(
            batches[0],
            json!({
                "transactions": [{
                    "date": "2024-01-05",
                    "description": "Coffee",
                    "amount": 4.5,
                    "category": "Uncategorized",
                    "type": "wants",
                    "notes": "",
                    "member": MEMBER
                }]
            })
        );
    }

    #[tokio::test]
    async fn record_without_member_sends_no_member_key() {
        let received = Received::default();
        let client = serve(received.clone(), false).await;
        let session = Session::new(TOKEN);

        let record = TransactionRecord::new("2024-01-05", "Coffee", Money::from_cents(450));
        client.submit_batch(&session, &[record]).await.unwrap();

        let batches = received.batches.lock().unwrap();
        assert!(batches[0]["transactions"][0].get("member").is_none());
    }

    #[tokio::test]
    async fn server_failure_is_opaque_to_the_session() {
        let client = serve(Received::default(), true).await;
        let session = Session::new(TOKEN);

        let raw = [("Posted", "2024-01-05"), ("Desc", "Coffee"), ("Credit", "3")]
            .into_iter()
            .collect();
        let mut import = ImportSession::new(
            vec!["Posted".into(), "Desc".into(), "Credit".into()],
            vec![hearth_import::MatchedRow::new(raw, None)],
        );
        import.set_mapping(LogicalField::Date, "Posted");
        import.set_mapping(LogicalField::Description, "Desc");
        import.set_mapping(LogicalField::AmountPrimary, "Credit");

        let err = import.submit(&client.sink(&session)).await.unwrap_err();
        assert!(matches!(err, ImportError::SubmissionFailed(_)));
        assert_eq!(err.to_string(), "batch submission failed");
    }

    #[tokio::test]
    async fn direct_submit_reports_status() {
        let client = serve(Received::default(), true).await;
        let err = client
            .submit_batch(&Session::new(TOKEN), &[])
            .await
            .unwrap_err();
        assert!(matches!(err, ClientError::Status { status: 500, .. }));
    }
}
