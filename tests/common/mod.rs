// Shared harness: local clients and an in-process stand-in for the remote
// `/execute` endpoint.
#![allow(dead_code)]

use axum::extract::State;
use axum::http::{header::AUTHORIZATION, HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::post;
use axum::{Json, Router};
use rusqlite::{params_from_iter, Connection};
use rust_sqlclient::{ConnectionTarget, DatabaseClient, StatementKind, Value, WireParam};
use serde::Deserialize;
use serde_json::{json, Value as JsonValue};
use std::sync::{Arc, Mutex};

pub fn local_client() -> DatabaseClient {
    DatabaseClient::open(ConnectionTarget::local(":memory:")).unwrap()
}

pub async fn local_shop() -> DatabaseClient {
    let client = local_client();
    client.shop().initialize_schema().await.unwrap();
    client
}

#[derive(Debug, Clone, Deserialize)]
pub struct ReceivedRequest {
    pub stmt: String,
    pub params: Vec<WireParam>,
}

#[derive(Debug, Clone, Default)]
pub struct StubOptions {
    /// Require `Authorization: Bearer <token>`.
    pub token: Option<String>,
    /// Answer writes with counts only, even when they produced rows.
    pub omit_returning: bool,
}

struct StubState {
    db: Mutex<Connection>,
    options: StubOptions,
    received: Mutex<Vec<(ReceivedRequest, Option<String>)>>,
}

/// A stateless statement endpoint: each request runs in autocommit mode
/// against one in-memory database.
pub struct StubEndpoint {
    pub url: String,
    state: Arc<StubState>,
}

impl StubEndpoint {
    pub async fn spawn(options: StubOptions) -> Self {
        let state = Arc::new(StubState {
            db: Mutex::new(Connection::open_in_memory().unwrap()),
            options,
            received: Mutex::new(Vec::new()),
        });
        let app = Router::new()
            .route("/execute", post(execute))
            .with_state(state.clone());
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let url = format!("http://{}", listener.local_addr().unwrap());
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        Self { url, state }
    }

    pub fn client(&self) -> DatabaseClient {
        let target = ConnectionTarget::remote(&self.url, self.state.options.token.clone());
        DatabaseClient::open(target).unwrap()
    }

    pub async fn shop_client(&self) -> DatabaseClient {
        let client = self.client();
        client.shop().initialize_schema().await.unwrap();
        client
    }

    pub fn requests(&self) -> Vec<ReceivedRequest> {
        self.state
            .received
            .lock()
            .unwrap()
            .iter()
            .map(|(request, _)| request.clone())
            .collect()
    }

    pub fn authorization_headers(&self) -> Vec<Option<String>> {
        self.state
            .received
            .lock()
            .unwrap()
            .iter()
            .map(|(_, auth)| auth.clone())
            .collect()
    }

    /// Inspect server-side state directly, bypassing the client.
    pub fn scalar(&self, sql: &str) -> i64 {
        self.state
            .db
            .lock()
            .unwrap()
            .query_row(sql, [], |row| row.get(0))
            .unwrap()
    }
}

async fn execute(
    State(state): State<Arc<StubState>>,
    headers: HeaderMap,
    Json(request): Json<ReceivedRequest>,
) -> Response {
    let auth = headers
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);
    state
        .received
        .lock()
        .unwrap()
        .push((request.clone(), auth.clone()));

    if let Some(token) = &state.options.token {
        if auth.as_deref() != Some(format!("Bearer {}", token).as_str()) {
            return (StatusCode::UNAUTHORIZED, "invalid token").into_response();
        }
    }

    let db = state.db.lock().unwrap();
    match run(&db, &request, state.options.omit_returning) {
        Ok(body) => Json(body).into_response(),
        Err(err) => (StatusCode::BAD_REQUEST, format!("SQLITE_ERROR: {}", err)).into_response(),
    }
}

fn run(db: &Connection, request: &ReceivedRequest, omit_returning: bool) -> rusqlite::Result<JsonValue> {
    let params: Vec<Value> = request.params.iter().map(WireParam::to_value).collect();
    let mut stmt = db.prepare(&request.stmt)?;
    let columns: Vec<String> = stmt.column_names().into_iter().map(str::to_string).collect();

    let mut rows = Vec::new();
    {
        let mut cursor = stmt.query(params_from_iter(params.iter()))?;
        while let Some(row) = cursor.next()? {
            let mut cells = Vec::with_capacity(columns.len());
            for index in 0..columns.len() {
                cells.push(Value::from(row.get_ref(index)?).to_json());
            }
            rows.push(JsonValue::Array(cells));
        }
    }

    let kind = StatementKind::classify(&request.stmt);
    let mut results = serde_json::Map::new();
    if !columns.is_empty() && !(kind == StatementKind::Write && omit_returning) {
        results.insert("columns".into(), json!(columns));
        results.insert("rows".into(), JsonValue::Array(rows));
    }
    if kind == StatementKind::Write {
        results.insert("last_insert_rowid".into(), json!(db.last_insert_rowid()));
        results.insert("rows_affected".into(), json!(db.changes()));
    }
    Ok(json!({ "results": results }))
}
