use std::{
    collections::{BTreeMap, HashMap},
    sync::Arc,
    time::Duration,
};

use axum::{
    extract::{Path, State},
    http::{header, HeaderMap, Method, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::{net::TcpListener, sync::RwLock};
use tracing::{debug, info};
use uuid::Uuid;

/// `{code, message, data}` wrapper around every JSON reply.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Envelope<T> {
    pub code: u16,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
}

impl<T> Envelope<T> {
    fn ok(message: &str, data: T) -> Json<Self> {
        Json(Self {
            code: 200,
            message: message.to_string(),
            data: Some(data),
        })
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct PageInfo {
    pub current: u32,
    pub page_size: u32,
    pub total: u64,
    pub total_page: u32,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct PageEnvelope<T> {
    pub code: u16,
    pub message: String,
    pub data: T,
    pub page: PageInfo,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct UserInfo {
    pub id: u64,
    pub username: String,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub avatar: String,
    pub role: String,
    pub status: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct LoginResponse {
    pub token: String,
    pub expires_at: DateTime<Utc>,
    pub user: UserInfo,
}

#[derive(Deserialize)]
pub struct UpdateUser {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub avatar: Option<String>,
}

/// What `/api/echo` saw, returned verbatim so clients can inspect their own
/// requests.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Echo {
    pub method: String,
    pub headers: BTreeMap<String, String>,
    pub body: String,
}

struct Account {
    info: UserInfo,
    password: String,
}

#[derive(Default)]
pub struct ServerState {
    accounts: BTreeMap<u64, Account>,
    sessions: HashMap<String, u64>,
}

impl ServerState {
    /// Two accounts: `admin`/`admin123` and `user`/`user123`.
    pub fn seeded() -> Self {
        let mut state = Self::default();
        for (id, username, password, role) in [
            (1, "admin", "admin123", "admin"),
            (2, "user", "user123", "user"),
        ] {
            let now = Utc::now();
            state.accounts.insert(
                id,
                Account {
                    info: UserInfo {
                        id,
                        username: username.to_string(),
                        email: format!("{username}@example.com"),
                        first_name: String::new(),
                        last_name: String::new(),
                        avatar: String::new(),
                        role: role.to_string(),
                        status: "active".to_string(),
                        created_at: now,
                        updated_at: now,
                    },
                    password: password.to_string(),
                },
            );
        }
        state
    }
}

pub type Db = Arc<RwLock<ServerState>>;

/// Error reply: HTTP status plus an envelope whose `code` matches it.
pub struct Failure(StatusCode, &'static str);

impl IntoResponse for Failure {
    fn into_response(self) -> Response {
        let body = Envelope::<()> {
            code: self.0.as_u16(),
            message: self.1.to_string(),
            data: None,
        };
        (self.0, Json(body)).into_response()
    }
}

pub fn app() -> Router {
    let db: Db = Arc::new(RwLock::new(ServerState::seeded()));
    let api = Router::new()
        .route("/hello", get(hello))
        .route("/auth/login", post(login))
        .route("/users", get(list_users))
        .route("/users/{id}", get(get_user).put(update_user).delete(delete_user))
        .route("/echo", get(echo).post(echo).put(echo).delete(echo))
        .route("/text", get(text))
        .route("/slow/{ms}", get(slow))
        .route("/status/{code}", get(status));
    Router::new().nest("/api", api).with_state(db)
}

pub async fn run(listener: TcpListener) -> Result<(), std::io::Error> {
    if let Ok(addr) = listener.local_addr() {
        info!(%addr, "mock API server listening");
    }
    axum::serve(listener, app()).await
}

async fn authorize(db: &Db, headers: &HeaderMap) -> Result<u64, Failure> {
    let value = headers
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .ok_or(Failure(StatusCode::UNAUTHORIZED, "missing auth token"))?;
    let token = value
        .strip_prefix("Bearer ")
        .ok_or(Failure(StatusCode::UNAUTHORIZED, "malformed auth token"))?;
    db.read()
        .await
        .sessions
        .get(token)
        .copied()
        .ok_or(Failure(StatusCode::UNAUTHORIZED, "invalid auth token"))
}

async fn hello() -> Json<Envelope<String>> {
    Envelope::ok("success", "Hello from the mock API".to_string())
}

async fn login(State(db): State<Db>, Json(input): Json<LoginRequest>) -> Response {
    let mut state = db.write().await;
    let user = state
        .accounts
        .values()
        .find(|account| account.info.username == input.username && account.password == input.password)
        .map(|account| account.info.clone());

    let Some(user) = user else {
        debug!(username = %input.username, "login refused");
        // Refusals keep HTTP 200 and report failure through `code`.
        return Json(Envelope::<()> {
            code: 401,
            message: "invalid username or password".to_string(),
            data: None,
        })
        .into_response();
    };

    let token = Uuid::new_v4().to_string();
    state.sessions.insert(token.clone(), user.id);
    debug!(username = %user.username, "login accepted");
    Envelope::ok(
        "login succeeded",
        LoginResponse {
            token,
            expires_at: Utc::now() + chrono::Duration::hours(24),
            user,
        },
    )
    .into_response()
}

async fn list_users(
    State(db): State<Db>,
    headers: HeaderMap,
) -> Result<Json<PageEnvelope<Vec<UserInfo>>>, Failure> {
    authorize(&db, &headers).await?;
    let state = db.read().await;
    let users: Vec<UserInfo> = state.accounts.values().map(|account| account.info.clone()).collect();
    let total = users.len() as u64;
    Ok(Json(PageEnvelope {
        code: 200,
        message: "success".to_string(),
        data: users,
        page: PageInfo {
            current: 1,
            page_size: 10,
            total,
            total_page: total.div_ceil(10) as u32,
        },
    }))
}

async fn get_user(
    State(db): State<Db>,
    Path(id): Path<u64>,
    headers: HeaderMap,
) -> Result<Json<Envelope<UserInfo>>, Failure> {
    authorize(&db, &headers).await?;
    let state = db.read().await;
    let account = state
        .accounts
        .get(&id)
        .ok_or(Failure(StatusCode::NOT_FOUND, "user not found"))?;
    Ok(Envelope::ok("success", account.info.clone()))
}

async fn update_user(
    State(db): State<Db>,
    Path(id): Path<u64>,
    headers: HeaderMap,
    Json(input): Json<UpdateUser>,
) -> Result<Json<Envelope<UserInfo>>, Failure> {
    authorize(&db, &headers).await?;
    let mut state = db.write().await;
    let account = state
        .accounts
        .get_mut(&id)
        .ok_or(Failure(StatusCode::NOT_FOUND, "user not found"))?;
    if let Some(first_name) = input.first_name {
        account.info.first_name = first_name;
    }
    if let Some(last_name) = input.last_name {
        account.info.last_name = last_name;
    }
    if let Some(avatar) = input.avatar {
        account.info.avatar = avatar;
    }
    account.info.updated_at = Utc::now();
    Ok(Envelope::ok("updated", account.info.clone()))
}

async fn delete_user(
    State(db): State<Db>,
    Path(id): Path<u64>,
    headers: HeaderMap,
) -> Result<Json<Envelope<()>>, Failure> {
    authorize(&db, &headers).await?;
    let mut state = db.write().await;
    state
        .accounts
        .remove(&id)
        .ok_or(Failure(StatusCode::NOT_FOUND, "user not found"))?;
    state.sessions.retain(|_, user_id| *user_id != id);
    Ok(Json(Envelope {
        code: 200,
        message: "deleted".to_string(),
        data: None,
    }))
}

async fn echo(method: Method, headers: HeaderMap, body: String) -> Json<Echo> {
    let headers = headers
        .iter()
        .filter_map(|(name, value)| {
            value
                .to_str()
                .ok()
                .map(|value| (name.as_str().to_string(), value.to_string()))
        })
        .collect();
    Json(Echo {
        method: method.to_string(),
        headers,
        body,
    })
}

async fn text() -> &'static str {
    "pong"
}

async fn slow(Path(ms): Path<u64>) -> Json<Envelope<u64>> {
    tokio::time::sleep(Duration::from_millis(ms)).await;
    Envelope::ok("slow reply", ms)
}

async fn status(Path(code): Path<u16>) -> Response {
    match StatusCode::from_u16(code) {
        Ok(status) => Failure(status, "requested status").into_response(),
        Err(_) => Failure(StatusCode::BAD_REQUEST, "invalid status code").into_response(),
    }
}
