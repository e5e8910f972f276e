//! Task-list API used as the live peer in end-to-end tests.
//!
//! `POST /auth/login` issues a token; every `/tasks` route requires it in the
//! `token` header and answers 401 with `{"message": ...}` otherwise.

use std::collections::{BTreeMap, HashSet};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::{HeaderMap, StatusCode},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use tokio::{net::TcpListener, sync::RwLock};
use uuid::Uuid;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskStatus {
    Waiting,
    Doing,
    Done,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Task {
    pub id: u64,
    pub content: String,
    pub status: TaskStatus,
}

#[derive(Deserialize)]
pub struct Login {
    pub email: String,
    pub password: String,
}

#[derive(Serialize, Deserialize)]
pub struct Session {
    pub token: String,
}

#[derive(Deserialize)]
pub struct CreateTask {
    pub content: String,
}

#[derive(Deserialize)]
pub struct UpdateTask {
    pub content: Option<String>,
    pub status: Option<TaskStatus>,
}

#[derive(Deserialize)]
pub struct ListFilter {
    pub status: Option<TaskStatus>,
}

#[derive(Serialize, Deserialize)]
pub struct ErrorBody {
    pub message: String,
}

/// Password every account accepts.
pub const PASSWORD: &str = "hunter2";

#[derive(Default)]
pub struct AppState {
    tasks: RwLock<BTreeMap<u64, Task>>,
    tokens: RwLock<HashSet<Uuid>>,
    next_id: AtomicU64,
}

pub type Db = Arc<AppState>;

type Failure = (StatusCode, Json<ErrorBody>);

fn failure(status: StatusCode, message: &str) -> Failure {
    (
        status,
        Json(ErrorBody {
            message: message.to_string(),
        }),
    )
}

pub fn app() -> Router {
    let db: Db = Arc::new(AppState::default());
    Router::new()
        .route("/auth/login", post(login))
        .route("/tasks", get(list_tasks).post(create_task))
        .route("/tasks/{id}", get(get_task).put(update_task).delete(delete_task))
        .with_state(db)
}

pub async fn run(listener: TcpListener) -> Result<(), std::io::Error> {
    axum::serve(listener, app()).await
}

async fn authorize(db: &Db, headers: &HeaderMap) -> Result<(), Failure> {
    let token = headers
        .get("token")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| Uuid::parse_str(v).ok());
    let known = match token {
        Some(token) => db.tokens.read().await.contains(&token),
        None => false,
    };
    if known {
        Ok(())
    } else {
        Err(failure(StatusCode::UNAUTHORIZED, "missing or invalid token"))
    }
}

async fn login(State(db): State<Db>, Json(input): Json<Login>) -> Result<Json<Session>, Failure> {
    if input.email.is_empty() || input.password != PASSWORD {
        return Err(failure(StatusCode::UNAUTHORIZED, "invalid credentials"));
    }
    let token = Uuid::new_v4();
    db.tokens.write().await.insert(token);
    tracing::debug!(email = %input.email, "session opened");
    Ok(Json(Session {
        token: token.to_string(),
    }))
}

async fn list_tasks(
    State(db): State<Db>,
    headers: HeaderMap,
    Query(filter): Query<ListFilter>,
) -> Result<Json<Vec<Task>>, Failure> {
    authorize(&db, &headers).await?;
    let tasks = db.tasks.read().await;
    let matching = tasks
        .values()
        .filter(|t| filter.status.map_or(true, |s| t.status == s))
        .cloned()
        .collect();
    Ok(Json(matching))
}

async fn create_task(
    State(db): State<Db>,
    headers: HeaderMap,
    Json(input): Json<CreateTask>,
) -> Result<(StatusCode, Json<Task>), Failure> {
    authorize(&db, &headers).await?;
    let task = Task {
        id: db.next_id.fetch_add(1, Ordering::SeqCst) + 1,
        content: input.content,
        status: TaskStatus::Waiting,
    };
    db.tasks.write().await.insert(task.id, task.clone());
    Ok((StatusCode::CREATED, Json(task)))
}

async fn get_task(
    State(db): State<Db>,
    headers: HeaderMap,
    Path(id): Path<u64>,
) -> Result<Json<Task>, Failure> {
    authorize(&db, &headers).await?;
    let tasks = db.tasks.read().await;
    tasks
        .get(&id)
        .cloned()
        .map(Json)
        .ok_or_else(|| failure(StatusCode::NOT_FOUND, "task not found"))
}

async fn update_task(
    State(db): State<Db>,
    headers: HeaderMap,
    Path(id): Path<u64>,
    Json(input): Json<UpdateTask>,
) -> Result<Json<Task>, Failure> {
    authorize(&db, &headers).await?;
    let mut tasks = db.tasks.write().await;
    let task = tasks
        .get_mut(&id)
        .ok_or_else(|| failure(StatusCode::NOT_FOUND, "task not found"))?;
    if let Some(content) = input.content {
        task.content = content;
    }
    if let Some(status) = input.status {
        task.status = status;
    }
    Ok(Json(task.clone()))
}

async fn delete_task(
    State(db): State<Db>,
    headers: HeaderMap,
    Path(id): Path<u64>,
) -> Result<StatusCode, Failure> {
    authorize(&db, &headers).await?;
    let mut tasks = db.tasks.write().await;
    tasks
        .remove(&id)
        .map(|_| StatusCode::NO_CONTENT)
        .ok_or_else(|| failure(StatusCode::NOT_FOUND, "task not found"))
}
