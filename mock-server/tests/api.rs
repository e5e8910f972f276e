use axum::http::{self, Request, StatusCode};
use axum::routing::RouterIntoService;
use axum::Router;
use http_body_util::BodyExt;
use mock_server::{app, ErrorBody, Session, Task, TaskStatus, PASSWORD};
use tower::{Service, ServiceExt};

async fn body_json<T: serde::de::DeserializeOwned>(response: axum::response::Response) -> T {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

async fn body_bytes(response: axum::response::Response) -> bytes::Bytes {
    response.into_body().collect().await.unwrap().to_bytes()
}

fn json_request(method: &str, uri: &str, token: Option<&str>, body: &str) -> Request<String> {
    let mut builder = Request::builder()
        .method(method)
        .uri(uri)
        .header(http::header::CONTENT_TYPE, "application/json");
    if let Some(token) = token {
        builder = builder.header("token", token);
    }
    builder.body(body.to_string()).unwrap()
}

fn authed(method: &str, uri: &str, token: &str) -> Request<String> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header("token", token)
        .body(String::new())
        .unwrap()
}

type App = RouterIntoService<String>;

async fn send(app: &mut App, req: Request<String>) -> axum::response::Response {
    ServiceExt::ready(app).await.unwrap().call(req).await.unwrap()
}

async fn login(app: &mut App) -> String {
    let body = format!(r#"{{"email":"a@b.c","password":"{PASSWORD}"}}"#);
    let resp = send(app, json_request("POST", "/auth/login", None, &body)).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let session: Session = body_json(resp).await;
    session.token
}

fn service() -> App {
    let router: Router = app();
    router.into_service()
}

// --- auth ---

#[tokio::test]
async fn login_with_wrong_password_returns_401() {
    let resp = app()
        .oneshot(json_request(
            "POST",
            "/auth/login",
            None,
            r#"{"email":"a@b.c","password":"nope"}"#,
        ))
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    let err: ErrorBody = body_json(resp).await;
    assert_eq!(err.message, "invalid credentials");
}

#[tokio::test]
async fn login_missing_password_returns_422() {
    let resp = app()
        .oneshot(json_request("POST", "/auth/login", None, r#"{"email":"a@b.c"}"#))
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::UNPROCESSABLE_ENTITY);
}

#[tokio::test]
async fn tasks_without_token_return_401() {
    let resp = app()
        .oneshot(Request::builder().uri("/tasks").body(String::new()).unwrap())
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    let err: ErrorBody = body_json(resp).await;
    assert_eq!(err.message, "missing or invalid token");
}

#[tokio::test]
async fn tasks_with_unknown_token_return_401() {
    let resp = app()
        .oneshot(authed("GET", "/tasks", "00000000-0000-0000-0000-000000000000"))
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
}

// --- tasks ---

#[tokio::test]
async fn get_task_not_found() {
    let mut app = service();
    let token = login(&mut app).await;
    let resp = send(&mut app, authed("GET", "/tasks/99", &token)).await;

    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn get_task_bad_id_returns_400() {
    let mut app = service();
    let token = login(&mut app).await;
    let resp = send(&mut app, authed("GET", "/tasks/not-a-number", &token)).await;

    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn list_filters_by_status() {
    let mut app = service();
    let token = login(&mut app).await;

    for content in ["a", "b"] {
        let body = format!(r#"{{"content":"{content}"}}"#);
        let resp = send(&mut app, json_request("POST", "/tasks", Some(&token), &body)).await;
        assert_eq!(resp.status(), StatusCode::CREATED);
    }
    let resp = send(
        &mut app,
        json_request("PUT", "/tasks/2", Some(&token), r#"{"status":"done"}"#),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::OK);

    let resp = send(&mut app, authed("GET", "/tasks?status=done", &token)).await;
    let tasks: Vec<Task> = body_json(resp).await;
    assert_eq!(tasks.len(), 1);
    assert_eq!(tasks[0].id, 2);

    let resp = send(&mut app, authed("GET", "/tasks?status=later", &token)).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
}

// --- full CRUD lifecycle ---

#[tokio::test]
async fn crud_lifecycle() {
    let mut app = service();
    let token = login(&mut app).await;

    // create
    let resp = send(
        &mut app,
        json_request("POST", "/tasks", Some(&token), r#"{"content":"Walk dog"}"#),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::CREATED);
    let created: Task = body_json(resp).await;
    assert_eq!(created.content, "Walk dog");
    assert_eq!(created.status, TaskStatus::Waiting);
    let id = created.id;

    // list
    let resp = send(&mut app, authed("GET", "/tasks", &token)).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let tasks: Vec<Task> = body_json(resp).await;
    assert_eq!(tasks, vec![created.clone()]);

    // update: only status
    let resp = send(
        &mut app,
        json_request("PUT", &format!("/tasks/{id}"), Some(&token), r#"{"status":"doing"}"#),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::OK);
    let updated: Task = body_json(resp).await;
    assert_eq!(updated.content, "Walk dog");
    assert_eq!(updated.status, TaskStatus::Doing);

    // get
    let resp = send(&mut app, authed("GET", &format!("/tasks/{id}"), &token)).await;
    let fetched: Task = body_json(resp).await;
    assert_eq!(fetched, updated);

    // delete
    let resp = send(&mut app, authed("DELETE", &format!("/tasks/{id}"), &token)).await;
    assert_eq!(resp.status(), StatusCode::NO_CONTENT);
    assert!(body_bytes(resp).await.is_empty());

    // delete again
    let resp = send(&mut app, authed("DELETE", &format!("/tasks/{id}"), &token)).await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);

    // list after delete
    let resp = send(&mut app, authed("GET", "/tasks", &token)).await;
    let tasks: Vec<Task> = body_json(resp).await;
    assert!(tasks.is_empty());
}
