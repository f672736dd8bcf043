use anyhow::{Context, Result};
use axum::body::{self, Body};
use axum::http::{Request, StatusCode};
use axum::response::Response;
use axum::Router;
use chrono::Utc;
use serde_json::{json, Value};
use sqlx::SqlitePool;
use tempfile::tempdir;
use tower::util::ServiceExt;
use uuid::Uuid;

use taskdesk::authz::Role;
use taskdesk::create_app;
use taskdesk::jwt::JwtConfig;
use taskdesk::utils::hash_password;

async fn setup() -> Result<(tempfile::TempDir, SqlitePool, Router)> {
    let dir = tempdir().context("failed to create tempdir")?;
    let db_path = dir.path().join("test_projects.db");
    use sqlx::sqlite::SqliteConnectOptions;
    let opts = SqliteConnectOptions::new()
        .filename(db_path.as_path())
        .create_if_missing(true);
    let pool = SqlitePool::connect_with(opts).await?;

    let migrator = sqlx::migrate::Migrator::new(std::path::Path::new(env!("CARGO_MANIFEST_DIR")).join("migrations"))
        .await?;
    migrator.run(&pool).await?;

    std::env::set_var("JWT_SECRET", "test-secret");
    let app = create_app(pool.clone()).await?;
    Ok((dir, pool, app))
}

async fn seed_user(pool: &SqlitePool, name: &str, email: &str, role: Role) -> Result<Uuid> {
    let id = Uuid::new_v4();
    let now = Utc::now();
    let hash = hash_password("password123").map_err(|e| anyhow::anyhow!(e.to_string()))?;
    sqlx::query(
        "INSERT INTO users (id, name, email, password_hash, role, is_active, created_at, updated_at) \
         VALUES (?, ?, ?, ?, ?, 1, ?, ?)",
    )
    .bind(id)
    .bind(name)
    .bind(email)
    .bind(hash)
    .bind(role.as_str())
    .bind(now)
    .bind(now)
    .execute(pool)
    .await?;
    Ok(id)
}

fn token_for(user_id: Uuid) -> Result<String> {
    let jwt = JwtConfig::from_env().map_err(|e| anyhow::anyhow!(e.to_string()))?;
    jwt.encode(user_id).map_err(|e| anyhow::anyhow!(e.to_string()))
}

async fn send(app: &Router, method: &str, uri: &str, token: &str, payload: Option<Value>) -> Result<Response> {
    let mut builder = Request::builder()
        .method(method)
        .uri(uri)
        .header("authorization", format!("Bearer {token}"));
    let body = match payload {
        Some(value) => {
            builder = builder.header("content-type", "application/json");
            Body::from(value.to_string())
        }
        None => Body::empty(),
    };
    Ok(app.clone().oneshot(builder.body(body)?).await?)
}

async fn json_body(resp: Response) -> Result<Value> {
    let bytes = body::to_bytes(resp.into_body(), 10_485_760).await?;
    Ok(serde_json::from_slice(&bytes)?)
}

async fn create_project(app: &Router, token: &str, name: &str, assigned_to: Option<Uuid>) -> Result<String> {
    let mut payload = json!({
        "name": name,
        "description": "d",
        "start_date": "2026-09-01",
        "end_date": "2026-12-15"
    });
    if let Some(assignee) = assigned_to {
        payload["assigned_to"] = json!(assignee);
    }
    let resp = send(app, "POST", "/projects", token, Some(payload)).await?;
    assert_eq!(resp.status(), StatusCode::CREATED);
    let v = json_body(resp).await?;
    Ok(v["id"].as_str().context("project id")?.to_string())
}

#[tokio::test]
async fn creator_scoping_between_admins() -> Result<()> {
    let (_dir, pool, app) = setup().await?;

    let admin_p = seed_user(&pool, "P", "p@example.com", Role::Admin).await?;
    let admin_q = seed_user(&pool, "Q", "q@example.com", Role::Admin).await?;

    let token_p = token_for(admin_p)?;
    let token_q = token_for(admin_q)?;

    let project_id = create_project(&app, &token_p, "P's project", None).await?;

    // The creator may update it
    let resp = send(
        &app,
        "PUT",
        &format!("/projects/{project_id}"),
        &token_p,
        Some(json!({"status": "in_progress"})),
    )
    .await?;
    assert_eq!(resp.status(), StatusCode::OK);

    // Another admin neither sees nor can touch it
    let resp = send(&app, "GET", &format!("/projects/{project_id}"), &token_q, None).await?;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    let resp = send(
        &app,
        "PUT",
        &format!("/projects/{project_id}"),
        &token_q,
        Some(json!({"status": "completed"})),
    )
    .await?;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);

    let resp = send(&app, "GET", "/projects", &token_q, None).await?;
    let v = json_body(resp).await?;
    assert_eq!(v.as_array().map(Vec::len), Some(0));

    Ok(())
}

#[tokio::test]
async fn assigned_super_user_may_edit_but_not_delete() -> Result<()> {
    let (_dir, pool, app) = setup().await?;

    let admin = seed_user(&pool, "Admin", "admin@example.com", Role::Admin).await?;
    let lead = seed_user(&pool, "Lead", "lead@example.com", Role::SuperUser).await?;

    let token_admin = token_for(admin)?;
    let token_lead = token_for(lead)?;

    let project_id = create_project(&app, &token_admin, "Assigned project", Some(lead)).await?;

    // Assignee sees and edits the project
    let resp = send(&app, "GET", &format!("/projects/{project_id}"), &token_lead, None).await?;
    assert_eq!(resp.status(), StatusCode::OK);
    let resp = send(
        &app,
        "PUT",
        &format!("/projects/{project_id}"),
        &token_lead,
        Some(json!({"status": "in_progress"})),
    )
    .await?;
    assert_eq!(resp.status(), StatusCode::OK);

    // The same assignee is refused deletion of a project it can edit
    let resp = send(&app, "DELETE", &format!("/projects/{project_id}"), &token_lead, None).await?;
    assert_eq!(resp.status(), StatusCode::FORBIDDEN);

    // The creating admin may delete it
    let resp = send(&app, "DELETE", &format!("/projects/{project_id}"), &token_admin, None).await?;
    assert_eq!(resp.status(), StatusCode::NO_CONTENT);

    Ok(())
}

#[tokio::test]
async fn plain_user_reads_assigned_projects_but_creates_nothing() -> Result<()> {
    let (_dir, pool, app) = setup().await?;

    let admin = seed_user(&pool, "Admin", "admin@example.com", Role::Admin).await?;
    let worker = seed_user(&pool, "Worker", "worker@example.com", Role::User).await?;

    let token_admin = token_for(admin)?;
    let token_worker = token_for(worker)?;

    let assigned = create_project(&app, &token_admin, "Assigned", Some(worker)).await?;
    let _other = create_project(&app, &token_admin, "Other", None).await?;

    // The API surface gives a plain user the assigned-to scope
    let resp = send(&app, "GET", "/projects", &token_worker, None).await?;
    let v = json_body(resp).await?;
    assert_eq!(v.as_array().map(Vec::len), Some(1));
    assert_eq!(v[0]["id"], assigned.as_str());

    // Creation is a role gate, not a visibility question
    let resp = send(
        &app,
        "POST",
        "/projects",
        &token_worker,
        Some(json!({
            "name": "Mine",
            "start_date": "2026-09-01",
            "end_date": "2026-09-30"
        })),
    )
    .await?;
    assert_eq!(resp.status(), StatusCode::FORBIDDEN);

    Ok(())
}

#[tokio::test]
async fn deleting_a_project_cascades_to_tasks_and_reports() -> Result<()> {
    let (_dir, pool, app) = setup().await?;

    let root = seed_user(&pool, "Root", "root@example.com", Role::SuperAdmin).await?;
    let token = token_for(root)?;

    let project_id = create_project(&app, &token, "Doomed", None).await?;

    let resp = send(
        &app,
        "POST",
        "/tasks",
        &token,
        Some(json!({
            "project_id": project_id,
            "name": "Doomed task",
            "due_date": "2026-10-01"
        })),
    )
    .await?;
    assert_eq!(resp.status(), StatusCode::CREATED);
    let task = json_body(resp).await?;
    let task_id = task["id"].as_str().context("task id")?.to_string();

    let resp = send(
        &app,
        "POST",
        "/reports",
        &token,
        Some(json!({"task_id": task_id, "details": "halfway"})),
    )
    .await?;
    assert_eq!(resp.status(), StatusCode::CREATED);
    let report = json_body(resp).await?;
    let report_id = report["id"].as_str().context("report id")?.to_string();

    let resp = send(&app, "DELETE", &format!("/projects/{project_id}"), &token, None).await?;
    assert_eq!(resp.status(), StatusCode::NO_CONTENT);

    for uri in [
        format!("/projects/{project_id}"),
        format!("/tasks/{task_id}"),
        format!("/reports/{report_id}"),
    ] {
        let resp = send(&app, "GET", &uri, &token, None).await?;
        assert_eq!(resp.status(), StatusCode::NOT_FOUND, "{uri} should be gone");
    }

    Ok(())
}
