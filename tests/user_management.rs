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
    let db_path = dir.path().join("test_users.db");
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

#[tokio::test]
async fn listing_is_scoped_by_role() -> Result<()> {
    let (_dir, pool, app) = setup().await?;

    let root = seed_user(&pool, "Root", "root@example.com", Role::SuperAdmin).await?;
    let admin = seed_user(&pool, "Admin", "admin@example.com", Role::Admin).await?;
    let lead = seed_user(&pool, "Lead", "lead@example.com", Role::SuperUser).await?;
    let worker = seed_user(&pool, "Worker", "worker@example.com", Role::User).await?;

    // Super admin sees all four accounts
    let resp = send(&app, "GET", "/users", &token_for(root)?, None).await?;
    assert_eq!(resp.status(), StatusCode::OK);
    let v = json_body(resp).await?;
    assert_eq!(v.as_array().map(Vec::len), Some(4));

    // Admin sees only super users and users
    let resp = send(&app, "GET", "/users", &token_for(admin)?, None).await?;
    let v = json_body(resp).await?;
    let roles: Vec<&str> = v
        .as_array()
        .context("expected array")?
        .iter()
        .filter_map(|u| u["role"].as_str())
        .collect();
    assert_eq!(roles.len(), 2);
    assert!(roles.iter().all(|r| *r == "super_user" || *r == "user"));

    // Super user sees only plain users
    let resp = send(&app, "GET", "/users", &token_for(lead)?, None).await?;
    let v = json_body(resp).await?;
    assert_eq!(v.as_array().map(Vec::len), Some(1));
    assert_eq!(v[0]["role"], "user");

    // A plain user sees an empty listing
    let resp = send(&app, "GET", "/users", &token_for(worker)?, None).await?;
    let v = json_body(resp).await?;
    assert_eq!(v.as_array().map(Vec::len), Some(0));

    Ok(())
}

#[tokio::test]
async fn admin_cannot_touch_peers_or_above() -> Result<()> {
    let (_dir, pool, app) = setup().await?;

    let admin = seed_user(&pool, "Admin", "admin@example.com", Role::Admin).await?;
    let other_admin = seed_user(&pool, "Other", "other@example.com", Role::Admin).await?;
    let root = seed_user(&pool, "Root", "root@example.com", Role::SuperAdmin).await?;
    let worker = seed_user(&pool, "Worker", "worker@example.com", Role::User).await?;

    let token = token_for(admin)?;

    let resp = send(&app, "PUT", &format!("/users/{other_admin}"), &token, Some(json!({"name": "X"}))).await?;
    assert_eq!(resp.status(), StatusCode::FORBIDDEN);

    let resp = send(&app, "DELETE", &format!("/users/{root}"), &token, None).await?;
    assert_eq!(resp.status(), StatusCode::FORBIDDEN);

    // A subordinate account is fair game
    let resp = send(&app, "PUT", &format!("/users/{worker}"), &token, Some(json!({"name": "Renamed"}))).await?;
    assert_eq!(resp.status(), StatusCode::OK);
    let v = json_body(resp).await?;
    assert_eq!(v["name"], "Renamed");

    // Super admin may touch anyone, including admins
    let resp = send(
        &app,
        "PUT",
        &format!("/users/{other_admin}"),
        &token_for(root)?,
        Some(json!({"is_active": false})),
    )
    .await?;
    assert_eq!(resp.status(), StatusCode::OK);

    Ok(())
}

#[tokio::test]
async fn role_assignment_respects_the_assignable_set() -> Result<()> {
    let (_dir, pool, app) = setup().await?;

    let admin = seed_user(&pool, "Admin", "admin@example.com", Role::Admin).await?;
    let lead = seed_user(&pool, "Lead", "lead@example.com", Role::SuperUser).await?;
    let worker = seed_user(&pool, "Worker", "worker@example.com", Role::User).await?;

    // Admin may create a super user...
    let resp = send(
        &app,
        "POST",
        "/users",
        &token_for(admin)?,
        Some(json!({
            "name": "New Lead",
            "email": "newlead@example.com",
            "password": "password123",
            "role": "super_user"
        })),
    )
    .await?;
    assert_eq!(resp.status(), StatusCode::CREATED);

    // ...but not a peer admin
    let resp = send(
        &app,
        "POST",
        "/users",
        &token_for(admin)?,
        Some(json!({
            "name": "New Admin",
            "email": "newadmin@example.com",
            "password": "password123",
            "role": "admin"
        })),
    )
    .await?;
    assert_eq!(resp.status(), StatusCode::FORBIDDEN);

    // Promotion past the assignable set is refused even on a manageable target
    let resp = send(
        &app,
        "PUT",
        &format!("/users/{worker}"),
        &token_for(lead)?,
        Some(json!({"role": "super_user"})),
    )
    .await?;
    assert_eq!(resp.status(), StatusCode::FORBIDDEN);

    // A plain user cannot create accounts at all
    let resp = send(
        &app,
        "POST",
        "/users",
        &token_for(worker)?,
        Some(json!({
            "name": "Nope",
            "email": "nope@example.com",
            "password": "password123",
            "role": "user"
        })),
    )
    .await?;
    assert_eq!(resp.status(), StatusCode::FORBIDDEN);

    Ok(())
}

#[tokio::test]
async fn deleting_a_user_clears_their_assignments() -> Result<()> {
    let (_dir, pool, app) = setup().await?;

    let root = seed_user(&pool, "Root", "root@example.com", Role::SuperAdmin).await?;
    let worker = seed_user(&pool, "Worker", "worker@example.com", Role::User).await?;
    let token = token_for(root)?;

    let resp = send(
        &app,
        "POST",
        "/projects",
        &token,
        Some(json!({
            "name": "Survey",
            "description": "d",
            "assigned_to": worker,
            "start_date": "2026-09-01",
            "end_date": "2026-12-15"
        })),
    )
    .await?;
    assert_eq!(resp.status(), StatusCode::CREATED);
    let project = json_body(resp).await?;
    let project_id = project["id"].as_str().context("project id")?.to_string();

    let resp = send(
        &app,
        "POST",
        "/tasks",
        &token,
        Some(json!({
            "project_id": project_id,
            "name": "Count parcels",
            "assigned_to": worker,
            "due_date": "2026-10-01"
        })),
    )
    .await?;
    assert_eq!(resp.status(), StatusCode::CREATED);
    let task = json_body(resp).await?;
    let task_id = task["id"].as_str().context("task id")?.to_string();

    let resp = send(&app, "DELETE", &format!("/users/{worker}"), &token, None).await?;
    assert_eq!(resp.status(), StatusCode::NO_CONTENT);

    let resp = send(&app, "GET", &format!("/projects/{project_id}"), &token, None).await?;
    let v = json_body(resp).await?;
    assert!(v["assigned_to"].is_null(), "project assignment should be cleared");

    let resp = send(&app, "GET", &format!("/tasks/{task_id}"), &token, None).await?;
    let v = json_body(resp).await?;
    assert!(v["assigned_to"].is_null(), "task assignment should be cleared");

    // The account itself is gone
    let resp = send(&app, "GET", &format!("/users/{worker}"), &token, None).await?;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);

    Ok(())
}
