//! User management - the administrative surface.
//!
//! Listing is scoped by the caller's role, creation is limited to roles the
//! caller may assign, and modify/delete go through `can_manage_user`. A
//! deleted user is soft-deleted and unlinked from anything still assigned
//! to them.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use uuid::Uuid;

use crate::app::AppState;
use crate::errors::{AppError, AppResult};
use crate::jwt::AuthUser;
use crate::models::user::{User, UserCreateRequest, UserUpdateRequest};
use crate::store;
use crate::utils::{hash_password, utc_now};

#[utoipa::path(
    get,
    path = "/users",
    tag = "Users",
    responses((status = 200, description = "List manageable users", body = [User])),
    security(("bearerAuth" = []))
)]
pub async fn list_users(State(state): State<AppState>, auth: AuthUser) -> AppResult<Json<Vec<User>>> {
    let filter = state.engine.user_filter(Some(&auth.principal));
    let users: Vec<User> = store::list_users(&state.pool, filter)
        .await?
        .into_iter()
        .map(User::try_from)
        .collect::<Result<_, _>>()?;

    Ok(Json(users))
}

#[utoipa::path(
    post,
    path = "/users",
    tag = "Users",
    request_body = UserCreateRequest,
    responses(
        (status = 201, description = "User created", body = User),
        (status = 403, description = "Role not assignable by the caller"),
        (status = 409, description = "Email already in use")
    ),
    security(("bearerAuth" = []))
)]
pub async fn create_user(
    State(state): State<AppState>,
    auth: AuthUser,
    Json(payload): Json<UserCreateRequest>,
) -> AppResult<(StatusCode, Json<User>)> {
    if !state.engine.can_add_user(Some(&auth.principal)).is_allow() {
        return Err(AppError::forbidden("not allowed to add users"));
    }
    if !state
        .engine
        .assignable_roles(Some(&auth.principal))
        .contains(&payload.role)
    {
        return Err(AppError::forbidden(format!(
            "not allowed to assign the {} role",
            payload.role
        )));
    }

    let count: i64 = sqlx::query_scalar("SELECT COUNT(1) FROM users WHERE email = ? AND deleted_at IS NULL")
        .bind(&payload.email)
        .fetch_one(&state.pool)
        .await?;
    if count > 0 {
        return Err(AppError::conflict("email already in use"));
    }

    let password_hash = hash_password(&payload.password)?;
    let now = utc_now();
    let user_id = Uuid::new_v4();

    sqlx::query(
        "INSERT INTO users (id, name, email, password_hash, role, is_active, created_at, updated_at) \
         VALUES (?, ?, ?, ?, ?, ?, ?, ?)",
    )
    .bind(user_id)
    .bind(&payload.name)
    .bind(&payload.email)
    .bind(password_hash)
    .bind(payload.role.as_str())
    .bind(true)
    .bind(now)
    .bind(now)
    .execute(&state.pool)
    .await?;

    let user: User = store::fetch_user(&state.pool, user_id).await?.try_into()?;

    Ok((StatusCode::CREATED, Json(user)))
}

#[utoipa::path(
    get,
    path = "/users/{id}",
    tag = "Users",
    params(("id" = Uuid, Path, description = "User id")),
    responses((status = 200, description = "User detail", body = User)),
    security(("bearerAuth" = []))
)]
pub async fn get_user(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<Uuid>,
) -> AppResult<Json<User>> {
    let user: User = store::fetch_user(&state.pool, id).await?.try_into()?;

    let filter = state.engine.user_filter(Some(&auth.principal));
    if !filter.permits(user.role) {
        return Err(AppError::not_found("user not found"));
    }

    Ok(Json(user))
}

#[utoipa::path(
    put,
    path = "/users/{id}",
    tag = "Users",
    params(("id" = Uuid, Path, description = "User id")),
    request_body = UserUpdateRequest,
    responses(
        (status = 200, description = "User updated", body = User),
        (status = 403, description = "Target outside the caller's management scope")
    ),
    security(("bearerAuth" = []))
)]
pub async fn update_user(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<UserUpdateRequest>,
) -> AppResult<Json<User>> {
    let mut user: User = store::fetch_user(&state.pool, id).await?.try_into()?;

    if !state
        .engine
        .can_manage_user(Some(&auth.principal), user.role)
        .is_allow()
    {
        return Err(AppError::forbidden("not allowed to manage this user"));
    }

    if let Some(name) = payload.name {
        user.name = name;
    }
    if let Some(email) = payload.email {
        user.email = email;
    }
    if let Some(role) = payload.role {
        if !state
            .engine
            .assignable_roles(Some(&auth.principal))
            .contains(&role)
        {
            return Err(AppError::forbidden(format!(
                "not allowed to assign the {} role",
                role
            )));
        }
        user.role = role;
    }
    if let Some(is_active) = payload.is_active {
        user.is_active = is_active;
    }

    let now = utc_now();
    sqlx::query(
        "UPDATE users SET name = ?, email = ?, role = ?, is_active = ?, updated_at = ? \
         WHERE id = ? AND deleted_at IS NULL",
    )
    .bind(&user.name)
    .bind(&user.email)
    .bind(user.role.as_str())
    .bind(user.is_active)
    .bind(now)
    .bind(user.id)
    .execute(&state.pool)
    .await?;

    user.updated_at = now;
    Ok(Json(user))
}

#[utoipa::path(
    delete,
    path = "/users/{id}",
    tag = "Users",
    params(("id" = Uuid, Path, description = "User id")),
    responses(
        (status = 204, description = "User soft deleted"),
        (status = 403, description = "Target outside the caller's management scope")
    ),
    security(("bearerAuth" = []))
)]
pub async fn delete_user(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<Uuid>,
) -> AppResult<StatusCode> {
    let user: User = store::fetch_user(&state.pool, id).await?.try_into()?;

    if !state
        .engine
        .can_manage_user(Some(&auth.principal), user.role)
        .is_allow()
    {
        return Err(AppError::forbidden("not allowed to manage this user"));
    }

    // Unlink assignments before retiring the account so nothing keeps
    // pointing at a deleted user.
    let now = utc_now();
    let mut tx = state.pool.begin().await?;

    sqlx::query("UPDATE projects SET assigned_to = NULL, updated_at = ? WHERE assigned_to = ? AND deleted_at IS NULL")
        .bind(now)
        .bind(user.id)
        .execute(&mut *tx)
        .await?;
    sqlx::query("UPDATE tasks SET assigned_to = NULL, updated_at = ? WHERE assigned_to = ? AND deleted_at IS NULL")
        .bind(now)
        .bind(user.id)
        .execute(&mut *tx)
        .await?;

    let affected = sqlx::query("UPDATE users SET deleted_at = ?, updated_at = ? WHERE id = ? AND deleted_at IS NULL")
        .bind(now)
        .bind(now)
        .bind(user.id)
        .execute(&mut *tx)
        .await?;

    if affected.rows_affected() == 0 {
        return Err(AppError::not_found("user not found"));
    }

    tx.commit().await?;

    Ok(StatusCode::NO_CONTENT)
}
