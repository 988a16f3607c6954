//! User administration: listing, role changes, deactivation, password
//! management, and owner-created admin accounts.
//!
//! The rank order STUDENT < ADMIN < OWNER gates every mutation here: a
//! caller can only act on accounts strictly below their own rank.

use axum::{
    extract::{Path, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use chrono::Utc;
use serde_json::json;

use crate::auth::{hash_password, require_admin, require_owner, verify_password, CurrentUser};
use crate::database::{
    delete_record, get_for_update, get_record, list_for_update, list_records, next_id,
    put_record, AppState, TABLE_USERS,
};
use crate::error::ApiError;
use crate::handler::analytics::log_action;
use crate::model::{
    ChangePasswordRequest, PatchUserRequest, RegisterAdminRequest, Role, User, UserOut,
};

fn rank(role: Role) -> u8 {
    match role {
        Role::Student => 0,
        Role::Admin => 1,
        Role::Owner => 2,
    }
}

/// True when `actor` outranks `target` and may manage the account.
fn can_manage(actor: &User, target: &User) -> bool {
    rank(actor.role) > rank(target.role)
}

/// Owners see everyone, admins see students, students see themselves.
pub async fn list_users(
    State(state): State<AppState>,
    user: CurrentUser,
) -> Result<Json<Vec<UserOut>>, ApiError> {
    let users: Vec<User> = list_records(&state.db, TABLE_USERS)?;
    let visible = users.iter().filter(|u| match user.0.role {
        Role::Owner => true,
        Role::Admin => u.role == Role::Student || u.id == user.0.id,
        Role::Student => u.id == user.0.id,
    });

    Ok(Json(visible.map(UserOut::from).collect()))
}

pub async fn patch_user(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<u64>,
    Json(payload): Json<PatchUserRequest>,
) -> Result<Json<UserOut>, ApiError> {
    require_admin(&user.0)?;

    let write_txn = state.db.begin_write()?;
    let target = {
        let mut target: User = get_for_update(&write_txn, TABLE_USERS, id)?
            .ok_or_else(|| ApiError::not_found("User not found"))?;
        if !can_manage(&user.0, &target) {
            return Err(ApiError::forbidden("Permission denied"));
        }

        if let Some(role) = payload.role {
            // Only the owner can promote or demote
            require_owner(&user.0)?;
            if role == Role::Owner {
                return Err(ApiError::validation("Cannot assign the owner role"));
            }
            target.role = role;
        }
        if let Some(email) = payload.email {
            let users: Vec<User> = list_for_update(&write_txn, TABLE_USERS)?;
            if users.iter().any(|u| u.id != target.id && u.email == email) {
                return Err(ApiError::conflict("Email already in use"));
            }
            target.email = email;
        }
        if let Some(roll_number) = payload.roll_number {
            target.roll_number = Some(roll_number);
        }
        if let Some(avatar) = payload.avatar {
            target.avatar = Some(avatar);
        }

        put_record(&write_txn, TABLE_USERS, id, &target)?;
        target
    };
    write_txn.commit()?;

    Ok(Json(UserOut::from(&target)))
}

pub async fn delete_user(
    State(state): State<AppState>,
    user: CurrentUser,
    headers: HeaderMap,
    Path(id): Path<u64>,
) -> Result<StatusCode, ApiError> {
    require_admin(&user.0)?;

    let write_txn = state.db.begin_write()?;
    let deleted = {
        let target: User = get_for_update(&write_txn, TABLE_USERS, id)?
            .ok_or_else(|| ApiError::not_found("User not found"))?;
        if !can_manage(&user.0, &target) {
            return Err(ApiError::forbidden("Permission denied"));
        }
        delete_record(&write_txn, TABLE_USERS, id)?;
        target
    };
    write_txn.commit()?;

    log_action(
        &state.db,
        &user.0.username,
        "DELETE_USER",
        &format!("deleted user '{}'", deleted.username),
        Some(&headers),
    );
    Ok(StatusCode::NO_CONTENT)
}

/// Self-change requires the current password; changing someone else's
/// password follows the rank rule and skips that check.
pub async fn change_password(
    State(state): State<AppState>,
    user: CurrentUser,
    Json(payload): Json<ChangePasswordRequest>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let target_id = payload.user_id.unwrap_or(user.0.id);
    let self_change = target_id == user.0.id;

    if payload.new_password.len() < 8 {
        return Err(ApiError::validation("Password must be at least 8 characters"));
    }

    if self_change {
        let current = payload
            .current_password
            .as_deref()
            .ok_or_else(|| ApiError::validation("Current password is required"))?;
        if !verify_password(current, &user.0.password_hash) {
            return Err(ApiError::validation("Current password is incorrect"));
        }
    } else {
        let target: User = get_record(&state.db, TABLE_USERS, target_id)?
            .ok_or_else(|| ApiError::not_found("User not found"))?;
        if !can_manage(&user.0, &target) {
            return Err(ApiError::forbidden("Permission denied"));
        }
    }

    let password_hash = hash_password(&payload.new_password)?;
    let write_txn = state.db.begin_write()?;
    {
        let mut target: User = get_for_update(&write_txn, TABLE_USERS, target_id)?
            .ok_or_else(|| ApiError::not_found("User not found"))?;
        target.password_hash = password_hash;
        put_record(&write_txn, TABLE_USERS, target_id, &target)?;
    }
    write_txn.commit()?;

    Ok(Json(json!({ "detail": "Password changed successfully" })))
}

pub async fn toggle_activation(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<u64>,
) -> Result<Json<serde_json::Value>, ApiError> {
    require_admin(&user.0)?;

    let write_txn = state.db.begin_write()?;
    let target = {
        let mut target: User = get_for_update(&write_txn, TABLE_USERS, id)?
            .ok_or_else(|| ApiError::not_found("User not found"))?;
        if !can_manage(&user.0, &target) {
            return Err(ApiError::forbidden("Permission denied"));
        }

        target.is_active = !target.is_active;
        put_record(&write_txn, TABLE_USERS, id, &target)?;
        target
    };
    write_txn.commit()?;

    let detail = if target.is_active {
        format!("User '{}' activated", target.username)
    } else {
        format!("User '{}' deactivated", target.username)
    };
    Ok(Json(json!({ "detail": detail, "is_active": target.is_active })))
}

pub async fn register_admin(
    State(state): State<AppState>,
    user: CurrentUser,
    Json(payload): Json<RegisterAdminRequest>,
) -> Result<Response, ApiError> {
    require_owner(&user.0)?;

    if payload.username.trim().is_empty() {
        return Err(ApiError::validation("Username is required"));
    }
    if payload.password.len() < 8 {
        return Err(ApiError::validation("Password must be at least 8 characters"));
    }

    let password_hash = hash_password(&payload.password)?;
    let write_txn = state.db.begin_write()?;
    let admin = {
        let users: Vec<User> = list_for_update(&write_txn, TABLE_USERS)?;
        if users.iter().any(|u| u.username == payload.username) {
            return Err(ApiError::conflict("Username already taken"));
        }
        if !payload.email.is_empty() && users.iter().any(|u| u.email == payload.email) {
            return Err(ApiError::conflict("Email already in use"));
        }

        let id = next_id(&write_txn, "users")?;
        let admin = User {
            id,
            username: payload.username,
            email: payload.email,
            password_hash,
            role: Role::Admin,
            roll_number: None,
            avatar: None,
            is_active: true,
            created_at: Utc::now(),
        };
        put_record(&write_txn, TABLE_USERS, id, &admin)?;
        admin
    };
    write_txn.commit()?;

    Ok((StatusCode::CREATED, Json(UserOut::from(&admin))).into_response())
}
