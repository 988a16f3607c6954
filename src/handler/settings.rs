//! System settings, admin-only. Values are stored as strings and
//! validated against their declared `value_type` on update.

use axum::{
    extract::{Path, State},
    Json,
};
use chrono::Utc;
use rust_decimal::Decimal;

use crate::auth::{require_admin, CurrentUser};
use crate::database::{get_for_update, list_records, put_record, AppState, TABLE_SETTINGS};
use crate::error::ApiError;
use crate::model::{PatchSettingRequest, Setting};

fn validate_value(value_type: &str, value: &str) -> Result<(), ApiError> {
    let ok = match value_type {
        "int" => value.parse::<i64>().is_ok(),
        "float" => value.parse::<Decimal>().is_ok(),
        _ => true,
    };
    if !ok {
        return Err(ApiError::validation(format!(
            "Value must be a valid {value_type}"
        )));
    }
    Ok(())
}

pub async fn list_settings(
    State(state): State<AppState>,
    user: CurrentUser,
) -> Result<Json<Vec<Setting>>, ApiError> {
    require_admin(&user.0)?;

    let mut settings: Vec<Setting> = list_records(&state.db, TABLE_SETTINGS)?;
    settings.sort_by(|a, b| a.key.cmp(&b.key));
    Ok(Json(settings))
}

pub async fn patch_setting(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<u64>,
    Json(payload): Json<PatchSettingRequest>,
) -> Result<Json<Setting>, ApiError> {
    require_admin(&user.0)?;

    let write_txn = state.db.begin_write()?;
    let setting = {
        let mut setting: Setting = get_for_update(&write_txn, TABLE_SETTINGS, id)?
            .ok_or_else(|| ApiError::not_found("Setting not found"))?;
        validate_value(&setting.value_type, &payload.value)?;

        setting.value = payload.value;
        setting.updated_at = Utc::now();
        put_record(&write_txn, TABLE_SETTINGS, id, &setting)?;
        setting
    };
    write_txn.commit()?;

    Ok(Json(setting))
}
