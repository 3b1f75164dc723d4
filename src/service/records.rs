use serde::Deserialize;
use tracing::info;
use utoipa::ToSchema;

use super::validation::{check_notes, non_empty, parse_status};
use crate::error::{AppError, AppResult};
use crate::model::{attendance::AttendanceEntry, role::Principal};
use crate::store::SchoolStore;

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct UpdateAttendance {
    #[schema(example = "late")]
    pub status: String,
    #[serde(default)]
    #[schema(nullable = true)]
    pub notes: Option<String>,
}

/// Loads a record the principal may see: any for admins, own rows for teachers.
async fn visible_record(store: &dyn SchoolStore, principal: &Principal, id: u64) -> AppResult<AttendanceEntry> {
    let entry = store
        .find_attendance(id)
        .await?
        .ok_or_else(|| AppError::not_found("Attendance record"))?;

    match principal.teacher_scope() {
        Some(teacher_id) if entry.teacher_id != teacher_id => {
            Err(AppError::forbidden("Attendance record belongs to another teacher"))
        }
        _ => Ok(entry),
    }
}

pub async fn show_attendance(store: &dyn SchoolStore, principal: &Principal, id: u64) -> AppResult<AttendanceEntry> {
    visible_record(store, principal, id).await
}

/// Changes status and notes in place. The key and marking teacher stay as they are.
pub async fn update_attendance(
    store: &dyn SchoolStore,
    principal: &Principal,
    id: u64,
    payload: UpdateAttendance,
) -> AppResult<AttendanceEntry> {
    let status = parse_status("status", &payload.status)?;
    let notes = non_empty(payload.notes);
    check_notes("notes", notes.as_deref())?;

    visible_record(store, principal, id).await?;

    if !store.update_attendance(id, status, notes).await? {
        return Err(AppError::not_found("Attendance record"));
    }
    info!(attendance_id = id, actor = principal.id, %status, "Attendance updated");

    store
        .find_attendance(id)
        .await?
        .ok_or_else(|| AppError::not_found("Attendance record"))
}

pub async fn destroy_attendance(store: &dyn SchoolStore, principal: &Principal, id: u64) -> AppResult<()> {
    principal.require_admin()?;
    if !store.delete_attendance(id).await? {
        return Err(AppError::not_found("Attendance record"));
    }
    info!(attendance_id = id, actor = principal.id, "Attendance deleted");
    Ok(())
}
