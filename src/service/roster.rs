use std::collections::HashMap;

use serde::Serialize;
use utoipa::ToSchema;

use crate::error::{AppError, AppResult};
use crate::model::{attendance::AttendanceStatus, student::Student};
use crate::store::SchoolStore;

/// A student eligible for marking, with the status the form starts from.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct RosterEntry {
    #[serde(flatten)]
    pub student: Student,
    pub status: AttendanceStatus,
}

/// Active students of `class_id` ordered by first name, then id.
///
/// Each starts as present unless `overrides` carries a status for it.
pub async fn resolve_roster(
    store: &dyn SchoolStore,
    class_id: u64,
    subject_id: u64,
    overrides: &HashMap<u64, AttendanceStatus>,
) -> AppResult<Vec<RosterEntry>> {
    if store.find_class(class_id).await?.is_none() {
        return Err(AppError::referential("class_id"));
    }
    if store.find_subject(subject_id).await?.is_none() {
        return Err(AppError::referential("subject_id"));
    }

    let roster = store
        .active_students_in_class(class_id)
        .await?
        .into_iter()
        .map(|student| RosterEntry {
            status: overrides.get(&student.id).copied().unwrap_or_default(),
            student,
        })
        .collect();

    Ok(roster)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::student::StudentStatus;
    use crate::store::MemoryStore;

    #[actix_web::test]
    async fn only_active_students_in_first_name_order() {
        let store = MemoryStore::new();
        let class = store.add_class("Grade 9", None, 9);
        let other = store.add_class("Grade 8", None, 8);
        let subject = store.add_subject("Science", "SCI9");

        let zara = store.add_student("S-1", "Zara", "Ali", class, StudentStatus::Active);
        store.add_student("S-2", "Basil", "Noor", class, StudentStatus::Inactive);
        let amy_b = store.add_student("S-3", "Amy", "Baker", class, StudentStatus::Active);
        store.add_student("S-4", "Carl", "Dunn", class, StudentStatus::Graduated);
        let amy_a = store.add_student("S-5", "Amy", "Adams", class, StudentStatus::Active);
        store.add_student("S-6", "Abe", "Other", other, StudentStatus::Active);

        let roster = resolve_roster(&store, class, subject, &HashMap::new()).await.unwrap();
        let ids: Vec<u64> = roster.iter().map(|e| e.student.id).collect();

        // equal first names fall back to id order
        assert_eq!(ids, vec![amy_b, amy_a, zara]);
        assert!(roster.iter().all(|e| e.status == AttendanceStatus::Present));
    }

    #[actix_web::test]
    async fn overrides_replace_the_default_status() {
        let store = MemoryStore::new();
        let class = store.add_class("Grade 9", None, 9);
        let subject = store.add_subject("Science", "SCI9");
        let a = store.add_student("S-1", "Ann", "One", class, StudentStatus::Active);
        let b = store.add_student("S-2", "Ben", "Two", class, StudentStatus::Active);

        let overrides = HashMap::from([(b, AttendanceStatus::Late)]);
        let roster = resolve_roster(&store, class, subject, &overrides).await.unwrap();

        let status_of = |id| roster.iter().find(|e| e.student.id == id).map(|e| e.status);
        assert_eq!(status_of(a), Some(AttendanceStatus::Present));
        assert_eq!(status_of(b), Some(AttendanceStatus::Late));
    }

    #[actix_web::test]
    async fn empty_class_yields_empty_roster() {
        let store = MemoryStore::new();
        let class = store.add_class("Grade 1", None, 1);
        let subject = store.add_subject("Art", "ART1");

        let roster = resolve_roster(&store, class, subject, &HashMap::new()).await.unwrap();
        assert!(roster.is_empty());
    }

    #[actix_web::test]
    async fn unknown_class_is_a_validation_error() {
        let store = MemoryStore::new();
        let subject = store.add_subject("Art", "ART1");

        let err = resolve_roster(&store, 77, subject, &HashMap::new()).await.unwrap_err();
        assert_eq!(err, AppError::referential("class_id"));
    }
}
