//! Bulk recording of one session's attendance.

use std::collections::HashSet;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tracing::{info, instrument};
use utoipa::ToSchema;

use super::validation::{check_notes, non_empty, parse_status};
use crate::error::{AppError, AppResult};
use crate::model::{attendance::NewAttendance, role::Principal};
use crate::store::SchoolStore;

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct StudentMark {
    #[schema(example = 1)]
    pub student_id: u64,
    /// One of present, absent, late, excused.
    #[schema(example = "present")]
    pub status: String,
    #[serde(default)]
    #[schema(nullable = true)]
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Deserialize, ToSchema)]
#[schema(example = json!({
    "class_id": 5,
    "subject_id": 2,
    "date": "2024-03-01",
    "students": [
        { "student_id": 1, "status": "present" },
        { "student_id": 2, "status": "absent", "notes": "sick note pending" }
    ]
}))]
pub struct RecordSession {
    pub class_id: u64,
    pub subject_id: u64,
    pub date: NaiveDate,
    #[serde(default)]
    pub students: Vec<StudentMark>,
}

/// Whether a teacher must hold a matching assignment to record a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AssignmentPolicy {
    #[default]
    Enforce,
    /// Any teacher may record any class/subject pair.
    Trust,
}

impl AssignmentPolicy {
    pub fn enforced(enforce: bool) -> Self {
        if enforce { Self::Enforce } else { Self::Trust }
    }
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct RecordOutcome {
    #[schema(example = "Attendance recorded successfully.")]
    pub message: String,
    #[schema(example = 2)]
    pub recorded: u64,
}

/// Validates `session` and upserts one row per student, all or nothing.
///
/// Rows are keyed on (student, subject, class, date). An existing row keeps
/// its id and creation time; status, notes and the marking teacher are
/// replaced by this submission.
#[instrument(
    name = "record_session",
    skip(store, session),
    fields(
        actor = principal.id,
        class_id = session.class_id,
        subject_id = session.subject_id,
        date = %session.date,
        entries = session.students.len()
    )
)]
pub async fn record_session(
    store: &dyn SchoolStore,
    principal: &Principal,
    session: RecordSession,
    policy: AssignmentPolicy,
) -> AppResult<RecordOutcome> {
    if session.students.is_empty() {
        return Err(AppError::validation("students", "at least one student required"));
    }

    let mut rows = Vec::with_capacity(session.students.len());
    for (i, mark) in session.students.into_iter().enumerate() {
        let status = parse_status(&format!("students.{}.status", i), &mark.status)?;
        let notes = non_empty(mark.notes);
        check_notes(&format!("students.{}.notes", i), notes.as_deref())?;

        rows.push(NewAttendance {
            student_id: mark.student_id,
            subject_id: session.subject_id,
            class_id: session.class_id,
            teacher_id: principal.id,
            date: session.date,
            status,
            notes,
        });
    }

    if store.find_class(session.class_id).await?.is_none() {
        return Err(AppError::referential("class_id"));
    }
    if store.find_subject(session.subject_id).await?.is_none() {
        return Err(AppError::referential("subject_id"));
    }

    let requested: Vec<u64> = rows.iter().map(|r| r.student_id).collect();
    let existing: HashSet<u64> = store.existing_student_ids(&requested).await?.into_iter().collect();
    if let Some(i) = requested.iter().position(|id| !existing.contains(id)) {
        return Err(AppError::referential(format!("students.{}.student_id", i)));
    }

    if policy == AssignmentPolicy::Enforce
        && !principal.is_admin()
        && !store
            .has_assignment(principal.id, session.class_id, session.subject_id)
            .await?
    {
        return Err(AppError::forbidden("You are not assigned to this class and subject"));
    }

    let recorded = store.upsert_attendance(&rows).await?;
    info!(recorded, "Attendance recorded");

    Ok(RecordOutcome {
        message: "Attendance recorded successfully.".to_string(),
        recorded,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{
        attendance::AttendanceStatus,
        role::Role,
        student::StudentStatus,
    };
    use crate::store::MemoryStore;

    struct School {
        store: MemoryStore,
        class: u64,
        subject: u64,
        t1: u64,
        t2: u64,
        s1: u64,
        s2: u64,
    }

    fn school() -> School {
        let store = MemoryStore::new();
        let t1 = store.add_user("Teacher One", Role::Teacher);
        let t2 = store.add_user("Teacher Two", Role::Teacher);
        let class = store.add_class("Grade 10", Some("A"), 10);
        let subject = store.add_subject("Mathematics", "MATH101");
        store.assign(t1, subject, class);
        store.assign(t2, subject, class);
        let s1 = store.add_student("S-1", "Amina", "Rahman", class, StudentStatus::Active);
        let s2 = store.add_student("S-2", "Bilal", "Karim", class, StudentStatus::Active);
        School {
            store,
            class,
            subject,
            t1,
            t2,
            s1,
            s2,
        }
    }

    fn date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 3, 1).unwrap()
    }

    fn session(s: &School, marks: &[(u64, &str)]) -> RecordSession {
        RecordSession {
            class_id: s.class,
            subject_id: s.subject,
            date: date(),
            students: marks
                .iter()
                .map(|(id, status)| StudentMark {
                    student_id: *id,
                    status: status.to_string(),
                    notes: None,
                })
                .collect(),
        }
    }

    #[actix_web::test]
    async fn resubmission_overwrites_only_the_resubmitted_student() {
        let s = school();

        let outcome = record_session(
            &s.store,
            &Principal::teacher(s.t1),
            session(&s, &[(s.s1, "present"), (s.s2, "absent")]),
            AssignmentPolicy::Enforce,
        )
        .await
        .unwrap();
        assert_eq!(outcome.recorded, 2);

        let rows = s.store.attendance_rows();
        assert_eq!(rows.len(), 2);
        assert!(rows.iter().all(|r| r.teacher_id == s.t1));

        record_session(
            &s.store,
            &Principal::teacher(s.t2),
            session(&s, &[(s.s1, "late")]),
            AssignmentPolicy::Enforce,
        )
        .await
        .unwrap();

        let rows = s.store.attendance_rows();
        assert_eq!(rows.len(), 2);
        let first = rows.iter().find(|r| r.student_id == s.s1).unwrap();
        assert_eq!(first.status, AttendanceStatus::Late);
        assert_eq!(first.teacher_id, s.t2);
        let second = rows.iter().find(|r| r.student_id == s.s2).unwrap();
        assert_eq!(second.status, AttendanceStatus::Absent);
        assert_eq!(second.teacher_id, s.t1);
    }

    #[actix_web::test]
    async fn same_batch_twice_is_idempotent_with_second_winning() {
        let s = school();
        let teacher = Principal::teacher(s.t1);

        let mut batch = session(&s, &[(s.s1, "present"), (s.s2, "present")]);
        record_session(&s.store, &teacher, batch.clone(), AssignmentPolicy::Enforce)
            .await
            .unwrap();

        batch.students[1].notes = Some("left early".into());
        batch.students[1].status = "excused".into();
        record_session(&s.store, &teacher, batch, AssignmentPolicy::Enforce)
            .await
            .unwrap();

        let rows = s.store.attendance_rows();
        let keys: HashSet<_> = rows.iter().map(|r| r.key()).collect();
        assert_eq!(rows.len(), 2);
        assert_eq!(keys.len(), rows.len());

        let second = rows.iter().find(|r| r.student_id == s.s2).unwrap();
        assert_eq!(second.status, AttendanceStatus::Excused);
        assert_eq!(second.notes.as_deref(), Some("left early"));
    }

    #[actix_web::test]
    async fn empty_batch_is_rejected() {
        let s = school();
        let err = record_session(
            &s.store,
            &Principal::admin(99),
            session(&s, &[]),
            AssignmentPolicy::Enforce,
        )
        .await
        .unwrap_err();

        assert_eq!(err, AppError::validation("students", "at least one student required"));
    }

    #[actix_web::test]
    async fn invalid_status_rejects_the_whole_batch() {
        let s = school();
        let err = record_session(
            &s.store,
            &Principal::teacher(s.t1),
            session(&s, &[(s.s1, "present"), (s.s2, "asleep")]),
            AssignmentPolicy::Enforce,
        )
        .await
        .unwrap_err();

        assert_eq!(err, AppError::validation("students.1.status", "invalid status"));
        assert!(s.store.attendance_rows().is_empty());
    }

    #[actix_web::test]
    async fn unknown_references_are_validation_errors() {
        let s = school();
        let teacher = Principal::teacher(s.t1);

        let mut bad_class = session(&s, &[(s.s1, "present")]);
        bad_class.class_id = 4040;
        let err = record_session(&s.store, &teacher, bad_class, AssignmentPolicy::Enforce)
            .await
            .unwrap_err();
        assert_eq!(err, AppError::referential("class_id"));

        let mut bad_subject = session(&s, &[(s.s1, "present")]);
        bad_subject.subject_id = 4040;
        let err = record_session(&s.store, &teacher, bad_subject, AssignmentPolicy::Enforce)
            .await
            .unwrap_err();
        assert_eq!(err, AppError::referential("subject_id"));

        let err = record_session(
            &s.store,
            &teacher,
            session(&s, &[(s.s1, "present"), (4040, "present")]),
            AssignmentPolicy::Enforce,
        )
        .await
        .unwrap_err();
        assert_eq!(err, AppError::referential("students.1.student_id"));
        assert!(s.store.attendance_rows().is_empty());
    }

    #[actix_web::test]
    async fn long_notes_are_rejected() {
        let s = school();
        let mut batch = session(&s, &[(s.s1, "absent")]);
        batch.students[0].notes = Some("x".repeat(501));

        let err = record_session(&s.store, &Principal::teacher(s.t1), batch, AssignmentPolicy::Enforce)
            .await
            .unwrap_err();
        assert!(err.is_validation());
    }

    #[actix_web::test]
    async fn unassigned_teacher_depends_on_policy() {
        let s = school();
        let outsider = s.store.add_user("Outsider", Role::Teacher);
        let principal = Principal::teacher(outsider);

        let err = record_session(
            &s.store,
            &principal,
            session(&s, &[(s.s1, "present")]),
            AssignmentPolicy::Enforce,
        )
        .await
        .unwrap_err();
        assert!(matches!(err, AppError::Forbidden(_)));

        let outcome = record_session(
            &s.store,
            &principal,
            session(&s, &[(s.s1, "present")]),
            AssignmentPolicy::Trust,
        )
        .await
        .unwrap();
        assert_eq!(outcome.recorded, 1);
    }

    #[actix_web::test]
    async fn admins_record_without_assignment() {
        let s = school();
        let admin = s.store.add_user("Head", Role::Admin);

        let outcome = record_session(
            &s.store,
            &Principal::admin(admin),
            session(&s, &[(s.s1, "present")]),
            AssignmentPolicy::Enforce,
        )
        .await
        .unwrap();
        assert_eq!(outcome.recorded, 1);
        assert_eq!(s.store.attendance_rows()[0].teacher_id, admin);
    }

    #[actix_web::test]
    async fn concurrent_submissions_leave_one_row_per_key() {
        let s = school();
        let first = Principal::teacher(s.t1);
        let second = Principal::teacher(s.t2);

        let (a, b) = futures::join!(
            record_session(
                &s.store,
                &first,
                session(&s, &[(s.s1, "present"), (s.s2, "present")]),
                AssignmentPolicy::Enforce,
            ),
            record_session(
                &s.store,
                &second,
                session(&s, &[(s.s1, "absent"), (s.s2, "absent")]),
                AssignmentPolicy::Enforce,
            ),
        );
        assert_eq!(a.unwrap().recorded, 2);
        assert_eq!(b.unwrap().recorded, 2);

        let rows = s.store.attendance_rows();
        let keys: HashSet<_> = rows.iter().map(|r| r.key()).collect();
        assert_eq!(rows.len(), 2);
        assert_eq!(keys.len(), 2);
        for row in &rows {
            let expected = if row.teacher_id == s.t1 {
                AttendanceStatus::Present
            } else {
                assert_eq!(row.teacher_id, s.t2);
                AttendanceStatus::Absent
            };
            assert_eq!(row.status, expected);
        }
    }
}
