use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

use super::{
    catalogue::{CatalogueOptions, options},
    pagination::{ATTENDANCE_PAGE_SIZE, AttendancePage, Page, PageRequest},
};
use crate::error::AppResult;
use crate::model::{
    attendance::{AttendanceEntry, AttendanceFilter},
    role::Principal,
    school_class::SchoolClass,
    subject::Subject,
};
use crate::store::SchoolStore;

#[derive(Debug, Clone, Default, Deserialize, Serialize, IntoParams, ToSchema)]
pub struct AttendanceQuery {
    /// Only records on this date
    pub date: Option<NaiveDate>,
    /// Only records for this class
    pub class_id: Option<u64>,
    /// Only records for this subject
    pub subject_id: Option<u64>,
    /// Page number, starting at 1
    #[serde(skip_serializing)]
    pub page: Option<u32>,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct AttendanceIndex {
    #[schema(value_type = AttendancePage)]
    pub attendances: Page<AttendanceEntry>,
    pub classes: Vec<SchoolClass>,
    pub subjects: Vec<Subject>,
    /// The filters that were applied, echoed back.
    pub filters: AttendanceQuery,
}

/// One page of attendance, newest date first. Teachers only see rows they marked.
pub async fn list_attendance(
    store: &dyn SchoolStore,
    principal: &Principal,
    query: &AttendanceQuery,
) -> AppResult<Page<AttendanceEntry>> {
    let request = PageRequest::new(query.page, ATTENDANCE_PAGE_SIZE);
    let filter = AttendanceFilter {
        date: query.date,
        class_id: query.class_id,
        subject_id: query.subject_id,
        teacher_id: principal.teacher_scope(),
        student_id: None,
    };

    let (rows, total) = store
        .list_attendance(&filter, request.limit(), request.offset())
        .await?;
    Ok(Page::new(rows, request, total))
}

/// The listing plus the filter options for the principal.
pub async fn attendance_index(
    store: &dyn SchoolStore,
    principal: &Principal,
    query: AttendanceQuery,
) -> AppResult<AttendanceIndex> {
    let attendances = list_attendance(store, principal, &query).await?;
    let CatalogueOptions { classes, subjects } = options(store, principal).await?;

    Ok(AttendanceIndex {
        attendances,
        classes,
        subjects,
        filters: query,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{
        attendance::{AttendanceStatus, NewAttendance},
        role::Role,
        student::StudentStatus,
    };
    use crate::store::MemoryStore;

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 3, d).unwrap()
    }

    struct Fixture {
        store: MemoryStore,
        class: u64,
        subject: u64,
        t1: u64,
        t2: u64,
        students: Vec<u64>,
    }

    fn fixture(student_count: usize) -> Fixture {
        let store = MemoryStore::new();
        let t1 = store.add_user("T1", Role::Teacher);
        let t2 = store.add_user("T2", Role::Teacher);
        let class = store.add_class("Grade 10", None, 10);
        let subject = store.add_subject("History", "HIS10");
        let students = (0..student_count)
            .map(|i| {
                store.add_student(
                    &format!("S-{}", i),
                    &format!("First{:02}", i),
                    "Last",
                    class,
                    StudentStatus::Active,
                )
            })
            .collect();
        Fixture {
            store,
            class,
            subject,
            t1,
            t2,
            students,
        }
    }

    async fn mark(f: &Fixture, student_id: u64, teacher_id: u64, date: NaiveDate) {
        f.store
            .upsert_attendance(&[NewAttendance {
                student_id,
                subject_id: f.subject,
                class_id: f.class,
                teacher_id,
                date,
                status: AttendanceStatus::Present,
                notes: None,
            }])
            .await
            .unwrap();
    }

    #[actix_web::test]
    async fn forty_five_rows_paginate_into_three_pages() {
        let f = fixture(45);
        for &s in &f.students {
            mark(&f, s, f.t1, day(1)).await;
        }
        let admin = Principal::admin(999);

        let first = list_attendance(&f.store, &admin, &AttendanceQuery::default())
            .await
            .unwrap();
        assert_eq!(first.total, 45);
        assert_eq!(first.last_page, 3);
        assert_eq!(first.data.len(), 20);

        let last = list_attendance(
            &f.store,
            &admin,
            &AttendanceQuery {
                page: Some(3),
                ..AttendanceQuery::default()
            },
        )
        .await
        .unwrap();
        assert_eq!(last.page, 3);
        assert_eq!(last.data.len(), 5);
    }

    #[actix_web::test]
    async fn teachers_only_see_their_own_rows() {
        let f = fixture(4);
        mark(&f, f.students[0], f.t1, day(1)).await;
        mark(&f, f.students[1], f.t2, day(1)).await;
        mark(&f, f.students[2], f.t1, day(2)).await;
        mark(&f, f.students[3], f.t2, day(2)).await;

        let page = list_attendance(&f.store, &Principal::teacher(f.t1), &AttendanceQuery::default())
            .await
            .unwrap();
        assert_eq!(page.total, 2);
        assert!(page.data.iter().all(|e| e.teacher_id == f.t1));

        let admin = list_attendance(&f.store, &Principal::admin(999), &AttendanceQuery::default())
            .await
            .unwrap();
        assert_eq!(admin.total, 4);
    }

    #[actix_web::test]
    async fn ordered_by_date_then_newest_insert() {
        let f = fixture(3);
        mark(&f, f.students[0], f.t1, day(1)).await;
        mark(&f, f.students[1], f.t1, day(2)).await;
        mark(&f, f.students[2], f.t1, day(1)).await;

        let page = list_attendance(&f.store, &Principal::admin(999), &AttendanceQuery::default())
            .await
            .unwrap();
        let order: Vec<u64> = page.data.iter().map(|e| e.student_id).collect();
        assert_eq!(order, vec![f.students[1], f.students[2], f.students[0]]);
    }

    #[actix_web::test]
    async fn date_filter_narrows_results() {
        let f = fixture(2);
        mark(&f, f.students[0], f.t1, day(1)).await;
        mark(&f, f.students[1], f.t1, day(2)).await;

        let page = list_attendance(
            &f.store,
            &Principal::admin(999),
            &AttendanceQuery {
                date: Some(day(2)),
                ..AttendanceQuery::default()
            },
        )
        .await
        .unwrap();
        assert_eq!(page.total, 1);
        assert_eq!(page.data[0].student_id, f.students[1]);
        assert_eq!(page.data[0].subject_name, "History");
    }

    #[actix_web::test]
    async fn no_matches_is_an_empty_page() {
        let f = fixture(0);
        let index = attendance_index(&f.store, &Principal::teacher(f.t1), AttendanceQuery::default())
            .await
            .unwrap();
        assert_eq!(index.attendances.total, 0);
        assert_eq!(index.attendances.last_page, 1);
        assert!(index.classes.is_empty());
    }
}
