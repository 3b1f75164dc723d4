//! Dashboard statistics, one strategy per role.

use std::collections::HashSet;

use async_trait::async_trait;
use chrono::NaiveDate;
use serde::Serialize;
use utoipa::ToSchema;

use crate::error::AppResult;
use crate::model::{
    attendance::AttendanceEntry,
    role::{Principal, Role},
    school_class::ClassAttendanceSummary,
};
use crate::store::SchoolStore;

pub const RECENT_LIMIT: u64 = 10;
pub const CLASS_ROLLUP_LIMIT: u64 = 10;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct AdminStats {
    pub total_students: i64,
    pub active_students: i64,
    pub total_teachers: i64,
    pub total_classes: i64,
    pub total_subjects: i64,
    pub todays_attendance: i64,
    pub present_today: i64,
    /// Rows with status exactly `absent`.
    pub absent_today: i64,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct AdminDashboard {
    pub stats: AdminStats,
    pub recent_attendances: Vec<AttendanceEntry>,
    pub class_attendance: Vec<ClassAttendanceSummary>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct TeacherStats {
    pub assigned_classes: i64,
    pub assigned_subjects: i64,
    pub todays_attendance: i64,
    pub present_today: i64,
    /// `todays_attendance - present_today`: late and excused count here too,
    /// unlike the admin figure, which counts status `absent` only.
    pub absent_today: i64,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct TeacherDashboard {
    pub stats: TeacherStats,
    pub recent_attendances: Vec<AttendanceEntry>,
    pub my_classes_attendance: Vec<ClassAttendanceSummary>,
}

/// Serialized with a `role` field naming the variant.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "role", rename_all = "lowercase")]
pub enum Dashboard {
    Admin(AdminDashboard),
    Teacher(TeacherDashboard),
}

#[async_trait]
pub trait DashboardStrategy: Send + Sync {
    async fn build(&self, store: &dyn SchoolStore, principal: &Principal, today: NaiveDate) -> AppResult<Dashboard>;
}

pub struct AdminStrategy;
pub struct TeacherStrategy;

static ADMIN: AdminStrategy = AdminStrategy;
static TEACHER: TeacherStrategy = TeacherStrategy;

pub fn strategy_for(role: Role) -> &'static dyn DashboardStrategy {
    match role {
        Role::Admin => &ADMIN,
        Role::Teacher => &TEACHER,
    }
}

/// Dashboard for `principal` as of `today`.
pub async fn dashboard(store: &dyn SchoolStore, principal: &Principal, today: NaiveDate) -> AppResult<Dashboard> {
    strategy_for(principal.role).build(store, principal, today).await
}

#[async_trait]
impl DashboardStrategy for AdminStrategy {
    async fn build(&self, store: &dyn SchoolStore, _principal: &Principal, today: NaiveDate) -> AppResult<Dashboard> {
        let totals = store.school_totals().await?;
        let day = store.day_counts(today, None).await?;

        let stats = AdminStats {
            total_students: totals.total_students,
            active_students: totals.active_students,
            total_teachers: totals.total_teachers,
            total_classes: totals.total_classes,
            total_subjects: totals.total_subjects,
            todays_attendance: day.total,
            present_today: day.present,
            absent_today: day.absent,
        };

        Ok(Dashboard::Admin(AdminDashboard {
            stats,
            recent_attendances: store.recent_attendance(None, RECENT_LIMIT).await?,
            class_attendance: store.class_rollup(today, None, CLASS_ROLLUP_LIMIT).await?,
        }))
    }
}

#[async_trait]
impl DashboardStrategy for TeacherStrategy {
    async fn build(&self, store: &dyn SchoolStore, principal: &Principal, today: NaiveDate) -> AppResult<Dashboard> {
        let assignments = store.list_assignments(Some(principal.id)).await?;
        let classes: HashSet<u64> = assignments.iter().map(|a| a.class.id).collect();
        let subjects: HashSet<u64> = assignments.iter().map(|a| a.subject.id).collect();

        let day = store.day_counts(today, Some(principal.id)).await?;
        let stats = TeacherStats {
            assigned_classes: classes.len() as i64,
            assigned_subjects: subjects.len() as i64,
            todays_attendance: day.total,
            present_today: day.present,
            absent_today: day.total - day.present,
        };

        Ok(Dashboard::Teacher(TeacherDashboard {
            stats,
            recent_attendances: store.recent_attendance(Some(principal.id), RECENT_LIMIT).await?,
            my_classes_attendance: store.class_rollup(today, Some(principal.id), CLASS_ROLLUP_LIMIT).await?,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{
        attendance::{AttendanceStatus, NewAttendance},
        student::StudentStatus,
    };
    use crate::store::MemoryStore;

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 3, 1).unwrap()
    }

    struct Fixture {
        store: MemoryStore,
        teacher: u64,
        class: u64,
    }

    /// Ten rows today by one teacher: 7 present, 2 absent, 1 late.
    async fn ten_marks_today() -> Fixture {
        let store = MemoryStore::new();
        let teacher = store.add_user("T1", Role::Teacher);
        store.add_user("Head", Role::Admin);
        let class = store.add_class("Grade 10", Some("A"), 10);
        let subject = store.add_subject("Biology", "BIO10");
        store.assign(teacher, subject, class);

        let statuses = [
            AttendanceStatus::Present,
            AttendanceStatus::Present,
            AttendanceStatus::Present,
            AttendanceStatus::Present,
            AttendanceStatus::Present,
            AttendanceStatus::Present,
            AttendanceStatus::Present,
            AttendanceStatus::Absent,
            AttendanceStatus::Absent,
            AttendanceStatus::Late,
        ];
        let rows: Vec<NewAttendance> = statuses
            .iter()
            .enumerate()
            .map(|(i, status)| NewAttendance {
                student_id: store.add_student(
                    &format!("S-{}", i),
                    &format!("Kid{}", i),
                    "Last",
                    class,
                    StudentStatus::Active,
                ),
                subject_id: subject,
                class_id: class,
                teacher_id: teacher,
                date: today(),
                status: *status,
                notes: None,
            })
            .collect();
        store.upsert_attendance(&rows).await.unwrap();

        Fixture { store, teacher, class }
    }

    #[actix_web::test]
    async fn admin_counts_exact_absent_status() {
        let f = ten_marks_today().await;
        let Dashboard::Admin(admin) = dashboard(&f.store, &Principal::admin(100), today()).await.unwrap() else {
            panic!("expected admin dashboard");
        };

        assert_eq!(admin.stats.todays_attendance, 10);
        assert_eq!(admin.stats.present_today, 7);
        assert_eq!(admin.stats.absent_today, 2);
        assert_eq!(admin.stats.total_teachers, 1);
        assert_eq!(admin.stats.total_students, 10);
        assert_eq!(admin.recent_attendances.len(), 10);

        let class = &admin.class_attendance[0];
        assert_eq!(class.id, f.class);
        assert_eq!((class.present_count, class.absent_count, class.total_students), (7, 2, 10));
    }

    // The teacher figure folds late into "absent": 10 - 7 = 3, where the
    // admin view above reports 2 for the same day.
    #[actix_web::test]
    async fn teacher_absent_is_derived_from_not_present() {
        let f = ten_marks_today().await;
        let Dashboard::Teacher(teacher) = dashboard(&f.store, &Principal::teacher(f.teacher), today())
            .await
            .unwrap()
        else {
            panic!("expected teacher dashboard");
        };

        assert_eq!(teacher.stats.todays_attendance, 10);
        assert_eq!(teacher.stats.present_today, 7);
        assert_eq!(teacher.stats.absent_today, 3);
        assert_eq!(teacher.stats.assigned_classes, 1);
        assert_eq!(teacher.stats.assigned_subjects, 1);
        assert_eq!(teacher.my_classes_attendance[0].absent_count, 2);
    }

    #[actix_web::test]
    async fn other_days_and_teachers_are_not_counted() {
        let f = ten_marks_today().await;
        let someone_else = f.store.add_user("T2", Role::Teacher);

        let Dashboard::Teacher(teacher) = dashboard(&f.store, &Principal::teacher(someone_else), today())
            .await
            .unwrap()
        else {
            panic!("expected teacher dashboard");
        };
        assert_eq!(teacher.stats.todays_attendance, 0);
        assert!(teacher.recent_attendances.is_empty());
        assert!(teacher.my_classes_attendance.is_empty());

        let tomorrow = today().succ_opt().unwrap();
        let Dashboard::Admin(admin) = dashboard(&f.store, &Principal::admin(100), tomorrow).await.unwrap() else {
            panic!("expected admin dashboard");
        };
        assert_eq!(admin.stats.todays_attendance, 0);
        assert_eq!(admin.stats.present_today, 0);
    }

    #[actix_web::test]
    async fn class_rollup_is_capped_at_ten_classes() {
        let store = MemoryStore::new();
        for i in 0..12 {
            store.add_class(&format!("Class {}", i), None, 1);
        }

        let Dashboard::Admin(admin) = dashboard(&store, &Principal::admin(1), today()).await.unwrap() else {
            panic!("expected admin dashboard");
        };
        assert_eq!(admin.class_attendance.len(), CLASS_ROLLUP_LIMIT as usize);
        assert_eq!(admin.stats, AdminStats {
            total_students: 0,
            active_students: 0,
            total_teachers: 0,
            total_classes: 12,
            total_subjects: 0,
            todays_attendance: 0,
            present_today: 0,
            absent_today: 0,
        });
    }
}
