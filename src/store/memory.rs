//! In-process `SchoolStore`. Mirrors the MySQL adapter's ordering and
//! uniqueness rules so services can be exercised without a database.
//! Text is compared case-insensitively, as under the schema's default `_ci`
//! collation; accent folding and trailing-space padding are not reproduced.

use std::cmp::Ordering;
use std::collections::{BTreeMap, HashMap, HashSet};

use async_trait::async_trait;
use chrono::{NaiveDate, Utc};
use parking_lot::RwLock;

use super::{Assignment, SchoolStore, SchoolTotals, SubjectRef};
use crate::error::{AppError, AppResult};
use crate::model::{
    attendance::{
        Attendance, AttendanceEntry, AttendanceFilter, AttendanceKey, AttendanceStatus, DayCounts,
        NewAttendance,
    },
    role::Role,
    school_class::{ClassAttendanceSummary, SchoolClass},
    student::{Student, StudentFilter, StudentInput, StudentStatus, StudentWithClass},
    subject::Subject,
    teacher_subject::TeacherSubject,
    user::User,
};

#[derive(Default)]
struct Tables {
    next_id: u64,
    users: BTreeMap<u64, User>,
    classes: BTreeMap<u64, SchoolClass>,
    subjects: BTreeMap<u64, Subject>,
    assignments: BTreeMap<u64, TeacherSubject>,
    students: BTreeMap<u64, Student>,
    attendances: BTreeMap<u64, Attendance>,
    attendance_keys: HashMap<AttendanceKey, u64>,
}

impl Tables {
    fn next_id(&mut self) -> u64 {
        self.next_id += 1;
        self.next_id
    }

    fn entry(&self, row: &Attendance) -> Option<AttendanceEntry> {
        let student = self.students.get(&row.student_id)?;
        let subject = self.subjects.get(&row.subject_id)?;
        let class = self.classes.get(&row.class_id)?;
        let teacher = self.users.get(&row.teacher_id)?;

        Some(AttendanceEntry {
            id: row.id,
            date: row.date,
            status: row.status,
            notes: row.notes.clone(),
            student_id: student.id,
            student_code: student.student_id.clone(),
            student_first_name: student.first_name.clone(),
            student_last_name: student.last_name.clone(),
            subject_id: subject.id,
            subject_name: subject.name.clone(),
            subject_code: subject.code.clone(),
            class_id: class.id,
            class_name: class.name.clone(),
            class_section: class.section.clone(),
            teacher_id: teacher.id,
            teacher_name: teacher.name.clone(),
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }

    fn with_class(&self, student: &Student) -> Option<StudentWithClass> {
        let class = self.classes.get(&student.class_id)?;
        Some(StudentWithClass {
            student: student.clone(),
            class_name: class.name.clone(),
        })
    }

    fn count_where(&self, pred: impl Fn(&Attendance) -> bool) -> i64 {
        self.attendances.values().filter(|a| pred(a)).count() as i64
    }
}

/// Thread-safe, process-local store.
#[derive(Default)]
pub struct MemoryStore {
    tables: RwLock<Tables>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_user(&self, name: &str, role: Role) -> u64 {
        let mut t = self.tables.write();
        let id = t.next_id();
        t.users.insert(
            id,
            User {
                id,
                name: name.to_string(),
                email: format!("{}@school.test", name.to_lowercase().replace(' ', ".")),
                role,
                employee_id: None,
                phone: None,
                address: None,
            },
        );
        id
    }

    pub fn add_class(&self, name: &str, section: Option<&str>, grade_level: i32) -> u64 {
        let mut t = self.tables.write();
        let id = t.next_id();
        t.classes.insert(
            id,
            SchoolClass {
                id,
                name: name.to_string(),
                section: section.map(str::to_string),
                grade_level,
                description: None,
            },
        );
        id
    }

    pub fn add_subject(&self, name: &str, code: &str) -> u64 {
        let mut t = self.tables.write();
        let id = t.next_id();
        t.subjects.insert(
            id,
            Subject {
                id,
                name: name.to_string(),
                code: code.to_string(),
                description: None,
            },
        );
        id
    }

    pub fn assign(&self, teacher_id: u64, subject_id: u64, class_id: u64) -> u64 {
        let mut t = self.tables.write();
        let id = t.next_id();
        t.assignments.insert(
            id,
            TeacherSubject {
                id,
                user_id: teacher_id,
                subject_id,
                class_id,
            },
        );
        id
    }

    pub fn add_student(&self, code: &str, first_name: &str, last_name: &str, class_id: u64, status: StudentStatus) -> u64 {
        let mut t = self.tables.write();
        let id = t.next_id();
        t.students.insert(
            id,
            Student {
                id,
                student_id: code.to_string(),
                first_name: first_name.to_string(),
                last_name: last_name.to_string(),
                email: None,
                phone: None,
                date_of_birth: None,
                address: None,
                class_id,
                status,
            },
        );
        id
    }

    /// Snapshot of every stored attendance fact, in id order.
    pub fn attendance_rows(&self) -> Vec<Attendance> {
        self.tables.read().attendances.values().cloned().collect()
    }
}

fn student_matches(filter: &StudentFilter, s: &Student) -> bool {
    let search_ok = match filter.search.as_deref().filter(|q| !q.is_empty()) {
        None => true,
        Some(q) => {
            let q = q.to_lowercase();
            s.first_name.to_lowercase().contains(&q)
                || s.last_name.to_lowercase().contains(&q)
                || s.student_id.to_lowercase().contains(&q)
                || s.email.as_deref().is_some_and(|e| e.to_lowercase().contains(&q))
        }
    };
    search_ok
        && filter.class_id.is_none_or(|c| s.class_id == c)
        && filter.status.is_none_or(|st| s.status == st)
}

fn student_from_input(id: u64, input: &StudentInput) -> Student {
    Student {
        id,
        student_id: input.student_id.clone(),
        first_name: input.first_name.clone(),
        last_name: input.last_name.clone(),
        email: input.email.clone(),
        phone: input.phone.clone(),
        date_of_birth: input.date_of_birth,
        address: input.address.clone(),
        class_id: input.class_id,
        status: input.status,
    }
}

fn collate(a: &str, b: &str) -> Ordering {
    a.to_lowercase().cmp(&b.to_lowercase())
}

fn same_text(a: &str, b: &str) -> bool {
    collate(a, b) == Ordering::Equal
}

fn same_email(stored: Option<&str>, candidate: &str) -> bool {
    stored.is_some_and(|e| same_text(e, candidate))
}

/// Mirrors the unique indexes on `students`.
fn check_student_unique(t: &Tables, input: &StudentInput, except_id: Option<u64>) -> AppResult<()> {
    for s in t.students.values().filter(|s| Some(s.id) != except_id) {
        if same_text(&s.student_id, &input.student_id) {
            return Err(AppError::validation("student_id", "student_id has already been taken"));
        }
        if input.email.as_deref().is_some_and(|e| same_email(s.email.as_deref(), e)) {
            return Err(AppError::validation("email", "email has already been taken"));
        }
    }
    Ok(())
}

#[async_trait]
impl SchoolStore for MemoryStore {
    async fn find_class(&self, id: u64) -> AppResult<Option<SchoolClass>> {
        Ok(self.tables.read().classes.get(&id).cloned())
    }

    async fn find_subject(&self, id: u64) -> AppResult<Option<Subject>> {
        Ok(self.tables.read().subjects.get(&id).cloned())
    }

    async fn find_student(&self, id: u64) -> AppResult<Option<StudentWithClass>> {
        let t = self.tables.read();
        Ok(t.students.get(&id).and_then(|s| t.with_class(s)))
    }

    async fn existing_student_ids(&self, ids: &[u64]) -> AppResult<Vec<u64>> {
        let t = self.tables.read();
        let unique: HashSet<u64> = ids.iter().copied().collect();
        Ok(unique.into_iter().filter(|id| t.students.contains_key(id)).collect())
    }

    async fn has_assignment(&self, teacher_id: u64, class_id: u64, subject_id: u64) -> AppResult<bool> {
        Ok(self
            .tables
            .read()
            .assignments
            .values()
            .any(|a| a.user_id == teacher_id && a.class_id == class_id && a.subject_id == subject_id))
    }

    async fn list_classes(&self) -> AppResult<Vec<SchoolClass>> {
        let mut classes: Vec<SchoolClass> = self.tables.read().classes.values().cloned().collect();
        classes.sort_by(|a, b| collate(&a.name, &b.name).then(a.id.cmp(&b.id)));
        Ok(classes)
    }

    async fn list_subjects(&self) -> AppResult<Vec<Subject>> {
        let mut subjects: Vec<Subject> = self.tables.read().subjects.values().cloned().collect();
        subjects.sort_by(|a, b| collate(&a.name, &b.name).then(a.id.cmp(&b.id)));
        Ok(subjects)
    }

    async fn list_assignments(&self, teacher_id: Option<u64>) -> AppResult<Vec<Assignment>> {
        let t = self.tables.read();
        let assignments = t
            .assignments
            .values()
            .filter(|a| teacher_id.is_none_or(|id| a.user_id == id))
            .filter_map(|a| {
                let class = t.classes.get(&a.class_id)?.clone();
                let subject = t.subjects.get(&a.subject_id)?;
                Some(Assignment {
                    id: a.id,
                    user_id: a.user_id,
                    class,
                    subject: SubjectRef {
                        id: subject.id,
                        name: subject.name.clone(),
                        code: subject.code.clone(),
                        description: subject.description.clone(),
                    },
                })
            })
            .collect();
        Ok(assignments)
    }

    async fn active_students_in_class(&self, class_id: u64) -> AppResult<Vec<Student>> {
        let mut students: Vec<Student> = self
            .tables
            .read()
            .students
            .values()
            .filter(|s| s.class_id == class_id && s.status == StudentStatus::Active)
            .cloned()
            .collect();
        students.sort_by(|a, b| collate(&a.first_name, &b.first_name).then(a.id.cmp(&b.id)));
        Ok(students)
    }

    async fn upsert_attendance(&self, rows: &[NewAttendance]) -> AppResult<u64> {
        let now = Utc::now();
        // one write guard for the whole batch
        let mut t = self.tables.write();

        for row in rows {
            let key = row.key();
            match t.attendance_keys.get(&key).copied() {
                Some(id) => {
                    if let Some(existing) = t.attendances.get_mut(&id) {
                        existing.status = row.status;
                        existing.notes = row.notes.clone();
                        existing.teacher_id = row.teacher_id;
                        existing.updated_at = now;
                    }
                }
                None => {
                    let id = t.next_id();
                    t.attendances.insert(
                        id,
                        Attendance {
                            id,
                            student_id: row.student_id,
                            subject_id: row.subject_id,
                            class_id: row.class_id,
                            teacher_id: row.teacher_id,
                            date: row.date,
                            status: row.status,
                            notes: row.notes.clone(),
                            created_at: now,
                            updated_at: now,
                        },
                    );
                    t.attendance_keys.insert(key, id);
                }
            }
        }

        Ok(rows.len() as u64)
    }

    async fn list_attendance(
        &self,
        filter: &AttendanceFilter,
        limit: u64,
        offset: u64,
    ) -> AppResult<(Vec<AttendanceEntry>, u64)> {
        let t = self.tables.read();
        let mut matching: Vec<&Attendance> = t.attendances.values().filter(|a| filter.matches(a)).collect();
        matching.sort_by(|a, b| b.date.cmp(&a.date).then(b.id.cmp(&a.id)));

        let total = matching.len() as u64;
        let page = matching
            .into_iter()
            .skip(offset as usize)
            .take(limit as usize)
            .filter_map(|a| t.entry(a))
            .collect();
        Ok((page, total))
    }

    async fn recent_attendance(&self, teacher_id: Option<u64>, limit: u64) -> AppResult<Vec<AttendanceEntry>> {
        let t = self.tables.read();
        let mut rows: Vec<&Attendance> = t
            .attendances
            .values()
            .filter(|a| teacher_id.is_none_or(|id| a.teacher_id == id))
            .collect();
        rows.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));

        Ok(rows.into_iter().take(limit as usize).filter_map(|a| t.entry(a)).collect())
    }

    async fn find_attendance(&self, id: u64) -> AppResult<Option<AttendanceEntry>> {
        let t = self.tables.read();
        Ok(t.attendances.get(&id).and_then(|a| t.entry(a)))
    }

    async fn update_attendance(&self, id: u64, status: AttendanceStatus, notes: Option<String>) -> AppResult<bool> {
        let mut t = self.tables.write();
        match t.attendances.get_mut(&id) {
            Some(row) => {
                row.status = status;
                row.notes = notes;
                row.updated_at = Utc::now();
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn delete_attendance(&self, id: u64) -> AppResult<bool> {
        let mut t = self.tables.write();
        match t.attendances.remove(&id) {
            Some(row) => {
                t.attendance_keys.remove(&row.key());
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn school_totals(&self) -> AppResult<SchoolTotals> {
        let t = self.tables.read();
        Ok(SchoolTotals {
            total_students: t.students.len() as i64,
            active_students: t
                .students
                .values()
                .filter(|s| s.status == StudentStatus::Active)
                .count() as i64,
            total_teachers: t.users.values().filter(|u| u.role == Role::Teacher).count() as i64,
            total_classes: t.classes.len() as i64,
            total_subjects: t.subjects.len() as i64,
        })
    }

    async fn day_counts(&self, date: NaiveDate, teacher_id: Option<u64>) -> AppResult<DayCounts> {
        let t = self.tables.read();
        let scoped = |a: &Attendance| a.date == date && teacher_id.is_none_or(|id| a.teacher_id == id);
        Ok(DayCounts {
            total: t.count_where(scoped),
            present: t.count_where(|a| scoped(a) && a.status == AttendanceStatus::Present),
            absent: t.count_where(|a| scoped(a) && a.status == AttendanceStatus::Absent),
        })
    }

    async fn class_rollup(
        &self,
        date: NaiveDate,
        teacher_id: Option<u64>,
        limit: u64,
    ) -> AppResult<Vec<ClassAttendanceSummary>> {
        let t = self.tables.read();

        let classes: Vec<&SchoolClass> = match teacher_id {
            Some(id) => {
                let assigned: HashSet<u64> = t
                    .assignments
                    .values()
                    .filter(|a| a.user_id == id)
                    .map(|a| a.class_id)
                    .collect();
                t.classes.values().filter(|c| assigned.contains(&c.id)).collect()
            }
            None => t.classes.values().take(limit as usize).collect(),
        };

        let summaries = classes
            .into_iter()
            .map(|c| {
                let scoped = |a: &Attendance| {
                    a.class_id == c.id && a.date == date && teacher_id.is_none_or(|id| a.teacher_id == id)
                };
                ClassAttendanceSummary {
                    id: c.id,
                    name: c.name.clone(),
                    section: c.section.clone(),
                    present_count: t.count_where(|a| scoped(a) && a.status == AttendanceStatus::Present),
                    absent_count: t.count_where(|a| scoped(a) && a.status == AttendanceStatus::Absent),
                    total_students: t.students.values().filter(|s| s.class_id == c.id).count() as i64,
                }
            })
            .collect();
        Ok(summaries)
    }

    async fn list_students(
        &self,
        filter: &StudentFilter,
        limit: u64,
        offset: u64,
    ) -> AppResult<(Vec<StudentWithClass>, u64)> {
        let t = self.tables.read();
        let matching: Vec<&Student> = t.students.values().rev().filter(|s| student_matches(filter, s)).collect();

        let total = matching.len() as u64;
        let page = matching
            .into_iter()
            .skip(offset as usize)
            .take(limit as usize)
            .filter_map(|s| t.with_class(s))
            .collect();
        Ok((page, total))
    }

    async fn student_code_taken(&self, code: &str, except_id: Option<u64>) -> AppResult<bool> {
        Ok(self
            .tables
            .read()
            .students
            .values()
            .any(|s| same_text(&s.student_id, code) && Some(s.id) != except_id))
    }

    async fn student_email_taken(&self, email: &str, except_id: Option<u64>) -> AppResult<bool> {
        Ok(self
            .tables
            .read()
            .students
            .values()
            .any(|s| same_email(s.email.as_deref(), email) && Some(s.id) != except_id))
    }

    async fn insert_student(&self, input: &StudentInput) -> AppResult<u64> {
        let mut t = self.tables.write();
        check_student_unique(&t, input, None)?;
        let id = t.next_id();
        t.students.insert(id, student_from_input(id, input));
        Ok(id)
    }

    async fn update_student(&self, id: u64, input: &StudentInput) -> AppResult<bool> {
        let mut t = self.tables.write();
        if !t.students.contains_key(&id) {
            return Ok(false);
        }
        check_student_unique(&t, input, Some(id))?;
        t.students.insert(id, student_from_input(id, input));
        Ok(true)
    }

    async fn delete_student(&self, id: u64) -> AppResult<bool> {
        let mut t = self.tables.write();
        if t.students.remove(&id).is_none() {
            return Ok(false);
        }

        let doomed: Vec<u64> = t
            .attendances
            .values()
            .filter(|a| a.student_id == id)
            .map(|a| a.id)
            .collect();
        for attendance_id in doomed {
            if let Some(row) = t.attendances.remove(&attendance_id) {
                t.attendance_keys.remove(&row.key());
            }
        }
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 3, d).unwrap()
    }

    fn mark(student_id: u64, teacher_id: u64, date: NaiveDate, status: AttendanceStatus) -> NewAttendance {
        NewAttendance {
            student_id,
            subject_id: 2,
            class_id: 1,
            teacher_id,
            date,
            status,
            notes: None,
        }
    }

    #[actix_web::test]
    async fn upsert_keeps_one_row_per_key_and_preserves_id() {
        let store = MemoryStore::new();
        store
            .upsert_attendance(&[mark(10, 1, day(1), AttendanceStatus::Present)])
            .await
            .unwrap();
        let first = store.attendance_rows();

        store
            .upsert_attendance(&[mark(10, 2, day(1), AttendanceStatus::Late)])
            .await
            .unwrap();
        let second = store.attendance_rows();

        assert_eq!(second.len(), 1);
        assert_eq!(second[0].id, first[0].id);
        assert_eq!(second[0].created_at, first[0].created_at);
        assert_eq!(second[0].status, AttendanceStatus::Late);
        assert_eq!(second[0].teacher_id, 2);
    }

    #[actix_web::test]
    async fn duplicate_keys_in_one_batch_resolve_to_last_entry() {
        let store = MemoryStore::new();
        store
            .upsert_attendance(&[
                mark(10, 1, day(1), AttendanceStatus::Present),
                mark(10, 1, day(1), AttendanceStatus::Excused),
            ])
            .await
            .unwrap();

        let rows = store.attendance_rows();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].status, AttendanceStatus::Excused);
    }

    #[actix_web::test]
    async fn deleting_a_student_cascades_to_attendance() {
        let store = MemoryStore::new();
        let class = store.add_class("Grade 10", Some("A"), 10);
        let student = store.add_student("S-1", "Ada", "Lovelace", class, StudentStatus::Active);
        store
            .upsert_attendance(&[NewAttendance {
                class_id: class,
                ..mark(student, 1, day(1), AttendanceStatus::Absent)
            }])
            .await
            .unwrap();

        assert!(store.delete_student(student).await.unwrap());
        assert!(store.attendance_rows().is_empty());
        assert!(!store.delete_student(student).await.unwrap());
    }

    fn input(code: &str, email: &str, class_id: u64) -> StudentInput {
        StudentInput {
            student_id: code.into(),
            first_name: "Ada".into(),
            last_name: "Lovelace".into(),
            email: Some(email.into()),
            phone: None,
            date_of_birth: None,
            address: None,
            class_id,
            status: StudentStatus::Active,
        }
    }

    #[actix_web::test]
    async fn names_sort_without_regard_to_case() {
        let store = MemoryStore::new();
        let bob = store.add_class("Bob", None, 9);
        let amy = store.add_class("amy", None, 9);
        store.add_student("S-1", "bilal", "Karim", amy, StudentStatus::Active);
        store.add_student("S-2", "Amina", "Rahman", amy, StudentStatus::Active);

        let classes = store.list_classes().await.unwrap();
        assert_eq!(classes.iter().map(|c| c.id).collect::<Vec<_>>(), vec![amy, bob]);

        let roster = store.active_students_in_class(amy).await.unwrap();
        let names: Vec<_> = roster.iter().map(|s| s.first_name.as_str()).collect();
        assert_eq!(names, vec!["Amina", "bilal"]);
    }

    #[actix_web::test]
    async fn student_uniqueness_ignores_case() {
        let store = MemoryStore::new();
        let class = store.add_class("Grade 10", Some("A"), 10);
        let id = store
            .insert_student(&input("STU-1", "ada@school.test", class))
            .await
            .unwrap();

        assert!(store.student_email_taken("ADA@School.test", None).await.unwrap());
        assert!(!store.student_email_taken("ADA@School.test", Some(id)).await.unwrap());
        assert!(store.student_code_taken("stu-1", None).await.unwrap());

        let err = store
            .insert_student(&input("stu-1", "other@school.test", class))
            .await
            .unwrap_err();
        assert_eq!(err, AppError::validation("student_id", "student_id has already been taken"));

        let err = store
            .insert_student(&input("STU-2", "Ada@School.Test", class))
            .await
            .unwrap_err();
        assert_eq!(err, AppError::validation("email", "email has already been taken"));
    }
}
