use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use sqlx::{MySql, MySqlPool, QueryBuilder};
use tracing::{debug, error};

use super::{Assignment, SchoolStore, SchoolTotals};
use crate::error::{AppError, AppResult};
use crate::model::{
    attendance::{AttendanceEntry, AttendanceFilter, AttendanceStatus, DayCounts, NewAttendance},
    school_class::{ClassAttendanceSummary, SchoolClass},
    student::{Student, StudentFilter, StudentInput, StudentWithClass},
    subject::Subject,
};
use crate::utils::db_utils::{WhereClause, bind_as, bind_scalar, duplicate_key};

const ENTRY_SELECT: &str = r#"
    SELECT
        a.id, a.date, a.status, a.notes,
        a.student_id,
        st.student_id AS student_code,
        st.first_name AS student_first_name,
        st.last_name AS student_last_name,
        a.subject_id, sj.name AS subject_name, sj.code AS subject_code,
        a.class_id, c.name AS class_name, c.section AS class_section,
        a.teacher_id, u.name AS teacher_name,
        a.created_at, a.updated_at
    FROM attendances a
    JOIN students st ON st.id = a.student_id
    JOIN subjects sj ON sj.id = a.subject_id
    JOIN classes c ON c.id = a.class_id
    JOIN users u ON u.id = a.teacher_id
"#;

const STUDENT_COLUMNS: &str = r#"
    s.id, s.student_id, s.first_name, s.last_name, s.email, s.phone,
    s.date_of_birth, s.address, s.class_id, s.status
"#;

const ASSIGNMENT_SELECT: &str = r#"
    SELECT
        ts.id AS assignment_id, ts.user_id,
        c.id, c.name, c.section, c.grade_level, c.description,
        sj.id AS subject_id, sj.name AS subject_name,
        sj.code AS subject_code, sj.description AS subject_description
    FROM teacher_subjects ts
    JOIN classes c ON c.id = ts.class_id
    JOIN subjects sj ON sj.id = ts.subject_id
"#;

/// `SchoolStore` over a MySQL pool.
#[derive(Clone)]
pub struct MySqlStore {
    pool: MySqlPool,
}

impl MySqlStore {
    pub fn new(pool: MySqlPool) -> Self {
        Self { pool }
    }
}

fn attendance_where(filter: &AttendanceFilter) -> WhereClause {
    let mut clause = WhereClause::new();
    clause.eq_date("a.date", filter.date);
    clause.eq_u64("a.class_id", filter.class_id);
    clause.eq_u64("a.subject_id", filter.subject_id);
    clause.eq_u64("a.teacher_id", filter.teacher_id);
    clause.eq_u64("a.student_id", filter.student_id);
    clause
}

fn student_where(filter: &StudentFilter) -> WhereClause {
    use crate::utils::db_utils::SqlValue;

    let mut clause = WhereClause::new();
    if let Some(search) = filter.search.as_deref().filter(|s| !s.is_empty()) {
        let like = SqlValue::String(format!("%{}%", search));
        clause.push(
            "(s.first_name LIKE ? OR s.last_name LIKE ? OR s.student_id LIKE ? OR s.email LIKE ?)",
            [like.clone(), like.clone(), like.clone(), like],
        );
    }
    clause.eq_u64("s.class_id", filter.class_id);
    clause.eq_str("s.status", filter.status.as_ref().map(|s| s.as_ref()));
    clause
}

/// Multi-row insert that overwrites status, notes, marker and `updated_at`
/// on the session key. Row-alias syntax needs MySQL 8.0.19 or later.
fn upsert_query(rows: &[NewAttendance], now: DateTime<Utc>) -> QueryBuilder<'_, MySql> {
    let mut qb: QueryBuilder<MySql> = QueryBuilder::new(
        "INSERT INTO attendances \
         (student_id, subject_id, class_id, teacher_id, date, status, notes, created_at, updated_at) ",
    );
    qb.push_values(rows, |mut b, row| {
        b.push_bind(row.student_id)
            .push_bind(row.subject_id)
            .push_bind(row.class_id)
            .push_bind(row.teacher_id)
            .push_bind(row.date)
            .push_bind(row.status.as_ref())
            .push_bind(row.notes.as_deref())
            .push_bind(now)
            .push_bind(now);
    });
    qb.push(
        " AS incoming ON DUPLICATE KEY UPDATE \
         status = incoming.status, \
         notes = incoming.notes, \
         teacher_id = incoming.teacher_id, \
         updated_at = incoming.updated_at",
    );
    qb
}

/// Field guarded by a unique key on `students`.
fn student_field_for_key(key: &str) -> Option<&'static str> {
    match key {
        "students_email_unique" => Some("email"),
        "students_student_id_unique" => Some("student_id"),
        _ => None,
    }
}

/// Turns a unique-key violation on `students` into a field-level error.
/// Every other failure, foreign keys included, stays a storage error.
fn map_student_write_error(e: sqlx::Error) -> AppError {
    if let Some(field) = duplicate_key(&e).as_deref().and_then(student_field_for_key) {
        return AppError::validation(field, format!("{} has already been taken", field));
    }
    error!(error = %e, "Student write failed");
    AppError::from(e)
}

#[async_trait]
impl SchoolStore for MySqlStore {
    async fn find_class(&self, id: u64) -> AppResult<Option<SchoolClass>> {
        let class = sqlx::query_as::<_, SchoolClass>(
            "SELECT id, name, section, grade_level, description FROM classes WHERE id = ?",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(class)
    }

    async fn find_subject(&self, id: u64) -> AppResult<Option<Subject>> {
        let subject = sqlx::query_as::<_, Subject>(
            "SELECT id, name, code, description FROM subjects WHERE id = ?",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(subject)
    }

    async fn find_student(&self, id: u64) -> AppResult<Option<StudentWithClass>> {
        let sql = format!(
            "SELECT {}, c.name AS class_name FROM students s JOIN classes c ON c.id = s.class_id WHERE s.id = ?",
            STUDENT_COLUMNS
        );
        let student = sqlx::query_as::<_, StudentWithClass>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(student)
    }

    async fn existing_student_ids(&self, ids: &[u64]) -> AppResult<Vec<u64>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let mut qb: QueryBuilder<MySql> = QueryBuilder::new("SELECT id FROM students WHERE id IN (");
        let mut separated = qb.separated(", ");
        for id in ids {
            separated.push_bind(*id);
        }
        separated.push_unseparated(")");

        let found = qb.build_query_scalar::<u64>().fetch_all(&self.pool).await?;
        Ok(found)
    }

    async fn has_assignment(&self, teacher_id: u64, class_id: u64, subject_id: u64) -> AppResult<bool> {
        let exists = sqlx::query_scalar::<_, i64>(
            r#"
            SELECT EXISTS(
                SELECT 1 FROM teacher_subjects
                WHERE user_id = ? AND class_id = ? AND subject_id = ?
                LIMIT 1
            )
            "#,
        )
        .bind(teacher_id)
        .bind(class_id)
        .bind(subject_id)
        .fetch_one(&self.pool)
        .await?;
        Ok(exists > 0)
    }

    async fn list_classes(&self) -> AppResult<Vec<SchoolClass>> {
        let classes = sqlx::query_as::<_, SchoolClass>(
            "SELECT id, name, section, grade_level, description FROM classes ORDER BY name, id",
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(classes)
    }

    async fn list_subjects(&self) -> AppResult<Vec<Subject>> {
        let subjects = sqlx::query_as::<_, Subject>(
            "SELECT id, name, code, description FROM subjects ORDER BY name, id",
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(subjects)
    }

    async fn list_assignments(&self, teacher_id: Option<u64>) -> AppResult<Vec<Assignment>> {
        let mut clause = WhereClause::new();
        clause.eq_u64("ts.user_id", teacher_id);
        let sql = format!("{} {} ORDER BY ts.id", ASSIGNMENT_SELECT, clause.to_sql());

        let assignments = bind_as(sqlx::query_as::<_, Assignment>(&sql), clause.values())
            .fetch_all(&self.pool)
            .await?;
        Ok(assignments)
    }

    async fn active_students_in_class(&self, class_id: u64) -> AppResult<Vec<Student>> {
        let sql = format!(
            "SELECT {} FROM students s WHERE s.class_id = ? AND s.status = 'active' ORDER BY s.first_name, s.id",
            STUDENT_COLUMNS
        );
        let students = sqlx::query_as::<_, Student>(&sql)
            .bind(class_id)
            .fetch_all(&self.pool)
            .await?;
        Ok(students)
    }

    async fn upsert_attendance(&self, rows: &[NewAttendance]) -> AppResult<u64> {
        if rows.is_empty() {
            return Ok(0);
        }

        let now = Utc::now();
        let mut tx = self.pool.begin().await?;

        let mut qb = upsert_query(rows, now);
        qb.build().execute(&mut *tx).await.map_err(|e| {
            error!(error = %e, rows = rows.len(), "Attendance upsert failed");
            AppError::from(e)
        })?;
        tx.commit().await?;

        Ok(rows.len() as u64)
    }

    async fn list_attendance(
        &self,
        filter: &AttendanceFilter,
        limit: u64,
        offset: u64,
    ) -> AppResult<(Vec<AttendanceEntry>, u64)> {
        let clause = attendance_where(filter);
        let where_sql = clause.to_sql();

        // ---------- total count ----------
        let count_sql = format!("SELECT COUNT(*) FROM attendances a {}", where_sql);
        debug!(sql = %count_sql, bindings = ?clause.values(), "Counting attendance");
        let total = bind_scalar(sqlx::query_scalar::<_, i64>(&count_sql), clause.values())
            .fetch_one(&self.pool)
            .await?;

        // ---------- data query ----------
        let data_sql = format!(
            "{} {} ORDER BY a.date DESC, a.id DESC LIMIT ? OFFSET ?",
            ENTRY_SELECT, where_sql
        );
        debug!(sql = %data_sql, limit, offset, "Fetching attendance");
        let entries = bind_as(sqlx::query_as::<_, AttendanceEntry>(&data_sql), clause.values())
            .bind(limit)
            .bind(offset)
            .fetch_all(&self.pool)
            .await?;

        Ok((entries, total.max(0) as u64))
    }

    async fn recent_attendance(&self, teacher_id: Option<u64>, limit: u64) -> AppResult<Vec<AttendanceEntry>> {
        let mut clause = WhereClause::new();
        clause.eq_u64("a.teacher_id", teacher_id);
        let sql = format!(
            "{} {} ORDER BY a.created_at DESC, a.id DESC LIMIT ?",
            ENTRY_SELECT,
            clause.to_sql()
        );

        let entries = bind_as(sqlx::query_as::<_, AttendanceEntry>(&sql), clause.values())
            .bind(limit)
            .fetch_all(&self.pool)
            .await?;
        Ok(entries)
    }

    async fn find_attendance(&self, id: u64) -> AppResult<Option<AttendanceEntry>> {
        let sql = format!("{} WHERE a.id = ?", ENTRY_SELECT);
        let entry = sqlx::query_as::<_, AttendanceEntry>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(entry)
    }

    async fn update_attendance(&self, id: u64, status: AttendanceStatus, notes: Option<String>) -> AppResult<bool> {
        let mut tx = self.pool.begin().await?;

        // rows_affected is 0 for an unchanged row, so lock and check first
        let found = sqlx::query_scalar::<_, u64>("SELECT id FROM attendances WHERE id = ? FOR UPDATE")
            .bind(id)
            .fetch_optional(&mut *tx)
            .await?;
        if found.is_none() {
            return Ok(false);
        }

        sqlx::query("UPDATE attendances SET status = ?, notes = ?, updated_at = ? WHERE id = ?")
            .bind(status.as_ref())
            .bind(notes)
            .bind(Utc::now())
            .bind(id)
            .execute(&mut *tx)
            .await?;
        tx.commit().await?;

        Ok(true)
    }

    async fn delete_attendance(&self, id: u64) -> AppResult<bool> {
        let result = sqlx::query("DELETE FROM attendances WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn school_totals(&self) -> AppResult<SchoolTotals> {
        let totals = sqlx::query_as::<_, SchoolTotals>(
            r#"
            SELECT
                (SELECT COUNT(*) FROM students) AS total_students,
                (SELECT COUNT(*) FROM students WHERE status = 'active') AS active_students,
                (SELECT COUNT(*) FROM users WHERE role = 'teacher') AS total_teachers,
                (SELECT COUNT(*) FROM classes) AS total_classes,
                (SELECT COUNT(*) FROM subjects) AS total_subjects
            "#,
        )
        .fetch_one(&self.pool)
        .await?;
        Ok(totals)
    }

    async fn day_counts(&self, date: NaiveDate, teacher_id: Option<u64>) -> AppResult<DayCounts> {
        let mut clause = WhereClause::new();
        clause.eq_date("date", Some(date));
        clause.eq_u64("teacher_id", teacher_id);
        let sql = format!(
            r#"
            SELECT
                COUNT(*) AS total,
                COUNT(CASE WHEN status = 'present' THEN 1 END) AS present,
                COUNT(CASE WHEN status = 'absent' THEN 1 END) AS absent
            FROM attendances {}
            "#,
            clause.to_sql()
        );

        let counts = bind_as(sqlx::query_as::<_, DayCounts>(&sql), clause.values())
            .fetch_one(&self.pool)
            .await?;
        Ok(counts)
    }

    async fn class_rollup(
        &self,
        date: NaiveDate,
        teacher_id: Option<u64>,
        limit: u64,
    ) -> AppResult<Vec<ClassAttendanceSummary>> {
        let teacher_cond = if teacher_id.is_some() { "AND a.teacher_id = ?" } else { "" };
        let scope = match teacher_id {
            Some(_) => "WHERE c.id IN (SELECT class_id FROM teacher_subjects WHERE user_id = ?) ORDER BY c.id",
            None => "ORDER BY c.id LIMIT ?",
        };
        let sql = format!(
            r#"
            SELECT
                c.id, c.name, c.section,
                (SELECT COUNT(*) FROM attendances a
                    WHERE a.class_id = c.id AND a.date = ? AND a.status = 'present' {teacher_cond}) AS present_count,
                (SELECT COUNT(*) FROM attendances a
                    WHERE a.class_id = c.id AND a.date = ? AND a.status = 'absent' {teacher_cond}) AS absent_count,
                (SELECT COUNT(*) FROM students s WHERE s.class_id = c.id) AS total_students
            FROM classes c
            {scope}
            "#
        );

        let mut query = sqlx::query_as::<_, ClassAttendanceSummary>(&sql);
        query = match teacher_id {
            Some(t) => query.bind(date).bind(t).bind(date).bind(t).bind(t),
            None => query.bind(date).bind(date).bind(limit),
        };

        let rows = query.fetch_all(&self.pool).await?;
        Ok(rows)
    }

    async fn list_students(
        &self,
        filter: &StudentFilter,
        limit: u64,
        offset: u64,
    ) -> AppResult<(Vec<StudentWithClass>, u64)> {
        let clause = student_where(filter);
        let where_sql = clause.to_sql();

        let count_sql = format!("SELECT COUNT(*) FROM students s {}", where_sql);
        debug!(sql = %count_sql, bindings = ?clause.values(), "Counting students");
        let total = bind_scalar(sqlx::query_scalar::<_, i64>(&count_sql), clause.values())
            .fetch_one(&self.pool)
            .await?;

        let data_sql = format!(
            "SELECT {}, c.name AS class_name FROM students s JOIN classes c ON c.id = s.class_id {} \
             ORDER BY s.id DESC LIMIT ? OFFSET ?",
            STUDENT_COLUMNS, where_sql
        );
        let students = bind_as(sqlx::query_as::<_, StudentWithClass>(&data_sql), clause.values())
            .bind(limit)
            .bind(offset)
            .fetch_all(&self.pool)
            .await?;

        Ok((students, total.max(0) as u64))
    }

    async fn student_code_taken(&self, code: &str, except_id: Option<u64>) -> AppResult<bool> {
        let taken = sqlx::query_scalar::<_, i64>(
            "SELECT EXISTS(SELECT 1 FROM students WHERE student_id = ? AND id <> ? LIMIT 1)",
        )
        .bind(code)
        .bind(except_id.unwrap_or(0))
        .fetch_one(&self.pool)
        .await?;
        Ok(taken > 0)
    }

    async fn student_email_taken(&self, email: &str, except_id: Option<u64>) -> AppResult<bool> {
        let taken = sqlx::query_scalar::<_, i64>(
            "SELECT EXISTS(SELECT 1 FROM students WHERE email = ? AND id <> ? LIMIT 1)",
        )
        .bind(email)
        .bind(except_id.unwrap_or(0))
        .fetch_one(&self.pool)
        .await?;
        Ok(taken > 0)
    }

    async fn insert_student(&self, input: &StudentInput) -> AppResult<u64> {
        let now = Utc::now();
        let result = sqlx::query(
            r#"
            INSERT INTO students
            (student_id, first_name, last_name, email, phone, date_of_birth, address, class_id, status, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&input.student_id)
        .bind(&input.first_name)
        .bind(&input.last_name)
        .bind(&input.email)
        .bind(&input.phone)
        .bind(input.date_of_birth)
        .bind(&input.address)
        .bind(input.class_id)
        .bind(input.status.as_ref())
        .bind(now)
        .bind(now)
        .execute(&self.pool)
        .await
        .map_err(map_student_write_error)?;

        Ok(result.last_insert_id())
    }

    async fn update_student(&self, id: u64, input: &StudentInput) -> AppResult<bool> {
        let mut tx = self.pool.begin().await?;

        let found = sqlx::query_scalar::<_, u64>("SELECT id FROM students WHERE id = ? FOR UPDATE")
            .bind(id)
            .fetch_optional(&mut *tx)
            .await?;
        if found.is_none() {
            return Ok(false);
        }

        sqlx::query(
            r#"
            UPDATE students SET
                student_id = ?, first_name = ?, last_name = ?, email = ?, phone = ?,
                date_of_birth = ?, address = ?, class_id = ?, status = ?, updated_at = ?
            WHERE id = ?
            "#,
        )
        .bind(&input.student_id)
        .bind(&input.first_name)
        .bind(&input.last_name)
        .bind(&input.email)
        .bind(&input.phone)
        .bind(input.date_of_birth)
        .bind(&input.address)
        .bind(input.class_id)
        .bind(input.status.as_ref())
        .bind(Utc::now())
        .bind(id)
        .execute(&mut *tx)
        .await
        .map_err(map_student_write_error)?;
        tx.commit().await?;

        Ok(true)
    }

    async fn delete_student(&self, id: u64) -> AppResult<bool> {
        // attendances.student_id cascades on delete
        let result = sqlx::query("DELETE FROM students WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mark(student_id: u64, status: AttendanceStatus) -> NewAttendance {
        NewAttendance {
            student_id,
            subject_id: 2,
            class_id: 1,
            teacher_id: 9,
            date: NaiveDate::from_ymd_opt(2024, 3, 1).unwrap(),
            status,
            notes: None,
        }
    }

    #[test]
    fn upsert_uses_a_row_alias_instead_of_values() {
        let rows = [mark(10, AttendanceStatus::Present), mark(11, AttendanceStatus::Absent)];
        let qb = upsert_query(&rows, Utc::now());
        let sql = qb.sql();

        assert!(!sql.contains("VALUES("));
        assert!(sql.contains(" AS incoming ON DUPLICATE KEY UPDATE"));
        assert!(sql.contains("teacher_id = incoming.teacher_id"));
        assert!(sql.contains("updated_at = incoming.updated_at"));
        // one placeholder tuple per row
        assert_eq!(sql.matches("(?, ?, ?, ?, ?, ?, ?, ?, ?)").count(), 2);
    }

    #[test]
    fn only_student_unique_keys_become_field_errors() {
        assert_eq!(student_field_for_key("students_email_unique"), Some("email"));
        assert_eq!(student_field_for_key("students_student_id_unique"), Some("student_id"));
        assert_eq!(student_field_for_key("attendances_session_unique"), None);
        assert_eq!(student_field_for_key("PRIMARY"), None);
    }

    #[test]
    fn non_duplicate_failures_stay_storage_errors() {
        assert!(matches!(
            map_student_write_error(sqlx::Error::RowNotFound),
            AppError::Storage(_)
        ));
    }
}
