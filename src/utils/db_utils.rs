use chrono::NaiveDate;
use sqlx::{
    MySql,
    mysql::{MySqlArguments, MySqlDatabaseError},
    query::{QueryAs, QueryScalar},
};

/// ===============================
/// SQL bindable value enum
/// ===============================
#[derive(Debug, Clone, PartialEq)]
pub enum SqlValue {
    String(String),
    U64(u64),
    Date(NaiveDate),
}

/// ===============================
/// Dynamic WHERE clause container
/// ===============================
#[derive(Debug, Default)]
pub struct WhereClause {
    conditions: Vec<String>,
    values: Vec<SqlValue>,
}

impl WhereClause {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a condition with one `?` placeholder per value.
    pub fn push(&mut self, condition: &str, values: impl IntoIterator<Item = SqlValue>) {
        self.conditions.push(condition.to_string());
        self.values.extend(values);
    }

    pub fn eq_u64(&mut self, column: &str, value: Option<u64>) {
        if let Some(v) = value {
            self.push(&format!("{} = ?", column), [SqlValue::U64(v)]);
        }
    }

    pub fn eq_date(&mut self, column: &str, value: Option<NaiveDate>) {
        if let Some(v) = value {
            self.push(&format!("{} = ?", column), [SqlValue::Date(v)]);
        }
    }

    pub fn eq_str(&mut self, column: &str, value: Option<&str>) {
        if let Some(v) = value {
            self.push(&format!("{} = ?", column), [SqlValue::String(v.to_string())]);
        }
    }

    /// `WHERE a AND b`, or an empty string when there are no conditions.
    pub fn to_sql(&self) -> String {
        if self.conditions.is_empty() {
            String::new()
        } else {
            format!("WHERE {}", self.conditions.join(" AND "))
        }
    }

    pub fn values(&self) -> &[SqlValue] {
        &self.values
    }
}

/// ===============================
/// Bind collected values
/// ===============================
pub fn bind_as<'q, O>(
    mut query: QueryAs<'q, MySql, O, MySqlArguments>,
    values: &[SqlValue],
) -> QueryAs<'q, MySql, O, MySqlArguments> {
    for value in values {
        query = match value.clone() {
            SqlValue::String(v) => query.bind(v),
            SqlValue::U64(v) => query.bind(v),
            SqlValue::Date(v) => query.bind(v),
        };
    }
    query
}

pub fn bind_scalar<'q, O>(
    mut query: QueryScalar<'q, MySql, O, MySqlArguments>,
    values: &[SqlValue],
) -> QueryScalar<'q, MySql, O, MySqlArguments> {
    for value in values {
        query = match value.clone() {
            SqlValue::String(v) => query.bind(v),
            SqlValue::U64(v) => query.bind(v),
            SqlValue::Date(v) => query.bind(v),
        };
    }
    query
}

/// MySQL `ER_DUP_ENTRY`. SQLSTATE 23000 alone also covers foreign-key and NOT NULL failures.
pub const ER_DUP_ENTRY: u16 = 1062;

/// Name of the unique key a duplicate-entry error reports; `None` for any other error.
pub fn duplicate_key(e: &sqlx::Error) -> Option<String> {
    let sqlx::Error::Database(db_err) = e else {
        return None;
    };
    let mysql = db_err.try_downcast_ref::<MySqlDatabaseError>()?;
    if mysql.number() != ER_DUP_ENTRY {
        return None;
    }
    key_in_message(mysql.message()).map(str::to_string)
}

/// Pulls the key out of "Duplicate entry 'x' for key 'table.key'".
/// MySQL 5.7 omits the `table.` prefix.
pub fn key_in_message(message: &str) -> Option<&str> {
    let (_, rest) = message.rsplit_once("for key '")?;
    let key = rest.split('\'').next()?;
    Some(key.rsplit_once('.').map_or(key, |(_, k)| k))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_clause_renders_nothing() {
        let clause = WhereClause::new();
        assert_eq!(clause.to_sql(), "");
        assert!(clause.values().is_empty());
    }

    #[test]
    fn optional_filters_are_skipped_when_absent() {
        let date = NaiveDate::from_ymd_opt(2024, 3, 1).unwrap();
        let mut clause = WhereClause::new();
        clause.eq_date("a.date", Some(date));
        clause.eq_u64("a.class_id", None);
        clause.eq_u64("a.subject_id", Some(2));

        assert_eq!(clause.to_sql(), "WHERE a.date = ? AND a.subject_id = ?");
        assert_eq!(clause.values(), &[SqlValue::Date(date), SqlValue::U64(2)]);
    }

    #[test]
    fn multi_placeholder_condition_keeps_value_order() {
        let mut clause = WhereClause::new();
        let like = SqlValue::String("%ami%".into());
        clause.push("(first_name LIKE ? OR last_name LIKE ?)", [like.clone(), like.clone()]);
        clause.eq_str("status", Some("active"));

        assert_eq!(clause.values().len(), 3);
        assert_eq!(clause.values()[2], SqlValue::String("active".into()));
    }

    #[test]
    fn duplicate_key_name_is_read_from_the_message() {
        assert_eq!(
            key_in_message("Duplicate entry 'a@x.test' for key 'students.students_email_unique'"),
            Some("students_email_unique")
        );
        assert_eq!(
            key_in_message("Duplicate entry 'S-1' for key 'students_student_id_unique'"),
            Some("students_student_id_unique")
        );
        // the entry value itself may mention other key names
        assert_eq!(
            key_in_message("Duplicate entry 'email-1' for key 'students.students_student_id_unique'"),
            Some("students_student_id_unique")
        );
        assert_eq!(key_in_message("Cannot add or update a child row"), None);
    }

    #[test]
    fn non_database_errors_are_not_duplicates() {
        assert_eq!(duplicate_key(&sqlx::Error::RowNotFound), None);
    }
}
