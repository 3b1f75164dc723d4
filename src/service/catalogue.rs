//! Class and subject option lists, and the model behind the recording form.

use std::collections::{HashMap, HashSet};

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

use super::roster::{RosterEntry, resolve_roster};
use crate::error::AppResult;
use crate::model::{role::Principal, school_class::SchoolClass, subject::Subject};
use crate::store::{Assignment, SchoolStore};

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct CatalogueOptions {
    pub classes: Vec<SchoolClass>,
    pub subjects: Vec<Subject>,
}

/// Admins get every class and subject; teachers the ones they are assigned.
pub async fn options(store: &dyn SchoolStore, principal: &Principal) -> AppResult<CatalogueOptions> {
    match principal.teacher_scope() {
        None => Ok(CatalogueOptions {
            classes: store.list_classes().await?,
            subjects: store.list_subjects().await?,
        }),
        Some(teacher_id) => Ok(distinct_options(store.list_assignments(Some(teacher_id)).await?)),
    }
}

/// Distinct classes and subjects of `assignments`, first occurrence wins.
fn distinct_options(assignments: Vec<Assignment>) -> CatalogueOptions {
    let mut seen_classes = HashSet::new();
    let mut seen_subjects = HashSet::new();
    let mut classes = Vec::new();
    let mut subjects = Vec::new();

    for a in assignments {
        if seen_classes.insert(a.class.id) {
            classes.push(a.class);
        }
        if seen_subjects.insert(a.subject.id) {
            subjects.push(Subject::from(a.subject));
        }
    }

    CatalogueOptions { classes, subjects }
}

#[derive(Debug, Deserialize, IntoParams)]
pub struct SessionFormQuery {
    /// Class to load the roster for
    pub class_id: Option<u64>,
    /// Subject being recorded
    pub subject_id: Option<u64>,
    /// Session date, defaults to today
    pub date: Option<NaiveDate>,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct SessionForm {
    pub classes: Vec<SchoolClass>,
    pub subjects: Vec<Subject>,
    /// Empty until both a class and a subject are selected.
    pub students: Vec<RosterEntry>,
    pub selected_class: Option<u64>,
    pub selected_subject: Option<u64>,
    pub date: NaiveDate,
}

/// Everything the recording form needs. Options come from assignments:
/// all of them for admins, the principal's own for teachers.
pub async fn session_form(
    store: &dyn SchoolStore,
    principal: &Principal,
    query: SessionFormQuery,
    today: NaiveDate,
) -> AppResult<SessionForm> {
    let CatalogueOptions { classes, subjects } =
        distinct_options(store.list_assignments(principal.teacher_scope()).await?);

    let students = match (query.class_id, query.subject_id) {
        (Some(class_id), Some(subject_id)) => {
            resolve_roster(store, class_id, subject_id, &HashMap::new()).await?
        }
        _ => Vec::new(),
    };

    Ok(SessionForm {
        classes,
        subjects,
        students,
        selected_class: query.class_id,
        selected_subject: query.subject_id,
        date: query.date.unwrap_or(today),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{role::Role, student::StudentStatus};
    use crate::store::MemoryStore;

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 3, 4).unwrap()
    }

    #[actix_web::test]
    async fn teacher_options_are_distinct_assignments() {
        let store = MemoryStore::new();
        let teacher = store.add_user("T", Role::Teacher);
        let c1 = store.add_class("Grade 7", None, 7);
        let c2 = store.add_class("Grade 8", None, 8);
        store.add_class("Grade 9", None, 9);
        let math = store.add_subject("Math", "M");
        let art = store.add_subject("Art", "A");
        store.assign(teacher, math, c1);
        store.assign(teacher, art, c1);
        store.assign(teacher, math, c2);

        let opts = options(&store, &Principal::teacher(teacher)).await.unwrap();
        let class_ids: Vec<u64> = opts.classes.iter().map(|c| c.id).collect();
        let subject_ids: Vec<u64> = opts.subjects.iter().map(|s| s.id).collect();
        assert_eq!(class_ids, vec![c1, c2]);
        assert_eq!(subject_ids, vec![math, art]);

        let admin = options(&store, &Principal::admin(1)).await.unwrap();
        assert_eq!(admin.classes.len(), 3);
        assert_eq!(admin.subjects[0].name, "Art");
    }

    #[actix_web::test]
    async fn session_form_defaults_date_and_skips_roster_without_selection() {
        let store = MemoryStore::new();
        let form = session_form(
            &store,
            &Principal::admin(1),
            SessionFormQuery {
                class_id: None,
                subject_id: None,
                date: None,
            },
            today(),
        )
        .await
        .unwrap();

        assert_eq!(form.date, today());
        assert!(form.students.is_empty());
    }

    #[actix_web::test]
    async fn session_form_loads_roster_when_both_selected() {
        let store = MemoryStore::new();
        let teacher = store.add_user("T", Role::Teacher);
        let class = store.add_class("Grade 7", None, 7);
        let subject = store.add_subject("Math", "M");
        store.assign(teacher, subject, class);
        store.add_student("S-1", "Ann", "One", class, StudentStatus::Active);
        store.add_student("S-2", "Bo", "Two", class, StudentStatus::Inactive);

        let date = NaiveDate::from_ymd_opt(2024, 2, 28).unwrap();
        let form = session_form(
            &store,
            &Principal::teacher(teacher),
            SessionFormQuery {
                class_id: Some(class),
                subject_id: Some(subject),
                date: Some(date),
            },
            today(),
        )
        .await
        .unwrap();

        assert_eq!(form.students.len(), 1);
        assert_eq!(form.date, date);
        assert_eq!(form.selected_class, Some(class));
    }
}
