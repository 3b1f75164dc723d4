use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumString};
use utoipa::ToSchema;

use crate::error::{AppError, AppResult};

#[derive(
    Debug, Copy, Clone, Eq, PartialEq, Hash, Serialize, Deserialize, EnumString, Display, AsRefStr, ToSchema,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Role {
    Admin,
    Teacher,
}

impl Role {
    pub fn from_name(name: &str) -> Option<Self> {
        name.parse().ok()
    }
}

/// The acting user of an operation. Authentication happens at the HTTP
/// boundary; services only branch on the role.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct Principal {
    pub id: u64,
    pub role: Role,
}

impl Principal {
    pub fn admin(id: u64) -> Self {
        Self { id, role: Role::Admin }
    }

    pub fn teacher(id: u64) -> Self {
        Self {
            id,
            role: Role::Teacher,
        }
    }

    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }

    pub fn require_admin(&self) -> AppResult<()> {
        if self.is_admin() {
            Ok(())
        } else {
            Err(AppError::forbidden("Admin only"))
        }
    }

    /// `Some(id)` when the principal's reads must be scoped to rows it owns.
    pub fn teacher_scope(&self) -> Option<u64> {
        match self.role {
            Role::Admin => None,
            Role::Teacher => Some(self.id),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn role_names_round_trip_through_strum() {
        assert_eq!(Role::from_name("admin"), Some(Role::Admin));
        assert_eq!(Role::from_name("teacher"), Some(Role::Teacher));
        assert_eq!(Role::from_name("hr"), None);
        assert_eq!(Role::Teacher.as_ref(), "teacher");
    }

    #[test]
    fn only_teachers_are_scoped() {
        assert_eq!(Principal::admin(1).teacher_scope(), None);
        assert_eq!(Principal::teacher(7).teacher_scope(), Some(7));
    }

    #[test]
    fn only_admins_pass_the_admin_gate() {
        assert!(Principal::admin(1).require_admin().is_ok());
        assert!(matches!(
            Principal::teacher(7).require_admin(),
            Err(AppError::Forbidden(_))
        ));
    }
}
