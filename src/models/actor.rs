use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    SuperAdmin,
    SchoolAdmin,
    Staff,
    Applicant,
}

impl std::str::FromStr for Role {
    type Err = crate::error::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "super_admin" | "superadmin" => Ok(Role::SuperAdmin),
            "school_admin" | "schooladmin" => Ok(Role::SchoolAdmin),
            "staff" => Ok(Role::Staff),
            "applicant" => Ok(Role::Applicant),
            other => Err(crate::error::Error::Unauthorized(format!("Unknown role: {}", other))),
        }
    }
}

/// The already-authenticated caller, passed explicitly into every engine operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Actor {
    pub id: Uuid,
    pub role: Role,
    pub school_id: Option<Uuid>,
}

impl Actor {
    pub fn new(id: Uuid, role: Role, school_id: Option<Uuid>) -> Self {
        Self { id, role, school_id }
    }

    pub fn can_review(&self, school_id: Uuid) -> bool {
        match self.role {
            Role::SuperAdmin => true,
            Role::SchoolAdmin | Role::Staff => self.school_id == Some(school_id),
            Role::Applicant => false,
        }
    }

    /// Applicants see their own applications; reviewers see their school's.
    pub fn ensure_can_view(&self, applicant_id: Uuid, school_id: Uuid) -> crate::error::Result<()> {
        if self.role == Role::Applicant && self.id == applicant_id {
            return Ok(());
        }
        self.ensure_can_review(school_id)
    }

    pub fn ensure_can_review(&self, school_id: Uuid) -> crate::error::Result<()> {
        if self.can_review(school_id) {
            Ok(())
        } else {
            Err(crate::error::Error::Forbidden(
                "Not allowed to review applications for this school".into(),
            ))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn staff_are_scoped_to_their_school() {
        let school = Uuid::new_v4();
        let staff = Actor::new(Uuid::new_v4(), Role::Staff, Some(school));
        assert!(staff.can_review(school));
        assert!(!staff.can_review(Uuid::new_v4()));

        let admin = Actor::new(Uuid::new_v4(), Role::SuperAdmin, None);
        assert!(admin.can_review(school));

        let applicant = Actor::new(Uuid::new_v4(), Role::Applicant, Some(school));
        assert!(!applicant.can_review(school));
    }

    #[test]
    fn role_parsing_is_case_insensitive() {
        assert_eq!("SCHOOL_ADMIN".parse::<Role>().unwrap(), Role::SchoolAdmin);
        assert!("janitor".parse::<Role>().is_err());
    }

    #[test]
    fn applicants_only_view_their_own() {
        let school = Uuid::new_v4();
        let me = Actor::new(Uuid::new_v4(), Role::Applicant, None);
        assert!(me.ensure_can_view(me.id, school).is_ok());
        assert!(matches!(
            me.ensure_can_view(Uuid::new_v4(), school),
            Err(crate::error::Error::Forbidden(_))
        ));
    }
}
