use serde::{Deserialize, Serialize};
use ulid::Ulid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Owner,
    Staff,
    Player,
}

impl Role {
    /// Owners and staff run the facility dashboard; players only book.
    pub fn can_manage(&self) -> bool {
        matches!(self, Role::Owner | Role::Staff)
    }
}

/// Who is looking at which facility. Passed explicitly to every call that
/// scopes data or checks permissions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionContext {
    pub organization_id: Ulid,
    pub facility_id: Ulid,
    pub profile_id: Option<Ulid>,
    pub role: Role,
}

impl SessionContext {
    pub fn new(organization_id: Ulid, facility_id: Ulid, role: Role) -> Self {
        Self {
            organization_id,
            facility_id,
            profile_id: None,
            role,
        }
    }

    pub fn with_profile(mut self, profile_id: Ulid) -> Self {
        self.profile_id = Some(profile_id);
        self
    }

    /// Same user and organization, looking at another facility.
    pub fn with_facility(&self, facility_id: Ulid) -> Self {
        Self {
            facility_id,
            ..self.clone()
        }
    }
}
