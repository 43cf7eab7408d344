// src/models/role.rs

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// The closed set of organizational roles. Every principal carries exactly one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "i16", into = "i16")]
pub enum Role {
    SystemAdministrator,
    ProcurementManager,
    TeamLeader,
    Officer,
    Requester,
    UnitManager,
    Executive,
    TechnicalOperator,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("Invalid role code: {0}")]
pub struct RoleError(pub i16);

impl Role {
    pub const ALL: [Role; 8] = [
        Role::SystemAdministrator,
        Role::ProcurementManager,
        Role::TeamLeader,
        Role::Officer,
        Role::Requester,
        Role::UnitManager,
        Role::Executive,
        Role::TechnicalOperator,
    ];

    pub fn code(self) -> i16 {
        match self {
            Role::SystemAdministrator => 0,
            Role::ProcurementManager => 1,
            Role::TeamLeader => 2,
            Role::Officer => 3,
            Role::Requester => 4,
            Role::UnitManager => 5,
            Role::Executive => 6,
            Role::TechnicalOperator => 9,
        }
    }

    pub fn from_code(code: i16) -> Result<Self, RoleError> {
        Role::ALL
            .into_iter()
            .find(|role| role.code() == code)
            .ok_or(RoleError(code))
    }

    pub fn name(self) -> &'static str {
        match self {
            Role::SystemAdministrator => "System Administrator",
            Role::ProcurementManager => "Procurement Manager",
            Role::TeamLeader => "Team Leader",
            Role::Officer => "Officer",
            Role::Requester => "Requester",
            Role::UnitManager => "Unit Manager",
            Role::Executive => "Executive",
            Role::TechnicalOperator => "Technical Operator",
        }
    }

    /// Roles whose workers belong to a procurement team.
    pub fn has_procurement_team(self) -> bool {
        matches!(self, Role::TeamLeader | Role::Officer)
    }

    /// Roles whose workers are affiliated with a division/department.
    pub fn has_org_unit(self) -> bool {
        matches!(self, Role::Requester | Role::UnitManager)
    }
}

impl TryFrom<i16> for Role {
    type Error = RoleError;

    fn try_from(code: i16) -> Result<Self, Self::Error> {
        Role::from_code(code)
    }
}

impl From<Role> for i16 {
    fn from(role: Role) -> Self {
        role.code()
    }
}

pub fn role_name(code: i16) -> Result<&'static str, RoleError> {
    Role::from_code(code).map(Role::name)
}

pub fn is_valid_role(code: i16) -> bool {
    Role::from_code(code).is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn codes_round_trip_through_the_registry() {
        for role in Role::ALL {
            assert_eq!(Role::from_code(role.code()), Ok(role));
        }
    }

    #[test]
    fn unknown_codes_are_rejected() {
        for code in [-1, 7, 8, 10, 99] {
            assert!(!is_valid_role(code));
            assert_eq!(role_name(code), Err(RoleError(code)));
        }
    }

    #[test]
    fn names_follow_codes() {
        assert_eq!(role_name(1), Ok("Procurement Manager"));
        assert_eq!(role_name(9), Ok("Technical Operator"));
    }

    #[test]
    fn deserializing_an_unknown_code_fails() {
        let parsed: Result<Role, _> = serde_json::from_str("7");
        assert!(parsed.is_err());
        let parsed: Role = serde_json::from_str("3").unwrap();
        assert_eq!(parsed, Role::Officer);
        assert_eq!(serde_json::to_string(&Role::Requester).unwrap(), "4");
    }
}
