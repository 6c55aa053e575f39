use serde::{Deserialize, Serialize};
use strum::IntoEnumIterator;
use strum_macros::{AsRefStr, Display, EnumIter, EnumString};
use utoipa::ToSchema;

/// HR dashboard capabilities that can be granted per user.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema, Display, EnumString, EnumIter, AsRefStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum Privilege {
    ManageEmployees,
    ManageShifts,
    ManageWorkUnits,
    ApproveLeave,
    ViewReports,
}

impl Privilege {
    pub fn all() -> Vec<Privilege> {
        Privilege::iter().collect()
    }
}

/// One row of `user_privileges`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow, ToSchema)]
pub struct PrivilegeSet {
    #[serde(default)]
    pub manage_employees: bool,
    #[serde(default)]
    pub manage_shifts: bool,
    #[serde(default)]
    pub manage_work_units: bool,
    #[serde(default)]
    pub approve_leave: bool,
    #[serde(default)]
    pub view_reports: bool,
}

impl PrivilegeSet {
    pub fn contains(&self, privilege: Privilege) -> bool {
        match privilege {
            Privilege::ManageEmployees => self.manage_employees,
            Privilege::ManageShifts => self.manage_shifts,
            Privilege::ManageWorkUnits => self.manage_work_units,
            Privilege::ApproveLeave => self.approve_leave,
            Privilege::ViewReports => self.view_reports,
        }
    }

    pub fn to_list(&self) -> Vec<Privilege> {
        Privilege::iter().filter(|p| self.contains(*p)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_to_list_keeps_only_granted() {
        let set = PrivilegeSet {
            approve_leave: true,
            view_reports: true,
            ..Default::default()
        };
        assert_eq!(
            set.to_list(),
            vec![Privilege::ApproveLeave, Privilege::ViewReports]
        );
    }

    #[test]
    fn test_privilege_names_are_snake_case() {
        assert_eq!(Privilege::ManageWorkUnits.to_string(), "manage_work_units");
        assert_eq!(
            serde_json::to_string(&Privilege::ViewReports).unwrap(),
            "\"view_reports\""
        );
    }
}
