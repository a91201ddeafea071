//! Verification modes and role requirements.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// How a request must prove it belongs to an LTI launch.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RequestType {
    /// A freshly signed launch POST from the consumer.
    Initial,
    /// A follow-up request inside an already verified session.
    Session,
    /// Session first, signed launch otherwise.
    Any,
}

/// Role a launch must carry for the surrounding handler to accept it.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RoleType {
    Any,
    Staff,
    Instructor,
    Administrator,
    Student,
}

const LIS_ROLE_PREFIX: &str = "urn:lti:role:ims/lis/";

impl RoleType {
    /// LIS role names satisfying this requirement. Empty for [`RoleType::Any`].
    pub fn accepted_roles(self) -> &'static [&'static str] {
        match self {
            RoleType::Any => &[],
            RoleType::Staff => &["Administrator", "Instructor"],
            RoleType::Instructor => &["Instructor"],
            RoleType::Administrator => &["Administrator"],
            RoleType::Student => &["Student", "Learner"],
        }
    }

    /// Whether any of `roles` satisfies this requirement.
    ///
    /// Full LIS URNs match on their last path segment, so
    /// `urn:lti:role:ims/lis/Instructor` counts as `Instructor`.
    pub fn permits<S: AsRef<str>>(self, roles: &[S]) -> bool {
        if self == RoleType::Any {
            return true;
        }
        let accepted = self.accepted_roles();
        roles.iter().any(|role| {
            let role = role.as_ref().trim();
            let role = role.strip_prefix(LIS_ROLE_PREFIX).unwrap_or(role);
            accepted.contains(&role)
        })
    }
}

impl RequestType {
    pub fn as_str(self) -> &'static str {
        match self {
            RequestType::Initial => "initial",
            RequestType::Session => "session",
            RequestType::Any => "any",
        }
    }
}

impl RoleType {
    pub fn as_str(self) -> &'static str {
        match self {
            RoleType::Any => "any",
            RoleType::Staff => "staff",
            RoleType::Instructor => "instructor",
            RoleType::Administrator => "administrator",
            RoleType::Student => "student",
        }
    }
}

impl fmt::Display for RequestType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl fmt::Display for RoleType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RequestType {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "initial" => Ok(RequestType::Initial),
            "session" => Ok(RequestType::Session),
            "any" => Ok(RequestType::Any),
            other => Err(format!("Unknown request type: {other}")),
        }
    }
}

impl FromStr for RoleType {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "any" => Ok(RoleType::Any),
            "staff" => Ok(RoleType::Staff),
            "instructor" => Ok(RoleType::Instructor),
            "administrator" => Ok(RoleType::Administrator),
            "student" => Ok(RoleType::Student),
            other => Err(format!("Unknown role type: {other}")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_and_display() {
        for s in ["initial", "session", "any"] {
            assert_eq!(s.parse::<RequestType>().unwrap().to_string(), s);
        }
        for s in ["any", "staff", "instructor", "administrator", "student"] {
            assert_eq!(s.parse::<RoleType>().unwrap().to_string(), s);
        }
        assert!("bogus".parse::<RequestType>().is_err());
        assert!("teacher".parse::<RoleType>().is_err());
    }

    #[test]
    fn staff_accepts_instructor_and_administrator() {
        assert!(RoleType::Staff.permits(&["Instructor", "Staff"]));
        assert!(RoleType::Staff.permits(&["Administrator"]));
        assert!(!RoleType::Staff.permits(&["Learner"]));
    }

    #[test]
    fn student_accepts_learner() {
        assert!(RoleType::Student.permits(&["Learner"]));
        assert!(RoleType::Student.permits(&["urn:lti:role:ims/lis/Student"]));
        assert!(!RoleType::Student.permits(&["Instructor"]));
    }

    #[test]
    fn any_accepts_empty_roles() {
        let none: [&str; 0] = [];
        assert!(RoleType::Any.permits(&none));
        assert!(!RoleType::Instructor.permits(&none));
    }
}
