//! Users acting on the API and their capabilities

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use super::unknown_value;
use crate::Error;

/// Role held by a registered user
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    /// Staff administrator
    Admin,
    /// Accredited observer / civil society organisation
    Observer,
    /// Registered citizen reporter
    Citizen,
}

impl Role {
    pub const ALL: [&'static str; 3] = ["admin", "observer", "citizen"];

    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Admin => "admin",
            Role::Observer => "observer",
            Role::Citizen => "citizen",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "admin" => Ok(Role::Admin),
            "observer" => Ok(Role::Observer),
            "citizen" => Ok(Role::Citizen),
            other => Err(unknown_value("role", other, &Role::ALL)),
        }
    }
}

/// Authenticated caller resolved from an API token
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Actor {
    pub id: i64,
    pub username: String,
    pub role: Role,
    pub organization: String,
}

impl Actor {
    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }

    /// Reference used when recording this actor on another record
    pub fn user_ref(&self) -> UserRef {
        UserRef {
            id: self.id,
            username: self.username.clone(),
        }
    }
}

/// The single capability check for verification actions:
/// administrators and accredited observers may verify, nobody else.
pub fn can_verify(actor: &Actor) -> bool {
    matches!(actor.role, Role::Admin | Role::Observer)
}

/// Lightweight user reference embedded in serialized records
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserRef {
    pub id: i64,
    pub username: String,
}
