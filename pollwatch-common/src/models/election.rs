//! Elections and polling stations referenced by submissions

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

use super::{unknown_value, Location};
use crate::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ElectionType {
    General,
    ByElection,
    Referendum,
}

impl ElectionType {
    pub const ALL: [&'static str; 3] = ["general", "by_election", "referendum"];

    pub fn as_str(&self) -> &'static str {
        match self {
            ElectionType::General => "general",
            ElectionType::ByElection => "by_election",
            ElectionType::Referendum => "referendum",
        }
    }
}

impl FromStr for ElectionType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "general" => Ok(ElectionType::General),
            "by_election" => Ok(ElectionType::ByElection),
            "referendum" => Ok(ElectionType::Referendum),
            other => Err(unknown_value("election_type", other, &ElectionType::ALL)),
        }
    }
}

/// An election event (general, by-election, referendum)
#[derive(Debug, Clone, Serialize)]
pub struct Election {
    pub id: i64,
    pub name: String,
    pub date: NaiveDate,
    pub election_type: ElectionType,
    pub description: String,
    /// Only active elections accept new submissions
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

/// A polling station
#[derive(Debug, Clone, Serialize)]
pub struct PollingStation {
    pub id: i64,
    pub name: String,
    pub code: String,
    pub constituency: String,
    pub county: String,
    #[serde(flatten)]
    pub location: Option<Location>,
    pub registered_voters: i64,
    pub created_at: DateTime<Utc>,
}
