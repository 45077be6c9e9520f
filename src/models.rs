use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Position of a match in the service's ranking for one load. Unique within
/// that load only; a refresh may hand the same id to a different job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CandidateId(pub usize);

impl fmt::Display for CandidateId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0 + 1)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Candidate {
    pub id: CandidateId,
    pub job_ref: Option<String>, // service-side job id, display only
    pub title: String,
    pub company: String,
    pub location: String,
    pub score: u8, // 0..=100
    pub breakdown: BTreeMap<String, u8>,
    pub strengths: Vec<String>,
    pub missing_skills: Vec<String>,
    pub suggestions: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Accept,
    Reject,
}

impl Direction {
    pub fn label(&self) -> &'static str {
        match self {
            Direction::Accept => "apply",
            Direction::Reject => "pass",
        }
    }
}

/// One accept/reject outcome for one candidate. Consumed once by the effects
/// stage and never persisted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Decision {
    pub candidate_id: CandidateId,
    pub direction: Direction,
}

#[cfg(test)]
impl Decision {
    pub fn accept(candidate_id: CandidateId) -> Self {
        Self { candidate_id, direction: Direction::Accept }
    }

    pub fn reject(candidate_id: CandidateId) -> Self {
        Self { candidate_id, direction: Direction::Reject }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Identity {
    pub id: String,
    pub full_name: String,
    pub email: String,
}

/// A row from the listings endpoint, used by `matchdeck jobs`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobListing {
    #[serde(rename = "_id", default)]
    pub id: Option<String>,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub company: String,
    #[serde(default)]
    pub location: String,
    #[serde(default)]
    pub skills_required: Vec<String>,
    pub experience_level: Option<String>,
    pub salary_range: Option<String>,
    pub url: Option<String>,
}
