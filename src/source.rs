//! Where deck contents come from: fetching, decoding and normalising the
//! service's ranked match list, plus the bookkeeping that lets a refresh
//! supersede an older in-flight load.

use rand::Rng;
use rand::seq::SliceRandom;
use serde::Deserialize;
use serde_json::Value;
use std::collections::BTreeMap;
use tracing::{debug, info, warn};

use crate::api::ApiClient;
use crate::deck::Deck;
use crate::errors::FetchError;
use crate::models::{Candidate, CandidateId};
use crate::session::Session;

/// Anything that can produce a ranked, best-first match list for a resume.
pub trait MatchSource: Send + Sync {
    fn fetch(&self, resume_ref: &str) -> Result<Vec<Candidate>, FetchError>;
    fn name(&self) -> &str;
}

/// Load the deck contents for a session, in deck order (best match last, so
/// it is the top card). No resume means no matches and no request.
pub fn load(session: &Session, source: &dyn MatchSource) -> Result<Vec<Candidate>, FetchError> {
    let Some(resume_ref) = session.resume_ref() else {
        debug!("No resume reference; skipping match fetch");
        return Ok(Vec::new());
    };

    let mut ranked = source.fetch(resume_ref)?;
    info!("Loaded {} matches for resume {} from {}", ranked.len(), resume_ref, source.name());
    ranked.reverse();
    Ok(ranked)
}

// --- HTTP source ---

pub struct HttpMatchSource {
    api: ApiClient,
}

impl HttpMatchSource {
    pub fn new(api: ApiClient) -> Self {
        Self { api }
    }
}

impl MatchSource for HttpMatchSource {
    fn fetch(&self, resume_ref: &str) -> Result<Vec<Candidate>, FetchError> {
        let body = self.api.fetch_matches(resume_ref)?;
        parse_matches(&body)
    }

    fn name(&self) -> &str {
        self.api.base_url()
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct MatchDetails {
    strengths: Option<Vec<String>>,
    missing_skills: Option<Vec<String>>,
}

/// One record as the service sends it. Everything is optional so that a
/// sparse record still decodes; a record with wrongly-typed fields does not.
/// Both spellings of a renamed field may appear together; the first one
/// listed wins.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct MatchRecord {
    id: Option<Value>,
    job_id: Option<Value>,
    title: Option<String>,
    job_title: Option<String>,
    company: Option<String>,
    location: Option<String>,
    score: Option<f64>,
    match_score: Option<f64>,
    breakdown: Option<BTreeMap<String, f64>>,
    semantic_score: Option<f64>,
    skill_match: Option<f64>,
    strengths: Option<Vec<String>>,
    missing_skills: Option<Vec<String>>,
    #[serde(rename = "missingSkills")]
    missing_skills_camel: Option<Vec<String>>,
    suggestions: Option<Vec<String>>,
    details: Option<MatchDetails>,
}

impl MatchRecord {
    fn into_candidate(self, rank: usize) -> Candidate {
        let breakdown = match self.breakdown {
            Some(map) => map.into_iter().map(|(k, v)| (k, percent(v))).collect(),
            None => {
                let mut map = BTreeMap::new();
                if let Some(v) = self.semantic_score {
                    map.insert("semantic".to_string(), percent(v));
                }
                if let Some(v) = self.skill_match {
                    map.insert("skills".to_string(), percent(v));
                }
                map
            }
        };

        let details = self.details.unwrap_or_default();

        Candidate {
            id: CandidateId(rank),
            job_ref: self.id.or(self.job_id).and_then(|v| match v {
                Value::String(s) => Some(s),
                Value::Number(n) => Some(n.to_string()),
                _ => None,
            }),
            title: self.title.or(self.job_title).unwrap_or_default(),
            company: self.company.unwrap_or_default(),
            location: self.location.unwrap_or_default(),
            score: percent(self.score.or(self.match_score).unwrap_or(0.0)),
            breakdown,
            strengths: self.strengths.or(details.strengths).unwrap_or_default(),
            missing_skills: self
                .missing_skills
                .or(self.missing_skills_camel)
                .or(details.missing_skills)
                .unwrap_or_default(),
            suggestions: self.suggestions.unwrap_or_default(),
        }
    }
}

/// Round and clamp a service score into 0..=100.
fn percent(value: f64) -> u8 {
    if value.is_finite() {
        value.round().clamp(0.0, 100.0) as u8
    } else {
        0
    }
}

/// Decode a match-list body into candidates in service (best-first) order.
/// Accepts `{"matches": [...]}` or a bare array. Records that fail to decode
/// are dropped individually.
pub fn parse_matches(body: &str) -> Result<Vec<Candidate>, FetchError> {
    let value: Value = serde_json::from_str(body)?;
    let records = match value {
        Value::Array(items) => items,
        Value::Object(mut obj) => match obj.remove("matches") {
            Some(Value::Array(items)) => items,
            Some(Value::Null) | None => Vec::new(),
            Some(_) => return Err(FetchError::Malformed("'matches' is not a list".to_string())),
        },
        _ => return Err(FetchError::Malformed("expected an object or a list".to_string())),
    };

    let mut candidates = Vec::with_capacity(records.len());
    for (rank, raw) in records.into_iter().enumerate() {
        if !raw.is_object() {
            warn!("Dropping match record {rank}: not an object");
            continue;
        }
        match serde_json::from_value::<MatchRecord>(raw) {
            Ok(record) => candidates.push(record.into_candidate(rank)),
            Err(e) => warn!("Dropping match record {rank}: {e}"),
        }
    }
    Ok(candidates)
}

// --- Placeholder source ---

const DEMO_JOBS: &[(&str, &str, &str)] = &[
    ("Backend Engineer", "Northwind Labs", "Remote"),
    ("Data Analyst", "Blue Harbor", "Austin, TX"),
    ("Platform Engineer", "Tech Corp", "Berlin"),
    ("ML Engineer", "Quantum Fields", "San Francisco, CA"),
    ("Frontend Developer", "Pastel Studio", "Remote"),
    ("Site Reliability Engineer", "Cloudline", "Toronto"),
];

const DEMO_SKILLS: &[&str] = &[
    "python", "rust", "sql", "docker", "kubernetes", "aws", "react", "typescript", "git",
];

/// Random matches for demos when no service is available. Scores are
/// meaningless; only the shape matches the real thing.
pub struct PlaceholderSource {
    skills: Vec<String>,
}

impl PlaceholderSource {
    pub fn new(skills: Vec<String>) -> Self {
        Self { skills }
    }
}

impl MatchSource for PlaceholderSource {
    fn fetch(&self, _resume_ref: &str) -> Result<Vec<Candidate>, FetchError> {
        let mut rng = rand::thread_rng();
        let mut candidates: Vec<Candidate> = DEMO_JOBS
            .iter()
            .map(|(title, company, location)| {
                let mut required: Vec<String> = DEMO_SKILLS
                    .choose_multiple(&mut rng, 4)
                    .map(|s| s.to_string())
                    .collect();
                required.sort();
                let (strengths, missing_skills): (Vec<String>, Vec<String>) = required
                    .into_iter()
                    .partition(|s| self.skills.iter().any(|have| have.eq_ignore_ascii_case(s)));

                let mut breakdown = BTreeMap::new();
                for category in ["skills", "experience", "education", "semantic"] {
                    breakdown.insert(category.to_string(), rng.gen_range(40..=100));
                }

                let suggestions = if missing_skills.is_empty() {
                    vec!["Your profile is a strong match. Keep bullet points outcome-oriented.".to_string()]
                } else {
                    vec![format!("Consider learning or highlighting: {}.", missing_skills.join(", "))]
                };

                Candidate {
                    id: CandidateId(0),
                    job_ref: None,
                    title: title.to_string(),
                    company: company.to_string(),
                    location: location.to_string(),
                    score: rng.gen_range(55..=99),
                    breakdown,
                    strengths,
                    missing_skills,
                    suggestions,
                }
            })
            .collect();

        candidates.sort_by(|a, b| b.score.cmp(&a.score));
        for (rank, c) in candidates.iter_mut().enumerate() {
            c.id = CandidateId(rank);
        }
        Ok(candidates)
    }

    fn name(&self) -> &str {
        "placeholder"
    }
}

// --- Supersession ---

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoadTicket(u64);

/// Hands out tickets for loads; only a result carrying the newest ticket is
/// allowed into the deck.
#[derive(Debug, Default)]
pub struct Loader {
    latest: u64,
}

impl Loader {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn begin(&mut self) -> LoadTicket {
        self.latest += 1;
        LoadTicket(self.latest)
    }

    pub fn is_current(&self, ticket: LoadTicket) -> bool {
        ticket.0 == self.latest
    }

    /// Apply a finished load. Returns `None` if the ticket was superseded
    /// (deck untouched). A failure empties the deck rather than leaving the
    /// previous contents in place.
    pub fn finish(
        &self,
        ticket: LoadTicket,
        result: Result<Vec<Candidate>, FetchError>,
        deck: &mut Deck,
    ) -> Option<Result<usize, FetchError>> {
        if !self.is_current(ticket) {
            debug!("Discarding superseded load {:?}", ticket);
            return None;
        }
        match result {
            Ok(candidates) => {
                let count = candidates.len();
                deck.populate(candidates);
                Some(Ok(count))
            }
            Err(e) => {
                warn!("Match load failed: {e}");
                deck.clear();
                Some(Err(e))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::deck::tests::candidate;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct FakeSource {
        calls: AtomicUsize,
        result: fn() -> Result<Vec<Candidate>, FetchError>,
    }

    impl FakeSource {
        fn new(result: fn() -> Result<Vec<Candidate>, FetchError>) -> Self {
            Self { calls: AtomicUsize::new(0), result }
        }
    }

    impl MatchSource for FakeSource {
        fn fetch(&self, _resume_ref: &str) -> Result<Vec<Candidate>, FetchError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            (self.result)()
        }

        fn name(&self) -> &str {
            "fake"
        }
    }

    fn two_ranked() -> Result<Vec<Candidate>, FetchError> {
        Ok(vec![candidate(0, 92), candidate(1, 60)])
    }

    fn server_down() -> Result<Vec<Candidate>, FetchError> {
        Err(FetchError::Rejected { status: 500, body: "boom".to_string() })
    }

    #[test]
    fn test_load_without_resume_makes_no_call() {
        let source = FakeSource::new(two_ranked);
        let result = load(&Session::default(), &source).unwrap();
        assert!(result.is_empty());
        assert_eq!(source.calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_load_puts_best_match_on_top() {
        let source = FakeSource::new(two_ranked);
        let ranked = load(&Session::with_resume("abc"), &source).unwrap();
        let mut deck = Deck::new();
        deck.populate(ranked);
        assert_eq!(deck.top().unwrap().score, 92);
        assert_eq!(source.calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_parse_ranked_service_shape() {
        let body = r#"{"matches": [
            {"job_id": "64f0", "job_title": "Data Engineer", "company": "Tech Corp",
             "match_score": 87.6, "semantic_score": 91.2, "skill_match": 78.4,
             "missing_skills": ["spark", "airflow"], "location": "Remote"}
        ]}"#;
        let candidates = parse_matches(body).unwrap();
        assert_eq!(candidates.len(), 1);
        let c = &candidates[0];
        assert_eq!(c.id, CandidateId(0));
        assert_eq!(c.job_ref.as_deref(), Some("64f0"));
        assert_eq!(c.title, "Data Engineer");
        assert_eq!(c.score, 88);
        assert_eq!(c.breakdown.get("semantic"), Some(&91));
        assert_eq!(c.breakdown.get("skills"), Some(&78));
        assert_eq!(c.missing_skills, vec!["spark", "airflow"]);
        assert!(c.strengths.is_empty());
        assert!(c.suggestions.is_empty());
    }

    #[test]
    fn test_parse_full_shape_and_bare_array() {
        let body = r#"[{"id": 7, "title": "SRE", "company": "Cloudline", "location": "Toronto",
            "score": 91, "breakdown": {"skills": 80, "experience": 100},
            "strengths": ["linux"], "missingSkills": [], "suggestions": ["Add metrics"]}]"#;
        let c = &parse_matches(body).unwrap()[0];
        assert_eq!(c.job_ref.as_deref(), Some("7"));
        assert_eq!(c.breakdown.len(), 2);
        assert_eq!(c.strengths, vec!["linux"]);
        assert_eq!(c.suggestions, vec!["Add metrics"]);
    }

    #[test]
    fn test_parse_record_with_both_spellings() {
        let body = r#"[{"id": "a1", "job_id": "b2", "title": "Analyst", "job_title": "Data Analyst",
            "score": 81, "match_score": 79.5, "missing_skills": ["sql"], "missingSkills": ["r"],
            "extra": {"ignored": true}}]"#;
        let candidates = parse_matches(body).unwrap();
        assert_eq!(candidates.len(), 1);
        let c = &candidates[0];
        assert_eq!(c.job_ref.as_deref(), Some("a1"));
        assert_eq!(c.title, "Analyst");
        assert_eq!(c.score, 81);
        assert_eq!(c.missing_skills, vec!["sql"]);
    }

    #[test]
    fn test_parse_nested_details() {
        let body = r#"{"matches": [{"title": "X", "score": 50,
            "details": {"strengths": ["sql"], "missing_skills": ["go"]}}]}"#;
        let c = &parse_matches(body).unwrap()[0];
        assert_eq!(c.strengths, vec!["sql"]);
        assert_eq!(c.missing_skills, vec!["go"]);
    }

    #[test]
    fn test_parse_defaults_missing_fields() {
        let body = r#"{"matches": [{"title": "Sparse", "strengths": null}]}"#;
        let c = &parse_matches(body).unwrap()[0];
        assert_eq!(c.score, 0);
        assert!(c.breakdown.is_empty());
        assert!(c.strengths.is_empty());
        assert!(c.company.is_empty());
    }

    #[test]
    fn test_parse_clamps_scores() {
        let body = r#"[{"score": 140.2, "breakdown": {"a": -3, "b": 100.4}}]"#;
        let c = &parse_matches(body).unwrap()[0];
        assert_eq!(c.score, 100);
        assert_eq!(c.breakdown.get("a"), Some(&0));
        assert_eq!(c.breakdown.get("b"), Some(&100));
    }

    #[test]
    fn test_parse_drops_only_bad_records() {
        let body = r#"{"matches": [
            {"title": "Good", "score": 70},
            {"title": "Bad", "score": "very high"},
            42,
            {"title": "Also good", "score": 65}
        ]}"#;
        let candidates = parse_matches(body).unwrap();
        let titles: Vec<&str> = candidates.iter().map(|c| c.title.as_str()).collect();
        assert_eq!(titles, vec!["Good", "Also good"]);
        assert_ne!(candidates[0].id, candidates[1].id);
    }

    #[test]
    fn test_parse_rejects_garbage_body() {
        assert!(matches!(parse_matches("<html>"), Err(FetchError::Malformed(_))));
        assert!(matches!(parse_matches("\"text\""), Err(FetchError::Malformed(_))));
        assert!(matches!(parse_matches(r#"{"matches": 3}"#), Err(FetchError::Malformed(_))));
    }

    #[test]
    fn test_parse_missing_matches_key_is_empty() {
        assert!(parse_matches(r#"{"detail": "nothing"}"#).unwrap().is_empty());
    }

    #[test]
    fn test_failed_load_empties_deck() {
        let mut loader = Loader::new();
        let mut deck = Deck::new();

        let ticket = loader.begin();
        let source = FakeSource::new(two_ranked);
        let first = load(&Session::with_resume("abc"), &source);
        assert!(matches!(loader.finish(ticket, first, &mut deck), Some(Ok(2))));
        assert_eq!(deck.len(), 2);

        let ticket = loader.begin();
        let failing = FakeSource::new(server_down);
        let second = load(&Session::with_resume("abc"), &failing);
        assert!(matches!(loader.finish(ticket, second, &mut deck), Some(Err(_))));
        assert!(deck.is_empty());
    }

    #[test]
    fn test_stale_load_is_discarded() {
        let mut loader = Loader::new();
        let mut deck = Deck::new();

        let old = loader.begin();
        let new = loader.begin();

        assert!(matches!(
            loader.finish(new, Ok(vec![candidate(0, 90)]), &mut deck),
            Some(Ok(1))
        ));
        assert!(loader.finish(old, Ok(vec![candidate(0, 10), candidate(1, 20)]), &mut deck).is_none());
        assert_eq!(deck.len(), 1);
        assert_eq!(deck.top().unwrap().score, 90);

        // a stale failure must not blank the newer deck either
        assert!(loader.finish(old, server_down(), &mut deck).is_none());
        assert_eq!(deck.len(), 1);
    }

    #[test]
    fn test_placeholder_source_shape() {
        let source = PlaceholderSource::new(vec!["rust".to_string(), "SQL".to_string()]);
        let candidates = source.fetch("ignored").unwrap();
        assert_eq!(candidates.len(), DEMO_JOBS.len());
        for (rank, c) in candidates.iter().enumerate() {
            assert_eq!(c.id, CandidateId(rank));
            assert!(c.score <= 100);
            assert!(c.breakdown.values().all(|v| *v <= 100));
            assert_eq!(c.strengths.len() + c.missing_skills.len(), 4);
        }
        assert!(candidates.windows(2).all(|w| w[0].score >= w[1].score));
    }
}
