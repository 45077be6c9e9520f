use crate::deck::Deck;
use crate::models::{Candidate, CandidateId};

/// A capped list of skills, or an explicit marker that there are none.
#[derive(Debug, Clone, PartialEq)]
pub enum SkillList {
    Items { shown: Vec<String>, hidden: usize },
    NoMatches,
}

impl SkillList {
    fn from_slice(skills: &[String], limit: usize) -> Self {
        if skills.is_empty() {
            return SkillList::NoMatches;
        }
        let shown: Vec<String> = skills.iter().take(limit).cloned().collect();
        SkillList::Items {
            hidden: skills.len() - shown.len(),
            shown,
        }
    }
}

/// Read-only projection of a candidate for the detail panel.
#[derive(Debug, Clone, PartialEq)]
pub struct DetailView {
    pub id: CandidateId,
    pub title: String,
    pub company: String,
    pub location: String,
    pub score: u8,
    pub breakdown: Vec<(String, u8)>,
    pub strengths: SkillList,
    pub missing_skills: SkillList,
    pub suggestions: Vec<String>,
}

impl DetailView {
    pub fn project(candidate: &Candidate, limit: usize) -> Self {
        Self {
            id: candidate.id,
            title: candidate.title.clone(),
            company: candidate.company.clone(),
            location: candidate.location.clone(),
            score: candidate.score,
            breakdown: candidate.breakdown.iter().map(|(k, v)| (k.clone(), *v)).collect(),
            strengths: SkillList::from_slice(&candidate.strengths, limit),
            missing_skills: SkillList::from_slice(&candidate.missing_skills, limit),
            suggestions: candidate.suggestions.clone(),
        }
    }
}

/// Tracks which candidate, if any, is being inspected. Holds only the id so
/// it can never keep a removed card alive; the deck stays the sole owner.
#[derive(Debug)]
pub struct Inspector {
    open: Option<CandidateId>,
    limit: usize,
}

impl Inspector {
    pub fn new(limit: usize) -> Self {
        Self { open: None, limit }
    }

    /// Open the panel for `id`. Returns false, staying closed, if the
    /// candidate has already left the deck.
    pub fn open(&mut self, deck: &Deck, id: CandidateId) -> bool {
        if deck.get(id).is_some() {
            self.open = Some(id);
            true
        } else {
            self.open = None;
            false
        }
    }

    pub fn close(&mut self) {
        self.open = None;
    }

    pub fn is_open(&self) -> bool {
        self.open.is_some()
    }

    /// The current projection, or `None` when closed or when the inspected
    /// candidate is gone.
    pub fn view(&self, deck: &Deck) -> Option<DetailView> {
        let id = self.open?;
        deck.get(id).map(|c| DetailView::project(c, self.limit))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::deck::tests::candidate;

    fn skills(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    fn rich_candidate() -> Candidate {
        let mut c = candidate(0, 88);
        c.breakdown.insert("skills".to_string(), 75);
        c.breakdown.insert("experience".to_string(), 100);
        c.strengths = skills(&["rust", "sql", "docker", "aws", "git", "linux", "kafka", "go"]);
        c.missing_skills = Vec::new();
        c.suggestions = skills(&["Quantify impact", "Mention on-call"]);
        c
    }

    #[test]
    fn test_strengths_capped_at_limit() {
        let c = rich_candidate();
        let view = DetailView::project(&c, 6);
        match view.strengths {
            SkillList::Items { shown, hidden } => {
                assert_eq!(shown, skills(&["rust", "sql", "docker", "aws", "git", "linux"]));
                assert_eq!(hidden, 2);
            }
            SkillList::NoMatches => panic!("expected items"),
        }
        assert_eq!(c.strengths.len(), 8);
    }

    #[test]
    fn test_empty_missing_skills_shows_indicator() {
        let view = DetailView::project(&rich_candidate(), 6);
        assert_eq!(view.missing_skills, SkillList::NoMatches);
    }

    #[test]
    fn test_empty_strengths_shows_indicator() {
        let view = DetailView::project(&candidate(1, 40), 6);
        assert_eq!(view.strengths, SkillList::NoMatches);
    }

    #[test]
    fn test_suggestions_all_in_order_and_breakdown_sorted() {
        let view = DetailView::project(&rich_candidate(), 6);
        assert_eq!(view.suggestions, skills(&["Quantify impact", "Mention on-call"]));
        assert_eq!(
            view.breakdown,
            vec![("experience".to_string(), 100), ("skills".to_string(), 75)]
        );
    }

    #[test]
    fn test_open_close() {
        let mut deck = Deck::new();
        deck.populate(vec![rich_candidate()]);
        let mut inspector = Inspector::new(6);

        assert!(inspector.open(&deck, CandidateId(0)));
        assert!(inspector.is_open());
        assert_eq!(inspector.view(&deck).unwrap().score, 88);

        inspector.close();
        assert!(!inspector.is_open());
        assert!(inspector.view(&deck).is_none());
    }

    #[test]
    fn test_inspecting_does_not_touch_deck() {
        let mut deck = Deck::new();
        deck.populate(vec![candidate(0, 10), rich_candidate_with_id(1)]);
        let mut inspector = Inspector::new(6);
        inspector.open(&deck, CandidateId(1));
        let _ = inspector.view(&deck);
        inspector.close();
        assert_eq!(deck.len(), 2);
        assert_eq!(deck.top_id(), Some(CandidateId(1)));
    }

    #[test]
    fn test_open_removed_candidate_stays_closed() {
        let mut deck = Deck::new();
        deck.populate(vec![candidate(0, 10)]);
        let mut inspector = Inspector::new(6);
        assert!(!inspector.open(&deck, CandidateId(5)));
        assert!(!inspector.is_open());
    }

    #[test]
    fn test_view_after_removal_is_none() {
        let mut deck = Deck::new();
        deck.populate(vec![candidate(0, 10)]);
        let mut inspector = Inspector::new(6);
        inspector.open(&deck, CandidateId(0));
        deck.remove(CandidateId(0));
        assert!(inspector.view(&deck).is_none());
    }

    fn rich_candidate_with_id(id: usize) -> Candidate {
        let mut c = rich_candidate();
        c.id = CandidateId(id);
        c
    }
}
