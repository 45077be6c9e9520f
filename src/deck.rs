use crate::models::{Candidate, CandidateId};

/// The undecided matches. The last element is the top card and the only one
/// that accepts input; everything beneath it is inert until it surfaces.
#[derive(Debug, Default)]
pub struct Deck {
    candidates: Vec<Candidate>,
    // horizontal offset of the in-progress drag on the top card
    offset: f64,
}

impl Deck {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the whole deck. Nothing from a previous load survives.
    pub fn populate(&mut self, candidates: Vec<Candidate>) {
        self.candidates = candidates;
        self.offset = 0.0;
    }

    pub fn clear(&mut self) {
        self.populate(Vec::new());
    }

    pub fn top(&self) -> Option<&Candidate> {
        self.candidates.last()
    }

    pub fn top_id(&self) -> Option<CandidateId> {
        self.top().map(|c| c.id)
    }

    pub fn is_top(&self, id: CandidateId) -> bool {
        self.top_id() == Some(id)
    }

    /// Remove `id` only if it is the top card. Returns the removed candidate;
    /// anything else (stale or repeated events) leaves the deck untouched.
    pub fn remove(&mut self, id: CandidateId) -> Option<Candidate> {
        if !self.is_top(id) {
            return None;
        }
        self.offset = 0.0;
        self.candidates.pop()
    }

    pub fn get(&self, id: CandidateId) -> Option<&Candidate> {
        self.candidates.iter().find(|c| c.id == id)
    }

    pub fn is_empty(&self) -> bool {
        self.candidates.is_empty()
    }

    pub fn len(&self) -> usize {
        self.candidates.len()
    }

    /// Bottom to top, i.e. render order.
    #[cfg(test)]
    pub fn iter(&self) -> impl DoubleEndedIterator<Item = &Candidate> {
        self.candidates.iter()
    }

    // --- Drag on the top card ---

    pub fn offset(&self) -> f64 {
        self.offset
    }

    pub fn drag_to(&mut self, offset: f64) {
        if !self.is_empty() && offset.is_finite() {
            self.offset = offset;
        }
    }

    pub fn drag_by(&mut self, delta: f64) {
        let next = self.offset + delta;
        self.drag_to(next);
    }

    /// End the drag, handing back where it was released. The card is back at
    /// centre afterwards whether or not the release decided anything.
    pub fn release(&mut self) -> f64 {
        std::mem::take(&mut self.offset)
    }
}
