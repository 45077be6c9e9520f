use tracing::{debug, info};

use crate::deck::Deck;
use crate::models::{Candidate, Decision, Direction};

/// Whatever makes a fuss over a strong accepted match.
pub trait Celebrate {
    fn celebrate(&mut self, candidate: &Candidate);
}

#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    Applied {
        candidate: Candidate,
        direction: Direction,
        celebrated: bool,
    },
    /// The decision named a card that is no longer on top.
    Stale,
}

pub struct DecisionEffects {
    celebration_threshold: u8,
}

impl DecisionEffects {
    pub fn new(celebration_threshold: u8) -> Self {
        Self { celebration_threshold }
    }

    pub fn should_celebrate(&self, direction: Direction, score: u8) -> bool {
        direction == Direction::Accept && score > self.celebration_threshold
    }

    /// Apply one decision to the deck. Only the current top card can be
    /// decided; a repeated or late event for any other id does nothing.
    pub fn apply(&self, decision: Decision, deck: &mut Deck, celebrate: &mut dyn Celebrate) -> Outcome {
        let Some(top) = deck.top() else {
            debug!("Ignoring decision for {} on an empty deck", decision.candidate_id);
            return Outcome::Stale;
        };
        if top.id != decision.candidate_id {
            debug!(
                "Ignoring stale decision for {} (top is {})",
                decision.candidate_id, top.id
            );
            return Outcome::Stale;
        }

        let celebrated = self.should_celebrate(decision.direction, top.score);
        if celebrated {
            celebrate.celebrate(top);
        }

        let Some(candidate) = deck.remove(decision.candidate_id) else {
            return Outcome::Stale;
        };
        info!(
            "Decided {}: {} '{}' at {} (score {}){}",
            candidate.id,
            decision.direction.label(),
            candidate.title,
            candidate.company,
            candidate.score,
            if celebrated { ", celebrated" } else { "" }
        );

        Outcome::Applied {
            candidate,
            direction: decision.direction,
            celebrated,
        }
    }
}

/// What the user did this session. Kept in memory only.
#[derive(Debug, Default)]
pub struct Tally {
    pub applied: Vec<Candidate>,
    pub passed: Vec<Candidate>,
}

impl Tally {
    pub fn record(&mut self, outcome: &Outcome) {
        if let Outcome::Applied { candidate, direction, .. } = outcome {
            match direction {
                Direction::Accept => self.applied.push(candidate.clone()),
                Direction::Reject => self.passed.push(candidate.clone()),
            }
        }
    }

    pub fn is_empty(&self) -> bool {
        self.applied.is_empty() && self.passed.is_empty()
    }
}
