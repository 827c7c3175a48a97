use std::collections::HashSet;

use tracing::debug;

use crate::error::{DeckError, Result};
use crate::model::Card;

/// Separates a card ID's namespace prefix from its number: `mi_007`.
pub const SEPARATOR: char = '_';

/// Minimum zero-padded width of the numeric part of a generated ID.
pub const MIN_WIDTH: usize = 3;

/// Number embedded in `card_id` under `prefix`, if any.
///
/// Only IDs of the form `{prefix}_...` belong to the namespace. The number is
/// the first run of ASCII digits after the separator, so `mi_0035` and
/// `mi_12b` yield 35 and 12. IDs with no digits, or with a digit run too
/// large for `u64`, yield `None`.
pub fn numeric_suffix(card_id: &str, prefix: &str) -> Option<u64> {
    let rest = card_id.strip_prefix(prefix)?.strip_prefix(SEPARATOR)?;
    let start = rest.find(|c: char| c.is_ascii_digit())?;
    let digits = &rest[start..];
    let end = digits
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(digits.len());
    digits[..end].parse().ok()
}

/// Highest number used under `prefix` across `cards`, or 0 when none match.
pub fn max_id(cards: &[Card], prefix: &str) -> u64 {
    let max = cards
        .iter()
        .filter_map(|card| card.id())
        .filter_map(|id| numeric_suffix(id, prefix))
        .max()
        .unwrap_or(0);
    debug!(prefix, max, "max id found");
    max
}

/// Format the ID for number `n` in namespace `prefix`: `mi_007`, `mi_1234`.
pub fn next_id(prefix: &str, n: u64) -> String {
    format!("{prefix}{SEPARATOR}{n:0MIN_WIDTH$}")
}

/// Issues sequential IDs after the highest one already in a deck.
#[derive(Debug)]
pub struct IdAllocator {
    prefix: String,
    /// `None` once the number space is used up.
    next: Option<u64>,
    taken: HashSet<String>,
    last: Option<String>,
}

impl IdAllocator {
    /// Seed from the cards already present in the target deck.
    pub fn seeded(prefix: &str, existing: &[Card]) -> Self {
        let next = max_id(existing, prefix).checked_add(1);
        let taken = existing
            .iter()
            .filter_map(|card| card.id())
            .map(str::to_string)
            .collect();
        Self {
            prefix: prefix.to_string(),
            next,
            taken,
            last: None,
        }
    }

    /// Hand out the next free ID. Candidates already present in the deck are
    /// skipped so the result never collides. Fails once the counter would
    /// pass `u64::MAX`.
    pub fn allocate(&mut self) -> Result<String> {
        loop {
            let Some(n) = self.next else {
                return Err(DeckError::IdsExhausted {
                    prefix: self.prefix.clone(),
                });
            };
            let candidate = next_id(&self.prefix, n);
            self.next = n.checked_add(1);
            if self.taken.insert(candidate.clone()) {
                self.last = Some(candidate.clone());
                return Ok(candidate);
            }
            debug!(%candidate, "skipping id already present in target deck");
        }
    }

    /// Allocate `count` IDs up front, failing before any is used.
    pub fn allocate_many(&mut self, count: usize) -> Result<Vec<String>> {
        (0..count).map(|_| self.allocate()).collect()
    }

    /// Most recently allocated ID.
    pub fn last(&self) -> Option<&str> {
        self.last.as_deref()
    }
}
