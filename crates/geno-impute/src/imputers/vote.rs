use crate::config::TieBreak;
use crate::types::Genotype;
use std::collections::BTreeMap;

/// Outcome of a neighbor vote.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Vote {
    pub value: Genotype,
    /// Ballots cast for `value`.
    pub count: usize,
    /// Ballots cast in total.
    pub total: usize,
}

impl Vote {
    /// Share of ballots won, in (0, 1].
    pub fn confidence(&self) -> f64 {
        self.count as f64 / self.total as f64
    }
}

/// Pick the most frequent genotype among `ballots`.
///
/// `ballots` must be ordered nearest neighbor first; only
/// [`TieBreak::NearestNeighbor`] depends on that order. Returns `None` for an
/// empty ballot.
pub fn majority_vote(ballots: &[Genotype], tie_break: TieBreak) -> Option<Vote> {
    let mut counts: BTreeMap<Genotype, usize> = BTreeMap::new();
    for &ballot in ballots {
        *counts.entry(ballot).or_insert(0) += 1;
    }

    let top = counts.values().copied().max()?;
    let mut tied = counts
        .iter()
        .filter(|(_, count)| **count == top)
        .map(|(value, _)| *value);

    let value = match tie_break {
        TieBreak::LowestCode => tied.next(),
        TieBreak::HighestCode => tied.next_back(),
        TieBreak::NearestNeighbor => ballots.iter().copied().find(|b| counts[b] == top),
    }?;

    Some(Vote {
        value,
        count: top,
        total: ballots.len(),
    })
}
