//! Trial sequencing
//!
//! This module randomizes trial order within a block and exposes a sequential
//! cursor over the shuffled trials. A fresh sequencer is built for every
//! block.

use crate::types::Trial;
use rand::Rng;

/// Unbiased Fisher-Yates shuffle. The RNG is a parameter so tests can drive
/// the permutation deterministically with a seeded generator.
pub fn shuffle<R: Rng>(trials: &mut [Trial], rng: &mut R) {
    for i in (1..trials.len()).rev() {
        let j = rng.gen_range(0..=i);
        trials.swap(i, j);
    }
}

/// Sequential cursor over one block's shuffled trials
#[derive(Debug, Clone)]
pub struct TrialSequencer {
    trials: Vec<Trial>,
    cursor: usize,
}

impl TrialSequencer {
    /// Build a sequencer over trials, shuffling them in place
    pub fn new<R: Rng>(mut trials: Vec<Trial>, rng: &mut R) -> Self {
        shuffle(&mut trials, rng);
        Self { trials, cursor: 0 }
    }

    /// The trial at the cursor, or None when the block is exhausted
    pub fn current(&self) -> Option<&Trial> {
        self.trials.get(self.cursor)
    }

    /// Move the cursor past the current trial
    pub fn advance(&mut self) {
        if self.cursor < self.trials.len() {
            self.cursor += 1;
        }
    }

    /// Whether any trials remain at or after the cursor
    pub fn has_more(&self) -> bool {
        self.cursor < self.trials.len()
    }

    /// Rewind the cursor to the first trial
    pub fn reset(&mut self) {
        self.cursor = 0;
    }

    /// Number of trials in the block
    pub fn len(&self) -> usize {
        self.trials.len()
    }

    /// Whether the block holds no trials
    pub fn is_empty(&self) -> bool {
        self.trials.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::StimulusCatalog;
    use crate::planner::plan_block;
    use crate::types::TestModel;
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use std::collections::HashMap;

    fn stimulus_counts(trials: &[Trial]) -> HashMap<String, usize> {
        let mut counts = HashMap::new();
        for trial in trials {
            *counts.entry(trial.stimulus.stimulus.clone()).or_insert(0) += 1;
        }
        counts
    }

    #[test]
    fn test_shuffle_is_a_permutation() {
        let catalog = StimulusCatalog::builtin();
        let original = plan_block(&catalog, 4, TestModel::A).unwrap();
        let before = stimulus_counts(&original);

        let mut shuffled = original.clone();
        let mut rng = StdRng::seed_from_u64(42);
        shuffle(&mut shuffled, &mut rng);

        assert_eq!(stimulus_counts(&shuffled), before);
        assert_eq!(shuffled.len(), original.len());
    }

    #[test]
    fn test_shuffle_moves_positions() {
        // With 40 trials the identity permutation is astronomically unlikely
        // for any reasonable seed.
        let catalog = StimulusCatalog::builtin();
        let original = plan_block(&catalog, 7, TestModel::A).unwrap();
        let mut shuffled = original.clone();
        let mut rng = StdRng::seed_from_u64(1);
        shuffle(&mut shuffled, &mut rng);

        let moved = original
            .iter()
            .zip(shuffled.iter())
            .filter(|(a, b)| a.stimulus != b.stimulus)
            .count();
        assert!(moved > 0);
    }

    #[test]
    fn test_first_position_distribution_is_roughly_uniform() {
        // Statistical property: over many shuffles of N trials, each stimulus
        // occupies position 0 about 1/N of the time.
        let catalog = StimulusCatalog::builtin();
        let trials = plan_block(&catalog, 3, TestModel::A).unwrap();
        let n = trials.len();
        let runs = 4000;

        let mut rng = StdRng::seed_from_u64(99);
        let mut first_counts: HashMap<String, usize> = HashMap::new();
        for _ in 0..runs {
            let mut shuffled = trials.clone();
            shuffle(&mut shuffled, &mut rng);
            *first_counts
                .entry(shuffled[0].stimulus.stimulus.clone())
                .or_insert(0) += 1;
        }

        let expected = runs as f64 / n as f64;
        for count in first_counts.values() {
            // Loose tolerance; this guards against gross bias, not noise.
            assert!((*count as f64) > expected * 0.5);
            assert!((*count as f64) < expected * 1.5);
        }
    }

    #[test]
    fn test_cursor_walks_every_trial_once() {
        let catalog = StimulusCatalog::builtin();
        let trials = plan_block(&catalog, 1, TestModel::A).unwrap();
        let expected_len = trials.len();

        let mut rng = StdRng::seed_from_u64(5);
        let mut sequencer = TrialSequencer::new(trials, &mut rng);

        let mut seen = 0;
        while sequencer.has_more() {
            assert!(sequencer.current().is_some());
            sequencer.advance();
            seen += 1;
        }
        assert_eq!(seen, expected_len);
        assert!(sequencer.current().is_none());
    }

    #[test]
    fn test_reset_rewinds_cursor() {
        let catalog = StimulusCatalog::builtin();
        let trials = plan_block(&catalog, 2, TestModel::A).unwrap();
        let mut rng = StdRng::seed_from_u64(5);
        let mut sequencer = TrialSequencer::new(trials, &mut rng);

        sequencer.advance();
        sequencer.advance();
        sequencer.reset();
        assert!(sequencer.has_more());
        assert_eq!(sequencer.len(), 20);
    }
}
