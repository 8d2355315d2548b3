
use crate::config::PredictorConfig;
use crate::feature::*;
use crate::predictor::*;

/// A single entry in a weight snapshot.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct WeightSnapshot {
    pub projection: Projection,
    pub index: usize,
    pub weight: i8,
}

/// Hashed perceptron reuse predictor.
///
/// Each table is indexed by a different projection of the same
/// [FeatureTuple], and the selected weights are summed into a vote. A high
/// vote means lines inserted with these features tend to be reused.
/// Training moves every selected weight by one step.
///
/// See the following papers:
///
/// - "Perceptron Learning for Reuse Prediction" (Teran, Wang and Jiménez, 2016)
/// - "Multiperspective Reuse Prediction" (Jiménez and Teran, 2017)
///
#[derive(Clone, Debug)]
pub struct HashedPerceptron {
    tables: Vec<WeightTable>,
}
impl HashedPerceptron {
    /// Return the vote for some features.
    pub fn predict(&self, f: &FeatureTuple) -> i32 {
        self.tables.iter()
            .map(|t| t.lookup(f) as i32)
            .sum()
    }

    /// Reward (`positive`) or punish the weights selected by some features.
    pub fn train(&mut self, f: &FeatureTuple, positive: bool) {
        for t in self.tables.iter_mut() {
            t.train(f, positive);
        }
    }

    /// Return the number of weight tables.
    pub fn num_tables(&self) -> usize { self.tables.len() }

    /// Return a reference to one of the weight tables.
    pub fn table(&self, idx: usize) -> &WeightTable { &self.tables[idx] }

    /// The largest and smallest possible votes.
    pub fn vote_range(&self) -> (i32, i32) {
        let n = self.tables.len() as i32;
        (n * SaturatingWeight::MIN as i32, n * SaturatingWeight::MAX as i32)
    }

    /// Get the [approximate] number of storage bits.
    pub fn storage_bits(&self) -> usize {
        self.tables.iter().map(|t| t.size() * 8).sum()
    }

    /// Read the weights selected by each of the given features.
    pub fn snapshot(&self, features: &[FeatureTuple]) -> Vec<WeightSnapshot> {
        let mut res = Vec::new();
        for f in features {
            for t in self.tables.iter() {
                let index = t.get_index(f);
                res.push(WeightSnapshot {
                    projection: t.projection(),
                    index,
                    weight: t.get_entry(index).value(),
                });
            }
        }
        res
    }

    /// Reset all weights to zero.
    pub fn reset(&mut self) {
        self.tables.iter_mut().for_each(|t| t.reset());
    }
}

impl PredictorConfig {
    /// Use this configuration to create a new [`HashedPerceptron`].
    pub fn build(&self) -> HashedPerceptron {
        assert!(!self.projections.is_empty());
        let tables = self.projections.iter()
            .map(|p| WeightTable::new(self.table_size, *p))
            .collect();
        HashedPerceptron { tables }
    }
}
impl Default for HashedPerceptron {
    fn default() -> Self { PredictorConfig::default().build() }
}


#[cfg(test)]
mod test {
    use super::*;
    use crate::CoherenceState;

    fn hot() -> FeatureTuple {
        FeatureTuple::new(0xF00D, 4, CoherenceState::Modified)
    }

    #[test]
    fn votes_sum_across_tables() {
        let mut p = HashedPerceptron::default();
        assert_eq!(p.num_tables(), 2);
        assert_eq!(p.predict(&hot()), 0);
        p.train(&hot(), true);
        assert_eq!(p.predict(&hot()), 2);
        p.train(&hot(), false);
        p.train(&hot(), false);
        assert_eq!(p.predict(&hot()), -2);
    }

    #[test]
    fn votes_saturate() {
        let mut p = HashedPerceptron::default();
        let (lo, hi) = p.vote_range();
        for _ in 0..300 { p.train(&hot(), true); }
        assert_eq!(p.predict(&hot()), hi);
        for _ in 0..600 { p.train(&hot(), false); }
        assert_eq!(p.predict(&hot()), lo);
    }

    #[test]
    fn coarse_table_is_shared_between_contexts() {
        let mut p = HashedPerceptron::default();
        let other = FeatureTuple::new(0xF00D, 0, CoherenceState::Exclusive);
        for _ in 0..10 { p.train(&hot(), true); }
        // Only the PC-indexed table carries over to the new context
        assert_eq!(p.predict(&other), 10);
    }

    #[test]
    fn tables_report_utilization() {
        let mut p = HashedPerceptron::default();
        assert_eq!(p.table(0).utilization(), 0);
        p.train(&hot(), true);
        p.train(&FeatureTuple::new(0xF00D, 0, CoherenceState::Exclusive), true);
        // The coarse table merges both contexts into one weight
        assert_eq!(p.table(0).projection(), Projection::Pc);
        assert_eq!(p.table(0).utilization(), 1);
        assert_eq!(p.table(1).utilization(), 2);
        p.reset();
        assert_eq!(p.table(1).utilization(), 0);
    }

    #[test]
    fn snapshot_reports_every_table() {
        let mut p = HashedPerceptron::default();
        p.train(&hot(), false);
        let snap = p.snapshot(&[hot()]);
        assert_eq!(snap.len(), 2);
        assert_eq!(snap[0].projection, Projection::Pc);
        assert_eq!(snap[1].projection, Projection::Full);
        assert!(snap.iter().all(|s| s.weight == -1));
        assert_eq!(p.storage_bits(), 2 * 4096 * 8);
    }
}
