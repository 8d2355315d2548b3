//! A table of saturating weights indexed by a hashed feature projection.

use crate::feature::*;
use crate::predictor::*;

/// One weight table of a [HashedPerceptron].
#[derive(Clone, Debug)]
pub struct WeightTable {
    /// Features used to index this table
    projection: Projection,

    /// Table of weights
    data: Vec<SaturatingWeight>,
}
impl WeightTable {
    pub fn new(size: usize, projection: Projection) -> Self {
        assert!(size.is_power_of_two());
        Self {
            projection,
            data: vec![SaturatingWeight::default(); size],
        }
    }

    pub fn projection(&self) -> Projection { self.projection }

    /// Return the weight selected by some features.
    pub fn lookup(&self, f: &FeatureTuple) -> i8 {
        self.get_entry(self.get_index(f)).value()
    }

    /// Move the weight selected by some features by one step.
    pub fn train(&mut self, f: &FeatureTuple, positive: bool) {
        let idx = self.get_index(f);
        self.get_entry_mut(idx).train(positive);
    }

    /// Return the number of entries with a non-zero weight.
    pub fn utilization(&self) -> usize {
        self.data.iter().filter(|w| w.value() != 0).count()
    }

    /// Reset all weights to zero.
    pub fn reset(&mut self) {
        self.data.iter_mut().for_each(|w| w.reset());
    }
}

impl PredictorTable for WeightTable {
    type Input<'a> = &'a FeatureTuple;
    type Entry = SaturatingWeight;

    fn size(&self) -> usize { self.data.len() }

    fn get_index(&self, f: &FeatureTuple) -> usize {
        (feature_hash(self.projection, f) as usize) & self.index_mask()
    }

    fn get_entry(&self, idx: usize) -> &SaturatingWeight {
        assert!(idx < self.data.len(), "weight index {} out of range", idx);
        &self.data[idx]
    }

    fn get_entry_mut(&mut self, idx: usize) -> &mut SaturatingWeight {
        assert!(idx < self.data.len(), "weight index {} out of range", idx);
        &mut self.data[idx]
    }
}
