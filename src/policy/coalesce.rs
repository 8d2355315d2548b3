//! COALESCE: learned, coherence-aware replacement.
//!
//! Victims are chosen by asking a [HashedPerceptron] how likely each line is
//! to be reused, then biasing the vote by what evicting the line would cost
//! in coherence traffic: a Modified line needs a writeback, a widely shared
//! line needs invalidations.
//!
//! Training only happens in sampled sets:
//! - a hit rewards the features the line was inserted with;
//! - an eviction punishes the victim's features right away;
//! - a re-access of a recorded victim (a "ghost hit") rewards them again,
//!   undoing the punishment for a premature eviction.

use log::trace;

use crate::cache::*;
use crate::config::*;
use crate::feature::FeatureTuple;
use crate::policy::*;
use crate::predictor::HashedPerceptron;
use crate::sampler::*;
use crate::CoherenceState;

/// Counters describing how the policy trained its predictor.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct CoalesceStats {
    /// Positive training events caused by hits
    pub rewards: u64,

    /// Negative training events caused by evictions
    pub punishments: u64,

    /// Corrections caused by a recorded eviction being re-accessed
    pub ghost_hits: u64,

    /// Corrections caused by the ghost filter
    pub filter_hits: u64,

    /// Incoming lines that were not inserted
    pub bypasses: u64,
}

/// COALESCE policy state.
///
/// The predictor is borrowed so that the same weights can be inspected (or
/// reused) by whoever owns them once the run is over.
pub struct CoalescePolicy<'a> {
    cfg: CoalesceConfig,
    brain: &'a mut HashedPerceptron,
    sampler: Sampler,
    ghost: Option<GhostFilter>,
    pub stat: CoalesceStats,
}
impl<'a> CoalescePolicy<'a> {
    pub fn new(brain: &'a mut HashedPerceptron, cfg: &ExperimentConfig) -> Self {
        let ghost = if cfg.ghost.enabled {
            Some(GhostFilter::new(cfg.ghost))
        } else {
            None
        };
        Self {
            cfg: cfg.coalesce,
            brain,
            sampler: Sampler::new(cfg.sampler, cfg.cache.sets),
            ghost,
            stat: CoalesceStats::default(),
        }
    }

    pub fn predictor(&self) -> &HashedPerceptron { &*self.brain }

    pub fn sampler(&self) -> &Sampler { &self.sampler }

    /// Return the vote for a line including the coherence bonuses.
    pub fn adjusted_vote(&self, f: &FeatureTuple) -> i32 {
        self.brain.predict(f) + self.coherence_bonus(f)
    }

    /// Return the fixed bonus added to a line's vote for its coherence cost.
    pub fn coherence_bonus(&self, f: &FeatureTuple) -> i32 {
        let mut bonus = 0;
        if f.state == CoherenceState::Modified {
            bonus += self.cfg.modified_bonus;
        }
        if f.sharers > self.cfg.sharer_threshold {
            bonus += self.cfg.sharer_bonus;
        }
        bonus
    }

    fn punish(&mut self, line: &CacheLine) {
        if !self.cfg.eager_punishment {
            return;
        }
        if self.cfg.punish_only_unused && line.used {
            return;
        }
        self.brain.train(&line.features, false);
        self.stat.punishments = self.stat.punishments.saturating_add(1);
    }
}

impl ReplacementPolicy for CoalescePolicy<'_> {
    fn name(&self) -> &'static str { "COALESCE" }

    fn on_miss(&mut self, set_idx: usize, tag: u64, features: &FeatureTuple)
        -> Admission
    {
        if let Some(evicted) = self.sampler.on_reaccess(set_idx, tag) {
            self.brain.train(&evicted, true);
            self.stat.ghost_hits = self.stat.ghost_hits.saturating_add(1);
        } else if self.ghost.as_ref().is_some_and(|g| g.contains(tag)) {
            self.brain.train(features, true);
            self.stat.filter_hits = self.stat.filter_hits.saturating_add(1);
        }

        if self.cfg.bypass_enabled {
            let vote = self.brain.predict(features);
            if vote < self.cfg.bypass_threshold {
                trace!("bypass tag {:#x} (pc {:#x}, vote {})", tag, features.pc, vote);
                self.stat.bypasses = self.stat.bypasses.saturating_add(1);
                return Admission::Bypass;
            }
        }
        Admission::Insert
    }

    fn find_victim(&mut self, set_idx: usize, set: &CacheSet,
        _incoming: &FeatureTuple) -> usize
    {
        if let Some(way) = set.first_invalid() {
            return way;
        }

        // The first way with the lowest adjusted vote
        let mut victim: Option<(usize, i32, i32)> = None;
        for (way, line) in set.lines().iter().enumerate() {
            let vote = self.brain.predict(&line.features);
            let adjusted = vote + self.coherence_bonus(&line.features);
            match victim {
                Some((_, best, _)) if best <= adjusted => {},
                _ => victim = Some((way, adjusted, vote)),
            }
        }
        let Some((way, _, vote)) = victim else {
            unreachable!("no victim in full set {}", set_idx);
        };

        let line = *set.line(way);
        if self.sampler.is_sampled(set_idx) {
            self.sampler.record_eviction(set_idx, &line, vote);
            self.punish(&line);
        }
        if let Some(ghost) = self.ghost.as_mut() {
            ghost.insert(line.tag);
        }
        way
    }

    fn update_on_hit(&mut self, set_idx: usize, _way: usize, line: &CacheLine) {
        if self.sampler.is_sampled(set_idx) {
            self.brain.train(&line.features, true);
            self.stat.rewards = self.stat.rewards.saturating_add(1);
        }
    }

    fn update_on_miss(&mut self, _set_idx: usize, _way: usize) {}
}


#[cfg(test)]
mod test {
    use super::*;

    fn cfg() -> ExperimentConfig {
        ExperimentConfig {
            cache: CacheConfig { sets: 64, ways: 4, line_bytes: 64 },
            ..ExperimentConfig::default()
        }
    }

    fn fill(set: &mut CacheSet, lines: &[(u64, FeatureTuple)]) {
        for (way, (tag, f)) in lines.iter().enumerate() {
            set.install(way, *tag, *f);
        }
    }

    #[test]
    fn modified_bonus_dominates() {
        let mut brain = HashedPerceptron::default();
        let p = CoalescePolicy::new(&mut brain, &cfg());
        let m = FeatureTuple::new(0x40, 1, CoherenceState::Modified);
        let e = FeatureTuple::new(0x40, 1, CoherenceState::Exclusive);
        let i = FeatureTuple::new(0x40, 1, CoherenceState::Invalid);
        assert!(p.adjusted_vote(&m) - p.adjusted_vote(&e) >= 60);
        assert!(p.adjusted_vote(&m) - p.adjusted_vote(&i) >= 60);
        assert_eq!(p.coherence_bonus(&FeatureTuple::new(0, 3, CoherenceState::Shared)), 30);
        assert_eq!(p.coherence_bonus(&FeatureTuple::new(0, 2, CoherenceState::Shared)), 0);
    }

    #[test]
    fn prefers_cheap_victims_and_breaks_ties_by_way() {
        let mut brain = HashedPerceptron::default();
        let mut p = CoalescePolicy::new(&mut brain, &cfg());
        let mut set = CacheSet::new(4);
        fill(&mut set, &[
            (1, FeatureTuple::new(0x10, 4, CoherenceState::Modified)),
            (2, FeatureTuple::new(0x10, 0, CoherenceState::Exclusive)),
            (3, FeatureTuple::new(0x10, 0, CoherenceState::Exclusive)),
            (4, FeatureTuple::new(0x10, 3, CoherenceState::Shared)),
        ]);
        let incoming = FeatureTuple::new(0x20, 0, CoherenceState::Exclusive);
        // Set 1 is not sampled: nothing is trained
        assert_eq!(p.find_victim(1, &set, &incoming), 1);
        assert_eq!(p.stat.punishments, 0);
        assert_eq!(p.predictor().predict(&set.line(1).features), 0);
    }

    #[test]
    fn invalid_way_short_circuits() {
        let mut brain = HashedPerceptron::default();
        let mut p = CoalescePolicy::new(&mut brain, &cfg());
        let mut set = CacheSet::new(4);
        set.install(0, 1, FeatureTuple::new(0x10, 0, CoherenceState::Exclusive));
        let incoming = FeatureTuple::new(0x20, 0, CoherenceState::Exclusive);
        assert_eq!(p.find_victim(0, &set, &incoming), 1);
        assert_eq!(p.sampler().len(0), 0);
    }

    #[test]
    fn sampled_eviction_is_recorded_and_punished() {
        let mut brain = HashedPerceptron::default();
        let mut p = CoalescePolicy::new(&mut brain, &cfg());
        let dead = FeatureTuple::new(0xBAD, 0, CoherenceState::Exclusive);
        let hot = FeatureTuple::new(0xF00D, 4, CoherenceState::Modified);
        let mut set = CacheSet::new(4);
        fill(&mut set, &[(1, hot), (2, hot), (3, dead), (4, hot)]);

        assert_eq!(p.find_victim(0, &set, &hot), 2);
        assert_eq!(p.predictor().predict(&dead), -2);
        assert_eq!(p.stat.punishments, 1);
        let rec = p.sampler().entries(0);
        assert_eq!(rec.len(), 1);
        assert_eq!(rec[0].partial_tag, 3);
        assert_eq!(rec[0].vote, 0);
    }

    #[test]
    fn punish_only_unused_spares_reused_lines() {
        let mut c = cfg();
        c.coalesce.punish_only_unused = true;
        let mut brain = HashedPerceptron::default();
        let mut p = CoalescePolicy::new(&mut brain, &c);
        let f = FeatureTuple::new(0x77, 0, CoherenceState::Exclusive);
        let mut set = CacheSet::new(4);
        fill(&mut set, &[(1, f), (2, f), (3, f), (4, f)]);
        set.mark_used(0);
        assert_eq!(p.find_victim(0, &set, &f), 0);
        assert_eq!(p.stat.punishments, 0);
        assert_eq!(p.sampler().len(0), 1);
    }

    #[test]
    fn hits_reward_insertion_features_in_sampled_sets() {
        let mut brain = HashedPerceptron::default();
        let mut p = CoalescePolicy::new(&mut brain, &cfg());
        let mut set = CacheSet::new(4);
        let f = FeatureTuple::new(0xF00D, 4, CoherenceState::Modified);
        set.install(0, 9, f);
        p.update_on_hit(1, 0, set.line(0));
        assert_eq!(p.predictor().predict(&f), 0);
        p.update_on_hit(0, 0, set.line(0));
        assert_eq!(p.predictor().predict(&f), 2);
        assert_eq!(p.stat.rewards, 1);
    }

    #[test]
    fn ghost_filter_rewards_incoming_features() {
        let mut c = cfg();
        c.ghost.enabled = true;
        let mut brain = HashedPerceptron::default();
        let mut p = CoalescePolicy::new(&mut brain, &c);
        let f = FeatureTuple::new(0x55, 0, CoherenceState::Shared);
        let mut set = CacheSet::new(4);
        fill(&mut set, &[(100, f), (101, f), (102, f), (103, f)]);
        // Set 3 is not sampled, but the filter sees every eviction
        assert_eq!(p.find_victim(3, &set, &f), 0);
        assert_eq!(p.on_miss(3, 100, &f), Admission::Insert);
        assert_eq!(p.stat.filter_hits, 1);
        assert_eq!(p.predictor().predict(&f), 2);
    }
}
