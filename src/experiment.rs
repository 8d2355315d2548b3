//! Compare replacement policies on the same trace.

use log::info;

use crate::config::ExperimentConfig;
use crate::error::*;
use crate::policy::*;
use crate::predictor::HashedPerceptron;
use crate::sim::Simulator;
use crate::stats::SimStats;
use crate::trace::Trace;

/// Results for one policy.
#[derive(Clone, Debug)]
pub struct PolicyReport {
    pub name: &'static str,
    pub stats: SimStats,

    /// Training counters, only for COALESCE
    pub coalesce: Option<CoalesceStats>,
}

/// Owns the configuration and the COALESCE predictor for a set of runs.
///
/// The predictor persists across [Experiment::run_coalesce] calls, so
/// running several traces in a row keeps training the same weights.
pub struct Experiment {
    pub cfg: ExperimentConfig,
    brain: HashedPerceptron,
}
impl Experiment {
    pub fn new(cfg: ExperimentConfig) -> Result<Self> {
        cfg.validate()?;
        let brain = cfg.predictor.build();
        Ok(Self { cfg, brain })
    }

    pub fn predictor(&self) -> &HashedPerceptron { &self.brain }

    /// Discard everything the predictor has learned.
    pub fn reset_predictor(&mut self) { self.brain.reset(); }

    fn report<P: ReplacementPolicy>(sim: Simulator<P>, trace: &Trace)
        -> (P, PolicyReport)
    {
        let (policy, stats) = sim.into_parts();
        info!("{:<8} on {}: hit rate {:.2}%, {} coherence wins",
            policy.name(), trace.name(), stats.hit_rate() * 100.0,
            stats.coherence_wins,
        );
        let report = PolicyReport { name: policy.name(), stats, coalesce: None };
        (policy, report)
    }

    pub fn run_lru(&self, trace: &Trace) -> PolicyReport {
        let c = &self.cfg.cache;
        let mut sim = Simulator::new(*c, LruPolicy::new(c.sets, c.ways));
        sim.run(trace);
        Self::report(sim, trace).1
    }

    pub fn run_srrip(&self, trace: &Trace) -> PolicyReport {
        let c = &self.cfg.cache;
        let mut sim = Simulator::new(*c, SrripPolicy::new(c.sets, c.ways));
        sim.run(trace);
        Self::report(sim, trace).1
    }

    pub fn run_coalesce(&mut self, trace: &Trace) -> PolicyReport {
        let policy = CoalescePolicy::new(&mut self.brain, &self.cfg);
        let mut sim = Simulator::new(self.cfg.cache, policy);
        sim.run(trace);
        let (policy, mut report) = Self::report(sim, trace);
        info!("COALESCE training: {:?}", policy.stat);
        report.coalesce = Some(policy.stat);
        report
    }

    /// Run LRU, SRRIP and COALESCE (in that order) on the same trace.
    pub fn run(&mut self, trace: &Trace) -> Vec<PolicyReport> {
        info!("running {} accesses from {}", trace.len(), trace.name());
        vec![
            self.run_lru(trace),
            self.run_srrip(trace),
            self.run_coalesce(trace),
        ]
    }
}
