
use coalesce::*;
use coalesce::experiment::*;

fn hot_rate(r: &PolicyReport) -> f64 {
    r.stats.get(HOT_PC).map_or(0.0, |s| s.hit_rate())
}

#[test]
fn hot_set_survives_scanner() {
    let trace = scanner_vs_hotset(10);
    let mut exp = Experiment::new(ExperimentConfig::default()).unwrap();
    let res = exp.run(&trace);
    let (lru, srrip, co) = (&res[0], &res[1], &res[2]);

    // The scan flushes the hot set out of both baselines
    assert!(hot_rate(lru) < 0.05);
    assert!(hot_rate(srrip) < 0.05);
    assert_eq!(lru.stats.coherence_wins, 0);

    assert!(hot_rate(co) > 0.3);
    assert!(co.stats.hit_rate() > lru.stats.hit_rate());
    assert!(co.stats.hit_rate() > srrip.stats.hit_rate());
    assert!(co.stats.coherence_wins > 0);

    let p = exp.predictor();
    let hot = FeatureTuple::new(HOT_PC, 4, CoherenceState::Modified);
    let scan = FeatureTuple::new(SCAN_PC, 0, CoherenceState::Exclusive);
    assert!(p.predict(&hot) > 0);
    assert!(p.predict(&scan) < 0);
}

#[test]
fn hot_set_survives_scanner_with_bypass() {
    let trace = scanner_vs_hotset(10);
    let mut cfg = ExperimentConfig::default();
    cfg.coalesce.bypass_enabled = true;
    let mut exp = Experiment::new(cfg).unwrap();
    let r = exp.run_coalesce(&trace);
    assert!(r.stats.bypasses > 0);
    assert_eq!(r.stats.get(HOT_PC).map_or(0, |s| s.bypasses), 0);
    assert!(hot_rate(&r) > 0.3);
    assert_eq!(r.stats.accesses(), trace.len() as u64);
}

#[test]
fn worker_line_survives_the_stream() {
    let trace = scanner_vs_worker(10, 200);
    let mut exp = Experiment::new(ExperimentConfig::default()).unwrap();
    for r in exp.run(&trace) {
        assert!(hot_rate(&r) > 0.99, "{} lost the worker line", r.name);
    }
}

#[test]
fn ghost_hit_corrects_a_premature_eviction() {
    let cfg = ExperimentConfig {
        cache: CacheConfig { sets: 64, ways: 2, line_bytes: 64 },
        ..ExperimentConfig::default()
    };
    // Every address below maps to set 0, which is sampled
    let stride = 64 * 64;
    let (a, b, c) = (0, stride, 2 * stride);
    let fa = FeatureTuple::new(0x77, 0, CoherenceState::Exclusive);

    let mut brain = HashedPerceptron::default();
    let mut sim = Simulator::new(cfg.cache, CoalescePolicy::new(&mut brain, &cfg));
    sim.access(a, fa.pc, fa.sharers, fa.state);
    sim.access(a, fa.pc, fa.sharers, fa.state);
    let before = sim.policy().predictor().predict(&fa);
    assert_eq!(before, 2);

    // Two expensive lines push the cheap one out
    sim.access(b, 0x88, 4, CoherenceState::Modified);
    assert_eq!(sim.access(c, 0x88, 4, CoherenceState::Modified), AccessOutcome::Miss);
    assert_eq!(sim.cache().lookup(0, a), None);
    let punished = sim.policy().predictor().predict(&fa);
    // One step down in each of the two tables
    assert_eq!(punished, before - 2);

    assert_eq!(sim.access(a, fa.pc, fa.sharers, fa.state), AccessOutcome::Miss);
    let corrected = sim.policy().predictor().predict(&fa);
    assert_eq!(corrected, before);
    assert_eq!(sim.policy().stat.ghost_hits, 1);
}

#[test]
fn bypass_threshold_boundary() {
    let mut cfg = ExperimentConfig::default();
    cfg.coalesce.bypass_enabled = true;
    let cold = FeatureTuple::new(0xBAD, 0, CoherenceState::Exclusive);

    // Two tables at -45 each: exactly on the threshold, still inserted
    let mut brain = HashedPerceptron::default();
    for _ in 0..45 { brain.train(&cold, false); }
    assert_eq!(brain.predict(&cold), cfg.coalesce.bypass_threshold);
    let mut sim = Simulator::new(cfg.cache, CoalescePolicy::new(&mut brain, &cfg));
    assert_eq!(sim.access(0x40, cold.pc, 0, cold.state), AccessOutcome::Miss);

    let mut brain = HashedPerceptron::default();
    for _ in 0..46 { brain.train(&cold, false); }
    let mut sim = Simulator::new(cfg.cache, CoalescePolicy::new(&mut brain, &cfg));
    let before = sim.cache().set(1).clone();
    assert_eq!(sim.access(0x40, cold.pc, 0, cold.state), AccessOutcome::Bypass);
    assert_eq!(sim.cache().set(1).lines(), before.lines());
    assert_eq!(sim.stats().bypasses, 1);
    assert_eq!(sim.stats().misses, 0);
}

#[test]
fn text_trace_matches_generated_trace() {
    let trace = coherent_mix(3, CoherentMixConfig { accesses: 3000, ..Default::default() });
    let mut buf = Vec::new();
    trace.write_to(&mut buf).unwrap();
    let parsed = Trace::from_reader(trace.name(), buf.as_slice()).unwrap();

    let mut exp = Experiment::new(ExperimentConfig::default()).unwrap();
    let a = exp.run_srrip(&trace);
    let b = exp.run_srrip(&parsed);
    assert_eq!(a.stats, b.stats);
}

#[test]
fn config_file_round_trip() {
    let text = r#"
        [cache]
        sets = 128
        ways = 4

        [predictor]
        projections = ["pc", "pc_sharers", "full"]

        [coalesce]
        bypass_enabled = true
    "#;
    let cfg = ExperimentConfig::from_toml(text).unwrap();
    assert_eq!(cfg.cache.sets, 128);
    assert_eq!(cfg.predictor.build().num_tables(), 3);
    let mut exp = Experiment::new(cfg).unwrap();
    let r = exp.run_coalesce(&scanner_vs_hotset(2));
    assert_eq!(r.stats.accesses(), 2000);
}
