
use clap::{ Parser, ValueEnum };
use coalesce::*;
use coalesce::experiment::*;
use coalesce::predictor::PredictorTable;
use std::process;
use std::time::Instant;

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
enum Workload {
    /// Streaming scan followed by a small Modified hot set
    Scanner,
    /// One shared line interleaved with a stream
    Worker,
    /// Seeded multicore mix with MESI states from a directory
    Coherent,
}

#[derive(Parser, Debug)]
#[command(name = "evaluate_policies", version,
    about = "Compare LRU, SRRIP and COALESCE on the same access trace")]
struct Args {
    /// Built-in workload to generate
    #[arg(short, long, value_enum, default_value = "scanner")]
    workload: Workload,

    /// Read accesses from a text trace instead of a built-in workload
    #[arg(short, long)]
    trace: Option<String>,

    /// TOML experiment configuration
    #[arg(short, long)]
    config: Option<String>,

    /// Number of epochs for the scanner/worker workloads
    #[arg(short, long, default_value_t = 10)]
    epochs: usize,

    /// Seed for the coherent workload
    #[arg(short, long, default_value_t = 0)]
    seed: u64,

    /// Let COALESCE skip insertion of lines with a very negative vote
    #[arg(short, long)]
    bypass: bool,

    /// Number of program counters to show in the per-PC report
    #[arg(long, default_value_t = 4)]
    top: usize,
}

fn load(args: &Args) -> Result<(ExperimentConfig, Trace)> {
    let mut cfg = match &args.config {
        Some(path) => ExperimentConfig::from_file(path)?,
        None => ExperimentConfig::default(),
    };
    if args.bypass {
        cfg.coalesce.bypass_enabled = true;
    }
    let trace = match (&args.trace, args.workload) {
        (Some(path), _) => Trace::from_file(path)?,
        (None, Workload::Scanner) => scanner_vs_hotset(args.epochs),
        (None, Workload::Worker) => scanner_vs_worker(args.epochs, 200),
        (None, Workload::Coherent) => coherent_mix(args.seed, CoherentMixConfig {
            line_bytes: cfg.cache.line_bytes,
            ..CoherentMixConfig::default()
        }),
    };
    Ok((cfg, trace))
}

fn main() {
    env_logger::init();
    let args = Args::parse();

    let (cfg, trace) = match load(&args) {
        Ok(res) => res,
        Err(e) => {
            eprintln!("error: {}", e);
            process::exit(1);
        },
    };
    println!("[*] Loaded {} accesses from '{}'", trace.len(), trace.name());
    println!("[*] Cache: {} sets, {} ways, {}B lines",
        cfg.cache.sets, cfg.cache.ways, cfg.cache.line_bytes
    );

    let mut exp = match Experiment::new(cfg) {
        Ok(exp) => exp,
        Err(e) => {
            eprintln!("error: {}", e);
            process::exit(1);
        },
    };
    let p = exp.predictor();
    println!("[*] Predictor: {} tables, {:.2}KiB",
        p.num_tables(), p.storage_bits() as f64 / 1024.0 / 8.0
    );
    println!("[*] Bypass: {}", if exp.cfg.coalesce.bypass_enabled {
        format!("enabled (vote < {})", exp.cfg.coalesce.bypass_threshold)
    } else {
        "disabled".to_string()
    });

    let start = Instant::now();
    let reports = exp.run(&trace);
    println!("[*] ... simulated in {:.3?}", start.elapsed());
    println!();

    println!("[*] Global statistics:");
    for r in reports.iter() {
        let s = &r.stats;
        println!("      {:<8} | Hit Rate: {:6.2}% | Coherence Wins: {:6} \
            | {} hits, {} misses, {} bypasses",
            r.name, s.hit_rate() * 100.0, s.coherence_wins,
            s.hits, s.misses, s.bypasses,
        );
    }
    println!();

    println!("[*] Most frequent PCs:");
    for r in reports.iter() {
        println!("      {}:", r.name);
        for (pc, data) in r.stats.get_common_pcs(args.top) {
            println!("        {:016x} {:8}/{:8} {:.4}",
                pc, data.hits, data.occ, data.hit_rate()
            );
        }
    }
    println!();

    if let Some(stat) = reports.last().and_then(|r| r.coalesce) {
        println!("[*] COALESCE training:");
        println!("      {} rewards, {} punishments", stat.rewards, stat.punishments);
        println!("      {} ghost hits, {} filter hits, {} bypasses",
            stat.ghost_hits, stat.filter_hits, stat.bypasses
        );
        println!();
    }

    println!("[*] Per-table statistics:");
    let p = exp.predictor();
    for idx in 0..p.num_tables() {
        let t = p.table(idx);
        println!("      Table[{}] ({}): {}/{} weights in use ({:.2}% utilization)",
            idx, t.projection().name(), t.utilization(), t.size(),
            t.utilization() as f64 / t.size() as f64 * 100.0,
        );
    }
    println!();

    // Learned weights for the first few distinct access signatures
    let mut seen = Vec::new();
    for r in trace.iter() {
        let f = r.features();
        if !seen.contains(&f) {
            seen.push(f);
        }
        if seen.len() == args.top { break; }
    }
    println!("[*] Weight snapshot:");
    let p = exp.predictor();
    for f in seen.iter() {
        println!("      pc={:#06x} sharers={} state={} vote={}",
            f.pc, f.sharers, f.state, p.predict(f)
        );
        for s in p.snapshot(&[*f]) {
            println!("        {:<10} [{:4}] = {}", s.projection.name(), s.index, s.weight);
        }
    }
}
