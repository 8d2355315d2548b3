
use clap::Parser;
use coalesce::*;
use rand::prelude::*;
use rand::rngs::StdRng;
use std::fs::File;
use std::io::BufWriter;
use std::process;

#[derive(Parser, Debug)]
#[command(name = "mesi_trace", version,
    about = "Drive a MESI directory with random reads and writes")]
struct Args {
    /// Number of requests to issue
    #[arg(short, long, default_value_t = 15)]
    requests: usize,

    #[arg(short, long, default_value_t = 4)]
    cores: usize,

    /// Number of lines tracked by the directory
    #[arg(short, long, default_value_t = 16)]
    lines: usize,

    #[arg(short, long, default_value_t = 0)]
    seed: u64,

    /// Write the accesses to a text trace
    #[arg(short, long)]
    output: Option<String>,
}

fn main() {
    env_logger::init();
    let args = Args::parse();
    if args.cores == 0 || args.lines == 0 {
        eprintln!("error: --cores and --lines must be non-zero");
        process::exit(1);
    }

    let mut rng = StdRng::seed_from_u64(args.seed);
    let mut dir = Directory::new(args.cores, args.lines);
    let mut trace = Trace::new(format!("mesi_{}", args.seed));

    println!("[*] {} cores, {} lines, seed {}", args.cores, args.lines, args.seed);
    for _ in 0..args.requests {
        let core = rng.gen_range(0..args.cores);
        let addr = rng.gen_range(0..args.lines);
        let write: bool = rng.gen();

        let old = dir.entry(addr).state;
        let (state, sharers) = if write {
            dir.handle_write(core, addr)
        } else {
            dir.handle_read(core, addr)
        };
        println!("[{}] core {} -> addr {:2} | {} -> {} | sharers {:?} ({})",
            if write { "WRITE" } else { "READ " },
            core, addr, old, state, dir.entry(addr).cores(), sharers
        );
        let pc = if write { 0xA100 } else { 0xA000 } + core as u64;
        trace.push(AccessRecord::new(addr as u64, pc, sharers, state));
    }

    let s = dir.stat;
    println!();
    println!("[*] {} reads, {} writes", s.reads, s.writes);
    println!("[*] {} downgrades, {} invalidations", s.downgrades, s.invalidations);

    if let Some(path) = args.output {
        let res = File::create(&path)
            .map_err(Error::from)
            .and_then(|f| trace.write_to(BufWriter::new(f)));
        match res {
            Ok(()) => println!("[*] Wrote {} accesses to {}", trace.len(), path),
            Err(e) => {
                eprintln!("error: {}", e);
                process::exit(1);
            },
        }
    }
}
