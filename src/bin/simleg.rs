//! Command-line driver for the LEGv8 simulator.

use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;

use legv8_ensemble::ast::reg_consts::XZR;
use legv8_ensemble::ast::{Reg, RegBank};
use legv8_ensemble::err;
use legv8_ensemble::parse::parse_program;
use legv8_ensemble::sim::mem::FillStrategy;
use legv8_ensemble::sim::{SimFlags, Simulator};

#[derive(Parser, Debug)]
#[command(name = "simleg", version, about = "LEGv8 assembly simulator")]
struct Cli {
    /// Path to the LEGv8 source file to execute.
    path: PathBuf,

    /// Seed the register and memory fill RNG, making the run reproducible.
    #[arg(long)]
    seed: Option<u64>,

    /// Fill registers and memory with a known byte instead of random bits.
    #[arg(long, conflicts_with = "seed")]
    fill: Option<u8>,

    /// Stop after executing this many instructions.
    #[arg(long)]
    limit: Option<u64>,

    /// Print the parsed program listing before running.
    #[arg(long)]
    list: bool,

    /// Print the final register and flag state after the run.
    #[arg(long)]
    dump: bool,
}

fn main() -> ExitCode {
    // clap's default behavior exits with its own code 2 on usage errors;
    // this driver exits 1 on every failure
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) => {
            let _ = e.print();
            return match e.kind() {
                clap::error::ErrorKind::DisplayHelp | clap::error::ErrorKind::DisplayVersion => {
                    ExitCode::SUCCESS
                }
                _ => ExitCode::from(1),
            };
        }
    };

    let src = match std::fs::read_to_string(&cli.path) {
        Ok(src) => src,
        Err(e) => {
            eprintln!("simleg: {}: {e}", cli.path.display());
            return ExitCode::from(1);
        }
    };

    let program = match parse_program(&src) {
        Ok(program) => program,
        Err(e) => {
            eprintln!("{}", err::report(&e, &src));
            return ExitCode::from(1);
        }
    };
    if cli.list {
        print!("{program}");
    }

    let fill_strat = match (cli.seed, cli.fill) {
        (Some(seed), _) => FillStrategy::Seeded { seed },
        (_, Some(value)) => FillStrategy::Known { value },
        _ => FillStrategy::Unseeded,
    };

    let mut sim = Simulator::new(SimFlags { fill_strat });
    if let Err(e) = sim.load(program) {
        eprintln!("{}", err::report(&e, &src));
        return ExitCode::from(1);
    }

    let result = match cli.limit {
        Some(max_steps) => sim.run_with_limit(max_steps),
        None => sim.run(),
    };
    if let Err(e) = result {
        eprintln!("{}", err::report(&e, &src));
        return ExitCode::from(1);
    }

    if cli.dump {
        dump_state(&sim);
    }
    ExitCode::SUCCESS
}

fn dump_state(sim: &Simulator) {
    for no in 0..=30 {
        let reg = Reg::new(RegBank::X, no).expect("X0-X30 are valid registers");
        println!("{:>4} = {:#018x}", reg.to_string(), sim.reg_file.get(reg));
    }
    println!("{:>4} = {:#018x}", XZR.to_string(), sim.reg_file.get(XZR));
    println!("  pc = {}", sim.pc);
    println!("flags = {:?}", sim.pstate());
    println!("instructions run = {}", sim.instructions_run);
}
