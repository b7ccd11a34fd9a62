use std::fs;
use std::num::NonZeroU32;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use clap::{Parser, ValueEnum};
use log::info;
use serde_json::json;

use scheduler::{build_scheduler, Algorithm, GanttOwner, ProcessDescriptor, SimConfig, SimulationResult};

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
enum AlgorithmArg {
    /// Every policy, one after the other
    All,
    Fcfs,
    Srtf,
    Rr,
    Priority,
    Aging,
    Mlq,
    Rm,
    Edf,
    /// Producer-consumer demo
    Sync,
}

impl AlgorithmArg {
    fn algorithms(self) -> Vec<Algorithm> {
        match self {
            AlgorithmArg::All => Algorithm::POLICIES.to_vec(),
            AlgorithmArg::Fcfs => vec![Algorithm::Fcfs],
            AlgorithmArg::Srtf => vec![Algorithm::Srtf],
            AlgorithmArg::Rr => vec![Algorithm::RoundRobin],
            AlgorithmArg::Priority => vec![Algorithm::Priority],
            AlgorithmArg::Aging => vec![Algorithm::PriorityAging],
            AlgorithmArg::Mlq => vec![Algorithm::Mlq],
            AlgorithmArg::Rm => vec![Algorithm::RateMonotonic],
            AlgorithmArg::Edf => vec![Algorithm::Edf],
            AlgorithmArg::Sync => vec![Algorithm::SyncDemo],
        }
    }
}

#[derive(Parser, Debug)]
#[command(name = "sched-sim", version, about = "Simulates CPU scheduling policies on a process set")]
struct Args {
    #[arg(short, long, value_enum, default_value_t = AlgorithmArg::All)]
    algorithm: AlgorithmArg,

    /// JSON array of process descriptors; a built-in workload is used otherwise
    #[arg(short, long)]
    input: Option<PathBuf>,

    /// Ticks billed per context switch
    #[arg(long, default_value_t = 1)]
    overhead: u32,

    /// Round robin quantum
    #[arg(short, long, default_value = "4")]
    quantum: NonZeroU32,

    /// Ticks in the ready queue per priority level gained
    #[arg(long, default_value = "10")]
    aging_factor: NonZeroU32,

    #[arg(long, default_value_t = 10_000)]
    tick_limit: u64,

    /// Print the Gantt chart of every run
    #[arg(short, long)]
    gantt: bool,

    /// Print the event log of every run
    #[arg(short, long)]
    log: bool,

    /// Print the statistics as JSON instead of text
    #[arg(long)]
    json: bool,

    /// Mirror the event log through the logger
    #[arg(short, long)]
    verbose: bool,
}

fn sample_workload() -> Vec<ProcessDescriptor> {
    vec![
        ProcessDescriptor::new(1, 0, 3, vec![5, 3, 5]).with_period(20).with_deadline(20),
        ProcessDescriptor::new(2, 1, 1, vec![3, 2, 3]).with_period(10).with_deadline(12),
        ProcessDescriptor::new(3, 2, 4, vec![8]).with_deadline(25),
        ProcessDescriptor::new(4, 4, 2, vec![4]).with_period(15),
        ProcessDescriptor::new(5, 6, 5, vec![2, 4, 2]),
    ]
}

fn load_workload(path: &Path) -> Result<Vec<ProcessDescriptor>> {
    let text = fs::read_to_string(path).with_context(|| format!("cannot read {}", path.display()))?;
    let processes: Vec<ProcessDescriptor> =
        serde_json::from_str(&text).with_context(|| format!("{} is not a process list", path.display()))?;

    /* the engine trusts its input, so reject what it cannot simulate */
    for desc in &processes {
        if desc.pid == 0 {
            bail!("pid must be positive");
        }
        if desc.execution_pattern.is_empty() || desc.execution_pattern.contains(&0) {
            bail!("P{}: bursts must be a non-empty list of positive durations", desc.pid);
        }
    }

    Ok(processes)
}

fn print_gantt(result: &SimulationResult) {
    println!("  Gantt:");
    for entry in &result.gantt_chart {
        let owner = match entry.owner {
            GanttOwner::Process(pid) => format!("P{}", pid),
            GanttOwner::Idle => String::from("IDLE"),
            GanttOwner::ContextSwitch => String::from("CS"),
        };
        println!("    [{:>4} - {:>4}] {:<5} {}", entry.start, entry.end, owner, entry.state);
    }
}

fn print_result(result: &SimulationResult, args: &Args) {
    let stats = &result.statistics;

    println!("{}", result.algorithm);
    println!("  Processes terminated : {}", result.processes.len());
    println!("  Total time           : {}", result.total_time);
    println!("  Avg waiting time     : {:.2}", stats.avg_waiting_time);
    println!("  Avg turnaround time  : {:.2}", stats.avg_turnaround_time);
    println!("  Avg response time    : {:.2}", stats.avg_response_time);
    println!("  CPU utilization      : {:.2}%", stats.cpu_utilization_percent);
    println!("  Context switches     : {}", stats.context_switches);

    if let Some(report) = result.deadlock_report {
        println!("  Deadlock checks      : {}", report.deadlock_checks);
        println!("  Deadlocks detected   : {}", report.deadlocks_detected);
    }
    if result.timed_out {
        println!("  Stopped at the tick limit, results are partial");
    }

    if args.gantt {
        print_gantt(result);
    }
    if args.log {
        for line in &result.event_log {
            println!("  {}", line);
        }
    }
    println!();
}

fn main() -> Result<()> {
    let args = Args::parse();

    let default_level = if args.verbose { "debug" } else { "warn" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_level)).init();

    let processes = match &args.input {
        Some(path) => load_workload(path)?,
        None => sample_workload(),
    };

    let config = SimConfig::default()
        .with_context_switch_overhead(args.overhead)
        .with_time_quantum(args.quantum)
        .with_aging_factor(args.aging_factor)
        .with_tick_limit(args.tick_limit);

    info!("simulating {} processes", processes.len());

    let mut results = Vec::new();
    for algorithm in args.algorithm.algorithms() {
        let result = build_scheduler(algorithm, &processes, &config)
            .run()
            .with_context(|| format!("{:?} stopped on a broken invariant", algorithm))?;
        results.push(result);
    }

    if args.json {
        let summary: Vec<_> = results
            .iter()
            .map(|result| {
                json!({
                    "algorithm": result.algorithm,
                    "total_time": result.total_time,
                    "timed_out": result.timed_out,
                    "statistics": result.statistics,
                    "deadlock_report": result.deadlock_report,
                })
            })
            .collect();

        println!("{}", serde_json::to_string_pretty(&summary)?);
        return Ok(());
    }

    for result in &results {
        print_result(result, &args);
    }

    Ok(())
}
