//! Demo driver for the CEP simulation engine.
//!
//! Builds a set of identical sensor-processing pipeline queries, places them
//! onto shared execution groups, runs the executor to completion with a
//! fixed per-tick capacity, and prints per-minute latency/throughput for
//! each query's consumer plus the run's metrics digest.

use clap::Parser;
use cep_simulator_core_rs::executor::checkpoint;
use cep_simulator_core_rs::generator::GeneratorConfig;
use cep_simulator_core_rs::query::{Edge, Query, Vertex, VertexId};
use cep_simulator_core_rs::{
    AllocationConfig, ExecutorConfig, PlacementExecutor, ScheduleConfig,
};

#[derive(Debug, Parser)]
#[command(name = "cep-sim", about = "CEP query execution simulator")]
struct Args {
    /// Number of identical pipeline queries to run
    #[arg(long, default_value_t = 4)]
    queries: usize,

    /// Query duration in ticks
    #[arg(long, default_value_t = 600)]
    duration: u64,

    /// Producer rate in events per tick
    #[arg(long, default_value_t = 100)]
    rate: u64,

    /// Operator/consumer input queue capacity in events
    #[arg(long, default_value_t = 2048)]
    queue_capacity: u64,

    /// Capacity-consuming vertices per execution group
    #[arg(long, default_value_t = 8)]
    group_size: usize,

    /// Instructions available to the placement per tick
    #[arg(long, default_value_t = 50_000_000)]
    capacity: u64,

    /// Tick interval in seconds
    #[arg(long, default_value_t = 0.1)]
    tick_interval: f64,

    /// Use the static schedule instead of the dynamic one
    #[arg(long)]
    r#static: bool,

    /// Sub-rounds per tick for the dynamic schedule
    #[arg(long, default_value_t = 4)]
    rounds: usize,
}

/// One sensor-processing pipeline: sensor -> parse -> filter -> enrich -> sink.
fn pipeline_query(index: usize, args: &Args) -> Query {
    let name = |stage: &str| format!("q{}_{}", index, stage);
    Query::new(
        format!("q{}", index),
        vec![
            Vertex::producer(name("sensor"), 1_000, GeneratorConfig::Uniform { rate: args.rate }),
            Vertex::operator(name("parse"), 41_250, args.queue_capacity),
            Vertex::operator(name("filter"), 25_000, args.queue_capacity),
            Vertex::operator(name("enrich"), 31_250, args.queue_capacity),
            Vertex::consumer(name("sink"), 1_000, args.queue_capacity),
        ],
        vec![
            Edge::new(name("sensor"), name("parse"), 1.0),
            Edge::new(name("parse"), name("filter"), 1.0),
            Edge::new(name("filter"), name("enrich"), 0.95),
            Edge::new(name("enrich"), name("sink"), 1.0),
        ],
        args.duration,
    )
    .expect("pipeline query is structurally valid")
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();

    let queries: Vec<Query> = (1..=args.queries)
        .map(|index| pipeline_query(index, &args))
        .collect();

    let schedule = if args.r#static {
        ScheduleConfig::Static
    } else {
        ScheduleConfig::Dynamic {
            rounds: args.rounds,
        }
    };

    let config = ExecutorConfig {
        queries,
        group_size: args.group_size,
        allocation: AllocationConfig::Uniform,
        schedule,
        tick_interval_secs: args.tick_interval,
    };
    let config_digest =
        checkpoint::config_digest(&config).expect("config serializes");

    let mut executor = PlacementExecutor::new(config).unwrap_or_else(|e| {
        eprintln!("setup failed: {}", e);
        std::process::exit(1);
    });

    tracing::info!(
        groups = executor.placement().num_groups(),
        config = %config_digest,
        "starting run"
    );

    let mut total_instructions = 0u64;
    while !executor.is_complete() {
        let result = executor.tick(args.capacity);
        total_instructions += result.instructions_consumed;
    }

    println!(
        "ran {} ticks, {} instructions consumed",
        executor.current_tick(),
        total_instructions
    );

    for index in 1..=args.queries {
        let sink = VertexId::new(format!("q{}_sink", index));
        println!("\nq{} consumer ({}):", index, sink);
        println!("  latency by minute (ticks):");
        for (minute, latency) in executor.latency_by_minute(&sink) {
            println!("    minute {:>3}: {:.2}", minute, latency);
        }
        println!("  throughput by minute (events):");
        for (minute, events) in executor.throughput_by_minute(&sink) {
            println!("    minute {:>3}: {}", minute, events);
        }
        let dropped = executor.dropped_by_minute(&sink);
        if !dropped.is_empty() {
            println!("  dropped by minute (events):");
            for (minute, events) in dropped {
                println!("    minute {:>3}: {}", minute, events);
            }
        }
    }

    println!("\nmetrics digest: {}", checkpoint::metrics_digest(executor.metrics()));
}
