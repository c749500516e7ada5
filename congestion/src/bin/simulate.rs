//! Run many congestion experiments and store the settled networks as JSON.
//!
//! Every experiment routes `cars / threads` cars on each of `threads` lanes for `rounds` rounds.
//! Experiments themselves run on `threads` worker threads.
//! The final settled weights of each experiment go to `{out}/{loc}_{id}_{kind}_cars_.._threads_.._size_...json`,
//! a JSON report of the run goes to stdout, logs go to stderr.

#[macro_use]
extern crate traffic_congestion;

use clap::Parser;
use std::{error::Error, path::PathBuf};
use tracing::{info, Level};
use tracing_subscriber::{EnvFilter, FmtSubscriber};
use traffic_congestion::{
    cli::cars_per_lane,
    datastr::graph::SimulationParams,
    experiments::{cancel::CancellationToken, channel_capacity, experiment_rng, pipeline::ExperimentPipeline, PipelineConfig},
    io::write_snapshot,
    report::*,
    topology::{generate_experiment, TopologyKind, TopologySpec},
};

#[derive(Parser, Debug)]
#[command(name = "simulate")]
#[command(about = "Simulate traffic congestion on generated road networks", long_about = None)]
struct Args {
    /// Worker threads, also the number of lanes per round
    #[arg(short = 'p', long, default_value = "4")]
    threads: usize,

    /// Number of experiments
    #[arg(short = 'n', long, default_value = "100")]
    experiments: usize,

    /// Rounds per experiment
    #[arg(short, long, default_value = "100")]
    rounds: usize,

    /// Cars per round, split evenly over the lanes
    #[arg(short, long, default_value = "1000")]
    cars: usize,

    /// Travel cost every car adds to the roads it uses
    #[arg(short, long, default_value = "1.0")]
    slowdown: f64,

    /// Size of the generated networks
    #[arg(long, default_value = "10")]
    size: usize,

    /// Kind of network: city, complete or random
    #[arg(short = 't', long = "type", default_value = "city")]
    kind: String,

    /// Prefix of the output files
    #[arg(long, default_value = "tmp")]
    loc: String,

    /// Output directory
    #[arg(long, default_value = "data")]
    out: PathBuf,

    #[arg(long, default_value = "0")]
    origin: String,

    #[arg(long, default_value = "1")]
    destination: String,

    /// Master seed for reproducible runs (0 = random from time)
    #[arg(long, default_value = "0")]
    seed: u64,

    #[arg(short, long)]
    verbose: bool,
}

fn main() -> Result<(), Box<dyn Error>> {
    let args = Args::parse();

    // RUST_LOG takes precedence over -v
    let level = if args.verbose { Level::DEBUG } else { Level::INFO };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level.as_str()));
    let subscriber = FmtSubscriber::builder().with_env_filter(filter).with_writer(std::io::stderr).finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let _reporter = enable_reporting("simulate");

    let kind: TopologyKind = args.kind.parse()?;
    let spec = TopologySpec::new(kind, args.size)?;
    let params = SimulationParams::new(
        args.rounds,
        cars_per_lane(args.cars, args.threads)?,
        args.threads,
        args.slowdown,
        args.origin.as_str(),
        args.destination.as_str(),
    )?;

    let seed = if args.seed == 0 { time_based_seed() } else { args.seed };
    report!("seed", seed);
    let config = PipelineConfig::new(args.experiments, args.threads, seed)?;
    report!("channel_capacity", channel_capacity()?);

    report!("topology", spec);
    report!("params", params);

    let pipeline = ExperimentPipeline::new(config, CancellationToken::new());

    let summary = report_time("experiment pipeline", || {
        let mut exps_ctxt = push_collection_context("experiments".to_string());
        let summary = pipeline.run(
            |id| generate_experiment(spec, id, params.clone(), experiment_rng(seed, id)),
            |experiment| {
                let _exp_ctx = exps_ctxt.push_collection_item();
                let path = write_snapshot(&args.out, &args.loc, &experiment)?;

                report!("id", experiment.id());
                report!("kind", experiment.kind());
                report!("num_vertices", experiment.graph().num_vertices());
                report!("num_edges", experiment.graph().num_edges());
                report!("rounds", experiment.rounds_completed());
                report!("running_time_ms", experiment.running_time().map(|t| t.as_secs_f64() * 1000.0));
                report!("mean_distance_last_round", experiment.stats().last().and_then(|s| s.mean_distance));
                report!("file", path.display().to_string());

                info!(id = experiment.id(), file = %path.display(), "snapshot written");
                Ok(())
            },
        );
        summary
    })?;

    report!("delivered", summary.delivered);
    report!("cancelled", summary.cancelled);

    Ok(())
}

fn time_based_seed() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_nanos() as u64)
        .unwrap_or(1)
        .max(1)
}
