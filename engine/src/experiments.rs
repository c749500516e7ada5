//! Experiment instances and the machinery to run many of them.

use std::time::Duration;

use rand::prelude::*;
use tracing::info;

use crate::{
    algo::rounds::*,
    datastr::graph::*,
    error::{Error, Result},
    report::measure,
    topology::TopologyKind,
};

pub mod cancel;
pub mod pipeline;

/// Capacity of the channels between pipeline stages.
/// Zero makes every hand-off a rendezvous.
/// Can be overriden through the CONGESTION_CHANNEL_CAPACITY env var.
pub fn channel_capacity() -> Result<usize> {
    parse_channel_capacity(std::env::var("CONGESTION_CHANNEL_CAPACITY").ok().as_deref())
}

fn parse_channel_capacity(value: Option<&str>) -> Result<usize> {
    match value {
        None => Ok(0),
        Some(num) => num
            .trim()
            .parse()
            .map_err(|_| Error::invalid_params(format!("CONGESTION_CHANNEL_CAPACITY must be a non negative integer, got {:?}", num))),
    }
}

/// Seed of the experiment with the given id, derived from the master seed.
pub fn experiment_seed(master_seed: u64, id: usize) -> u64 {
    master_seed.wrapping_add(id as u64)
}

pub fn experiment_rng(master_seed: u64, id: usize) -> StdRng {
    StdRng::seed_from_u64(experiment_seed(master_seed, id))
}

/// How many experiments to run on how many worker threads.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PipelineConfig {
    experiments: usize,
    workers: usize,
    seed: u64,
}

impl PipelineConfig {
    pub fn new(experiments: usize, workers: usize, seed: u64) -> Result<Self> {
        if workers == 0 {
            return Err(Error::invalid_params("at least one worker is required"));
        }
        Ok(PipelineConfig { experiments, workers, seed })
    }

    pub fn experiments(&self) -> usize {
        self.experiments
    }

    pub fn workers(&self) -> usize {
        self.workers
    }

    pub fn seed(&self) -> u64 {
        self.seed
    }
}

/// One simulation instance: a graph, its own random source and what happened to it so far.
#[derive(Debug)]
pub struct Experiment {
    id: usize,
    kind: TopologyKind,
    graph: WeightedGraph,
    rng: StdRng,
    stats: Vec<RoundStats>,
    running_time: Option<Duration>,
}

impl Experiment {
    pub fn new(id: usize, kind: TopologyKind, graph: WeightedGraph, rng: StdRng) -> Self {
        Experiment {
            id,
            kind,
            graph,
            rng,
            stats: Vec::new(),
            running_time: None,
        }
    }

    pub fn id(&self) -> usize {
        self.id
    }

    pub fn kind(&self) -> TopologyKind {
        self.kind
    }

    pub fn graph(&self) -> &WeightedGraph {
        &self.graph
    }

    pub fn params(&self) -> &SimulationParams {
        self.graph.params()
    }

    /// Per round statistics of all rounds simulated so far.
    pub fn stats(&self) -> &[RoundStats] {
        &self.stats
    }

    pub fn rounds_completed(&self) -> usize {
        self.stats.len()
    }

    /// Wall clock time of the last `simulate` call.
    pub fn running_time(&self) -> Option<Duration> {
        self.running_time
    }

    pub fn snapshot(&self) -> Snapshot {
        self.graph.snapshot()
    }

    /// Run all configured rounds on this experiment's graph.
    pub fn simulate(mut self) -> Result<Self> {
        let (stats, time) = measure(|| RoundDriver::new(&self.graph, &mut self.rng).simulate());
        self.stats.extend(stats?);
        self.running_time = Some(time);

        info!(
            id = self.id,
            kind = %self.kind,
            rounds = self.rounds_completed(),
            running_time_ms = time.as_secs_f64() * 1000.0,
            "experiment simulated"
        );
        Ok(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn simulate_runs_all_rounds() {
        let graph = WeightedGraph::new(SimulationParams::new(4, 2, 2, 1.0, "0", "1").unwrap());
        graph.add_edges("0", "1", FREE_FLOW_WEIGHT);

        let experiment = Experiment::new(3, TopologyKind::Complete, graph, StdRng::seed_from_u64(3));
        assert_eq!(experiment.rounds_completed(), 0);

        let experiment = experiment.simulate().unwrap();
        assert_eq!(experiment.id(), 3);
        assert_eq!(experiment.rounds_completed(), 4);
        assert!(experiment.running_time().is_some());
        // four cars each round
        assert_eq!(experiment.snapshot().get("0", "1"), Some(5.0));
    }

    #[test]
    fn config_needs_workers() {
        assert!(PipelineConfig::new(10, 0, 1).is_err());
        let config = PipelineConfig::new(0, 3, 1).unwrap();
        assert_eq!(config.experiments(), 0);
        assert_eq!(config.workers(), 3);
    }

    #[test]
    fn channel_capacity_override() {
        assert_eq!(parse_channel_capacity(None).unwrap(), 0);
        assert_eq!(parse_channel_capacity(Some("16")).unwrap(), 16);
        assert!(matches!(parse_channel_capacity(Some("lots")), Err(Error::InvalidParams(_))));
        assert!(matches!(parse_channel_capacity(Some("-1")), Err(Error::InvalidParams(_))));
    }

    #[test]
    fn experiment_seeds_differ() {
        assert_ne!(experiment_seed(7, 0), experiment_seed(7, 1));
        assert_eq!(experiment_seed(u64::MAX, 1), 0);
    }
}
