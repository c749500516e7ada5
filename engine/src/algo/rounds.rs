//! Rounds of the congestion simulation.
//!
//! A round has three phases:
//!
//! 1. compute: every lane routes its cars from origin to destination on the settled weights
//! 2. apply: every lane adds the slowdown to each edge its cars drove along
//! 3. settle: touched edges keep their accumulated cost, all others decay to free flow
//!
//! Lanes run in parallel within a phase. Each phase ends with all lanes being done,
//! so every search of a round sees the same settled weights and settlement sees all updates.
//! Rounds are strictly sequential, round `i + 1` routes on what round `i` settled.

use super::{dijkstra::PathFinder, *};
use crate::error::Result;
use rand::{rngs::StdRng, Rng, SeedableRng};
use rayon::prelude::*;
use serde::Serialize;
use tracing::debug;

/// Summary of one round.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct RoundStats {
    pub cars: usize,
    pub unreachable_cars: usize,
    /// Mean route length of all cars which reached the destination
    pub mean_distance: Option<Weight>,
    pub touched_edges: usize,
}

/// Routes of all cars of one round, indexed by lane and then by car.
/// Cars without a route have a default `Path` with distance zero.
#[derive(Debug, Clone, Default)]
pub struct RoundOutcome {
    pub distances: Vec<Vec<Weight>>,
    pub paths: Vec<Vec<Path>>,
    pub stats: RoundStats,
}

pub struct RoundDriver<'g, R> {
    graph: &'g WeightedGraph,
    rng: R,
}

impl<'g, R: Rng> RoundDriver<'g, R> {
    pub fn new(graph: &'g WeightedGraph, rng: R) -> Self {
        RoundDriver { graph, rng }
    }

    /// One full compute, apply, settle cycle.
    pub fn drive(&mut self) -> Result<RoundOutcome> {
        let graph = self.graph;
        let params = graph.params();
        let query = Query {
            from: params.origin(),
            to: params.destination(),
        };

        // every lane gets its own generator, seeded in lane order so seeded runs are reproducible
        let lane_seeds: Vec<u64> = (0..params.lanes()).map(|_| self.rng.gen()).collect();

        let routes: Vec<Vec<Option<Path>>> = lane_seeds
            .into_par_iter()
            .map(|seed| {
                let mut path_finder = PathFinder::new(graph, StdRng::seed_from_u64(seed));
                (0..params.cars_per_lane()).map(|_| path_finder.query(query)).collect()
            })
            .collect();

        routes.par_iter().try_for_each(|lane| -> Result<()> {
            for path in lane.iter().flatten() {
                for (from, to) in path.edges() {
                    graph.update_edge(from, to, params.slowdown())?;
                }
            }
            Ok(())
        })?;

        let touched_edges = graph.settle();

        let cars = params.lanes() * params.cars_per_lane();
        let reached: Vec<Weight> = routes.iter().flatten().flatten().map(|path| path.distance).collect();
        let stats = RoundStats {
            cars,
            unreachable_cars: cars - reached.len(),
            mean_distance: if reached.is_empty() {
                None
            } else {
                Some(reached.iter().sum::<Weight>() / reached.len() as Weight)
            },
            touched_edges,
        };

        let paths: Vec<Vec<Path>> = routes
            .into_iter()
            .map(|lane| lane.into_iter().map(Option::unwrap_or_default).collect())
            .collect();
        let distances = paths.iter().map(|lane| lane.iter().map(|path| path.distance).collect()).collect();

        Ok(RoundOutcome { distances, paths, stats })
    }

    /// Run all rounds the graph was configured with.
    pub fn simulate(&mut self) -> Result<Vec<RoundStats>> {
        let rounds = self.graph.params().rounds();
        let mut all_stats = Vec::with_capacity(rounds);

        for round in 0..rounds {
            let outcome = self.drive()?;
            debug!(
                round,
                mean_distance = ?outcome.stats.mean_distance,
                unreachable_cars = outcome.stats.unreachable_cars,
                touched_edges = outcome.stats.touched_edges,
                "round settled"
            );
            all_stats.push(outcome.stats);
        }

        Ok(all_stats)
    }
}
