//! Dijkstra with randomized tie breaking.
//!
//! Neighbors of every settled vertex are relaxed in shuffled order.
//! The returned distance does not depend on that order, but among several
//! shortest paths the one which is found first, and therefore returned, does.
//! This models drivers picking arbitrarily between equally good routes.
//!
//! The queue holds whole paths instead of tentative distances.
//! There is no decrease key, a vertex can be in the queue several times
//! and all but the first pop of it are discarded.

use super::*;
use crate::datastr::heap::MinHeap;
use rand::{seq::SliceRandom, Rng};
use std::cmp::Ordering;
use std::collections::HashSet;

/// Priority queue entries, ordered by the distance of the path only.
#[derive(Debug)]
struct State {
    path: Path,
}

impl PartialEq for State {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for State {}

impl PartialOrd for State {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for State {
    fn cmp(&self, other: &Self) -> Ordering {
        self.path.distance.total_cmp(&other.path.distance)
    }
}

pub struct PathFinder<'g, R> {
    graph: &'g WeightedGraph,
    rng: R,

    num_queue_pops: usize,
    num_queue_pushs: usize,
}

impl<'g, R: Rng> PathFinder<'g, R> {
    pub fn new(graph: &'g WeightedGraph, rng: R) -> Self {
        PathFinder {
            graph,
            rng,
            num_queue_pops: 0,
            num_queue_pushs: 0,
        }
    }

    /// Shortest path from `query.from` to `query.to` by settled weights.
    /// `None` if the destination cannot be reached.
    /// The graph is read locked for the whole search.
    pub fn query(&mut self, query: Query) -> Option<Path> {
        self.num_queue_pops = 0;
        self.num_queue_pushs = 1;

        let graph = self.graph.read();
        let mut queue = MinHeap::new();
        let mut visited: HashSet<VertexId> = HashSet::new();
        let mut neighbors = Vec::new();

        queue.push(State {
            path: Path::from_root(query.from),
        });

        while let Some(State { path }) = queue.pop() {
            self.num_queue_pops += 1;
            let Some(vertex) = path.last() else { continue };

            if visited.contains(vertex) {
                continue;
            }
            if vertex == query.to {
                return Some(path);
            }

            neighbors.clear();
            neighbors.extend(graph.links(vertex));
            neighbors.shuffle(&mut self.rng);

            for &(next, weight) in &neighbors {
                if !visited.contains(next) {
                    self.num_queue_pushs += 1;
                    queue.push(State {
                        path: path.extended(next, weight),
                    });
                }
            }

            visited.insert(vertex.to_string());
        }

        None
    }

    pub fn num_queue_pops(&self) -> usize {
        self.num_queue_pops
    }

    pub fn num_queue_pushs(&self) -> usize {
        self.num_queue_pushs
    }
}
