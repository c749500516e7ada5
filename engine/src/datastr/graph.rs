//! The shared road network.
//!
//! One `WeightedGraph` lives for one simulation run.
//! Path searches read it concurrently, weight updates and settlement write it.
//! Vertices, adjacency and touched flags form one unit behind a single reader-writer lock.
//! All concurrent `update_edge` calls of an apply phase serialize on that lock,
//! which bounds how far the apply phase scales with the number of lanes.

use crate::error::{Error, Result};
use parking_lot::{RwLock, RwLockReadGuard};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Vertices are identified by strings.
pub type VertexId = String;
/// Travel costs are non negative floats.
pub type Weight = f64;

/// Travel cost of a road nobody used in the last round.
pub const FREE_FLOW_WEIGHT: Weight = 1.0;

/// Attribute given to vertices which only come into existence through an edge.
pub const DEFAULT_VERTEX_VALUE: f64 = 0.0;

/// Weight record of one direction of an edge.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Adj {
    /// Round accumulator. Starts at the free flow weight and grows by the slowdown for every car.
    pub weight: Weight,
    /// Settled travel cost all searches of the current round use.
    pub prev_weight: Weight,
}

impl Adj {
    pub fn new(weight: Weight) -> Adj {
        Adj { weight, prev_weight: weight }
    }

    /// Promote the accumulator when the edge was used, decay otherwise.
    /// Either way the next round accumulates from the free flow weight again.
    fn reset_or_commit(&mut self, touched: bool) {
        if touched {
            self.prev_weight = self.weight;
        } else {
            self.prev_weight = FREE_FLOW_WEIGHT;
        }
        self.weight = FREE_FLOW_WEIGHT;
    }
}

/// Parameters of one simulation run. Fixed when the graph is built.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SimulationParams {
    rounds: usize,
    cars_per_lane: usize,
    lanes: usize,
    slowdown: Weight,
    origin: VertexId,
    destination: VertexId,
}

impl SimulationParams {
    pub fn new(
        rounds: usize,
        cars_per_lane: usize,
        lanes: usize,
        slowdown: Weight,
        origin: impl Into<VertexId>,
        destination: impl Into<VertexId>,
    ) -> Result<SimulationParams> {
        if lanes == 0 {
            return Err(Error::invalid_params("at least one lane is required"));
        }
        if !slowdown.is_finite() || slowdown < 0.0 {
            return Err(Error::invalid_params(format!("slowdown must be a finite non negative number, got {}", slowdown)));
        }

        Ok(SimulationParams {
            rounds,
            cars_per_lane,
            lanes,
            slowdown,
            origin: origin.into(),
            destination: destination.into(),
        })
    }

    pub fn rounds(&self) -> usize {
        self.rounds
    }

    pub fn cars_per_lane(&self) -> usize {
        self.cars_per_lane
    }

    pub fn lanes(&self) -> usize {
        self.lanes
    }

    pub fn slowdown(&self) -> Weight {
        self.slowdown
    }

    pub fn origin(&self) -> &str {
        &self.origin
    }

    pub fn destination(&self) -> &str {
        &self.destination
    }
}

/// Settled weights of a graph, `vertex -> vertex -> prev_weight`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Snapshot(BTreeMap<VertexId, BTreeMap<VertexId, Weight>>);

impl Snapshot {
    pub fn get(&self, from: &str, to: &str) -> Option<Weight> {
        self.0.get(from).and_then(|edges| edges.get(to)).copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str, Weight)> {
        self.0
            .iter()
            .flat_map(|(from, edges)| edges.iter().map(move |(to, &weight)| (from.as_str(), to.as_str(), weight)))
    }

    /// Number of vertices with an entry.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

// Ordered maps keep neighbor enumeration, and with it seeded runs, reproducible.
#[derive(Debug, Default)]
struct Network {
    vertices: BTreeMap<VertexId, f64>,
    adj: BTreeMap<VertexId, BTreeMap<VertexId, Adj>>,
    touched: BTreeMap<VertexId, BTreeMap<VertexId, bool>>,
}

impl Network {
    fn ensure_vertex(&mut self, id: &str, value: f64) {
        if !self.vertices.contains_key(id) {
            self.vertices.insert(id.to_string(), value);
            self.adj.insert(id.to_string(), BTreeMap::new());
            self.touched.insert(id.to_string(), BTreeMap::new());
        }
    }

    fn set_arc(&mut self, from: &str, to: &str, adj: Adj) {
        if let Some(edges) = self.adj.get_mut(from) {
            edges.insert(to.to_string(), adj);
        }
        if let Some(flags) = self.touched.get_mut(from) {
            flags.insert(to.to_string(), false);
        }
    }

    fn add_to_arc(&mut self, from: &str, to: &str, delta: Weight) -> Result<()> {
        let adj = self
            .adj
            .get_mut(from)
            .and_then(|edges| edges.get_mut(to))
            .ok_or_else(|| Error::missing_edge(from, to))?;
        adj.weight += delta;
        if let Some(flag) = self.touched.get_mut(from).and_then(|flags| flags.get_mut(to)) {
            *flag = true;
        }
        Ok(())
    }

    fn settle_arc(&mut self, from: &str, to: &str) -> Result<bool> {
        let flag = self
            .touched
            .get_mut(from)
            .and_then(|flags| flags.get_mut(to))
            .ok_or_else(|| Error::missing_edge(from, to))?;
        let touched = std::mem::replace(flag, false);
        if let Some(adj) = self.adj.get_mut(from).and_then(|edges| edges.get_mut(to)) {
            adj.reset_or_commit(touched);
        }
        Ok(touched)
    }
}

/// Concurrency safe undirected graph with per round congestion bookkeeping.
#[derive(Debug)]
pub struct WeightedGraph {
    network: RwLock<Network>,
    params: SimulationParams,
}

impl WeightedGraph {
    pub fn new(params: SimulationParams) -> WeightedGraph {
        WeightedGraph {
            network: RwLock::new(Network::default()),
            params,
        }
    }

    pub fn params(&self) -> &SimulationParams {
        &self.params
    }

    /// Register a vertex. Re-adding an existing vertex only overwrites its attribute.
    pub fn add_vertex(&self, id: impl Into<VertexId>, value: f64) {
        let id = id.into();
        let mut network = self.network.write();
        network.ensure_vertex(&id, value);
        network.vertices.insert(id, value);
    }

    /// Connect `a` and `b` in both directions with `weight` as accumulator and settled weight.
    /// Missing vertices are created with the default attribute.
    /// Everything happens under one write lock, readers never see half an edge.
    pub fn add_edges(&self, a: &str, b: &str, weight: Weight) {
        self.insert_edges(a, b, Adj::new(weight));
    }

    /// Connect `a` and `b` with `settled` as the weight searches see,
    /// while the accumulator starts at the free flow weight like after any settlement.
    pub(crate) fn add_settled_edges(&self, a: &str, b: &str, settled: Weight) {
        self.insert_edges(a, b, Adj { weight: FREE_FLOW_WEIGHT, prev_weight: settled });
    }

    fn insert_edges(&self, a: &str, b: &str, adj: Adj) {
        let mut network = self.network.write();
        network.ensure_vertex(a, DEFAULT_VERTEX_VALUE);
        network.ensure_vertex(b, DEFAULT_VERTEX_VALUE);
        network.set_arc(a, b, adj);
        network.set_arc(b, a, adj);
    }

    /// Add `delta` to the round accumulator of the edge between `a` and `b` and mark it touched.
    /// Both directions are updated, the settled weight stays as it is.
    pub fn update_edge(&self, a: &str, b: &str, delta: Weight) -> Result<()> {
        let mut network = self.network.write();
        network.add_to_arc(a, b, delta)?;
        if a != b {
            network.add_to_arc(b, a, delta)?;
        }
        Ok(())
    }

    /// Settle a single edge: commit the accumulator if touched, decay to free flow otherwise.
    pub fn reset_or_commit(&self, a: &str, b: &str) -> Result<()> {
        let mut network = self.network.write();
        network.settle_arc(a, b)?;
        if a != b {
            network.settle_arc(b, a)?;
        }
        Ok(())
    }

    /// Settlement pass over all edges under one write lock.
    /// Returns the number of edges that were touched during the round.
    pub fn settle(&self) -> usize {
        let mut guard = self.network.write();
        let network = &mut *guard;
        let mut touched_edges = 0;

        for (from, edges) in network.adj.iter_mut() {
            let Some(flags) = network.touched.get_mut(from) else { continue };
            for (to, adj) in edges.iter_mut() {
                let touched = flags.get_mut(to).map(|flag| std::mem::replace(flag, false)).unwrap_or(false);
                if touched && from <= to {
                    touched_edges += 1;
                }
                adj.reset_or_commit(touched);
            }
        }

        touched_edges
    }

    /// Settled weights for persistence.
    pub fn snapshot(&self) -> Snapshot {
        let network = self.network.read();
        Snapshot(
            network
                .adj
                .iter()
                .map(|(from, edges)| (from.clone(), edges.iter().map(|(to, adj)| (to.clone(), adj.prev_weight)).collect()))
                .collect(),
        )
    }

    /// Shared read access for path searches.
    pub fn read(&self) -> GraphView<'_> {
        GraphView {
            network: self.network.read(),
        }
    }

    pub fn num_vertices(&self) -> usize {
        self.network.read().vertices.len()
    }

    /// Number of undirected edges, self loops included.
    pub fn num_edges(&self) -> usize {
        let network = self.network.read();
        network
            .adj
            .iter()
            .map(|(from, edges)| edges.keys().filter(|to| from <= *to).count())
            .sum()
    }

    pub fn vertex_value(&self, id: &str) -> Option<f64> {
        self.network.read().vertices.get(id).copied()
    }

    pub fn edge(&self, a: &str, b: &str) -> Option<Adj> {
        self.network.read().adj.get(a).and_then(|edges| edges.get(b)).copied()
    }

    pub fn is_touched(&self, a: &str, b: &str) -> Option<bool> {
        self.network.read().touched.get(a).and_then(|flags| flags.get(b)).copied()
    }

    /// Neighbors of `id` in no particular order.
    pub fn neighbors(&self, id: &str) -> Vec<VertexId> {
        self.network
            .read()
            .adj
            .get(id)
            .map(|edges| edges.keys().cloned().collect())
            .unwrap_or_default()
    }

    /// Do both graphs carry exactly the same weight records?
    pub fn equal_weights(&self, other: &WeightedGraph) -> bool {
        if std::ptr::eq(self, other) {
            return true;
        }
        // lock in address order so two opposite comparisons cannot wait on each other
        let (first, second) = if (self as *const Self) < (other as *const Self) { (self, other) } else { (other, self) };
        let first = first.network.read();
        let second = second.network.read();
        first.adj == second.adj
    }
}

impl fmt::Display for WeightedGraph {
    /// One line per vertex listing its neighbors with the settled weight truncated to an integer.
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let network = self.network.read();
        for (vertex, edges) in &network.adj {
            write!(f, "{}", vertex)?;
            for (to, adj) in edges {
                write!(f, " -> {}:{}", to, adj.prev_weight as i64)?;
            }
            writeln!(f)?;
        }
        Ok(())
    }
}

/// Read locked view of a graph. Holds the shared lock until dropped.
pub struct GraphView<'a> {
    network: RwLockReadGuard<'a, Network>,
}

impl<'a> GraphView<'a> {
    /// Outgoing links of `id` with their settled weights.
    pub fn links(&self, id: &str) -> impl Iterator<Item = (&str, Weight)> + '_ {
        self.network
            .adj
            .get(id)
            .into_iter()
            .flat_map(|edges| edges.iter().map(|(to, adj)| (to.as_str(), adj.prev_weight)))
    }
}
