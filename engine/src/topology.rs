//! Generators for the road networks experiments run on.
//!
//! Vertex ids are the decimal numbers `0..n`. Everything random is drawn from the
//! generator passed in, so a seeded generator always yields the same network.

use std::{fmt, str::FromStr};

use rand::{rngs::StdRng, Rng};
use serde::{Deserialize, Serialize};

use crate::{
    datastr::graph::*,
    error::{Error, Result},
    experiments::Experiment,
};

/// Attribute of the vertices of a complete graph.
pub const COMPLETE_VERTEX_VALUE: f64 = 1.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TopologyKind {
    Complete,
    Random,
    City,
}

impl TopologyKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            TopologyKind::Complete => "complete",
            TopologyKind::Random => "random",
            TopologyKind::City => "city",
        }
    }
}

impl fmt::Display for TopologyKind {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TopologyKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "complete" => Ok(TopologyKind::Complete),
            "random" => Ok(TopologyKind::Random),
            "city" => Ok(TopologyKind::City),
            _ => Err(Error::UnknownTopology(s.to_string())),
        }
    }
}

/// Which kind of network to build and how large.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct TopologySpec {
    kind: TopologyKind,
    size: usize,
}

impl TopologySpec {
    pub fn new(kind: TopologyKind, size: usize) -> Result<Self> {
        // random networks draw their edge count from 0..size², which has to fit
        if kind == TopologyKind::Random && size.checked_mul(size).is_none() {
            return Err(Error::invalid_topology(format!("random network of size {} is too large", size)));
        }
        Ok(TopologySpec { kind, size })
    }

    pub fn kind(&self) -> TopologyKind {
        self.kind
    }

    pub fn size(&self) -> usize {
        self.size
    }
}

/// Complete graph on `n` vertices with free flow weights on all edges.
pub fn complete(n: usize, params: SimulationParams) -> WeightedGraph {
    let graph = WeightedGraph::new(params);
    for i in 0..n {
        graph.add_vertex(i.to_string(), COMPLETE_VERTEX_VALUE);
    }
    for i in 0..n {
        for j in 0..i {
            graph.add_edges(&i.to_string(), &j.to_string(), FREE_FLOW_WEIGHT);
        }
    }
    graph
}

/// `edge_count` edges between uniformly drawn vertices of `0..max_vertices`.
/// Self loops and repeated pairs are possible, a repeated pair keeps the last weight.
/// Settled weights are `min + u * max` for `u` uniform in `[0, 1)`, accumulators start at free flow.
/// Vertices only exist if some edge touches them.
pub fn random(max_vertices: usize, edge_count: usize, (min, max): (Weight, Weight), params: SimulationParams, rng: &mut impl Rng) -> Result<WeightedGraph> {
    if !min.is_finite() || !max.is_finite() {
        return Err(Error::invalid_topology("weight bounds must be finite"));
    }
    if min < 0.0 || max < 0.0 {
        return Err(Error::invalid_topology(format!("negative weight bounds [{}, {}]", min, max)));
    }
    if max_vertices == 0 && edge_count > 0 {
        return Err(Error::invalid_topology("cannot place edges without vertices"));
    }

    let graph = WeightedGraph::new(params);
    for _ in 0..edge_count {
        let a = rng.gen_range(0..max_vertices).to_string();
        let b = rng.gen_range(0..max_vertices).to_string();
        let weight = rng.gen::<f64>() * max + min;
        graph.add_settled_edges(&a, &b, weight);
    }
    Ok(graph)
}

/// City like network: every intersection gets between 2 and 5 roads to random intersections.
/// Roads may loop back to their own intersection or duplicate another road.
pub fn city(intersections: usize, params: SimulationParams, rng: &mut impl Rng) -> WeightedGraph {
    let graph = WeightedGraph::new(params);
    for i in 0..intersections {
        graph.add_vertex(i.to_string(), DEFAULT_VERTEX_VALUE);
    }
    for i in 0..intersections {
        let crossroads = rng.gen_range(2..=5);
        for _ in 0..crossroads {
            let other = rng.gen_range(0..intersections);
            graph.add_edges(&i.to_string(), &other.to_string(), FREE_FLOW_WEIGHT);
        }
    }
    graph
}

/// Build the network described by `spec` and wrap it into experiment `id`.
/// The generator drives both the construction and, afterwards, the simulation.
pub fn generate_experiment(spec: TopologySpec, id: usize, params: SimulationParams, mut rng: StdRng) -> Result<Experiment> {
    let graph = match spec.kind() {
        TopologyKind::Complete => complete(spec.size(), params),
        TopologyKind::City => city(spec.size(), params, &mut rng),
        TopologyKind::Random => {
            let edge_count = if spec.size() == 0 { 0 } else { rng.gen_range(0..spec.size() * spec.size()) };
            random(spec.size(), edge_count, (0.0, 1.0), params, &mut rng)?
        }
    };
    Ok(Experiment::new(id, spec.kind(), graph, rng))
}
