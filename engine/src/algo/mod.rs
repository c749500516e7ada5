//! Route choice and congestion simulation on a `WeightedGraph`.

use crate::datastr::graph::*;

pub mod dijkstra;
pub mod rounds;

/// Simply a source-target pair
#[derive(Debug, Clone, Copy)]
pub struct Query<'a> {
    pub from: &'a str,
    pub to: &'a str,
}

/// A route and its length by settled weights.
/// The default value, zero distance and no vertices, is what a car without a route records.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Path {
    pub distance: Weight,
    pub vertices: Vec<VertexId>,
}

impl Path {
    pub fn from_root(root: &str) -> Path {
        Path {
            distance: 0.0,
            vertices: vec![root.to_string()],
        }
    }

    fn extended(&self, vertex: &str, weight: Weight) -> Path {
        let mut vertices = Vec::with_capacity(self.vertices.len() + 1);
        vertices.extend_from_slice(&self.vertices);
        vertices.push(vertex.to_string());
        Path {
            distance: self.distance + weight,
            vertices,
        }
    }

    pub fn last(&self) -> Option<&str> {
        self.vertices.last().map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.vertices.is_empty()
    }

    /// Consecutive vertex pairs, i.e. the edges a car drives along.
    pub fn edges(&self) -> impl Iterator<Item = (&str, &str)> {
        self.vertices.windows(2).map(|pair| (pair[0].as_str(), pair[1].as_str()))
    }
}
