use proptest::prelude::*;
use rand::{rngs::StdRng, SeedableRng};
use std::collections::BTreeMap;
use traffic_congestion::{
    algo::{dijkstra::PathFinder, rounds::RoundDriver, Query},
    datastr::graph::*,
};

const VERTICES: usize = 8;

fn edge_list() -> impl Strategy<Value = Vec<(usize, usize, u32)>> {
    prop::collection::vec((0..VERTICES, 0..VERTICES, 1..10u32), 0..30)
}

fn build(edges: &[(usize, usize, u32)], params: SimulationParams) -> WeightedGraph {
    let graph = WeightedGraph::new(params);
    for v in 0..VERTICES {
        graph.add_vertex(v.to_string(), DEFAULT_VERTEX_VALUE);
    }
    for &(a, b, w) in edges {
        graph.add_edges(&a.to_string(), &b.to_string(), w as Weight);
    }
    graph
}

// Bellman-Ford on the settled weights as reference
fn reference_distances(graph: &WeightedGraph, from: &str) -> BTreeMap<String, Weight> {
    let snapshot = graph.snapshot();
    let mut distances = BTreeMap::new();
    distances.insert(from.to_string(), 0.0);
    for _ in 0..VERTICES {
        for (a, b, weight) in snapshot.iter() {
            if let Some(&da) = distances.get(a) {
                let candidate = da + weight;
                if distances.get(b).map_or(true, |&db| candidate < db) {
                    distances.insert(b.to_string(), candidate);
                }
            }
        }
    }
    distances
}

fn params(lanes: usize, cars: usize) -> SimulationParams {
    SimulationParams::new(3, cars, lanes, 1.0, "0", "1").unwrap()
}

proptest! {
    #[test]
    fn edges_stay_symmetric(edges in edge_list(), updates in prop::collection::vec((0..VERTICES, 0..VERTICES, 0..5u32), 0..40), lanes in 1..4usize, seed in any::<u64>()) {
        let graph = build(&edges, params(lanes, 3));

        for (a, b, delta) in updates {
            let (a, b) = (a.to_string(), b.to_string());
            // pairs without an edge are rejected and change nothing
            let _ = graph.update_edge(&a, &b, delta as Weight);
        }
        graph.settle();
        RoundDriver::new(&graph, StdRng::seed_from_u64(seed)).simulate().unwrap();

        let snapshot = graph.snapshot();
        for (a, b, weight) in snapshot.iter() {
            prop_assert_eq!(snapshot.get(b, a), Some(weight));
            prop_assert_eq!(graph.edge(a, b), graph.edge(b, a));
            prop_assert_eq!(graph.is_touched(a, b), Some(false));
        }
    }

    #[test]
    fn paths_are_shortest_and_consistent(edges in edge_list(), target in 0..VERTICES, seed in any::<u64>()) {
        let graph = build(&edges, params(1, 1));
        let reference = reference_distances(&graph, "0");
        let target = target.to_string();

        let path = PathFinder::new(&graph, StdRng::seed_from_u64(seed)).query(Query { from: "0", to: &target });

        match path {
            None => prop_assert!(!reference.contains_key(&target)),
            Some(path) => {
                prop_assert_eq!(Some(&path.distance), reference.get(&target));
                prop_assert_eq!(path.vertices.first().map(String::as_str), Some("0"));
                prop_assert_eq!(path.last(), Some(target.as_str()));

                let length: Weight = path.edges().map(|(a, b)| graph.edge(a, b).unwrap().prev_weight).sum();
                prop_assert_eq!(length, path.distance);
            }
        }
    }

    #[test]
    fn rounds_route_every_reachable_car(edges in edge_list(), lanes in 1..4usize, cars in 0..5usize, seed in any::<u64>()) {
        let graph = build(&edges, params(lanes, cars));
        let reachable = reference_distances(&graph, "0").contains_key("1");

        let outcome = RoundDriver::new(&graph, StdRng::seed_from_u64(seed)).drive().unwrap();

        prop_assert_eq!(outcome.paths.len(), lanes);
        prop_assert!(outcome.paths.iter().all(|lane| lane.len() == cars));
        prop_assert_eq!(outcome.stats.cars, lanes * cars);
        if reachable {
            prop_assert_eq!(outcome.stats.unreachable_cars, 0);
        } else {
            prop_assert_eq!(outcome.stats.unreachable_cars, lanes * cars);
            prop_assert!(outcome.paths.iter().flatten().all(|path| path.is_empty()));
        }
    }
}
