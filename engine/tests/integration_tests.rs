use rand::{rngs::StdRng, SeedableRng};
use std::{collections::BTreeMap, path::PathBuf};
use traffic_congestion::{
    algo::{dijkstra::PathFinder, rounds::RoundDriver, Query},
    datastr::graph::*,
    experiments::{cancel::CancellationToken, experiment_rng, pipeline::ExperimentPipeline, PipelineConfig},
    io::{read_snapshot, write_snapshot},
    topology::*,
    Error,
};

fn graph(params: SimulationParams) -> WeightedGraph {
    // Two routes from 0 to 3 of equal length and a long detour over 4.
    //
    //          1        1
    //     0 ------ 1 ------ 3
    //     |                 |
    //   1 |                 | 1
    //     |        1        |
    //     +------- 2 -------+
    //     |                 |
    //   5 |                 | 5
    //     +------- 4 -------+
    //
    let graph = WeightedGraph::new(params);
    graph.add_edges("0", "1", 1.0);
    graph.add_edges("1", "3", 1.0);
    graph.add_edges("0", "2", 1.0);
    graph.add_edges("2", "3", 1.0);
    graph.add_edges("0", "4", 5.0);
    graph.add_edges("4", "3", 5.0);
    graph
}

fn scratch_dir(name: &str) -> PathBuf {
    std::env::temp_dir().join(format!("traffic_congestion_it_{}_{}", name, std::process::id()))
}

#[test]
fn congestion_spreads_cars_over_both_routes() {
    let params = SimulationParams::new(1, 20, 4, 1.0, "0", "3").unwrap();
    let graph = graph(params);

    let outcome = RoundDriver::new(&graph, StdRng::seed_from_u64(5)).drive().unwrap();
    assert_eq!(outcome.paths.len(), 4);
    assert!(outcome.distances.iter().flatten().all(|&d| d == 2.0));

    // 80 cars choose randomly between two equal routes, both get some
    let snapshot = graph.snapshot();
    let upper = snapshot.get("0", "1").unwrap() - 1.0;
    let lower = snapshot.get("0", "2").unwrap() - 1.0;
    assert_eq!(upper + lower, 80.0);
    assert!(upper > 0.0 && lower > 0.0);
    assert_eq!(snapshot.get("1", "3").unwrap(), snapshot.get("0", "1").unwrap());
    assert_eq!(snapshot.get("0", "4"), Some(FREE_FLOW_WEIGHT));

    // the detour decayed to free flow and is now the only shortest route
    let outcome = RoundDriver::new(&graph, StdRng::seed_from_u64(6)).drive().unwrap();
    assert!(outcome.distances.iter().flatten().all(|&d| d == 2.0));
    assert!(outcome.paths.iter().flatten().all(|path| path.vertices == ["0", "4", "3"]));
    assert_eq!(graph.snapshot().get("0", "1"), Some(FREE_FLOW_WEIGHT));
}

#[test]
fn finder_sees_rounds_settle() {
    let params = SimulationParams::new(3, 1, 1, 10.0, "0", "3").unwrap();
    let graph = graph(params);
    let mut driver = RoundDriver::new(&graph, StdRng::seed_from_u64(1));

    let stats = driver.simulate().unwrap();
    assert_eq!(stats.len(), 3);
    // a single car always finds some route which decayed back to free flow
    assert_eq!(stats[0].mean_distance, Some(2.0));
    assert_eq!(stats[1].mean_distance, Some(2.0));
    assert_eq!(stats[2].mean_distance, Some(2.0));

    let path = PathFinder::new(&graph, StdRng::seed_from_u64(0)).query(Query { from: "0", to: "3" }).unwrap();
    assert_eq!(path.distance, 2.0);
}

#[test]
fn pipeline_writes_one_snapshot_per_experiment() {
    let dir = scratch_dir("pipeline");
    let params = SimulationParams::new(5, 10, 2, 1.0, "0", "1").unwrap();
    let spec = TopologySpec::new(TopologyKind::City, 12).unwrap();
    let pipeline = ExperimentPipeline::new(PipelineConfig::new(8, 3, 11).unwrap(), CancellationToken::new());

    let mut written = BTreeMap::new();
    let summary = pipeline
        .run(
            |id| generate_experiment(spec, id, params.clone(), experiment_rng(11, id)),
            |experiment| {
                let path = write_snapshot(&dir, "it", &experiment)?;
                written.insert(experiment.id(), (path, experiment.snapshot()));
                Ok(())
            },
        )
        .unwrap();

    assert_eq!(summary.delivered, 8);
    assert_eq!(written.len(), 8);
    for (id, (path, snapshot)) in &written {
        let file_name = path.file_name().unwrap().to_str().unwrap().to_string();
        assert_eq!(file_name, format!("it_{}_city_cars_10_threads_2_size_12.json", id));
        assert_eq!(&read_snapshot(path).unwrap(), snapshot);
    }

    std::fs::remove_dir_all(&dir).unwrap();
}

#[test]
fn seeded_pipelines_are_reproducible() {
    let params = SimulationParams::new(4, 6, 3, 1.0, "0", "5").unwrap();
    let spec = TopologySpec::new(TopologyKind::City, 15).unwrap();

    let run = || {
        let mut snapshots = BTreeMap::new();
        ExperimentPipeline::new(PipelineConfig::new(6, 4, 99).unwrap(), CancellationToken::new())
            .run(
                |id| generate_experiment(spec, id, params.clone(), experiment_rng(99, id)),
                |experiment| {
                    snapshots.insert(experiment.id(), experiment.snapshot());
                    Ok(())
                },
            )
            .unwrap();
        snapshots
    };

    assert_eq!(run(), run());
}

#[test]
fn unknown_kind_fails_before_any_work() {
    let err = "highway".parse::<TopologyKind>().unwrap_err();
    assert!(matches!(err, Error::UnknownTopology(_)));
}

#[test]
fn complete_graph_pipeline() {
    let params = SimulationParams::new(2, 5, 2, 0.5, "0", "1").unwrap();
    let spec = TopologySpec::new(TopologyKind::Complete, 6).unwrap();
    let mut vertices = Vec::new();

    ExperimentPipeline::new(PipelineConfig::new(3, 2, 1).unwrap(), CancellationToken::new())
        .run(
            |id| generate_experiment(spec, id, params.clone(), experiment_rng(1, id)),
            |experiment| {
                assert_eq!(experiment.rounds_completed(), 2);
                assert_eq!(experiment.graph().num_edges(), 15);
                vertices.push(experiment.graph().num_vertices());
                Ok(())
            },
        )
        .unwrap();

    assert_eq!(vertices, vec![6, 6, 6]);
}
