//! Utilities for writing simulation results to and reading them from disk.
//!
//! Results are stored as JSON. Anything serde can handle gets `write_to` and `load_from`
//! through the `Store` and `Load` traits.
//!
//! # Example
//!
//! ```no_run
//! # use traffic_congestion::io::*;
//! # use traffic_congestion::datastr::graph::Snapshot;
//!
//! let snapshot = Snapshot::load_from("data/tmp_0_city_cars_250_threads_4_size_10.json")?;
//! snapshot.write_to(&"copy.json")?;
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

use std::{
    fs::{create_dir_all, File},
    io::{BufReader, BufWriter, Write},
    path::{Path, PathBuf},
};

use serde::{de::DeserializeOwned, Serialize};

use crate::{datastr::graph::Snapshot, error::Result, experiments::Experiment};

/// Serialize an object to a JSON file.
pub trait Store {
    fn write_to(&self, path: &dyn AsRef<Path>) -> Result<()>;
}

impl<T: Serialize + ?Sized> Store for T {
    fn write_to(&self, path: &dyn AsRef<Path>) -> Result<()> {
        let mut writer = BufWriter::new(File::create(path)?);
        serde_json::to_writer(&mut writer, self)?;
        writer.flush()?;
        Ok(())
    }
}

/// Deserialize an object from a JSON file.
pub trait Load: Sized {
    fn load_from<P: AsRef<Path>>(path: P) -> Result<Self>;
}

impl<T: DeserializeOwned> Load for T {
    fn load_from<P: AsRef<Path>>(path: P) -> Result<Self> {
        let reader = BufReader::new(File::open(path)?);
        Ok(serde_json::from_reader(reader)?)
    }
}

/// `{prefix}_{id}_{kind}_cars_{cars per lane}_threads_{lanes}_size_{vertex count}.json`
pub fn snapshot_file_name(prefix: &str, experiment: &Experiment) -> String {
    let params = experiment.params();
    format!(
        "{}_{}_{}_cars_{}_threads_{}_size_{}.json",
        prefix,
        experiment.id(),
        experiment.kind(),
        params.cars_per_lane(),
        params.lanes(),
        experiment.graph().num_vertices()
    )
}

/// Write the settled weights of `experiment` into `dir`, creating it if necessary.
/// Returns the path of the written file.
pub fn write_snapshot(dir: &Path, prefix: &str, experiment: &Experiment) -> Result<PathBuf> {
    create_dir_all(dir)?;
    let path = dir.join(snapshot_file_name(prefix, experiment));
    experiment.snapshot().write_to(&path)?;
    Ok(path)
}

pub fn read_snapshot(path: &Path) -> Result<Snapshot> {
    Snapshot::load_from(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{datastr::graph::*, error::Error, topology::*};
    use rand::{rngs::StdRng, SeedableRng};

    fn scratch_dir(name: &str) -> PathBuf {
        std::env::temp_dir().join(format!("traffic_congestion_io_{}_{}", name, std::process::id()))
    }

    fn simulated() -> Experiment {
        let params = SimulationParams::new(1, 3, 2, 1.0, "0", "1").unwrap();
        let spec = TopologySpec::new(TopologyKind::Complete, 4).unwrap();
        generate_experiment(spec, 7, params, StdRng::seed_from_u64(7)).unwrap().simulate().unwrap()
    }

    #[test]
    fn file_name_describes_the_experiment() {
        let params = SimulationParams::new(1, 250, 4, 1.0, "0", "1").unwrap();
        let spec = TopologySpec::new(TopologyKind::City, 10).unwrap();
        let experiment = generate_experiment(spec, 3, params, StdRng::seed_from_u64(0)).unwrap();
        assert_eq!(snapshot_file_name("tmp", &experiment), "tmp_3_city_cars_250_threads_4_size_10.json");
    }

    #[test]
    fn snapshots_survive_the_disk() {
        let dir = scratch_dir("roundtrip").join("nested");
        let experiment = simulated();

        let path = write_snapshot(&dir, "test", &experiment).unwrap();
        assert!(path.starts_with(&dir));
        assert_eq!(read_snapshot(&path).unwrap(), experiment.snapshot());

        // all six cars took the direct road
        assert_eq!(read_snapshot(&path).unwrap().get("1", "0"), Some(7.0));

        std::fs::remove_dir_all(scratch_dir("roundtrip")).unwrap();
    }

    #[test]
    fn json_layout_is_nested_maps() {
        let graph = WeightedGraph::new(SimulationParams::new(0, 0, 1, 0.0, "a", "b").unwrap());
        graph.add_edges("a", "b", 2.5);
        let json = serde_json::to_string(&graph.snapshot()).unwrap();
        assert_eq!(json, r#"{"a":{"b":2.5},"b":{"a":2.5}}"#);
    }

    #[test]
    fn missing_file_is_an_io_error() {
        let result = read_snapshot(&scratch_dir("missing").join("nothing.json"));
        assert!(matches!(result, Err(Error::Io(_))));
    }
}
