//! Traffic congestion simulation on road networks.
//!
//! Cars repeatedly route from an origin to a destination, every car slows down
//! the roads it uses and the next round routes on the slowed down network.
//! Many independent experiments run through a concurrent pipeline.

#[macro_use]
pub mod report;
pub mod algo;
pub mod cli;
pub mod datastr;
pub mod error;
pub mod experiments;
pub mod io;
pub mod topology;

pub use error::{Error, Result};
