//! Utility module for command line interfaces

use std::{error::Error, fmt, fmt::Display};

/// An error struct to wrap simple static error messages
#[derive(Debug)]
pub struct CliErr(pub &'static str);

impl Display for CliErr {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.0)
    }
}

impl Error for CliErr {}

/// Split `total` cars evenly over `lanes`. The remainder stays at home.
pub fn cars_per_lane(total: usize, lanes: usize) -> Result<usize, CliErr> {
    total.checked_div(lanes).ok_or(CliErr("need at least one thread"))
}
