//! Responsible for the logging of statistics.
mod statistic_logging;

pub use statistic_logging::*;
