//! Ranked LEO handover candidate pools from TLE data.
//!
//! Stages run strictly forward: [`tle`] → [`propagate`] → [`geometry`] →
//! [`visibility`] → [`scoring`] / [`signal`] → [`events`] → ranking, driven by
//! [`pipeline::Pipeline`].

pub mod config;
pub mod events;
pub mod geometry;
pub mod pipeline;
pub mod propagate;
pub mod scoring;
pub mod signal;
pub mod tle;
pub mod visibility;

#[cfg(test)]
pub(crate) mod testing;

pub use config::{ConfigError, RunConfig};
pub use pipeline::{Pipeline, PipelineError, PipelineInput, RunOutput};
