//! Fetch third-party agent `.deb` packages through apt and repackage their
//! `/opt` payload as plain tarballs for a release builder.
//!
//! The library is split by pipeline stage; [`pipeline::Pipeline`] sequences
//! them. Every external command goes through [`process::CommandRunner`].

pub mod clean;
pub mod config;
pub mod download;
pub mod error;
pub mod extract;
pub mod naming;
pub mod pipeline;
pub mod preflight;
pub mod process;
pub mod repackage;
pub mod repo;
pub mod timing;

pub use config::Config;
pub use error::RepackError;
pub use pipeline::{Pipeline, PipelineFailure, RunReport, Stage};
