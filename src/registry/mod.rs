//! Function registry: data model and the pipeline that fills it.
//!
//! A run goes selector -> [`dispatch`] (parallel extraction) -> [`aggregate`]
//! -> optional [`callgraph`] -> summary. [`Runner`] wires the phases
//! together.

pub mod aggregate;
pub mod callgraph;
pub mod dispatch;
mod runner;
mod types;

pub use aggregate::Aggregator;
pub use callgraph::CallGraph;
pub use dispatch::{dispatch, Progress};
pub use runner::Runner;
pub use types::{base_name, CallSite, FileExtraction, Function, Registry, Summary, Visibility};
