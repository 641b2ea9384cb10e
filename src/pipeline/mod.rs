// Source pipeline: fetch, normalize, aggregate, upsert

pub mod accumulator;
pub mod runner;

pub use accumulator::{CumulativeAccumulator, Totals};
pub use runner::{Pipeline, PipelineContext, RunContext, RunSummary};
