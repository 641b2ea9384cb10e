use crate::error::Result;
use crate::feed::{FeedReader, Table};
use crate::pipeline::{Pipeline, PipelineContext, RunContext, RunSummary};

/// Contract every epidemiology source implements: where its feed lives and
/// how a fetched table becomes canonical records.
pub trait EpidemiologyFetcher {
    /// Source code stored in every record, e.g. `WRD_ECDC`
    fn source(&self) -> &'static str;

    /// Endpoint used when the configuration does not override it
    fn default_url(&self) -> &'static str;

    /// Retrieve a snapshot of the feed
    fn fetch(&self, reader: &dyn FeedReader, url: &str) -> Result<Table> {
        reader.fetch(url)
    }

    /// Turn the snapshot into records, emitting each through `ctx`
    fn normalize(&self, table: &Table, ctx: &mut RunContext<'_>) -> Result<()>;

    /// Fetch, normalize and upsert in one go
    fn run(&self, ctx: &PipelineContext<'_>) -> Result<RunSummary> {
        Pipeline::run_source(self, ctx)
    }
}
