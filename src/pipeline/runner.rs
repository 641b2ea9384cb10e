use crate::apis::base::EpidemiologyFetcher;
use crate::error::Result;
use crate::feed::FeedReader;
use crate::metrics::PipelineMetrics;
use crate::region::RegionResolver;
use crate::storage::UpsertSink;
use crate::types::{AdmDivision, CanonicalRecord, UpsertOutcome};
use serde::Serialize;
use std::collections::HashMap;
use std::time::Instant;
use tracing::{debug, error, info, info_span, warn};
use uuid::Uuid;

/// Collaborators a source run needs.
pub struct PipelineContext<'a> {
    pub reader: &'a dyn FeedReader,
    pub resolver: &'a dyn RegionResolver,
    pub sink: &'a dyn UpsertSink,
    /// Overrides the fetcher's default endpoint
    pub feed_url: Option<&'a str>,
}

/// Result of a complete source run
#[derive(Debug, Clone, Default, Serialize)]
pub struct RunSummary {
    pub run_id: Uuid,
    pub source: String,
    pub feed_url: String,
    pub rows_read: usize,
    pub records_emitted: usize,
    pub inserted: usize,
    pub updated: usize,
    pub unchanged: usize,
    pub rows_skipped: usize,
    pub records_degraded: usize,
    pub duration_secs: f64,
}

/// Per-run state handed to a fetcher's `normalize`. Every emitted record
/// goes straight to the sink.
pub struct RunContext<'a> {
    source: &'static str,
    resolver: &'a dyn RegionResolver,
    sink: &'a dyn UpsertSink,
    regions: HashMap<String, Option<AdmDivision>>,
    summary: RunSummary,
}

impl<'a> RunContext<'a> {
    pub fn new(
        source: &'static str,
        resolver: &'a dyn RegionResolver,
        sink: &'a dyn UpsertSink,
    ) -> Self {
        Self {
            source,
            resolver,
            sink,
            regions: HashMap::new(),
            summary: RunSummary {
                source: source.to_string(),
                ..RunSummary::default()
            },
        }
    }

    pub fn emit(&mut self, record: &CanonicalRecord) -> Result<UpsertOutcome> {
        let outcome = self.sink.upsert(record)?;
        self.summary.records_emitted += 1;
        match outcome {
            UpsertOutcome::Inserted => self.summary.inserted += 1,
            UpsertOutcome::Updated => self.summary.updated += 1,
            UpsertOutcome::Unchanged => self.summary.unchanged += 1,
        }
        PipelineMetrics::record_upserted(self.source, outcome);
        Ok(outcome)
    }

    /// Resolve a country code, once per code per run. The first lookup of a
    /// code without a division or without a gid is logged.
    pub fn resolve(&mut self, countrycode: &str) -> Result<Option<AdmDivision>> {
        if let Some(cached) = self.regions.get(countrycode) {
            return Ok(cached.clone());
        }
        let division = self.resolver.resolve(countrycode)?;
        match &division {
            None => warn!(
                source = self.source,
                "No administrative division for: {}", countrycode
            ),
            Some(d) if d.gid.is_none() => {
                warn!(source = self.source, "No GID for: {}", countrycode)
            }
            Some(_) => {}
        }
        self.regions.insert(countrycode.to_string(), division.clone());
        Ok(division)
    }

    /// Row dropped without contributing to any record.
    pub fn skip_row(&mut self, line: usize, reason: &str) {
        warn!(source = self.source, line, "Skipping row: {}", reason);
        self.summary.rows_skipped += 1;
        PipelineMetrics::row_skipped(self.source);
    }

    /// Record emitted with best-effort region data.
    pub fn mark_degraded(&mut self) {
        self.summary.records_degraded += 1;
        PipelineMetrics::record_degraded(self.source);
    }

    pub fn summary(&self) -> &RunSummary {
        &self.summary
    }

    fn into_summary(self) -> RunSummary {
        self.summary
    }
}

pub struct Pipeline;

impl Pipeline {
    /// Fetch, normalize and upsert one source.
    pub fn run_source<F: EpidemiologyFetcher + ?Sized>(
        fetcher: &F,
        ctx: &PipelineContext<'_>,
    ) -> Result<RunSummary> {
        let source = fetcher.source();
        let run_id = Uuid::new_v4();
        let span = info_span!("source_run", source, %run_id);
        let _enter = span.enter();

        PipelineMetrics::run_started(source);
        let result = Self::run_inner(fetcher, ctx, run_id);
        if let Err(e) = &result {
            error!("Pipeline failed: {}", e);
            PipelineMetrics::run_failed(source);
        }
        result
    }

    fn run_inner<F: EpidemiologyFetcher + ?Sized>(
        fetcher: &F,
        ctx: &PipelineContext<'_>,
        run_id: Uuid,
    ) -> Result<RunSummary> {
        let source = fetcher.source();
        let feed_url = ctx.feed_url.unwrap_or_else(|| fetcher.default_url());
        let t_pipeline = Instant::now();

        info!("Fetching {} from {}", source, feed_url);
        let t_fetch = Instant::now();
        let table = fetcher.fetch(ctx.reader, feed_url)?;
        PipelineMetrics::fetch_completed(source, table.len(), t_fetch.elapsed().as_secs_f64());
        debug!("Columns: {:?}", table.columns);

        let mut run = RunContext::new(source, ctx.resolver, ctx.sink);
        fetcher.normalize(&table, &mut run)?;

        let mut summary = run.into_summary();
        summary.run_id = run_id;
        summary.feed_url = feed_url.to_string();
        summary.rows_read = table.len();
        summary.duration_secs = t_pipeline.elapsed().as_secs_f64();
        PipelineMetrics::run_completed(source, summary.duration_secs);

        info!(
            "Emitted {} records ({} inserted, {} updated, {} unchanged), {} rows skipped, {} degraded",
            summary.records_emitted,
            summary.inserted,
            summary.updated,
            summary.unchanged,
            summary.rows_skipped,
            summary.records_degraded
        );
        Ok(summary)
    }
}
