use std::fmt::Write as _;
use std::path::PathBuf;

use anyhow::{Context, Result};
use serde::Serialize;
use time::OffsetDateTime;
use time::format_description::well_known::Rfc3339;

use dispatch_core::models::{CompletionRecord, TaskStatus};
use dispatch_core::orchestration::BatchSummary;

pub struct BatchReport {
    pub started_at: OffsetDateTime,
    pub data_dir: PathBuf,
    pub max_in_flight: usize,
    pub summary: BatchSummary,
    pub counter_total: u64,
    pub completions: Vec<CompletionRecord>,
}

#[derive(Serialize)]
struct JsonReport<'a> {
    started_at: String,
    data_dir: &'a PathBuf,
    max_in_flight: usize,
    summary: &'a BatchSummary,
    counter_total: u64,
    completions: &'a [CompletionRecord],
}

impl BatchReport {
    pub fn to_json(&self) -> Result<String> {
        let report = JsonReport {
            started_at: self.started_at_rfc3339()?,
            data_dir: &self.data_dir,
            max_in_flight: self.max_in_flight,
            summary: &self.summary,
            counter_total: self.counter_total,
            completions: &self.completions,
        };
        serde_json::to_string_pretty(&report).context("serialize report")
    }

    pub fn to_text(&self) -> Result<String> {
        let summary = &self.summary;
        let mut out = String::new();
        writeln!(
            out,
            "batch: started={} data_dir={} max_in_flight={}",
            self.started_at_rfc3339()?,
            self.data_dir.display(),
            self.max_in_flight
        )?;
        writeln!(
            out,
            "batch: total={} succeeded={} failed={} unrecognized={}",
            summary.total,
            summary.succeeded(),
            summary.failed,
            summary.unrecognized
        )?;
        writeln!(
            out,
            "ledgers: integrals={} derivatives={} theses={}",
            summary.integrals, summary.derivatives, summary.theses
        )?;
        writeln!(
            out,
            "counter: words_added={} total={}",
            summary.words_added, self.counter_total
        )?;

        let mut completions: Vec<_> = self.completions.iter().collect();
        completions.sort_by_key(|record| record.task_id);
        for record in completions {
            let status = match record.status {
                TaskStatus::Succeeded => "ok",
                TaskStatus::Failed => "FAIL",
            };
            writeln!(
                out,
                "[{status:>4}] #{} {:.4}s {}",
                record.task_id.0,
                record.elapsed_secs(),
                record.message
            )?;
        }
        Ok(out)
    }

    fn started_at_rfc3339(&self) -> Result<String> {
        self.started_at
            .format(&Rfc3339)
            .context("format start timestamp")
    }
}
