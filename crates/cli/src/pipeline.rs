//! URL-by-URL extraction run.
//!
//! Each URL is resolved, extracted and written before the next one starts.
//! Only output write failures stop the run.

use std::io::{self, Write};

use sitegrab_client::{FetchOrchestrator, Fetcher, QueryEngine, Template};

/// Counts reported at the end of a run.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct Summary {
    pub processed: usize,
    pub matched: usize,
    /// URLs outside the template's pattern.
    pub no_match: usize,
    /// URLs that could not be fetched or parsed.
    pub failed: usize,
}

pub struct Pipeline<F, E: QueryEngine> {
    orchestrator: FetchOrchestrator<F, E>,
    template: Template<E>,
}

impl<F, E> Pipeline<F, E>
where
    F: Fetcher,
    E: QueryEngine,
{
    pub fn new(orchestrator: FetchOrchestrator<F, E>, template: Template<E>) -> Self {
        Self { orchestrator, template }
    }

    /// Write the header row, then one row per matching, resolvable URL.
    pub async fn run<W: Write>(&self, urls: &[String], out: &mut W) -> io::Result<Summary> {
        let mut summary = Summary::default();
        write_row(out, &self.template.header())?;

        for url in urls {
            summary.processed += 1;

            if !self.template.matches(url) {
                tracing::info!(url = %url, template = self.template.name(), "URL does not match template");
                summary.no_match += 1;
                continue;
            }

            let Some(resolved) = self.orchestrator.resolve(url).await else {
                summary.failed += 1;
                continue;
            };
            tracing::debug!(url = %url, source = ?resolved.source, "document resolved");

            match self.template.apply(url, &resolved.document) {
                Some(row) => {
                    write_row(out, &row)?;
                    summary.matched += 1;
                }
                None => summary.no_match += 1,
            }
        }

        Ok(summary)
    }
}

fn write_row<W: Write>(out: &mut W, fields: &[String]) -> io::Result<()> {
    writeln!(out, "{}", fields.join("\t"))
}
