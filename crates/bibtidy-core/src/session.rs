//! The loaded tables plus the operations run against a host buffer
//!
//! A [`Session`] is built once and never mutated, so it can be shared through
//! an `Arc` and driven from any thread.

use std::sync::Arc;
use thiserror::Error;
use tokio::task::JoinHandle;

use bibtidy_bibtex::NormalizedEntry;
use bibtidy_identifiers::Doi;

use crate::fetch::{DoiFetcher, FetchError};
use crate::host::{DoiSource, TextBuffer};
use crate::operations::{sort_document, OperationError, Pipeline, Report};
use crate::settings::{AbbreviationConfig, ConfigError, Settings};

/// The three editor commands
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    Format,
    Sort,
    Fetch,
}

/// Result of a fetch that did not fail
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchOutcome {
    Fetched {
        doi: Doi,
        entry: NormalizedEntry,
        /// Serialized entry
        text: String,
    },
    /// The source did not hold a DOI; nothing was requested
    InvalidDoi(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Formatted(Report),
    Sorted(Report),
    Fetched(FetchOutcome),
}

#[derive(Error, Debug)]
pub enum CommandError {
    #[error(transparent)]
    Operation(#[from] OperationError),
    #[error(transparent)]
    Fetch(#[from] FetchError),
}

#[derive(Debug)]
pub struct Session {
    pipeline: Pipeline,
    fetcher: DoiFetcher,
}

impl Session {
    pub fn new(settings: &Settings, abbreviations: &AbbreviationConfig) -> Result<Self, ConfigError> {
        let pipeline = Pipeline::new(settings, abbreviations.build())?;
        let fetcher = DoiFetcher::new(&settings.fetch)?;
        tracing::debug!(
            "Session ready with {} abbreviation rules",
            pipeline.abbreviations().len()
        );
        Ok(Self::from_parts(pipeline, fetcher))
    }

    pub fn from_parts(pipeline: Pipeline, fetcher: DoiFetcher) -> Self {
        Self { pipeline, fetcher }
    }

    /// Format the whole buffer. On error the buffer is left untouched.
    pub fn format(&self, buffer: &mut dyn TextBuffer) -> Result<Report, OperationError> {
        let report = self.pipeline.format_document(&buffer.contents())?;
        buffer.replace_all(&report.output);
        Ok(report)
    }

    /// Sort the whole buffer. On error the buffer is left untouched.
    pub fn sort(&self, buffer: &mut dyn TextBuffer) -> Result<Report, OperationError> {
        let report = sort_document(&buffer.contents())?;
        buffer.replace_all(&report.output);
        Ok(report)
    }

    /// Read a DOI from `source`, fetch its record and normalize it
    pub async fn fetch<S>(&self, source: &S) -> Result<FetchOutcome, FetchError>
    where
        S: DoiSource + ?Sized,
    {
        let input = source.read_doi().unwrap_or_default();
        let input = input.trim();

        let Some(doi) = Doi::parse(input) else {
            tracing::info!("No valid DOI in {:?}", input);
            return Ok(FetchOutcome::InvalidDoi(input.to_string()));
        };

        let record = self.fetcher.fetch(&doi).await?;
        let entry = self.pipeline.fetched_entry(&record, &doi)?;
        let text = self.pipeline.serialize(&entry);

        Ok(FetchOutcome::Fetched { doi, entry, text })
    }

    /// Fetch and insert the entry at the buffer's cursor
    pub async fn fetch_into<S>(
        &self,
        buffer: &mut dyn TextBuffer,
        source: &S,
    ) -> Result<FetchOutcome, FetchError>
    where
        S: DoiSource + ?Sized,
    {
        let outcome = self.fetch(source).await?;
        if let FetchOutcome::Fetched { text, .. } = &outcome {
            let cursor = buffer.cursor();
            buffer.insert(cursor, text);
        }
        Ok(outcome)
    }

    /// Run a fetch as a tokio task; the handle resolves when it completes
    pub fn spawn_fetch(self: &Arc<Self>, input: String) -> JoinHandle<Result<FetchOutcome, FetchError>> {
        let session = Arc::clone(self);
        tokio::spawn(async move { session.fetch(input.as_str()).await })
    }

    /// Run one operation against the host services
    pub async fn run<S>(
        &self,
        operation: Operation,
        buffer: &mut dyn TextBuffer,
        source: &S,
    ) -> Result<Outcome, CommandError>
    where
        S: DoiSource + ?Sized,
    {
        tracing::debug!("Running {:?}", operation);
        let outcome = match operation {
            Operation::Format => Outcome::Formatted(self.format(buffer)?),
            Operation::Sort => Outcome::Sorted(self.sort(buffer)?),
            Operation::Fetch => Outcome::Fetched(self.fetch_into(buffer, source).await?),
        };
        Ok(outcome)
    }
}
