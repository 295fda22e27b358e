//! bibtidy core
//!
//! Settings, DOI lookups and the document operations (Format, Sort, Fetch)
//! built on `bibtidy-bibtex` and `bibtidy-identifiers`.

pub mod fetch;
pub mod host;
pub mod http;
pub mod operations;
pub mod record;
pub mod session;
pub mod settings;

pub use fetch::{ApsExport, DoiFetcher, ExportRewrite, FetchError, BIBTEX_ACCEPT};
pub use host::{DoiSource, StringBuffer, TextBuffer};
pub use http::{HttpClient, HttpError, HttpResponse};
pub use operations::{sort_document, Duplicate, OperationError, Pipeline, Report};
pub use record::FetchedRecord;
pub use session::{CommandError, FetchOutcome, Operation, Outcome, Session};
pub use settings::{AbbreviationConfig, ConfigError, FetchSettings, Settings};

// Re-export the lower layers for hosts
pub use bibtidy_bibtex as bibtex;
pub use bibtidy_identifiers as identifiers;
