//! DOI handling for bibtidy
//!
//! - DOI validation against the Crossref DOI grammar
//! - Cleanup of `doi:` prefixes and resolver URLs
//! - Resolver URL construction

pub mod doi;
pub mod resolver;

pub use doi::Doi;
pub use resolver::{doi_url, doi_url_with, DEFAULT_RESOLVER};
