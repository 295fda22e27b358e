//! Resolver URLs for DOIs

use crate::doi::Doi;

/// Public DOI resolver
pub const DEFAULT_RESOLVER: &str = "https://doi.org/";

/// Get the canonical resolver URL for a DOI
pub fn doi_url(doi: &Doi) -> String {
    doi_url_with(DEFAULT_RESOLVER, doi)
}

/// Get the URL for a DOI under a custom resolver base
pub fn doi_url_with(base: &str, doi: &Doi) -> String {
    format!("{}/{}", base.trim_end_matches('/'), doi)
}
