//! Snapshot tests for formatted output
//!
//! Uses insta crate to detect unexpected output changes

mod common;

use bibtidy_core::{sort_document, AbbreviationConfig, Pipeline, Settings};
use common::fixtures::load_bibtex_fixture;
use insta::assert_snapshot;

fn pipeline() -> Pipeline {
    Pipeline::new(&Settings::default(), AbbreviationConfig::default().build()).unwrap()
}

#[test]
fn test_format_library() {
    let text = load_bibtex_fixture("library.bib");
    let report = pipeline().format_document(&text).unwrap();
    assert_snapshot!("format_library", report.output);
}

#[test]
fn test_sort_library() {
    let text = load_bibtex_fixture("library.bib");
    let report = sort_document(&text).unwrap();
    assert_snapshot!("sort_library", report.output);
}
