//! Extraction layer: parsed documents in, index entities out.

mod document;
mod links;

pub use document::{ExtractedDocument, extract_document};
