//! Benchmark log reading: file name classification, line probes, and the
//! two-pass ingest that fills a run store.

pub mod ingest;
pub mod name;
pub mod parse;

pub use ingest::{IngestReport, ingest_paths};
