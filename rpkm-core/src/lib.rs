#![deny(warnings)]
#![allow(dead_code)]

#[cfg(test)]
#[macro_use]
extern crate lazy_static;

mod error;
mod ingest;
mod models;
mod correlate;
mod discover;
mod aggregate;
mod annotate;
mod export;
mod pipeline;

pub use error::{Error, Result};
pub use ingest::{
    normalize_orf_id, AggregateTable, AggregateTableRow, AnnotationRecord, AnnotationTable, GeneReadings,
    PathwayColumns, PathwayFile, PathwayRecord, PathwaySelection,
};
pub use models::{AggregatedPathway, PathwaySum};
pub use correlate::{correlate, parse_reading, Correlation, ReadingLookup};
pub use discover::{classify, discover, Discovery, FileKind, MissingCompanion, SampleFiles, Suffixes};
pub use aggregate::{AggregateSummary, Aggregator, PathwayRow, SampleStats};
pub use annotate::{annotate_sample, AnnotatedRow, JoinStats};
pub use export::{
    stats_path_for, TableExporter, write_aggregate_table, write_annotated_rows, write_correlation,
    write_sample_stats,
};
pub use pipeline::{
    correlate_files, run_annotate, run_batch, run_correlate, AnnotateReport, BatchConfig, BatchReport,
};

/// The character used to separate columns when the caller does not choose one.
pub const DEFAULT_DELIMITER: u8 = b'\t';
