use std::path::Path;

use log::{info, warn};

use crate::export::write_to_path;
use crate::{
    annotate_sample, correlate, discover, stats_path_for, write_aggregate_table,
    write_annotated_rows, write_correlation, write_sample_stats, AggregateSummary, Aggregator,
    AnnotationTable, Correlation, Discovery, Error, GeneReadings, JoinStats, PathwayFile,
    PathwaySelection, ReadingLookup, Result, Suffixes, DEFAULT_DELIMITER,
};

/// Settings shared by the correlate, batch and annotate runs.
#[derive(Debug, Clone, PartialEq)]
pub struct BatchConfig {
    pub delimiter: u8,
    pub suffixes: Suffixes,
    /// Average only over samples (or pathways) with a non-zero sum.
    pub exclude_zeroes: bool,
    /// Write per-sample statistics to their own file instead of a table footer.
    pub separate_stats: bool,
    /// Limits the annotation report to these pathways.
    pub selection: Option<PathwaySelection>,
}

impl Default for BatchConfig {
    fn default() -> Self {
        BatchConfig {
            delimiter: DEFAULT_DELIMITER,
            suffixes: Suffixes::default(),
            exclude_zeroes: false,
            separate_stats: false,
            selection: None,
        }
    }
}

/// Loads one sample's pathway and RPKM files and sums each pathway.
pub fn correlate_files(pathway_path: &Path, reading_path: &Path, delimiter: u8) -> Result<Correlation> {
    let pathways = PathwayFile::load(pathway_path, delimiter)?;
    info!("Loaded sample data for {} from {}", pathways.sample, pathway_path.display());

    let readings = GeneReadings::load(reading_path, &pathways.sample, delimiter)?;
    info!("Loaded RPKM data for {} from {}", readings.sample, reading_path.display());

    let correlation = correlate(&pathways.sample, &pathways.pathways, &readings.readings)?;
    if correlation.missing_count() > 0 {
        warn!("{}: {} pathway ORFs have no RPKM data point",
            correlation.sample, correlation.missing_count());
    }
    if correlation.unreferenced_count() > 0 {
        warn!("{}: {} RPKM data points are not in any pathway",
            correlation.sample, correlation.unreferenced_count());
    }
    Ok(correlation)
}

/// Correlates a single sample and writes its pathway sums to `output`.
pub fn run_correlate(
    pathway_path: &Path,
    reading_path: &Path,
    output: &Path,
    delimiter: u8,
) -> Result<Correlation> {
    let correlation = correlate_files(pathway_path, reading_path, delimiter)?;
    write_to_path(output, |writer| write_correlation(writer, &correlation, delimiter))?;
    info!("Correlated data for {} output to {}", correlation.sample, output.display());
    Ok(correlation)
}

#[derive(Debug, Clone, PartialEq)]
pub struct BatchReport {
    pub discovery: Discovery,
    pub summary: AggregateSummary,
    /// Pathway ORFs without a reading, over every sample.
    pub missing_readings: usize,
    /// Readings no pathway refers to, over every sample.
    pub unreferenced_readings: usize,
}

/// Correlates every sample found in `dir` and writes the pathway by sample table.
pub fn run_batch(dir: &Path, output: &Path, config: &BatchConfig) -> Result<BatchReport> {
    let suffixes = Suffixes { annotation: None, ..config.suffixes.clone() };
    let discovery = discover(dir, &suffixes)?;

    let mut aggregator = Aggregator::new();
    let mut missing_readings = 0;
    let mut unreferenced_readings = 0;
    for files in &discovery.samples {
        let correlation = correlate_files(&files.pathway, &files.reading, config.delimiter)?;
        missing_readings += correlation.missing_count();
        unreferenced_readings += correlation.unreferenced_count();
        aggregator.fold_correlation(&correlation);
        info!("Loaded data for sample: {}", correlation.sample);
    }

    let summary = aggregator.summarize(config.exclude_zeroes);
    write_to_path(output, |writer| {
        write_aggregate_table(writer, &summary, config.delimiter, !config.separate_stats)
    })?;
    info!("Wrote {} pathways across {} samples to {}",
        summary.rows.len(), summary.samples.len(), output.display());

    if config.separate_stats {
        let stats_path = stats_path_for(output);
        write_to_path(&stats_path, |writer| {
            write_sample_stats(writer, &summary.sample_stats, config.delimiter)
        })?;
        info!("Wrote per-sample statistics to {}", stats_path.display());
    }

    if !discovery.missing.is_empty() {
        warn!("Skipped {} samples with missing companion files", discovery.missing.len());
    }

    Ok(BatchReport { discovery, summary, missing_readings, unreferenced_readings })
}

#[derive(Debug, Clone, PartialEq)]
pub struct AnnotateReport {
    pub discovery: Discovery,
    pub stats: JoinStats,
}

/// Joins pathway membership, RPKM readings and annotations for every sample
/// in `dir` and writes one row per (sample, pathway, ORF).
pub fn run_annotate(dir: &Path, output: &Path, config: &BatchConfig) -> Result<AnnotateReport> {
    let mut suffixes = config.suffixes.clone();
    if suffixes.annotation.is_none() {
        suffixes.annotation = Some(Suffixes::DEFAULT_ANNOTATION.to_string());
    }
    let discovery = discover(dir, &suffixes)?;

    match &config.selection {
        Some(selection) if !selection.is_empty() => info!("Looking at {} pathways total.", selection.len()),
        Some(_) => warn!("Pathway selection is empty, writing every pathway"),
        None => {}
    }

    let mut rows = Vec::new();
    let mut total = JoinStats::default();
    for files in &discovery.samples {
        // Discovery pairs every sample with an annotation file once the suffix is set.
        let annotation_path = files.annotation.as_deref().ok_or_else(|| {
            Error::format(files.pathway.display().to_string(), "no annotation file paired with this pathway file")
        })?;
        let pathways = PathwayFile::load(&files.pathway, config.delimiter)?;
        let sample = &pathways.sample;
        let readings = GeneReadings::load(&files.reading, sample, config.delimiter)?;
        let annotations = AnnotationTable::load(annotation_path, sample, config.delimiter)?;

        let lookup = ReadingLookup::new(&readings.readings);
        let (sample_rows, stats) = annotate_sample(
            sample, &pathways.pathways, &lookup, &annotations, config.selection.as_ref());
        info!("Loaded sample: {} - ORFS with no annotations: {} - missing rpkm data points: {} - unused rpkm data points: {}",
            sample, stats.missing_annotations, stats.missing_readings, stats.unreferenced_readings);

        rows.extend(sample_rows);
        total += stats;
    }

    info!("Processed {} sample/pathway pairs, {} RPKM data points, {} total annotations.",
        total.pathways, total.datapoints, total.annotations);

    write_to_path(output, |writer| write_annotated_rows(writer, &rows, config.delimiter))?;
    info!("Wrote {} rows to {}", rows.len(), output.display());

    Ok(AnnotateReport { discovery, stats: total })
}
