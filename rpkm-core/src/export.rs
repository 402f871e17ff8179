use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use serde::Serialize;

use crate::{AggregateSummary, AnnotatedRow, Correlation, Error, Result, SampleStats};

pub(crate) const AGGREGATE_HEADER: [&str; 5] =
    ["Name", "Common Name", "Average RPKM", "RPKM Sum", "In # Samples"];
pub(crate) const TOTAL_ROW_LABEL: &str = "Total Sample RPKM Sum";
pub(crate) const AVERAGE_ROW_LABEL: &str = "Average Per-Pathway RPKM";
const SAMPLE_STATS_HEADER: [&str; 3] = ["Sample", TOTAL_ROW_LABEL, AVERAGE_ROW_LABEL];
const ANNOTATED_HEADER: [&str; 11] = [
    "SAMPLE", "PWY_NAME", "ORF", "HIT", "RPKM", "Q_LENGTH",
    "BITSCORE", "BSR", "EXPECT", "IDENTITY", "EC",
];

/// Writes an optional header line followed by one delimited line per record.
pub struct TableExporter<I: Iterator> {
    header: Option<Vec<String>>,
    delimiter: u8,
    record_iter: I,
}

impl<T, I: Iterator<Item=T>> TableExporter<I>
    where T: Serialize
{
    pub fn new(header: Option<Vec<String>>, delimiter: u8, record_iter: I) -> TableExporter<I> {
        TableExporter { header, delimiter, record_iter }
    }

    pub fn write_all<W: Write>(&mut self, writer: W) -> std::io::Result<()> {
        let mut csv_writer = csv::WriterBuilder::new()
            .has_headers(false)
            .delimiter(self.delimiter)
            .from_writer(writer);
        if let Some(header) = &self.header {
            csv_writer.write_record(header)?;
        }
        for record in &mut self.record_iter {
            csv_writer.serialize(record)?;
        }
        csv_writer.flush()?;
        Ok(())
    }
}

fn header_of(columns: &[&str]) -> Vec<String> {
    columns.iter().map(|column| column.to_string()).collect()
}

/// Formats a float so whole numbers keep a trailing `.0` and every other
/// value keeps enough digits to be read back exactly.
fn format_float(value: f64) -> String {
    if value.is_finite() && value.fract() == 0.0 && value.abs() < 1e15 {
        format!("{:.1}", value)
    } else {
        value.to_string()
    }
}

/// Creates `path` and hands a buffered writer to `write`, reporting any
/// failure as an output error for that path.
pub(crate) fn write_to_path<F>(path: &Path, write: F) -> Result<()>
    where F: FnOnce(&mut BufWriter<File>) -> std::io::Result<()>
{
    let output_error = |source: std::io::Error| Error::OutputWrite { path: path.to_path_buf(), source };
    let file = File::create(path).map_err(output_error)?;
    let mut writer = BufWriter::new(file);
    write(&mut writer).map_err(output_error)?;
    writer.flush().map_err(output_error)
}

/// Where the per-sample statistics go when they are kept out of the
/// aggregate table: `out.tsv` becomes `out.stats.tsv`.
pub fn stats_path_for(output: &Path) -> PathBuf {
    let stem = output.file_stem().map(|s| s.to_string_lossy().into_owned()).unwrap_or_default();
    let name = match output.extension() {
        Some(ext) => format!("{}.stats.{}", stem, ext.to_string_lossy()),
        None => format!("{}.stats", stem),
    };
    output.with_file_name(name)
}

/// One headerless line per pathway: id, common name, summed RPKM.
pub fn write_correlation<W: Write>(writer: W, correlation: &Correlation, delimiter: u8) -> std::io::Result<()> {
    let records = correlation.sums.iter()
        .map(|sum| (&sum.pathway_id, &sum.common_name, format_float(sum.sum)));
    TableExporter::new(None, delimiter, records).write_all(writer)
}

/// The pathway by sample table, optionally followed by the per-sample
/// statistics as two footer lines under the sample columns.
pub fn write_aggregate_table<W: Write>(
    writer: W,
    summary: &AggregateSummary,
    delimiter: u8,
    with_stats_footer: bool,
) -> std::io::Result<()> {
    let mut header = header_of(&AGGREGATE_HEADER);
    header.extend(summary.samples.iter().cloned());

    let rows = summary.rows.iter().map(|row| {
        let mut record = vec![
            row.pathway_id.clone(),
            row.common_name.clone(),
            format_float(row.rpkm_average),
            format_float(row.rpkm_sum),
            row.presence(),
        ];
        record.extend(row.values.iter().map(|value| format_float(*value)));
        record
    });

    let footer_line = |label: &str, values: Vec<f64>| {
        let mut record = vec![label.to_string()];
        record.extend(std::iter::repeat(String::new()).take(AGGREGATE_HEADER.len() - 1));
        record.extend(values.into_iter().map(format_float));
        record
    };
    let footer = if with_stats_footer {
        let stats = &summary.sample_stats;
        vec![
            footer_line(TOTAL_ROW_LABEL, stats.iter().map(|stats| stats.rpkm_sum).collect()),
            footer_line(AVERAGE_ROW_LABEL, stats.iter().map(|stats| stats.average).collect()),
        ]
    } else {
        Vec::new()
    };

    TableExporter::new(Some(header), delimiter, rows.chain(footer)).write_all(writer)
}

pub fn write_sample_stats<W: Write>(writer: W, stats: &[SampleStats], delimiter: u8) -> std::io::Result<()> {
    let records = stats.iter()
        .map(|stats| (&stats.sample, format_float(stats.rpkm_sum), format_float(stats.average)));
    TableExporter::new(Some(header_of(&SAMPLE_STATS_HEADER)), delimiter, records).write_all(writer)
}

pub fn write_annotated_rows<W: Write>(writer: W, rows: &[AnnotatedRow], delimiter: u8) -> std::io::Result<()> {
    TableExporter::new(Some(header_of(&ANNOTATED_HEADER)), delimiter, rows.iter()).write_all(writer)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{AggregateTable, Aggregator, PathwaySum};
    use std::io::Cursor;

    fn summary() -> AggregateSummary {
        let mut aggregator = Aggregator::new();
        aggregator.fold("B", &[PathwaySum { pathway_id: "PWY1".into(), common_name: "one".into(), sum: 0.1 + 0.2 }]);
        aggregator.fold("A", &[
            PathwaySum { pathway_id: "PWY1".into(), common_name: "one".into(), sum: 4.0 },
            PathwaySum { pathway_id: "PWY2".into(), common_name: "two".into(), sum: 1.5 },
        ]);
        aggregator.summarize(false)
    }

    #[test]
    fn test_format_float() {
        assert_eq!(format_float(4.0), "4.0");
        assert_eq!(format_float(0.0), "0.0");
        assert_eq!(format_float(2.5), "2.5");
    }

    #[test]
    fn test_write_aggregate_table() {
        let mut output = Vec::new();
        write_aggregate_table(&mut output, &summary(), b'\t', false).unwrap();
        let text = String::from_utf8(output).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[0], "Name\tCommon Name\tAverage RPKM\tRPKM Sum\tIn # Samples\tA\tB");
        assert_eq!(lines[2], "PWY2\ttwo\t0.75\t1.5\t1/2\t1.5\t0.0");
        assert_eq!(lines.len(), 3);
    }

    #[test]
    fn test_aggregate_table_round_trip() {
        let summary = summary();
        let mut output = Vec::new();
        write_aggregate_table(&mut output, &summary, b'\t', true).unwrap();

        let table = AggregateTable::parse_from(Cursor::new(output), b'\t').unwrap();
        assert_eq!(table.samples, summary.samples);
        assert_eq!(table.rows.len(), summary.rows.len());
        for (parsed, written) in table.rows.iter().zip(&summary.rows) {
            assert_eq!(parsed.pathway_id, written.pathway_id);
            assert_eq!(parsed.common_name, written.common_name);
            for (a, b) in parsed.values.iter().zip(&written.values) {
                assert!((a - b).abs() < 1e-12);
            }
        }
    }

    #[test]
    fn test_stats_footer() {
        let mut output = Vec::new();
        write_aggregate_table(&mut output, &summary(), b'\t', true).unwrap();
        let text = String::from_utf8(output).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 5);
        assert_eq!(lines[3], "Total Sample RPKM Sum\t\t\t\t\t5.5\t0.30000000000000004");
        assert!(lines[4].starts_with("Average Per-Pathway RPKM\t\t\t\t\t2.75\t"));
    }

    #[test]
    fn test_write_sample_stats() {
        let mut output = Vec::new();
        write_sample_stats(&mut output, &summary().sample_stats, b'\t').unwrap();
        let text = String::from_utf8(output).unwrap();
        assert_eq!(text.lines().next(), Some("Sample\tTotal Sample RPKM Sum\tAverage Per-Pathway RPKM"));
        assert_eq!(text.lines().nth(1), Some("A\t5.5\t2.75"));
    }

    #[test]
    fn test_write_correlation() {
        let correlation = Correlation {
            sample: "S".to_string(),
            sums: vec![PathwaySum { pathway_id: "PWY1".into(), common_name: "one".into(), sum: 4.0 }],
            missing: Vec::new(),
            unreferenced: Vec::new(),
        };
        let mut output = Vec::new();
        write_correlation(&mut output, &correlation, b'\t').unwrap();
        assert_eq!(String::from_utf8(output).unwrap(), "PWY1\tone\t4.0\n");
    }

    #[test]
    fn test_write_annotated_rows() {
        let row = AnnotatedRow {
            sample: "S".to_string(),
            pathway_id: "PWY1".to_string(),
            orf: "O_1".to_string(),
            hit: "enolase".to_string(),
            rpkm: "2.5".to_string(),
            q_length: "420".to_string(),
            bitscore: "812.0".to_string(),
            bsr: "0.97".to_string(),
            expect: "1e-200".to_string(),
            identity: "95.1".to_string(),
            ec: "4.2.1.11".to_string(),
        };
        let mut output = Vec::new();
        write_annotated_rows(&mut output, &[row], b'\t').unwrap();
        let text = String::from_utf8(output).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[0], "SAMPLE\tPWY_NAME\tORF\tHIT\tRPKM\tQ_LENGTH\tBITSCORE\tBSR\tEXPECT\tIDENTITY\tEC");
        assert_eq!(lines[1], "S\tPWY1\tO_1\tenolase\t2.5\t420\t812.0\t0.97\t1e-200\t95.1\t4.2.1.11");
    }

    #[test]
    fn test_stats_path_for() {
        assert_eq!(stats_path_for(Path::new("out/pwy_data_batch.tsv")), PathBuf::from("out/pwy_data_batch.stats.tsv"));
        assert_eq!(stats_path_for(Path::new("table")), PathBuf::from("table.stats"));
    }
}
