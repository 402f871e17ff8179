use std::collections::{HashMap, HashSet};
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;

use crate::export::{AGGREGATE_HEADER, AVERAGE_ROW_LABEL, TOTAL_ROW_LABEL};
use crate::{Error, Result};

fn delimited_reader<R: Read>(reader: R, delimiter: u8) -> csv::Reader<R> {
    csv::ReaderBuilder::new()
        .has_headers(false)
        .delimiter(delimiter)
        .flexible(true)
        .from_reader(reader)
}

fn open(path: &Path) -> Result<BufReader<File>> {
    File::open(path)
        .map(BufReader::new)
        .map_err(|e| Error::io(path, e))
}

fn line_of(row: &csv::StringRecord) -> u64 {
    row.position().map(|pos| pos.line()).unwrap_or(0)
}

/// Converts a sample-prefixed ORF id (e.g. `MaxBin_33_1042_2`) into the
/// `O_1042_2` form used by the ORFS column of pathway files.
///
/// Every occurrence of the sample id is removed, then the first remaining
/// character (the separator that followed the sample id) is dropped.
pub fn normalize_orf_id(raw_id: &str, sample: &str) -> String {
    let stripped = if sample.is_empty() {
        raw_id.to_string()
    } else {
        raw_id.replace(sample, "")
    };
    let mut chars = stripped.chars();
    chars.next();
    format!("O_{}", chars.as_str())
}

/// Column positions of the fields used from a pathway file header.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct PathwayColumns {
    pub sample: usize,
    pub pathway_id: usize,
    pub common_name: usize,
    pub orfs: usize,
}

impl PathwayColumns {
    pub const SAMPLE: &'static str = "SAMPLE";
    pub const PATHWAY_ID: &'static str = "PWY_NAME";
    pub const COMMON_NAME: &'static str = "PWY_COMMON_NAME";
    pub const ORFS: &'static str = "ORFS";

    /// Looks up every required column by exact name in the header row.
    pub fn resolve(header: &csv::StringRecord, source_name: &str) -> Result<PathwayColumns> {
        let find = |name: &str| {
            header.iter().position(|column| column == name).ok_or_else(|| {
                Error::format(source_name, format!("required column {} is missing", name))
            })
        };

        Ok(PathwayColumns {
            sample: find(Self::SAMPLE)?,
            pathway_id: find(Self::PATHWAY_ID)?,
            common_name: find(Self::COMMON_NAME)?,
            orfs: find(Self::ORFS)?,
        })
    }

    fn width(&self) -> usize {
        1 + self.sample.max(self.pathway_id).max(self.common_name).max(self.orfs)
    }
}

#[derive(Debug, Clone, Eq, PartialEq)]
pub struct PathwayRecord {
    pub pathway_id: String,
    pub common_name: String,
    /// Member ORF ids in file order. Duplicates are kept.
    pub orfs: Vec<String>,
}

/// Splits an ORFS cell of the form `[O_1,O_2,...]` into its ids.
fn parse_orf_list(cell: &str) -> std::result::Result<Vec<String>, String> {
    if cell.len() < 2 || !cell.starts_with('[') || !cell.ends_with(']') {
        return Err(format!("ORFS value {:?} is not a bracketed list", cell));
    }
    let inner = &cell[1..cell.len() - 1];
    if inner.is_empty() {
        return Ok(Vec::new());
    }
    Ok(inner.split(',').map(str::to_string).collect())
}

/// All pathways listed for a single sample.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct PathwayFile {
    pub sample: String,
    pub pathways: Vec<PathwayRecord>,
}

impl PathwayFile {
    pub fn load(path: &Path, delimiter: u8) -> Result<PathwayFile> {
        let reader = open(path)?;
        Self::parse_named(reader, delimiter, &path.display().to_string())
    }

    pub fn parse_from<R: Read>(reader: R, delimiter: u8) -> Result<PathwayFile> {
        Self::parse_named(reader, delimiter, "pathway file")
    }

    fn parse_named<R: Read>(reader: R, delimiter: u8, source_name: &str) -> Result<PathwayFile> {
        let mut csv_reader = delimited_reader(reader, delimiter);

        let mut row = csv::StringRecord::new();
        if !csv_reader.read_record(&mut row)? {
            return Err(Error::format(source_name, "missing header row"));
        }
        let columns = PathwayColumns::resolve(&row, source_name)?;

        let mut sample: Option<String> = None;
        let mut pathways = Vec::new();
        while csv_reader.read_record(&mut row)? {
            if row.len() < columns.width() {
                return Err(Error::format(source_name, format!(
                    "line {} has {} columns, expected at least {}",
                    line_of(&row), row.len(), columns.width())));
            }

            // The sample id of the first row stands for the whole file.
            if sample.is_none() {
                sample = Some(row[columns.sample].to_string());
            }

            let orfs = parse_orf_list(&row[columns.orfs])
                .map_err(|message| Error::format(source_name,
                    format!("line {}: {}", line_of(&row), message)))?;

            pathways.push(PathwayRecord {
                pathway_id: row[columns.pathway_id].to_string(),
                common_name: row[columns.common_name].to_string(),
                orfs,
            });
        }

        let sample = sample.ok_or_else(|| Error::format(source_name, "no pathway rows"))?;
        Ok(PathwayFile { sample, pathways })
    }
}

/// Per-ORF RPKM readings for one sample, in file order.
///
/// Values are kept as the strings read from the file; they are only parsed
/// when a pathway sum is computed.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct GeneReadings {
    pub sample: String,
    pub readings: Vec<(String, String)>,
}

impl GeneReadings {
    pub fn load(path: &Path, sample: &str, delimiter: u8) -> Result<GeneReadings> {
        let reader = open(path)?;
        Self::parse_named(reader, sample, delimiter, &path.display().to_string())
    }

    pub fn parse_from<R: Read>(reader: R, sample: &str, delimiter: u8) -> Result<GeneReadings> {
        Self::parse_named(reader, sample, delimiter, "RPKM file")
    }

    fn parse_named<R: Read>(
        reader: R,
        sample: &str,
        delimiter: u8,
        source_name: &str,
    ) -> Result<GeneReadings> {
        let mut csv_reader = delimited_reader(reader, delimiter);

        let mut readings = Vec::new();
        let mut row = csv::StringRecord::new();
        while csv_reader.read_record(&mut row)? {
            if row.len() < 2 {
                return Err(Error::format(source_name, format!(
                    "line {} needs an ORF id and a value", line_of(&row))));
            }
            readings.push((normalize_orf_id(&row[0], sample), row[1].to_string()));
        }

        Ok(GeneReadings { sample: sample.to_string(), readings })
    }
}

/// The best hit reported for one ORF by the annotation search.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct AnnotationRecord {
    pub hit: String,
    pub q_length: String,
    pub bitscore: String,
    pub bsr: String,
    pub expect: String,
    pub identity: String,
    pub ec: String,
}

impl AnnotationRecord {
    const QUERY: usize = 0;
    const Q_LENGTH: usize = 2;
    const BITSCORE: usize = 3;
    const BSR: usize = 4;
    const EXPECT: usize = 5;
    const IDENTITY: usize = 7;
    const EC: usize = 8;
    const PRODUCT: usize = 9;

    /// The hit is the product text before the first `[`, with the
    /// whitespace around it removed: "enolase [Escherichia coli]" gives "enolase".
    fn from_row(row: &csv::StringRecord) -> AnnotationRecord {
        let hit = row[Self::PRODUCT].split('[').next().unwrap_or("").trim();
        AnnotationRecord {
            hit: hit.to_string(),
            q_length: row[Self::Q_LENGTH].to_string(),
            bitscore: row[Self::BITSCORE].to_string(),
            bsr: row[Self::BSR].to_string(),
            expect: row[Self::EXPECT].to_string(),
            identity: row[Self::IDENTITY].to_string(),
            ec: row[Self::EC].to_string(),
        }
    }
}

/// Annotations for one sample keyed by normalized ORF id.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct AnnotationTable {
    pub sample: String,
    records: HashMap<String, AnnotationRecord>,
}

impl AnnotationTable {
    pub fn load(path: &Path, sample: &str, delimiter: u8) -> Result<AnnotationTable> {
        let reader = open(path)?;
        Self::parse_named(reader, sample, delimiter, &path.display().to_string())
    }

    pub fn parse_from<R: Read>(reader: R, sample: &str, delimiter: u8) -> Result<AnnotationTable> {
        Self::parse_named(reader, sample, delimiter, "annotation file")
    }

    fn parse_named<R: Read>(
        reader: R,
        sample: &str,
        delimiter: u8,
        source_name: &str,
    ) -> Result<AnnotationTable> {
        let mut csv_reader = delimited_reader(reader, delimiter);

        let mut records = HashMap::new();
        let mut row = csv::StringRecord::new();
        while csv_reader.read_record(&mut row)? {
            if &row[AnnotationRecord::QUERY] == "#query" {
                continue;
            }
            if row.len() <= AnnotationRecord::PRODUCT {
                return Err(Error::format(source_name, format!(
                    "line {} has {} columns, expected at least {}",
                    line_of(&row), row.len(), AnnotationRecord::PRODUCT + 1)));
            }

            // Only the first hit listed for an ORF is kept.
            let orf = normalize_orf_id(&row[AnnotationRecord::QUERY], sample);
            records.entry(orf).or_insert_with(|| AnnotationRecord::from_row(&row));
        }

        Ok(AnnotationTable { sample: sample.to_string(), records })
    }

    pub fn get(&self, orf: &str) -> Option<&AnnotationRecord> {
        self.records.get(orf)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

/// The set of pathway ids a report should be limited to.
///
/// Read from a comma separated file whose first row is a header and whose
/// first column holds pathway ids.
#[derive(Debug, Clone, Default, Eq, PartialEq)]
pub struct PathwaySelection {
    ids: HashSet<String>,
}

impl PathwaySelection {
    pub fn load(path: &Path) -> Result<PathwaySelection> {
        let reader = open(path)?;
        Self::parse_from(reader)
    }

    pub fn parse_from<R: Read>(reader: R) -> Result<PathwaySelection> {
        let mut csv_reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .delimiter(b',')
            .flexible(true)
            .from_reader(reader);

        let mut ids = HashSet::new();
        let mut row = csv::StringRecord::new();
        while csv_reader.read_record(&mut row)? {
            if let Some(id) = row.get(0) {
                ids.insert(id.to_string());
            }
        }
        Ok(PathwaySelection { ids })
    }

    pub fn contains(&self, pathway_id: &str) -> bool {
        self.ids.contains(pathway_id)
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }
}

impl<S: Into<String>> std::iter::FromIterator<S> for PathwaySelection {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        PathwaySelection { ids: iter.into_iter().map(Into::into).collect() }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct AggregateTableRow {
    pub pathway_id: String,
    pub common_name: String,
    /// One value per entry of `AggregateTable::samples`.
    pub values: Vec<f64>,
}

/// A per-pathway aggregate table read back from disk.
#[derive(Debug, Clone, PartialEq)]
pub struct AggregateTable {
    pub samples: Vec<String>,
    pub rows: Vec<AggregateTableRow>,
}

impl AggregateTable {
    pub fn load(path: &Path, delimiter: u8) -> Result<AggregateTable> {
        let reader = open(path)?;
        Self::parse_named(reader, delimiter, &path.display().to_string())
    }

    pub fn parse_from<R: Read>(reader: R, delimiter: u8) -> Result<AggregateTable> {
        Self::parse_named(reader, delimiter, "aggregate table")
    }

    fn parse_named<R: Read>(reader: R, delimiter: u8, source_name: &str) -> Result<AggregateTable> {
        let mut csv_reader = delimited_reader(reader, delimiter);

        let mut row = csv::StringRecord::new();
        if !csv_reader.read_record(&mut row)? {
            return Err(Error::format(source_name, "missing header row"));
        }
        let fixed = AGGREGATE_HEADER.len();
        if row.len() < fixed || row.iter().zip(AGGREGATE_HEADER.iter()).any(|(a, b)| a != *b) {
            return Err(Error::format(source_name, "header does not match the aggregate layout"));
        }
        let samples: Vec<String> = row.iter().skip(fixed).map(str::to_string).collect();

        let mut rows = Vec::new();
        while csv_reader.read_record(&mut row)? {
            if &row[0] == TOTAL_ROW_LABEL || &row[0] == AVERAGE_ROW_LABEL {
                continue;
            }
            if row.len() != fixed + samples.len() {
                return Err(Error::format(source_name, format!(
                    "line {} has {} columns, expected {}",
                    line_of(&row), row.len(), fixed + samples.len())));
            }
            let values = row.iter().skip(fixed)
                .map(|cell| cell.parse::<f64>().map_err(|_| Error::format(source_name,
                    format!("line {}: {:?} is not a number", line_of(&row), cell))))
                .collect::<Result<Vec<f64>>>()?;
            rows.push(AggregateTableRow {
                pathway_id: row[0].to_string(),
                common_name: row[1].to_string(),
                values,
            });
        }

        Ok(AggregateTable { samples, rows })
    }

    pub fn row(&self, pathway_id: &str) -> Option<&AggregateTableRow> {
        self.rows.iter().find(|row| row.pathway_id == pathway_id)
    }

    /// The value of a pathway in a sample column, if both exist.
    pub fn value(&self, pathway_id: &str, sample: &str) -> Option<f64> {
        let column = self.samples.iter().position(|s| s == sample)?;
        self.row(pathway_id).map(|row| row.values[column])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    lazy_static! {
        static ref PATHWAYS: String = [
            "SAMPLE\tPWY_NAME\tPWY_COMMON_NAME\tNUM_REACTIONS\tORFS",
            "MaxBin_33\tPWY-5101\tL-isoleucine biosynthesis II\t8\t[O_1042_2,O_881_1]",
            "MaxBin_33\tGLYCOLYSIS\tglycolysis I\t10\t[O_17_3]",
            "MaxBin_33\tPWY-0\tempty pathway\t0\t[]",
        ].join("\n");
    }

    #[test]
    fn test_normalize_orf_id() {
        assert_eq!(normalize_orf_id("MaxBin_33_1042_2", "MaxBin_33"), "O_1042_2");
        assert_eq!(normalize_orf_id("MaxBin_33.881_1", "MaxBin_33"), "O_881_1");
        assert_eq!(normalize_orf_id("other_5", "MaxBin_33"), "O_ther_5");
    }

    #[test]
    fn test_parse_pathways() {
        let file = PathwayFile::parse_from(Cursor::new(PATHWAYS.as_str()), b'\t').unwrap();
        assert_eq!(file.sample, "MaxBin_33");
        assert_eq!(file.pathways.len(), 3);
        assert_eq!(file.pathways[0], PathwayRecord {
            pathway_id: "PWY-5101".to_string(),
            common_name: "L-isoleucine biosynthesis II".to_string(),
            orfs: vec!["O_1042_2".to_string(), "O_881_1".to_string()],
        });
        assert!(file.pathways[2].orfs.is_empty());
    }

    #[test]
    fn test_resolve_columns_in_any_order() {
        let header = csv::StringRecord::from(vec!["ORFS", "X", "PWY_COMMON_NAME", "SAMPLE", "PWY_NAME"]);
        let columns = PathwayColumns::resolve(&header, "test").unwrap();
        assert_eq!(columns, PathwayColumns { sample: 3, pathway_id: 4, common_name: 2, orfs: 0 });
    }

    #[test]
    fn test_missing_column_is_format_error() {
        let input = "SAMPLE\tPWY_NAME\tORFS\nMaxBin_33\tPWY1\t[O_1]";
        let result = PathwayFile::parse_from(Cursor::new(input), b'\t');
        match result {
            Err(Error::Format { message, .. }) => assert!(message.contains("PWY_COMMON_NAME")),
            other => panic!("expected format error, got {:?}", other),
        }
    }

    #[test]
    fn test_column_names_are_case_sensitive() {
        let input = "sample\tPWY_NAME\tPWY_COMMON_NAME\tORFS\nMaxBin_33\tPWY1\tone\t[O_1]";
        assert!(PathwayFile::parse_from(Cursor::new(input), b'\t').is_err());
    }

    #[test]
    fn test_unbracketed_orfs_is_format_error() {
        let input = "SAMPLE\tPWY_NAME\tPWY_COMMON_NAME\tORFS\nMaxBin_33\tPWY1\tone\tO_1,O_2";
        let result = PathwayFile::parse_from(Cursor::new(input), b'\t');
        assert!(matches!(result, Err(Error::Format { .. })));
    }

    #[test]
    fn test_header_only_pathway_file() {
        let input = "SAMPLE\tPWY_NAME\tPWY_COMMON_NAME\tORFS\n";
        let result = PathwayFile::parse_from(Cursor::new(input), b'\t');
        assert!(matches!(result, Err(Error::Format { .. })));
    }

    #[test]
    fn test_duplicate_orfs_are_kept() {
        let input = "SAMPLE\tPWY_NAME\tPWY_COMMON_NAME\tORFS\nS\tPWY1\tone\t[O_1,O_1]";
        let file = PathwayFile::parse_from(Cursor::new(input), b'\t').unwrap();
        assert_eq!(file.pathways[0].orfs, vec!["O_1", "O_1"]);
    }

    #[test]
    fn test_parse_readings() {
        let input = "MaxBin_33_1042_2\t2.5\nMaxBin_33_881_1\t1.5\n";
        let readings = GeneReadings::parse_from(Cursor::new(input), "MaxBin_33", b'\t').unwrap();
        assert_eq!(readings.sample, "MaxBin_33");
        assert_eq!(readings.readings, vec![
            ("O_1042_2".to_string(), "2.5".to_string()),
            ("O_881_1".to_string(), "1.5".to_string()),
        ]);
    }

    #[test]
    fn test_parse_readings_with_other_delimiter() {
        let input = "S_1,0.25\n";
        let readings = GeneReadings::parse_from(Cursor::new(input), "S", b',').unwrap();
        assert_eq!(readings.readings, vec![("O_1".to_string(), "0.25".to_string())]);
    }

    #[test]
    fn test_short_reading_row_is_format_error() {
        let input = "MaxBin_33_1\n";
        let result = GeneReadings::parse_from(Cursor::new(input), "MaxBin_33", b'\t');
        assert!(matches!(result, Err(Error::Format { .. })));
    }

    #[test]
    fn test_parse_annotations() {
        let input = [
            "#query\ttarget\tq_length\tbitscore\tbsr\texpect\taln_length\tidentity\tec\tproduct",
            "MaxBin_33_17_3\tENO\t420\t812.0\t0.97\t1e-200\t418\t95.1\t4.2.1.11\tenolase [Escherichia coli]",
            "MaxBin_33_17_3\tENO2\t420\t400.0\t0.50\t1e-90\t410\t60.0\t4.2.1.11\tenolase 2 [Bacillus]",
            "MaxBin_33_9_1\tXYZ\t100\t50.0\t0.1\t0.01\t90\t30.0\t\thypothetical protein",
        ].join("\n");
        let table = AnnotationTable::parse_from(Cursor::new(input), "MaxBin_33", b'\t').unwrap();
        assert_eq!(table.len(), 2);
        assert_eq!(table.get("O_17_3"), Some(&AnnotationRecord {
            hit: "enolase".to_string(),
            q_length: "420".to_string(),
            bitscore: "812.0".to_string(),
            bsr: "0.97".to_string(),
            expect: "1e-200".to_string(),
            identity: "95.1".to_string(),
            ec: "4.2.1.11".to_string(),
        }));
        assert_eq!(table.get("O_9_1").map(|anno| anno.hit.as_str()), Some("hypothetical protein"));
        assert!(table.get("O_1").is_none());
    }

    #[test]
    fn test_parse_selection() {
        let input = "pathway,description\nPWY-5101,isoleucine\nGLYCOLYSIS,glycolysis\n";
        let selection = PathwaySelection::parse_from(Cursor::new(input)).unwrap();
        assert_eq!(selection.len(), 2);
        assert!(selection.contains("PWY-5101"));
        assert!(selection.contains("GLYCOLYSIS"));
        assert!(!selection.contains("pathway"));
    }

    #[test]
    fn test_parse_aggregate_table_skips_footer() {
        let input = [
            "Name\tCommon Name\tAverage RPKM\tRPKM Sum\tIn # Samples\tA\tB",
            "PWY1\tone\t2.0\t4.0\t1/2\t4.0\t0.0",
            "Total Sample RPKM Sum\t\t\t\t\t4.0\t0.0",
            "Average Per-Pathway RPKM\t\t\t\t\t4.0\t0.0",
        ].join("\n");
        let table = AggregateTable::parse_from(Cursor::new(input), b'\t').unwrap();
        assert_eq!(table.samples, vec!["A", "B"]);
        assert_eq!(table.rows.len(), 1);
        assert_eq!(table.value("PWY1", "A"), Some(4.0));
        assert_eq!(table.value("PWY1", "B"), Some(0.0));
        assert_eq!(table.value("PWY1", "C"), None);
    }
}
