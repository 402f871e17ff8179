use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::{AnnotationTable, PathwayRecord, PathwaySelection, ReadingLookup};

/// One (sample, pathway, ORF) line of the annotation report.
#[derive(Debug, Clone, Eq, PartialEq, Serialize, Deserialize)]
pub struct AnnotatedRow {
    #[serde(rename = "SAMPLE")]
    pub sample: String,
    #[serde(rename = "PWY_NAME")]
    pub pathway_id: String,
    #[serde(rename = "ORF")]
    pub orf: String,
    #[serde(rename = "HIT")]
    pub hit: String,
    #[serde(rename = "RPKM")]
    pub rpkm: String,
    #[serde(rename = "Q_LENGTH")]
    pub q_length: String,
    #[serde(rename = "BITSCORE")]
    pub bitscore: String,
    #[serde(rename = "BSR")]
    pub bsr: String,
    #[serde(rename = "EXPECT")]
    pub expect: String,
    #[serde(rename = "IDENTITY")]
    pub identity: String,
    #[serde(rename = "EC")]
    pub ec: String,
}

impl AnnotatedRow {
    /// A row for an ORF with a reading but no annotation: the ORF id stands in
    /// for the hit and every annotation field is zero.
    fn unannotated(sample: &str, pathway_id: &str, orf: &str, rpkm: &str) -> AnnotatedRow {
        let zero = || "0".to_string();
        AnnotatedRow {
            sample: sample.to_string(),
            pathway_id: pathway_id.to_string(),
            orf: orf.to_string(),
            hit: orf.to_string(),
            rpkm: rpkm.to_string(),
            q_length: zero(),
            bitscore: zero(),
            bsr: zero(),
            expect: zero(),
            identity: zero(),
            ec: zero(),
        }
    }
}

/// Counters describing how complete a join was.
#[derive(Debug, Copy, Clone, Default, Eq, PartialEq)]
pub struct JoinStats {
    /// Sample/pathway pairs written to the report.
    pub pathways: usize,
    /// Rows written to the report.
    pub datapoints: usize,
    /// Rows written with a real annotation.
    pub annotations: usize,
    /// ORFs with a reading but no annotation, over all pathways.
    pub missing_annotations: usize,
    /// Pathway members without a reading, over all pathways.
    pub missing_readings: usize,
    /// Readings of ORFs that no pathway lists.
    pub unreferenced_readings: usize,
}

impl std::ops::AddAssign for JoinStats {
    fn add_assign(&mut self, other: JoinStats) {
        self.pathways += other.pathways;
        self.datapoints += other.datapoints;
        self.annotations += other.annotations;
        self.missing_annotations += other.missing_annotations;
        self.missing_readings += other.missing_readings;
        self.unreferenced_readings += other.unreferenced_readings;
    }
}

/// Emits one row per pathway member of `sample` that has a reading.
///
/// Members without an annotation still get a row. The selection, when given
/// and non-empty, limits which pathways are written but every pathway is
/// counted in the missing-data counters. An empty selection selects everything.
pub fn annotate_sample(
    sample: &str,
    pathways: &[PathwayRecord],
    readings: &ReadingLookup<'_>,
    annotations: &AnnotationTable,
    selection: Option<&PathwaySelection>,
) -> (Vec<AnnotatedRow>, JoinStats) {
    let selection = selection.filter(|selection| !selection.is_empty());
    let mut rows = Vec::new();
    let mut stats = JoinStats::default();
    let mut referenced = HashSet::new();

    for pathway in pathways {
        let selected = selection.map_or(true, |selection| selection.contains(&pathway.pathway_id));
        if selected {
            stats.pathways += 1;
        }

        for orf in &pathway.orfs {
            let rpkm = match readings.get(orf) {
                Some(rpkm) => {
                    referenced.insert(orf.as_str());
                    rpkm
                }
                None => {
                    stats.missing_readings += 1;
                    continue;
                }
            };

            let annotation = annotations.get(orf);
            if annotation.is_none() {
                stats.missing_annotations += 1;
            }
            if !selected {
                continue;
            }

            stats.datapoints += 1;
            let row = match annotation {
                Some(anno) => {
                    stats.annotations += 1;
                    AnnotatedRow {
                        sample: sample.to_string(),
                        pathway_id: pathway.pathway_id.clone(),
                        orf: orf.clone(),
                        hit: anno.hit.clone(),
                        rpkm: rpkm.to_string(),
                        q_length: anno.q_length.clone(),
                        bitscore: anno.bitscore.clone(),
                        bsr: anno.bsr.clone(),
                        expect: anno.expect.clone(),
                        identity: anno.identity.clone(),
                        ec: anno.ec.clone(),
                    }
                }
                None => AnnotatedRow::unannotated(sample, &pathway.pathway_id, orf, rpkm),
            };
            rows.push(row);
        }
    }

    stats.unreferenced_readings = readings.unreferenced(&referenced).len();
    (rows, stats)
}
