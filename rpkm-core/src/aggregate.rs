use std::collections::BTreeMap;

use itertools::Itertools;

use crate::{AggregatedPathway, Correlation, PathwaySum};

/// Builds the pathway by sample matrix of a batch run.
///
/// Samples are folded in one at a time. Once every sample has been folded,
/// `finalize` fills in an explicit zero wherever a sample never reported a
/// pathway, after which every pathway has exactly one value per sample.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Aggregator {
    pathways: BTreeMap<String, AggregatedPathway>,
    /// In the order the samples were first folded.
    samples: Vec<String>,
}

impl Aggregator {
    pub fn new() -> Aggregator {
        Aggregator::default()
    }

    /// Records one sample's pathway sums.
    ///
    /// A pathway seen for the first time takes its common name from this
    /// sample. If the same pathway is listed twice for the sample, or the
    /// sample is folded twice, the later value replaces the earlier one.
    pub fn fold(&mut self, sample: &str, sums: &[PathwaySum]) {
        if !self.samples.iter().any(|known| known == sample) {
            self.samples.push(sample.to_string());
        }

        for sum in sums {
            self.pathways
                .entry(sum.pathway_id.clone())
                .or_insert_with(|| AggregatedPathway::new(&sum.pathway_id, &sum.common_name))
                .per_sample
                .insert(sample.to_string(), sum.sum);
        }
    }

    pub fn fold_correlation(&mut self, correlation: &Correlation) {
        self.fold(&correlation.sample, &correlation.sums);
    }

    /// Gives every pathway a zero for each sample that did not report it.
    pub fn finalize(&mut self) {
        let samples = &self.samples;
        for pathway in self.pathways.values_mut() {
            for sample in samples {
                pathway.per_sample.entry(sample.clone()).or_insert(0.0);
            }
        }
    }

    /// Sample ids in the order they were folded.
    pub fn samples(&self) -> &[String] {
        &self.samples
    }

    pub fn sorted_samples(&self) -> Vec<String> {
        self.samples.iter().cloned().sorted().collect()
    }

    /// Aggregated pathways in ascending pathway id order.
    pub fn pathways(&self) -> impl Iterator<Item=&AggregatedPathway> {
        self.pathways.values()
    }

    pub fn get(&self, pathway_id: &str) -> Option<&AggregatedPathway> {
        self.pathways.get(pathway_id)
    }

    pub fn pathway_count(&self) -> usize {
        self.pathways.len()
    }

    /// Finalizes the matrix and computes the per-pathway and per-sample statistics.
    pub fn summarize(mut self, exclude_zeroes: bool) -> AggregateSummary {
        self.finalize();

        let samples = self.sorted_samples();
        let sample_count = samples.len();
        let mut sample_sums = vec![0.0; sample_count];
        let mut sample_presence = vec![0usize; sample_count];

        let mut rows = Vec::with_capacity(self.pathways.len());
        for pathway in self.pathways.values() {
            let values: Vec<f64> = samples.iter()
                .map(|sample| pathway.value(sample).unwrap_or(0.0))
                .collect();

            for (column, value) in values.iter().enumerate() {
                sample_sums[column] += value;
                if *value != 0.0 {
                    sample_presence[column] += 1;
                }
            }

            rows.push(PathwayRow {
                pathway_id: pathway.pathway_id.clone(),
                common_name: pathway.common_name.clone(),
                rpkm_average: pathway.rpkm_average(exclude_zeroes),
                rpkm_sum: pathway.rpkm_sum(),
                presence_count: pathway.presence_count(),
                sample_count,
                values,
            });
        }

        let pathway_count = rows.len();
        let sample_stats = samples.iter()
            .zip(sample_sums.into_iter().zip(sample_presence))
            .map(|(sample, (rpkm_sum, present_pathways))| {
                let denominator = if exclude_zeroes { present_pathways } else { pathway_count };
                let average = if denominator == 0 { 0.0 } else { rpkm_sum / denominator as f64 };
                SampleStats {
                    sample: sample.clone(),
                    rpkm_sum,
                    present_pathways,
                    average,
                }
            })
            .collect();

        AggregateSummary { samples, rows, sample_stats }
    }
}

/// One line of the per-pathway aggregate table.
#[derive(Debug, Clone, PartialEq)]
pub struct PathwayRow {
    pub pathway_id: String,
    pub common_name: String,
    pub rpkm_average: f64,
    pub rpkm_sum: f64,
    pub presence_count: usize,
    pub sample_count: usize,
    /// One value per entry of `AggregateSummary::samples`.
    pub values: Vec<f64>,
}

impl PathwayRow {
    /// Formatted as `k/N`.
    pub fn presence(&self) -> String {
        format!("{}/{}", self.presence_count, self.sample_count)
    }
}

/// Column totals for one sample.
#[derive(Debug, Clone, PartialEq)]
pub struct SampleStats {
    pub sample: String,
    pub rpkm_sum: f64,
    pub present_pathways: usize,
    pub average: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct AggregateSummary {
    /// Sample ids in ascending order.
    pub samples: Vec<String>,
    pub rows: Vec<PathwayRow>,
    /// In the same order as `samples`.
    pub sample_stats: Vec<SampleStats>,
}
