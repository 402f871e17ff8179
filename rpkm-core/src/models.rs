use std::collections::HashMap;
use itertools::Itertools;

/// The summed RPKM of a pathway's member ORFs within one sample.
#[derive(Debug, Clone, PartialEq)]
pub struct PathwaySum {
    pub pathway_id: String,
    pub common_name: String,
    pub sum: f64,
}

/// A pathway's RPKM sums across every sample of a batch.
#[derive(Debug, Clone, PartialEq)]
pub struct AggregatedPathway {
    pub pathway_id: String,
    /// Taken from the first sample that reported this pathway.
    pub common_name: String,
    pub per_sample: HashMap<String, f64>,
}

impl AggregatedPathway {
    pub fn new(pathway_id: &str, common_name: &str) -> AggregatedPathway {
        AggregatedPathway {
            pathway_id: pathway_id.to_string(),
            common_name: common_name.to_string(),
            per_sample: HashMap::new(),
        }
    }

    #[inline(always)]
    pub fn value(&self, sample: &str) -> Option<f64> {
        self.per_sample.get(sample).copied()
    }

    /// Sums in ascending sample order so the result does not depend on map layout.
    pub fn rpkm_sum(&self) -> f64 {
        self.per_sample.iter()
            .sorted_by(|a, b| a.0.cmp(b.0))
            .map(|(_, value)| value)
            .sum()
    }

    /// The number of samples in which this pathway has a non-zero sum.
    pub fn presence_count(&self) -> usize {
        self.per_sample.values().filter(|&&value| value != 0.0).count()
    }

    /// The mean sum, over all samples or only over samples where the pathway is present.
    ///
    /// A pathway with no RPKM anywhere averages to exactly zero in both modes.
    pub fn rpkm_average(&self, exclude_zeroes: bool) -> f64 {
        let sum = self.rpkm_sum();
        if sum == 0.0 {
            return 0.0;
        }
        let count = if exclude_zeroes {
            self.presence_count()
        } else {
            self.per_sample.len()
        };
        if count == 0 { 0.0 } else { sum / count as f64 }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pathway(values: &[(&str, f64)]) -> AggregatedPathway {
        let mut pathway = AggregatedPathway::new("PWY1", "one");
        for (sample, value) in values {
            pathway.per_sample.insert(sample.to_string(), *value);
        }
        pathway
    }

    #[test]
    fn test_statistics() {
        let pathway = pathway(&[("A", 4.0), ("B", 0.0), ("C", 2.0)]);
        assert_eq!(pathway.rpkm_sum(), 6.0);
        assert_eq!(pathway.presence_count(), 2);
        assert_eq!(pathway.rpkm_average(false), 2.0);
        assert_eq!(pathway.rpkm_average(true), 3.0);
    }

    #[test]
    fn test_zero_sum_averages_to_zero() {
        let pathway = pathway(&[("A", 0.0), ("B", 0.0)]);
        assert_eq!(pathway.rpkm_sum(), 0.0);
        assert_eq!(pathway.rpkm_average(false), 0.0);
        assert_eq!(pathway.rpkm_average(true), 0.0);
        assert_eq!(pathway.presence_count(), 0);
    }
}
