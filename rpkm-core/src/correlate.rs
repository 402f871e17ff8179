use std::collections::{HashMap, HashSet};

use itertools::Itertools;
use log::debug;

use crate::{Error, PathwayRecord, PathwaySum, Result};

/// Parses a stored RPKM string, rejecting anything that is not a finite,
/// non-negative number.
pub fn parse_reading(sample: &str, orf: &str, value: &str) -> Result<f64> {
    let invalid = || Error::InvalidReading {
        sample: sample.to_string(),
        orf: orf.to_string(),
        value: value.to_string(),
    };
    let reading: f64 = value.trim().parse().map_err(|_| invalid())?;
    if !reading.is_finite() || reading < 0.0 {
        return Err(invalid());
    }
    Ok(reading)
}

/// RPKM readings of one sample keyed by ORF id.
#[derive(Debug, Clone, Default)]
pub struct ReadingLookup<'a> {
    values: HashMap<&'a str, &'a str>,
}

impl<'a> ReadingLookup<'a> {
    /// When an ORF is listed more than once the last reading wins.
    pub fn new(readings: &'a [(String, String)]) -> ReadingLookup<'a> {
        let values = readings.iter()
            .map(|(orf, value)| (orf.as_str(), value.as_str()))
            .collect();
        ReadingLookup { values }
    }

    pub fn get(&self, orf: &str) -> Option<&'a str> {
        self.values.get(orf).copied()
    }

    pub fn orfs(&self) -> impl Iterator<Item = &'a str> + '_ {
        self.values.keys().copied()
    }

    /// ORFs with a reading that are not in `referenced`, in ascending order.
    pub fn unreferenced(&self, referenced: &HashSet<&str>) -> Vec<String> {
        self.orfs()
            .filter(|orf| !referenced.contains(*orf))
            .sorted()
            .map(String::from)
            .collect()
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// The pathway sums of one sample together with the ORFs that had no reading.
#[derive(Debug, Clone, PartialEq)]
pub struct Correlation {
    pub sample: String,
    /// In the order the pathways were listed.
    pub sums: Vec<PathwaySum>,
    /// Every pathway member without a reading, once per reference.
    pub missing: Vec<String>,
    /// ORFs with a reading that no pathway lists.
    pub unreferenced: Vec<String>,
}

impl Correlation {
    pub fn missing_count(&self) -> usize {
        self.missing.len()
    }

    pub fn unreferenced_count(&self) -> usize {
        self.unreferenced.len()
    }
}

/// Sums the readings of every pathway's member ORFs for one sample.
///
/// Members without a reading contribute nothing and are recorded in
/// `Correlation::missing`. Readings no pathway refers to are recorded in
/// `Correlation::unreferenced`.
pub fn correlate(
    sample: &str,
    pathways: &[PathwayRecord],
    readings: &[(String, String)],
) -> Result<Correlation> {
    let lookup = ReadingLookup::new(readings);

    let mut sums = Vec::with_capacity(pathways.len());
    let mut missing = Vec::new();
    let mut referenced = HashSet::new();
    for pathway in pathways {
        let mut sum = 0.0;
        for orf in &pathway.orfs {
            match lookup.get(orf) {
                Some(value) => {
                    referenced.insert(orf.as_str());
                    sum += parse_reading(sample, orf, value)?;
                }
                None => {
                    debug!("{}: missing data point {} in {}", sample, orf, pathway.pathway_id);
                    missing.push(orf.clone());
                }
            }
        }
        sums.push(PathwaySum {
            pathway_id: pathway.pathway_id.clone(),
            common_name: pathway.common_name.clone(),
            sum,
        });
    }

    let unreferenced = lookup.unreferenced(&referenced);
    for orf in &unreferenced {
        debug!("{}: RPKM data point {} is not in any pathway", sample, orf);
    }

    Ok(Correlation { sample: sample.to_string(), sums, missing, unreferenced })
}
