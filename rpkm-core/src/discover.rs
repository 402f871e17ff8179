use std::collections::HashSet;
use std::path::{Path, PathBuf};

use log::warn;

use crate::{Error, Result};

/// Filename suffixes identifying the files of each sample in a batch directory.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct Suffixes {
    pub pathway: String,
    pub reading: String,
    /// When set, every sample must also have an annotation file.
    pub annotation: Option<String>,
}

impl Suffixes {
    pub const DEFAULT_PATHWAY: &'static str = ".pwy.txt";
    pub const DEFAULT_READING: &'static str = ".orf_rpkm.txt";
    pub const DEFAULT_ANNOTATION: &'static str = ".metacyc-2016-10-31.lastout.parsed.txt";

    pub fn with_annotation<S: Into<String>>(mut self, suffix: S) -> Suffixes {
        self.annotation = Some(suffix.into());
        self
    }
}

impl Default for Suffixes {
    fn default() -> Self {
        Suffixes {
            pathway: Self::DEFAULT_PATHWAY.to_string(),
            reading: Self::DEFAULT_READING.to_string(),
            annotation: None,
        }
    }
}

#[derive(Debug, Copy, Clone, Hash, Eq, PartialEq)]
pub enum FileKind {
    Pathway,
    Reading,
    Annotation,
    Unmatched,
}

/// Assigns a file name to the first suffix it contains, checking the
/// pathway suffix, then the reading suffix, then the annotation suffix.
pub fn classify(file_name: &str, suffixes: &Suffixes) -> FileKind {
    if file_name.contains(&*suffixes.pathway) {
        FileKind::Pathway
    } else if file_name.contains(&*suffixes.reading) {
        FileKind::Reading
    } else if suffixes.annotation.as_ref().map_or(false, |suffix| file_name.contains(&**suffix)) {
        FileKind::Annotation
    } else {
        FileKind::Unmatched
    }
}

/// The input files belonging to one sample.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct SampleFiles {
    pub pathway: PathBuf,
    pub reading: PathBuf,
    pub annotation: Option<PathBuf>,
}

/// A pathway file whose companion was not found; the sample is skipped.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct MissingCompanion {
    pub pathway: PathBuf,
    pub expected: PathBuf,
    pub kind: FileKind,
}

#[derive(Debug, Clone, Default, Eq, PartialEq)]
pub struct Discovery {
    /// Ordered by pathway file name.
    pub samples: Vec<SampleFiles>,
    pub missing: Vec<MissingCompanion>,
    pub unmatched: Vec<PathBuf>,
}

/// Pairs up the files of each sample in `dir` by suffix substitution.
///
/// Companion names are derived from the pathway file name by replacing the
/// pathway suffix. A sample missing any required companion is left out of
/// `samples` and listed in `missing` instead.
pub fn discover(dir: &Path, suffixes: &Suffixes) -> Result<Discovery> {
    let entries = std::fs::read_dir(dir).map_err(|e| Error::io(dir, e))?;

    let mut pathway_files = Vec::new();
    let mut reading_files = HashSet::new();
    let mut annotation_files = HashSet::new();
    let mut unmatched = Vec::new();

    for entry in entries {
        let entry = entry.map_err(|e| Error::io(dir, e))?;
        let file_name = entry.file_name().to_string_lossy().into_owned();
        let file_type = entry.file_type().map_err(|e| Error::io(entry.path(), e))?;
        let kind = if file_type.is_dir() { FileKind::Unmatched } else { classify(&file_name, suffixes) };
        match kind {
            FileKind::Pathway => pathway_files.push(file_name),
            FileKind::Reading => { reading_files.insert(file_name); }
            FileKind::Annotation => { annotation_files.insert(file_name); }
            FileKind::Unmatched => {
                warn!("Unknown file in batch directory: {}", entry.path().display());
                unmatched.push(entry.path());
            }
        }
    }
    pathway_files.sort();
    unmatched.sort();

    let mut discovery = Discovery { unmatched, ..Discovery::default() };
    for pathway_name in pathway_files {
        let pathway = dir.join(&pathway_name);

        let reading_name = pathway_name.replace(&*suffixes.pathway, &suffixes.reading);
        if !reading_files.contains(&reading_name) {
            let expected = dir.join(&reading_name);
            warn!("Missing RPKM data file: {}", expected.display());
            discovery.missing.push(MissingCompanion { pathway, expected, kind: FileKind::Reading });
            continue;
        }

        let annotation = match &suffixes.annotation {
            None => None,
            Some(suffix) => {
                let annotation_name = pathway_name.replace(&*suffixes.pathway, suffix);
                if !annotation_files.contains(&annotation_name) {
                    let expected = dir.join(&annotation_name);
                    warn!("Missing annotation file: {}", expected.display());
                    discovery.missing.push(MissingCompanion { pathway, expected, kind: FileKind::Annotation });
                    continue;
                }
                Some(dir.join(annotation_name))
            }
        };

        discovery.samples.push(SampleFiles {
            pathway,
            reading: dir.join(reading_name),
            annotation,
        });
    }

    Ok(discovery)
}
