use std::path::PathBuf;

pub type Result<T> = std::result::Result<T, Error>;

/// Failures which abort a run.
///
/// Missing companion files and missing join keys are not represented here:
/// they are reported through `Discovery` and `JoinStats` and the run carries on.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("{source_name} is improperly formatted: {message}")]
    Format {
        source_name: String,
        message: String,
    },

    #[error("sample {sample}: RPKM value {value:?} for ORF {orf} is not a non-negative number")]
    InvalidReading {
        sample: String,
        orf: String,
        value: String,
    },

    #[error("failed to read {path:?}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to parse delimited text: {0}")]
    Csv(#[from] csv::Error),

    #[error("failed to write output to {path:?}: {source}")]
    OutputWrite {
        path: PathBuf,
        source: std::io::Error,
    },
}

impl Error {
    pub(crate) fn format<S: Into<String>, M: Into<String>>(source_name: S, message: M) -> Error {
        Error::Format {
            source_name: source_name.into(),
            message: message.into(),
        }
    }

    pub(crate) fn io<P: Into<PathBuf>>(path: P, source: std::io::Error) -> Error {
        Error::Io { path: path.into(), source }
    }
}
