use crate::scenario::Step;
use snafu::Snafu;
use std::path::PathBuf;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum Error {
    #[snafu(display("Step '{}' failed: {}", step, source))]
    Client {
        step: Step,
        source: model::clients::Error,
    },

    #[snafu(display("Step '{}' failed: {}", step, source))]
    Poll {
        step: Step,
        source: model::poll::Error,
    },

    #[snafu(display("Unable to read options file '{}': {}", path.display(), source))]
    OptionsRead {
        path: PathBuf,
        source: std::io::Error,
    },

    #[snafu(display("Unable to parse options file '{}': {}", path.display(), source))]
    OptionsParse {
        path: PathBuf,
        source: serde_yaml::Error,
    },

    #[snafu(display("Options file '{}' sets a polling interval of zero", path.display()))]
    ZeroInterval { path: PathBuf },

    #[snafu(display("No entry for managed cluster '{}' in the options file", name))]
    MissingClusterOptions { name: String },

    #[snafu(display("The options file lists no managed clusters"))]
    NoManagedClusters,

    #[snafu(display("Unable to connect to '{}': {}", name, source))]
    Endpoint {
        name: String,
        source: model::clients::Error,
    },
}

impl Error {
    /// The scenario step that failed, for errors raised while running one.
    pub fn step(&self) -> Option<Step> {
        match self {
            Error::Client { step, .. } | Error::Poll { step, .. } => Some(*step),
            _ => None,
        }
    }
}
