use std::{io, path::PathBuf};

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("No MATH data to export, importing it from the compiled font failed: {0}")]
    MissingSourceData(String),
    #[error("Unable to import MATH data: {0}")]
    ImportFailed(String),
    #[error("io failed for '{path}': '{source}'")]
    FileIo {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error(transparent)]
    YamlError(#[from] serde_yaml::Error),
    #[error(transparent)]
    Ir(#[from] mathir::error::Error),
    #[error(transparent)]
    Backend(#[from] mathbe::error::Error),
    #[error("The source has no instance named '{0}'")]
    UnknownInstance(String),
}
