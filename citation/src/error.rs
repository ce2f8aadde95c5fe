use std::{
    error::Error,
    fmt::{self, Display},
    io,
    path::PathBuf,
};

use machine_learning::MlErr;

pub type Result<T> = std::result::Result<T, DataErr>;

/// The error type of dataset loading.
#[derive(Debug)]
pub enum DataErr {
    Io {
        path: PathBuf,
        source: io::Error,
    },
    Parse {
        path: PathBuf,
        line: usize,
        msg: String,
    },
    UnknownNode {
        path: PathBuf,
        line: usize,
        id: String,
    },
    Empty(&'static str),
    Split(String),
    Ml(MlErr),
}

impl Display for DataErr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DataErr::Io { path, source } => {
                write!(f, "failed to read {}: {source}", path.display())
            }
            DataErr::Parse { path, line, msg } => {
                write!(f, "{}:{line}: {msg}", path.display())
            }
            DataErr::UnknownNode { path, line, id } => write!(
                f,
                "{}:{line}: the edge names the unknown node {id:?}",
                path.display()
            ),
            DataErr::Empty(what) => write!(f, "the {what} is empty"),
            DataErr::Split(msg) => write!(f, "can't split the nodes: {msg}"),
            DataErr::Ml(e) => write!(f, "{e}"),
        }
    }
}

impl Error for DataErr {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            DataErr::Io { source, .. } => Some(source),
            DataErr::Ml(e) => Some(e),
            _ => None,
        }
    }
}

impl From<MlErr> for DataErr {
    fn from(value: MlErr) -> Self {
        Self::Ml(value)
    }
}
