//! Reading feeds into a [`Schedule`](crate::schedule::Schedule) and writing
//! them back.

use std::io;

use thiserror::Error;

mod config;
mod loader;
mod reader;
mod schema;
mod source;
mod writer;

pub use config::*;
pub use loader::*;
pub use reader::*;
pub use schema::*;
pub use source::*;
pub use writer::*;

use crate::problems::{Halted, Problem};

#[derive(Error, Debug)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
    #[error("Zip error: {0}")]
    Zip(#[from] zip::result::ZipError),
    #[error("Csv error: {0}")]
    Csv(#[from] csv::Error),
    #[error("Registry error: {0}")]
    Registry(#[from] RegistryError),
    #[error("Could not find a feed at {0}")]
    FeedNotFound(String),
    #[error("{0} is neither a zip archive nor a directory")]
    UnknownFormat(String),
    #[error("Halted on {}: {}", .0.severity, .0)]
    Halted(Box<Problem>),
}

impl From<Halted> for Error {
    fn from(halted: Halted) -> Self {
        Self::Halted(halted.0)
    }
}
