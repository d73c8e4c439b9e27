pub mod config;
pub mod corpus;
pub mod document;
pub mod duplicates;
pub mod error;
pub mod git;
pub mod index;
pub mod io;
pub mod links;
pub mod orphans;
pub mod paths;
pub mod plan;
pub mod prune;
pub mod report;
pub mod revision;
pub mod staleness;

pub use error::{DocsweepError, Result};
