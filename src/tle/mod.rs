mod error;
mod loader;
mod parser;
mod types;

pub use error::{LoadError, Location, ParseError, TimeBaseError};
pub use loader::TleLoader;
pub use parser::{checksum, parse_epoch, parse_sources, ParseOutcome, LINE_LENGTH};
pub use types::{OrbitalElementSet, TleSource};
