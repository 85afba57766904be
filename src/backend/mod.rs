use anyhow::Result;

pub mod commands;
pub mod osm_import;

pub use self::commands::CommandsBackend;
pub use self::osm_import::OsmImportBackend;

use crate::record::RecordKeeper;

/// A code generation backend: a pure function from the record graph to
/// one output unit. Either the full unit is produced or generation fails
/// with nothing written.
pub trait Backend {
    fn generate(&self, keeper: &RecordKeeper) -> Result<String>;
}
