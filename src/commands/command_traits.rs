//! Command pattern interfaces
//!
//! Each CLI operation is a [`Command`]; a [`CommandFactory`] picks one from
//! the parsed arguments.

use crate::errors::MosaicResult;

/// Represents an executable command in the application
pub trait Command {
    /// Execute the command
    fn execute(&self) -> MosaicResult<()>;
}

/// Factory for creating commands from CLI arguments
pub trait CommandFactory {
    /// Create the command selected by `args`
    fn create_command(&self, args: &clap::ArgMatches) -> MosaicResult<Box<dyn Command>>;
}
