//! CLI command implementations
//!
//! This module contains implementations of the commands supported by the
//! CLI application using the Command pattern.

pub mod command_traits;
pub mod mosaic_command;
pub mod info_command;
pub mod providers_command;

pub use command_traits::{Command, CommandFactory};
pub use mosaic_command::MosaicCommand;
pub use info_command::InfoCommand;
pub use providers_command::ProvidersCommand;

use clap::ArgMatches;
use crate::errors::MosaicResult;

/// Factory for creating command instances based on CLI arguments
pub struct TilemosaicCommandFactory;

impl TilemosaicCommandFactory {
    pub fn new() -> Self {
        TilemosaicCommandFactory
    }
}

impl Default for TilemosaicCommandFactory {
    fn default() -> Self {
        Self::new()
    }
}

impl CommandFactory for TilemosaicCommandFactory {
    fn create_command(&self, args: &ArgMatches) -> MosaicResult<Box<dyn Command>> {
        if args.get_flag("list-providers") {
            Ok(Box::new(ProvidersCommand::new(args)?))
        } else if args.get_flag("info") {
            Ok(Box::new(InfoCommand::new(args)?))
        } else {
            Ok(Box::new(MosaicCommand::new(args)?))
        }
    }
}
