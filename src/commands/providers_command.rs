//! Listing of the known tile providers

use std::path::Path;
use clap::ArgMatches;
use log::info;

use crate::commands::command_traits::Command;
use crate::config::ConfigFile;
use crate::errors::MosaicResult;
use crate::fetch::{ProviderRegistry, ProviderTier};

/// Command printing every named tile source
pub struct ProvidersCommand {
    registry: ProviderRegistry,
}

impl ProvidersCommand {
    pub fn new(args: &ArgMatches) -> MosaicResult<Self> {
        let registry = match args.get_one::<String>("config") {
            Some(path) => ConfigFile::load(Path::new(path))?.providers,
            None => ProviderRegistry::builtin(),
        };
        Ok(ProvidersCommand { registry })
    }
}

impl Command for ProvidersCommand {
    fn execute(&self) -> MosaicResult<()> {
        let sources = self.registry.list();
        info!("{} tile providers:", sources.len());

        for source in sources {
            let tier = match source.tier {
                ProviderTier::Basemap => "basemap",
                ProviderTier::Registry => "xyz",
                ProviderTier::Template => "url",
            };
            info!("  {:<32} [{}] {}", source.name, tier, source.template);
            if let Some(attribution) = &source.attribution {
                info!("  {:<32}       {}", "", attribution);
            }
        }

        Ok(())
    }
}
