use crate::commands::Commands;
use idoc_core::IdocConfig;

impl Commands {
    pub async fn execute(self, config: IdocConfig) -> eyre::Result<()> {
        match self {
            Commands::Save { out, files } => crate::commands::save::execute(config, out, files).await,
            Commands::Preload { data, user } => {
                crate::commands::preload::execute(config, data, user).await
            }
        }
    }
}
