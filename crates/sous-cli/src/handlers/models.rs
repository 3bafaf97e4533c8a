//! Models command handler

use super::Session;
use crate::cli::ModelsArgs;
use crate::config::Config;
use crate::error::Result;
use crate::output::OutputWriter;

/// Handle the models command
pub async fn handle_models(
    args: ModelsArgs,
    config: &Config,
    output: &mut OutputWriter,
) -> Result<()> {
    let session = Session::open(config).await?;
    let catalog = session.client.catalog();

    let spinner = output.spinner("Fetching model catalog...");
    let result = if args.refresh {
        catalog.refresh().await
    } else {
        catalog.get_available_models().await
    };
    if let Some(pb) = spinner {
        pb.finish_and_clear();
    }
    let models = result?;

    match args.select {
        Some(id) => {
            session.select_model(&id).await?;
            if catalog.known_completion_limit(&id).is_none() {
                output.warning(&format!(
                    "{} does not advertise a completion limit; library defaults apply",
                    id
                ))?;
            }
            output.section(&format!("Defaults for {}", id))?;
            output.data(&catalog.get_default_parameters(Some(&id)))
        }
        None => {
            let active = session.client.active_model();
            output.models(&models, Some(active.as_str()))?;
            output.info(&format!("{} models available", models.len()))
        }
    }
}
