//! Generate command handler

use super::{read_recipe_file, until_interrupted, Session};
use crate::cli::GenerateArgs;
use crate::config::Config;
use crate::error::Result;
use crate::logging::timing::Timer;
use crate::output::OutputWriter;
use sous_core::GenerateParams;
use tracing::{info, instrument};

/// Handle the generate command
#[instrument(skip_all, fields(model = ?args.model, save = args.save))]
pub async fn handle_generate(
    args: GenerateArgs,
    config: &Config,
    output: &mut OutputWriter,
) -> Result<()> {
    let _timer = Timer::new("generate_command");

    let base_recipe = args.base.as_deref().map(read_recipe_file).transpose()?;
    let session = Session::open(config).await?;
    if let Some(model) = &args.model {
        session.select_model(model).await?;
    }

    let params = GenerateParams {
        additional_params: args.extra.filter(|extra| !extra.trim().is_empty()),
        base_recipe,
    };
    info!(model = %session.client.active_model(), "generating recipe");

    let spinner = output.spinner("Generating recipe...");
    let result = until_interrupted(&session.assistant, session.assistant.generate(params)).await;
    if let Some(pb) = spinner {
        pb.finish_and_clear();
    }
    let draft = result?;

    if !args.save {
        return output.recipe(&draft);
    }

    let saved = until_interrupted(
        &session.assistant,
        session.assistant.save(draft, true, None),
    )
    .await?;
    output.saved_recipe(&saved)?;
    output.success(&format!("✓ Saved as recipe #{}", saved.id))
}
