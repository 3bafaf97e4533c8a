//! Modify command handler

use super::{until_interrupted, Session};
use crate::cli::ModifyArgs;
use crate::config::Config;
use crate::error::Result;
use crate::logging::timing::Timer;
use crate::output::OutputWriter;
use sous_core::ModifyParams;
use tracing::instrument;

/// Handle the modify command
#[instrument(skip_all, fields(recipe = args.recipe, save = args.save))]
pub async fn handle_modify(
    args: ModifyArgs,
    config: &Config,
    output: &mut OutputWriter,
) -> Result<()> {
    let _timer = Timer::with_details("modify_command", &format!("recipe: {}", args.recipe));

    let session = Session::open(config).await?;
    if let Some(model) = &args.model {
        session.select_model(model).await?;
    }

    let spinner = output.spinner(&format!("Modifying recipe #{}...", args.recipe));
    let result = until_interrupted(
        &session.assistant,
        session
            .assistant
            .modify(args.recipe, ModifyParams::new(args.changes)),
    )
    .await;
    if let Some(pb) = spinner {
        pb.finish_and_clear();
    }
    let outcome = result?;

    output.info(&format!("Modified \"{}\"", outcome.original.title))?;
    if !args.save {
        return output.recipe(&outcome.modified);
    }

    let saved = until_interrupted(
        &session.assistant,
        session
            .assistant
            .save(outcome.modified, false, Some(outcome.original.id)),
    )
    .await?;
    output.saved_recipe(&saved)?;
    output.success(&format!("✓ Updated recipe #{}", saved.id))
}
