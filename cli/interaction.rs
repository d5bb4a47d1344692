use anyhow::Result;
use console::style;
use dialoguer::Confirm;
use std::path::Path;

/// Asks before files are rewritten in place with no backup to fall back on.
pub fn confirm_processing(root: &Path, yes: bool) -> Result<bool> {
    if yes || !console::user_attended() {
        return Ok(true);
    }

    let prompt = format!(
        "Remove comments in place under {} without --backup?",
        style(root.display()).cyan()
    );

    let confirmed = Confirm::new()
        .with_prompt(prompt)
        .default(false)
        .interact()?;

    if !confirmed {
        println!("Aborted by user.");
    }

    Ok(confirmed)
}
