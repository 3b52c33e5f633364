use console::style;

use timevault::error::Result;
use timevault::vault::{Status, VaultView};

use crate::cli::common::{self, Context};
use crate::cli::json_output::ListResponse;

pub async fn run(ctx: &Context) -> Result<()> {
    let directory = ctx.open_directory().await?;
    let vaults = directory.list();

    if ctx.json {
        return common::print_json(&ListResponse { vaults });
    }

    if vaults.is_empty() {
        eprintln!("No vaults.");
        return Ok(());
    }
    for view in &vaults {
        println!(
            "{}  {:<9}  {:>14}  {}",
            view.id,
            status_label(view.status),
            remaining_label(view),
            view.title
        );
    }
    Ok(())
}

pub fn status_label(status: Status) -> String {
    let label = format!("{:<9}", status);
    match status {
        Status::Secured => style(label).green().to_string(),
        Status::Revealing => style(label).yellow().to_string(),
        Status::Revealed => style(label).red().to_string(),
    }
}

pub fn remaining_label(view: &VaultView) -> String {
    match (view.status, view.seconds_remaining) {
        (Status::Revealing, Some(secs)) => common::format_remaining(secs),
        _ => "-".to_string(),
    }
}
