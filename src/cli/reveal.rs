use timevault::error::Result;
use timevault::vault::Status;

use crate::cli::common::{self, Context};

pub async fn run(ctx: &Context, id: &str) -> Result<()> {
    let id = common::parse_id(id)?;
    let directory = ctx.open_directory().await?;
    let receipt = directory.request_reveal(id).await?;

    if ctx.json {
        return common::print_json(&receipt);
    }

    let view = &receipt.view;
    match (view.status, receipt.started) {
        (Status::Revealed, _) => eprintln!("Vault '{}' is already revealed.", view.title),
        (_, true) => eprintln!(
            "Countdown started for '{}': readable in {}.",
            view.title,
            common::format_remaining(view.seconds_remaining.unwrap_or(view.delay_seconds))
        ),
        (_, false) => eprintln!(
            "Countdown already running for '{}': {} remaining.",
            view.title,
            common::format_remaining(view.seconds_remaining.unwrap_or(0))
        ),
    }
    Ok(())
}
