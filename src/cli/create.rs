use std::io::{self, Read};

use timevault::error::{Result, TimevaultError};
use timevault::vault::NewVault;

use crate::cli::common::{self, Context};

pub async fn run(
    ctx: &Context,
    title: &str,
    description: Option<&str>,
    delay: &str,
) -> Result<()> {
    let delay_seconds = common::parse_delay(delay)?;

    // Read secret value from stdin
    let mut value = String::new();
    io::stdin()
        .read_to_string(&mut value)
        .map_err(|e| TimevaultError::Other(format!("Failed to read from stdin: {}", e)))?;

    // Trim trailing newline (common when piping echo)
    let value = value.trim_end_matches('\n').to_string();

    let mut new = NewVault::new(title, value, delay_seconds);
    if let Some(d) = description {
        new = new.with_description(d);
    }

    let directory = ctx.open_directory().await?;
    let view = directory.create(new).await?;

    if ctx.json {
        common::print_json(&view)?;
    } else {
        println!("{}", view.id);
        eprintln!(
            "Vault '{}' created (delay {}).",
            view.title,
            common::format_remaining(view.delay_seconds)
        );
    }
    Ok(())
}
