use timevault::error::Result;

use crate::cli::common::{self, Context};

pub async fn run(ctx: &Context, id: &str) -> Result<()> {
    let id = common::parse_id(id)?;
    let directory = ctx.open_directory().await?;
    let view = directory.hide(id).await?;

    if ctx.json {
        common::print_json(&view)
    } else {
        eprintln!("Vault '{}' secured.", view.title);
        Ok(())
    }
}
