use timevault::error::Result;

use crate::cli::common::{self, Context};
use crate::cli::json_output::DeleteResponse;

pub async fn run(ctx: &Context, id: &str) -> Result<()> {
    let id = common::parse_id(id)?;
    let directory = ctx.open_directory().await?;
    directory.delete(id).await?;

    if ctx.json {
        common::print_json(&DeleteResponse { id, deleted: true })
    } else {
        eprintln!("Vault '{}' deleted.", id);
        Ok(())
    }
}
