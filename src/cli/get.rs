use timevault::error::Result;

use crate::cli::common::{self, Context};
use crate::cli::json_output::SecretResponse;

pub async fn run(ctx: &Context, id: &str) -> Result<()> {
    let id = common::parse_id(id)?;
    let directory = ctx.open_directory().await?;
    let secret = directory.secret(id).await?;

    if ctx.json {
        let view = directory.get(id).await?;
        common::print_json(&SecretResponse {
            id,
            title: view.title,
            secret: secret.expose().to_string(),
        })
    } else {
        print!("{}", secret.expose());
        Ok(())
    }
}
