use timevault::error::Result;

use crate::cli::common::{self, Context};
use crate::cli::list::{remaining_label, status_label};

pub async fn run(ctx: &Context, id: &str) -> Result<()> {
    let id = common::parse_id(id)?;
    let directory = ctx.open_directory().await?;
    let view = directory.get(id).await?;

    if ctx.json {
        return common::print_json(&view);
    }

    println!("id:          {}", view.id);
    println!("title:       {}", view.title);
    if let Some(d) = &view.description {
        println!("description: {}", d);
    }
    println!("status:      {}", status_label(view.status));
    println!("delay:       {}", common::format_remaining(view.delay_seconds));
    println!("remaining:   {}", remaining_label(&view));
    println!("created:     {}", view.created_at.to_rfc3339());
    if let Some(t) = view.reveal_requested_at {
        println!("requested:   {}", t.to_rfc3339());
    }
    if let Some(t) = view.revealed_at {
        println!("revealed:    {}", t.to_rfc3339());
    }
    Ok(())
}
