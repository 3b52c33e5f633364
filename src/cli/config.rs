use timevault::error::{Result, TimevaultError};

use crate::cli::common::{self, Context};
use crate::cli::ConfigCommands;

pub fn run(ctx: &Context, cmd: &ConfigCommands) -> Result<()> {
    match cmd {
        ConfigCommands::Show => {
            if ctx.json {
                return common::print_json(&ctx.config);
            }
            let content = toml::to_string_pretty(&ctx.config)
                .map_err(|e| TimevaultError::Serialization(e.to_string()))?;
            print!("{}", content);
            println!("# owner = {}", ctx.owner);
            println!("# store = {}", ctx.config.store_path()?.display());
            Ok(())
        }
    }
}
