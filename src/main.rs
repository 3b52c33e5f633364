mod cli;

use clap::Parser;
use cli::common::{self, Context};
use cli::{Cli, Commands};
use timevault::error::{JsonError, Result};

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    let json = cli.json;

    if let Err(e) = run(cli).await {
        if json {
            let body = JsonError::from_error(&e);
            match serde_json::to_string(&body) {
                Ok(s) => eprintln!("{}", s),
                Err(_) => eprintln!("Error: {}", e),
            }
        } else {
            eprintln!("Error: {}", e);
            if e.is_transient() {
                eprintln!("This may be temporary; try again.");
            }
        }
        std::process::exit(e.exit_code());
    }
}

async fn run(cli: Cli) -> Result<()> {
    let ctx = Context::load(&cli)?;
    common::init_logging(&ctx.config.log.level);

    match &cli.command {
        Commands::Create {
            title,
            description,
            delay,
        } => cli::create::run(&ctx, title, description.as_deref(), delay).await,

        Commands::List => cli::list::run(&ctx).await,

        Commands::Show { id } => cli::show::run(&ctx, id).await,

        Commands::Reveal { id } => cli::reveal::run(&ctx, id).await,

        Commands::Get { id } => cli::get::run(&ctx, id).await,

        Commands::Hide { id } => cli::hide::run(&ctx, id).await,

        Commands::Delete { id } => cli::delete::run(&ctx, id).await,

        Commands::Watch { id } => cli::watch::run(&ctx, id.as_deref()).await,

        Commands::Config { command } => cli::config::run(&ctx, command),
    }
}
