use anyhow::{Context, Result};
use clap::Parser;

use modrelay_core::cli::{Cli, Commands, IndexArgs};
use modrelay_core::lookup::{Lookup, MappingKind};
use modrelay_core::{service, telemetry};
use modrelay_index::{IndexSources, ReferenceIndex};

fn load_lookup(args: IndexArgs) -> Result<Lookup> {
    let sources: IndexSources = args.into();
    let index = ReferenceIndex::load(&sources).context("failed to build reference index")?;
    Ok(Lookup::new(index.into()))
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    match cli.command {
        Commands::Serve(args) => {
            service::serve(args).await?;
        }
        Commands::Mcp(args) => {
            telemetry::init_logging();
            let kind: MappingKind = args.kind.parse()?;
            let lookup = load_lookup(args.index)?;
            let results = lookup.mappings(kind, &args.name, args.owner.as_deref());
            let json = serde_json::to_string_pretty(&results)?;
            println!("{json}");
        }
        Commands::Docs(args) => {
            telemetry::init_logging();
            let lookup = load_lookup(args.index)?;
            let results = lookup.docs(&args.query);
            let json = serde_json::to_string_pretty(&results)?;
            println!("{json}");
        }
    }
    Ok(())
}
