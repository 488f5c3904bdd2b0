use std::net::SocketAddr;
use std::path::PathBuf;

use clap::{Parser, Subcommand};
use modrelay_index::{DEFAULT_DOCS_BASE_URL, IndexSources};

use crate::events::ws::DEFAULT_EVENTS_URL;

/// Top-level CLI definition for modrelay.
#[derive(Parser, Debug)]
#[command(name = "modrelay")]
#[command(about = "Module event relay and mapping/docs lookup service", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Follow the module event feed and serve lookups over HTTP.
    Serve(ServeArgs),
    /// Resolve a field, method or class name against the mapping table.
    Mcp(McpArgs),
    /// Search the generated API documentation.
    Docs(DocsArgs),
}

/// Locations of the reference index inputs.
#[derive(clap::Args, Debug, Clone)]
pub struct IndexArgs {
    /// SRG mapping file (`CL:`/`FD:`/`MD:` records).
    #[arg(long, default_value = "resources/mcp-srg.srg")]
    pub mappings: PathBuf,

    /// Newline-delimited list of statically dispatched obfuscated method names.
    #[arg(long, default_value = "resources/static_methods.txt")]
    pub static_methods: PathBuf,

    /// JSON documentation tree produced by the docs generator.
    #[arg(long)]
    pub docs: Option<PathBuf>,

    /// Base URL that documentation links are built from.
    #[arg(long, default_value = DEFAULT_DOCS_BASE_URL)]
    pub docs_base_url: String,
}

impl From<IndexArgs> for IndexSources {
    fn from(args: IndexArgs) -> Self {
        IndexSources {
            mappings: args.mappings,
            static_methods: args.static_methods,
            docs: args.docs,
            docs_base_url: args.docs_base_url,
        }
    }
}

/// Arguments for the `serve` subcommand.
#[derive(clap::Args, Debug)]
pub struct ServeArgs {
    #[command(flatten)]
    pub index: IndexArgs,

    /// WebSocket endpoint publishing module events.
    #[arg(long, default_value = DEFAULT_EVENTS_URL)]
    pub events_url: String,

    /// Address the HTTP lookup service binds to.
    #[arg(long, default_value = "127.0.0.1:8080")]
    pub http_addr: SocketAddr,

    /// Interval between keep-alive pings on the event stream (seconds).
    #[arg(long, default_value_t = 60)]
    pub ping_interval_secs: u64,

    /// Initial delay before reconnecting a failed stream (milliseconds, 0 = immediate).
    #[arg(long, default_value_t = 0)]
    pub reconnect_delay_ms: u64,

    /// Upper bound for the exponential reconnect delay (milliseconds).
    #[arg(long, default_value_t = 0)]
    pub reconnect_max_delay_ms: u64,

    /// Serve lookups only; do not subscribe to the event feed.
    #[arg(long, default_value_t = false)]
    pub no_events: bool,
}

/// Arguments for the `mcp` subcommand.
#[derive(clap::Args, Debug)]
pub struct McpArgs {
    #[command(flatten)]
    pub index: IndexArgs,

    /// One of `field`, `method` or `class`.
    pub kind: String,

    /// Name to resolve; `func_`/`field_` prefixes select obfuscated matching.
    pub name: String,

    /// Owner class used to re-rank field and method results.
    pub owner: Option<String>,
}

/// Arguments for the `docs` subcommand.
#[derive(clap::Args, Debug)]
pub struct DocsArgs {
    #[command(flatten)]
    pub index: IndexArgs,

    /// Term to search for.
    pub query: String,
}
