use clap::{Parser, Subcommand};
use core::str::FromStr;

/// Command-line arguments for regconf
#[derive(Parser, Debug, Clone)]
#[command(name = "regconf")]
#[command(about = "Inspect, edit and validate a container registry configuration")]
#[command(long_about = None)]
#[command(version)]
pub struct Args {
    /// Configuration document path
    #[arg(
        long,
        value_name = "PATH",
        default_value = "./config.yaml",
        env = "REGCONF_CONFIG"
    )]
    pub config: String,

    /// YAML file describing storage engines and their fields
    #[arg(long = "engine-schema", value_name = "PATH")]
    pub engine_schema: Option<String>,

    /// Validate for first-time setup rather than a running registry
    #[arg(long)]
    pub setup: bool,

    /// Field groups managed externally; edits to them are refused
    #[arg(
        long = "read-only",
        value_name = "GROUP",
        env = "REGCONF_READ_ONLY_GROUPS",
        value_delimiter = ','
    )]
    pub read_only: Vec<String>,

    /// Output format: text or json
    #[arg(long = "output-format", value_name = "FORMAT", default_value = "text")]
    pub output_format: String,

    /// Enable verbose logging output
    #[arg(short, long)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, Clone)]
#[non_exhaustive]
pub enum Command {
    /// Show view fields (all of them when none are named)
    Show {
        #[arg(value_name = "FIELD")]
        fields: Vec<String>,
    },

    /// Set a view field or a raw top-level key and write the document back
    ///
    /// The value of a raw key is read as YAML, so `true` and `5` keep their
    /// types. The `database` field takes a connection URI.
    Set {
        #[arg(value_name = "FIELD")]
        field: String,
        #[arg(value_name = "VALUE")]
        value: String,
    },

    /// Run cascades and validation and report every issue
    Validate,

    /// Inspect or edit storage locations
    Storage {
        #[command(subcommand)]
        action: Option<StorageAction>,
    },

    /// Inspect or edit generic OIDC login providers
    Oidc {
        #[command(subcommand)]
        action: OidcAction,
    },

    /// List the configuration sections shown for this document
    Sections,

    /// Validate and, when nothing blocks, mark setup complete and write the document
    Save,
}

#[derive(Subcommand, Debug, Clone)]
#[non_exhaustive]
pub enum StorageAction {
    /// List storage locations in preference order
    List,

    /// Add a storage location
    Add {
        location: String,
        /// Engine type; defaults to the engine of the last location
        #[arg(long)]
        engine: Option<String>,
    },

    /// Remove a storage location
    Remove { location: String },

    /// Rename a storage location
    Rename { location: String, new_location: String },

    /// Switch a location's engine type
    Engine { location: String, engine: String },

    /// Set one engine setting; the value is read as YAML
    Field {
        location: String,
        field: String,
        value: String,
    },

    /// Mark or unmark a location as a default location
    Default {
        location: String,
        #[arg(action = clap::ArgAction::Set, default_value_t = true)]
        enabled: bool,
    },
}

#[derive(Subcommand, Debug, Clone)]
#[non_exhaustive]
pub enum OidcAction {
    /// List configured providers
    List,
    /// Add a provider with an empty configuration
    Add { id: String },
    /// Remove a provider
    Remove { id: String },
}

/// How command output is printed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[non_exhaustive]
pub enum OutputFormat {
    /// One human-readable line per item
    Text,
    /// Pretty-printed JSON
    Json,
}

impl FromStr for OutputFormat {
    type Err = String;

    #[inline]
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "text" => Ok(Self::Text),
            "json" => Ok(Self::Json),
            _ => Err(format!("Invalid format: {s}. Use 'text' or 'json'")),
        }
    }
}
