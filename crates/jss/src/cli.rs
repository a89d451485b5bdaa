//! Clap derive structures for the `jss` CLI.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

use jss_api::ObjectKind;

// ── Top-Level CLI ────────────────────────────────────────────────────

/// jss -- talk to a Jamf Pro server from the command line
#[derive(Debug, Parser)]
#[command(
    name = "jss",
    version,
    about = "Query and modify a Jamf Pro server from the command line",
    long_about = "Reads and writes objects through the Classic XML API (JSSResource)\n\
        or the JSON UAPI, and signs in to the web UI for pages neither API covers.",
    propagate_version = true,
    subcommand_required = true,
    arg_required_else_help = true
)]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalOpts,

    #[command(subcommand)]
    pub command: Command,
}

// ── Global Options ───────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct GlobalOpts {
    /// Server profile to use
    #[arg(long, short = 'p', env = "JSS_PROFILE", global = true)]
    pub profile: Option<String>,

    /// Server URL (overrides profile)
    #[arg(long, short = 'u', env = "JSS_URL", global = true)]
    pub url: Option<String>,

    /// API user (overrides profile)
    #[arg(long, env = "JSS_USERNAME", global = true, hide_env = true)]
    pub user: Option<String>,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(long, short = 'v', action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Skip TLS certificate verification
    #[arg(long, short = 'k', env = "JSS_INSECURE", global = true)]
    pub insecure: bool,

    /// Request timeout in seconds (default: none)
    #[arg(long, env = "JSS_TIMEOUT", global = true)]
    pub timeout: Option<u64>,
}

/// Which server interface a resource command goes through.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum Api {
    /// Classic XML API under /JSSResource
    #[default]
    Classic,
    /// JSON UAPI under /uapi
    Uapi,
}

// ── Top-Level Command Enum ───────────────────────────────────────────

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Fetch a resource and print it
    Get(GetArgs),

    /// Create an object from a file
    Post(PostArgs),

    /// Update an object from a file
    Put(PutArgs),

    /// Delete a resource
    #[command(alias = "rm")]
    Delete(DeleteArgs),

    /// Request a UAPI bearer token and print its expiry
    Token,

    /// Sign in to the web UI, optionally printing the forms on a page
    Login(LoginArgs),

    /// Manage CLI configuration
    Config(ConfigArgs),

    /// Generate shell completions
    Completions(CompletionsArgs),
}

// ── Resource commands ────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct GetArgs {
    /// Path under the API root, e.g. /packages/id/42 or /v1/buildings
    pub path: String,

    /// Interface to use
    #[arg(long, value_enum, default_value_t = Api::Classic)]
    pub api: Api,
}

#[derive(Debug, Args)]
pub struct PostArgs {
    /// Path under the API root; defaults to /<kind>/id/0 for the Classic API
    pub path: Option<String>,

    /// Object type being created (Classic API), e.g. package or computer_group
    #[arg(long, short = 'K')]
    pub kind: Option<ObjectKind>,

    /// XML (Classic) or JSON (UAPI) document to send
    #[arg(long, short = 'f')]
    pub file: PathBuf,

    /// Interface to use
    #[arg(long, value_enum, default_value_t = Api::Classic)]
    pub api: Api,
}

#[derive(Debug, Args)]
pub struct PutArgs {
    /// Path of the object to update
    pub path: String,

    /// XML (Classic) or JSON (UAPI) document to send
    #[arg(long, short = 'f')]
    pub file: PathBuf,

    /// Interface to use
    #[arg(long, value_enum, default_value_t = Api::Classic)]
    pub api: Api,
}

#[derive(Debug, Args)]
pub struct DeleteArgs {
    /// Path of the resource to delete
    pub path: String,

    /// XML payload for deletions that need one (Classic API only)
    #[arg(long, short = 'f')]
    pub file: Option<PathBuf>,

    /// Interface to use
    #[arg(long, value_enum, default_value_t = Api::Classic)]
    pub api: Api,
}

#[derive(Debug, Args)]
pub struct LoginArgs {
    /// Page to fetch after signing in, e.g. legacy/packages.html?id=-1&o=c
    #[arg(long)]
    pub page: Option<String>,

    /// Fetch the cloud distribution point settings page
    #[arg(long, conflicts_with = "page")]
    pub jcds: bool,
}

// ── Config ───────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub command: ConfigCommand,
}

#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    /// Print the config file location
    Path,

    /// List configured profiles
    Profiles,

    /// Store a password in the system keyring
    SetPassword {
        /// Profile to store the password for (defaults to the active one)
        #[arg(long)]
        profile: Option<String>,
    },
}

// ── Completions ──────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct CompletionsArgs {
    /// Shell to generate completions for
    pub shell: clap_complete::Shell,
}
