use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "aquactl")]
#[command(about = "Utilities for the Aqua Security platform")]
#[command(version)]
pub struct Cli {
    /// Human-readable output instead of JSON
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Show transport-level request/response traces
    #[arg(short, long, global = true)]
    pub debug: bool,

    /// Credential profile to use for this invocation
    #[arg(short, long, global = true)]
    pub profile: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Interactively create a credential profile
    Setup,

    /// Manage stored credential profiles
    Profile {
        #[command(subcommand)]
        command: ProfileCommands,
    },

    /// Hub image inventory operations
    Images {
        #[command(subcommand)]
        command: ImagesCommands,
    },

    /// Image repository operations
    Repos {
        #[command(subcommand)]
        command: ReposCommands,
    },

    /// License utilization
    Licenses {
        #[command(subcommand)]
        command: LicensesCommands,
    },

    /// Enforcer fleet information
    Enforcers {
        #[command(subcommand)]
        command: EnforcersCommands,
    },

    /// Cloud VM inventory
    Vms {
        #[command(subcommand)]
        command: VmsCommands,
    },
}

#[derive(Subcommand)]
pub enum ProfileCommands {
    /// List stored profiles
    List,

    /// Show one profile (the default when no name is given)
    Info {
        name: Option<String>,
    },

    /// Delete a profile
    Delete {
        name: String,
    },

    /// Make a profile the default
    SetDefault {
        name: String,
    },
}

#[derive(Subcommand)]
pub enum ImagesCommands {
    /// Delete old images without running workloads
    Cleanup(CleanupArgs),
}

#[derive(Args)]
pub struct CleanupArgs {
    /// Minimum image age in days
    #[arg(long, default_value_t = 90)]
    pub days: u32,

    /// Only images from this registry
    #[arg(long)]
    pub registry: Option<String>,

    /// Only images in this application scope
    #[arg(long)]
    pub scope: Option<String>,

    /// Delete the images listed in a CSV export instead of querying the
    /// inventory (columns: image_id,image_name,registry_id,created)
    #[arg(long)]
    pub file: Option<PathBuf>,

    /// Images per delete call
    #[arg(long, default_value_t = 200)]
    pub batch_size: usize,

    /// Actually delete; without this the run is a dry run
    #[arg(long)]
    pub apply: bool,
}

#[derive(Subcommand)]
pub enum ReposCommands {
    /// Delete image repositories
    Delete(RepoDeleteArgs),
}

#[derive(Args)]
pub struct RepoDeleteArgs {
    /// Only repositories from this registry
    #[arg(long)]
    pub registry: Option<String>,

    /// Only repositories containing zero images
    #[arg(long)]
    pub empty_only: bool,

    /// Actually delete; without this the run is a dry run
    #[arg(long)]
    pub apply: bool,
}

#[derive(Subcommand)]
pub enum LicensesCommands {
    /// Show the tenant license document
    Show,

    /// Per-scope repository and enforcer utilization
    Breakdown {
        /// Write the breakdown to a CSV file
        #[arg(long)]
        output: Option<PathBuf>,
    },
}

#[derive(Subcommand)]
pub enum EnforcersCommands {
    /// Connected enforcer counts by type
    Count,
}

#[derive(Subcommand)]
pub enum VmsCommands {
    /// List VMs in the inventory
    List(VmListArgs),

    /// Fleet statistics: enforcement, cloud and risk breakdowns
    Count {
        /// Only VMs in this application scope
        #[arg(long)]
        scope: Option<String>,
    },
}

#[derive(Args)]
pub struct VmListArgs {
    /// Only VMs with no enforcer protecting them
    #[arg(long)]
    pub no_enforcer: bool,

    /// Only VMs from this cloud provider
    #[arg(long)]
    pub cloud: Option<String>,

    /// Only VMs in this region
    #[arg(long)]
    pub region: Option<String>,

    /// Only VMs at or below this risk level
    /// (unknown, low, medium, high, critical)
    #[arg(long)]
    pub max_risk: Option<String>,

    /// Only VMs in this application scope
    #[arg(long)]
    pub scope: Option<String>,

    /// Write the listing to a CSV file
    #[arg(long)]
    pub csv: Option<PathBuf>,
}
