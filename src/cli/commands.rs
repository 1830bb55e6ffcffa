//! CLI commands and argument parsing

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

/// Command-line client for the Hydra continuous integration service
#[derive(Parser, Debug)]
#[command(name = "hydra-connect")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Base URL of the Hydra server
    #[arg(short, long, global = true, env = "HYDRA_URL")]
    pub url: Option<String>,

    /// Output format
    #[arg(short, long, global = true, default_value = "json")]
    pub format: OutputFormat,

    /// Also list hidden projects
    #[arg(long, global = true)]
    pub display_invisible: bool,

    /// Per-request timeout in seconds
    #[arg(long, global = true, default_value = "30")]
    pub timeout: u64,

    /// Verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

/// CLI subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Log in and print a session id
    Login,

    /// Terminate the current session
    Logout,

    /// List all projects
    Projects,

    /// Show project properties
    Project {
        /// Project identifier
        id: String,
    },

    /// Create or update a project
    ModifyProject {
        /// Project identifier
        id: String,

        #[command(flatten)]
        settings: SettingsSource,
    },

    /// Delete a project
    DeleteProject {
        /// Project identifier
        id: String,
    },

    /// Show jobset properties
    Jobset {
        /// Project identifier
        project: String,
        /// Jobset identifier
        jobset: String,
    },

    /// Create or update a jobset
    ModifyJobset {
        /// Project identifier
        project: String,
        /// Jobset identifier
        jobset: String,

        #[command(flatten)]
        settings: SettingsSource,
    },

    /// Delete a jobset
    DeleteJobset {
        /// Project identifier
        project: String,
        /// Jobset identifier
        jobset: String,
    },

    /// List the evaluations of a jobset
    Evals {
        /// Project identifier
        project: String,
        /// Jobset identifier
        jobset: String,
    },

    /// Show evaluation properties
    Eval {
        /// Evaluation identifier
        id: String,
    },

    /// Cancel all builds of an evaluation
    CancelEval {
        /// Evaluation identifier
        id: String,
    },

    /// Bump the priority of all builds of an evaluation
    BumpEval {
        /// Evaluation identifier
        id: String,
    },

    /// Restart the aborted builds of an evaluation
    RestartAborted {
        /// Evaluation identifier
        id: String,
    },

    /// Restart the failed builds of an evaluation
    RestartFailed {
        /// Evaluation identifier
        id: String,
    },

    /// Show build properties
    Build {
        /// Build identifier
        id: String,
    },

    /// Restart a build
    Restart {
        /// Build identifier
        id: String,
    },

    /// Cancel a scheduled build
    Cancel {
        /// Build identifier
        id: String,
    },

    /// Bump the priority of a build
    Bump {
        /// Build identifier
        id: String,
    },

    /// Keep a build product from being garbage collected
    Keep {
        /// Build identifier
        build: String,
        /// Build product identifier
        product: String,
    },

    /// Download a build product
    BuildProduct {
        /// Build identifier
        build: String,
        /// Build product identifier
        product: String,

        /// Write to FILE instead of stdout
        #[arg(short, long, value_name = "FILE")]
        output: Option<PathBuf>,
    },

    /// Download the raw log of a build
    RawLog {
        /// Build identifier
        build: String,

        /// Write to FILE instead of stdout
        #[arg(short, long, value_name = "FILE")]
        output: Option<PathBuf>,
    },

    /// Download a script that reproduces a build
    Reproduce {
        /// Build identifier
        build: String,

        /// Write to FILE instead of stdout
        #[arg(short, long, value_name = "FILE")]
        output: Option<PathBuf>,
    },

    /// Show the queue contents
    Queue,

    /// Show the builds that are currently running
    Status,

    /// Show the number of builds in the queue
    NumOfBuilds,

    /// Clear the VCS caches
    ClearVcsCache,

    /// Clear the failed builds cache
    ClearFailedCache,

    /// Remove non-current builds from the queue
    ClearNonCurrent,
}

/// Where project or jobset settings are read from
#[derive(Args, Debug)]
#[group(required = true, multiple = false)]
pub struct SettingsSource {
    /// Inline settings JSON
    #[arg(long)]
    pub settings_json: Option<String>,

    /// Settings file (JSON)
    #[arg(long, value_name = "FILE")]
    pub settings: Option<PathBuf>,
}

/// Output format
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    /// Pretty-printed JSON
    Json,
    /// Human-readable summaries
    Pretty,
}
