// ABOUTME: Command-line interface definition using clap derive macros.
// ABOUTME: Defines all subcommands and their arguments.

use clap::{Parser, Subcommand};
use std::net::SocketAddr;

#[derive(Parser)]
#[command(name = "omk")]
#[command(about = "Deploy applications from git repositories to a local Docker or Podman engine")]
#[command(version)]
pub struct Cli {
    /// Enable debug logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Only print final results
    #[arg(short, long, global = true, conflicts_with = "json")]
    pub quiet: bool,

    /// Print JSON lines instead of text
    #[arg(long, global = true)]
    pub json: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Deploy an application from a git repository, or resume its last deployment
    Run {
        /// Repository URL (http, https, ssh or git)
        url: String,

        /// Branch to track
        #[arg(short, long)]
        branch: Option<String>,

        /// Application name (derived from the URL when omitted)
        #[arg(short, long)]
        name: Option<String>,

        /// Human-readable description
        #[arg(short, long)]
        description: Option<String>,

        /// Reset the retry counter and break a held run lock
        #[arg(long)]
        force: bool,
    },

    /// List deployed applications
    List,

    /// Show an application's record with its current container status
    Status {
        /// Application name
        name: String,
    },

    /// Remove an application's containers, image, code and record
    Delete {
        /// Application name
        name: String,
    },

    /// Validate and store a GitHub access token
    Login {
        /// Token to store (falls back to GITHUB_TOKEN, then stdin)
        #[arg(long)]
        token: Option<String>,
    },

    /// Receive GitHub push webhooks and redeploy matching applications
    Serve {
        /// Listen address (defaults to webhook.bind from settings)
        #[arg(long)]
        bind: Option<SocketAddr>,
    },
}
