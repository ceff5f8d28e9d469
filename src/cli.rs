//! Command-line interface definitions for News Window.
//!
//! Options can be given as flags or, where noted, environment variables.

use clap::{Parser, Subcommand};

use crate::partition::TimeRange;

/// Search Google News over a time window, merge and summarize the results.
///
/// # Examples
///
/// ```sh
/// # Run the HTTP service
/// news_window serve --bind 127.0.0.1:3000
///
/// # One-off search printed as JSON
/// news_window search "人工智能" --range 30d --resolve-links
///
/// # Write results to ./json/<date>/ and print a summary
/// news_window -c config.yaml search rust -r 7d -j ./json --summarize
/// ```
#[derive(Parser, Debug)]
#[command(author, version, about)]
pub struct Cli {
    /// Optional path to config.yaml file
    #[arg(short, long, global = true, env = "NEWS_WINDOW_CONFIG")]
    pub config: Option<String>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Serve the search and summary endpoints over HTTP
    Serve {
        /// Address to listen on
        #[arg(short, long, env = "NEWS_WINDOW_BIND", default_value = "0.0.0.0:3000")]
        bind: String,
    },

    /// Run one search and print (or write) the merged results
    Search {
        /// Topic to search for
        topic: String,

        /// Time range: 1d, 3d, 7d, 30d or 1y
        #[arg(short, long, default_value = "3d")]
        range: TimeRange,

        /// Follow wrapper links to the publisher's URL
        #[arg(long)]
        resolve_links: bool,

        /// Also ask the model for a summary of the results
        #[arg(long)]
        summarize: bool,

        /// Write results under this directory instead of printing them
        #[arg(short, long)]
        json_output_dir: Option<String>,
    },
}
