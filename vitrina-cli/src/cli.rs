use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

/// Define CLI arguments
#[derive(Parser, Debug)]
#[command(
    version,
    about = "Offline cache worker for the Vitrina catalog",
    long_about = "Hosts the Vitrina offline cache engine from a terminal.\n\
                  \n\
                  Pre-caches the site shell, routes requests through the cache strategies,\n\
                  evicts partitions left by previous deployments and drives the sync, push\n\
                  and command channels of the worker."
)]
pub struct CliArgs {
    /// Configuration file (TOML)
    #[arg(short, long, global = true, env = "VITRINA_CONFIG")]
    pub config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true, help = "Enable detailed debug logging")]
    pub verbose: bool,

    /// Also write logs to this file
    #[arg(long, global = true)]
    pub log_file: Option<PathBuf>,

    /// Cache version to run as, overriding the configured one
    #[arg(long = "cache-version", global = true)]
    pub cache_version: Option<String>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Replace the version placeholder in a worker source file
    Stamp(StampArgs),

    /// Pre-cache the static assets and activate, evicting old versions
    Install,

    /// Send a request through the worker
    Fetch(FetchArgs),

    /// Deliver a background sync event
    Sync {
        /// Sync tag; defaults to the configured one
        #[arg(short, long)]
        tag: Option<String>,
    },

    /// Deliver a push message and show the resulting notification
    Push {
        /// JSON payload with optional title, body and url
        #[arg(short, long)]
        payload: Option<String>,
    },

    /// Send a command-channel message, e.g. '{"action":"getVersion"}'
    Message {
        /// Message as JSON
        json: String,
    },

    /// List cache partitions and their entry counts
    Partitions,

    /// Inspect the configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Args, Debug)]
pub struct StampArgs {
    /// Worker source containing the placeholder
    #[arg(short, long)]
    pub input: PathBuf,

    /// Where to write the stamped source
    #[arg(short, long)]
    pub output: PathBuf,

    /// Version to inject; generated when omitted
    #[arg(long = "tag")]
    pub tag: Option<String>,
}

#[derive(Args, Debug)]
pub struct FetchArgs {
    /// Absolute URL, or a path relative to the configured scope
    pub url: String,

    /// Request destination (document, image, script, style, font, manifest)
    #[arg(short, long, default_value = "empty")]
    pub destination: String,

    /// HTTP method
    #[arg(short, long, default_value = "GET")]
    pub method: String,

    /// Write the response body to this file
    #[arg(short, long)]
    pub output: Option<PathBuf>,
}

#[derive(Subcommand, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigAction {
    /// Print the effective configuration as TOML
    Show,
    /// Print the default configuration file path
    Path,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_global_flags_after_subcommand() {
        let args = CliArgs::try_parse_from([
            "vitrina",
            "fetch",
            "./styles.css",
            "--destination",
            "style",
            "--verbose",
            "--cache-version",
            "v2",
        ])
        .unwrap();

        assert!(args.verbose);
        assert_eq!(args.cache_version.as_deref(), Some("v2"));
        match args.command {
            Command::Fetch(fetch) => {
                assert_eq!(fetch.url, "./styles.css");
                assert_eq!(fetch.destination, "style");
                assert_eq!(fetch.method, "GET");
                assert!(fetch.output.is_none());
            }
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn stamp_requires_input_and_output() {
        assert!(CliArgs::try_parse_from(["vitrina", "stamp", "--input", "sw.js"]).is_err());

        let args =
            CliArgs::try_parse_from(["vitrina", "stamp", "-i", "sw.js", "-o", "dist/sw.js", "--tag", "v1"]).unwrap();
        match args.command {
            Command::Stamp(stamp) => {
                assert_eq!(stamp.input, PathBuf::from("sw.js"));
                assert_eq!(stamp.output, PathBuf::from("dist/sw.js"));
                assert_eq!(stamp.tag.as_deref(), Some("v1"));
            }
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn config_subcommands() {
        let args = CliArgs::try_parse_from(["vitrina", "config", "path"]).unwrap();
        assert!(matches!(
            args.command,
            Command::Config {
                action: ConfigAction::Path
            }
        ));
    }
}
