use clap::{Parser, Subcommand};
use clap_complete::Shell;
use std::net::SocketAddr;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "vhostctl")]
#[command(author = "Alberto Cavalcante")]
#[command(version)]
#[command(about = "Create, list and destroy Apache virtual hosts", long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Verbosity level
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress non-essential output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Config file (default: <config dir>/config.toml)
    #[arg(long, global = true, env = "VHOSTCTL_CONFIG")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Subcommand)]
pub enum Command {
    /// List registered hosts
    #[command(alias = "ls")]
    List,

    /// Show everything derived from a host name
    Show {
        /// Host name, e.g. example.test
        name: String,
    },

    /// Create a host: config, document root, hosts entry, enable and reload
    Create {
        /// Host name, e.g. example.test
        name: String,
    },

    /// Destroy a host and everything it owns
    #[command(alias = "delete")]
    Destroy {
        /// Host name, e.g. example.test
        name: String,

        /// Skip confirmation
        #[arg(short, long)]
        yes: bool,
    },

    /// Read commands from stdin, one per line (default when no subcommand)
    Prompt,

    /// Serve the HTTP API
    Serve {
        /// Address to listen on (default: [http] bind from config)
        #[arg(long)]
        bind: Option<SocketAddr>,
    },

    /// Write a default config file and template
    Init {
        /// Overwrite existing files
        #[arg(long)]
        force: bool,
    },

    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_is_well_formed() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_delete_is_an_alias() {
        let cli = Cli::try_parse_from(["vhostctl", "delete", "a.test", "--yes"]).unwrap();
        assert!(matches!(
            cli.command,
            Some(Command::Destroy { ref name, yes: true }) if name == "a.test"
        ));
    }

    #[test]
    fn test_no_subcommand_is_allowed() {
        let cli = Cli::try_parse_from(["vhostctl", "-vv"]).unwrap();
        assert!(cli.command.is_none());
        assert_eq!(cli.verbose, 2);
    }

    #[test]
    fn test_serve_bind_is_parsed() {
        let cli = Cli::try_parse_from(["vhostctl", "serve", "--bind", "0.0.0.0:9000"]).unwrap();
        match cli.command {
            Some(Command::Serve { bind }) => {
                assert_eq!(bind, Some("0.0.0.0:9000".parse().unwrap()));
            }
            _ => panic!("expected serve"),
        }
    }
}
