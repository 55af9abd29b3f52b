//! cli::args
//!
//! Command-line argument definitions using clap derive.
//!
//! # Global Flags
//!
//! These flags are available on all commands:
//! - `--help` / `-h`: Show help
//! - `--version`: Show version
//! - `--config <path>`: Use this configuration file
//! - `--debug`: Enable debug logging
//! - `--quiet` / `-q`: Minimal output

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// sitegit - persist site content as atomic commits in a remote git repository
#[derive(Parser, Debug)]
#[command(name = "sitegit")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Configuration file (overrides $SITEGIT_CONFIG and the default locations)
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Enable debug logging
    #[arg(long, global = true)]
    pub debug: bool,

    /// Minimal output
    #[arg(short, long, global = true, conflicts_with = "debug")]
    pub quiet: bool,

    #[command(subcommand)]
    pub command: Command,
}

impl Cli {
    /// Parse command-line arguments.
    pub fn parse_args() -> Self {
        Parser::parse()
    }
}

/// Available commands.
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Show the tip of the content branch
    #[command(
        name = "tip",
        long_about = "Show the commit and tree the content branch currently points at.",
        after_help = "\
EXAMPLES:
    # Which commit is live?
    sitegit tip"
    )]
    Tip,

    /// Read or edit the about document
    #[command(subcommand)]
    About(AboutCommand),

    /// Read or post guestbook messages
    #[command(subcommand)]
    Guestbook(GuestbookCommand),

    /// Commit local files to the content branch in one commit
    #[command(
        name = "commit",
        long_about = "Commit one or more local files to the content branch as a single commit.\n\n\
            Each argument maps a path in the content repository to a local file. All files \
            land in one new commit on top of the current tip, or none do.",
        after_help = "\
EXAMPLES:
    # Replace two data files at once
    sitegit commit -m \"Refresh media lists\" \\
        public/photos/list.json=./photos.json \\
        public/videos/list.json=./videos.json"
    )]
    Commit {
        /// Commit message
        #[arg(short, long)]
        message: String,

        /// REPO_PATH=LOCAL_FILE pairs
        #[arg(value_name = "REPO_PATH=LOCAL_FILE", required = true)]
        files: Vec<String>,
    },

    /// Generate shell completion scripts
    #[command(
        name = "completion",
        after_help = "\
EXAMPLES:
    # Bash
    sitegit completion bash > ~/.local/share/bash-completion/completions/sitegit

    # Zsh
    sitegit completion zsh > ~/.zfunc/_sitegit

    # Fish
    sitegit completion fish > ~/.config/fish/completions/sitegit.fish"
    )]
    Completion {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

/// About document commands.
#[derive(Subcommand, Debug)]
pub enum AboutCommand {
    /// Print the about document
    Show,

    /// Change fields of the about document and save it
    #[command(
        long_about = "Change fields of the about document and save it.\n\n\
            The document is read at the current tip and saved against that same tip. If \
            someone else saved in between, nothing is written and the command fails.",
        after_help = "\
EXAMPLES:
    # Update the title only
    sitegit about save --title \"About me\"

    # Replace the body from a markdown file
    sitegit about save --content-file about.md"
    )]
    Save {
        /// New title
        #[arg(long)]
        title: Option<String>,

        /// New description
        #[arg(long)]
        description: Option<String>,

        /// Markdown file holding the new body
        #[arg(long, value_name = "FILE")]
        content_file: Option<PathBuf>,
    },
}

/// Guestbook commands.
#[derive(Subcommand, Debug)]
pub enum GuestbookCommand {
    /// List guestbook messages, oldest first
    List,

    /// Post a guestbook message
    Post {
        /// Name shown on the message card
        #[arg(long)]
        nickname: String,

        /// Message text
        #[arg(long)]
        content: String,
    },
}

/// Supported shells for completion
#[derive(clap::ValueEnum, Debug, Clone, Copy)]
#[allow(clippy::enum_variant_names)]
pub enum Shell {
    Bash,
    Zsh,
    Fish,
    PowerShell,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn parses_commit_pairs() {
        let cli = Cli::try_parse_from([
            "sitegit",
            "commit",
            "-m",
            "msg",
            "a.json=./a.json",
            "b/c.json=./c.json",
        ])
        .unwrap();
        match cli.command {
            Command::Commit { message, files } => {
                assert_eq!(message, "msg");
                assert_eq!(files, vec!["a.json=./a.json", "b/c.json=./c.json"]);
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn global_flags_after_subcommand() {
        let cli =
            Cli::try_parse_from(["sitegit", "guestbook", "list", "--debug", "--config", "x.toml"])
                .unwrap();
        assert!(cli.debug);
        assert_eq!(cli.config, Some(PathBuf::from("x.toml")));
    }

    #[test]
    fn quiet_conflicts_with_debug() {
        assert!(Cli::try_parse_from(["sitegit", "-q", "--debug", "tip"]).is_err());
    }
}
