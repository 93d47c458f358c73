//! CLI entry point for the Outlook authentication core.

pub mod auth;

use clap::{Parser, Subcommand};

/// Outlook MCP auth CLI
#[derive(Parser, Debug)]
#[command(
    name = "outlook-auth",
    version,
    about = "Inspect and manage Outlook MCP sign-in state"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

/// Top-level CLI commands.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Manage registered accounts
    Accounts(AccountsArgs),
    /// Show authentication status
    Status,
    /// Resolve a bearer token the way a tool handler would
    Token(TokenArgs),
    /// Store a local test token in the legacy slot
    TestToken,
    /// Forget the legacy single-account token
    Logout,
}

/// Arguments for the `accounts` subcommand group.
#[derive(Parser, Debug)]
pub struct AccountsArgs {
    #[command(subcommand)]
    pub command: AccountsCommands,
}

#[derive(Subcommand, Debug)]
pub enum AccountsCommands {
    /// List accounts in registration order
    List,
    /// Remove an account and its stored tokens
    Remove {
        /// Account id
        id: String,
    },
    /// Show one account by id or email
    Show {
        /// Account id or user principal name
        account: String,
    },
}

/// Arguments for `outlook-auth token`.
#[derive(Parser, Debug)]
pub struct TokenArgs {
    /// Account id (defaults to the first account with a valid token)
    #[arg(short, long)]
    pub account: Option<String>,

    /// Require a fresh sign-in instead of stored credentials
    #[arg(long)]
    pub force_new: bool,

    /// Print the full token instead of a redacted prefix
    #[arg(long)]
    pub reveal: bool,
}

impl Cli {
    /// Parse CLI arguments.
    pub fn parse_args() -> Self {
        Self::parse()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    #[test]
    fn parse_accounts_list() {
        let cli = Cli::try_parse_from(["outlook-auth", "accounts", "list"]).unwrap();
        match cli.command {
            Commands::Accounts(args) => assert!(matches!(args.command, AccountsCommands::List)),
            other => panic!("expected Accounts, got {other:?}"),
        }
    }

    #[test]
    fn parse_accounts_remove_requires_id() {
        assert!(Cli::try_parse_from(["outlook-auth", "accounts", "remove"]).is_err());
        let cli = Cli::try_parse_from(["outlook-auth", "accounts", "remove", "abc"]).unwrap();
        match cli.command {
            Commands::Accounts(AccountsArgs {
                command: AccountsCommands::Remove { id },
            }) => assert_eq!(id, "abc"),
            other => panic!("expected Remove, got {other:?}"),
        }
    }

    #[test]
    fn parse_token_flags() {
        let cli = Cli::try_parse_from([
            "outlook-auth",
            "token",
            "--account",
            "abc",
            "--force-new",
        ])
        .unwrap();
        match cli.command {
            Commands::Token(args) => {
                assert_eq!(args.account.as_deref(), Some("abc"));
                assert!(args.force_new);
                assert!(!args.reveal);
            }
            other => panic!("expected Token, got {other:?}"),
        }
    }

    #[test]
    fn parse_status_and_logout() {
        let cli = Cli::try_parse_from(["outlook-auth", "status"]).unwrap();
        assert!(matches!(cli.command, Commands::Status));
        let cli = Cli::try_parse_from(["outlook-auth", "test-token"]).unwrap();
        assert!(matches!(cli.command, Commands::TestToken));
        let cli = Cli::try_parse_from(["outlook-auth", "logout"]).unwrap();
        assert!(matches!(cli.command, Commands::Logout));
    }

    #[test]
    fn unknown_command_is_rejected() {
        assert!(Cli::try_parse_from(["outlook-auth", "login"]).is_err());
    }
}
