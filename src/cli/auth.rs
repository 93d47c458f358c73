//! CLI handlers for account, status and token commands.

use chrono::{DateTime, Utc};

use crate::auth::{AccountSummary, AuthService};
use crate::cli::{AccountsCommands, TokenArgs};

type CliResult = Result<(), Box<dyn std::error::Error>>;

/// Handle `outlook-auth accounts <command>`.
pub async fn handle_accounts(service: &AuthService, command: AccountsCommands) -> CliResult {
    let registry = service.registry();
    match command {
        AccountsCommands::List => {
            let accounts = registry.list().await;
            if accounts.is_empty() {
                println!("No accounts registered.");
            }
            for account in &accounts {
                println!("{}", account_line(account));
            }
        }
        AccountsCommands::Remove { id } => {
            if registry.remove(&id).await {
                println!("✅ Removed account {id}");
            } else {
                return Err(format!("unknown account: {id}").into());
            }
        }
        AccountsCommands::Show { account } => {
            let found = match registry.get(&account).await {
                Some(found) => Some(found),
                None => registry.find_by_email(&account).await,
            };
            let Some(found) = found else {
                return Err(format!("no account matches {account}").into());
            };
            let summary = AccountSummary::from(&found);
            println!("{}", serde_json::to_string_pretty(&summary)?);
            if let Some(expires) = found.tokens.as_ref().and_then(|t| t.expires_at_datetime()) {
                println!("token expires {}", format_time(expires));
            }
        }
    }
    Ok(())
}

/// Handle `outlook-auth status`.
pub async fn handle_status(service: &AuthService) -> CliResult {
    let status = service.status().await;

    println!("🔐 Authentication Status\n");
    if status.accounts.is_empty() {
        println!("  Accounts: none registered");
    }
    for account in &status.accounts {
        let marker = if status.default_account_id.as_deref() == Some(account.id.as_str()) {
            " (default)"
        } else {
            ""
        };
        println!("  {}{marker}", account_line(account));
    }

    let legacy = if status.legacy_token_live {
        "✅ Live"
    } else {
        "❌ None"
    };
    println!("\n  Legacy token: {legacy}");
    if status.test_mode {
        println!("  Test mode: enabled");
    }
    if !status.is_authenticated() {
        println!("\n{}", crate::error::AUTHENTICATION_REQUIRED_MESSAGE);
    }
    Ok(())
}

/// Handle `outlook-auth token`.
pub async fn handle_token(service: &AuthService, args: TokenArgs) -> CliResult {
    match service
        .ensure_authenticated(args.account.as_deref(), args.force_new)
        .await
    {
        Ok(token) if args.reveal => {
            println!("{token}");
            Ok(())
        }
        Ok(token) => {
            println!("{}", redact(&token));
            Ok(())
        }
        Err(error) => Err(error.user_message().into()),
    }
}

/// Handle `outlook-auth test-token`.
pub async fn handle_test_token(service: &AuthService) -> CliResult {
    let token = service.legacy().create_test_token().await;
    let expires = token
        .expires_at_datetime()
        .map(format_time)
        .unwrap_or_default();
    println!("✅ Test token stored (expires {expires})");
    Ok(())
}

/// Handle `outlook-auth logout`.
pub async fn handle_logout(service: &AuthService) -> CliResult {
    service.legacy().clear().await;
    println!("✅ Legacy token cleared");
    Ok(())
}

fn account_line(account: &AccountSummary) -> String {
    let state = if account.has_valid_tokens {
        "✅ valid token"
    } else {
        "⚠️  needs sign-in"
    };
    format!(
        "{} <{}> [{}] last used {}: {state}",
        account.display_name,
        account.user_principal_name,
        account.id,
        format_time(account.last_used)
    )
}

fn format_time(at: DateTime<Utc>) -> String {
    at.format("%Y-%m-%d %H:%M").to_string()
}

fn redact(token: &str) -> String {
    let prefix: String = token.chars().take(8).collect();
    format!("{prefix}… ({} chars)", token.chars().count())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn redact_keeps_only_a_short_prefix() {
        assert_eq!(redact("abcdefghijklmnop"), "abcdefgh… (16 chars)");
        assert_eq!(redact("abc"), "abc… (3 chars)");
    }
}
