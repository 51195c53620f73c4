use chrono::{TimeZone, Utc};
use clap::Subcommand;
use serde_json::json;
use std::io::{self, BufRead, Write};

use crate::auth::expiry::now_ms;
use crate::auth::CookieOptions;
use crate::config::config;
use crate::cli::config::connect;
use crate::cli::utils::{output_error, output_success};
use crate::cli::OutputFormat;

#[derive(Subcommand)]
pub enum AuthCommands {
    #[command(about = "Login to the backend")]
    Login {
        #[arg(help = "Username")]
        username: String,
        #[arg(long, help = "Password (will prompt if not provided)")]
        password: Option<String>,
    },

    #[command(about = "Logout and clear the stored session")]
    Logout,

    #[command(about = "Show current authentication status")]
    Status,

    #[command(about = "Refresh authentication token")]
    Refresh,

    #[command(about = "Show current user profile")]
    Whoami,

    #[command(about = "Print the session as Set-Cookie headers for the dashboard")]
    Cookies,

    #[command(about = "Set the preferred locale")]
    Locale {
        #[arg(help = "Locale code, e.g. en or id")]
        locale: String,
    },
}

pub async fn handle(cmd: AuthCommands, output_format: OutputFormat) -> anyhow::Result<()> {
    let client = connect()?;
    let tokens = client.tokens();

    match cmd {
        AuthCommands::Login { username, password } => {
            let password = match password {
                Some(password) => password,
                None => prompt("Password: ")?,
            };

            match tokens.login(&username, &password).await {
                Ok(login) => {
                    let message = if login.message.is_empty() {
                        format!("Logged in as {}", username)
                    } else {
                        login.message.clone()
                    };
                    output_success(
                        &output_format,
                        &message,
                        Some(json!({
                            "username": username,
                            "role_id": login.user.as_ref().map(|u| u.role_id.clone()),
                            "expired_token": login.expired_token,
                        })),
                    )
                }
                Err(e) => output_error(&output_format, &e.to_string(), Some(e.error_code())),
            }
        }
        AuthCommands::Logout => {
            tokens.logout().await?;
            output_success(&output_format, "Logged out", None)
        }
        AuthCommands::Status => {
            let state = tokens.state().await;
            let expires_at = state.expires_at();
            let expired = state.is_token_expired(now_ms());
            let user = state.user();

            match output_format {
                OutputFormat::Json => {
                    println!(
                        "{}",
                        serde_json::to_string_pretty(&json!({
                            "logged_in": state.is_logged_in(),
                            "expired": expired,
                            "expires_at": expires_at,
                            "user": user,
                            "locale": state.locale().unwrap_or(&config().session.default_locale),
                            "server": client.base_url(),
                        }))?
                    );
                }
                OutputFormat::Text => {
                    if !state.is_logged_in() {
                        println!("Not logged in ({})", client.base_url());
                        return Ok(());
                    }
                    let who = user.map(|u| u.username).unwrap_or_else(|| "unknown user".to_string());
                    println!("Logged in as {} on {}", who, client.base_url());
                    match Utc.timestamp_millis_opt(expires_at).single() {
                        Some(at) if expires_at > 0 => {
                            let state_label = if expired { "expired" } else { "valid" };
                            println!("Token {} until {}", state_label, at.to_rfc3339());
                        }
                        _ => println!("Token expiry unknown"),
                    }
                    println!("Locale: {}", state.locale().unwrap_or(&config().session.default_locale));
                }
            }
            Ok(())
        }
        AuthCommands::Refresh => match tokens.refresh().await {
            Ok(_) => {
                let expires_at = tokens.state().await.expires_at();
                output_success(
                    &output_format,
                    "Token refreshed",
                    Some(json!({ "expires_at": expires_at })),
                )
            }
            Err(e) => output_error(&output_format, &e.to_string(), Some(e.error_code())),
        },
        AuthCommands::Whoami => {
            let user = client.profile().await?;
            match output_format {
                OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&user)?),
                OutputFormat::Text => {
                    println!("{} ({})", user.fullname, user.username);
                    println!("Email: {}", user.email);
                    println!("Role: {}", user.role);
                }
            }
            Ok(())
        }
        AuthCommands::Cookies => {
            let state = tokens.state().await;
            if !state.is_logged_in() {
                return output_error(&output_format, "Not logged in", Some("UNAUTHENTICATED"));
            }
            let options = CookieOptions::new(config().session.cookie_secure);
            let headers = state.set_cookie_headers(&options, now_ms());
            match output_format {
                OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&json!({ "cookies": headers }))?),
                OutputFormat::Text => {
                    for header in headers {
                        println!("Set-Cookie: {}", header);
                    }
                }
            }
            Ok(())
        }
        AuthCommands::Locale { locale } => {
            tokens.set_locale(&locale).await?;
            output_success(
                &output_format,
                &format!("Locale set to {}", locale),
                Some(json!({ "locale": locale })),
            )
        }
    }
}

fn prompt(label: &str) -> anyhow::Result<String> {
    print!("{}", label);
    io::stdout().flush()?;
    let mut line = String::new();
    io::stdin().lock().read_line(&mut line)?;
    Ok(line.trim_end_matches(['\r', '\n']).to_string())
}
