//! `hisab` command-line client

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use hisab_app::{AppContext, HisabConfig};
use hisab_auth::{AccessDecision, AccessRequirement, Permission, PermissionMatch, Role};
use hisab_query::ResourceKey;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(name = "hisab", version, about = "Hisab bookkeeping client")]
struct Cli {
    /// Configuration file (TOML)
    #[arg(long, short, env = "HISAB_CONFIG", global = true)]
    config: Option<PathBuf>,

    /// Emit logs as JSON
    #[arg(long, global = true)]
    json_logs: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Show the signed-in user
    Whoami,
    /// Sign in from a saved login response
    Login {
        /// JSON file with `{"user": {...}}` or a bare user object
        #[arg(long)]
        file: PathBuf,
    },
    /// Sign out and forget the persisted identity
    Logout,
    /// Evaluate an access requirement for the signed-in user
    Check {
        /// Required permission (repeatable)
        #[arg(long = "permission", short = 'p')]
        permissions: Vec<Permission>,
        /// Require every listed permission instead of any
        #[arg(long)]
        all: bool,
        /// Accepted role (repeatable)
        #[arg(long = "role", short = 'r')]
        roles: Vec<Role>,
    },
    /// Fetch a resource collection
    Fetch {
        /// Resource key, e.g. `transactions`
        resource: ResourceKey,
    },
    /// Print the effective configuration
    Config,
}

fn init_tracing(json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);
    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}

fn requirement(permissions: Vec<Permission>, all: bool, roles: Vec<Role>) -> AccessRequirement {
    let mut requirement = AccessRequirement::new();
    if !permissions.is_empty() {
        let matching = if all { PermissionMatch::All } else { PermissionMatch::Any };
        requirement = requirement.permissions(permissions, matching);
    }
    if !roles.is_empty() {
        requirement = requirement.roles(roles);
    }
    requirement
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let cli = Cli::parse();
    init_tracing(cli.json_logs);

    let config = HisabConfig::load(cli.config.as_deref()).context("loading configuration")?;
    if matches!(cli.command, Command::Config) {
        print!("{}", config.to_toml_string()?);
        return Ok(ExitCode::SUCCESS);
    }

    let ctx = AppContext::from_config(config).context("starting application")?;

    match cli.command {
        Command::Whoami => match ctx.current_user() {
            Some(user) => {
                println!("{} ({})", user.display_name, user.username);
                println!("role: {}", user.role);
                let permissions: Vec<String> = user.permissions.iter().map(ToString::to_string).collect();
                println!("permissions: {}", permissions.join(", "));
            }
            None => {
                println!("not signed in");
                return Ok(ExitCode::FAILURE);
            }
        },
        Command::Login { file } => {
            let payload = std::fs::read_to_string(&file)
                .with_context(|| format!("reading {}", file.display()))?;
            let user = ctx.sign_in_json(&payload)?;
            println!("signed in as {} ({})", user.username, user.role);
        }
        Command::Logout => {
            ctx.sign_out()?;
            println!("signed out");
        }
        Command::Check {
            permissions,
            all,
            roles,
        } => match ctx.check(&requirement(permissions, all, roles)) {
            AccessDecision::Granted => println!("granted"),
            AccessDecision::Denied(reason) => {
                println!("denied: {reason}");
                return Ok(ExitCode::FAILURE);
            }
        },
        Command::Fetch { resource } => {
            let entry = ctx.fetch(&resource).await?;
            println!("{}", serde_json::to_string_pretty(entry.records())?);
            tracing::info!(%resource, records = entry.len(), "fetched");
        }
        Command::Config => {}
    }

    Ok(ExitCode::SUCCESS)
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
    fn check_arguments_parse() {
        let cli = Cli::parse_from([
            "hisab", "check", "-p", "view_reports", "-p", "manage_users", "--all", "--role", "admin",
        ]);
        let Command::Check {
            permissions,
            all,
            roles,
        } = cli.command
        else {
            panic!("expected check");
        };
        assert_eq!(permissions, vec![Permission::VIEW_REPORTS, Permission::MANAGE_USERS]);
        assert!(all);
        assert_eq!(roles, vec![Role::Admin]);
    }

    #[test]
    fn invalid_permission_is_rejected() {
        assert!(Cli::try_parse_from(["hisab", "check", "-p", "View Reports"]).is_err());
    }

    #[test]
    fn empty_check_is_unrestricted() {
        assert!(requirement(Vec::new(), false, Vec::new()).is_unrestricted());
    }
}
