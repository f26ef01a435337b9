use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::Utc;

use seo_report_composer::config::Config;
use seo_report_composer::db::Repository;
use seo_report_composer::error::{AppError, Result};
use seo_report_composer::models::Scan;
use seo_report_composer::report::render_seo_report;
use seo_report_composer::server::{self, AppState};
use seo_report_composer::services::LocalQuota;

const USAGE: &str = "usage: seo-reporter [serve] [--config <path>]
       seo-reporter render <scan.json> <out.pdf> [--ai]
       seo-reporter set-plan <user_id> <plan> [--config <path>]";

enum Command {
    Serve { config: Option<PathBuf> },
    Render { scan: PathBuf, out: PathBuf, ai: bool },
    SetPlan {
        user_id: String,
        plan: String,
        config: Option<PathBuf>,
    },
}

fn parse_args(args: &[String]) -> Result<Command> {
    match args.first().map(String::as_str) {
        Some("render") => {
            let rest = &args[1..];
            let ai = rest.iter().any(|a| a == "--ai");
            let paths: Vec<&String> = rest.iter().filter(|a| *a != "--ai").collect();
            match paths.as_slice() {
                [scan, out] => Ok(Command::Render {
                    scan: PathBuf::from(scan),
                    out: PathBuf::from(out),
                    ai,
                }),
                _ => Err(AppError::Config(USAGE.to_string())),
            }
        }
        Some("set-plan") => match &args[1..] {
            [user_id, plan] => Ok(Command::SetPlan {
                user_id: user_id.clone(),
                plan: plan.clone(),
                config: None,
            }),
            [user_id, plan, flag, path] if flag == "--config" => Ok(Command::SetPlan {
                user_id: user_id.clone(),
                plan: plan.clone(),
                config: Some(PathBuf::from(path)),
            }),
            _ => Err(AppError::Config(USAGE.to_string())),
        },
        None | Some("serve") | Some("--config") => {
            let rest = match args.first().map(String::as_str) {
                Some("serve") => &args[1..],
                _ => args,
            };
            match rest {
                [] => Ok(Command::Serve { config: None }),
                [flag, path] if flag == "--config" => Ok(Command::Serve {
                    config: Some(PathBuf::from(path)),
                }),
                _ => Err(AppError::Config(USAGE.to_string())),
            }
        }
        Some(_) => Err(AppError::Config(USAGE.to_string())),
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args: Vec<String> = std::env::args().skip(1).collect();
    let command = parse_args(&args)?;

    // Server logs requests at info, one-off renders only warn
    let level = match command {
        Command::Serve { .. } => tracing::Level::INFO,
        Command::Render { .. } | Command::SetPlan { .. } => tracing::Level::WARN,
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env().add_directive(level.into()),
        )
        .with_writer(std::io::stderr)
        .init();

    match command {
        Command::Serve { config } => serve(config).await,
        Command::Render { scan, out, ai } => render(&scan, &out, ai),
        Command::SetPlan {
            user_id,
            plan,
            config,
        } => set_plan(&user_id, &plan, config).await,
    }
}

fn load_config(config_path: Option<PathBuf>) -> Result<Config> {
    match config_path {
        Some(path) => Config::load_from(&path),
        None => Config::load(),
    }
}

async fn serve(config_path: Option<PathBuf>) -> Result<()> {
    let config = load_config(config_path)?;

    let state = AppState::new(&config).await?;
    let app = server::router(state);

    let listener = tokio::net::TcpListener::bind(&config.bind_addr).await?;
    tracing::info!("Listening on {}", config.bind_addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                tracing::error!("Failed to listen for shutdown signal: {}", e);
            }
        })
        .await?;

    tracing::info!("Server stopped");
    Ok(())
}

/// Record a user's subscription plan in the local quota database.
async fn set_plan(user_id: &str, plan: &str, config_path: Option<PathBuf>) -> Result<()> {
    let config = load_config(config_path)?;
    if let Some(url) = &config.quota.remote_url {
        return Err(AppError::Config(format!(
            "plans are managed by the quota service at {}",
            url
        )));
    }

    let repository = Arc::new(Repository::new(&config.db_path).await?);
    let quota = LocalQuota::new(repository, config.quota.clone());
    quota.assign_plan(user_id, plan).await?;

    println!("{} is now on the {} plan", user_id.trim(), plan.trim());
    Ok(())
}

/// Render a scan exported as JSON straight to a PDF file, without storage or quota.
fn render(scan_path: &Path, out: &Path, include_ai: bool) -> Result<()> {
    let content = std::fs::read_to_string(scan_path)?;
    let scan: Scan = serde_json::from_str(&content)?;

    let document = render_seo_report(&scan, include_ai, scan.payload.ai.as_ref(), Utc::now());
    std::fs::write(out, &document.bytes)?;

    println!(
        "Wrote {} pages ({}) to {}",
        document.pages,
        document.sections.join(", "),
        out.display()
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(list: &[&str]) -> Vec<String> {
        list.iter().map(|a| a.to_string()).collect()
    }

    #[test]
    fn parses_set_plan_with_optional_config() {
        let command = parse_args(&args(&["set-plan", "u1", "pro"])).unwrap();
        assert!(matches!(
            command,
            Command::SetPlan { ref user_id, ref plan, config: None } if user_id == "u1" && plan == "pro"
        ));

        let command =
            parse_args(&args(&["set-plan", "u1", "pro", "--config", "/tmp/c.toml"])).unwrap();
        assert!(matches!(
            command,
            Command::SetPlan { config: Some(ref path), .. } if path == Path::new("/tmp/c.toml")
        ));

        assert!(parse_args(&args(&["set-plan", "u1"])).is_err());
    }

    #[test]
    fn serve_is_the_default_command() {
        assert!(matches!(parse_args(&[]).unwrap(), Command::Serve { config: None }));
        assert!(matches!(
            parse_args(&args(&["render", "scan.json", "out.pdf", "--ai"])).unwrap(),
            Command::Render { ai: true, .. }
        ));
    }
}
