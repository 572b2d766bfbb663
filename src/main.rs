use std::io::{self, BufRead};
use std::path::PathBuf;
use std::sync::Arc;

use eyre::{Result, bail};
use log::{debug, info};

mod cli;

use cli::{Cli, Command, OutputFormat};
use ytsum::config::Config;
use ytsum::history::History;
use ytsum::output;
use ytsum::store::JsonFileStore;
use ytsum::summarize::{OpenAiClient, SummaryGenerator};
use ytsum::transcript::TranscriptChain;
use ytsum::workflow::{SummarizeRequest, SummarizeResponse, Summarizer};
use ytsum::youtube::YouTubeClient;

fn setup_logging() -> Result<()> {
    let log_dir = log_dir();
    std::fs::create_dir_all(&log_dir)?;
    let log_file = log_dir.join("ytsum.log");

    let target = Box::new(std::fs::OpenOptions::new().create(true).append(true).open(&log_file)?);

    env_logger::Builder::from_default_env()
        .target(env_logger::Target::Pipe(target))
        .init();

    info!("Logging initialized: {}", log_file.display());
    Ok(())
}

fn log_dir() -> PathBuf {
    ytsum::config::default_data_dir().join("logs")
}

fn env_opt(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.trim().is_empty())
}

fn build_after_help() -> String {
    let key_line = |name: &str| match env_opt(name) {
        Some(_) => format!("  \x1b[32m✅\x1b[0m {name}"),
        None => format!("  \x1b[31m❌\x1b[0m {name} (not set)"),
    };

    format!(
        "\nREQUIRED ENVIRONMENT:\n{}\n{}\n\nConfig file: {}\nLogs are written to: {}",
        key_line("YOUTUBE_API_KEY"),
        key_line("OPENAI_API_KEY"),
        ytsum::config::config_path().display(),
        log_dir().join("ytsum.log").display()
    )
}

#[tokio::main]
async fn main() -> Result<()> {
    setup_logging()?;

    let after_help = build_after_help();
    let cmd = <Cli as clap::CommandFactory>::command().after_help(after_help);
    let matches = cmd.get_matches();
    let cli = <Cli as clap::FromArgMatches>::from_arg_matches(&matches)?;

    // Load config file (non-fatal if missing/invalid)
    let config = Config::load().unwrap_or_default();

    let data_dir = config.data_dir();
    if cli.verbose {
        let config_path = ytsum::config::config_path();
        if config_path.exists() {
            eprintln!("Config: {}", config_path.display());
        }
        eprintln!("Data: {}", data_dir.display());
    }

    let store = Arc::new(JsonFileStore::open(&data_dir)?);
    let user = cli.user.clone().or_else(|| config.default_user.clone());

    match cli.command {
        Command::Summarize { url, lang, model } => {
            let client = reqwest::Client::new();
            let youtube = Arc::new(
                YouTubeClient::new(client.clone(), env_opt("YOUTUBE_API_KEY"))
                    .with_base_urls(env_opt("YTSUM_YOUTUBE_API_BASE"), env_opt("YTSUM_YOUTUBE_WEB_BASE")),
            );
            let lang = lang.unwrap_or_else(|| config.lang().to_string());
            let model = model.unwrap_or_else(|| config.model().to_string());
            debug!("Summarizing with lang={lang} model={model}");

            let openai = Arc::new(
                OpenAiClient::new(client, env_opt("OPENAI_API_KEY"), model)
                    .with_base_url(env_opt("YTSUM_OPENAI_API_BASE")),
            );
            let summarizer = Summarizer::new(
                store.clone(),
                store.clone(),
                TranscriptChain::new(youtube.clone(), youtube, lang),
                SummaryGenerator::new(openai).with_limits(config.max_transcript_chars(), config.max_tokens()),
            )
            .with_provisioning(config.provision_missing_users(), config.starting_credits());

            // Collect URLs: from arg or stdin
            let urls = if let Some(url) = url {
                vec![url]
            } else {
                let stdin = io::stdin();
                stdin.lock().lines().collect::<Result<Vec<_>, _>>()?
            };
            let urls: Vec<String> = urls.into_iter().filter(|u| !u.trim().is_empty()).collect();

            if urls.is_empty() {
                bail!("no URL provided\n\nUsage: ytsum summarize <URL>\n       echo <URL> | ytsum summarize");
            }

            let mut failed = false;
            for url in urls {
                let request = SummarizeRequest::new(url, user.clone().unwrap_or_default());
                let response = summarizer.handle(&request).await;
                match (&response, cli.format) {
                    (_, OutputFormat::Json) => println!("{}", output::render_json(&response)),
                    (SummarizeResponse::Success(report), OutputFormat::Text) => {
                        println!("{}", output::render_report(report))
                    }
                    (SummarizeResponse::Failure { user_message, .. }, OutputFormat::Text) => {
                        eprintln!("error: {user_message}")
                    }
                }
                failed |= matches!(response, SummarizeResponse::Failure { .. });
            }
            if failed {
                std::process::exit(1);
            }
        }
        Command::History { page } => {
            let history = History::new(store.clone(), store);
            let result = async {
                let account = history.user_by_email(user.as_deref().unwrap_or_default()).await?;
                history.list(&account.id, page, config.page_size()).await
            }
            .await;
            match result {
                Ok(page) => match cli.format {
                    OutputFormat::Json => println!("{}", output::render_json(&page)),
                    OutputFormat::Text => println!("{}", output::render_history(&page)),
                },
                Err(e) => fail(&e, cli.format),
            }
        }
        Command::Show { id } => {
            let history = History::new(store.clone(), store);
            match history.get(&id).await {
                Ok(record) => match cli.format {
                    OutputFormat::Json => println!("{}", output::render_json(&record)),
                    OutputFormat::Text => println!("{}", output::render_record(&record)),
                },
                Err(e) => fail(&e, cli.format),
            }
        }
        Command::Delete { id } => {
            let history = History::new(store.clone(), store);
            let result = async {
                let account = history.user_by_email(user.as_deref().unwrap_or_default()).await?;
                history.delete(&id, &account.id).await
            }
            .await;
            match result {
                Ok(()) => match cli.format {
                    OutputFormat::Json => println!("{}", serde_json::json!({ "success": true })),
                    OutputFormat::Text => println!("Deleted summary {id}"),
                },
                Err(e) => fail(&e, cli.format),
            }
        }
        Command::Credits => {
            let history = History::new(store.clone(), store);
            match history.user_by_email(user.as_deref().unwrap_or_default()).await {
                Ok(account) => match cli.format {
                    OutputFormat::Json => println!("{}", serde_json::json!({ "credits": account.credits })),
                    OutputFormat::Text => println!("{} credits remaining", account.credits),
                },
                Err(e) => fail(&e, cli.format),
            }
        }
    }

    Ok(())
}

/// Report a failure the way the chosen format expects and exit
fn fail(err: &ytsum::Error, format: OutputFormat) -> ! {
    debug!("Command failed: {err}");
    match format {
        OutputFormat::Json => println!(
            "{}",
            serde_json::json!({ "success": false, "errorCode": err.code(), "userMessage": err.user_message() })
        ),
        OutputFormat::Text => eprintln!("error: {}", err.user_message()),
    }
    std::process::exit(err.exit_code());
}
