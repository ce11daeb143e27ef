use std::{
    env, fs,
    io::{self, Read},
    path::{Path, PathBuf},
};

use anyhow::Context;
use cdraft_core::{
    compute_metrics, default_models, normalize, AnalysisOutcome, Config, RemoteClient,
    RewriteMode, Session, Severity, Suggestion,
};
use clap::{ArgAction, Parser, Subcommand};
use console::style;
use tracing_subscriber::EnvFilter;

/// ClearDraft CLI entry point.
#[derive(Debug, Parser)]
#[command(
    name = "cdraft",
    about = "Writing assistant: local heuristics plus optional remote analysis."
)]
struct Args {
    /// Path to config file (YAML). Defaults to cdraft.yml if present.
    #[arg(long, default_value = "cdraft.yml")]
    config: PathBuf,

    /// Override the relay endpoint from the config file.
    #[arg(long, value_name = "URL")]
    endpoint: Option<String>,

    /// Override the analysis model.
    #[arg(long, value_name = "ID")]
    model: Option<String>,

    /// Proxy credential; falls back to the CDRAFT_PROXY_TOKEN environment
    /// variable, then the config file.
    #[arg(long, value_name = "TOKEN")]
    token: Option<String>,

    /// Enable remote analysis for this invocation.
    #[arg(long, action = ArgAction::SetTrue)]
    remote: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Analyze text and print suggestions.
    Check {
        /// File to analyze; stdin when omitted.
        #[arg(value_name = "PATH")]
        path: Option<PathBuf>,

        /// Emit JSON output for automation.
        #[arg(long, action = ArgAction::SetTrue)]
        json: bool,

        /// Exit non-zero when any suggestion is produced.
        #[arg(long, action = ArgAction::SetTrue)]
        strict: bool,
    },
    /// Apply every automatic fix and print the updated text.
    Apply {
        #[arg(value_name = "PATH")]
        path: Option<PathBuf>,

        /// Rewrite the input file in place instead of printing.
        #[arg(long, action = ArgAction::SetTrue)]
        write: bool,
    },
    /// Rewrite the text in a different register.
    Rewrite {
        #[arg(value_name = "PATH")]
        path: Option<PathBuf>,

        /// One of: simplify, formal, friendly.
        #[arg(long)]
        mode: RewriteMode,

        #[arg(long, action = ArgAction::SetTrue)]
        write: bool,
    },
    /// Print word count, reading time, and readability.
    Metrics {
        #[arg(value_name = "PATH")]
        path: Option<PathBuf>,

        #[arg(long, action = ArgAction::SetTrue)]
        json: bool,
    },
    /// List models offered by the relay (falls back to the built-in list).
    Models {
        #[arg(long, action = ArgAction::SetTrue)]
        json: bool,
    },
    /// Check relay connectivity and credentials.
    Status,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(io::stderr)
        .init();

    let args = Args::parse();
    let mut config = load_config(&args.config)?;
    if let Some(endpoint) = args.endpoint {
        config.remote.endpoint = endpoint;
    }
    if let Some(model) = args.model {
        config.remote.model = model;
    }
    if let Some(token) = args
        .token
        .or_else(|| env::var("CDRAFT_PROXY_TOKEN").ok())
    {
        config.remote.proxy_token = Some(token);
    }
    if args.remote {
        config.remote.enabled = true;
    }

    match args.command {
        Command::Check { path, json, strict } => run_check(&config, path.as_deref(), json, strict).await,
        Command::Apply { path, write } => run_apply(&config, path.as_deref(), write).await,
        Command::Rewrite { path, mode, write } => {
            run_rewrite(&config, path.as_deref(), mode, write).await
        }
        Command::Metrics { path, json } => run_metrics(path.as_deref(), json),
        Command::Models { json } => run_models(&config, json).await,
        Command::Status => run_status(&config).await,
    }
}

fn load_config(path: &Path) -> anyhow::Result<Config> {
    if !path.exists() {
        return Ok(Config::default());
    }
    let text = fs::read_to_string(path)
        .with_context(|| format!("Failed to read config {}", path.display()))?;
    let cfg: Config = serde_yaml::from_str(&text)
        .with_context(|| format!("Invalid config structure in {}", path.display()))?;
    Ok(cfg)
}

fn read_input(path: Option<&Path>) -> anyhow::Result<String> {
    match path {
        Some(path) => {
            fs::read_to_string(path).with_context(|| format!("Failed to read {}", path.display()))
        }
        None => {
            let mut buffer = String::new();
            io::stdin()
                .read_to_string(&mut buffer)
                .context("Failed to read stdin")?;
            Ok(buffer)
        }
    }
}

fn write_output(path: Option<&Path>, write: bool, text: &str) -> anyhow::Result<()> {
    match (path, write) {
        (Some(path), true) => fs::write(path, text)
            .with_context(|| format!("Failed to write {}", path.display())),
        (None, true) => anyhow::bail!("--write requires a file path"),
        _ => {
            println!("{text}");
            Ok(())
        }
    }
}

async fn run_check(
    config: &Config,
    path: Option<&Path>,
    json: bool,
    strict: bool,
) -> anyhow::Result<()> {
    let input = read_input(path)?;
    let session = Session::new(config)?;
    session.replace_text(&input, false);
    let outcome = session.analyze().await;

    if json {
        println!("{}", serde_json::to_string_pretty(&outcome)?);
    } else {
        print_report(&outcome, &session.text());
    }

    if strict && !outcome.suggestions.is_empty() {
        std::process::exit(1);
    }
    Ok(())
}

fn print_report(outcome: &AnalysisOutcome, source: &str) {
    let metrics = &outcome.metrics;
    println!(
        "{} {} words, {} chars, ~{} min read, readability {}",
        style("Metrics:").bold(),
        metrics.word_count,
        metrics.char_count,
        metrics.reading_minutes,
        metrics.readability_score
    );
    if let Some(warning) = &outcome.remote_error {
        println!("{} {}", style("Note:").yellow().bold(), warning);
    }

    let groups = [
        ("Grammar", &outcome.suggestions.grammar),
        ("Clarity", &outcome.suggestions.clarity),
        ("Tone", &outcome.suggestions.tone),
        ("Rewrite", &outcome.suggestions.rewrite),
    ];
    for (label, list) in groups {
        if list.is_empty() {
            continue;
        }
        println!("\n{}", style(format!("{label} ({})", list.len())).bold());
        let mut ordered: Vec<&Suggestion> = list.iter().collect();
        ordered.sort_by(|a, b| b.severity.cmp(&a.severity).then(a.span.0.cmp(&b.span.0)));
        for suggestion in ordered {
            let severity = match suggestion.severity {
                Severity::High => style("high").red(),
                Severity::Medium => style("medium").yellow(),
                Severity::Low => style("low").dim(),
            };
            println!(
                "  [{severity}] {}..{} {}",
                suggestion.span.0, suggestion.span.1, suggestion.message
            );
            println!("        {}", style(suggestion.preview(source)).dim());
        }
    }

    if outcome.suggestions.is_empty() {
        println!("  {}", style("clean").green());
    }
}

async fn run_apply(config: &Config, path: Option<&Path>, write: bool) -> anyhow::Result<()> {
    let input = read_input(path)?;
    let session = Session::new(config)?;
    session.replace_text(&input, false);
    let outcome = session.analyze().await;
    if let Some(warning) = &outcome.remote_error {
        eprintln!("{} {}", style("Note:").yellow().bold(), warning);
    }

    match session.apply_all() {
        Ok(count) => {
            eprintln!("{}", style(format!("Applied {count} fixes")).green());
            write_output(path, write, &session.text())
        }
        Err(err) => {
            eprintln!("{}", style(err).yellow());
            write_output(path, write, &session.text())
        }
    }
}

async fn run_rewrite(
    config: &Config,
    path: Option<&Path>,
    mode: RewriteMode,
    write: bool,
) -> anyhow::Result<()> {
    let input = read_input(path)?;
    let session = Session::new(config)?;
    session.replace_text(&input, false);

    let outcome = session.rewrite(mode).await?;
    let source = if outcome.used_remote {
        "remote rewrite"
    } else {
        "local substitutions"
    };
    eprintln!("{}", style(format!("Rewrote ({mode}, {source})")).green());
    write_output(path, write, &outcome.text)
}

fn run_metrics(path: Option<&Path>, json: bool) -> anyhow::Result<()> {
    let input = read_input(path)?;
    let metrics = compute_metrics(&normalize(&input));
    if json {
        println!("{}", serde_json::to_string_pretty(&metrics)?);
    } else {
        println!(
            "{} words, {} chars, ~{} min read, readability {}",
            metrics.word_count, metrics.char_count, metrics.reading_minutes,
            metrics.readability_score
        );
    }
    Ok(())
}

async fn run_models(config: &Config, json: bool) -> anyhow::Result<()> {
    let client = RemoteClient::new(&config.remote)?;
    let models = match client.list_models().await {
        Ok(models) if !models.is_empty() => models,
        Ok(_) => {
            eprintln!("{}", style("Relay returned no models; using defaults").yellow());
            default_models()
        }
        Err(err) => {
            eprintln!(
                "{}",
                style(format!("Failed to fetch models ({err}); using defaults")).yellow()
            );
            default_models()
        }
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&models)?);
    } else {
        for model in models {
            println!("{}  {}", style(&model.id).cyan(), model.display_name);
        }
    }
    Ok(())
}

async fn run_status(config: &Config) -> anyhow::Result<()> {
    let client = RemoteClient::new(&config.remote)?;
    let status = client.check_credentials().await;
    let label = if status.ok {
        style(status.status.as_str()).green()
    } else {
        style(status.status.as_str()).red()
    };
    println!("{label}: {}", status.message);
    if !status.ok {
        std::process::exit(1);
    }
    Ok(())
}
