//! # Chronograph CLI
//!
//! The `chronograph` binary is the display boundary of the generator: it
//! parses the request, drives the generation pipeline, and renders the
//! resulting report (or the reason there isn't one) to stdout.
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `chronograph generate` | Generate a newspaper issue for a date |
//! | `chronograph retrieve` | Show which corpus events a date would retrieve |
//!
//! ## Examples
//!
//! ```bash
//! # Generate three XVIII-century articles for Bastille Day
//! chronograph generate --date "14 July 1789" --era XVIII --count 3 --window 7
//!
//! # Inspect retrieval without calling the model
//! chronograph retrieve --date "07 September 1812" --window 30
//! ```

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use chronograph::config::load_config;
use chronograph::generate::Newsroom;
use chronograph::models::{Era, GenerationRequest, NewsReport};

#[derive(Parser, Debug)]
#[command(name = "chronograph", version, about = "Pseudo-historical newspaper generator")]
struct Cli {
    /// Path to the TOML configuration file.
    #[arg(long, global = true, default_value = "config/chronograph.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Generate a newspaper issue for a target date.
    Generate {
        /// Target date in display format, e.g. "14 July 1789".
        #[arg(long)]
        date: String,
        /// Era style.
        #[arg(long, value_enum, ignore_case = true, default_value_t = Era::Xviii)]
        era: Era,
        /// Number of articles to request (1-5).
        #[arg(long, default_value_t = 3)]
        count: usize,
        /// Day window around the target date; negative disables windowing.
        #[arg(long, default_value_t = 7, allow_hyphen_values = true)]
        window: i64,
    },
    /// Show the date-windowed retrieval result without invoking the model.
    Retrieve {
        /// Target date in display format, e.g. "14 July 1789".
        #[arg(long)]
        date: String,
        /// Number of candidates to keep.
        #[arg(long, default_value_t = 3)]
        count: usize,
        /// Day window around the target date; negative disables windowing.
        #[arg(long, default_value_t = 7, allow_hyphen_values = true)]
        window: i64,
    },
}

/// Negative window values disable windowing at the library boundary.
fn window_arg(window: i64) -> Option<i64> {
    if window < 0 {
        None
    } else {
        Some(window)
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = load_config(&cli.config)?;

    match cli.command {
        Commands::Generate {
            date,
            era,
            count,
            window,
        } => {
            let newsroom = Newsroom::new(config)?;

            let request = GenerationRequest {
                target_date: date.clone(),
                era,
                num_articles: count,
                window_days: window_arg(window),
            };

            let outcome = newsroom.generate_news(&request).await?;

            if let Some(error) = &outcome.error {
                eprintln!("Generation degraded: {error}");
                if let Some(raw) = error.raw_output() {
                    eprintln!("--- last raw model output ---\n{raw}\n---");
                }
            }

            if let Some(notice) = &outcome.notice {
                println!("{notice}");
            }

            print_report(&date, era, &outcome.report);
        }
        Commands::Retrieve {
            date,
            count,
            window,
        } => {
            // Retrieval never reaches the model, so no chat credentials.
            let newsroom = Newsroom::retrieval_only(config)?;
            let candidates = newsroom.retrieve(&date, count, window_arg(window)).await?;

            if candidates.is_empty() {
                println!("No events within the window of '{date}'.");
                return Ok(());
            }

            for (i, c) in candidates.iter().enumerate() {
                println!(
                    "{}. [{} | {} days off] {}",
                    i + 1,
                    c.date,
                    c.distance_days,
                    c.document.content
                );
            }
        }
    }

    Ok(())
}

fn print_report(date: &str, era: Era, report: &NewsReport) {
    if report.articles.is_empty() {
        println!("No issue could be produced for {date}.");
        return;
    }

    println!("═══ The Chronograph — issue of {date} ({era} century) ═══");
    for article in &report.articles {
        println!();
        println!("[{}] {}", article.rubric, article.headline);
        println!("{}", article.date_location);
        println!("{}", article.body);
        println!("    — {}", article.reporter);
    }
}
