use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Result;
use clap::{Parser, Subcommand};
use colored::Colorize;
use dotenv::dotenv;
use indicatif::{ProgressBar, ProgressStyle};
use rustyline::error::ReadlineError;
use rustyline::history::DefaultHistory;
use rustyline::Editor;
use tokio::net::TcpListener;

use esg_analyst::analysis::{CancelFlag, GreenwashingFinding, SustainabilityScore};
use esg_analyst::api;
use esg_analyst::config::AppConfig;
use esg_analyst::rag::Answer;
use esg_analyst::session::AnalysisSession;

#[derive(Parser, Debug)]
#[command(author, version, about = "Citation-backed analysis of ESG report PDFs")]
struct Args {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Ingest a report PDF into the index
    Ingest { pdf: String },
    /// Ask one question against the ingested report
    Ask { question: Vec<String> },
    /// Interactive question loop
    Chat,
    /// Scan the ingested report for greenwashing-risk language
    Scan,
    /// Compute the sustainability score
    Score,
    /// Serve the JSON API
    Serve {
        #[arg(long)]
        bind: Option<String>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenv().ok();
    env_logger::init();

    let args = Args::parse();
    let config = AppConfig::from_env();
    let session = Arc::new(AnalysisSession::connect(&config).await?);

    match args.command {
        Command::Ingest { pdf } => {
            let spinner = ProgressBar::new_spinner();
            spinner.set_style(
                ProgressStyle::default_spinner()
                    .template("{spinner:.green} [{elapsed_precise}] {msg}")?,
            );
            spinner.set_message(format!("Ingesting {}", pdf));
            spinner.enable_steady_tick(std::time::Duration::from_millis(120));

            let summary = session.ingest(&pdf).await?;
            spinner.finish_with_message(format!(
                "Indexed {} ({} pages, {} chunks)",
                summary.source_file, summary.pages, summary.chunks
            ));
        }
        Command::Ask { question } => {
            let question = question.join(" ");
            let answer = session.ask(&question).await?;
            print_answer(&answer);
        }
        Command::Chat => run_chat(&session).await?,
        Command::Scan => {
            let findings = session.scan(&CancelFlag::new()).await?;
            print_findings(&findings);
        }
        Command::Score => {
            let report = session.score(&CancelFlag::new()).await?;
            print_score(&report);
        }
        Command::Serve { bind } => {
            let addr: SocketAddr = bind.unwrap_or_else(|| config.bind_addr.clone()).parse()?;
            let app = api::router(session);
            println!("Serving on {}", addr.to_string().bright_yellow());
            let listener = TcpListener::bind(&addr).await?;
            axum::serve(listener, app).await?;
        }
    }

    Ok(())
}

async fn run_chat(session: &Arc<AnalysisSession>) -> Result<()> {
    println!(
        "{}",
        "Ask questions about the ingested report. Ctrl-D to exit.".bright_cyan()
    );

    let mut rl = Editor::<(), DefaultHistory>::new()?;
    loop {
        match rl.readline("❓ ") {
            Ok(line) => {
                let question = line.trim();
                if question.is_empty() {
                    continue;
                }
                rl.add_history_entry(question)?;
                match session.ask(question).await {
                    Ok(answer) => print_answer(&answer),
                    Err(e) => println!("{}", e.to_string().red()),
                }
            }
            Err(ReadlineError::Interrupted) | Err(ReadlineError::Eof) => break,
            Err(err) => {
                println!("{}", format!("readline error: {err}").red());
                break;
            }
        }
    }
    Ok(())
}

fn print_answer(answer: &Answer) {
    println!("\n{}", answer.text.bright_green());
    if answer.insufficient_context {
        return;
    }
    if answer.citations.is_empty() {
        println!("{}", "(no citations returned)".yellow());
        return;
    }
    println!("{}", "Sources:".bright_cyan());
    for citation in &answer.citations {
        let excerpt: String = citation.excerpt.chars().take(120).collect();
        println!(
            "  {} page {}: {}",
            citation.document_id.bright_yellow(),
            citation.page,
            excerpt
        );
    }
}

fn print_findings(findings: &[GreenwashingFinding]) {
    if findings.is_empty() {
        println!("{}", "No greenwashing-risk language flagged.".bright_green());
        return;
    }
    println!(
        "{}",
        format!("{} finding(s), most severe first:", findings.len()).bright_cyan()
    );
    for finding in findings {
        let excerpt: String = finding.citation.excerpt.chars().take(160).collect();
        println!(
            "\n  [{}] {} (severity {}/5)",
            finding.probe.yellow(),
            finding.category.as_str().bright_red(),
            finding.severity
        );
        println!(
            "  page {}, matched {:?}",
            finding.citation.page,
            finding.matched
        );
        println!("  {}", excerpt);
    }
}

fn print_score(report: &SustainabilityScore) {
    println!(
        "\n{} {}",
        "Overall sustainability score:".bright_cyan(),
        format!("{:.1}/100", report.overall).bright_green()
    );
    for category in &report.categories {
        println!(
            "\n  {}: {:.1}/100{}",
            category.category.as_str().bright_yellow(),
            category.score,
            if category.insufficient_evidence {
                " (insufficient evidence)".red().to_string()
            } else {
                String::new()
            }
        );
        for note in &category.notes {
            println!("    - {}", note);
        }
        for citation in &category.citations {
            let excerpt: String = citation.excerpt.chars().take(100).collect();
            println!("    ↳ page {}: {}", citation.page, excerpt.dimmed());
        }
    }
}
