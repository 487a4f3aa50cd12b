use std::{
    fs,
    path::{Path, PathBuf},
    process::ExitCode,
};

use anyhow::{Context, Result, bail};
use clap::{Args, Parser, Subcommand};
use tos_decoder::{
    analysis::{AnalysisReport, AnalysisService, AnalysisSettings},
    config::try_init_config,
    extraction::{DocumentExtractor, LocalExtractor},
    logging,
    processing::{chunk_document, fingerprint, sanitize},
    session::DocumentSession,
};

/// Exit status used when the backend quota ran out mid-run.
const QUOTA_EXIT_CODE: u8 = 2;

#[derive(Parser)]
#[command(
    name = "tos-decoder-cli",
    about = "Summarize Terms of Service documents and flag risky clauses"
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run the full analysis and print the report as JSON.
    Analyze {
        #[command(flatten)]
        input: InputArgs,
        /// Write the report to this file instead of stdout.
        #[arg(long)]
        output: Option<PathBuf>,
    },
    /// Ask one or more questions about a document.
    Ask {
        #[command(flatten)]
        input: InputArgs,
        /// Question to ask; repeat to continue the conversation.
        #[arg(long = "question", required = true)]
        questions: Vec<String>,
    },
    /// Print the chunks the document would be split into.
    Chunk {
        #[command(flatten)]
        input: InputArgs,
        #[arg(long, default_value_t = AnalysisSettings::default().max_chars)]
        max_chars: usize,
        #[arg(long, default_value_t = AnalysisSettings::default().overlap_chars)]
        overlap_chars: usize,
    },
    /// Print the fingerprint of the sanitized document.
    Fingerprint {
        #[command(flatten)]
        input: InputArgs,
    },
}

#[derive(Args)]
#[group(required = true, multiple = false)]
struct InputArgs {
    /// Document to read (PDF, image, or text).
    #[arg(long)]
    file: Option<PathBuf>,
    /// Document text given inline.
    #[arg(long)]
    text: Option<String>,
}

#[tokio::main]
async fn main() -> ExitCode {
    match run().await {
        Ok(code) => code,
        Err(err) => {
            eprintln!("error: {err:#}");
            ExitCode::FAILURE
        }
    }
}

async fn run() -> Result<ExitCode> {
    let cli = Cli::parse();
    logging::init_tracing_stderr();
    match cli.command {
        Command::Analyze { input, output } => analyze(&input, output.as_deref()).await,
        Command::Ask { input, questions } => ask(&input, &questions).await,
        Command::Chunk {
            input,
            max_chars,
            overlap_chars,
        } => print_chunks(&input, max_chars, overlap_chars).await,
        Command::Fingerprint { input } => {
            let text = read_input(&input, &LocalExtractor::default()).await?;
            println!("{}", fingerprint(&sanitize(&text)));
            Ok(ExitCode::SUCCESS)
        }
    }
}

async fn analyze(input: &InputArgs, output: Option<&Path>) -> Result<ExitCode> {
    let config = try_init_config().context("failed to load configuration")?;
    let text = read_input(input, &LocalExtractor::with_config(config)).await?;
    let service = AnalysisService::from_config().context("failed to initialize backend")?;
    let report = service.analyze(text).await.context("analysis failed")?;

    let rendered = report
        .to_json_pretty()
        .context("failed to serialize report")?;
    match output {
        Some(path) => {
            fs::write(path, rendered)
                .with_context(|| format!("failed to write report to {}", path.display()))?;
            eprintln!("report written to {}", path.display());
        }
        None => println!("{rendered}"),
    }
    Ok(report_exit_code(&report))
}

async fn ask(input: &InputArgs, questions: &[String]) -> Result<ExitCode> {
    let config = try_init_config().context("failed to load configuration")?;
    let text = read_input(input, &LocalExtractor::with_config(config)).await?;
    let service = AnalysisService::from_config().context("failed to initialize backend")?;

    let mut session = DocumentSession::new(sanitize(&text));
    for question in questions {
        let turn = service
            .ask(&mut session, question)
            .await
            .with_context(|| format!("failed to ask {question:?}"))?;
        println!("Q: {}\nA: {}\n", question.trim(), turn.content);
    }
    Ok(ExitCode::SUCCESS)
}

async fn print_chunks(
    input: &InputArgs,
    max_chars: usize,
    overlap_chars: usize,
) -> Result<ExitCode> {
    let text = read_input(input, &LocalExtractor::default()).await?;
    let chunks = chunk_document(&sanitize(&text), max_chars, overlap_chars)
        .context("failed to chunk document")?;
    let rendered = serde_json::to_string_pretty(&chunks).context("failed to serialize chunks")?;
    println!("{rendered}");
    Ok(ExitCode::SUCCESS)
}

async fn read_input(input: &InputArgs, extractor: &dyn DocumentExtractor) -> Result<String> {
    match (&input.file, &input.text) {
        (Some(path), _) => extractor
            .extract(path)
            .await
            .with_context(|| format!("failed to extract text from {}", path.display())),
        (None, Some(text)) => Ok(text.clone()),
        (None, None) => bail!("either --file or --text is required"),
    }
}

fn report_exit_code(report: &AnalysisReport) -> ExitCode {
    if report.is_quota_exhausted() {
        eprintln!(
            "warning: backend quota exhausted at {:?}; partial results returned",
            report.exhausted_at
        );
        ExitCode::from(QUOTA_EXIT_CODE)
    } else {
        ExitCode::SUCCESS
    }
}
