use anyhow::Result;
use clap::Parser;
use console::style;
use std::process::ExitCode;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use yt_transcript::extractors::youtube::YoutubeClient;
use yt_transcript::output::format_track_list;
use yt_transcript::{Cli, Config, TranscriptPipeline};

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    // Initialize tracing
    let env_filter = std::env::var(tracing_subscriber::EnvFilter::DEFAULT_ENV).ok();
    tracing_subscriber::registry()
        .with(cli.log_filter(env_filter.as_deref()))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    match run(&cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            if cli.debug {
                eprintln!("{} {:?}", style("Error:").red().bold(), e);
            } else {
                eprintln!("{} {}", style("Error:").red().bold(), e);
            }
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: &Cli) -> Result<()> {
    let config = Config::load(cli.config.as_deref())?;
    let request = config.run_request(cli);

    let client = YoutubeClient::new(&config.http)?;
    let pipeline = TranscriptPipeline::new(Box::new(client.clone()), Box::new(client))
        .with_progress(!cli.quiet);

    if cli.list_languages {
        let (video_id, tracks) = pipeline.list_tracks(&request.input).await?;
        if !cli.quiet {
            println!("Available transcripts for {}:\n", video_id);
        }
        println!("{}", format_track_list(&tracks));
        return Ok(());
    }

    if !cli.quiet {
        println!("Fetching transcript for: {}", request.input);
        println!("Preferred languages: {}\n", request.languages);
    }

    let mut stdout = std::io::stdout();
    let result = pipeline.run(&request, &mut stdout).await?;

    if let Some(path) = &result.saved_to {
        if !cli.quiet {
            println!(
                "\n{} Transcript saved to: {}",
                style("✓").green(),
                path.display()
            );
        }
    }

    Ok(())
}
