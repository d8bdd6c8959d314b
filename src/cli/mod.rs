use clap::Parser;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

const DEFAULT_LOG_FILTER: &str = "yt_transcript=warn";
const DEBUG_LOG_DIRECTIVE: &str = "yt_transcript=debug";

#[derive(Parser, Debug)]
#[command(
    name = "yt-transcript",
    about = "Extract the text transcript of a YouTube video",
    version,
    long_about = "Fetches the caption track of a YouTube video in one of the preferred languages, cleans it up into plain text, prints it and saves it to a file named after the video title. Languages are never substituted: if none of the requested languages is available the run fails."
)]
pub struct Cli {
    /// YouTube URL (watch, youtu.be, embed, shorts, mobile) or bare video ID
    #[arg(value_name = "URL_OR_ID")]
    pub url: String,

    /// Preferred language code, can be given multiple times (default: en)
    #[arg(short = 'l', long = "lang", value_name = "CODE")]
    pub languages: Vec<String>,

    /// Directory to save the transcript file in (default: current directory)
    #[arg(short, long, value_name = "DIR")]
    pub output_dir: Option<PathBuf>,

    /// Keep bracketed stage directions like [Music]
    #[arg(long)]
    pub keep_stage: bool,

    /// Don't save to file, only print to console
    #[arg(long)]
    pub no_save: bool,

    /// Enable debug output to troubleshoot issues
    #[arg(short, long)]
    pub debug: bool,

    /// List the available caption languages and exit
    #[arg(long)]
    pub list_languages: bool,

    /// Only print the transcript, no status lines or progress
    #[arg(short, long)]
    pub quiet: bool,

    /// Path to a YAML config file
    #[arg(long, value_name = "FILE", env = "YT_TRANSCRIPT_CONFIG")]
    pub config: Option<PathBuf>,
}

impl Cli {
    /// Log filter from `RUST_LOG` (or the default), with `--debug` turning on
    /// this crate's debug output on top of whatever the environment asks for
    pub fn log_filter(&self, env: Option<&str>) -> EnvFilter {
        let mut filter = env
            .filter(|directives| !directives.trim().is_empty())
            .and_then(|directives| EnvFilter::try_new(directives).ok())
            .unwrap_or_else(|| EnvFilter::new(DEFAULT_LOG_FILTER));

        if self.debug {
            if let Ok(directive) = DEBUG_LOG_DIRECTIVE.parse() {
                filter = filter.add_directive(directive);
            }
        }
        filter
    }
}
