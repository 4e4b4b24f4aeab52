use clap::{value_parser, ArgAction, Parser};
use rand::Rng;
use std::path::PathBuf;
use std::time::Duration;

use crate::client::{CloudClient, DEFAULT_ENDPOINT};
use crate::error::{CloudError, Result};
use crate::types::GenerationResult;
use crate::workflow::{self, WorkflowParams, DEFAULT_FPS, DEFAULT_FRAMES};

/// Environment variable holding the API key.
pub const API_KEY_ENV: &str = "COMFY_UI_API_KEY";
/// Environment variable overriding the service base URL.
pub const ENDPOINT_ENV: &str = "COMFY_CLOUD_URL";

pub const DEFAULT_OUTPUT: &str = "output.mp4";
pub const DEFAULT_POLL_INTERVAL_SECS: u64 = 5;
pub const DEFAULT_TIMEOUT_SECS: u64 = 600;

/// Generate a video from a text prompt with LTX-2 on ComfyUI Cloud.
///
/// Progress goes to stderr; on success one JSON line
/// `{"prompt_id", "filename", "output", "bytes"}` is printed to stdout.
#[derive(Parser, Debug, Clone)]
#[command(name = "generate-video", version)]
pub struct Cli {
    /// Prompt text. Multiple words are joined with spaces.
    #[arg(value_name = "PROMPT", allow_negative_numbers = true)]
    pub prompt: Vec<String>,

    /// Where to write the downloaded video.
    #[arg(short, long, value_name = "PATH", default_value = DEFAULT_OUTPUT)]
    pub output: PathBuf,

    /// Noise seed (random when omitted). The refinement pass uses seed + 1.
    #[arg(long)]
    pub seed: Option<u32>,

    /// Number of frames to generate.
    #[arg(long, default_value_t = DEFAULT_FRAMES, value_parser = value_parser!(u32).range(1..))]
    pub frames: u32,

    /// Output frame rate.
    #[arg(long, default_value_t = DEFAULT_FPS, value_parser = value_parser!(u32).range(1..))]
    pub fps: u32,

    /// Base URL of the ComfyUI Cloud API.
    #[arg(long, value_name = "URL", env = ENDPOINT_ENV, default_value = DEFAULT_ENDPOINT)]
    pub base_url: String,

    /// Seconds between status polls.
    #[arg(long, value_name = "SECS", default_value_t = DEFAULT_POLL_INTERVAL_SECS, value_parser = value_parser!(u64).range(1..))]
    pub poll_interval: u64,

    /// Seconds to wait for the job before giving up.
    #[arg(long, value_name = "SECS", default_value_t = DEFAULT_TIMEOUT_SECS, value_parser = value_parser!(u64).range(1..))]
    pub timeout: u64,

    /// Increase log verbosity (-v: debug, -vv: trace).
    #[arg(short = 'v', long = "verbose", action = ArgAction::Count)]
    pub verbose: u8,

    /// Explicit tracing filter (overrides RUST_LOG and -v).
    #[arg(long, value_name = "FILTER")]
    pub log_filter: Option<String>,
}

/// Parameters of one generation run, fixed once parsed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenerationOptions {
    pub prompt: String,
    pub seed: u32,
    pub frame_count: u32,
    pub fps: u32,
    pub output_path: PathBuf,
}

impl GenerationOptions {
    /// Join the prompt words and resolve the seed. Fails with
    /// [`CloudError::MissingPrompt`] if no prompt text was given.
    pub fn from_cli(cli: &Cli) -> Result<Self> {
        let prompt = cli.prompt.join(" ");
        if prompt.trim().is_empty() {
            return Err(CloudError::MissingPrompt);
        }
        Ok(Self {
            prompt,
            seed: cli.seed.unwrap_or_else(|| rand::rng().random()),
            frame_count: cli.frames,
            fps: cli.fps,
            output_path: cli.output.clone(),
        })
    }

    pub fn workflow_params(&self) -> WorkflowParams {
        WorkflowParams {
            seed: self.seed,
            frame_count: self.frame_count,
            fps: self.fps,
        }
    }

    /// Clip length in seconds.
    pub fn duration_secs(&self) -> f64 {
        f64::from(self.frame_count) / f64::from(self.fps)
    }
}

/// Read the API key from [`API_KEY_ENV`]; an empty value counts as missing.
pub fn api_key_from_env() -> Option<String> {
    std::env::var(API_KEY_ENV).ok().filter(|key| !key.is_empty())
}

/// Run one generation end to end: build, submit, wait, download.
///
/// The credential and prompt are checked before any request is made.
pub async fn run(cli: Cli, api_key: Option<String>) -> Result<GenerationResult> {
    let api_key = api_key
        .filter(|key| !key.is_empty())
        .ok_or(CloudError::MissingCredential)?;
    let options = GenerationOptions::from_cli(&cli)?;

    eprintln!("Prompt:  {}", options.prompt);
    eprintln!("Seed:    {}", options.seed);
    eprintln!(
        "Frames:  {} ({:.1}s @ {}fps)",
        options.frame_count,
        options.duration_secs(),
        options.fps
    );
    eprintln!("Output:  {}", options.output_path.display());

    let workflow = workflow::build(&options.prompt, &options.workflow_params());
    let client = CloudClient::new(api_key).with_endpoint(cli.base_url.as_str());

    let prompt_id = client.submit(&workflow).await?;
    eprintln!("Job submitted: {}", prompt_id);

    client
        .wait_for_completion(
            &prompt_id,
            Duration::from_secs(cli.poll_interval),
            Duration::from_secs(cli.timeout),
            |update| eprintln!("[{}] {}s", update.status, update.elapsed.as_secs()),
        )
        .await?;

    let filename = client.output_filename(&prompt_id).await?;
    eprintln!("Downloading: {}", filename);
    let bytes = client.download(&filename, &options.output_path).await?;
    eprintln!(
        "Saved {:.1} MB to {}",
        bytes as f64 / 1024.0 / 1024.0,
        options.output_path.display()
    );

    Ok(GenerationResult {
        prompt_id,
        filename,
        output: options.output_path.display().to_string(),
        bytes,
    })
}
