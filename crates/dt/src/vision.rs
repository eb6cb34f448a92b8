use clap::Parser;
use dt_core::config::{
    VisionConfig, DEFAULT_QUESTION, DEFAULT_SCREENSHOT_BASE_URL, DEFAULT_TOKEN,
    DEFAULT_VISION_EXPLAIN_URL,
};
use dt_core::logging::init_tracing;
use dt_core::vision::ExplanationRequest;
use dt_vision::VisionClient;
use std::process::ExitCode;
use tracing::error;

#[derive(Parser, Debug)]
#[command(name = "dt-vision")]
#[command(about = "Grab a device screenshot and ask the vision service about it")]
#[command(version)]
struct Cli {
    /// Base URL of the device HTTP API, e.g. http://192.168.6.134:8080
    #[arg(
        long = "screenshot_base_url",
        visible_alias = "screenshot-base-url",
        env = "DROIDTAP_SCREENSHOT_BASE_URL",
        default_value = DEFAULT_SCREENSHOT_BASE_URL
    )]
    screenshot_base_url: String,

    /// Vision explanation endpoint
    #[arg(
        long = "vision_explain_url",
        visible_alias = "vision-explain-url",
        env = "DROIDTAP_VISION_EXPLAIN_URL",
        default_value = DEFAULT_VISION_EXPLAIN_URL
    )]
    vision_explain_url: String,

    /// Bearer token sent with both requests
    #[arg(long, env = "DROIDTAP_TOKEN", default_value = DEFAULT_TOKEN)]
    token: String,

    /// Question to ask about the screen
    #[arg(long, env = "DROIDTAP_QUESTION", default_value = DEFAULT_QUESTION)]
    question: String,
}

impl Cli {
    fn config(&self) -> VisionConfig {
        VisionConfig {
            screenshot_base_url: self.screenshot_base_url.clone(),
            vision_explain_url: self.vision_explain_url.clone(),
            token: self.token.clone(),
            ..VisionConfig::default()
        }
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing();

    let client = match VisionClient::new(cli.config()) {
        Ok(client) => client,
        Err(err) => {
            error!("{err}");
            return ExitCode::FAILURE;
        }
    };

    println!("Fetching screenshot from {}...", client.screenshot_url());
    let Some(image) = client.fetch_screenshot().await else {
        println!("Could not fetch a screenshot; nothing to explain.");
        return ExitCode::FAILURE;
    };
    println!("Fetched a {} byte screenshot.", image.len());

    println!(
        "Uploading to {} with question: '{}'...",
        cli.vision_explain_url, cli.question
    );
    let request = ExplanationRequest::new(image, cli.question);
    let Some(explanation) = client.explain(&request).await else {
        println!("Could not get an explanation.");
        return ExitCode::FAILURE;
    };

    println!("Explanation:");
    match serde_json::to_string_pretty(&explanation) {
        Ok(text) => println!("{text}"),
        Err(_) => println!("{explanation}"),
    }
    ExitCode::SUCCESS
}
