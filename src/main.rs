use std::process::ExitCode;
use std::sync::Arc;

use flashnote::config::{self, FlashnoteConfig};
use flashnote::pipeline::batch::{ExtractionError, QaSeed, SeedRunner};
use flashnote::pipeline::oracle::{OllamaClient, Oracle};
use flashnote::pipeline::processor::{process_transcript, process_transcript_concurrent};

const USAGE: &str = "usage: flashnote <transcript-file>\n       flashnote --seeds <seeds.json>";

enum Command {
    Transcript(String),
    Seeds(String),
}

fn parse_args(args: &[String]) -> Option<Command> {
    match args {
        [flag, path] if flag == "--seeds" => Some(Command::Seeds(path.clone())),
        [path] if !path.starts_with('-') => Some(Command::Transcript(path.clone())),
        _ => None,
    }
}

fn main() -> ExitCode {
    let args: Vec<String> = std::env::args().skip(1).collect();
    let Some(command) = parse_args(&args) else {
        eprintln!("{USAGE}");
        return ExitCode::from(2);
    };

    flashnote::init_tracing();
    tracing::info!("{} starting v{}", config::APP_NAME, config::APP_VERSION);

    match run(command) {
        Ok(json) => {
            println!("{json}");
            ExitCode::SUCCESS
        }
        Err(e) => {
            tracing::error!(error = %e, "Run aborted");
            eprintln!("error: {e}");
            ExitCode::from(1)
        }
    }
}

fn run(command: Command) -> Result<String, ExtractionError> {
    let config = FlashnoteConfig::resolve()?;
    let client = OllamaClient::new(&config.ollama_url, &config.model_name, config.timeout_secs)?;

    match client.is_model_available() {
        Ok(true) => {}
        Ok(false) => tracing::warn!(model = %config.model_name, "Model not found in Ollama"),
        Err(e) => tracing::warn!(error = %e, "Could not reach Ollama, units will fail"),
    }

    match command {
        Command::Transcript(path) => {
            let transcript = std::fs::read_to_string(&path)?;
            let result = if config.max_concurrency > 1 {
                let runtime = tokio::runtime::Runtime::new()?;
                // The blocking HTTP client must be dropped outside the runtime.
                let oracle: Arc<dyn Oracle> = Arc::new(client);
                runtime.block_on(process_transcript_concurrent(
                    &transcript,
                    &config,
                    Arc::clone(&oracle),
                ))?
            } else {
                process_transcript(&transcript, &config, &client)?
            };
            Ok(serde_json::to_string_pretty(&result.records)?)
        }
        Command::Seeds(path) => {
            let seeds: Vec<QaSeed> = serde_json::from_str(&std::fs::read_to_string(&path)?)?;
            let runner = SeedRunner::new(config.extraction_config())?;
            let result = runner.run(seeds, &client);
            Ok(serde_json::to_string_pretty(&result)?)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn transcript_path_is_accepted() {
        assert!(matches!(
            parse_args(&args(&["notes.txt"])),
            Some(Command::Transcript(p)) if p == "notes.txt"
        ));
    }

    #[test]
    fn seeds_flag_takes_a_path() {
        assert!(matches!(
            parse_args(&args(&["--seeds", "trivia.json"])),
            Some(Command::Seeds(p)) if p == "trivia.json"
        ));
        assert!(parse_args(&args(&["--seeds"])).is_none());
    }

    #[test]
    fn anything_else_is_usage_error() {
        assert!(parse_args(&args(&[])).is_none());
        assert!(parse_args(&args(&["--help"])).is_none());
        assert!(parse_args(&args(&["a", "b"])).is_none());
    }
}
