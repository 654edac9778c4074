//! Band Examiner CLI
//!
//! The `examiner` command exposes the evaluation core offline and against a
//! live model.
//!
//! ## Commands
//!
//! - `prompt`: Print the compiled system prompt (or only its digest)
//! - `rubric`: Print the rubric criteria and band descriptors
//! - `band`: Compute the overall band from four sub-scores
//! - `evaluate`: Evaluate an essay file or essay images against the model

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use examiner_core::llm::openai::{DEFAULT_API_BASE, DEFAULT_MODEL};
use examiner_core::{
    overall_band, Band, EssaySubmission, EvaluationRequestHandler, EvaluationResult,
    EvaluatorOptions, ImageUpload, OpenAiClient, OpenAiConfig, OutputMode, RubricCatalog,
    SubScores, SystemPrompt, PROMPT_VERSION,
};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, Level};

#[derive(Parser)]
#[command(name = "examiner")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Rubric-driven essay evaluation (IELTS writing)", long_about = None)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Emit JSON-formatted log lines
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the compiled system prompt
    Prompt {
        /// Print only the version and SHA-256 digest
        #[arg(long)]
        digest: bool,
    },

    /// Print the rubric criteria and band descriptors
    Rubric {
        /// Print the catalog as JSON
        #[arg(long)]
        as_json: bool,
    },

    /// Compute the overall band from criterion sub-scores
    Band {
        /// Task Response
        task_response: f64,
        /// Coherence and Cohesion
        coherence_and_cohesion: f64,
        /// Lexical Resource
        lexical_resource: f64,
        /// Grammatical Range and Accuracy
        grammatical_range_and_accuracy: f64,
    },

    /// Evaluate an essay with the configured model
    Evaluate {
        /// Text file containing the essay
        #[arg(long, conflicts_with = "image")]
        text: Option<PathBuf>,

        /// Image file(s) containing the essay
        #[arg(long, num_args = 1..)]
        image: Vec<PathBuf>,

        /// Treat several images as candidates and keep the most complete essay
        #[arg(long)]
        multi: bool,

        #[arg(long, env = "OPENAI_API_KEY", hide_env_values = true)]
        api_key: Option<String>,

        #[arg(long, env = "EXAMINER_MODEL", default_value = DEFAULT_MODEL)]
        model: String,

        #[arg(long, env = "EXAMINER_API_BASE", default_value = DEFAULT_API_BASE)]
        api_base: String,

        /// `structured` or `text`
        #[arg(long, env = "EXAMINER_OUTPUT_MODE", default_value = "structured")]
        output_mode: OutputMode,

        #[arg(long, default_value_t = 60)]
        timeout_secs: u64,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Setup logging
    let level = if cli.verbose {
        Level::DEBUG
    } else {
        Level::WARN
    };
    examiner_core::init_tracing(cli.json, level);

    match cli.command {
        Commands::Prompt { digest } => cmd_prompt(digest),
        Commands::Rubric { as_json } => cmd_rubric(as_json),
        Commands::Band {
            task_response,
            coherence_and_cohesion,
            lexical_resource,
            grammatical_range_and_accuracy,
        } => cmd_band([
            task_response,
            coherence_and_cohesion,
            lexical_resource,
            grammatical_range_and_accuracy,
        ]),
        Commands::Evaluate {
            text,
            image,
            multi,
            api_key,
            model,
            api_base,
            output_mode,
            timeout_secs,
        } => {
            let submission = load_submission(text.as_deref(), &image)?;
            let config = OpenAiConfig::new(api_key.unwrap_or_default())
                .context("an api key is required (--api-key or OPENAI_API_KEY)")?
                .with_model(model)
                .with_api_base(api_base)
                .with_timeout(Duration::from_secs(timeout_secs));
            let options = EvaluatorOptions {
                output_mode,
                ..EvaluatorOptions::default()
            };
            let handler = EvaluationRequestHandler::new(
                Arc::new(OpenAiClient::new(config)?),
                RubricCatalog::ielts_writing(),
                options,
            )?;
            let result = cmd_evaluate(&handler, submission, multi).await?;
            println!("{}", serde_json::to_string_pretty(&result)?);
            Ok(())
        }
    }
}

fn cmd_prompt(digest_only: bool) -> Result<()> {
    let prompt = SystemPrompt::compile(&RubricCatalog::ielts_writing())?;
    if digest_only {
        println!("{} {}", PROMPT_VERSION, prompt.digest());
    } else {
        print!("{}", prompt.text());
    }
    Ok(())
}

fn cmd_rubric(as_json: bool) -> Result<()> {
    let catalog = RubricCatalog::ielts_writing();
    if as_json {
        println!("{}", serde_json::to_string_pretty(&catalog)?);
    } else {
        print!("{}", render_rubric(&catalog));
    }
    Ok(())
}

fn render_rubric(catalog: &RubricCatalog) -> String {
    let mut out = String::new();
    for criterion in &catalog.criteria {
        out.push_str(&format!("{} ({})\n", criterion.name, criterion.key));
        out.push_str(&format!("  {}\n", criterion.description));
        for band in Band::ALL {
            if let Some(text) = criterion.exemplar(band) {
                out.push_str(&format!("  {band}: {text}\n"));
            }
        }
        out.push('\n');
    }
    out
}

fn cmd_band(values: [f64; 4]) -> Result<()> {
    println!("{}", band_for(values)?);
    Ok(())
}

fn band_for(values: [f64; 4]) -> Result<f64> {
    let catalog = RubricCatalog::ielts_writing();
    let scores: SubScores = catalog
        .keys()
        .map(str::to_string)
        .zip(values)
        .collect();
    Ok(overall_band(&scores)?)
}

/// Infer an image MIME type from the file extension.
fn image_content_type(path: &Path) -> Result<&'static str> {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase)
        .unwrap_or_default();
    match ext.as_str() {
        "png" => Ok("image/png"),
        "jpg" | "jpeg" => Ok("image/jpeg"),
        "gif" => Ok("image/gif"),
        "webp" => Ok("image/webp"),
        _ => bail!("unsupported image type for {:?} (png, jpg, gif, webp)", path),
    }
}

fn load_submission(text: Option<&Path>, images: &[PathBuf]) -> Result<EssaySubmission> {
    if let Some(path) = text {
        let essay = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read essay from {:?}", path))?;
        return Ok(EssaySubmission::text(essay));
    }

    let mut files = Vec::with_capacity(images.len());
    for path in images {
        let bytes =
            std::fs::read(path).with_context(|| format!("Failed to read image {:?}", path))?;
        let file_name = path.file_name().map(|n| n.to_string_lossy().into_owned());
        files.push(ImageUpload::new(file_name, image_content_type(path)?, bytes));
    }
    Ok(EssaySubmission::images(files))
}

async fn cmd_evaluate(
    handler: &EvaluationRequestHandler,
    submission: EssaySubmission,
    multi: bool,
) -> Result<EvaluationResult> {
    let result = handler.evaluate_submission(submission, multi).await?;
    info!(
        overall_band = result.overall_band(),
        word_count = result.word_count,
        "evaluation complete"
    );
    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;
    use examiner_core::{FakeModelClient, ModelContent};
    use serde_json::json;

    fn fake_handler(client: Arc<FakeModelClient>) -> EvaluationRequestHandler {
        EvaluationRequestHandler::new(
            client,
            RubricCatalog::ielts_writing(),
            EvaluatorOptions::default(),
        )
        .unwrap()
    }

    fn reply() -> serde_json::Value {
        json!({
            "topic": "Tourism",
            "scores": {
                "task_response": 5.0,
                "coherence_and_cohesion": 5.5,
                "lexical_resource": 5.0,
                "grammatical_range_and_accuracy": 5.5
            },
            "feedback": {},
            "suggestions": [],
            "original_essay": ""
        })
    }

    #[test]
    fn test_band_for_reference_cases() {
        assert_eq!(band_for([6.0, 6.0, 6.0, 6.0]).unwrap(), 6.0);
        assert_eq!(band_for([6.0, 6.5, 6.0, 6.5]).unwrap(), 6.5);
        assert_eq!(band_for([7.0, 6.5, 7.0, 6.5]).unwrap(), 7.0);
        assert!(band_for([6.0, 6.0, 6.0, 12.0]).is_err());
    }

    #[test]
    fn test_image_content_type() {
        assert_eq!(image_content_type(Path::new("a.PNG")).unwrap(), "image/png");
        assert_eq!(image_content_type(Path::new("b.jpeg")).unwrap(), "image/jpeg");
        assert!(image_content_type(Path::new("c.pdf")).is_err());
        assert!(image_content_type(Path::new("noext")).is_err());
    }

    #[test]
    fn test_render_rubric_lists_all_bands() {
        let text = render_rubric(&RubricCatalog::ielts_writing());
        assert!(text.contains("Task Response (task_response)"));
        assert_eq!(text.matches("Band 9:").count(), 4);
        assert_eq!(text.matches("Band 3:").count(), 4);
    }

    #[test]
    fn test_load_submission_from_text_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("essay.txt");
        std::fs::write(&path, "one two three").unwrap();

        let submission = load_submission(Some(&path), &[]).unwrap();
        assert_eq!(submission.essay_text.as_deref(), Some("one two three"));
        assert!(submission.files.is_empty());
    }

    #[test]
    fn test_load_submission_from_images() {
        let dir = tempfile::tempdir().unwrap();
        let page = dir.path().join("page1.jpg");
        std::fs::write(&page, [0xff, 0xd8, 0xff]).unwrap();

        let submission = load_submission(None, &[page]).unwrap();
        assert_eq!(submission.files.len(), 1);
        assert_eq!(submission.files[0].content_type, "image/jpeg");
        assert_eq!(submission.files[0].file_name.as_deref(), Some("page1.jpg"));
    }

    #[test]
    fn test_load_submission_missing_file_is_error() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("nope.txt");
        let err = load_submission(Some(&missing), &[]).unwrap_err();
        assert!(err.to_string().contains("Failed to read essay"));
    }

    #[tokio::test]
    async fn test_cmd_evaluate_text_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("essay.txt");
        std::fs::write(&path, "Tourism brings money and problems.").unwrap();

        let client = Arc::new(FakeModelClient::structured(reply()));
        let handler = fake_handler(client.clone());
        let submission = load_submission(Some(&path), &[]).unwrap();

        let result = cmd_evaluate(&handler, submission, false).await.unwrap();
        assert_eq!(result.overall_band(), 5.5);
        assert_eq!(result.word_count, 5);
        assert!(matches!(
            client.last_request().unwrap().content,
            ModelContent::Text(_)
        ));
    }

    #[tokio::test]
    async fn test_cmd_evaluate_empty_file_skips_model() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("empty.txt");
        std::fs::write(&path, "  \n").unwrap();

        let client = Arc::new(FakeModelClient::structured(reply()));
        let handler = fake_handler(client.clone());
        let submission = load_submission(Some(&path), &[]).unwrap();

        assert!(cmd_evaluate(&handler, submission, false).await.is_err());
        assert_eq!(client.call_count(), 0);
    }
}
