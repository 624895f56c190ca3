use clap::Parser;
use futures::future::join_all;
use serde_json::{json, Value};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tower::{ServiceBuilder, ServiceExt};
use tracing::{error, info, Level};

use skintone_core::capability::{PortraitFaceLocator, StaticFaceLocator, UnknownDemographics};
use skintone_core::{
    AnalysisError, AnalysisResult, AppError, Configuration, FaceRegion, PipelineOrchestrator,
    RawImage,
};

/// Estimate skin tone and undertone from portrait photos.
#[derive(Parser)]
#[command(name = "skintone")]
#[command(version, about)]
struct Cli {
    /// Image files to analyze.
    #[arg(required = true)]
    images: Vec<PathBuf>,

    /// Face box as `x,y,width,height`; defaults to a portrait-framing guess.
    #[arg(long, value_parser = parse_face)]
    face: Option<FaceRegion>,

    /// TOML/YAML/JSON configuration file.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Maximum number of images decoded and analyzed at once.
    #[arg(long, default_value_t = 4)]
    concurrency: usize,

    /// Write each sampled face, transparent outside the skin mask, as PNG here.
    #[arg(long)]
    masked_dir: Option<PathBuf>,
}

fn parse_face(value: &str) -> Result<FaceRegion, String> {
    let parts = value
        .split(',')
        .map(|part| part.trim().parse::<u32>())
        .collect::<Result<Vec<_>, _>>()
        .map_err(|e| format!("invalid face box '{}': {}", value, e))?;
    match parts[..] {
        [x, y, width, height] => FaceRegion::new(x, y, width, height)
            .ok_or_else(|| format!("face box '{}' must have a non-zero size", value)),
        _ => Err(format!("face box '{}' must be x,y,width,height", value)),
    }
}

fn init_logging(level: Level) {
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .init();
}

/// Outcome of one image that made it through the pipeline.
struct FileReport {
    result: AnalysisResult,
    masked: Option<PathBuf>,
}

async fn run_blocking<T, F>(task: F) -> Result<T, AppError>
where
    F: FnOnce() -> Result<T, AppError> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(task)
        .await
        .map_err(|e| AnalysisError::InternalError(format!("blocking task failed: {}", e)))?
}

fn masked_path(dir: &Path, image: &Path) -> PathBuf {
    let stem = image
        .file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .unwrap_or_else(|| "image".to_string());
    dir.join(format!("{}_masked.png", stem))
}

/// Decode, analyze and optionally export one file. Decoding happens here so
/// at most `--concurrency` images are held in memory.
async fn analyze_file(
    orchestrator: PipelineOrchestrator,
    path: PathBuf,
    masked_dir: Option<PathBuf>,
) -> Result<FileReport, AppError> {
    let source = path.clone();
    let image = run_blocking(move || Ok(RawImage::from(image::open(&source)?))).await?;

    let Some(dir) = masked_dir else {
        let result = orchestrator.analyze(image).await?;
        return Ok(FileReport {
            result,
            masked: None,
        });
    };

    let analysis = orchestrator.analyze_with_mask(image).await?;
    let target = masked_path(&dir, &path);
    let written = target.clone();
    let masked_face = analysis.masked_face;
    run_blocking(move || {
        masked_face
            .save(&target)
            .map_err(|source| AppError::Export { path: target, source })
    })
    .await?;

    Ok(FileReport {
        result: analysis.result,
        masked: Some(written),
    })
}

fn report(image: &Path, outcome: &Result<FileReport, AppError>) -> Value {
    match outcome {
        Ok(file) => {
            let mut report = json!({ "image": image.display().to_string(), "result": file.result });
            if let Some(masked) = &file.masked {
                report["masked"] = json!(masked.display().to_string());
            }
            report
        }
        Err(e) => json!({
            "image": image.display().to_string(),
            "error": e.reason_code(),
            "message": e.to_string(),
        }),
    }
}

/// One report per image plus the number of images that failed.
fn summarize<P: AsRef<Path>>(outcomes: &[(P, Result<FileReport, AppError>)]) -> (Vec<Value>, usize) {
    let mut failures = 0;
    let mut reports = Vec::with_capacity(outcomes.len());
    for (path, outcome) in outcomes {
        let path = path.as_ref();
        if let Err(e) = outcome {
            error!("{}: {}", path.display(), e);
            failures += 1;
        }
        reports.push(report(path, outcome));
    }
    (reports, failures)
}

#[tokio::main]
async fn main() -> Result<ExitCode, AppError> {
    let cli = Cli::parse();
    let configuration = Configuration::load(cli.config.as_deref())?;
    init_logging(configuration.max_log_level()?);

    let builder = PipelineOrchestrator::builder()
        .config(configuration.analysis.clone())
        .estimator(UnknownDemographics);
    let orchestrator = match cli.face {
        Some(face) => builder.locator(StaticFaceLocator::single(face)),
        None => builder.locator(PortraitFaceLocator),
    }
    .build()?;

    if let Some(dir) = &cli.masked_dir {
        std::fs::create_dir_all(dir)?;
    }

    info!("Analyzing {} image(s)", cli.images.len());
    let masked_dir = cli.masked_dir.clone();
    let service = ServiceBuilder::new()
        .concurrency_limit(cli.concurrency.max(1))
        .service_fn(move |path: PathBuf| {
            analyze_file(orchestrator.clone(), path, masked_dir.clone())
        });
    let outcomes = join_all(cli.images.iter().map(|path| {
        let service = service.clone();
        async move { (path, service.oneshot(path.clone()).await) }
    }))
    .await;

    let (reports, failures) = summarize(&outcomes);
    println!("{}", serde_json::to_string_pretty(&reports)?);
    if failures > 0 {
        info!("{} of {} image(s) failed", failures, reports.len());
        return Ok(ExitCode::FAILURE);
    }
    Ok(ExitCode::SUCCESS)
}
