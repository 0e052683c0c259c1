use std::collections::BTreeMap;
use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};

use anyhow::Context as _;
use clap::{Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(name = "momentreel", version)]
struct Cli {
    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Render a job to an MP4 (requires `ffmpeg` on PATH or `MOMENTREEL_FFMPEG`).
    Render(RenderArgs),
    /// Print the frame plan of a job as JSON.
    Plan(PlanArgs),
}

#[derive(Parser, Debug)]
struct RenderArgs {
    /// Input job JSON (`script`, `narration`, `visuals`, `options`).
    #[arg(long)]
    job: PathBuf,

    /// Output MP4 path.
    #[arg(long)]
    out: PathBuf,

    /// Override output width.
    #[arg(long)]
    width: Option<u32>,

    /// Override output height.
    #[arg(long)]
    height: Option<u32>,

    /// Override output frame rate.
    #[arg(long)]
    fps: Option<u32>,

    /// Render as fast as possible instead of holding each frame for `1/fps`.
    #[arg(long)]
    unpaced: bool,
}

#[derive(Parser, Debug)]
struct PlanArgs {
    /// Input job JSON.
    #[arg(long)]
    job: PathBuf,
}

/// On-disk job description. Relative asset paths resolve against the job file's directory.
#[derive(serde::Deserialize, Debug)]
struct JobFile {
    script: serde_json::Value,
    #[serde(default)]
    narration: BTreeMap<usize, String>,
    #[serde(default)]
    visuals: BTreeMap<usize, Vec<String>>,
    #[serde(default)]
    options: momentreel::ComposeOptions,
}

struct Job {
    script: momentreel::VideoScript,
    narration: BTreeMap<usize, momentreel::MediaSource>,
    visuals: BTreeMap<usize, Vec<momentreel::MediaSource>>,
    options: momentreel::ComposeOptions,
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    match cli.cmd {
        Command::Render(args) => cmd_render(args),
        Command::Plan(args) => cmd_plan(args),
    }
}

fn read_job(path: &Path) -> anyhow::Result<Job> {
    let f = File::open(path).with_context(|| format!("open job '{}'", path.display()))?;
    let job: JobFile =
        serde_json::from_reader(BufReader::new(f)).with_context(|| "parse job JSON")?;
    let root = path.parent().unwrap_or_else(|| Path::new("."));

    let script = momentreel::parse_script_value(&job.script)?;
    let narration = job
        .narration
        .into_iter()
        .map(|(i, r)| (i, resolve(root, r)))
        .collect();
    let visuals = job
        .visuals
        .into_iter()
        .map(|(i, refs)| (i, refs.into_iter().map(|r| resolve(root, r)).collect()))
        .collect();
    let mut options = job.options;
    options.background_music = options.background_music.map(|s| rebase(root, s));
    options.narrator = options.narrator.map(|s| rebase(root, s));
    options.font = options.font.map(|s| rebase(root, s));

    Ok(Job {
        script,
        narration,
        visuals,
        options,
    })
}

fn resolve(root: &Path, reference: String) -> momentreel::MediaSource {
    rebase(root, momentreel::MediaSource::Reference(reference))
}

fn rebase(root: &Path, src: momentreel::MediaSource) -> momentreel::MediaSource {
    match src {
        momentreel::MediaSource::Reference(r)
            if !r.contains("://") && !r.starts_with("data:") && Path::new(&r).is_relative() =>
        {
            momentreel::MediaSource::from(root.join(&r).as_path())
        }
        other => other,
    }
}

fn cmd_render(args: RenderArgs) -> anyhow::Result<()> {
    let mut job = read_job(&args.job)?;
    if let Some(w) = args.width {
        job.options.width = w;
    }
    if let Some(h) = args.height {
        job.options.height = h;
    }
    if let Some(fps) = args.fps {
        job.options.fps = fps;
    }
    if args.unpaced {
        job.options.pacing = momentreel::Pacing::Unpaced;
    }

    let mut encoder = momentreel::FfmpegEncoder::new();
    let mut progress = |u: &momentreel::ProgressUpdate| {
        if u.status == momentreel::Status::SceneCompleted {
            tracing::info!(
                scene = u.scene_index,
                total = u.total_scenes,
                percent = u.percent,
                "scene done"
            );
        }
    };
    let blob = momentreel::compose(
        &job.script,
        &job.narration,
        &job.visuals,
        &job.options,
        &mut encoder,
        &mut progress,
        &momentreel::CancelToken::new(),
    )?;

    momentreel::encode::ensure_parent_dir(&args.out)?;
    std::fs::write(&args.out, &blob.bytes)
        .with_context(|| format!("write video '{}'", args.out.display()))?;
    eprintln!(
        "wrote {} ({} frames, {:.2}s)",
        args.out.display(),
        blob.frame_count,
        blob.duration_secs
    );
    Ok(())
}

fn cmd_plan(args: PlanArgs) -> anyhow::Result<()> {
    let job = read_job(&args.job)?;
    job.script.validate()?;
    job.options.validate()?;
    let plan = momentreel::CompositionPlan::new(&job.script, &job.options)?;
    let duration = plan.duration_secs();
    let out = serde_json::json!({
        "title": job.script.title,
        "plan": plan,
        "durationSeconds": duration,
    });
    println!("{}", serde_json::to_string_pretty(&out)?);
    Ok(())
}
