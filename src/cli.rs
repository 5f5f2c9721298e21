use std::{
    num::{NonZeroU32, NonZeroUsize},
    path::{Path, PathBuf},
    sync::Arc,
    time::Instant,
};

use anyhow::{Context as _, anyhow};
use clap::{Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};
use microtrace::{SceneConfig, render};

#[derive(Parser)]
#[command(name = "microtrace")]
#[command(about = "Small CPU ray tracer", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Render a scene into a PNG image
    Render {
        /// Scene file, the built-in demo scene is used when missing
        scene: Option<PathBuf>,
        /// Output image
        #[arg(short, long, default_value = "render.png")]
        output: PathBuf,
        #[arg(long)]
        width: Option<NonZeroU32>,
        #[arg(long)]
        height: Option<NonZeroU32>,
        /// Samples per pixel
        #[arg(long)]
        samples: Option<NonZeroU32>,
        /// Maximum number of mirror bounces
        #[arg(long)]
        bounces: Option<u32>,
        /// Worker threads, one per core by default
        #[arg(long)]
        threads: Option<NonZeroUsize>,
    },
    /// Build the BVH of a scene and print its statistics
    Stats {
        /// Scene file, the built-in demo scene is used when missing
        scene: Option<PathBuf>,
    },
}

fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Render {
            scene,
            output,
            width,
            height,
            samples,
            bounces,
            threads,
        } => {
            let (mut config, base_dir) = load_config(scene.as_deref())?;
            if let Some(width) = width {
                config.camera.width = width.get();
            }
            if let Some(height) = height {
                config.camera.height = height.get();
            }
            if let Some(samples) = samples {
                config.render.samples = samples;
            }
            if let Some(bounces) = bounces {
                config.render.bounces = bounces;
            }
            if threads.is_some() {
                config.render.threads = threads;
            }
            render_to_file(&config, &base_dir, &output)
        }
        Commands::Stats { scene } => {
            let (config, base_dir) = load_config(scene.as_deref())?;
            let scene = config.to_scene(&base_dir)?;
            println!("{}", scene.bvh().statistics());
            scene.bvh().log_tree();
            Ok(())
        }
    }
}

/// Loads the scene file or the demo scene, returns the directory relative mesh paths start from.
fn load_config(path: Option<&Path>) -> anyhow::Result<(SceneConfig, PathBuf)> {
    match path {
        Some(path) => {
            let config = SceneConfig::load(path)
                .with_context(|| format!("Failed to load scene {}", path.display()))?;
            let base_dir = path.parent().map(Path::to_owned).unwrap_or_default();
            Ok((config, base_dir))
        }
        None => {
            log::info!("No scene given, using the demo scene");
            Ok((SceneConfig::demo()?, PathBuf::from(".")))
        }
    }
}

fn render_to_file(config: &SceneConfig, base_dir: &Path, output: &Path) -> anyhow::Result<()> {
    let scene = Arc::new(config.to_scene(base_dir)?);
    log::info!("{}", scene.bvh().statistics());

    let camera = config.camera();
    let settings = config.render_settings();
    let start = Instant::now();

    let bar = ProgressBar::no_length();
    bar.set_style(ProgressStyle::with_template("{bar:40} {pos}/{len} tiles [{elapsed_precise}]")?);
    let mut render_progress = render(scene, camera, settings, |_| {}, {
        let bar = bar.clone();
        move |_| bar.inc(1)
    })?;
    bar.set_length(render_progress.progress().1 as u64);

    render_progress.wait()?;
    bar.finish();
    log::info!("Rendered in {:.1?}", start.elapsed());

    render_progress
        .image()
        .lock()
        .map_err(|_| anyhow!("Image lock poisoned"))?
        .save(output)
        .with_context(|| format!("Failed to save {}", output.display()))?;
    log::info!("Saved {}", output.display());

    Ok(())
}
