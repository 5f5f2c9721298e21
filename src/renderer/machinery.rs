use std::{
    ops::Deref as _,
    sync::{
        Arc, Mutex,
        atomic::{AtomicUsize, Ordering},
    },
    thread::{self, JoinHandle},
    time::Instant,
};

use anyhow::{Context as _, anyhow};
use image::{GenericImage, GenericImageView, RgbaImage};

use crate::{
    camera::Camera,
    geometry::ScreenBlock,
    renderer::{RenderSettings, worker::Worker},
    scene::Scene,
    screen_block::ScreenBlockExt,
};

/// Starts rendering the scene in background threads.
///
/// Tiles are handed out center first. The callbacks get called from the worker threads
/// before and after each tile.
pub fn render<F1, F2>(
    scene: Arc<Scene>,
    camera: Camera,
    settings: RenderSettings,
    started_tile_callback: F1,
    finished_tile_callback: F2,
) -> anyhow::Result<RenderProgress>
where
    F1: Fn(ScreenBlock) + Send + Sync + 'static,
    F2: Fn(ScreenBlock) + Send + Sync + 'static,
{
    let resolution = camera.resolution();
    let state = Arc::new(RenderState {
        scene,
        camera,
        settings,

        image: Mutex::new(RgbaImage::new(resolution.x, resolution.y)),

        tile_ordering: ScreenBlock::from_size(resolution).tile_ordering(settings.tile_size.get()),
        next_tile_index: AtomicUsize::new(0),
        finished_tile_count: AtomicUsize::new(0),
    });
    let started_tile_callback = Arc::new(started_tile_callback);
    let finished_tile_callback = Arc::new(finished_tile_callback);

    let cores = core_affinity::get_core_ids().unwrap_or_default();
    let worker_count = match settings.worker_count {
        Some(count) => count.get(),
        None if cores.is_empty() => num_cpus::get(),
        None => cores.len(),
    };
    log::debug!(
        "Rendering {}x{} in {} tiles on {worker_count} workers",
        resolution.x,
        resolution.y,
        state.tile_ordering.len()
    );

    let threads = (0..worker_count)
        .map(|worker_id| {
            let state = Arc::clone(&state);
            let started_tile_callback = Arc::clone(&started_tile_callback);
            let finished_tile_callback = Arc::clone(&finished_tile_callback);
            // Pinning is best effort, workers beyond the core count float
            let core = cores.get(worker_id).copied();

            thread::Builder::new()
                .name(format!("worker{worker_id}"))
                .spawn(move || -> anyhow::Result<()> {
                    if let Some(core) = core {
                        core_affinity::set_for_current(core);
                    }

                    let mut worker = Worker::new(worker_id, &state.scene);
                    let tile_size = state.settings.tile_size.get();
                    let mut buffer = RgbaImage::new(tile_size, tile_size);

                    while let Some(tile) = state.get_next_tile() {
                        (started_tile_callback)(tile.clone());

                        worker.render_tile(
                            &state.scene,
                            &state.camera,
                            &state.settings,
                            tile,
                            &mut buffer,
                        );
                        state
                            .image
                            .lock()
                            .map_err(|_| anyhow!("Image lock poisoned"))?
                            .copy_from(
                                buffer.view(0, 0, tile.width(), tile.height()).deref(),
                                tile.min.x,
                                tile.min.y,
                            )
                            .context("Tile does not fit into the image")?;

                        state.finished_tile_count.fetch_add(1, Ordering::AcqRel);
                        (finished_tile_callback)(tile.clone());
                    }
                    Ok(())
                })
        })
        .collect::<Result<Vec<_>, _>>()
        .context("Failed to spawn render workers")?;

    Ok(RenderProgress {
        render_state: state,
        threads,
        start: Instant::now(),
    })
}

pub struct RenderProgress {
    render_state: Arc<RenderState>,
    threads: Vec<JoinHandle<anyhow::Result<()>>>,
    start: Instant,
}

impl RenderProgress {
    /// Return number of finished and total tiles.
    pub fn progress(&self) -> (usize, usize) {
        let total = self.render_state.tile_ordering.len();
        let finished = self
            .render_state
            .finished_tile_count
            .load(Ordering::Acquire);
        (finished, total)
    }

    pub fn progress_percent(&self) -> f32 {
        let (finished, total) = self.progress();
        if total == 0 {
            100.0
        } else {
            100.0 * (finished as f32) / (total as f32)
        }
    }

    pub fn is_finished(&self) -> bool {
        self.threads.iter().all(|handle| handle.is_finished())
    }

    /// Signal the workers to abort.
    /// Any running workers will still finish their tiles, but no new ones will be started.
    pub fn abort(&self) {
        self.render_state
            .next_tile_index
            .store(self.render_state.tile_ordering.len(), Ordering::Release);
    }

    /// Blocks until all workers finish.
    /// Returns the first worker error, a panicking worker is reported as an error too.
    pub fn wait(&mut self) -> anyhow::Result<()> {
        let mut result = Ok(());
        for handle in self.threads.drain(..) {
            let name = handle.thread().name().unwrap_or("worker").to_owned();
            let worker_result = handle
                .join()
                .map_err(|_| anyhow!("Render thread {name} panicked"))
                .and_then(|r| r);
            if result.is_ok() {
                result = worker_result;
            }
        }

        if result.is_ok() {
            let (finished, total) = self.progress();
            log::debug!(
                "Render finished {finished}/{total} tiles in {:.1?}",
                self.start.elapsed()
            );
        }
        result
    }

    pub fn image(&self) -> &Mutex<RgbaImage> {
        &self.render_state.image
    }
}

struct RenderState {
    scene: Arc<Scene>,
    camera: Camera,
    settings: RenderSettings,

    image: Mutex<RgbaImage>,

    tile_ordering: Vec<ScreenBlock>,
    next_tile_index: AtomicUsize,
    finished_tile_count: AtomicUsize,
}

impl RenderState {
    fn get_next_tile(&self) -> Option<&ScreenBlock> {
        let id = self.next_tile_index.fetch_add(1, Ordering::AcqRel);
        self.tile_ordering.get(id)
    }
}
