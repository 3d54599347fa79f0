use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result, bail};
use clap::Parser;
use scrubber::{
    ControllerState, FfmpegMediaBackend, FrameImage, HostLayout, Point, ScrubController,
    ScrubEvent, ScrubberConfig, Size, StripGeometry,
};
use tracing::{debug, info, warn};
use tracing_subscriber::EnvFilter;

const EVENT_TIMEOUT: Duration = Duration::from_secs(60);

#[derive(Debug, Parser)]
#[command(
    name = "scrub-cli",
    version,
    about = "Sample a thumbnail strip from a video and drag the scrubber across it"
)]
struct Cli {
    /// Input video path.
    video: PathBuf,

    /// Host view width in pixels.
    #[arg(long, default_value_t = 325.0)]
    width: f64,

    /// Host view height in pixels.
    #[arg(long, default_value_t = 60.0)]
    height: f64,

    /// JSON scrubber configuration.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Number of pointer moves used to drag the thumb to the end of the strip.
    #[arg(long, default_value_t = 10)]
    steps: u32,

    /// Directory receiving strip_NN.png and selection.png.
    #[arg(long)]
    out_dir: Option<PathBuf>,
}

fn main() -> Result<()> {
    init_tracing();
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => ScrubberConfig::load(path)
            .with_context(|| format!("failed to load config {}", path.display()))?,
        None => ScrubberConfig::default(),
    };
    let mut controller =
        ScrubController::with_ffmpeg(config.clone()).context("invalid scrubber config")?;
    controller.set_on_position_image_changed(|image| {
        debug!(width = image.width, height = image.height, "thumb image changed");
    });

    let asset = controller
        .open_asset(&cli.video)
        .with_context(|| format!("failed to open {}", cli.video.display()))?;
    let layout = HostLayout::with_insets(Size::new(cli.width, cli.height), &config);
    for event in controller
        .load_video(&asset, &layout)
        .context("failed to load video")?
    {
        if let ScrubEvent::LoadStarted { frame_count } = event {
            info!(frame_count, duration = asset.duration(), "sampling strip");
        }
    }

    let geometry = wait_for_strip(&mut controller)?;
    settle(&mut controller)?;
    if let Some(strip) = controller.strip() {
        println!(
            "strip: {} frames of {:.1}x{:.1}px every {:.3}s ({} failed)",
            strip.len(),
            strip.frame_width,
            strip.frame_height,
            strip.sample_interval,
            strip.holes()
        );
    }

    drag_to_end(&mut controller, &geometry, cli.steps.max(1))?;

    match (controller.percent(), controller.selected_seconds()) {
        (Some(percent), Some(seconds)) => {
            println!("selection: {:.1}% at {seconds:.3}s", percent * 100.0)
        }
        _ => println!("selection: unavailable, the strip leaves no room to drag"),
    }

    if let Some(out_dir) = &cli.out_dir {
        write_outputs(&controller, out_dir)?;
    }

    controller.unload();
    Ok(())
}

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .try_init();
}

fn wait_for_strip(
    controller: &mut ScrubController<FfmpegMediaBackend>,
) -> Result<StripGeometry> {
    while controller.state() == ControllerState::Loading {
        for event in controller
            .wait_for_event(EVENT_TIMEOUT)
            .context("thumbnail sampling did not finish")?
        {
            if let ScrubEvent::StripReady(snapshot) = event {
                return Ok(snapshot.geometry);
            }
        }
    }
    bail!("controller left the loading state without a strip")
}

/// Applies worker completions until no thumb refresh is outstanding.
fn settle(controller: &mut ScrubController<FfmpegMediaBackend>) -> Result<()> {
    while controller.refresh_in_flight() {
        controller
            .wait_for_event(EVENT_TIMEOUT)
            .context("thumb refresh did not complete")?;
    }
    Ok(())
}

fn drag_to_end(
    controller: &mut ScrubController<FfmpegMediaBackend>,
    geometry: &StripGeometry,
    steps: u32,
) -> Result<()> {
    let Some(thumb) = controller.thumb_rect() else {
        bail!("video is not loaded");
    };
    let start = Point::new(thumb.center_x(), thumb.origin.y + thumb.size.height / 2.0);
    controller.pointer_down(start);
    if !controller.is_dragging() {
        bail!("pointer at ({}, {}) missed the thumb", start.x, start.y);
    }

    let travel = geometry.upper_bound - geometry.lower_bound;
    for step in 1..=steps {
        let x = start.x + travel * f64::from(step) / f64::from(steps);
        controller.pointer_move(Point::new(x, start.y));
        controller.pump().context("frame worker stopped during drag")?;
    }

    controller.pointer_up();
    settle(controller)
}

fn write_outputs(
    controller: &ScrubController<FfmpegMediaBackend>,
    out_dir: &Path,
) -> Result<()> {
    fs::create_dir_all(out_dir)
        .with_context(|| format!("failed to create {}", out_dir.display()))?;

    if let Some(strip) = controller.strip() {
        for (slot, frame) in strip.frames.iter().enumerate() {
            let Some(image) = &frame.image else {
                warn!(slot, seconds = frame.seconds, "skipping failed strip slot");
                continue;
            };
            save_png(image, &out_dir.join(format!("strip_{slot:02}.png")))?;
        }
    }

    match controller.thumb_image() {
        Some(image) => save_png(image, &out_dir.join("selection.png"))?,
        None => warn!("no selection image to write"),
    }
    Ok(())
}

fn save_png(frame: &FrameImage, path: &Path) -> Result<()> {
    let buffer = image::RgbaImage::from_raw(frame.width, frame.height, frame.rgba.to_vec())
        .with_context(|| format!("frame buffer does not match {}x{}", frame.width, frame.height))?;
    buffer
        .save_with_format(path, image::ImageFormat::Png)
        .with_context(|| format!("failed to write {}", path.display()))?;
    info!(path = %path.display(), "wrote image");
    Ok(())
}
