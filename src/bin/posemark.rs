use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::Context as _;
use clap::{Args, Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(name = "posemark", version)]
struct Cli {
    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Render the overlay at one playback time as a PNG.
    Frame(FrameArgs),
    /// Burn the overlay into a video (requires `ffmpeg` on PATH).
    Render(RenderArgs),
    /// Print a summary of an overlay document.
    Inspect(InspectArgs),
    /// Convert pose-pipeline annotations into an overlay document.
    Import(ImportArgs),
}

#[derive(Args, Debug)]
struct StyleArgs {
    /// Hold the floor frame instead of blending between keyframes.
    #[arg(long)]
    no_interpolate: bool,

    #[arg(long)]
    hide_keypoints: bool,

    #[arg(long)]
    hide_skeleton: bool,

    #[arg(long)]
    hide_focus: bool,

    /// Whole-overlay opacity in [0, 1].
    #[arg(long)]
    opacity: Option<f64>,

    /// Keypoint dot radius in pixels.
    #[arg(long)]
    dot_size: Option<f64>,

    /// JSON style file; flags override its values.
    #[arg(long)]
    style: Option<PathBuf>,

    /// Font file for focus-box labels.
    #[arg(long)]
    font: Option<PathBuf>,
}

#[derive(Args, Debug)]
struct FrameArgs {
    /// Overlay document path or http(s) URL.
    #[arg(long)]
    overlay: String,

    /// Playback time in seconds.
    #[arg(long)]
    time: f64,

    /// Output PNG path.
    #[arg(long)]
    out: PathBuf,

    /// Draw over this video's frame at `--time`.
    #[arg(long, conflicts_with = "video_size")]
    video: Option<PathBuf>,

    /// Intrinsic video size (WxH) when no video file is given.
    #[arg(long, value_parser = parse_wxh)]
    video_size: Option<(u32, u32)>,

    /// Output size (WxH). Defaults to the video size.
    #[arg(long, value_parser = parse_wxh)]
    size: Option<(u32, u32)>,

    #[command(flatten)]
    style: StyleArgs,
}

#[derive(Args, Debug)]
struct RenderArgs {
    #[arg(long)]
    video: PathBuf,

    /// Overlay document path or http(s) URL.
    #[arg(long)]
    overlay: String,

    /// Output MP4 path.
    #[arg(long)]
    out: PathBuf,

    /// Output size (WxH). Defaults to the video size.
    #[arg(long, value_parser = parse_wxh)]
    size: Option<(u32, u32)>,

    /// Stop after this many frames.
    #[arg(long)]
    max_frames: Option<u64>,

    #[command(flatten)]
    style: StyleArgs,
}

#[derive(Args, Debug)]
struct InspectArgs {
    /// Overlay document path or http(s) URL.
    #[arg(long)]
    overlay: String,
}

#[derive(Args, Debug)]
struct ImportArgs {
    /// Pose-pipeline annotations JSON.
    #[arg(long = "in")]
    in_path: PathBuf,

    /// Output overlay document path.
    #[arg(long)]
    out: PathBuf,

    /// Emit each detection's bounding box as an info focus box.
    #[arg(long)]
    bbox_focus: bool,

    /// Drop detections scoring below this.
    #[arg(long, default_value_t = 0.0)]
    min_score: f64,
}

fn main() -> anyhow::Result<()> {
    init_tracing();
    let cli = Cli::parse();
    match cli.cmd {
        Command::Frame(args) => cmd_frame(args),
        Command::Render(args) => cmd_render(args),
        Command::Inspect(args) => cmd_inspect(args),
        Command::Import(args) => cmd_import(args),
    }
}

fn init_tracing() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("posemark=info"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

fn parse_wxh(s: &str) -> Result<(u32, u32), String> {
    posemark::parse_size(s).ok_or_else(|| format!("expected WxH, got '{s}'"))
}

impl StyleArgs {
    fn overlay_style(&self) -> anyhow::Result<posemark::OverlayStyle> {
        let mut style = match &self.style {
            Some(path) => {
                let bytes = std::fs::read(path)
                    .with_context(|| format!("read style '{}'", path.display()))?;
                posemark::OverlayStyle::from_json_slice(&bytes)
                    .with_context(|| format!("parse style '{}'", path.display()))?
            }
            None => posemark::OverlayStyle::default(),
        };
        style.show_keypoints &= !self.hide_keypoints;
        style.show_skeleton &= !self.hide_skeleton;
        style.show_focus &= !self.hide_focus;
        if let Some(o) = self.opacity {
            style.opacity = o;
        }
        if let Some(r) = self.dot_size {
            style.dot_radius = r;
        }
        Ok(style.sanitized())
    }

    fn label_font(&self) -> posemark::LabelFontSource {
        match &self.font {
            Some(path) => posemark::LabelFontSource::File(path.clone()),
            None => posemark::LabelFontSource::Auto,
        }
    }
}

fn cmd_frame(args: FrameArgs) -> anyhow::Result<()> {
    let style = args.style.overlay_style()?;

    let mut background = None;
    let video_size = match (&args.video, args.video_size) {
        (Some(path), _) => {
            let info = posemark::probe_video(path)?;
            let rgba = posemark::decode_video_frame_rgba8(&info, args.time)?;
            let size = info.size();
            background = Some((info, rgba));
            Some(size)
        }
        (None, Some((w, h))) => Some(posemark::VideoSize::new(w, h)),
        (None, None) => None,
    };
    let viewport = match (args.size, video_size) {
        (Some((w, h)), _) => posemark::Viewport::new(w, h),
        (None, Some(v)) => posemark::Viewport::from_video(v),
        (None, None) => posemark::PlayerOpts::default().viewport,
    };

    let mut player = posemark::OverlayPlayer::new(posemark::PlayerOpts {
        interpolate: !args.style.no_interpolate,
        style,
        viewport,
        label_font: args.style.label_font(),
        cache: None,
    });
    if let Some(v) = video_size {
        player.on_video_loaded(v);
    }
    player.set_overlay_src(Some(posemark::OverlaySource::parse(&args.overlay)));
    if !player.wait_for_overlay(Duration::from_secs(60)) {
        anyhow::bail!("timed out loading overlay '{}'", args.overlay);
    }

    let bg = background
        .as_ref()
        .map(|(info, rgba)| posemark::BackgroundFrame {
            width: info.width,
            height: info.height,
            rgba,
        });
    let frame = player.render_at(args.time, bg)?;
    write_png(&args.out, &frame)?;

    eprintln!("wrote {}", args.out.display());
    Ok(())
}

fn cmd_render(args: RenderArgs) -> anyhow::Result<()> {
    let style = args.style.overlay_style()?;
    let source = posemark::OverlaySource::parse(&args.overlay);
    let doc = posemark::load_document(&source)
        .with_context(|| format!("load overlay '{source}'"))?;

    let opts = posemark::BurnInOpts {
        size: args.size.map(|(w, h)| posemark::Viewport::new(w, h)),
        style,
        interpolate: !args.style.no_interpolate,
        label_font: args.style.label_font(),
        max_frames: args.max_frames,
    };
    let mut session = posemark::BurnInSession::new(&args.video, Some(doc), opts)?;
    let mut sink = posemark::FfmpegSink::new(posemark::FfmpegSinkOpts::new(&args.out));
    let stats = session.render_to_sink(&mut sink)?;

    eprintln!(
        "wrote {} ({} frames, overlay on {})",
        args.out.display(),
        stats.frames,
        stats.overlay_frames_drawn
    );
    Ok(())
}

fn cmd_inspect(args: InspectArgs) -> anyhow::Result<()> {
    let source = posemark::OverlaySource::parse(&args.overlay);
    let doc = posemark::load_document(&source)
        .with_context(|| format!("load overlay '{source}'"))?;

    let key_kind = match doc.key_kind {
        posemark::FrameKeyKind::Time => "time",
        posemark::FrameKeyKind::Index => "index",
    };
    println!("source:         {source}");
    println!("keys:           {key_kind}");
    match doc.fps {
        Some(fps) => println!("fps:            {fps}"),
        None => println!("fps:            (default {})", doc.effective_fps()),
    }
    println!("frames:         {}", doc.frames.len());
    if let Some((first, last)) = doc.key_span() {
        println!(
            "span:           {first} .. {last} ({:.3}s .. {:.3}s)",
            doc.key_to_secs(first),
            doc.key_to_secs(last)
        );
    }
    println!("skeleton pairs: {}", doc.skeleton_pairs.len());
    let max_people = doc.frames.iter().map(|f| f.people.len()).max().unwrap_or(0);
    let max_focus = doc.frames.iter().map(|f| f.focus.len()).max().unwrap_or(0);
    println!("max people:     {max_people}");
    println!("max focus:      {max_focus}");
    Ok(())
}

fn cmd_import(args: ImportArgs) -> anyhow::Result<()> {
    let bytes = std::fs::read(&args.in_path)
        .with_context(|| format!("read annotations '{}'", args.in_path.display()))?;
    let ann = posemark::PoseAnnotations::from_json_slice(&bytes)
        .with_context(|| format!("parse annotations '{}'", args.in_path.display()))?;
    let doc = posemark::import_pose_annotations(
        &ann,
        &posemark::ImportOpts {
            bbox_focus: args.bbox_focus,
            min_score: args.min_score,
        },
    )?;

    ensure_parent(&args.out)?;
    std::fs::write(&args.out, doc.to_json_pretty()?)
        .with_context(|| format!("write overlay '{}'", args.out.display()))?;

    eprintln!("wrote {} ({} frames)", args.out.display(), doc.frames.len());
    Ok(())
}

fn write_png(path: &Path, frame: &posemark::FrameRGBA) -> anyhow::Result<()> {
    ensure_parent(path)?;
    let straight = frame.to_straight_rgba8()?;
    image::save_buffer_with_format(
        path,
        &straight,
        frame.width,
        frame.height,
        image::ColorType::Rgba8,
        image::ImageFormat::Png,
    )
    .with_context(|| format!("write png '{}'", path.display()))?;
    Ok(())
}

fn ensure_parent(path: &Path) -> anyhow::Result<()> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("create output dir '{}'", parent.display()))?;
    }
    Ok(())
}
