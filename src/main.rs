use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use clickmask::postprocess::{process_masks, MaskGrid, PostprocessConfig, SmoothingParams};
use clickmask::render::{
    composite_overlay, trace_contour, AlphaPolicy, CanvasRegion, ContourOptions, ContourStyle,
    Membership, Offset, OverlayStyle, RasterSurface,
};
use clickmask::segmentation::{
    self, write_f32_le, DecoderInputs, DecoderPrompt, MaskDecoder, Preprocessor, ProbabilityBuffer,
    NATIVE_MASK_SIZE, NUM_MASKS,
};
use image::{Rgb, RgbaImage};
use std::path::PathBuf;
use std::time::Instant;

#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
enum RenderMode {
    Overlay,
    Outline,
    Both,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
enum PolicyArg {
    Opaque,
    Blended,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
enum ContourArg {
    Dot,
    Outline,
}

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Image the masks were computed for
    #[arg(short, long)]
    image: PathBuf,

    /// Decoder output: raw little-endian f32 values, [mask][row][col]
    #[arg(short, long)]
    masks: PathBuf,

    /// Number of stacked masks in the decoder output
    #[arg(long, default_value_t = NUM_MASKS)]
    num_masks: usize,

    /// Side length of each decoder mask
    #[arg(long, default_value_t = NATIVE_MASK_SIZE)]
    mask_size: usize,

    /// Side length of the square output canvas
    #[arg(long, default_value_t = 1024)]
    canvas_size: u32,

    /// Which candidate mask to draw
    #[arg(long, default_value_t = 0)]
    mask_index: usize,

    /// Decoder values strictly above this are inside the mask
    #[arg(long, default_value_t = 0.0, allow_negative_numbers = true)]
    threshold: f32,

    /// Smooth jagged edges and close pinholes before upscaling
    #[arg(long)]
    smooth: bool,

    #[arg(long, value_enum, default_value_t = RenderMode::Overlay)]
    render: RenderMode,

    /// Opaque forces overlay pixels to alpha 255; blended keeps the image alpha
    #[arg(long, value_enum, default_value_t = PolicyArg::Opaque)]
    policy: PolicyArg,

    #[arg(long, value_enum, default_value_t = ContourArg::Dot)]
    contour_style: ContourArg,

    /// Overlay opacity, 0.0 to 1.0
    #[arg(long, default_value_t = 0.5)]
    alpha: f64,

    /// Overlay colour as R,G,B
    #[arg(long, default_value = "0,114,189", value_parser = parse_color)]
    color: Rgb<u8>,

    /// Clicked point as X,Y on the output canvas (defaults to the centre)
    #[arg(long, value_parser = parse_point)]
    point: Option<(f32, f32)>,

    /// Also write the normalized encoder input tensor as raw f32
    #[arg(long)]
    tensor_out: Option<PathBuf>,

    /// Output PNG path
    #[arg(short, long, default_value = "mask.png")]
    output: PathBuf,

    /// Enable debug logging
    #[arg(long)]
    debug: bool,
}

fn parse_color(s: &str) -> Result<Rgb<u8>, String> {
    let channels: Vec<u8> = s
        .split(',')
        .map(|c| c.trim().parse::<u8>().map_err(|e| format!("bad channel {c:?}: {e}")))
        .collect::<Result<_, _>>()?;
    match channels.as_slice() {
        [r, g, b] => Ok(Rgb([*r, *g, *b])),
        _ => Err(format!("expected R,G,B, got {s:?}")),
    }
}

fn parse_point(s: &str) -> Result<(f32, f32), String> {
    let (x, y) = s
        .split_once(',')
        .ok_or_else(|| format!("expected X,Y, got {s:?}"))?;
    let x = x.trim().parse::<f32>().map_err(|e| format!("bad x: {e}"))?;
    let y = y.trim().parse::<f32>().map_err(|e| format!("bad y: {e}"))?;
    Ok((x, y))
}

fn main() -> Result<()> {
    let args = Args::parse();

    // Initialize logging
    let log_level = if args.debug {
        tracing::Level::DEBUG
    } else {
        tracing::Level::INFO
    };

    tracing_subscriber::fmt()
        .with_max_level(log_level)
        .with_target(false)
        .init();

    tracing::info!("clickmask starting");
    tracing::info!("Canvas: {}x{}", args.canvas_size, args.canvas_size);

    let image = image::open(&args.image)
        .with_context(|| format!("Failed to open image {}", args.image.display()))?
        .to_rgba8();
    tracing::info!("Uploaded image is {}x{}px", image.width(), image.height());

    let preprocessor = Preprocessor::new(args.canvas_size);
    let (mut canvas, letterbox) = preprocessor
        .letterbox(&image)
        .context("Failed to prepare image")?;
    tracing::debug!("Letterbox: {:?}", letterbox);

    if let Some(path) = &args.tensor_out {
        let tensor = preprocessor.to_tensor(&canvas);
        let values: Vec<f32> = tensor.iter().copied().collect();
        write_f32_le(path, &values).context("Failed to write encoder tensor")?;
        tracing::info!("Wrote encoder tensor {:?} to {}", tensor.shape(), path.display());
    }

    let mut decoder = segmentation::open_decoder(&args.masks, args.num_masks, args.mask_size)
        .context("Failed to load decoder output")?;

    let (num_masks, mask_height, mask_width) = decoder.output_dims();
    tracing::info!(
        "Decoder output: {} masks of {}x{}",
        num_masks,
        mask_width,
        mask_height
    );
    if args.mask_index >= num_masks {
        anyhow::bail!(
            "Mask index {} out of range ({} masks)",
            args.mask_index,
            num_masks
        );
    }

    let half = args.canvas_size as f32 / 2.0;
    let click = args.point.unwrap_or((half, half));

    let start = Instant::now();
    let buffer = request_masks(decoder.as_mut(), click, args.canvas_size)
        .context("Failed to generate mask")?;

    let config = PostprocessConfig {
        threshold: args.threshold,
        smoothing: args.smooth.then(SmoothingParams::default),
        output_width: args.canvas_size as usize,
        output_height: args.canvas_size as usize,
    };
    let masks = process_masks(&buffer, &config).context("Failed to post-process masks")?;
    let mask = masks.get(args.mask_index).with_context(|| {
        format!(
            "Mask index {} out of range ({} masks)",
            args.mask_index,
            masks.len()
        )
    })?;
    tracing::info!(
        "Mask {} covers {} pixels",
        args.mask_index,
        mask.count_above(0.5)
    );

    draw(&mut canvas, mask, &args)?;
    tracing::info!(
        "Mask generated in {:.1}ms",
        start.elapsed().as_secs_f64() * 1000.0
    );

    canvas
        .save(&args.output)
        .with_context(|| format!("Failed to write {}", args.output.display()))?;
    tracing::info!("Wrote {}", args.output.display());

    Ok(())
}

/// Turn a click on the display canvas into decoder feeds and run the decoder.
fn request_masks(
    decoder: &mut dyn MaskDecoder,
    (x, y): (f32, f32),
    canvas_size: u32,
) -> Result<ProbabilityBuffer> {
    let prompt = DecoderPrompt::from_display_click(x, y, canvas_size as f32);
    let inputs = DecoderInputs::from_prompt(&prompt);
    tracing::debug!("Decoder point_coords: {:?}", inputs.point_coords);
    decoder.decode(&inputs)
}

fn draw(canvas: &mut RgbaImage, mask: &MaskGrid, args: &Args) -> Result<()> {
    // Display masks are already binary.
    let threshold = 0.5;

    if matches!(args.render, RenderMode::Overlay | RenderMode::Both) {
        let style = OverlayStyle {
            color: args.color,
            alpha: args.alpha,
            policy: match args.policy {
                PolicyArg::Opaque => AlphaPolicy::OpaqueOverlay,
                PolicyArg::Blended => AlphaPolicy::BlendedOverlay,
            },
        };
        let region = CanvasRegion::covering(canvas);
        composite_overlay(canvas, mask, threshold, &style, region)
            .context("Failed to draw mask overlay")?;
    }

    if matches!(args.render, RenderMode::Outline | RenderMode::Both) {
        let (width, height) = canvas.dimensions();
        let options = ContourOptions {
            style: match args.contour_style {
                ContourArg::Dot => ContourStyle::DotMarker,
                ContourArg::Outline => ContourStyle::CellOutline,
            },
            membership: Membership::Above(threshold),
            ..ContourOptions::default()
        };
        let mut surface = RasterSurface::new(canvas);
        trace_contour(&mut surface, mask, width, height, Offset::ZERO, &options)
            .context("Failed to draw mask outline")?;
    }

    Ok(())
}
