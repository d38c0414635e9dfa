use std::sync::Arc;

use vello_cpu::kurbo::Shape as _;

use crate::foundation::core::{Point, Rect, Rgba8, Viewport};
use crate::foundation::error::{OverlayError, OverlayResult};
use crate::foundation::math::mul_div255_u16;
use crate::render::frame::FrameRGBA;
use crate::render::plan::{FixedAdvance, LabelChip, OverlayOp};
use crate::render::style::{
    BONE_GLOW_RADIUS, BONE_LINE_WIDTH, FOCUS_GLOW_RADIUS, FOCUS_LINE_WIDTH, LABEL_FONT_SIZE,
    palette,
};
use crate::render::text::{FALLBACK_ADVANCE, LabelFont, LabelMeasure, LabelText};

/// Decoded video picture drawn beneath the overlay when burning in.
#[derive(Clone, Copy, Debug)]
pub struct BackgroundFrame<'a> {
    pub width: u32,
    pub height: u32,
    /// Straight-alpha RGBA8, row-major, tightly packed.
    pub rgba: &'a [u8],
}

/// Rasterizes overlay ops with `vello_cpu`.
pub struct CpuOverlayRenderer {
    text: Option<LabelText>,
}

impl std::fmt::Debug for CpuOverlayRenderer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CpuOverlayRenderer")
            .field("has_label_font", &self.text.is_some())
            .finish()
    }
}

impl CpuOverlayRenderer {
    /// A font that fails to register is logged and labels render without text.
    pub fn new(font: Option<&LabelFont>) -> Self {
        let text = font.and_then(|f| match LabelText::new(f) {
            Ok(t) => Some(t),
            Err(e) => {
                tracing::warn!(error = %e, family = %f.family, "label font unusable; labels render without text");
                None
            }
        });
        Self { text }
    }

    pub(crate) fn measure(&mut self) -> LabelMeasure<'_> {
        match self.text.as_mut() {
            Some(t) => LabelMeasure::Shaped(t),
            None => LabelMeasure::Fixed(FixedAdvance(FALLBACK_ADVANCE)),
        }
    }

    /// Clear, optionally paint `background` into `content`, then draw `ops` under one opacity
    /// layer. Returns premultiplied pixels.
    pub fn render(
        &mut self,
        ops: &[OverlayOp],
        viewport: Viewport,
        opacity: f64,
        background: Option<(BackgroundFrame<'_>, Rect)>,
    ) -> OverlayResult<FrameRGBA> {
        let width: u16 = viewport
            .width
            .try_into()
            .map_err(|_| OverlayError::render("viewport width exceeds u16"))?;
        let height: u16 = viewport
            .height
            .try_into()
            .map_err(|_| OverlayError::render("viewport height exceeds u16"))?;

        let mut ctx = vello_cpu::RenderContext::new(width, height);

        if let Some((bg, content)) = background {
            draw_background(&mut ctx, viewport, bg, content)?;
        }

        let alpha = opacity.clamp(0.0, 1.0) as f32;
        let layered = alpha < 1.0;
        if layered {
            ctx.push_opacity_layer(alpha);
        }
        for op in ops {
            self.draw_op(&mut ctx, op);
        }
        if layered {
            ctx.pop_layer();
        }

        ctx.flush();
        let mut pixmap = vello_cpu::Pixmap::new(width, height);
        ctx.render_to_pixmap(&mut pixmap);

        Ok(FrameRGBA {
            width: viewport.width,
            height: viewport.height,
            data: pixmap.data_as_u8_slice().to_vec(),
            premultiplied: true,
        })
    }

    fn draw_op(&mut self, ctx: &mut vello_cpu::RenderContext, op: &OverlayOp) {
        ctx.set_transform(vello_cpu::kurbo::Affine::IDENTITY);
        ctx.set_paint_transform(vello_cpu::kurbo::Affine::IDENTITY);

        match op {
            OverlayOp::FocusBox { rect, color, label } => {
                let r = rect_to_cpu(*rect);
                stroke_with_glow(ctx, *color, FOCUS_LINE_WIDTH, FOCUS_GLOW_RADIUS, |ctx| {
                    ctx.stroke_rect(&r)
                });
                if let Some(chip) = label {
                    self.draw_label(ctx, chip, *color);
                }
            }
            OverlayOp::Bone { from, to } => {
                let mut path = vello_cpu::kurbo::BezPath::new();
                path.move_to(point_to_cpu(*from));
                path.line_to(point_to_cpu(*to));
                glow(ctx, palette::BONE_GLOW, BONE_LINE_WIDTH, BONE_GLOW_RADIUS, |ctx| {
                    ctx.stroke_path(&path)
                });
                ctx.set_paint(color_to_cpu(palette::BONE));
                ctx.set_stroke(vello_cpu::kurbo::Stroke::new(BONE_LINE_WIDTH));
                ctx.stroke_path(&path);
            }
            OverlayOp::Joint { center, radius } => {
                let circle = vello_cpu::kurbo::Circle::new(point_to_cpu(*center), *radius);
                ctx.set_paint(color_to_cpu(palette::MINT));
                ctx.fill_path(&circle.to_path(0.1));
            }
        }
    }

    fn draw_label(&mut self, ctx: &mut vello_cpu::RenderContext, chip: &LabelChip, color: Rgba8) {
        let r = rect_to_cpu(chip.rect);
        ctx.set_paint(color_to_cpu(palette::CHIP_BG));
        ctx.fill_rect(&r);
        ctx.set_paint(color_to_cpu(color));
        ctx.set_stroke(vello_cpu::kurbo::Stroke::new(FOCUS_LINE_WIDTH));
        ctx.stroke_rect(&r);

        let Some(text) = self.text.as_mut() else {
            return;
        };
        let layout = text.layout(&chip.text);
        let origin = chip.origin;
        for line in layout.lines() {
            for item in line.items() {
                let parley::layout::PositionedLayoutItem::GlyphRun(run) = item else {
                    continue;
                };
                let baseline = run.baseline();
                let glyphs = run.positioned_glyphs().map(|g| vello_cpu::Glyph {
                    id: g.id,
                    x: origin.x as f32 + g.x,
                    y: origin.y as f32 + (g.y - baseline),
                });
                ctx.glyph_run(&text.font)
                    .font_size(LABEL_FONT_SIZE)
                    .fill_glyphs(glyphs);
            }
        }
    }
}

/// Soft halo standing in for a canvas shadow blur: wider translucent passes under the line.
fn glow(
    ctx: &mut vello_cpu::RenderContext,
    color: Rgba8,
    line_width: f64,
    radius: f64,
    mut draw: impl FnMut(&mut vello_cpu::RenderContext),
) {
    for (spread, alpha) in [(1.0, 0.18), (0.5, 0.32)] {
        ctx.set_paint(color_to_cpu(color.with_alpha_scaled(alpha)));
        ctx.set_stroke(vello_cpu::kurbo::Stroke::new(line_width + radius * spread));
        draw(ctx);
    }
}

fn stroke_with_glow(
    ctx: &mut vello_cpu::RenderContext,
    color: Rgba8,
    line_width: f64,
    radius: f64,
    mut draw: impl FnMut(&mut vello_cpu::RenderContext),
) {
    glow(ctx, color, line_width, radius, &mut draw);
    ctx.set_paint(color_to_cpu(color));
    ctx.set_stroke(vello_cpu::kurbo::Stroke::new(line_width));
    draw(ctx);
}

fn draw_background(
    ctx: &mut vello_cpu::RenderContext,
    viewport: Viewport,
    bg: BackgroundFrame<'_>,
    content: Rect,
) -> OverlayResult<()> {
    ctx.set_transform(vello_cpu::kurbo::Affine::IDENTITY);
    ctx.set_paint_transform(vello_cpu::kurbo::Affine::IDENTITY);
    ctx.set_paint(vello_cpu::peniko::Color::from_rgba8(0, 0, 0, 255));
    ctx.fill_rect(&vello_cpu::kurbo::Rect::new(
        0.0,
        0.0,
        viewport.width_f64(),
        viewport.height_f64(),
    ));

    if bg.width == 0 || bg.height == 0 {
        return Ok(());
    }
    let pixmap = straight_rgba_to_pixmap(bg.rgba, bg.width, bg.height)?;
    let image = vello_cpu::Image {
        image: vello_cpu::ImageSource::Pixmap(Arc::new(pixmap)),
        sampler: vello_cpu::peniko::ImageSampler::default(),
    };

    let sx = content.width() / f64::from(bg.width);
    let sy = content.height() / f64::from(bg.height);
    ctx.set_transform(
        vello_cpu::kurbo::Affine::translate((content.x0, content.y0))
            * vello_cpu::kurbo::Affine::scale_non_uniform(sx, sy),
    );
    ctx.set_paint(image);
    ctx.fill_rect(&vello_cpu::kurbo::Rect::new(
        0.0,
        0.0,
        f64::from(bg.width),
        f64::from(bg.height),
    ));
    ctx.set_transform(vello_cpu::kurbo::Affine::IDENTITY);
    Ok(())
}

fn straight_rgba_to_pixmap(
    rgba8: &[u8],
    width: u32,
    height: u32,
) -> OverlayResult<vello_cpu::Pixmap> {
    let w: u16 = width
        .try_into()
        .map_err(|_| OverlayError::render("background width exceeds u16"))?;
    let h: u16 = height
        .try_into()
        .map_err(|_| OverlayError::render("background height exceeds u16"))?;
    if rgba8.len() != width as usize * height as usize * 4 {
        return Err(OverlayError::render("background byte length mismatch"));
    }

    let mut may_have_opacities = false;
    let mut pixels = Vec::with_capacity(width as usize * height as usize);
    for px in rgba8.chunks_exact(4) {
        let a = px[3];
        may_have_opacities |= a != 255;
        let premul = |c: u8| mul_div255_u16(u16::from(c), u16::from(a)) as u8;
        pixels.push(vello_cpu::peniko::color::PremulRgba8 {
            r: premul(px[0]),
            g: premul(px[1]),
            b: premul(px[2]),
            a,
        });
    }

    Ok(vello_cpu::Pixmap::from_parts_with_opacity(
        pixels,
        w,
        h,
        may_have_opacities,
    ))
}

fn color_to_cpu(c: Rgba8) -> vello_cpu::peniko::Color {
    vello_cpu::peniko::Color::from_rgba8(c.r, c.g, c.b, c.a)
}

fn point_to_cpu(p: Point) -> vello_cpu::kurbo::Point {
    vello_cpu::kurbo::Point::new(p.x, p.y)
}

fn rect_to_cpu(r: Rect) -> vello_cpu::kurbo::Rect {
    vello_cpu::kurbo::Rect::new(r.x0, r.y0, r.x1, r.y1)
}
