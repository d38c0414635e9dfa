use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Context as _;

use crate::foundation::error::{OverlayError, OverlayResult};
use crate::render::plan::{FixedAdvance, TextMeasure};
use crate::render::style::LABEL_FONT_SIZE;

/// Env var naming a font file to use for focus-box labels.
pub const LABEL_FONT_ENV: &str = "POSEMARK_LABEL_FONT";

/// Where label glyphs come from.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub enum LabelFontSource {
    /// `POSEMARK_LABEL_FONT` if set, else a semibold system sans-serif face.
    #[default]
    Auto,
    File(PathBuf),
    /// Draw chips without text.
    Disabled,
}

/// Raw font bytes shared between layout and rasterization.
#[derive(Clone)]
pub struct LabelFont {
    pub bytes: Arc<Vec<u8>>,
    /// Face index inside a font collection.
    pub index: u32,
    pub family: String,
}

impl std::fmt::Debug for LabelFont {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LabelFont")
            .field("family", &self.family)
            .field("index", &self.index)
            .field("bytes", &self.bytes.len())
            .finish()
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub(crate) struct LabelBrush;

/// Shapes label text with Parley.
pub(crate) struct LabelText {
    font_ctx: parley::FontContext,
    layout_ctx: parley::LayoutContext<LabelBrush>,
    family: String,
    pub(crate) font: vello_cpu::peniko::FontData,
}

impl LabelText {
    pub(crate) fn new(font: &LabelFont) -> OverlayResult<Self> {
        let mut font_ctx = parley::FontContext::default();
        let families = font_ctx
            .collection
            .register_fonts(parley::fontique::Blob::from(font.bytes.as_ref().clone()), None);
        let family_id = families
            .first()
            .map(|(id, _)| *id)
            .ok_or_else(|| OverlayError::validation("no font families registered from label font"))?;
        let family = font_ctx
            .collection
            .family_name(family_id)
            .ok_or_else(|| OverlayError::validation("registered label font has no family name"))?
            .to_string();

        let data = vello_cpu::peniko::FontData::new(
            vello_cpu::peniko::Blob::from(font.bytes.as_ref().clone()),
            font.index,
        );
        Ok(Self {
            font_ctx,
            layout_ctx: parley::LayoutContext::new(),
            family,
            font: data,
        })
    }

    pub(crate) fn layout(&mut self, text: &str) -> parley::Layout<LabelBrush> {
        let mut builder = self
            .layout_ctx
            .ranged_builder(&mut self.font_ctx, text, 1.0, true);
        builder.push_default(parley::style::StyleProperty::FontStack(
            parley::style::FontStack::Source(std::borrow::Cow::Owned(self.family.clone())),
        ));
        builder.push_default(parley::style::StyleProperty::FontSize(LABEL_FONT_SIZE));
        builder.push_default(parley::style::StyleProperty::Brush(LabelBrush));
        let mut layout: parley::Layout<LabelBrush> = builder.build(text);
        layout.break_all_lines(None);
        layout
    }
}

impl TextMeasure for LabelText {
    fn measure(&mut self, text: &str) -> f64 {
        f64::from(self.layout(text).width())
    }
}

/// Measures with the label font when loaded, else with a fixed advance.
pub(crate) enum LabelMeasure<'a> {
    Shaped(&'a mut LabelText),
    Fixed(FixedAdvance),
}

impl TextMeasure for LabelMeasure<'_> {
    fn measure(&mut self, text: &str) -> f64 {
        match self {
            Self::Shaped(t) => t.measure(text),
            Self::Fixed(f) => f.measure(text),
        }
    }
}

/// Approximate advance of a 12px semibold sans glyph.
pub(crate) const FALLBACK_ADVANCE: f64 = 7.0;

/// Resolve a label font. `Ok(None)` means labels render without text.
pub fn resolve_label_font(source: &LabelFontSource) -> OverlayResult<Option<LabelFont>> {
    match source {
        LabelFontSource::Disabled => Ok(None),
        LabelFontSource::File(path) => load_font_file(path).map(Some),
        LabelFontSource::Auto => {
            if let Some(path) = std::env::var_os(LABEL_FONT_ENV) {
                return load_font_file(Path::new(&path)).map(Some);
            }
            Ok(system_sans_font())
        }
    }
}

fn load_font_file(path: &Path) -> OverlayResult<LabelFont> {
    let bytes = std::fs::read(path)
        .with_context(|| format!("read label font '{}'", path.display()))?;
    let family = path
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("label")
        .to_owned();
    Ok(LabelFont {
        bytes: Arc::new(bytes),
        index: 0,
        family,
    })
}

fn system_sans_font() -> Option<LabelFont> {
    use usvg::fontdb::{Database, Family, Query, Stretch, Style, Weight};

    let mut db = Database::new();
    db.load_system_fonts();
    let query = Query {
        families: &[Family::SansSerif, Family::Serif, Family::Monospace],
        weight: Weight::SEMIBOLD,
        stretch: Stretch::Normal,
        style: Style::Normal,
    };
    let Some(id) = db.query(&query) else {
        tracing::debug!("no system font found; labels will render without text");
        return None;
    };
    let family = db
        .face(id)
        .and_then(|face| face.families.first().map(|(name, _)| name.clone()))
        .unwrap_or_else(|| "sans-serif".to_owned());
    let (bytes, index) = db.with_face_data(id, |data, index| (data.to_vec(), index))?;
    tracing::debug!(%family, index, "label font resolved from system fonts");
    Some(LabelFont {
        bytes: Arc::new(bytes),
        index,
        family,
    })
}
