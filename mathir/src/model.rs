//! Per-glyph MATH data: italic correction, accents, kerning, variants and assemblies.

use std::collections::BTreeMap;

use log::warn;
use serde::{Deserialize, Serialize};

use crate::{
    error::Error,
    serde::{AssemblySerdeRepr, KernFunctionSerdeRepr, VariantListSerdeRepr},
    types::{GlyphId, GlyphName, StretchAxis},
};

/// The corner a kern function applies to, in MathKernInfoRecord order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum KernSide {
    TopRight,
    TopLeft,
    BottomRight,
    BottomLeft,
}

impl KernSide {
    pub const ALL: [KernSide; 4] = [
        KernSide::TopRight,
        KernSide::TopLeft,
        KernSide::BottomRight,
        KernSide::BottomLeft,
    ];

    /// Name of the anchor(s) carrying this side's kern points.
    pub fn anchor_name(self) -> &'static str {
        match self {
            KernSide::TopRight => "math.tr",
            KernSide::TopLeft => "math.tl",
            KernSide::BottomRight => "math.br",
            KernSide::BottomLeft => "math.bl",
        }
    }

    pub fn is_top(self) -> bool {
        matches!(self, KernSide::TopRight | KernSide::TopLeft)
    }

    /// Right side kerns are measured from the advance width, left ones from the origin.
    pub fn is_right(self) -> bool {
        matches!(self, KernSide::TopRight | KernSide::BottomRight)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct KernEntry {
    pub height: i32,
    pub kern: i32,
}

impl KernEntry {
    pub fn new(height: i32, kern: i32) -> Self {
        KernEntry { height, kern }
    }
}

/// A step function from height to kern.
///
/// Heights are strictly increasing. The height of the final entry is not
/// stored in the binary table; its kern applies to everything above the
/// last correction height.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "KernFunctionSerdeRepr", into = "KernFunctionSerdeRepr")]
pub struct KernFunction {
    entries: Vec<KernEntry>,
}

impl KernFunction {
    pub fn new(entries: Vec<KernEntry>) -> Result<Self, Error> {
        if entries.is_empty() {
            return Err(Error::InvalidKernFunction("no entries".to_string()));
        }
        if let Some(w) = entries.windows(2).find(|w| w[0].height >= w[1].height) {
            return Err(Error::InvalidKernFunction(format!(
                "height {} does not increase past {}",
                w[1].height, w[0].height
            )));
        }
        Ok(KernFunction { entries })
    }

    /// Build from unordered points, as placed by a designer.
    ///
    /// Points are sorted by height. Where two points share a height the
    /// first one wins. Returns None if there are no points.
    pub fn from_points(points: impl IntoIterator<Item = KernEntry>) -> Option<Self> {
        let mut points: Vec<_> = points.into_iter().collect();
        // stable, so the first of a shared height stays first
        points.sort_by_key(|p| p.height);
        let mut entries: Vec<KernEntry> = Vec::with_capacity(points.len());
        for point in points {
            match entries.last() {
                Some(prev) if prev.height == point.height => warn!(
                    "Dropping kern point {} at height {}, {} is already there",
                    point.kern, point.height, prev.kern
                ),
                _ => entries.push(point),
            }
        }
        if entries.is_empty() {
            return None;
        }
        Some(KernFunction { entries })
    }

    pub fn entries(&self) -> &[KernEntry] {
        &self.entries
    }

    /// The heights written to the table: every height but the last.
    pub fn correction_heights(&self) -> impl Iterator<Item = i32> + '_ {
        self.entries[..self.entries.len() - 1]
            .iter()
            .map(|e| e.height)
    }

    pub fn kern_values(&self) -> impl Iterator<Item = i32> + '_ {
        self.entries.iter().map(|e| e.kern)
    }

    /// The kern that applies at a given height.
    pub fn kern_at(&self, height: i32) -> i32 {
        let idx = self
            .correction_heights()
            .take_while(|h| *h < height)
            .count();
        self.entries[idx].kern
    }
}

/// The MATH data attached to a glyph in one master.
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GlyphMathAttributes {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub italic_correction: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub top_accent_attachment: Option<i32>,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub extended_shape: bool,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub kerns: BTreeMap<KernSide, KernFunction>,
}

impl GlyphMathAttributes {
    pub fn is_empty(&self) -> bool {
        self.italic_correction.is_none()
            && self.top_accent_attachment.is_none()
            && !self.extended_shape
            && self.kerns.is_empty()
    }

    /// Overlays whatever `other` sets onto `self`, kern side by kern side.
    pub fn merge(&mut self, other: &GlyphMathAttributes) {
        if other.italic_correction.is_some() {
            self.italic_correction = other.italic_correction;
        }
        if other.top_accent_attachment.is_some() {
            self.top_accent_attachment = other.top_accent_attachment;
        }
        self.extended_shape |= other.extended_shape;
        self.kerns
            .extend(other.kerns.iter().map(|(side, kern)| (*side, kern.clone())));
    }
}

/// Glyphs of increasing size, smallest (usually the base glyph) first.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "VariantListSerdeRepr", into = "VariantListSerdeRepr")]
pub struct VariantList(Vec<GlyphId>);

impl VariantList {
    pub fn new(glyphs: Vec<GlyphId>) -> Result<Self, Error> {
        if glyphs.is_empty() {
            return Err(Error::EmptyVariantList);
        }
        Ok(VariantList(glyphs))
    }

    pub fn iter(&self) -> impl Iterator<Item = &GlyphId> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub(crate) fn glyphs_mut(&mut self) -> impl Iterator<Item = &mut GlyphId> {
        self.0.iter_mut()
    }
}

impl IntoIterator for VariantList {
    type Item = GlyphId;
    type IntoIter = std::vec::IntoIter<GlyphId>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

/// One piece of a [`Assembly`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Part {
    pub glyph: GlyphId,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub extender: bool,
    #[serde(default)]
    pub start_connector_length: i32,
    #[serde(default)]
    pub end_connector_length: i32,
}

impl Part {
    pub fn new(glyph: impl Into<GlyphId>, extender: bool, start: i32, end: i32) -> Self {
        Part {
            glyph: glyph.into(),
            extender,
            start_connector_length: start,
            end_connector_length: end,
        }
    }
}

/// The smallest and largest size an assembly can reach without repeating extenders.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AssemblyExtent {
    pub min: f64,
    pub max: f64,
}

/// Parts that stack, bottom to top or left to right, into an arbitrarily large glyph.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "AssemblySerdeRepr", into = "AssemblySerdeRepr")]
pub struct Assembly {
    parts: Vec<Part>,
    /// Overrides the italic correction of the last part.
    pub italic_correction: Option<i32>,
}

impl Assembly {
    pub fn new(parts: Vec<Part>) -> Result<Self, Error> {
        if parts.is_empty() {
            return Err(Error::EmptyAssembly);
        }
        Ok(Assembly {
            parts,
            italic_correction: None,
        })
    }

    pub fn with_italic_correction(mut self, italic_correction: i32) -> Self {
        self.italic_correction = Some(italic_correction);
        self
    }

    pub fn parts(&self) -> &[Part] {
        &self.parts
    }

    pub fn parts_mut(&mut self) -> &mut [Part] {
        &mut self.parts
    }

    pub fn into_parts(self) -> Vec<Part> {
        self.parts
    }

    pub fn last_part(&self) -> &Part {
        // never empty, see new
        &self.parts[self.parts.len() - 1]
    }

    /// The size range of the assembly with each part used once.
    ///
    /// `advance_of` gives a part's advance along the stretch axis. At the
    /// maximum, consecutive parts overlap by exactly `min_connector_overlap`.
    /// At the minimum they overlap by as much as their connectors allow.
    pub fn extent(
        &self,
        advance_of: impl Fn(&GlyphId) -> Option<f64>,
        min_connector_overlap: f64,
    ) -> Option<AssemblyExtent> {
        let mut total = 0.0;
        let mut max_overlap = 0.0;
        let mut prev_end: Option<f64> = None;
        for part in self.parts.iter() {
            total += advance_of(&part.glyph)?;
            if let Some(prev_end) = prev_end {
                let connector = (part.start_connector_length as f64).min(prev_end);
                max_overlap += connector.max(min_connector_overlap);
            }
            prev_end = Some(part.end_connector_length as f64);
        }
        let joins = (self.parts.len() - 1) as f64;
        Some(AssemblyExtent {
            min: total - max_overlap,
            max: total - joins * min_connector_overlap,
        })
    }
}

/// Size variants of a glyph, per axis.
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GlyphVariants {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vertical: Option<VariantList>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub horizontal: Option<VariantList>,
}

impl GlyphVariants {
    pub fn get(&self, axis: StretchAxis) -> Option<&VariantList> {
        match axis {
            StretchAxis::Vertical => self.vertical.as_ref(),
            StretchAxis::Horizontal => self.horizontal.as_ref(),
        }
    }

    pub fn set(&mut self, axis: StretchAxis, variants: Option<VariantList>) {
        match axis {
            StretchAxis::Vertical => self.vertical = variants,
            StretchAxis::Horizontal => self.horizontal = variants,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.vertical.is_none() && self.horizontal.is_none()
    }

    pub(crate) fn glyph_ids_mut(&mut self) -> impl Iterator<Item = &mut GlyphId> {
        self.vertical
            .iter_mut()
            .chain(self.horizontal.iter_mut())
            .flat_map(|v| v.glyphs_mut())
    }
}

/// Assemblies of a glyph layer, per axis.
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LayerAssemblies {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vertical: Option<Assembly>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub horizontal: Option<Assembly>,
}

impl LayerAssemblies {
    pub fn get(&self, axis: StretchAxis) -> Option<&Assembly> {
        match axis {
            StretchAxis::Vertical => self.vertical.as_ref(),
            StretchAxis::Horizontal => self.horizontal.as_ref(),
        }
    }

    pub fn set(&mut self, axis: StretchAxis, assembly: Option<Assembly>) {
        match axis {
            StretchAxis::Vertical => self.vertical = assembly,
            StretchAxis::Horizontal => self.horizontal = assembly,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.vertical.is_none() && self.horizontal.is_none()
    }

    pub(crate) fn glyph_ids_mut(&mut self) -> impl Iterator<Item = &mut GlyphId> {
        self.vertical
            .iter_mut()
            .chain(self.horizontal.iter_mut())
            .flat_map(|a| a.parts.iter_mut().map(|p| &mut p.glyph))
    }
}

/// Rewrites every reference to `old` so it points at `new`.
pub(crate) fn retarget<'a>(
    ids: impl Iterator<Item = &'a mut GlyphId>,
    old: &GlyphName,
    new: &GlyphName,
) {
    for id in ids.filter(|id| id.name() == old) {
        id.retarget(new.clone());
    }
}
