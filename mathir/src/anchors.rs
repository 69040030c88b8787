//! MATH glyph attributes stored as layer anchors.
//!
//! Designers place anchors where the value is visible: the italic
//! correction sits to the right of the advance width, kern points sit at
//! their height beside the glyph. Reading normalizes anchor positions to
//! table values, writing does the inverse.

use std::collections::BTreeMap;

use kurbo::Point;

use crate::{
    model::{GlyphMathAttributes, KernEntry, KernFunction, KernSide},
    source::{Anchor, Layer},
    util::ot_round,
};

pub const ITALIC_CORRECTION_ANCHOR: &str = "math.ic";
pub const TOP_ACCENT_ANCHOR: &str = "math.ta";

/// The kern side an anchor belongs to.
///
/// A side may have many points: `math.tr`, `math.tr.1`, `math.tr.2` and so on.
pub fn kern_side(anchor_name: &str) -> Option<KernSide> {
    KernSide::ALL.into_iter().find(|side| {
        anchor_name
            .strip_prefix(side.anchor_name())
            .is_some_and(|rest| rest.is_empty() || rest.starts_with('.'))
    })
}

pub fn is_math_anchor(anchor_name: &str) -> bool {
    anchor_name == ITALIC_CORRECTION_ANCHOR
        || anchor_name == TOP_ACCENT_ANCHOR
        || kern_side(anchor_name).is_some()
}

/// Reads the anchor-borne attributes of a layer.
///
/// The extended shape flag is glyph-level and left unset.
pub fn read_attributes(layer: &Layer) -> GlyphMathAttributes {
    let mut attributes = GlyphMathAttributes::default();
    let mut kern_points: BTreeMap<KernSide, Vec<KernEntry>> = BTreeMap::new();
    for anchor in layer.anchors.iter() {
        let Point { x, y } = anchor.position;
        match anchor.name.as_str() {
            ITALIC_CORRECTION_ANCHOR => {
                attributes.italic_correction = Some(ot_round(x - layer.width))
            }
            TOP_ACCENT_ANCHOR => attributes.top_accent_attachment = Some(ot_round(x)),
            name => {
                let Some(side) = kern_side(name) else {
                    continue;
                };
                let kern = if side.is_right() { x - layer.width } else { -x };
                kern_points
                    .entry(side)
                    .or_default()
                    .push(KernEntry::new(ot_round(y), ot_round(kern)));
            }
        }
    }
    attributes.kerns = kern_points
        .into_iter()
        .filter_map(|(side, points)| KernFunction::from_points(points).map(|f| (side, f)))
        .collect();
    attributes
}

/// Replaces the MATH anchors of a layer with ones describing `attributes`.
///
/// Anchors that aren't MATH anchors are left alone.
pub fn write_attributes(layer: &mut Layer, attributes: &GlyphMathAttributes) {
    layer.anchors.retain(|a| !is_math_anchor(&a.name));

    if let Some(italic_correction) = attributes.italic_correction {
        layer.anchors.push(Anchor::new(
            ITALIC_CORRECTION_ANCHOR,
            (layer.width + italic_correction as f64, 0.0),
        ));
    }
    if let Some(top_accent) = attributes.top_accent_attachment {
        layer
            .anchors
            .push(Anchor::new(TOP_ACCENT_ANCHOR, (top_accent as f64, 0.0)));
    }
    for (side, function) in attributes.kerns.iter() {
        for (i, entry) in function.entries().iter().enumerate() {
            let name = match i {
                0 => side.anchor_name().to_string(),
                _ => format!("{}.{i}", side.anchor_name()),
            };
            let x = if side.is_right() {
                layer.width + entry.kern as f64
            } else {
                -entry.kern as f64
            };
            layer
                .anchors
                .push(Anchor::new(name, (x, entry.height as f64)));
        }
    }
}
