//! Blending per-master MATH data into an instance.
//!
//! Outline-level data (widths, bounds, anchors) blends linearly. MATH
//! constants and assembly connector lengths are not geometry, so they
//! get their own blending rules here.

use std::collections::BTreeMap;

use kurbo::{Point, Rect};
use log::{debug, warn};
use serde::{Deserialize, Serialize};

use crate::{
    constants::{ConstantName, MathConstants},
    error::Error,
    model::Assembly,
    source::{Anchor, Instance, Layer, Master, Metrics, SourceFont, SourceGlyph},
    types::{MasterId, StretchAxis},
    util::ot_round,
};

/// What to do with a constant some masters leave unset.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SparseConstantPolicy {
    /// Unset counts as 0.
    #[default]
    MissingIsZero,
    /// Blend only the masters that set it, renormalizing their weights.
    SkipMissing,
}

/// Blends constants from weighted masters.
///
/// A constant is present in the result if any master sets it.
pub fn interpolate_constants<'a>(
    masters: impl IntoIterator<Item = (&'a MathConstants, f64)>,
    policy: SparseConstantPolicy,
) -> MathConstants {
    let mut sums: BTreeMap<ConstantName, (f64, f64)> = BTreeMap::new();
    for (constants, weight) in masters {
        for (name, value) in constants.iter() {
            let (value_sum, weight_sum) = sums.entry(name).or_default();
            *value_sum += value as f64 * weight;
            *weight_sum += weight;
        }
    }
    sums.into_iter()
        .filter_map(|(name, (value_sum, weight_sum))| {
            let value = match policy {
                SparseConstantPolicy::MissingIsZero => value_sum,
                SparseConstantPolicy::SkipMissing if weight_sum == 0.0 => return None,
                SparseConstantPolicy::SkipMissing => value_sum / weight_sum,
            };
            Some((name, ot_round(value)))
        })
        .collect()
}

/// Blends connector lengths of an assembly across weighted masters.
///
/// Glyphs, extender flags and the italic correction override come from
/// `shape`. Connector lengths are weighted per part index; a master with
/// fewer parts contributes nothing to the missing indices.
pub fn interpolate_assembly<'a>(
    shape: &Assembly,
    masters: impl IntoIterator<Item = (&'a Assembly, f64)>,
) -> Assembly {
    let count = shape.parts().len();
    let mut starts = vec![0.0; count];
    let mut ends = vec![0.0; count];
    for (assembly, weight) in masters {
        if assembly.parts().len() != count {
            debug!(
                "Blending a {} part assembly into a {} part one",
                assembly.parts().len(),
                count
            );
        }
        for (i, part) in assembly.parts().iter().take(count).enumerate() {
            starts[i] += part.start_connector_length as f64 * weight;
            ends[i] += part.end_connector_length as f64 * weight;
        }
    }
    let mut result = shape.clone();
    for (i, part) in result.parts_mut().iter_mut().enumerate() {
        part.start_connector_length = ot_round(starts[i]);
        part.end_connector_length = ot_round(ends[i]);
    }
    result
}

fn blend(values: impl IntoIterator<Item = (f64, f64)>) -> f64 {
    values.into_iter().map(|(v, w)| v * w).sum()
}

fn blend_optional(values: &[(Option<f64>, f64)], fallback: Option<f64>) -> Option<f64> {
    if values.iter().all(|(v, _)| v.is_some()) {
        Some(blend(values.iter().map(|(v, w)| (v.unwrap_or_default(), *w))))
    } else {
        fallback
    }
}

fn blend_metrics(masters: &[(&Master, f64)], default: &Metrics) -> Metrics {
    let optional = |get: fn(&Metrics) -> Option<f64>| {
        let values: Vec<_> = masters.iter().map(|(m, w)| (get(&m.metrics), *w)).collect();
        blend_optional(&values, get(default))
    };
    Metrics {
        ascender: blend(masters.iter().map(|(m, w)| (m.metrics.ascender, *w))),
        descender: blend(masters.iter().map(|(m, w)| (m.metrics.descender, *w))),
        x_height: blend(masters.iter().map(|(m, w)| (m.metrics.x_height, *w))),
        cap_height: blend(masters.iter().map(|(m, w)| (m.metrics.cap_height, *w))),
        x_height_overshoot: optional(|m| m.x_height_overshoot),
        typo_line_gap: optional(|m| m.typo_line_gap),
        hhea_line_gap: optional(|m| m.hhea_line_gap),
        subscript_y_offset: optional(|m| m.subscript_y_offset),
        superscript_y_offset: optional(|m| m.superscript_y_offset),
        strikeout_size: optional(|m| m.strikeout_size),
    }
}

fn blend_point(points: impl IntoIterator<Item = (Point, f64)>) -> Point {
    points
        .into_iter()
        .fold(Point::ZERO, |acc, (p, w)| acc + p.to_vec2() * w)
}

/// `layers` has an entry per master, None where the glyph has no layer.
///
/// Outline data of a missing layer is taken from `default_layer`. Missing
/// assemblies contribute nothing.
fn blend_layer(
    master_id: &MasterId,
    default_layer: &Layer,
    layers: &[(Option<&Layer>, f64)],
) -> Layer {
    let assembly_layers: Vec<_> = layers
        .iter()
        .filter_map(|(l, w)| l.map(|l| (l, *w)))
        .collect();
    let layers: Vec<_> = layers
        .iter()
        .map(|(l, w)| (l.unwrap_or(default_layer), *w))
        .collect();
    let width = blend(layers.iter().map(|(l, w)| (l.width, *w)));
    let bounds = default_layer.bounds.map(|default_bounds| {
        let corners = |corner: fn(&Rect) -> Point| {
            blend_point(
                layers
                    .iter()
                    .map(|(l, w)| (corner(&l.bounds.unwrap_or(default_bounds)), *w)),
            )
        };
        Rect::from_points(corners(|r| r.origin()), corners(|r| Point::new(r.x1, r.y1)))
    });
    let anchors = default_layer
        .anchors
        .iter()
        .map(|anchor| {
            let position = blend_point(layers.iter().map(|(l, w)| {
                let position = l
                    .anchor(&anchor.name)
                    .map(|a| a.position)
                    .unwrap_or(anchor.position);
                (position, *w)
            }));
            Anchor::new(anchor.name.clone(), position)
        })
        .collect();

    let mut assemblies = default_layer.assemblies.clone();
    for axis in StretchAxis::ALL {
        let Some(shape) = default_layer.assemblies.get(axis) else {
            continue;
        };
        let blended = interpolate_assembly(
            shape,
            assembly_layers
                .iter()
                .filter_map(|(l, w)| l.assemblies.get(axis).map(|a| (a, *w))),
        );
        assemblies.set(axis, Some(blended));
    }

    Layer {
        master_id: master_id.clone(),
        width,
        bounds,
        anchors,
        assemblies,
    }
}

fn instantiate_glyph(
    glyph: &SourceGlyph,
    instance_master: &MasterId,
    default_master: &MasterId,
    masters: &[(&Master, f64)],
) -> SourceGlyph {
    let mut result = SourceGlyph {
        layers: Vec::new(),
        ..glyph.clone()
    };
    let Some(default_layer) = glyph.layer(default_master) else {
        warn!("'{}' has no layer for the default master, skipping its layers", glyph.name);
        return result;
    };
    let layers: Vec<_> = masters
        .iter()
        .map(|(m, w)| (glyph.layer(&m.id), *w))
        .collect();
    result
        .layers
        .push(blend_layer(instance_master, default_layer, &layers));
    result
}

/// Builds a single-master font for an instance.
///
/// The master takes the instance's name as its id. Each glyph gets one
/// layer blended from its master layers; the default (first) master
/// supplies the anchors and assembly structure, and stands in for the
/// outline of any master a glyph has no layer or anchor for. Assembly
/// connectors only blend over masters that have the assembly.
pub fn instantiate(
    font: &SourceFont,
    instance: &Instance,
    policy: SparseConstantPolicy,
) -> Result<SourceFont, Error> {
    let default_master = font
        .masters
        .first()
        .ok_or(Error::NoMasters)?;
    let masters = instance
        .interpolation
        .iter()
        .map(|(id, weight)| Ok((font.master(id)?, weight.0)))
        .collect::<Result<Vec<_>, Error>>()?;

    let weight_sum: f64 = masters.iter().map(|(_, w)| w).sum();
    if (weight_sum - 1.0).abs() > 1e-6 {
        warn!(
            "Weights of instance '{}' sum to {weight_sum}, not 1",
            instance.name
        );
    }

    let master_id = MasterId::new(&instance.name);
    let master = Master {
        id: master_id.clone(),
        name: instance.name.clone(),
        metrics: blend_metrics(&masters, &default_master.metrics),
        constants: interpolate_constants(
            masters.iter().map(|(m, w)| (&m.constants, *w)),
            policy,
        ),
    };
    let glyphs = font
        .glyphs
        .iter()
        .map(|g| instantiate_glyph(g, &master_id, &default_master.id, &masters))
        .collect();

    Ok(SourceFont {
        family_name: font.family_name.clone(),
        units_per_em: font.units_per_em,
        use_production_names: font.uses_production_names(Some(instance)),
        masters: vec![master],
        instances: Vec::new(),
        glyphs,
    })
}

#[cfg(test)]
mod tests {
    use ordered_float::OrderedFloat;
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    use crate::{
        anchors::ITALIC_CORRECTION_ANCHOR,
        model::Part,
        source::{Anchor, Layer, SourceGlyph},
    };

    use super::*;

    fn constants(values: &[(ConstantName, i32)]) -> MathConstants {
        values.iter().copied().collect()
    }

    #[test]
    fn blends_axis_height() {
        let a = constants(&[(ConstantName::AxisHeight, 300)]);
        let b = constants(&[(ConstantName::AxisHeight, 400)]);
        let blended = interpolate_constants(
            [(&a, 0.25), (&b, 0.75)],
            SparseConstantPolicy::default(),
        );
        assert_eq!(Some(375), blended.get(ConstantName::AxisHeight));
    }

    #[rstest]
    #[case(SparseConstantPolicy::MissingIsZero, 100)]
    #[case(SparseConstantPolicy::SkipMissing, 200)]
    fn sparse_constants(#[case] policy: SparseConstantPolicy, #[case] expected: i32) {
        let a = constants(&[
            (ConstantName::AxisHeight, 200),
            (ConstantName::MathLeading, 10),
        ]);
        let b = constants(&[(ConstantName::MathLeading, 30)]);
        let blended = interpolate_constants([(&a, 0.5), (&b, 0.5)], policy);
        assert_eq!(Some(expected), blended.get(ConstantName::AxisHeight));
        assert_eq!(Some(20), blended.get(ConstantName::MathLeading));
        assert_eq!(None, blended.get(ConstantName::SpaceAfterScript));
    }

    #[test]
    fn blending_is_idempotent() {
        let a = constants(&[(ConstantName::AxisHeight, 250)]);
        let once = interpolate_constants([(&a, 1.0)], SparseConstantPolicy::default());
        let twice = interpolate_constants([(&once, 1.0)], SparseConstantPolicy::default());
        assert_eq!(a, once);
        assert_eq!(once, twice);
    }

    #[test]
    fn blends_connectors_per_index() {
        let shape = Assembly::new(vec![
            Part::new("bot", false, 0, 100),
            Part::new("ext", true, 100, 100),
            Part::new("top", false, 100, 0),
        ])
        .unwrap();
        let light = Assembly::new(vec![
            Part::new("bot", false, 0, 50),
            Part::new("ext", true, 50, 50),
        ])
        .unwrap();
        let blended = interpolate_assembly(&shape, [(&shape, 0.5), (&light, 0.5)]);
        let connectors: Vec<_> = blended
            .parts()
            .iter()
            .map(|p| (p.start_connector_length, p.end_connector_length))
            .collect();
        assert_eq!(vec![(0, 75), (75, 75), (50, 0)], connectors);
        assert!(blended.parts()[1].extender);
    }

    fn two_master_font() -> SourceFont {
        let mut font = SourceFont::new(1000);
        for (id, ascender, axis_height) in [("light", 700.0, 300), ("bold", 900.0, 400)] {
            font.masters.push(Master {
                id: id.into(),
                name: id.to_string(),
                metrics: Metrics {
                    ascender,
                    descender: -200.0,
                    ..Default::default()
                },
                constants: [(ConstantName::AxisHeight, axis_height)].into_iter().collect(),
            });
        }
        let mut glyph = SourceGlyph::new("f");
        let mut light = Layer::new("light", 400.0);
        light
            .anchors
            .push(Anchor::new(ITALIC_CORRECTION_ANCHOR, (420.0, 0.0)));
        light
            .anchors
            .push(Anchor::new("top", (200.0, 700.0)));
        light.bounds = Some(Rect::new(0.0, 0.0, 400.0, 700.0));
        let mut bold = Layer::new("bold", 600.0);
        bold.anchors
            .push(Anchor::new(ITALIC_CORRECTION_ANCHOR, (660.0, 0.0)));
        bold.bounds = Some(Rect::new(0.0, 0.0, 600.0, 900.0));
        glyph.layers = vec![light, bold];
        font.glyphs.push(glyph);
        font.instances.push(Instance {
            name: "Medium".to_string(),
            interpolation: [
                (MasterId::new("light"), OrderedFloat(0.25)),
                (MasterId::new("bold"), OrderedFloat(0.75)),
            ]
            .into_iter()
            .collect(),
            use_production_names: None,
        });
        font
    }

    #[test]
    fn instantiate_blends_everything() {
        let font = two_master_font();
        let instance = font.instance("Medium").unwrap();
        let result = instantiate(&font, instance, SparseConstantPolicy::default()).unwrap();

        let master = MasterId::new("Medium");
        assert_eq!(1, result.masters.len());
        assert_eq!(850.0, result.masters[0].metrics.ascender);
        assert_eq!(
            Some(375),
            result.constants(&master).unwrap().get(ConstantName::AxisHeight)
        );
        let layer = result.layer("f", &master).unwrap();
        assert_eq!(550.0, layer.width);
        assert_eq!(Some(Rect::new(0.0, 0.0, 550.0, 850.0)), layer.bounds);
        // 0.25 * 420 + 0.75 * 660 = 600, italic correction 600 - 550
        assert_eq!(
            Some(50),
            result.glyph_attributes("f", &master).unwrap().italic_correction
        );
        // bold has no top anchor, light's position stands in
        assert_eq!(Point::new(200.0, 700.0), layer.anchor("top").unwrap().position);
    }

    #[rstest]
    #[case::no_assembly(true)]
    #[case::no_layer(false)]
    fn missing_assembly_contributes_nothing(#[case] bold_has_layer: bool) {
        let mut font = two_master_font();
        let mut glyph = SourceGlyph::new("parenleft");
        let mut light = Layer::new("light", 300.0);
        light.assemblies.set(
            StretchAxis::Vertical,
            Some(
                Assembly::new(vec![
                    Part::new("parenleft.bot", false, 0, 100),
                    Part::new("parenleft.top", false, 100, 0),
                ])
                .unwrap(),
            ),
        );
        glyph.layers.push(light);
        if bold_has_layer {
            glyph.layers.push(Layer::new("bold", 300.0));
        }
        font.glyphs.push(glyph);
        let instance = font.instance("Medium").unwrap();
        let result = instantiate(&font, instance, SparseConstantPolicy::default()).unwrap();

        let layer = result.layer("parenleft", &MasterId::new("Medium")).unwrap();
        let connectors: Vec<_> = layer
            .assemblies
            .get(StretchAxis::Vertical)
            .unwrap()
            .parts()
            .iter()
            .map(|p| (p.start_connector_length, p.end_connector_length))
            .collect();
        // only light, at 0.25, has connectors to give
        assert_eq!(vec![(0, 25), (25, 0)], connectors);
        // the outline still blends with light standing in for bold
        assert_eq!(300.0, layer.width);
    }

    #[test]
    fn instantiate_unknown_master() {
        let mut font = two_master_font();
        font.instances[0]
            .interpolation
            .insert(MasterId::new("black"), OrderedFloat(0.0));
        let instance = font.instances[0].clone();
        assert!(matches!(
            instantiate(&font, &instance, SparseConstantPolicy::default()),
            Err(Error::MasterNotFound(..))
        ));
    }
}
