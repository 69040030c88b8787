//! Builds a MATH table from the annotation model of a source.
//!
//! Encoding happens in two steps. [`collect`] gathers everything to emit,
//! keyed by the names glyphs have in the compiled font. [`resolve`] then maps
//! names to glyph ids, so the binary table comes out in glyph order no matter
//! what order the source lists glyphs in.

use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};

use log::{debug, warn};
use mathir::{
    anchors,
    constants::{ConstantName, MathConstants},
    model::{KernFunction, KernSide},
    source::{Instance, SourceFont},
    types::{GlyphId, GlyphName, MasterId, StretchAxis},
    util::ot_round,
};
use write_fonts::types::GlyphId16;

use crate::{
    error::{Error, GlyphProblem},
    glyph_order::GlyphOrder,
    math::{AssemblyData, ConstructionData, KernData, MathData, PartData, PartFlags, VariantData},
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CollectedVariant {
    pub glyph: GlyphName,
    pub advance: i32,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CollectedPart {
    pub glyph: GlyphName,
    pub extender: bool,
    pub start_connector_length: i32,
    pub end_connector_length: i32,
    pub full_advance: i32,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CollectedAssembly {
    pub italic_correction: i32,
    pub parts: Vec<CollectedPart>,
}

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct CollectedConstruction {
    pub variants: Vec<CollectedVariant>,
    pub assembly: Option<CollectedAssembly>,
}

/// Everything a MATH table will hold, keyed by compiled glyph name.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct CollectedMath {
    /// Constants of the MathConstants subtable.
    pub constants: MathConstants,
    /// Written to MathVariants rather than MathConstants.
    pub min_connector_overlap: Option<i32>,
    pub italic_corrections: BTreeMap<GlyphName, i32>,
    pub top_accent_attachments: BTreeMap<GlyphName, i32>,
    pub extended_shapes: BTreeSet<GlyphName>,
    pub kerns: BTreeMap<GlyphName, BTreeMap<KernSide, KernFunction>>,
    pub vertical: BTreeMap<GlyphName, CollectedConstruction>,
    pub horizontal: BTreeMap<GlyphName, CollectedConstruction>,
}

impl CollectedMath {
    pub fn is_empty(&self) -> bool {
        self.constants.is_empty()
            && self.min_connector_overlap.is_none()
            && self.italic_corrections.is_empty()
            && self.top_accent_attachments.is_empty()
            && self.extended_shapes.is_empty()
            && self.kerns.is_empty()
            && self.vertical.is_empty()
            && self.horizontal.is_empty()
    }

    fn constructions_mut(
        &mut self,
        axis: StretchAxis,
    ) -> &mut BTreeMap<GlyphName, CollectedConstruction> {
        match axis {
            StretchAxis::Vertical => &mut self.vertical,
            StretchAxis::Horizontal => &mut self.horizontal,
        }
    }
}

struct Collector<'a> {
    font: &'a SourceFont,
    master: &'a MasterId,
    production_names: &'a HashMap<GlyphName, GlyphName>,
}

impl Collector<'_> {
    fn compiled_name(&self, name: &GlyphName) -> GlyphName {
        self.production_names
            .get(name)
            .cloned()
            .unwrap_or_else(|| name.clone())
    }

    /// The compiled name and advance of a glyph referenced by another.
    fn referenced(
        &self,
        glyph: &GlyphId,
        axis: StretchAxis,
        referenced_by: impl FnOnce() -> String,
    ) -> Result<(GlyphName, i32), Error> {
        let Ok(source_glyph) = glyph.resolve(self.font) else {
            return Err(Error::UnresolvedGlyphReference {
                glyph: glyph.name().clone(),
                referenced_by: referenced_by(),
                problem: GlyphProblem::NotInSource,
            });
        };
        let layer = self.font.layer(source_glyph.name.as_str(), self.master)?;
        Ok((
            self.compiled_name(&source_glyph.name),
            ot_round(layer.bbox_advance(axis)),
        ))
    }
}

/// Gathers the MATH data of one master.
///
/// `production_names` maps source glyph names to compiled ones; glyphs it
/// doesn't mention keep their name.
pub fn collect(
    font: &SourceFont,
    master: &MasterId,
    production_names: &HashMap<GlyphName, GlyphName>,
) -> Result<CollectedMath, Error> {
    let collector = Collector {
        font,
        master,
        production_names,
    };
    let mut collected = CollectedMath {
        constants: font.constants(master)?.clone(),
        ..Default::default()
    };
    collected.min_connector_overlap = collected
        .constants
        .remove(ConstantName::MinConnectorOverlap);

    // last parts whose italic correction moved into their assembly
    let mut consumed_italics = HashSet::new();

    for glyph in font.glyphs.iter() {
        let compiled = collector.compiled_name(&glyph.name);
        let layer = glyph.layer(master);
        if layer.is_none() {
            warn!(
                "'{}' has no layer for '{master}', writing only its variants and extended shape",
                glyph.name
            );
        }

        if let Some(layer) = layer {
            let attributes = anchors::read_attributes(layer);
            if let Some(italic) = attributes.italic_correction {
                collected.italic_corrections.insert(compiled.clone(), italic);
            }
            if let Some(accent) = attributes.top_accent_attachment {
                collected
                    .top_accent_attachments
                    .insert(compiled.clone(), accent);
            }
            if !attributes.kerns.is_empty() {
                collected.kerns.insert(compiled.clone(), attributes.kerns);
            }
        }
        if glyph.extended_shape {
            collected.extended_shapes.insert(compiled.clone());
        }

        for axis in StretchAxis::ALL {
            let mut construction = CollectedConstruction::default();
            if let Some(variants) = glyph.variants.get(axis) {
                for variant in variants.iter() {
                    let (name, advance) = collector.referenced(variant, axis, || {
                        format!("the {axis} variants of '{}'", glyph.name)
                    })?;
                    // bigger versions of an extended shape are extended too
                    if glyph.extended_shape && axis == StretchAxis::Vertical {
                        collected.extended_shapes.insert(name.clone());
                    }
                    construction.variants.push(CollectedVariant {
                        glyph: name,
                        advance,
                    });
                }
            }
            if let Some(assembly) = layer.and_then(|l| l.assemblies.get(axis)) {
                let mut parts = Vec::with_capacity(assembly.parts().len());
                for part in assembly.parts() {
                    let (name, full_advance) = collector.referenced(&part.glyph, axis, || {
                        format!("the {axis} assembly of '{}'", glyph.name)
                    })?;
                    parts.push(CollectedPart {
                        glyph: name,
                        extender: part.extender,
                        start_connector_length: part.start_connector_length,
                        end_connector_length: part.end_connector_length,
                        full_advance,
                    });
                }
                let last = assembly.last_part().glyph.name();
                let own_italic = font
                    .glyph_attributes(last.as_str(), master)?
                    .italic_correction;
                if own_italic.is_some() {
                    consumed_italics.insert(collector.compiled_name(last));
                }
                construction.assembly = Some(CollectedAssembly {
                    italic_correction: assembly
                        .italic_correction
                        .or(own_italic)
                        .unwrap_or_default(),
                    parts,
                });
            }
            if !construction.variants.is_empty() || construction.assembly.is_some() {
                collected
                    .constructions_mut(axis)
                    .insert(compiled.clone(), construction);
            }
        }
    }

    for name in consumed_italics {
        debug!("Italic correction of '{name}' belongs to an assembly");
        collected.italic_corrections.remove(&name);
    }
    Ok(collected)
}

fn to_i16(value: i32, what: impl FnOnce() -> String) -> Result<i16, Error> {
    i16::try_from(value).map_err(|_| Error::ValueOutOfRange {
        what: what(),
        value,
        field: "int16",
    })
}

fn to_u16(value: i32, what: impl FnOnce() -> String) -> Result<u16, Error> {
    u16::try_from(value).map_err(|_| Error::ValueOutOfRange {
        what: what(),
        value,
        field: "uint16",
    })
}

fn glyph_id(
    glyph_order: &GlyphOrder,
    glyph: &GlyphName,
    referenced_by: impl FnOnce() -> String,
) -> Result<GlyphId16, Error> {
    glyph_order
        .glyph_id(glyph.as_str())
        .ok_or_else(|| Error::UnresolvedGlyphReference {
            glyph: glyph.clone(),
            referenced_by: referenced_by(),
            problem: GlyphProblem::NotInGlyphOrder,
        })
}

fn resolve_values(
    glyph_order: &GlyphOrder,
    values: &BTreeMap<GlyphName, i32>,
    what: &str,
) -> Result<BTreeMap<GlyphId16, i16>, Error> {
    values
        .iter()
        .map(|(glyph, value)| {
            let gid = glyph_id(glyph_order, glyph, || what.to_string())?;
            let value = to_i16(*value, || format!("the {what} of '{glyph}'"))?;
            Ok((gid, value))
        })
        .collect()
}

fn resolve_kern(
    glyph: &GlyphName,
    side: KernSide,
    function: &KernFunction,
) -> Result<KernData, Error> {
    let what = || format!("a {side:?} kern of '{glyph}'");
    Ok(KernData {
        heights: function
            .correction_heights()
            .map(|h| to_i16(h, what))
            .collect::<Result<_, _>>()?,
        kerns: function
            .kern_values()
            .map(|k| to_i16(k, what))
            .collect::<Result<_, _>>()?,
    })
}

fn resolve_construction(
    glyph_order: &GlyphOrder,
    glyph: &GlyphName,
    axis: StretchAxis,
    construction: &CollectedConstruction,
) -> Result<ConstructionData, Error> {
    let referenced_by = || format!("the {axis} construction of '{glyph}'");
    let variants = construction
        .variants
        .iter()
        .map(|v| {
            Ok(VariantData {
                glyph: glyph_id(glyph_order, &v.glyph, referenced_by)?,
                advance: to_u16(v.advance, || format!("the advance of '{}'", v.glyph))?,
            })
        })
        .collect::<Result<_, Error>>()?;
    let assembly = construction
        .assembly
        .as_ref()
        .map(|assembly| {
            let parts = assembly
                .parts
                .iter()
                .map(|p| {
                    let what = || format!("part '{}' of {}", p.glyph, referenced_by());
                    Ok(PartData {
                        glyph: glyph_id(glyph_order, &p.glyph, referenced_by)?,
                        start_connector_length: to_u16(p.start_connector_length, what)?,
                        end_connector_length: to_u16(p.end_connector_length, what)?,
                        full_advance: to_u16(p.full_advance, what)?,
                        flags: if p.extender {
                            PartFlags::EXTENDER
                        } else {
                            PartFlags::empty()
                        },
                    })
                })
                .collect::<Result<_, Error>>()?;
            Ok::<_, Error>(AssemblyData {
                italics_correction: to_i16(assembly.italic_correction, || {
                    format!("the italic correction of {}", referenced_by())
                })?,
                parts,
            })
        })
        .transpose()?;
    Ok(ConstructionData { variants, assembly })
}

/// Maps collected names to glyph ids.
pub fn resolve(collected: &CollectedMath, glyph_order: &GlyphOrder) -> Result<MathData, Error> {
    let mut math = MathData {
        constants: (!collected.constants.is_empty()).then(|| collected.constants.clone()),
        min_connector_overlap: collected
            .min_connector_overlap
            .map(|v| to_u16(v, || ConstantName::MinConnectorOverlap.to_string()))
            .transpose()?,
        italics_corrections: resolve_values(
            glyph_order,
            &collected.italic_corrections,
            "italic correction",
        )?,
        top_accent_attachments: resolve_values(
            glyph_order,
            &collected.top_accent_attachments,
            "top accent attachment",
        )?,
        ..Default::default()
    };
    for glyph in collected.extended_shapes.iter() {
        math.extended_shapes
            .insert(glyph_id(glyph_order, glyph, || "extended shapes".to_string())?);
    }
    for (glyph, sides) in collected.kerns.iter() {
        let gid = glyph_id(glyph_order, glyph, || "math kerning".to_string())?;
        let sides = sides
            .iter()
            .map(|(side, function)| Ok((*side, resolve_kern(glyph, *side, function)?)))
            .collect::<Result<_, Error>>()?;
        math.kerns.insert(gid, sides);
    }
    for (axis, constructions) in [
        (StretchAxis::Vertical, &collected.vertical),
        (StretchAxis::Horizontal, &collected.horizontal),
    ] {
        for (glyph, construction) in constructions.iter() {
            let gid = glyph_id(glyph_order, glyph, || format!("{axis} constructions"))?;
            let construction = resolve_construction(glyph_order, glyph, axis, construction)?;
            math.constructions_mut(axis).insert(gid, construction);
        }
    }
    Ok(math)
}

/// Encodes the MATH data of a master, None if there is nothing to write.
///
/// `instance` only decides whether production names are used.
pub fn encode(
    font: &SourceFont,
    glyph_order: &GlyphOrder,
    master_idx: usize,
    instance: Option<&Instance>,
) -> Result<Option<Vec<u8>>, Error> {
    let master = font
        .masters
        .get(master_idx)
        .ok_or(Error::NoSuchMaster(master_idx))?;
    let production_names = font.production_names(instance);
    let collected = collect(font, &master.id, &production_names)?;
    if collected.is_empty() {
        debug!("No MATH data for '{}'", master.id);
        return Ok(None);
    }
    resolve(&collected, glyph_order)?.to_bytes().map(Some)
}

#[cfg(test)]
mod tests {
    use mathir::{
        model::{KernEntry, VariantList},
        source::{Anchor, Layer, SourceGlyph},
    };
    use pretty_assertions::assert_eq;

    use crate::test_util::{glyph_order, source_font, MASTER};

    use super::*;

    fn gid(id: u16) -> GlyphId16 {
        GlyphId16::new(id)
    }

    fn collect_default(font: &SourceFont) -> CollectedMath {
        collect(font, &MASTER.into(), &font.production_names(None)).unwrap()
    }

    fn math_data(font: &SourceFont) -> MathData {
        resolve(&collect_default(font), &glyph_order(font)).unwrap()
    }

    #[test]
    fn min_connector_overlap_goes_to_variants() {
        let collected = collect_default(&source_font());
        assert_eq!(Some(20), collected.min_connector_overlap);
        assert!(!collected
            .constants
            .contains(ConstantName::MinConnectorOverlap));
        assert_eq!(Some(250), collected.constants.get(ConstantName::AxisHeight));
    }

    #[test]
    fn uses_production_names() {
        let collected = collect_default(&source_font());
        assert!(collected.vertical.contains_key("uni0028"));
        assert!(!collected.vertical.contains_key("parenleft"));
        assert_eq!(
            vec!["uni0028", "parenleft.size1"],
            collected.vertical["uni0028"]
                .variants
                .iter()
                .map(|v| v.glyph.as_str())
                .collect::<Vec<_>>()
        );

        let mut font = source_font();
        font.use_production_names = false;
        let collected = collect_default(&font);
        assert!(collected.vertical.contains_key("parenleft"));
    }

    #[test]
    fn advances_come_from_bounds() {
        let collected = collect_default(&source_font());
        let paren = &collected.vertical["uni0028"];
        assert_eq!(
            vec![1000, 1200],
            paren.variants.iter().map(|v| v.advance).collect::<Vec<_>>()
        );
        let assembly = paren.assembly.as_ref().unwrap();
        assert_eq!(
            vec![600, 300, 600],
            assembly
                .parts
                .iter()
                .map(|p| p.full_advance)
                .collect::<Vec<_>>()
        );
        assert_eq!(
            vec![1000, 1500],
            collected.horizontal["arrowright"]
                .variants
                .iter()
                .map(|v| v.advance)
                .collect::<Vec<_>>()
        );
    }

    #[test]
    fn empty_model_writes_nothing() {
        let mut font = SourceFont::new(1000);
        font.masters = source_font().masters;
        font.masters[0].constants = Default::default();
        let mut glyph = SourceGlyph::new("a");
        glyph.layers.push(Layer::new(MASTER, 500.0));
        font.glyphs.push(glyph);
        let order = glyph_order(&font);
        assert_eq!(None, encode(&font, &order, 0, None).unwrap());
    }

    #[test]
    fn encoding_is_deterministic() {
        let font = source_font();
        let order = glyph_order(&font);
        let first = encode(&font, &order, 0, None).unwrap().unwrap();
        let second = encode(&font, &order, 0, None).unwrap().unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn coverage_follows_glyph_order() {
        let mut font = SourceFont::new(1000);
        font.masters = source_font().masters;
        for (name, italic) in [("C", 30.0), ("A", 10.0), ("B", 20.0)] {
            let mut glyph = SourceGlyph::new(name);
            let mut layer = Layer::new(MASTER, 500.0);
            layer
                .anchors
                .push(Anchor::new("math.ic", (500.0 + italic, 0.0)));
            glyph.layers.push(layer);
            font.glyphs.push(glyph);
        }
        let order: GlyphOrder = [".notdef", "A", "x", "B", "y", "C"].into_iter().collect();
        let bytes = encode(&font, &order, 0, None).unwrap().unwrap();

        let math = MathData::parse(&bytes).unwrap();
        assert_eq!(
            vec![(gid(1), 10), (gid(3), 20), (gid(5), 30)],
            math.italics_corrections.into_iter().collect::<Vec<_>>()
        );

        // the raw coverage lists A, B, C and the values follow
        let read = |pos: usize| u16::from_be_bytes([bytes[pos], bytes[pos + 1]]);
        let glyph_info = read(6) as usize;
        let italics = glyph_info + read(glyph_info) as usize;
        let coverage = italics + read(italics) as usize;
        // format 1, three glyphs
        assert_eq!((1, 3), (read(coverage), read(coverage + 2)));
        assert_eq!(
            vec![1, 3, 5],
            (0..3).map(|i| read(coverage + 4 + i * 2)).collect::<Vec<_>>()
        );
        assert_eq!(
            vec![10, 20, 30],
            (0..3).map(|i| read(italics + 4 + i * 4)).collect::<Vec<_>>()
        );
    }

    #[test]
    fn kern_anchors_are_normalized() {
        let mut font = source_font();
        let layer = font.glyph_mut("f").unwrap().layer_mut(&MASTER.into()).unwrap();
        layer.anchors.retain(|a| !a.name.starts_with("math."));
        layer.anchors.push(Anchor::new("math.tr", (550.0, 300.0)));
        layer.anchors.push(Anchor::new("math.tl", (-30.0, 200.0)));

        let collected = collect_default(&font);
        assert_eq!(
            &[KernEntry::new(300, 50)],
            collected.kerns["f"][&KernSide::TopRight].entries()
        );
        assert_eq!(
            &[KernEntry::new(200, 30)],
            collected.kerns["f"][&KernSide::TopLeft].entries()
        );

        let math = math_data(&font);
        let f = glyph_order(&font).glyph_id("f").unwrap();
        assert_eq!(
            KernData {
                heights: vec![],
                kerns: vec![50],
            },
            math.kerns[&f][&KernSide::TopRight]
        );
        assert_eq!(
            KernData {
                heights: vec![],
                kerns: vec![30],
            },
            math.kerns[&f][&KernSide::TopLeft]
        );
    }

    #[test]
    fn kern_heights_drop_the_last_point() {
        let math = math_data(&source_font());
        let f = glyph_order(&source_font()).glyph_id("f").unwrap();
        assert_eq!(
            KernData {
                heights: vec![300],
                kerns: vec![50, 20],
            },
            math.kerns[&f][&KernSide::TopRight]
        );
    }

    #[test]
    fn last_part_italic_moves_into_assembly() {
        let font = source_font();
        let order = glyph_order(&font);
        let math = math_data(&font);
        let paren = order.glyph_id("uni0028").unwrap();
        let top = order.glyph_id("parenleft.top").unwrap();
        assert_eq!(
            40,
            math.vertical[&paren]
                .assembly
                .as_ref()
                .unwrap()
                .italics_correction
        );
        assert!(!math.italics_corrections.contains_key(&top));
        // other italics stay
        assert_eq!(
            Some(&50),
            math.italics_corrections.get(&order.glyph_id("f").unwrap())
        );
    }

    #[test]
    fn assembly_override_wins() {
        let mut font = source_font();
        let master = MasterId::new(MASTER);
        let assembly = font
            .assembly("parenleft", &master, StretchAxis::Vertical)
            .unwrap()
            .cloned()
            .unwrap()
            .with_italic_correction(65);
        font.set_assembly("parenleft", &master, StretchAxis::Vertical, Some(assembly))
            .unwrap();

        let collected = collect_default(&font);
        assert_eq!(
            65,
            collected.vertical["uni0028"]
                .assembly
                .as_ref()
                .unwrap()
                .italic_correction
        );
        assert!(!collected.italic_corrections.contains_key("parenleft.top"));
    }

    #[test]
    fn variants_of_extended_shapes_are_extended() {
        let mut font = source_font();
        font.glyph_mut("parenleft").unwrap().extended_shape = true;
        let collected = collect_default(&font);
        assert_eq!(
            vec!["integral", "parenleft.size1", "uni0028"],
            collected
                .extended_shapes
                .iter()
                .map(|g| g.as_str())
                .collect::<Vec<_>>()
        );
    }

    #[test]
    fn layerless_glyph_keeps_glyph_data() {
        let _ = env_logger::builder().is_test(true).try_init();
        let mut font = source_font();
        let paren = font.glyph_mut("parenleft").unwrap();
        paren.extended_shape = true;
        paren.layers.clear();
        paren.variants.set(
            StretchAxis::Vertical,
            Some(VariantList::new(vec!["parenleft.size1".into()]).unwrap()),
        );

        let collected = collect_default(&font);
        assert!(collected.extended_shapes.contains("uni0028"));
        assert!(collected.extended_shapes.contains("parenleft.size1"));
        assert_eq!(
            vec!["parenleft.size1"],
            collected.vertical["uni0028"]
                .variants
                .iter()
                .map(|v| v.glyph.as_str())
                .collect::<Vec<_>>()
        );
        // the assembly lives on the missing layer
        assert_eq!(None, collected.vertical["uni0028"].assembly);
    }

    #[test]
    fn unresolved_variant() {
        let mut font = source_font();
        font.set_variants(
            "f",
            StretchAxis::Vertical,
            Some(VariantList::new(vec!["f".into(), "f.big".into()]).unwrap()),
        )
        .unwrap();
        let order = glyph_order(&font);
        let result = encode(&font, &order, 0, None);
        assert!(
            matches!(
                &result,
                Err(Error::UnresolvedGlyphReference {
                    glyph,
                    problem: GlyphProblem::NotInSource,
                    ..
                }) if glyph.as_str() == "f.big"
            ),
            "{result:?}"
        );
    }

    #[test]
    fn variant_missing_from_glyph_order() {
        let font = source_font();
        let order: GlyphOrder = glyph_order(&font)
            .iter()
            .filter(|n| n.as_str() != "parenleft.size1")
            .cloned()
            .collect();
        let result = encode(&font, &order, 0, None);
        assert!(
            matches!(
                &result,
                Err(Error::UnresolvedGlyphReference {
                    glyph,
                    problem: GlyphProblem::NotInGlyphOrder,
                    ..
                }) if glyph.as_str() == "parenleft.size1"
            ),
            "{result:?}"
        );
    }

    #[test]
    fn out_of_range_connector() {
        let mut font = source_font();
        let master = MasterId::new(MASTER);
        let mut assembly = font
            .assembly("parenleft", &master, StretchAxis::Vertical)
            .unwrap()
            .cloned()
            .unwrap();
        assembly.parts_mut()[0].end_connector_length = -5;
        font.set_assembly("parenleft", &master, StretchAxis::Vertical, Some(assembly))
            .unwrap();
        assert!(matches!(
            encode(&font, &glyph_order(&font), 0, None),
            Err(Error::ValueOutOfRange { value: -5, .. })
        ));
    }

    #[test]
    fn bad_master_index() {
        let font = source_font();
        assert!(matches!(
            encode(&font, &glyph_order(&font), 3, None),
            Err(Error::NoSuchMaster(3))
        ));
    }
}
