//! Rebuilds annotation model data from a MATH table.

use std::collections::{BTreeMap, HashMap};

use log::{debug, warn};
use mathir::{
    constants::{ConstantName, MathConstants},
    model::{
        Assembly, GlyphMathAttributes, GlyphVariants, KernEntry, KernFunction, KernSide,
        LayerAssemblies, Part, VariantList,
    },
    source::{Master, SourceFont},
    types::{GlyphId, GlyphName, MasterId, StretchAxis},
    util::ot_round,
};
use write_fonts::types::GlyphId16;

use crate::{
    error::Error,
    glyph_order::GlyphOrder,
    math::{ConstructionData, KernData, MathData, PartFlags},
};

/// Added to the last stored height when it already reaches the metric ceiling.
///
/// A MATH kern does not store the height its last value extends to, so
/// the decoder makes one up. Top kerns end at the ascender and bottom kerns
/// at the descender, unless a stored height is already there.
pub const KERN_HEIGHT_PADDING: i32 = 100;

/// The MATH data of one glyph, ready to be written to the source.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct GlyphDelta {
    pub attributes: GlyphMathAttributes,
    pub variants: GlyphVariants,
    pub assemblies: LayerAssemblies,
}

/// What a MATH table says about a source, by source glyph name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnnotationModelDelta {
    pub master_id: MasterId,
    pub constants: MathConstants,
    pub glyphs: BTreeMap<GlyphName, GlyphDelta>,
}

impl AnnotationModelDelta {
    pub fn empty(master_id: MasterId) -> Self {
        AnnotationModelDelta {
            master_id,
            constants: Default::default(),
            glyphs: Default::default(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.constants.is_empty() && self.glyphs.is_empty()
    }

    /// Writes the delta to `font`.
    ///
    /// Constants merge into the master's. For each glyph the table mentions,
    /// every record the table has replaces the source's; records the table
    /// lacks are left alone. That goes for single attributes and kern sides
    /// too.
    pub fn apply(&self, font: &mut SourceFont) -> Result<(), mathir::error::Error> {
        let master = &self.master_id;
        if !self.constants.is_empty() {
            let mut constants = font.constants(master)?.clone();
            constants.extend(self.constants.iter());
            font.set_constants(master, constants)?;
        }
        for (name, delta) in self.glyphs.iter() {
            if !delta.attributes.is_empty() {
                let mut attributes = font.glyph_attributes(name.as_str(), master)?;
                attributes.merge(&delta.attributes);
                font.set_glyph_attributes(name.as_str(), master, &attributes)?;
            }
            for axis in StretchAxis::ALL {
                if let Some(variants) = delta.variants.get(axis) {
                    font.set_variants(name.as_str(), axis, Some(variants.clone()))?;
                }
                if let Some(assembly) = delta.assemblies.get(axis) {
                    font.set_assembly(name.as_str(), master, axis, Some(assembly.clone()))?;
                }
            }
        }
        Ok(())
    }
}

/// Maps glyph ids in the table to source glyph names.
struct NameResolver<'a> {
    glyph_order: &'a GlyphOrder,
    source: &'a SourceFont,
    /// compiled name => source name
    source_names: HashMap<GlyphName, GlyphName>,
}

impl<'a> NameResolver<'a> {
    fn new(glyph_order: &'a GlyphOrder, source: &'a SourceFont) -> Self {
        let source_names = source
            .production_names(None)
            .into_iter()
            .map(|(name, compiled)| (compiled, name))
            .collect();
        NameResolver {
            glyph_order,
            source,
            source_names,
        }
    }

    fn resolve(&self, gid: GlyphId16) -> Result<GlyphName, Error> {
        let compiled = self
            .glyph_order
            .glyph_name(gid)
            .ok_or_else(|| Error::UnknownGlyph(format!("gid {}", gid.to_u16())))?;
        if let Some(name) = self.source_names.get(compiled) {
            return Ok(name.clone());
        }
        // a font compiled without production names
        if self.source.glyph(compiled.as_str()).is_ok() {
            return Ok(compiled.clone());
        }
        Err(Error::UnknownGlyph(compiled.to_string()))
    }
}

/// The height the last value of a kern extends to.
fn final_kern_height(side: KernSide, heights: &[i16], master: &Master) -> i32 {
    let ceiling = if side.is_top() {
        ot_round(master.metrics.ascender)
    } else {
        ot_round(master.metrics.descender)
    };
    match heights.last().map(|h| *h as i32) {
        Some(last) if last >= ceiling => last + KERN_HEIGHT_PADDING,
        _ => ceiling,
    }
}

fn kern_function(
    glyph: &GlyphName,
    side: KernSide,
    kern: &KernData,
    master: &Master,
) -> Result<KernFunction, Error> {
    let heights = kern
        .heights
        .iter()
        .map(|h| *h as i32)
        .chain(std::iter::once(final_kern_height(side, &kern.heights, master)));
    let entries = heights
        .zip(kern.kerns.iter().map(|k| *k as i32))
        .map(|(height, kern)| KernEntry::new(height, kern))
        .collect();
    KernFunction::new(entries)
        .map_err(|e| Error::MalformedBinaryTable(format!("{side:?} kern of '{glyph}': {e}")))
}

/// Reads a MATH table into a delta for the master at `master_idx`.
///
/// A table version other than 1.0 is not an error; it produces an empty delta.
pub fn decode(
    math: &[u8],
    glyph_order: &GlyphOrder,
    source: &SourceFont,
    master_idx: usize,
) -> Result<AnnotationModelDelta, Error> {
    let master = source
        .masters
        .get(master_idx)
        .ok_or(Error::NoSuchMaster(master_idx))?;
    let data = match MathData::parse(math) {
        Err(Error::UnsupportedTableVersion { major, minor }) => {
            warn!("Ignoring MATH table version {major}.{minor}");
            return Ok(AnnotationModelDelta::empty(master.id.clone()));
        }
        result => result?,
    };
    let names = NameResolver::new(glyph_order, source);
    let mut delta = AnnotationModelDelta::empty(master.id.clone());

    if let Some(constants) = &data.constants {
        delta.constants = constants.clone();
    }
    if let Some(overlap) = data.min_connector_overlap {
        delta
            .constants
            .set(ConstantName::MinConnectorOverlap, overlap as i32);
    }

    let glyphs = &mut delta.glyphs;
    for (gid, value) in data.italics_corrections.iter() {
        glyph_delta(glyphs, names.resolve(*gid)?)
            .attributes
            .italic_correction = Some(*value as i32);
    }
    for (gid, value) in data.top_accent_attachments.iter() {
        glyph_delta(glyphs, names.resolve(*gid)?)
            .attributes
            .top_accent_attachment = Some(*value as i32);
    }
    for gid in data.extended_shapes.iter() {
        glyph_delta(glyphs, names.resolve(*gid)?)
            .attributes
            .extended_shape = true;
    }
    for (gid, sides) in data.kerns.iter() {
        let name = names.resolve(*gid)?;
        let kerns = sides
            .iter()
            .map(|(side, kern)| Ok((*side, kern_function(&name, *side, kern, master)?)))
            .collect::<Result<_, Error>>()?;
        glyph_delta(glyphs, name).attributes.kerns = kerns;
    }

    for axis in StretchAxis::ALL {
        for (gid, construction) in data.constructions(axis) {
            let ConstructionData { variants, assembly } = construction;
            let name = names.resolve(*gid)?;
            if !variants.is_empty() {
                let variants = variants
                    .iter()
                    .map(|v| names.resolve(v.glyph).map(GlyphId::new))
                    .collect::<Result<Vec<_>, _>>()?;
                glyph_delta(glyphs, name.clone())
                    .variants
                    .set(axis, Some(VariantList::new(variants)?));
            }
            let Some(assembly) = assembly else {
                continue;
            };
            let parts = assembly
                .parts
                .iter()
                .map(|p| {
                    Ok(Part::new(
                        names.resolve(p.glyph)?,
                        p.flags.contains(PartFlags::EXTENDER),
                        p.start_connector_length as i32,
                        p.end_connector_length as i32,
                    ))
                })
                .collect::<Result<Vec<_>, Error>>()?;
            let assembly_italic = assembly.italics_correction as i32;
            let assembly = Assembly::new(parts).map_err(|_| {
                Error::MalformedBinaryTable(format!("{axis} assembly of '{name}' has no parts"))
            })?;
            let last = assembly.last_part().glyph.name().clone();
            glyph_delta(glyphs, name.clone())
                .assemblies
                .set(axis, Some(assembly));

            if assembly_italic == 0 {
                continue;
            }
            let last_part = glyph_delta(glyphs, last.clone());
            match last_part.attributes.italic_correction {
                Some(existing) => debug!(
                    "'{last}' keeps its italic correction {existing}, \
                     ignoring {assembly_italic} from the assembly of '{name}'"
                ),
                None => last_part.attributes.italic_correction = Some(assembly_italic),
            }
        }
    }
    Ok(delta)
}

fn glyph_delta(glyphs: &mut BTreeMap<GlyphName, GlyphDelta>, name: GlyphName) -> &mut GlyphDelta {
    glyphs.entry(name).or_default()
}
