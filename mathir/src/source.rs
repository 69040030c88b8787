//! A snapshot of a font source: the masters, glyphs and layers MATH data hangs off.
//!
//! The accessors here are the only way the encoder, decoder and guessers
//! touch source data. Setters replace a whole record at a time.

use std::collections::{BTreeMap, HashMap};

use kurbo::{Point, Rect};
use ordered_float::OrderedFloat;
use serde::{Deserialize, Serialize};

use crate::{
    anchors,
    constants::MathConstants,
    error::Error,
    model::{
        retarget, Assembly, GlyphMathAttributes, GlyphVariants, LayerAssemblies, VariantList,
    },
    types::{GlyphId, GlyphName, MasterId, StretchAxis},
};

/// Vertical metrics of a master, in design units.
#[derive(Debug, Default, Clone, PartialEq, Serialize, Deserialize)]
pub struct Metrics {
    pub ascender: f64,
    pub descender: f64,
    #[serde(default)]
    pub x_height: f64,
    #[serde(default)]
    pub cap_height: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub x_height_overshoot: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub typo_line_gap: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hhea_line_gap: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subscript_y_offset: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub superscript_y_offset: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub strikeout_size: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Master {
    pub id: MasterId,
    #[serde(default)]
    pub name: String,
    pub metrics: Metrics,
    #[serde(default, skip_serializing_if = "MathConstants::is_empty")]
    pub constants: MathConstants,
}

/// A named blend of masters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Instance {
    pub name: String,
    /// Weight of each master. Weights normally sum to 1.
    pub interpolation: BTreeMap<MasterId, OrderedFloat<f64>>,
    /// Overrides [`SourceFont::use_production_names`] for this instance.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub use_production_names: Option<bool>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Anchor {
    pub name: String,
    pub position: Point,
}

impl Anchor {
    pub fn new(name: impl Into<String>, position: impl Into<Point>) -> Self {
        Anchor {
            name: name.into(),
            position: position.into(),
        }
    }
}

/// A glyph's drawing in one master.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Layer {
    pub master_id: MasterId,
    pub width: f64,
    /// Bounding box of the outline, None if the layer is empty.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bounds: Option<Rect>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub anchors: Vec<Anchor>,
    #[serde(default, skip_serializing_if = "LayerAssemblies::is_empty")]
    pub assemblies: LayerAssemblies,
}

impl Layer {
    pub fn new(master_id: impl Into<MasterId>, width: f64) -> Self {
        Layer {
            master_id: master_id.into(),
            width,
            bounds: None,
            anchors: Vec::new(),
            assemblies: Default::default(),
        }
    }

    pub fn anchor(&self, name: &str) -> Option<&Anchor> {
        self.anchors.iter().find(|a| a.name == name)
    }

    /// The extent of the outline along an axis; 0 for an empty layer.
    pub fn bbox_advance(&self, axis: StretchAxis) -> f64 {
        self.bounds
            .map(|b| match axis {
                StretchAxis::Vertical => b.height(),
                StretchAxis::Horizontal => b.width(),
            })
            .unwrap_or_default()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceGlyph {
    pub name: GlyphName,
    /// The name written to compiled fonts, when it differs from `name`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub production_name: Option<GlyphName>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub codepoints: Vec<u32>,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub extended_shape: bool,
    #[serde(default, skip_serializing_if = "GlyphVariants::is_empty")]
    pub variants: GlyphVariants,
    pub layers: Vec<Layer>,
}

impl SourceGlyph {
    pub fn new(name: impl Into<GlyphName>) -> Self {
        SourceGlyph {
            name: name.into(),
            production_name: None,
            codepoints: Vec::new(),
            extended_shape: false,
            variants: Default::default(),
            layers: Vec::new(),
        }
    }

    pub fn layer(&self, master: &MasterId) -> Option<&Layer> {
        self.layers.iter().find(|l| l.master_id == *master)
    }

    pub fn layer_mut(&mut self, master: &MasterId) -> Option<&mut Layer> {
        self.layers.iter_mut().find(|l| l.master_id == *master)
    }

    pub fn production_name(&self) -> &GlyphName {
        self.production_name.as_ref().unwrap_or(&self.name)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceFont {
    #[serde(default)]
    pub family_name: String,
    pub units_per_em: u16,
    /// Whether compiled fonts use production names; the inverse of
    /// "Don't use Production Names".
    #[serde(default = "default_true")]
    pub use_production_names: bool,
    pub masters: Vec<Master>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub instances: Vec<Instance>,
    pub glyphs: Vec<SourceGlyph>,
}

fn default_true() -> bool {
    true
}

impl GlyphId {
    /// The glyph this handle refers to.
    pub fn resolve<'a>(&self, font: &'a SourceFont) -> Result<&'a SourceGlyph, Error> {
        font.glyph(self.name().as_str())
    }
}

impl SourceFont {
    pub fn new(units_per_em: u16) -> Self {
        SourceFont {
            family_name: String::new(),
            units_per_em,
            use_production_names: true,
            masters: Vec::new(),
            instances: Vec::new(),
            glyphs: Vec::new(),
        }
    }

    pub fn glyph(&self, name: &str) -> Result<&SourceGlyph, Error> {
        self.glyphs
            .iter()
            .find(|g| g.name.as_str() == name)
            .ok_or_else(|| Error::GlyphNotFound(name.into()))
    }

    pub fn glyph_mut(&mut self, name: &str) -> Result<&mut SourceGlyph, Error> {
        self.glyphs
            .iter_mut()
            .find(|g| g.name.as_str() == name)
            .ok_or_else(|| Error::GlyphNotFound(name.into()))
    }

    pub fn glyph_by_codepoint(&self, codepoint: u32) -> Option<&SourceGlyph> {
        self.glyphs.iter().find(|g| g.codepoints.contains(&codepoint))
    }

    pub fn master(&self, id: &MasterId) -> Result<&Master, Error> {
        self.masters
            .iter()
            .find(|m| m.id == *id)
            .ok_or_else(|| Error::MasterNotFound(id.clone()))
    }

    fn master_mut(&mut self, id: &MasterId) -> Result<&mut Master, Error> {
        self.masters
            .iter_mut()
            .find(|m| m.id == *id)
            .ok_or_else(|| Error::MasterNotFound(id.clone()))
    }

    pub fn instance(&self, name: &str) -> Result<&Instance, Error> {
        self.instances
            .iter()
            .find(|i| i.name == name)
            .ok_or_else(|| Error::InstanceNotFound(name.to_string()))
    }

    /// The layer of a glyph in a master.
    pub fn layer(&self, glyph: &str, master: &MasterId) -> Result<&Layer, Error> {
        let glyph = self.glyph(glyph)?;
        glyph.layer(master).ok_or_else(|| Error::LayerNotFound {
            glyph: glyph.name.clone(),
            master: master.clone(),
        })
    }

    fn layer_mut(&mut self, glyph: &str, master: &MasterId) -> Result<&mut Layer, Error> {
        let glyph = self.glyph_mut(glyph)?;
        let glyph_name = glyph.name.clone();
        glyph.layer_mut(master).ok_or_else(|| Error::LayerNotFound {
            glyph: glyph_name,
            master: master.clone(),
        })
    }

    pub fn constants(&self, master: &MasterId) -> Result<&MathConstants, Error> {
        Ok(&self.master(master)?.constants)
    }

    pub fn set_constants(&mut self, master: &MasterId, constants: MathConstants) -> Result<(), Error> {
        self.master_mut(master)?.constants = constants;
        Ok(())
    }

    /// Italic correction, accent attachment, kerning and the extended shape flag of a glyph.
    pub fn glyph_attributes(
        &self,
        glyph: &str,
        master: &MasterId,
    ) -> Result<GlyphMathAttributes, Error> {
        let layer = self.layer(glyph, master)?;
        let mut attributes = anchors::read_attributes(layer);
        attributes.extended_shape = self.glyph(glyph)?.extended_shape;
        Ok(attributes)
    }

    /// Replaces all MATH anchors of the glyph's layer and its extended shape flag.
    pub fn set_glyph_attributes(
        &mut self,
        glyph: &str,
        master: &MasterId,
        attributes: &GlyphMathAttributes,
    ) -> Result<(), Error> {
        anchors::write_attributes(self.layer_mut(glyph, master)?, attributes);
        self.glyph_mut(glyph)?.extended_shape = attributes.extended_shape;
        Ok(())
    }

    pub fn variants(&self, glyph: &str, axis: StretchAxis) -> Result<Option<&VariantList>, Error> {
        Ok(self.glyph(glyph)?.variants.get(axis))
    }

    pub fn set_variants(
        &mut self,
        glyph: &str,
        axis: StretchAxis,
        variants: Option<VariantList>,
    ) -> Result<(), Error> {
        self.glyph_mut(glyph)?.variants.set(axis, variants);
        Ok(())
    }

    pub fn assembly(
        &self,
        glyph: &str,
        master: &MasterId,
        axis: StretchAxis,
    ) -> Result<Option<&Assembly>, Error> {
        Ok(self.layer(glyph, master)?.assemblies.get(axis))
    }

    pub fn set_assembly(
        &mut self,
        glyph: &str,
        master: &MasterId,
        axis: StretchAxis,
        assembly: Option<Assembly>,
    ) -> Result<(), Error> {
        self.layer_mut(glyph, master)?.assemblies.set(axis, assembly);
        Ok(())
    }

    /// Whether compiled fonts for `instance`, or for the masters if None, use production names.
    pub fn uses_production_names(&self, instance: Option<&Instance>) -> bool {
        instance
            .and_then(|i| i.use_production_names)
            .unwrap_or(self.use_production_names)
    }

    /// Maps each glyph name to the name it has in a compiled font.
    pub fn production_names(&self, instance: Option<&Instance>) -> HashMap<GlyphName, GlyphName> {
        let use_production_names = self.uses_production_names(instance);
        self.glyphs
            .iter()
            .map(|g| {
                let compiled = if use_production_names {
                    g.production_name().clone()
                } else {
                    g.name.clone()
                };
                (g.name.clone(), compiled)
            })
            .collect()
    }

    /// Renames a glyph, following every variant and assembly reference to it.
    pub fn rename_glyph(&mut self, old: &str, new: impl Into<GlyphName>) -> Result<(), Error> {
        let new = new.into();
        if self.glyph(new.as_str()).is_ok() {
            return Err(Error::DuplicateGlyph(new));
        }
        let glyph = self.glyph_mut(old)?;
        let old = std::mem::replace(&mut glyph.name, new.clone());
        for glyph in self.glyphs.iter_mut() {
            retarget(glyph.variants.glyph_ids_mut(), &old, &new);
            for layer in glyph.layers.iter_mut() {
                retarget(layer.assemblies.glyph_ids_mut(), &old, &new);
            }
        }
        Ok(())
    }
}
