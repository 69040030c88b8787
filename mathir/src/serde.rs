use serde::{Deserialize, Serialize};

use crate::{
    error::Error,
    model::{Assembly, KernEntry, KernFunction, Part, VariantList},
    types::{GlyphId, GlyphName},
};

/// A glyph reference as it may appear in source userData.
///
/// Older sources store the referenced glyph itself; newer ones store a name.
/// Both resolve to a [`GlyphId`].
#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(untagged)]
pub enum GlyphRefSerdeRepr {
    Name(GlyphName),
    Glyph { glyph: GlyphName },
}

impl From<GlyphRefSerdeRepr> for GlyphId {
    fn from(from: GlyphRefSerdeRepr) -> Self {
        match from {
            GlyphRefSerdeRepr::Name(name) | GlyphRefSerdeRepr::Glyph { glyph: name } => {
                GlyphId::new(name)
            }
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(transparent)]
pub struct VariantListSerdeRepr(Vec<GlyphId>);

impl TryFrom<VariantListSerdeRepr> for VariantList {
    type Error = Error;

    fn try_from(from: VariantListSerdeRepr) -> Result<Self, Self::Error> {
        VariantList::new(from.0)
    }
}

impl From<VariantList> for VariantListSerdeRepr {
    fn from(from: VariantList) -> Self {
        VariantListSerdeRepr(from.into_iter().collect())
    }
}

#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(transparent)]
pub struct KernFunctionSerdeRepr(Vec<KernEntry>);

impl TryFrom<KernFunctionSerdeRepr> for KernFunction {
    type Error = Error;

    fn try_from(from: KernFunctionSerdeRepr) -> Result<Self, Self::Error> {
        KernFunction::new(from.0)
    }
}

impl From<KernFunction> for KernFunctionSerdeRepr {
    fn from(from: KernFunction) -> Self {
        KernFunctionSerdeRepr(from.entries().to_vec())
    }
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct AssemblySerdeRepr {
    parts: Vec<Part>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    italic_correction: Option<i32>,
}

impl TryFrom<AssemblySerdeRepr> for Assembly {
    type Error = Error;

    fn try_from(from: AssemblySerdeRepr) -> Result<Self, Self::Error> {
        let mut assembly = Assembly::new(from.parts)?;
        assembly.italic_correction = from.italic_correction;
        Ok(assembly)
    }
}

impl From<Assembly> for AssemblySerdeRepr {
    fn from(from: Assembly) -> Self {
        AssemblySerdeRepr {
            italic_correction: from.italic_correction,
            parts: from.into_parts(),
        }
    }
}
