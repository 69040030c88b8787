//! The glyph order of a compiled font, by name.

use indexmap::IndexSet;
use mathir::types::GlyphName;
use write_fonts::{
    read::{FontRef, TableProvider},
    types::GlyphId16,
};

use crate::error::Error;

/// Glyph names in glyph id order.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct GlyphOrder(IndexSet<GlyphName>);

impl GlyphOrder {
    pub fn new() -> Self {
        Default::default()
    }

    /// Reads names from the `post` table.
    ///
    /// `maxp` supplies the glyph count when present; otherwise names are read
    /// until `post` runs out.
    pub fn from_font(font: &FontRef) -> Result<GlyphOrder, Error> {
        let post = font.post().map_err(|_| Error::NoGlyphNames)?;
        let num_glyphs = font.maxp().ok().map(|maxp| maxp.num_glyphs());
        let mut order = GlyphOrder::new();
        for gid in 0..=u16::MAX {
            if num_glyphs.is_some_and(|n| gid >= n) {
                break;
            }
            let Some(name) = post.glyph_name(GlyphId16::new(gid)) else {
                if num_glyphs.is_some() {
                    return Err(Error::NoGlyphNames);
                }
                break;
            };
            order.insert(name.into());
        }
        if order.is_empty() {
            return Err(Error::NoGlyphNames);
        }
        Ok(order)
    }

    /// Appends a name, returning false if it was already present.
    pub fn insert(&mut self, name: GlyphName) -> bool {
        self.0.insert(name)
    }

    pub fn glyph_id(&self, name: &str) -> Option<GlyphId16> {
        self.0
            .get_index_of(name)
            .and_then(|idx| u16::try_from(idx).ok())
            .map(GlyphId16::new)
    }

    pub fn glyph_name(&self, gid: GlyphId16) -> Option<&GlyphName> {
        self.0.get_index(gid.to_u16() as usize)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.0.contains(name)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &GlyphName> {
        self.0.iter()
    }
}

impl<N: Into<GlyphName>> FromIterator<N> for GlyphOrder {
    fn from_iter<T: IntoIterator<Item = N>>(iter: T) -> Self {
        GlyphOrder(iter.into_iter().map(Into::into).collect())
    }
}
