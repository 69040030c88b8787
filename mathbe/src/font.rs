//! Getting MATH tables in and out of compiled fonts.
//!
//! Font bytes are only borrowed for the length of a call.

use log::debug;
use mathir::source::{Instance, SourceFont};
use write_fonts::{
    read::FontRef,
    types::Tag,
    FontBuilder,
};

use crate::{
    decode::{decode, AnnotationModelDelta},
    encode::encode,
    error::Error,
    glyph_order::GlyphOrder,
};

pub const MATH_TAG: Tag = Tag::new(b"MATH");

/// The raw MATH table of a font, if it has one.
pub fn math_table<'a>(font: &FontRef<'a>) -> Option<&'a [u8]> {
    font.table_data(MATH_TAG).map(|data| data.as_bytes())
}

fn read_font(font_bytes: &[u8]) -> Result<FontRef<'_>, Error> {
    FontRef::new(font_bytes).map_err(Error::FontReadError)
}

/// Decodes the MATH table of a compiled font, None if it has none.
pub fn decode_font(
    font_bytes: &[u8],
    source: &SourceFont,
    master_idx: usize,
) -> Result<Option<AnnotationModelDelta>, Error> {
    let font = read_font(font_bytes)?;
    let Some(math) = math_table(&font) else {
        debug!("No MATH table to decode");
        return Ok(None);
    };
    let glyph_order = GlyphOrder::from_font(&font)?;
    decode(math, &glyph_order, source, master_idx).map(Some)
}

/// A copy of the font with `math` as its MATH table.
///
/// Any existing MATH table is replaced; every other table is kept as is.
pub fn with_math_table(font_bytes: &[u8], math: &[u8]) -> Result<Vec<u8>, Error> {
    let font = read_font(font_bytes)?;
    let mut builder = FontBuilder::new();
    builder.add_raw(MATH_TAG, math.to_vec());
    builder.copy_missing_tables(font);
    Ok(builder.build())
}

/// Encodes the MATH data of `source` into a compiled font.
///
/// The font's `post` glyph names give the glyph order. With no MATH data to
/// write, the font comes back unchanged.
pub fn encode_font(
    font_bytes: &[u8],
    source: &SourceFont,
    master_idx: usize,
    instance: Option<&Instance>,
) -> Result<Vec<u8>, Error> {
    let glyph_order = {
        let font = read_font(font_bytes)?;
        GlyphOrder::from_font(&font)?
    };
    match encode(source, &glyph_order, master_idx, instance)? {
        Some(math) => with_math_table(font_bytes, &math),
        None => Ok(font_bytes.to_vec()),
    }
}
