use std::fmt::Display;

use mathir::types::GlyphName;
use thiserror::Error;
use write_fonts::read::ReadError;

#[derive(Debug, Error)]
pub enum Error {
    #[error("'{glyph}' is referenced by {referenced_by} but {problem}")]
    UnresolvedGlyphReference {
        glyph: GlyphName,
        referenced_by: String,
        problem: GlyphProblem,
    },
    #[error("Unsupported MATH table version {major}.{minor}")]
    UnsupportedTableVersion { major: u16, minor: u16 },
    #[error("Malformed MATH table: {0}")]
    MalformedBinaryTable(String),
    #[error("Unable to read MATH table")]
    ReadError(#[from] ReadError),
    #[error("Glyph {0} is not in the source")]
    UnknownGlyph(String),
    #[error("{what} is {value}, which does not fit in {field}")]
    ValueOutOfRange {
        what: String,
        value: i32,
        field: &'static str,
    },
    #[error("The source has no master at index {0}")]
    NoSuchMaster(usize),
    #[error("The font has no glyph names")]
    NoGlyphNames,
    #[error("Unable to read font: {0}")]
    FontReadError(ReadError),
    #[error("Generating bytes for {context} failed: {reason}")]
    DumpTableError { context: String, reason: String },
    #[error(transparent)]
    IrError(#[from] mathir::error::Error),
}

#[derive(Debug)]
pub enum GlyphProblem {
    NotInGlyphOrder,
    NotInSource,
}

impl Display for GlyphProblem {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let message = match self {
            GlyphProblem::NotInGlyphOrder => "has no entry in glyph order",
            GlyphProblem::NotInSource => "is not a glyph in the source",
        };
        f.write_str(message)
    }
}
