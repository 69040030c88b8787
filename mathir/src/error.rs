use thiserror::Error;

use crate::types::{GlyphName, MasterId};

#[derive(Debug, Error)]
pub enum Error {
    #[error("No glyph named '{0}'")]
    GlyphNotFound(GlyphName),
    #[error("No master with id '{0}'")]
    MasterNotFound(MasterId),
    #[error("'{glyph}' has no layer for master '{master}'")]
    LayerNotFound { glyph: GlyphName, master: MasterId },
    #[error("A glyph named '{0}' already exists")]
    DuplicateGlyph(GlyphName),
    #[error("Invalid kern function: {0}")]
    InvalidKernFunction(String),
    #[error("A variant list needs at least one glyph")]
    EmptyVariantList,
    #[error("An assembly needs at least one part")]
    EmptyAssembly,
    #[error("Unknown MATH constant '{0}'")]
    UnknownConstant(String),
    #[error("No instance named '{0}'")]
    InstanceNotFound(String),
    #[error("The font has no masters")]
    NoMasters,
}
