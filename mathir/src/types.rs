//! Basic types shared by the annotation model and the table codec.

use std::fmt::{Debug, Display};

use serde::{Deserialize, Serialize};
use smol_str::SmolStr;

#[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct GlyphName(SmolStr);

impl GlyphName {
    /// The name of the undefined glyph
    pub const NOTDEF: GlyphName = GlyphName(SmolStr::new_inline(".notdef"));

    pub fn new(s: impl AsRef<str>) -> Self {
        Self(SmolStr::new(s))
    }

    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }
}

impl From<String> for GlyphName {
    fn from(value: String) -> Self {
        GlyphName(value.into())
    }
}

impl From<&str> for GlyphName {
    fn from(value: &str) -> Self {
        GlyphName(value.into())
    }
}

impl Debug for GlyphName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Display for GlyphName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl AsRef<str> for GlyphName {
    fn as_ref(&self) -> &str {
        self.as_str()
    }
}

// this means if you have a HashSet<GlyphName> you can use &str to check
// if an item is contained
impl std::borrow::Borrow<str> for GlyphName {
    fn borrow(&self) -> &str {
        self.0.borrow()
    }
}

/// A stable reference to a glyph in a [`SourceFont`](crate::source::SourceFont).
///
/// Variant lists and assembly parts hold these rather than bare names.
/// [`SourceFont::rename_glyph`](crate::source::SourceFont::rename_glyph)
/// rewrites every handle pointing at the renamed glyph, so a handle keeps
/// resolving to the same glyph after a rename.
///
/// Use [`GlyphId::resolve`] to get at the glyph itself.
#[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(from = "crate::serde::GlyphRefSerdeRepr", into = "GlyphName")]
pub struct GlyphId(GlyphName);

impl GlyphId {
    pub fn new(name: impl Into<GlyphName>) -> Self {
        GlyphId(name.into())
    }

    /// The current name of the referenced glyph
    pub fn name(&self) -> &GlyphName {
        &self.0
    }

    pub(crate) fn retarget(&mut self, name: GlyphName) {
        self.0 = name;
    }
}

impl From<GlyphId> for GlyphName {
    fn from(value: GlyphId) -> Self {
        value.0
    }
}

impl From<GlyphName> for GlyphId {
    fn from(value: GlyphName) -> Self {
        GlyphId(value)
    }
}

impl From<&str> for GlyphId {
    fn from(value: &str) -> Self {
        GlyphId::new(value)
    }
}

impl Debug for GlyphId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "GlyphId({})", self.0)
    }
}

impl Display for GlyphId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        Display::fmt(&self.0, f)
    }
}

/// Identifies a master, and the master's layer in each glyph.
#[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct MasterId(SmolStr);

impl MasterId {
    pub fn new(s: impl AsRef<str>) -> Self {
        Self(SmolStr::new(s))
    }

    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }
}

impl From<&str> for MasterId {
    fn from(value: &str) -> Self {
        MasterId::new(value)
    }
}

impl Debug for MasterId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Display for MasterId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The direction in which a glyph grows, by variants or by assembly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StretchAxis {
    Vertical,
    Horizontal,
}

impl StretchAxis {
    pub const ALL: [StretchAxis; 2] = [StretchAxis::Vertical, StretchAxis::Horizontal];
}

impl Display for StretchAxis {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            StretchAxis::Vertical => "vertical",
            StretchAxis::Horizontal => "horizontal",
        })
    }
}
