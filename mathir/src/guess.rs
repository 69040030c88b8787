//! Starting points for MATH data, derived from master metrics and glyph naming.
//!
//! None of this is authoritative; it fills in what a designer has not set.

use log::debug;
use regex::Regex;

use crate::{
    constants::{ConstantName, MathConstants},
    error::Error,
    model::{Assembly, Part, VariantList},
    source::{Master, SourceFont, SourceGlyph},
    types::{GlyphId, MasterId, StretchAxis},
    util::ot_round,
};

const MINUS: u32 = 0x2212;
const UNDERSCORE: u32 = 0x005F;
const OVERLINE: u32 = 0x0305;
const INTEGRAL: u32 = 0x222B;

/// Guesses constants for one master.
///
/// Constants derived from other constants use the master's value when set.
pub struct ConstantGuesser<'a> {
    font: &'a SourceFont,
    master: &'a Master,
}

impl<'a> ConstantGuesser<'a> {
    pub fn new(font: &'a SourceFont, master: &MasterId) -> Result<Self, Error> {
        Ok(ConstantGuesser {
            font,
            master: font.master(master)?,
        })
    }

    /// A guess for `name`, ignoring any value the master already has.
    pub fn guess(&self, name: ConstantName) -> Option<i32> {
        self.guess_unrounded(name).map(ot_round)
    }

    fn constant(&self, name: ConstantName) -> Option<f64> {
        match self.master.constants.get(name) {
            Some(value) => Some(value as f64),
            None => self.guess_unrounded(name),
        }
    }

    fn layer_height(&self, glyph: &SourceGlyph) -> Option<f64> {
        glyph
            .layer(&self.master.id)
            .and_then(|l| l.bounds)
            .map(|b| b.height())
            .filter(|h| *h != 0.0)
    }

    fn codepoint_height(&self, codepoint: u32) -> Option<f64> {
        self.font
            .glyph_by_codepoint(codepoint)
            .and_then(|g| self.layer_height(g))
    }

    fn default_rule_thickness(&self) -> Option<f64> {
        self.codepoint_height(MINUS)
            .or_else(|| self.codepoint_height(UNDERSCORE))
            .or_else(|| self.codepoint_height(OVERLINE))
            .or(self.master.metrics.strikeout_size)
    }

    fn rule_thickness(&self) -> Option<f64> {
        self.constant(ConstantName::FractionRuleThickness)
            .filter(|v| *v != 0.0)
            .or_else(|| self.default_rule_thickness())
    }

    fn rule_times(&self, factor: f64) -> Option<f64> {
        self.rule_thickness().map(|r| r * factor)
    }

    fn display_integral_height(&self) -> Option<f64> {
        let integral = self.font.glyph_by_codepoint(INTEGRAL)?;
        let display = integral.variants.get(StretchAxis::Vertical)?.iter().nth(1)?;
        self.layer_height(display.resolve(self.font).ok()?)
    }

    fn guess_unrounded(&self, name: ConstantName) -> Option<f64> {
        use ConstantName::*;
        let metrics = &self.master.metrics;
        let upm = self.font.units_per_em as f64;
        match name {
            ScriptPercentScaleDown => Some(80.0),
            ScriptScriptPercentScaleDown => Some(60.0),
            DelimitedSubFormulaMinHeight => Some((metrics.ascender - metrics.descender) * 1.5),
            DisplayOperatorMinHeight => self.display_integral_height(),
            MathLeading => metrics.typo_line_gap.or(metrics.hhea_line_gap),
            AxisHeight => {
                let minus = self.font.glyph_by_codepoint(MINUS)?;
                let bounds = minus.layer(&self.master.id)?.bounds?;
                Some(bounds.y0 + bounds.height() / 2.0)
            }
            AccentBaseHeight => Some(metrics.x_height + metrics.x_height_overshoot.unwrap_or(0.0)),
            FlattenedAccentBaseHeight => Some(metrics.cap_height),
            MinConnectorOverlap => Some(0.05 * upm),

            SubscriptShiftDown => metrics.subscript_y_offset,
            SubscriptTopMax => Some(metrics.x_height * 4.0 / 5.0),
            SubscriptBaselineDropMin => self.constant(SubscriptShiftDown).map(|v| v * 3.0 / 4.0),
            SuperscriptShiftUp => metrics.superscript_y_offset,
            SuperscriptShiftUpCramped => self.constant(SuperscriptShiftUp).map(|v| v * 3.0 / 4.0),
            SuperscriptBottomMin => Some(metrics.x_height / 4.0),
            SuperscriptBaselineDropMax => self
                .constant(SuperscriptShiftUp)
                .map(|v| metrics.cap_height - v),
            SubSuperscriptGapMin => self.rule_times(4.0),
            SuperscriptBottomMaxWithSubscript => Some(metrics.x_height * 4.0 / 5.0),
            SpaceAfterScript => Some(upm / 24.0),

            UpperLimitGapMin => self.rule_times(2.0),
            UpperLimitBaselineRiseMin => Some(-metrics.descender * 3.0 / 4.0),
            LowerLimitGapMin => self.constant(UpperLimitGapMin),
            LowerLimitBaselineDropMin => Some(metrics.ascender * 3.0 / 4.0),

            StackTopShiftUp => Some(metrics.x_height),
            StackTopDisplayStyleShiftUp => Some(metrics.x_height * 3.0 / 2.0),
            StackBottomShiftDown => Some(metrics.cap_height * 2.0 / 3.0),
            StackBottomDisplayStyleShiftDown => Some(metrics.cap_height),
            StackGapMin => self.rule_times(3.0),
            StackDisplayStyleGapMin => self.rule_times(7.0),
            StretchStackTopShiftUp => self.constant(UpperLimitBaselineRiseMin),
            StretchStackBottomShiftDown => self.constant(LowerLimitBaselineDropMin),
            StretchStackGapAboveMin => self.constant(UpperLimitGapMin),
            StretchStackGapBelowMin => self.constant(LowerLimitGapMin),

            FractionNumeratorShiftUp => self.constant(StackTopShiftUp),
            FractionNumeratorDisplayStyleShiftUp => self.constant(StackTopDisplayStyleShiftUp),
            FractionDenominatorShiftDown => self.constant(StackBottomShiftDown),
            FractionDenominatorDisplayStyleShiftDown => {
                self.constant(StackBottomDisplayStyleShiftDown)
            }
            FractionNumeratorGapMin => self.rule_thickness(),
            FractionNumDisplayStyleGapMin => self.rule_times(3.0),
            FractionRuleThickness => self.default_rule_thickness(),
            FractionDenominatorGapMin => self.rule_thickness(),
            FractionDenomDisplayStyleGapMin => self.rule_times(3.0),
            // no good heuristic for skewed fractions
            SkewedFractionHorizontalGap | SkewedFractionVerticalGap => None,

            OverbarVerticalGap => self.rule_times(3.0),
            OverbarRuleThickness => self.rule_thickness(),
            OverbarExtraAscender => self.rule_thickness(),
            UnderbarVerticalGap => self.rule_times(3.0),
            UnderbarRuleThickness => self.rule_thickness(),
            UnderbarExtraDescender => self.rule_thickness(),

            RadicalVerticalGap => self.rule_times(5.0 / 4.0),
            RadicalDisplayStyleVerticalGap => self
                .rule_thickness()
                .map(|r| r + metrics.x_height / 4.0),
            RadicalRuleThickness => self.rule_thickness(),
            RadicalExtraAscender => self
                .constant(RadicalRuleThickness)
                .or_else(|| self.constant(FractionRuleThickness)),
            RadicalKernBeforeDegree => Some(upm * 5.0 / 18.0),
            RadicalKernAfterDegree => Some(-upm * 10.0 / 18.0),
            RadicalDegreeBottomRaisePercent => Some(60.0),
        }
    }
}

/// The master's constants, with every unset constant that can be guessed filled in.
pub fn guess_constants(font: &SourceFont, master: &MasterId) -> Result<MathConstants, Error> {
    let guesser = ConstantGuesser::new(font, master)?;
    let mut constants = font.constants(master)?.clone();
    for name in ConstantName::ALL.iter().copied() {
        if constants.contains(name) {
            continue;
        }
        if let Some(value) = guesser.guess(name) {
            debug!("Guessed {name} = {value}");
            constants.set(name, value);
        }
    }
    Ok(constants)
}

/// Variants named like `glyph.size1`, `glyph.size2`, ... with the glyph itself first.
///
/// Each suffix family is tried in turn (`size`, `s`, and for vertical
/// variants `disp`, `display`) and the first with any glyph wins. Variants
/// are listed in font order.
pub fn guess_variants(font: &SourceFont, glyph: &str, axis: StretchAxis) -> Option<VariantList> {
    let mut suffixes = vec!["size", "s"];
    if axis == StretchAxis::Vertical {
        suffixes.extend(["disp", "display"]);
    }
    for suffix in suffixes {
        let Ok(pattern) = Regex::new(&format!(r"^{}\.{suffix}\d*$", regex::escape(glyph))) else {
            continue;
        };
        let variants: Vec<GlyphId> = font
            .glyphs
            .iter()
            .filter(|g| pattern.is_match(g.name.as_str()))
            .map(|g| GlyphId::new(g.name.clone()))
            .collect();
        if !variants.is_empty() {
            let glyphs = std::iter::once(GlyphId::new(glyph)).chain(variants).collect();
            return VariantList::new(glyphs).ok();
        }
    }
    None
}

/// Piece suffixes: (start, end, middle, extender), one set per naming convention.
fn piece_suffixes(axis: StretchAxis) -> [[&'static str; 4]; 3] {
    match axis {
        StretchAxis::Vertical => [
            ["bot", "top", "mid", "ext"],
            ["bottom", "top", "middle", "extension"],
            ["b", "t", "m", "x"],
        ],
        StretchAxis::Horizontal => [
            ["lft", "rgt", "mid", "ext"],
            ["left", "right", "middle", "extension"],
            ["l", "r", "m", "x"],
        ],
    }
}

/// Legacy encoded pieces, start to end, for glyphs that have them.
fn legacy_pieces(glyph: &SourceGlyph) -> Option<Vec<u32>> {
    let named = |name: &str, codepoint: u32| {
        glyph.name.as_str() == name || glyph.codepoints.contains(&codepoint)
    };
    let encoded = |codepoint: u32| glyph.codepoints.contains(&codepoint);
    let pieces = if named("parenleft", 0x0028) {
        vec![0x239D, 0x239C, 0x239B]
    } else if named("parenright", 0x0029) {
        vec![0x23A0, 0x239F, 0x239E]
    } else if named("bracketleft", 0x005B) {
        vec![0x23A3, 0x23A2, 0x23A1]
    } else if named("bracketright", 0x005D) {
        vec![0x23A6, 0x23A5, 0x23A4]
    } else if named("braceleft", 0x007B) {
        vec![0x23A9, 0x23AA, 0x23A8, 0x23AA, 0x23A7]
    } else if named("braceright", 0x007D) {
        vec![0x23AD, 0x23AA, 0x23AC, 0x23AA, 0x23AB]
    } else if named("integral", 0x222B) {
        vec![0x2321, 0x23AE, 0x2320]
    } else if named("radical", 0x221A) {
        vec![0x23B7, 0x2502, 0x250C]
    } else if encoded(0x23B0) {
        vec![0x23AD, 0x23AA, 0x23A7]
    } else if encoded(0x23B1) {
        vec![0x23A9, 0x23AA, 0x23AB]
    } else {
        let repeats = [0x007C, 0x2016, 0x2223, 0x2225, 0x2980, 0x0305, 0x0332];
        let codepoint = glyph
            .codepoints
            .iter()
            .find(|c| repeats.contains(*c))?;
        vec![*codepoint, *codepoint]
    };
    Some(pieces)
}

/// An assembly built from pieces named like `glyph.bot`, `glyph.ext`, `glyph.top`.
///
/// Falls back to the legacy encoded bracket pieces. Connector lengths are
/// left at 0.
pub fn guess_assembly(font: &SourceFont, glyph: &str, axis: StretchAxis) -> Option<Assembly> {
    let piece = |suffix: &str| {
        let name = format!("{glyph}.{suffix}");
        font.glyph(&name).ok().map(|_| GlyphId::new(name))
    };
    for [start, end, middle, extender] in piece_suffixes(axis) {
        let Some(ext) = piece(extender) else {
            continue;
        };
        let (start, end, middle) = (piece(start), piece(end), piece(middle));
        let glyphs = match (start, end, middle) {
            (None, None, _) => continue,
            (Some(start), None, _) => vec![start, ext.clone()],
            (None, Some(end), _) => vec![ext.clone(), end],
            (Some(start), Some(end), Some(middle)) => {
                vec![start, ext.clone(), middle, ext.clone(), end]
            }
            (Some(start), Some(end), None) => vec![start, ext.clone(), end],
        };
        let parts = glyphs
            .into_iter()
            .map(|g| {
                let extender = g == ext;
                Part::new(g, extender, 0, 0)
            })
            .collect();
        return Assembly::new(parts).ok();
    }

    let source = font.glyph(glyph).ok()?;
    let parts = legacy_pieces(source)?
        .into_iter()
        .enumerate()
        .map(|(i, codepoint)| {
            let piece = font.glyph_by_codepoint(codepoint)?;
            Some(Part::new(GlyphId::new(piece.name.clone()), i % 2 == 1, 0, 0))
        })
        .collect::<Option<Vec<_>>>()?;
    Assembly::new(parts).ok()
}
