//! The named [MathConstants](https://learn.microsoft.com/en-us/typography/opentype/spec/math#mathconstants-table)
//! and how each is represented in the binary table.

use std::{collections::BTreeMap, fmt::Display, str::FromStr};

use serde::{Deserialize, Serialize};

use crate::error::Error;

/// How a constant is stored in the binary table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConstantKind {
    /// A bare int16
    Int16,
    /// A bare UFWORD
    UFWord,
    /// A MathValueRecord
    ValueRecord,
}

/// The group a constant is listed under when editing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum ConstantGroup {
    General,
    Scripts,
    Limits,
    Stacks,
    Fractions,
    Bars,
    Radicals,
}

macro_rules! math_constants {
    ($($group:ident { $($name:ident: $kind:ident),* $(,)? })*) => {
        /// One of the fixed set of MATH constants.
        ///
        /// Variants are declared in editing order, which is also binary
        /// order except for [`ConstantName::MinConnectorOverlap`].
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        pub enum ConstantName {
            $($($name,)*)*
        }

        impl ConstantName {
            pub const ALL: &'static [ConstantName] = &[$($(ConstantName::$name,)*)*];

            pub fn as_str(self) -> &'static str {
                match self {
                    $($(ConstantName::$name => stringify!($name),)*)*
                }
            }

            pub fn group(self) -> ConstantGroup {
                match self {
                    $($(ConstantName::$name => ConstantGroup::$group,)*)*
                }
            }

            pub fn kind(self) -> ConstantKind {
                match self {
                    $($(ConstantName::$name => ConstantKind::$kind,)*)*
                }
            }
        }
    };
}

math_constants! {
    General {
        ScriptPercentScaleDown: Int16,
        ScriptScriptPercentScaleDown: Int16,
        DelimitedSubFormulaMinHeight: UFWord,
        DisplayOperatorMinHeight: UFWord,
        MathLeading: ValueRecord,
        AxisHeight: ValueRecord,
        AccentBaseHeight: ValueRecord,
        FlattenedAccentBaseHeight: ValueRecord,
        MinConnectorOverlap: UFWord,
    }
    Scripts {
        SubscriptShiftDown: ValueRecord,
        SubscriptTopMax: ValueRecord,
        SubscriptBaselineDropMin: ValueRecord,
        SuperscriptShiftUp: ValueRecord,
        SuperscriptShiftUpCramped: ValueRecord,
        SuperscriptBottomMin: ValueRecord,
        SuperscriptBaselineDropMax: ValueRecord,
        SubSuperscriptGapMin: ValueRecord,
        SuperscriptBottomMaxWithSubscript: ValueRecord,
        SpaceAfterScript: ValueRecord,
    }
    Limits {
        UpperLimitGapMin: ValueRecord,
        UpperLimitBaselineRiseMin: ValueRecord,
        LowerLimitGapMin: ValueRecord,
        LowerLimitBaselineDropMin: ValueRecord,
    }
    Stacks {
        StackTopShiftUp: ValueRecord,
        StackTopDisplayStyleShiftUp: ValueRecord,
        StackBottomShiftDown: ValueRecord,
        StackBottomDisplayStyleShiftDown: ValueRecord,
        StackGapMin: ValueRecord,
        StackDisplayStyleGapMin: ValueRecord,
        StretchStackTopShiftUp: ValueRecord,
        StretchStackBottomShiftDown: ValueRecord,
        StretchStackGapAboveMin: ValueRecord,
        StretchStackGapBelowMin: ValueRecord,
    }
    Fractions {
        FractionNumeratorShiftUp: ValueRecord,
        FractionNumeratorDisplayStyleShiftUp: ValueRecord,
        FractionDenominatorShiftDown: ValueRecord,
        FractionDenominatorDisplayStyleShiftDown: ValueRecord,
        FractionNumeratorGapMin: ValueRecord,
        FractionNumDisplayStyleGapMin: ValueRecord,
        FractionRuleThickness: ValueRecord,
        FractionDenominatorGapMin: ValueRecord,
        FractionDenomDisplayStyleGapMin: ValueRecord,
        SkewedFractionHorizontalGap: ValueRecord,
        SkewedFractionVerticalGap: ValueRecord,
    }
    Bars {
        OverbarVerticalGap: ValueRecord,
        OverbarRuleThickness: ValueRecord,
        OverbarExtraAscender: ValueRecord,
        UnderbarVerticalGap: ValueRecord,
        UnderbarRuleThickness: ValueRecord,
        UnderbarExtraDescender: ValueRecord,
    }
    Radicals {
        RadicalVerticalGap: ValueRecord,
        RadicalDisplayStyleVerticalGap: ValueRecord,
        RadicalRuleThickness: ValueRecord,
        RadicalExtraAscender: ValueRecord,
        RadicalKernBeforeDegree: ValueRecord,
        RadicalKernAfterDegree: ValueRecord,
        RadicalDegreeBottomRaisePercent: Int16,
    }
}

impl ConstantName {
    /// Constants that may not be negative.
    pub fn is_unsigned(self) -> bool {
        matches!(
            self,
            ConstantName::ScriptPercentScaleDown
                | ConstantName::ScriptScriptPercentScaleDown
                | ConstantName::DelimitedSubFormulaMinHeight
                | ConstantName::DisplayOperatorMinHeight
                | ConstantName::RadicalDegreeBottomRaisePercent
                | ConstantName::MinConnectorOverlap
        )
    }

    /// Whether the constant lives in the MathConstants subtable.
    ///
    /// MinConnectorOverlap is carried by MathVariants instead.
    pub fn in_constants_table(self) -> bool {
        self != ConstantName::MinConnectorOverlap
    }

    /// The constants of the MathConstants subtable, in field order.
    pub fn table_order() -> impl Iterator<Item = ConstantName> {
        ConstantName::ALL
            .iter()
            .copied()
            .filter(|c| c.in_constants_table())
    }

    /// The inclusive range of values the binary field can hold.
    pub fn value_range(self) -> (i32, i32) {
        match (self.kind(), self.is_unsigned()) {
            (ConstantKind::UFWord, _) => (0, u16::MAX as i32),
            (_, true) => (0, i16::MAX as i32),
            (_, false) => (i16::MIN as i32, i16::MAX as i32),
        }
    }
}

impl Display for ConstantName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ConstantName {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ConstantName::ALL
            .iter()
            .copied()
            .find(|c| c.as_str() == s)
            .ok_or_else(|| Error::UnknownConstant(s.to_string()))
    }
}

/// The MATH constants of one master.
///
/// Absent entries are "not set" and are not encoded.
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MathConstants(BTreeMap<ConstantName, i32>);

impl MathConstants {
    pub fn new() -> Self {
        Default::default()
    }

    pub fn get(&self, name: ConstantName) -> Option<i32> {
        self.0.get(&name).copied()
    }

    pub fn set(&mut self, name: ConstantName, value: i32) -> Option<i32> {
        self.0.insert(name, value)
    }

    pub fn remove(&mut self, name: ConstantName) -> Option<i32> {
        self.0.remove(&name)
    }

    pub fn contains(&self, name: ConstantName) -> bool {
        self.0.contains_key(&name)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = (ConstantName, i32)> + '_ {
        self.0.iter().map(|(k, v)| (*k, *v))
    }
}

impl FromIterator<(ConstantName, i32)> for MathConstants {
    fn from_iter<T: IntoIterator<Item = (ConstantName, i32)>>(iter: T) -> Self {
        MathConstants(iter.into_iter().collect())
    }
}

impl Extend<(ConstantName, i32)> for MathConstants {
    fn extend<T: IntoIterator<Item = (ConstantName, i32)>>(&mut self, iter: T) {
        self.0.extend(iter)
    }
}
