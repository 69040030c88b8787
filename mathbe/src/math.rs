//! Generates and parses a [MATH](https://learn.microsoft.com/en-us/typography/opentype/spec/math) table.
//!
//! [`MathData`] is the table's content keyed by glyph id. It knows nothing
//! about glyph names; see [`crate::encode`] and [`crate::decode`] for that.

use std::collections::{BTreeMap, BTreeSet};

use bitflags::bitflags;
use mathir::{
    constants::{ConstantKind, ConstantName, MathConstants},
    model::KernSide,
    types::StretchAxis,
};
use write_fonts::{
    dump_table,
    read::{tables::layout::CoverageTable as ReadCoverageTable, FontData, FontRead},
    tables::layout::{builders::CoverageTableBuilder, CoverageTable},
    types::GlyphId16,
    validate::{Validate, ValidationCtx},
    FontWrite, NullableOffsetMarker, OffsetMarker, TableWriter,
};

use crate::error::Error;

const MAJOR_VERSION: u16 = 1;
const MINOR_VERSION: u16 = 0;

bitflags! {
    /// GlyphPart flags
    #[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct PartFlags: u16 {
        /// The part may be repeated
        const EXTENDER = 0x0001;
    }
}

/// A kern function as stored: `kerns` has one more entry than `heights`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KernData {
    pub heights: Vec<i16>,
    pub kerns: Vec<i16>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VariantData {
    pub glyph: GlyphId16,
    pub advance: u16,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PartData {
    pub glyph: GlyphId16,
    pub start_connector_length: u16,
    pub end_connector_length: u16,
    pub full_advance: u16,
    pub flags: PartFlags,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssemblyData {
    pub italics_correction: i16,
    pub parts: Vec<PartData>,
}

/// How one glyph grows along one axis.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ConstructionData {
    pub variants: Vec<VariantData>,
    pub assembly: Option<AssemblyData>,
}

/// The content of a MATH table.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct MathData {
    /// Constants of the MathConstants subtable; unset constants are written as 0.
    ///
    /// MinConnectorOverlap is ignored here, it is carried by `min_connector_overlap`.
    pub constants: Option<MathConstants>,
    /// If set, a MathVariants subtable is written even with no constructions.
    pub min_connector_overlap: Option<u16>,
    pub italics_corrections: BTreeMap<GlyphId16, i16>,
    pub top_accent_attachments: BTreeMap<GlyphId16, i16>,
    pub extended_shapes: BTreeSet<GlyphId16>,
    pub kerns: BTreeMap<GlyphId16, BTreeMap<KernSide, KernData>>,
    pub vertical: BTreeMap<GlyphId16, ConstructionData>,
    pub horizontal: BTreeMap<GlyphId16, ConstructionData>,
}

impl MathData {
    pub fn is_empty(&self) -> bool {
        self.constants.is_none() && !self.has_glyph_info() && !self.has_variants()
    }

    fn has_glyph_info(&self) -> bool {
        !(self.italics_corrections.is_empty()
            && self.top_accent_attachments.is_empty()
            && self.extended_shapes.is_empty()
            && self.kerns.is_empty())
    }

    fn has_variants(&self) -> bool {
        self.min_connector_overlap.is_some()
            || !self.vertical.is_empty()
            || !self.horizontal.is_empty()
    }

    pub fn constructions(&self, axis: StretchAxis) -> &BTreeMap<GlyphId16, ConstructionData> {
        match axis {
            StretchAxis::Vertical => &self.vertical,
            StretchAxis::Horizontal => &self.horizontal,
        }
    }

    pub fn constructions_mut(
        &mut self,
        axis: StretchAxis,
    ) -> &mut BTreeMap<GlyphId16, ConstructionData> {
        match axis {
            StretchAxis::Vertical => &mut self.vertical,
            StretchAxis::Horizontal => &mut self.horizontal,
        }
    }

    /// Builds the table, ready for [`dump_table`].
    pub fn compile(&self) -> Result<Math, Error> {
        let constants = self
            .constants
            .as_ref()
            .map(MathConstantsTable::new)
            .transpose()?;
        let glyph_info = self.has_glyph_info().then(|| self.compile_glyph_info());
        let variants = self.has_variants().then(|| MathVariants {
            min_connector_overlap: self.min_connector_overlap.unwrap_or_default(),
            vert_coverage: coverage(self.vertical.keys().copied()),
            horiz_coverage: coverage(self.horizontal.keys().copied()),
            vert_constructions: constructions(&self.vertical),
            horiz_constructions: constructions(&self.horizontal),
        });
        Ok(Math {
            constants: NullableOffsetMarker::new(constants),
            glyph_info: NullableOffsetMarker::new(glyph_info),
            variants: NullableOffsetMarker::new(variants),
        })
    }

    fn compile_glyph_info(&self) -> MathGlyphInfo {
        let value_table = |values: &BTreeMap<GlyphId16, i16>| {
            (!values.is_empty()).then(|| MathValueTable {
                coverage: OffsetMarker::new(coverage_table(values.keys().copied())),
                values: values.values().copied().map(MathValueRecord::new).collect(),
            })
        };
        let kern_info = (!self.kerns.is_empty()).then(|| MathKernInfo {
            coverage: OffsetMarker::new(coverage_table(self.kerns.keys().copied())),
            records: self
                .kerns
                .values()
                .map(|sides| MathKernInfoRecord {
                    kerns: KernSide::ALL.map(|side| {
                        NullableOffsetMarker::new(sides.get(&side).map(MathKern::new))
                    }),
                })
                .collect(),
        });
        MathGlyphInfo {
            italics_correction: NullableOffsetMarker::new(value_table(&self.italics_corrections)),
            top_accent_attachment: NullableOffsetMarker::new(value_table(
                &self.top_accent_attachments,
            )),
            extended_shape_coverage: coverage(self.extended_shapes.iter().copied()),
            kern_info: NullableOffsetMarker::new(kern_info),
        }
    }

    /// Compiles and serializes the table.
    pub fn to_bytes(&self) -> Result<Vec<u8>, Error> {
        let math = self.compile()?;
        dump_table(&math).map_err(|report| Error::DumpTableError {
            context: "MATH".to_string(),
            reason: report.to_string(),
        })
    }

    /// Parses the bytes of a MATH table.
    pub fn parse(bytes: &[u8]) -> Result<MathData, Error> {
        let data = FontData::new(bytes);
        let major: u16 = data.read_at(0)?;
        let minor: u16 = data.read_at(2)?;
        if (major, minor) != (MAJOR_VERSION, MINOR_VERSION) {
            return Err(Error::UnsupportedTableVersion { major, minor });
        }
        let mut math = MathData::default();
        if let Some(constants) = subtable(data, 4)? {
            math.constants = Some(parse_constants(constants)?);
        }
        if let Some(glyph_info) = subtable(data, 6)? {
            math.parse_glyph_info(glyph_info)?;
        }
        if let Some(variants) = subtable(data, 8)? {
            math.parse_variants(variants)?;
        }
        Ok(math)
    }

    fn parse_glyph_info(&mut self, data: FontData) -> Result<(), Error> {
        if let Some(italics) = subtable(data, 0)? {
            self.italics_corrections = parse_value_table(italics, "MathItalicsCorrectionInfo")?;
        }
        if let Some(accents) = subtable(data, 2)? {
            self.top_accent_attachments = parse_value_table(accents, "MathTopAccentAttachment")?;
        }
        if let Some(extended) = subtable(data, 4)? {
            self.extended_shapes = parse_coverage(extended)?.into_iter().collect();
        }
        if let Some(kern_info) = subtable(data, 6)? {
            let glyphs = required_coverage(kern_info, 0)?;
            let count = counted(kern_info, 2, glyphs.len(), "MathKernInfo")?;
            for (i, gid) in glyphs.into_iter().enumerate().take(count) {
                let record_pos = 4 + i * 8;
                let mut sides = BTreeMap::new();
                for (j, side) in KernSide::ALL.into_iter().enumerate() {
                    if let Some(kern) = subtable(kern_info, record_pos + j * 2)? {
                        sides.insert(side, parse_kern(kern)?);
                    }
                }
                if !sides.is_empty() {
                    self.kerns.insert(gid, sides);
                }
            }
        }
        Ok(())
    }

    fn parse_variants(&mut self, data: FontData) -> Result<(), Error> {
        self.min_connector_overlap = Some(data.read_at(0)?);
        let vertical = optional_coverage(data, 2)?;
        let horizontal = optional_coverage(data, 4)?;
        let vert_count = counted(data, 6, vertical.len(), "MathVariants vertical")?;
        let horiz_count = counted(data, 8, horizontal.len(), "MathVariants horizontal")?;
        let mut pos = 10;
        for (gid, axis) in vertical
            .into_iter()
            .take(vert_count)
            .map(|g| (g, StretchAxis::Vertical))
            .chain(
                horizontal
                    .into_iter()
                    .take(horiz_count)
                    .map(|g| (g, StretchAxis::Horizontal)),
            )
        {
            let construction = subtable(data, pos)?.ok_or_else(|| {
                Error::MalformedBinaryTable(format!("null MathGlyphConstruction for {gid}"))
            })?;
            self.constructions_mut(axis)
                .insert(gid, parse_construction(construction)?);
            pos += 2;
        }
        Ok(())
    }
}

/// The MATH table.
#[derive(Debug)]
pub struct Math {
    constants: NullableOffsetMarker<MathConstantsTable>,
    glyph_info: NullableOffsetMarker<MathGlyphInfo>,
    variants: NullableOffsetMarker<MathVariants>,
}

impl FontWrite for Math {
    fn write_into(&self, writer: &mut TableWriter) {
        MAJOR_VERSION.write_into(writer);
        MINOR_VERSION.write_into(writer);
        self.constants.write_into(writer);
        self.glyph_info.write_into(writer);
        self.variants.write_into(writer);
    }
}

impl Validate for Math {
    fn validate_impl(&self, ctx: &mut ValidationCtx) {
        ctx.in_table("MATH", |ctx| {
            ctx.in_field("math_glyph_info_offset", |ctx| {
                self.glyph_info.validate_impl(ctx)
            });
            ctx.in_field("math_variants_offset", |ctx| self.variants.validate_impl(ctx));
        })
    }
}

/// A MathValueRecord, always without a device table.
#[derive(Debug, Clone, Copy)]
struct MathValueRecord {
    value: i16,
}

impl MathValueRecord {
    fn new(value: i16) -> Self {
        MathValueRecord { value }
    }
}

impl FontWrite for MathValueRecord {
    fn write_into(&self, writer: &mut TableWriter) {
        self.value.write_into(writer);
        // device table offset
        0u16.write_into(writer);
    }
}

#[derive(Debug)]
enum ConstantField {
    Int16(i16),
    UFWord(u16),
    Value(MathValueRecord),
}

#[derive(Debug)]
struct MathConstantsTable {
    fields: Vec<ConstantField>,
}

impl MathConstantsTable {
    fn new(constants: &MathConstants) -> Result<Self, Error> {
        let fields = ConstantName::table_order()
            .map(|name| {
                let value = constants.get(name).unwrap_or_default();
                let (min, max) = name.value_range();
                if value < min || value > max {
                    return Err(Error::ValueOutOfRange {
                        what: name.to_string(),
                        value,
                        field: match name.kind() {
                            ConstantKind::UFWord => "UFWORD",
                            _ => "int16",
                        },
                    });
                }
                Ok(match name.kind() {
                    ConstantKind::Int16 => ConstantField::Int16(value as i16),
                    ConstantKind::UFWord => ConstantField::UFWord(value as u16),
                    ConstantKind::ValueRecord => {
                        ConstantField::Value(MathValueRecord::new(value as i16))
                    }
                })
            })
            .collect::<Result<_, _>>()?;
        Ok(MathConstantsTable { fields })
    }
}

impl FontWrite for MathConstantsTable {
    fn write_into(&self, writer: &mut TableWriter) {
        for field in self.fields.iter() {
            match field {
                ConstantField::Int16(v) => v.write_into(writer),
                ConstantField::UFWord(v) => v.write_into(writer),
                ConstantField::Value(v) => v.write_into(writer),
            }
        }
    }
}

impl Validate for MathConstantsTable {
    fn validate_impl(&self, _ctx: &mut ValidationCtx) {}
}

fn coverage_table(glyphs: impl Iterator<Item = GlyphId16>) -> CoverageTable {
    glyphs.collect::<CoverageTableBuilder>().build()
}

/// A null offset when there are no glyphs.
fn coverage(glyphs: impl Iterator<Item = GlyphId16>) -> NullableOffsetMarker<CoverageTable> {
    let mut glyphs = glyphs.peekable();
    NullableOffsetMarker::new(glyphs.peek().is_some().then(|| coverage_table(glyphs)))
}

fn validate_count(ctx: &mut ValidationCtx, name: &'static str, len: usize) {
    ctx.in_field(name, |ctx| {
        if len > u16::MAX as usize {
            ctx.report("array exceeds max length");
        }
    })
}

#[derive(Debug)]
struct MathGlyphInfo {
    italics_correction: NullableOffsetMarker<MathValueTable>,
    top_accent_attachment: NullableOffsetMarker<MathValueTable>,
    extended_shape_coverage: NullableOffsetMarker<CoverageTable>,
    kern_info: NullableOffsetMarker<MathKernInfo>,
}

impl FontWrite for MathGlyphInfo {
    fn write_into(&self, writer: &mut TableWriter) {
        self.italics_correction.write_into(writer);
        self.top_accent_attachment.write_into(writer);
        self.extended_shape_coverage.write_into(writer);
        self.kern_info.write_into(writer);
    }
}

impl Validate for MathGlyphInfo {
    fn validate_impl(&self, ctx: &mut ValidationCtx) {
        ctx.in_table("MathGlyphInfo", |ctx| {
            self.italics_correction.validate_impl(ctx);
            self.top_accent_attachment.validate_impl(ctx);
            self.kern_info.validate_impl(ctx);
        })
    }
}

/// MathItalicsCorrectionInfo and MathTopAccentAttachment share a layout.
#[derive(Debug)]
struct MathValueTable {
    coverage: OffsetMarker<CoverageTable>,
    values: Vec<MathValueRecord>,
}

impl FontWrite for MathValueTable {
    fn write_into(&self, writer: &mut TableWriter) {
        self.coverage.write_into(writer);
        (self.values.len() as u16).write_into(writer);
        self.values.write_into(writer);
    }
}

impl Validate for MathValueTable {
    fn validate_impl(&self, ctx: &mut ValidationCtx) {
        validate_count(ctx, "values", self.values.len());
    }
}

#[derive(Debug)]
struct MathKernInfo {
    coverage: OffsetMarker<CoverageTable>,
    records: Vec<MathKernInfoRecord>,
}

impl FontWrite for MathKernInfo {
    fn write_into(&self, writer: &mut TableWriter) {
        self.coverage.write_into(writer);
        (self.records.len() as u16).write_into(writer);
        self.records.write_into(writer);
    }
}

impl Validate for MathKernInfo {
    fn validate_impl(&self, ctx: &mut ValidationCtx) {
        ctx.in_table("MathKernInfo", |ctx| {
            validate_count(ctx, "math_kern_info_records", self.records.len());
            ctx.with_array_items(self.records.iter(), |ctx, record| {
                for kern in record.kerns.iter() {
                    kern.validate_impl(ctx);
                }
            })
        })
    }
}

/// Offsets in top right, top left, bottom right, bottom left order.
#[derive(Debug)]
struct MathKernInfoRecord {
    kerns: [NullableOffsetMarker<MathKern>; 4],
}

impl FontWrite for MathKernInfoRecord {
    fn write_into(&self, writer: &mut TableWriter) {
        for kern in self.kerns.iter() {
            kern.write_into(writer);
        }
    }
}

#[derive(Debug)]
struct MathKern {
    heights: Vec<MathValueRecord>,
    kerns: Vec<MathValueRecord>,
}

impl MathKern {
    fn new(data: &KernData) -> Self {
        MathKern {
            heights: data.heights.iter().copied().map(MathValueRecord::new).collect(),
            kerns: data.kerns.iter().copied().map(MathValueRecord::new).collect(),
        }
    }
}

impl FontWrite for MathKern {
    fn write_into(&self, writer: &mut TableWriter) {
        (self.heights.len() as u16).write_into(writer);
        self.heights.write_into(writer);
        self.kerns.write_into(writer);
    }
}

impl Validate for MathKern {
    fn validate_impl(&self, ctx: &mut ValidationCtx) {
        ctx.in_table("MathKern", |ctx| {
            validate_count(ctx, "correction_height", self.heights.len());
            ctx.in_field("kern_values", |ctx| {
                if self.kerns.len() != self.heights.len() + 1 {
                    ctx.report("needs exactly one more kern value than correction heights");
                }
            })
        })
    }
}

#[derive(Debug)]
struct MathVariants {
    min_connector_overlap: u16,
    vert_coverage: NullableOffsetMarker<CoverageTable>,
    horiz_coverage: NullableOffsetMarker<CoverageTable>,
    vert_constructions: Vec<OffsetMarker<MathGlyphConstruction>>,
    horiz_constructions: Vec<OffsetMarker<MathGlyphConstruction>>,
}

fn constructions(
    constructions: &BTreeMap<GlyphId16, ConstructionData>,
) -> Vec<OffsetMarker<MathGlyphConstruction>> {
    constructions
        .values()
        .map(|c| {
            OffsetMarker::new(MathGlyphConstruction {
                assembly: NullableOffsetMarker::new(c.assembly.as_ref().map(|a| GlyphAssembly {
                    italics_correction: MathValueRecord::new(a.italics_correction),
                    parts: a.parts.clone(),
                })),
                variants: c.variants.clone(),
            })
        })
        .collect()
}

impl FontWrite for MathVariants {
    fn write_into(&self, writer: &mut TableWriter) {
        self.min_connector_overlap.write_into(writer);
        self.vert_coverage.write_into(writer);
        self.horiz_coverage.write_into(writer);
        (self.vert_constructions.len() as u16).write_into(writer);
        (self.horiz_constructions.len() as u16).write_into(writer);
        self.vert_constructions.write_into(writer);
        self.horiz_constructions.write_into(writer);
    }
}

impl Validate for MathVariants {
    fn validate_impl(&self, ctx: &mut ValidationCtx) {
        ctx.in_table("MathVariants", |ctx| {
            validate_count(ctx, "vert_glyph_construction", self.vert_constructions.len());
            validate_count(ctx, "horiz_glyph_construction", self.horiz_constructions.len());
            self.vert_constructions.validate_impl(ctx);
            self.horiz_constructions.validate_impl(ctx);
        })
    }
}

#[derive(Debug)]
struct MathGlyphConstruction {
    assembly: NullableOffsetMarker<GlyphAssembly>,
    variants: Vec<VariantData>,
}

impl FontWrite for MathGlyphConstruction {
    fn write_into(&self, writer: &mut TableWriter) {
        self.assembly.write_into(writer);
        (self.variants.len() as u16).write_into(writer);
        for variant in self.variants.iter() {
            variant.glyph.to_u16().write_into(writer);
            variant.advance.write_into(writer);
        }
    }
}

impl Validate for MathGlyphConstruction {
    fn validate_impl(&self, ctx: &mut ValidationCtx) {
        ctx.in_table("MathGlyphConstruction", |ctx| {
            validate_count(ctx, "math_glyph_variant_record", self.variants.len());
            self.assembly.validate_impl(ctx);
        })
    }
}

#[derive(Debug)]
struct GlyphAssembly {
    italics_correction: MathValueRecord,
    parts: Vec<PartData>,
}

impl FontWrite for GlyphAssembly {
    fn write_into(&self, writer: &mut TableWriter) {
        self.italics_correction.write_into(writer);
        (self.parts.len() as u16).write_into(writer);
        for part in self.parts.iter() {
            part.glyph.to_u16().write_into(writer);
            part.start_connector_length.write_into(writer);
            part.end_connector_length.write_into(writer);
            part.full_advance.write_into(writer);
            part.flags.bits().write_into(writer);
        }
    }
}

impl Validate for GlyphAssembly {
    fn validate_impl(&self, ctx: &mut ValidationCtx) {
        ctx.in_table("GlyphAssembly", |ctx| {
            validate_count(ctx, "part_records", self.parts.len());
            if self.parts.is_empty() {
                ctx.report("an assembly needs at least one part");
            }
        })
    }
}

/// The subtable at the offset stored at `pos`, None for a null offset.
fn subtable(data: FontData, pos: usize) -> Result<Option<FontData>, Error> {
    let offset: u16 = data.read_at(pos)?;
    if offset == 0 {
        return Ok(None);
    }
    data.split_off(offset as usize).map(Some).ok_or_else(|| {
        Error::MalformedBinaryTable(format!("offset {offset} at {pos} is out of bounds"))
    })
}

fn parse_coverage(data: FontData) -> Result<Vec<GlyphId16>, Error> {
    let coverage = ReadCoverageTable::read(data)?;
    Ok(coverage
        .iter()
        .map(|gid| GlyphId16::new(gid.to_u16()))
        .collect())
}

fn optional_coverage(data: FontData, pos: usize) -> Result<Vec<GlyphId16>, Error> {
    match subtable(data, pos)? {
        Some(coverage) => parse_coverage(coverage),
        None => Ok(Vec::new()),
    }
}

fn required_coverage(data: FontData, pos: usize) -> Result<Vec<GlyphId16>, Error> {
    let coverage = subtable(data, pos)?
        .ok_or_else(|| Error::MalformedBinaryTable(format!("null coverage at {pos}")))?;
    parse_coverage(coverage)
}

/// Reads a record count and checks it against the coverage it pairs with.
fn counted(data: FontData, pos: usize, coverage_len: usize, what: &str) -> Result<usize, Error> {
    let count = data.read_at::<u16>(pos)? as usize;
    if count != coverage_len {
        return Err(Error::MalformedBinaryTable(format!(
            "{what} has {count} records but its coverage has {coverage_len} glyphs"
        )));
    }
    Ok(count)
}

fn parse_constants(data: FontData) -> Result<MathConstants, Error> {
    let mut constants = MathConstants::new();
    let mut pos = 0;
    for name in ConstantName::table_order() {
        let value = match name.kind() {
            ConstantKind::Int16 => data.read_at::<i16>(pos)? as i32,
            ConstantKind::UFWord => data.read_at::<u16>(pos)? as i32,
            ConstantKind::ValueRecord => {
                let value = data.read_at::<i16>(pos)? as i32;
                pos += 2;
                value
            }
        };
        pos += 2;
        constants.set(name, value);
    }
    Ok(constants)
}

fn parse_value_table(data: FontData, what: &str) -> Result<BTreeMap<GlyphId16, i16>, Error> {
    let glyphs = required_coverage(data, 0)?;
    let count = counted(data, 2, glyphs.len(), what)?;
    glyphs
        .into_iter()
        .take(count)
        .enumerate()
        .map(|(i, gid)| Ok((gid, data.read_at::<i16>(4 + i * 4)?)))
        .collect()
}

fn parse_kern(data: FontData) -> Result<KernData, Error> {
    let count = data.read_at::<u16>(0)? as usize;
    let heights = (0..count)
        .map(|i| data.read_at::<i16>(2 + i * 4))
        .collect::<Result<Vec<_>, _>>()?;
    let kerns = (0..=count)
        .map(|i| data.read_at::<i16>(2 + (count + i) * 4))
        .collect::<Result<Vec<_>, _>>()?;
    Ok(KernData { heights, kerns })
}

fn parse_construction(data: FontData) -> Result<ConstructionData, Error> {
    let assembly = subtable(data, 0)?.map(parse_assembly).transpose()?;
    let count = data.read_at::<u16>(2)? as usize;
    let variants = (0..count)
        .map(|i| {
            let pos = 4 + i * 4;
            Ok(VariantData {
                glyph: GlyphId16::new(data.read_at(pos)?),
                advance: data.read_at(pos + 2)?,
            })
        })
        .collect::<Result<_, Error>>()?;
    Ok(ConstructionData { variants, assembly })
}

fn parse_assembly(data: FontData) -> Result<AssemblyData, Error> {
    let italics_correction = data.read_at::<i16>(0)?;
    let count = data.read_at::<u16>(4)? as usize;
    let parts = (0..count)
        .map(|i| {
            let pos = 6 + i * 10;
            Ok(PartData {
                glyph: GlyphId16::new(data.read_at(pos)?),
                start_connector_length: data.read_at(pos + 2)?,
                end_connector_length: data.read_at(pos + 4)?,
                full_advance: data.read_at(pos + 6)?,
                flags: PartFlags::from_bits_retain(data.read_at(pos + 8)?),
            })
        })
        .collect::<Result<_, Error>>()?;
    Ok(AssemblyData {
        italics_correction,
        parts,
    })
}
