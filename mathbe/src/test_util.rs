//! Fixtures shared by tests.

use kurbo::Rect;
use mathir::{
    constants::{ConstantName, MathConstants},
    model::{Assembly, Part, VariantList},
    source::{Anchor, Layer, Master, Metrics, SourceFont, SourceGlyph},
    types::{GlyphId, StretchAxis},
};
use write_fonts::{
    tables::{maxp::Maxp, post::Post},
    types::Tag,
    FontBuilder,
};

use crate::glyph_order::GlyphOrder;

pub(crate) const MASTER: &str = "m01";

fn add_glyph<'a>(
    font: &'a mut SourceFont,
    name: &str,
    width: f64,
    bounds: Rect,
) -> &'a mut SourceGlyph {
    let mut glyph = SourceGlyph::new(name);
    let mut layer = Layer::new(MASTER, width);
    layer.bounds = Some(bounds);
    glyph.layers.push(layer);
    font.glyphs.push(glyph);
    font.glyphs.last_mut().unwrap()
}

fn anchors(glyph: &mut SourceGlyph, anchors: &[(&str, (f64, f64))]) {
    glyph.layers[0]
        .anchors
        .extend(anchors.iter().map(|(name, pos)| Anchor::new(*name, *pos)));
}

/// A single master source with a bit of everything MATH can describe.
///
/// Every value survives an encode/decode cycle unchanged.
pub(crate) fn source_font() -> SourceFont {
    let mut font = SourceFont::new(1000);
    font.family_name = "Test Math".to_string();
    font.masters.push(Master {
        id: MASTER.into(),
        name: "Regular".to_string(),
        metrics: Metrics {
            ascender: 800.0,
            descender: -200.0,
            x_height: 500.0,
            cap_height: 700.0,
            ..Default::default()
        },
        constants: MathConstants::from_iter([
            (ConstantName::ScriptPercentScaleDown, 80),
            (ConstantName::AxisHeight, 250),
            (ConstantName::MinConnectorOverlap, 20),
        ]),
    });

    add_glyph(&mut font, ".notdef", 500.0, Rect::new(50.0, 0.0, 450.0, 700.0));

    let paren = add_glyph(&mut font, "parenleft", 300.0, Rect::new(50.0, -200.0, 250.0, 800.0));
    paren.production_name = Some("uni0028".into());
    paren.codepoints.push(0x28);
    paren.variants.set(
        StretchAxis::Vertical,
        Some(VariantList::new(vec!["parenleft".into(), "parenleft.size1".into()]).unwrap()),
    );
    paren.layers[0].assemblies.set(
        StretchAxis::Vertical,
        Some(
            Assembly::new(vec![
                Part::new("parenleft.bot", false, 0, 100),
                Part::new("parenleft.ext", true, 100, 100),
                Part::new("parenleft.top", false, 100, 0),
            ])
            .unwrap(),
        ),
    );
    add_glyph(
        &mut font,
        "parenleft.size1",
        350.0,
        Rect::new(50.0, -300.0, 300.0, 900.0),
    );
    add_glyph(&mut font, "parenleft.bot", 300.0, Rect::new(50.0, -200.0, 250.0, 400.0));
    add_glyph(&mut font, "parenleft.ext", 300.0, Rect::new(50.0, 0.0, 250.0, 300.0));
    let top = add_glyph(&mut font, "parenleft.top", 300.0, Rect::new(50.0, 200.0, 250.0, 800.0));
    anchors(top, &[("math.ic", (340.0, 0.0))]);

    let f = add_glyph(&mut font, "f", 500.0, Rect::new(20.0, 0.0, 560.0, 750.0));
    f.codepoints.push(0x66);
    anchors(
        f,
        &[
            ("math.ic", (550.0, 0.0)),
            ("math.ta", (250.0, 0.0)),
            ("math.tr", (550.0, 300.0)),
            ("math.tr.1", (520.0, 800.0)),
            ("math.tl", (-30.0, 800.0)),
            ("math.bl", (10.0, -200.0)),
        ],
    );

    let integral = add_glyph(&mut font, "integral", 500.0, Rect::new(0.0, -300.0, 500.0, 900.0));
    integral.extended_shape = true;

    let arrow = add_glyph(&mut font, "arrowright", 1000.0, Rect::new(0.0, 0.0, 1000.0, 300.0));
    arrow.variants.set(
        StretchAxis::Horizontal,
        Some(
            VariantList::new(vec![
                GlyphId::new("arrowright"),
                GlyphId::new("arrowright.long"),
            ])
            .unwrap(),
        ),
    );
    add_glyph(
        &mut font,
        "arrowright.long",
        1500.0,
        Rect::new(0.0, 0.0, 1500.0, 300.0),
    );
    font
}

/// The glyph order a compiler would produce for `font`: source order, production names.
pub(crate) fn glyph_order(font: &SourceFont) -> GlyphOrder {
    font.glyphs
        .iter()
        .map(|g| g.production_name().clone())
        .collect()
}

/// A minimal font with `post` glyph names, `maxp`, and optionally a MATH table.
pub(crate) fn compiled_font(names: &[&str], math: Option<&[u8]>) -> Vec<u8> {
    let post = Post::new_v2(names.iter().copied());
    let maxp = Maxp {
        num_glyphs: names.len() as u16,
        ..Default::default()
    };
    let mut builder = FontBuilder::new();
    builder.add_table(&post).unwrap();
    builder.add_table(&maxp).unwrap();
    if let Some(math) = math {
        builder.add_raw(Tag::new(b"MATH"), math.to_vec());
    }
    builder.build()
}
