//! Moves OpenType MATH data between a font source and compiled fonts.
//!
//! A [`Document`] pairs a source with the outcome of importing the MATH
//! table of a previously compiled font. Exporting refuses to run when that
//! import failed, since the source would be missing whatever the table held.

mod args;
mod error;

pub use args::{Args, Command};
pub use error::Error;

use std::{fs, path::Path};

use log::{error, info, warn};
use mathbe::font::{decode_font, encode_font};
use mathir::{
    guess::{guess_assembly, guess_constants, guess_variants},
    interpolate::{instantiate, SparseConstantPolicy},
    source::SourceFont,
    types::StretchAxis,
};

/// What happened to the MATH table when a document was opened.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DecodeResult {
    Imported { glyphs: usize, constants: usize },
    NothingToImport,
    Failed(String),
}

/// A source being edited, and what was imported into it.
#[derive(Debug, Clone)]
pub struct Document {
    font: SourceFont,
    decode: DecodeResult,
    master_idx: usize,
}

impl Document {
    /// Opens a source, importing the MATH table of `compiled` into the master at `master_idx`.
    ///
    /// If the import fails the error is logged and the source is left as it was.
    pub fn open(font: SourceFont, compiled: Option<&[u8]>, master_idx: usize) -> Document {
        let mut doc = Document {
            font,
            decode: DecodeResult::NothingToImport,
            master_idx,
        };
        let Some(compiled) = compiled else {
            return doc;
        };
        doc.decode = match doc.import(compiled) {
            Ok(result) => result,
            Err(e) => {
                error!("Opening without MATH data: {e}");
                DecodeResult::Failed(e.to_string())
            }
        };
        doc
    }

    fn import(&mut self, compiled: &[u8]) -> Result<DecodeResult, Error> {
        let Some(delta) = decode_font(compiled, &self.font, self.master_idx)? else {
            return Ok(DecodeResult::NothingToImport);
        };
        if delta.is_empty() {
            return Ok(DecodeResult::NothingToImport);
        }
        let mut font = self.font.clone();
        delta.apply(&mut font)?;
        self.font = font;
        info!(
            "Imported MATH data for {} glyphs and {} constants",
            delta.glyphs.len(),
            delta.constants.len()
        );
        Ok(DecodeResult::Imported {
            glyphs: delta.glyphs.len(),
            constants: delta.constants.len(),
        })
    }

    pub fn font(&self) -> &SourceFont {
        &self.font
    }

    pub fn decode_result(&self) -> &DecodeResult {
        &self.decode
    }

    /// Writes the MATH table for `instance`, or the document's master, into a compiled font.
    ///
    /// Returns the new font; with no MATH data it is `font_bytes` unchanged.
    pub fn export(&self, instance: Option<&str>, font_bytes: &[u8]) -> Result<Vec<u8>, Error> {
        if let DecodeResult::Failed(reason) = &self.decode {
            return Err(Error::MissingSourceData(reason.clone()));
        }
        let Some(name) = instance else {
            return Ok(encode_font(font_bytes, &self.font, self.master_idx, None)?);
        };
        let instance = self
            .font
            .instance(name)
            .map_err(|_| Error::UnknownInstance(name.to_string()))?;
        let instance_font = instantiate(&self.font, instance, SparseConstantPolicy::default())?;
        Ok(encode_font(font_bytes, &instance_font, 0, Some(instance))?)
    }
}

/// Fills in whatever MATH data of a master can be guessed and isn't set.
///
/// Returns the number of records added.
pub fn guess_missing(font: &mut SourceFont, master_idx: usize) -> Result<usize, Error> {
    let master = font
        .masters
        .get(master_idx)
        .ok_or(mathbe::error::Error::NoSuchMaster(master_idx))?
        .id
        .clone();
    let mut added = 0;

    let before = font.constants(&master)?.len();
    let constants = guess_constants(font, &master)?;
    added += constants.len() - before;
    font.set_constants(&master, constants)?;

    let names: Vec<_> = font.glyphs.iter().map(|g| g.name.clone()).collect();
    for name in names {
        let name = name.as_str();
        for axis in StretchAxis::ALL {
            if font.variants(name, axis)?.is_none() {
                if let Some(variants) = guess_variants(font, name, axis) {
                    font.set_variants(name, axis, Some(variants))?;
                    added += 1;
                }
            }
            let Ok(existing) = font.assembly(name, &master, axis) else {
                continue;
            };
            if existing.is_none() {
                if let Some(assembly) = guess_assembly(font, name, axis) {
                    font.set_assembly(name, &master, axis, Some(assembly))?;
                    added += 1;
                }
            }
        }
    }
    Ok(added)
}

fn read(path: &Path) -> Result<Vec<u8>, Error> {
    fs::read(path).map_err(|source| Error::FileIo {
        path: path.to_path_buf(),
        source,
    })
}

fn write(path: &Path, contents: &[u8]) -> Result<(), Error> {
    fs::write(path, contents).map_err(|source| Error::FileIo {
        path: path.to_path_buf(),
        source,
    })
}

pub fn load_source(path: &Path) -> Result<SourceFont, Error> {
    let yml = fs::read_to_string(path).map_err(|source| Error::FileIo {
        path: path.to_path_buf(),
        source,
    })?;
    serde_yaml::from_str(&yml).map_err(Into::into)
}

pub fn write_source(path: &Path, font: &SourceFont) -> Result<(), Error> {
    write(path, serde_yaml::to_string(font)?.as_bytes())
}

pub fn run(args: &Args) -> Result<(), Error> {
    match &args.command {
        Command::Import {
            source,
            font,
            master,
            output,
        } => {
            let compiled = read(font)?;
            let doc = Document::open(load_source(source)?, Some(&compiled), *master);
            match doc.decode_result() {
                DecodeResult::Failed(reason) => return Err(Error::ImportFailed(reason.clone())),
                DecodeResult::NothingToImport => warn!("{font:?} has no MATH data to import"),
                DecodeResult::Imported { .. } => (),
            }
            write_source(output.as_deref().unwrap_or(source), doc.font())
        }
        Command::Export {
            source,
            font,
            instance,
            import_from,
            output,
        } => {
            let previous = import_from.as_deref().map(read).transpose()?;
            let doc = Document::open(load_source(source)?, previous.as_deref(), 0);
            let compiled = read(font)?;
            let exported = doc.export(instance.as_deref(), &compiled)?;
            write(output.as_deref().unwrap_or(font), &exported)
        }
        Command::Guess {
            source,
            master,
            output,
        } => {
            let mut font = load_source(source)?;
            let added = guess_missing(&mut font, *master)?;
            info!("Guessed {added} MATH records");
            write_source(output.as_deref().unwrap_or(source), &font)
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use kurbo::Rect;
    use mathbe::font::math_table;
    use mathir::{
        constants::{ConstantName, MathConstants},
        model::VariantList,
        source::{Anchor, Instance, Layer, Master, Metrics, SourceGlyph},
        types::MasterId,
    };
    use ordered_float::OrderedFloat;
    use pretty_assertions::assert_eq;
    use tempfile::tempdir;
    use write_fonts::{
        read::FontRef,
        tables::{maxp::Maxp, post::Post},
        types::Tag,
        FontBuilder,
    };

    use super::*;

    fn master(id: &str, axis_height: i32) -> Master {
        Master {
            id: id.into(),
            name: id.to_string(),
            metrics: Metrics {
                ascender: 800.0,
                descender: -200.0,
                x_height: 500.0,
                cap_height: 700.0,
                ..Default::default()
            },
            constants: MathConstants::from_iter([(ConstantName::AxisHeight, axis_height)]),
        }
    }

    fn glyph(name: &str, masters: &[&str], width: f64, italic: Option<f64>) -> SourceGlyph {
        let mut glyph = SourceGlyph::new(name);
        for master in masters {
            let mut layer = Layer::new(*master, width);
            layer.bounds = Some(Rect::new(0.0, -100.0, width, 700.0));
            if let Some(italic) = italic {
                layer
                    .anchors
                    .push(Anchor::new("math.ic", (width + italic, 0.0)));
            }
            glyph.layers.push(layer);
        }
        glyph
    }

    fn source() -> SourceFont {
        let mut font = SourceFont::new(1000);
        font.masters = vec![master("Light", 300), master("Bold", 400)];
        font.instances.push(Instance {
            name: "SemiBold".to_string(),
            interpolation: BTreeMap::from([
                (MasterId::new("Light"), OrderedFloat(0.25)),
                (MasterId::new("Bold"), OrderedFloat(0.75)),
            ]),
            use_production_names: None,
        });
        let masters = ["Light", "Bold"];
        font.glyphs.push(glyph(".notdef", &masters, 500.0, None));
        let mut paren = glyph("parenleft", &masters, 300.0, None);
        paren.production_name = Some("uni0028".into());
        paren.variants.set(
            StretchAxis::Vertical,
            Some(VariantList::new(vec!["parenleft".into(), "parenleft.size1".into()]).unwrap()),
        );
        font.glyphs.push(paren);
        font.glyphs
            .push(glyph("parenleft.size1", &masters, 350.0, None));
        font.glyphs.push(glyph("f", &masters, 500.0, Some(50.0)));
        font
    }

    fn compiled(names: &[&str], math: Option<&[u8]>) -> Vec<u8> {
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

    fn bare_font() -> Vec<u8> {
        compiled(&[".notdef", "uni0028", "parenleft.size1", "f"], None)
    }

    fn stripped(font: &SourceFont) -> SourceFont {
        let mut font = font.clone();
        for master in font.masters.iter_mut() {
            master.constants = Default::default();
        }
        for glyph in font.glyphs.iter_mut() {
            glyph.variants = Default::default();
            for layer in glyph.layers.iter_mut() {
                layer.anchors.clear();
            }
        }
        font
    }

    #[test]
    fn export_then_import() {
        let _ = env_logger::builder().is_test(true).try_init();
        let doc = Document::open(source(), None, 0);
        assert_eq!(&DecodeResult::NothingToImport, doc.decode_result());
        let exported = doc.export(None, &bare_font()).unwrap();

        let doc = Document::open(stripped(&source()), Some(&exported), 0);
        assert_eq!(
            &DecodeResult::Imported {
                glyphs: 2,
                // MinConnectorOverlap rides along with the variants
                constants: 57
            },
            doc.decode_result()
        );
        let light = MasterId::new("Light");
        let font = doc.font();
        assert_eq!(
            Some(300),
            font.constants(&light).unwrap().get(ConstantName::AxisHeight)
        );
        assert_eq!(
            Some(50),
            font.glyph_attributes("f", &light).unwrap().italic_correction
        );
        assert_eq!(
            source().glyph("parenleft").unwrap().variants,
            font.glyph("parenleft").unwrap().variants
        );
        // the other master is untouched
        assert!(font.constants(&"Bold".into()).unwrap().is_empty());
    }

    #[test]
    fn export_instance() {
        let doc = Document::open(source(), None, 0);
        let exported = doc.export(Some("SemiBold"), &bare_font()).unwrap();
        let delta = decode_font(&exported, &source(), 0).unwrap().unwrap();
        assert_eq!(Some(375), delta.constants.get(ConstantName::AxisHeight));
    }

    #[test]
    fn unknown_instance() {
        let doc = Document::open(source(), None, 0);
        assert!(matches!(
            doc.export(Some("Black"), &bare_font()),
            Err(Error::UnknownInstance(name)) if name == "Black"
        ));
    }

    #[test]
    fn failed_import_blocks_export() {
        let _ = env_logger::builder().is_test(true).try_init();
        // constants offset points past the end of the table
        let broken = compiled(
            &[".notdef", "uni0028", "parenleft.size1", "f"],
            Some(&[0, 1, 0, 0, 0, 200, 0, 0, 0, 0]),
        );
        let doc = Document::open(source(), Some(&broken), 0);
        assert!(matches!(doc.decode_result(), DecodeResult::Failed(..)));
        // opened without MATH annotations from the table
        assert_eq!(&source(), doc.font());
        assert!(matches!(
            doc.export(None, &bare_font()),
            Err(Error::MissingSourceData(..))
        ));
    }

    #[test]
    fn unsupported_version_imports_nothing() {
        let _ = env_logger::builder().is_test(true).try_init();
        let future = compiled(
            &[".notdef", "uni0028", "parenleft.size1", "f"],
            Some(&[0, 2, 0, 0, 0, 0, 0, 0, 0, 0]),
        );
        let doc = Document::open(source(), Some(&future), 0);
        assert_eq!(&DecodeResult::NothingToImport, doc.decode_result());
        assert!(doc.export(None, &bare_font()).is_ok());
    }

    #[test]
    fn guesses_missing_data() {
        let mut font = stripped(&source());
        let added = guess_missing(&mut font, 0).unwrap();
        assert!(added > 1);
        let light = MasterId::new("Light");
        assert_eq!(
            Some(80),
            font.constants(&light)
                .unwrap()
                .get(ConstantName::ScriptPercentScaleDown)
        );
        assert_eq!(
            vec!["parenleft", "parenleft.size1"],
            font.variants("parenleft", StretchAxis::Vertical)
                .unwrap()
                .unwrap()
                .iter()
                .map(|g| g.name().as_str())
                .collect::<Vec<_>>()
        );
        // set values are kept
        let mut font = source();
        guess_missing(&mut font, 0).unwrap();
        assert_eq!(
            Some(300),
            font.constants(&light).unwrap().get(ConstantName::AxisHeight)
        );
    }

    #[test]
    fn cli_round_trip() {
        let temp_dir = tempdir().unwrap();
        let source_file = temp_dir.path().join("source.yaml");
        let font_file = temp_dir.path().join("font.otf");
        let imported_file = temp_dir.path().join("imported.yaml");
        write_source(&source_file, &source()).unwrap();
        fs::write(&font_file, bare_font()).unwrap();

        run(&Args {
            command: Command::Export {
                source: source_file.clone(),
                font: font_file.clone(),
                instance: None,
                import_from: None,
                output: None,
            },
        })
        .unwrap();
        let bytes = fs::read(&font_file).unwrap();
        assert!(math_table(&FontRef::new(&bytes).unwrap()).is_some());

        write_source(&source_file, &stripped(&source())).unwrap();
        run(&Args {
            command: Command::Import {
                source: source_file.clone(),
                font: font_file,
                master: 0,
                output: Some(imported_file.clone()),
            },
        })
        .unwrap();
        let imported = load_source(&imported_file).unwrap();
        assert_eq!(
            Some(50),
            imported
                .glyph_attributes("f", &"Light".into())
                .unwrap()
                .italic_correction
        );
        // the input is untouched
        assert_eq!(stripped(&source()), load_source(&source_file).unwrap());
    }

    #[test]
    fn malformed_source() {
        let temp_dir = tempdir().unwrap();
        let path = temp_dir.path().join("source.yaml");
        fs::write(&path, "units_per_em: [not, a, number]\n").unwrap();
        assert!(matches!(load_source(&path), Err(Error::YamlError(..))));
    }

    #[test]
    fn missing_file() {
        let temp_dir = tempdir().unwrap();
        let result = load_source(&temp_dir.path().join("nope.yaml"));
        assert!(matches!(result, Err(Error::FileIo { .. })));
    }
}
