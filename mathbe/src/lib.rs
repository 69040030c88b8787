//! Backend of `mathc`: reads and writes the binary
//! [MATH](https://learn.microsoft.com/en-us/typography/opentype/spec/math) table.
pub mod decode;
pub mod encode;
pub mod error;
pub mod font;
pub mod glyph_order;
pub mod math;
#[cfg(test)]
mod test_util;
