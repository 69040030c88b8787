use write_fonts::OtRound;

/// Rounds a design-space value to font units.
pub fn ot_round(value: f64) -> i32 {
    let rounded: f64 = value.ot_round();
    rounded as i32
}
