//! Fixed-width bit ranges inside 32-bit hardware words.

fn mask(width: u32) -> u32 {
    if width >= 32 {
        u32::MAX
    } else {
        (1u32 << width) - 1
    }
}

/// Extract `width` bits of `word` starting at bit `shift`.
pub fn extract(word: u32, shift: u32, width: u32) -> u32 {
    word.checked_shr(shift).unwrap_or(0) & mask(width)
}

/// Overwrite `width` bits of `word` starting at bit `shift` with `value`.
///
/// `value` is truncated to `width` bits; all other bits of `word` are left alone.
pub fn pack(word: &mut u32, shift: u32, width: u32, value: u32) {
    let field = mask(width).checked_shl(shift).unwrap_or(0);
    let bits = (value & mask(width)).checked_shl(shift).unwrap_or(0);
    *word = (*word & !field) | bits;
}

pub fn flag(word: u32, bit: u32) -> bool {
    extract(word, bit, 1) != 0
}

pub fn set_flag(word: &mut u32, bit: u32, value: bool) {
    pack(word, bit, 1, value as u32);
}
