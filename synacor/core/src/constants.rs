//! Architectural constants for the 15-bit Synacor machine.

/// Native machine word. Only the low 15 bits carry data; values in the
/// register window use the full 16 bits.
pub type Word = u16;

/// All arithmetic is reduced modulo this value.
pub const WORD_MODULUS: u32 = 32768;

/// Mask selecting the 15 data bits of a word.
pub const WORD_MASK: Word = 0x7FFF;

/// Number of addressable memory words.
pub const MEMORY_WORDS: usize = 32768;

/// First raw value that names a register instead of a literal.
pub const REGISTER_BASE: Word = 32768;

/// Number of general-purpose registers.
pub const REGISTER_COUNT: usize = 8;

/// Exclusive end of the unified memory + register address space.
pub const ADDRESS_SPACE_END: u32 = REGISTER_BASE as u32 + REGISTER_COUNT as u32;

/// Reduce an intermediate arithmetic result to a 15-bit word.
#[inline]
pub fn mask_word(value: u32) -> Word {
    (value % WORD_MODULUS) as Word
}

/// Returns the register index when `raw` lies in the register window.
#[inline]
pub fn register_index(raw: Word) -> Option<usize> {
    if (REGISTER_BASE..REGISTER_BASE + REGISTER_COUNT as Word).contains(&raw) {
        Some((raw - REGISTER_BASE) as usize)
    } else {
        None
    }
}
