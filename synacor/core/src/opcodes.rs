//! Static instruction table.
//!
//! The table is dense: entry `n` describes opcode word `n`, so lookups are a
//! bounds-checked index rather than a search.

use crate::constants::Word;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Opcode {
    Halt,
    Set,
    Push,
    Pop,
    Eq,
    Gt,
    Jmp,
    Jt,
    Jf,
    Add,
    Mult,
    Mod,
    And,
    Or,
    Not,
    Rmem,
    Wmem,
    Call,
    Ret,
    Out,
    In,
    Noop,
}

#[derive(Debug, Clone, Copy)]
pub struct OpcodeEntry {
    pub opcode: Word,
    pub op: Opcode,
    pub mnemonic: &'static str,
    pub operands: u8,
}

const fn entry(opcode: Word, op: Opcode, mnemonic: &'static str, operands: u8) -> OpcodeEntry {
    OpcodeEntry {
        opcode,
        op,
        mnemonic,
        operands,
    }
}

pub static OPCODES: [OpcodeEntry; 22] = [
    entry(0, Opcode::Halt, "HALT", 0),
    entry(1, Opcode::Set, "SET", 2),
    entry(2, Opcode::Push, "PUSH", 1),
    entry(3, Opcode::Pop, "POP", 1),
    entry(4, Opcode::Eq, "EQ", 3),
    entry(5, Opcode::Gt, "GT", 3),
    entry(6, Opcode::Jmp, "JMP", 1),
    entry(7, Opcode::Jt, "JT", 2),
    entry(8, Opcode::Jf, "JF", 2),
    entry(9, Opcode::Add, "ADD", 3),
    entry(10, Opcode::Mult, "MULT", 3),
    entry(11, Opcode::Mod, "MOD", 3),
    entry(12, Opcode::And, "AND", 3),
    entry(13, Opcode::Or, "OR", 3),
    entry(14, Opcode::Not, "NOT", 2),
    entry(15, Opcode::Rmem, "RMEM", 2),
    entry(16, Opcode::Wmem, "WMEM", 2),
    entry(17, Opcode::Call, "CALL", 1),
    entry(18, Opcode::Ret, "RET", 0),
    entry(19, Opcode::Out, "OUT", 1),
    entry(20, Opcode::In, "IN", 1),
    entry(21, Opcode::Noop, "NOOP", 0),
];

/// Table entry for an opcode word, or `None` when the word is not an instruction.
pub fn lookup(word: Word) -> Option<&'static OpcodeEntry> {
    OPCODES.get(word as usize)
}

impl Opcode {
    pub fn from_word(word: Word) -> Option<Self> {
        lookup(word).map(|entry| entry.op)
    }

    fn entry(self) -> &'static OpcodeEntry {
        &OPCODES[self as usize]
    }

    pub fn word(self) -> Word {
        self as Word
    }

    pub fn mnemonic(self) -> &'static str {
        self.entry().mnemonic
    }

    pub fn operand_count(self) -> u8 {
        self.entry().operands
    }

    /// Encoded length in words, opcode included.
    pub fn length(self) -> Word {
        1 + self.operand_count() as Word
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn table_is_dense_and_ordered() {
        for (idx, entry) in OPCODES.iter().enumerate() {
            assert_eq!(entry.opcode as usize, idx, "entry {idx} out of place");
            assert_eq!(entry.op as usize, idx, "{} discriminant mismatch", entry.mnemonic);
        }
    }

    #[test]
    fn unknown_words_do_not_decode() {
        assert_eq!(Opcode::from_word(22), None);
        assert_eq!(Opcode::from_word(255), None);
        assert_eq!(Opcode::from_word(32768), None);
    }

    #[test]
    fn lengths_follow_operand_counts() {
        assert_eq!(Opcode::Halt.length(), 1);
        assert_eq!(Opcode::Set.length(), 3);
        assert_eq!(Opcode::Add.length(), 4);
        assert_eq!(Opcode::Ret.length(), 1);
        assert_eq!(Opcode::Call.length(), 2);
        assert_eq!(Opcode::from_word(16).map(Opcode::mnemonic), Some("WMEM"));
    }
}
