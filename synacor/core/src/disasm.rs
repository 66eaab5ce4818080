//! Text rendering of decoded instructions.
//!
//! Decoding here is lenient: an unknown word becomes a one-word
//! [`DecodedInstr::Invalid`] marker so that a linear scan over a program
//! image (which interleaves code and data) never stops early.

use crate::constants::{register_index, Word, MEMORY_WORDS};
use crate::memory::MemoryImage;
use crate::opcodes::Opcode;
use std::fmt;

/// Raw operand word as it appears in the instruction stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OperandText {
    Literal(Word),
    Register(usize),
    Invalid(Word),
}

impl From<Word> for OperandText {
    fn from(raw: Word) -> Self {
        if (raw as usize) < MEMORY_WORDS {
            OperandText::Literal(raw)
        } else if let Some(idx) = register_index(raw) {
            OperandText::Register(idx)
        } else {
            OperandText::Invalid(raw)
        }
    }
}

impl fmt::Display for OperandText {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OperandText::Literal(value) => write!(f, "{value}"),
            OperandText::Register(idx) => write!(f, "r{idx}"),
            OperandText::Invalid(raw) => write!(f, "?{raw}"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DecodedInstr {
    Instr {
        pc: Word,
        op: Opcode,
        operands: Vec<OperandText>,
    },
    Invalid {
        pc: Word,
        value: Word,
    },
}

impl DecodedInstr {
    pub fn pc(&self) -> Word {
        match self {
            DecodedInstr::Instr { pc, .. } | DecodedInstr::Invalid { pc, .. } => *pc,
        }
    }

    /// Words covered by this entry; invalid markers always cover one.
    pub fn size(&self) -> Word {
        match self {
            DecodedInstr::Instr { op, .. } => op.length(),
            DecodedInstr::Invalid { .. } => 1,
        }
    }

    pub fn is_valid(&self) -> bool {
        matches!(self, DecodedInstr::Instr { .. })
    }
}

impl fmt::Display for DecodedInstr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DecodedInstr::Instr { pc, op, operands } => {
                write!(f, "{pc:5}: {}", op.mnemonic())?;
                for operand in operands {
                    write!(f, " {operand}")?;
                }
                if let (Opcode::Out, [OperandText::Literal(code)]) = (op, operands.as_slice()) {
                    write!(f, " {:?}", char::from((code & 0xFF) as u8))?;
                }
                Ok(())
            }
            DecodedInstr::Invalid { pc, value } => write!(f, "{pc:5}: ?? {value}"),
        }
    }
}

/// Decode the instruction at `pc` without executing it.
///
/// A pc outside memory, an unknown opcode, or an instruction whose operands
/// would run past the end of memory all yield [`DecodedInstr::Invalid`].
pub fn disassemble_at(mem: &MemoryImage, pc: Word) -> DecodedInstr {
    if pc as usize >= MEMORY_WORDS {
        return DecodedInstr::Invalid { pc, value: 0 };
    }
    let value = mem.words()[pc as usize];
    let Some(op) = Opcode::from_word(value) else {
        return DecodedInstr::Invalid { pc, value };
    };
    let start = pc as usize + 1;
    let end = start + op.operand_count() as usize;
    match mem.words().get(start..end) {
        Some(raw) => DecodedInstr::Instr {
            pc,
            op,
            operands: raw.iter().copied().map(OperandText::from).collect(),
        },
        None => DecodedInstr::Invalid { pc, value },
    }
}

/// Linear scan from `start` up to the loaded program length.
pub fn iter_from(mem: &MemoryImage, start: Word) -> impl Iterator<Item = DecodedInstr> + '_ {
    let end = mem.program_len();
    let mut pc = start as usize;
    std::iter::from_fn(move || {
        if pc >= end {
            return None;
        }
        let decoded = disassemble_at(mem, pc as Word);
        pc += decoded.size() as usize;
        Some(decoded)
    })
}

/// Disassemble the whole loaded program.
pub fn disassemble(mem: &MemoryImage) -> Vec<DecodedInstr> {
    iter_from(mem, 0).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants::REGISTER_BASE;

    fn image(words: &[Word]) -> MemoryImage {
        let bytes: Vec<u8> = words.iter().flat_map(|w| w.to_le_bytes()).collect();
        let mut mem = MemoryImage::new();
        mem.load(&bytes).unwrap();
        mem
    }

    #[test]
    fn renders_registers_literals_and_out_characters() {
        let mem = image(&[9, REGISTER_BASE, REGISTER_BASE + 7, 4, 19, 65]);
        let listing: Vec<String> = disassemble(&mem).iter().map(|d| d.to_string()).collect();
        assert_eq!(listing, vec!["    0: ADD r0 r7 4", "    4: OUT 65 'A'"]);
    }

    #[test]
    fn unknown_words_become_one_word_markers() {
        let mem = image(&[255, 0, 40000]);
        let decoded = disassemble(&mem);
        assert_eq!(decoded.len(), 3);
        assert_eq!(decoded[0], DecodedInstr::Invalid { pc: 0, value: 255 });
        assert_eq!(decoded[1].to_string(), "    1: HALT");
        assert_eq!(decoded[2].to_string(), "    2: ?? 40000");
    }

    #[test]
    fn invalid_operand_words_are_marked() {
        let mem = image(&[6, 40000]);
        assert_eq!(disassemble_at(&mem, 0).to_string(), "    0: JMP ?40000");
    }

    #[test]
    fn truncated_instruction_at_end_of_memory() {
        let mut mem = MemoryImage::new();
        mem.write(32767, 9).unwrap();
        assert_eq!(
            disassemble_at(&mem, 32767),
            DecodedInstr::Invalid {
                pc: 32767,
                value: 9
            }
        );
    }

    #[test]
    fn iter_from_respects_program_length() {
        let mem = image(&[21, 21, 0]);
        let pcs: Vec<Word> = iter_from(&mem, 1).map(|d| d.pc()).collect();
        assert_eq!(pcs, vec![1, 2]);
    }
}
