//! Interpreter core for the Synacor virtual architecture.
//!
//! The machine is a fixed 15-bit design: 32768 words of memory, eight
//! registers addressed through the raw values 32768..=32775, an unbounded
//! value stack and 22 instructions. [`MemoryImage`] owns all machine state,
//! [`Executor`] runs one instruction at a time against it, and [`Runtime`]
//! is the driving loop that hosts embed.

use thiserror::Error;

pub mod console;
pub mod constants;
pub mod disasm;
pub mod eval;
pub mod memory;
pub mod opcodes;
pub mod runtime;
pub mod snapshot;

pub use console::{Console, LineInput, ScriptedConsole, StdConsole, StreamConsole};
pub use constants::{
    mask_word, register_index, Word, ADDRESS_SPACE_END, MEMORY_WORDS, REGISTER_BASE,
    REGISTER_COUNT, WORD_MASK, WORD_MODULUS,
};
pub use disasm::{disassemble, disassemble_at, iter_from, DecodedInstr, OperandText};
pub use eval::{Executor, Flow};
pub use memory::MemoryImage;
pub use opcodes::{lookup, Opcode, OpcodeEntry, OPCODES};
pub use runtime::{RunOutcome, Runtime};
pub use snapshot::{load_snapshot, save_snapshot, Snapshot, SNAPSHOT_MAGIC, SNAPSHOT_VERSION};

pub type Result<T> = std::result::Result<T, CoreError>;

/// Reasons a program image cannot be placed into memory.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum LoadError {
    #[error("program image has odd length ({0} bytes)")]
    OddLength(usize),
    #[error("program image of {words} words exceeds memory capacity of {capacity} words")]
    TooLarge { words: usize, capacity: usize },
}

#[derive(Debug, Error)]
pub enum CoreError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("serialize error: {0}")]
    Serde(#[from] serde_json::Error),
    #[error("load error: {0}")]
    Load(#[from] LoadError),
    #[error("invalid opcode {value} at pc {pc}")]
    InvalidOpcode { pc: Word, value: Word },
    #[error("invalid operand value {value} at address {address}")]
    InvalidOperand { address: Word, value: Word },
    #[error("address {0} is outside memory and registers")]
    AddressOutOfRange(Word),
    #[error("division by zero in MOD at pc {pc}")]
    DivisionByZero { pc: Word },
    #[error("input exhausted while executing IN")]
    InputExhausted,
    #[error("snapshot error: {0}")]
    InvalidSnapshot(String),
}
