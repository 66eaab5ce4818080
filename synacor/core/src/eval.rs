//! Instruction semantics.
//!
//! Every operand slot is read one of two ways. A slot that names where a
//! result goes is read raw, so a register reference designates the register
//! itself. A slot whose value is consumed goes through
//! [`MemoryImage::read_operand`]. `WMEM` is the single exception: its target
//! address is a consumed value.

use crate::console::Console;
use crate::constants::{mask_word, Word, MEMORY_WORDS, WORD_MASK};
use crate::disasm;
use crate::memory::MemoryImage;
use crate::opcodes::{self, Opcode, OpcodeEntry};
use crate::{CoreError, Result};
use once_cell::sync::Lazy;
use std::env;

static TRACE_ENABLED: Lazy<bool> = Lazy::new(|| env::var("SYNACOR_TRACE").is_ok());

/// Where execution goes after one instruction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    /// Continue at this program counter.
    Next(Word),
    /// Stop the driving loop (HALT, or POP/RET on an empty stack).
    Halt,
}

impl Flow {
    pub fn next_pc(self) -> Option<Word> {
        match self {
            Flow::Next(pc) => Some(pc),
            Flow::Halt => None,
        }
    }
}

/// Address of operand slot `n` of the instruction at `pc`.
fn slot(pc: Word, n: Word) -> Result<Word> {
    let addr = pc as u32 + n as u32;
    if addr >= MEMORY_WORDS as u32 {
        return Err(CoreError::AddressOutOfRange(addr as Word));
    }
    Ok(addr as Word)
}

/// Destination named by operand slot `n` (read raw, never resolved).
fn dst(mem: &MemoryImage, pc: Word, n: Word) -> Result<Word> {
    mem.read_raw(slot(pc, n)?)
}

/// Value consumed from operand slot `n`.
fn val(mem: &MemoryImage, pc: Word, n: Word) -> Result<Word> {
    mem.read_operand(slot(pc, n)?)
}

fn flag(cond: bool) -> Word {
    if cond {
        1
    } else {
        0
    }
}

/// Stateless strict-mode executor. Owns nothing between instructions.
#[derive(Debug, Default, Clone, Copy)]
pub struct Executor;

impl Executor {
    pub fn new() -> Self {
        Self
    }

    pub fn lookup(&self, word: Word) -> Option<&'static OpcodeEntry> {
        opcodes::lookup(word)
    }

    /// Decode and run the instruction at `pc`.
    ///
    /// An unrecognised opcode fails with [`CoreError::InvalidOpcode`] before
    /// anything is written.
    pub fn execute<C: Console + ?Sized>(
        &mut self,
        pc: Word,
        mem: &mut MemoryImage,
        console: &mut C,
    ) -> Result<Flow> {
        if pc as usize >= MEMORY_WORDS {
            return Err(CoreError::AddressOutOfRange(pc));
        }
        let word = mem.read_raw(pc)?;
        let op = self
            .lookup(word)
            .map(|entry| entry.op)
            .ok_or(CoreError::InvalidOpcode { pc, value: word })?;
        if *TRACE_ENABLED {
            eprintln!(
                "[trace] {} stack={}",
                disasm::disassemble_at(mem, pc),
                mem.stack_depth()
            );
        }
        let fall_through = Flow::Next(pc + op.length());

        match op {
            Opcode::Halt => return Ok(Flow::Halt),
            Opcode::Set => {
                let a = dst(mem, pc, 1)?;
                let b = val(mem, pc, 2)?;
                mem.write(a, b)?;
            }
            Opcode::Push => {
                let a = val(mem, pc, 1)?;
                mem.push(a);
            }
            Opcode::Pop => {
                let a = dst(mem, pc, 1)?;
                match mem.pop() {
                    Some(value) => mem.write(a, value)?,
                    None => return Ok(Flow::Halt),
                }
            }
            Opcode::Eq | Opcode::Gt => {
                let a = dst(mem, pc, 1)?;
                let b = val(mem, pc, 2)?;
                let c = val(mem, pc, 3)?;
                let result = if op == Opcode::Eq { b == c } else { b > c };
                mem.write(a, flag(result))?;
            }
            Opcode::Jmp => return Ok(Flow::Next(val(mem, pc, 1)?)),
            Opcode::Jt | Opcode::Jf => {
                let a = val(mem, pc, 1)?;
                let b = val(mem, pc, 2)?;
                if (a != 0) == (op == Opcode::Jt) {
                    return Ok(Flow::Next(b));
                }
            }
            Opcode::Add | Opcode::Mult | Opcode::Mod | Opcode::And | Opcode::Or => {
                let a = dst(mem, pc, 1)?;
                let b = val(mem, pc, 2)? as u32;
                let c = val(mem, pc, 3)? as u32;
                let result = match op {
                    Opcode::Add => mask_word(b + c),
                    Opcode::Mult => mask_word(b * c),
                    Opcode::Mod => {
                        if c == 0 {
                            return Err(CoreError::DivisionByZero { pc });
                        }
                        mask_word(b % c)
                    }
                    Opcode::And => mask_word(b & c),
                    _ => mask_word(b | c),
                };
                mem.write(a, result)?;
            }
            Opcode::Not => {
                let a = dst(mem, pc, 1)?;
                let b = val(mem, pc, 2)?;
                mem.write(a, !b & WORD_MASK)?;
            }
            Opcode::Rmem => {
                let a = dst(mem, pc, 1)?;
                let b = val(mem, pc, 2)?;
                let value = mem.read_raw(b)?;
                mem.write(a, value)?;
            }
            Opcode::Wmem => {
                let a = val(mem, pc, 1)?;
                let b = val(mem, pc, 2)?;
                mem.write(a, b)?;
            }
            Opcode::Call => {
                let target = val(mem, pc, 1)?;
                mem.push(pc + 2);
                return Ok(Flow::Next(target));
            }
            Opcode::Ret => {
                return Ok(match mem.pop() {
                    Some(target) => Flow::Next(target),
                    None => Flow::Halt,
                });
            }
            Opcode::Out => {
                let a = val(mem, pc, 1)?;
                console.write_char((a & 0xFF) as u8)?;
            }
            Opcode::In => {
                let a = dst(mem, pc, 1)?;
                let byte = console.read_char()?;
                mem.write(a, byte as Word)?;
            }
            Opcode::Noop => {}
        }
        Ok(fall_through)
    }
}
