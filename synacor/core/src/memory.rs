use crate::constants::{register_index, Word, ADDRESS_SPACE_END, MEMORY_WORDS, REGISTER_COUNT};
use crate::{CoreError, LoadError, Result};

/// Word memory, register file and value stack of one machine instance.
///
/// Addresses 0..32768 name memory words and 32768..32776 name registers.
/// There are two read paths: [`MemoryImage::read_raw`] returns the
/// stored word untouched (used to fetch opcodes and destination slots), and
/// [`MemoryImage::read_operand`] additionally dereferences a register
/// reference one level (used for every consumed value).
#[derive(Clone)]
pub struct MemoryImage {
    words: Vec<Word>,
    registers: [Word; REGISTER_COUNT],
    stack: Vec<Word>,
    program_len: usize,
    write_capture: Option<Vec<(Word, Word)>>,
}

impl Default for MemoryImage {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for MemoryImage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryImage")
            .field("program_len", &self.program_len)
            .field("registers", &self.registers)
            .field("stack_depth", &self.stack.len())
            .finish()
    }
}

impl MemoryImage {
    pub fn new() -> Self {
        Self {
            words: vec![0; MEMORY_WORDS],
            registers: [0; REGISTER_COUNT],
            stack: Vec::new(),
            program_len: 0,
            write_capture: None,
        }
    }

    /// Copy a little-endian program image to address 0.
    ///
    /// Registers, stack and the rest of memory are cleared, so loading always
    /// yields a fresh machine.
    pub fn load(&mut self, blob: &[u8]) -> Result<()> {
        if blob.len() % 2 != 0 {
            return Err(LoadError::OddLength(blob.len()).into());
        }
        let words = blob.len() / 2;
        if words > MEMORY_WORDS {
            return Err(LoadError::TooLarge {
                words,
                capacity: MEMORY_WORDS,
            }
            .into());
        }
        self.words.fill(0);
        for (slot, pair) in self.words.iter_mut().zip(blob.chunks_exact(2)) {
            *slot = Word::from_le_bytes([pair[0], pair[1]]);
        }
        self.registers = [0; REGISTER_COUNT];
        self.stack.clear();
        self.program_len = words;
        Ok(())
    }

    /// Number of words placed by the last [`MemoryImage::load`].
    pub fn program_len(&self) -> usize {
        self.program_len
    }

    /// Stored word at `address` without register resolution.
    pub fn read_raw(&self, address: Word) -> Result<Word> {
        if let Some(idx) = register_index(address) {
            return Ok(self.registers[idx]);
        }
        self.words
            .get(address as usize)
            .copied()
            .ok_or(CoreError::AddressOutOfRange(address))
    }

    /// Effective value of the operand stored at `address`.
    ///
    /// Literals pass through; register references resolve to the register
    /// contents. Raw words above the register window are not valid operands.
    pub fn read_operand(&self, address: Word) -> Result<Word> {
        let raw = self.read_raw(address)?;
        if (raw as usize) < MEMORY_WORDS {
            return Ok(raw);
        }
        match register_index(raw) {
            Some(idx) => Ok(self.registers[idx]),
            None => Err(CoreError::InvalidOperand {
                address,
                value: raw,
            }),
        }
    }

    /// Store `value` into a memory word or, for 32768..=32775, a register.
    ///
    /// The value is stored as given; callers apply the instruction's mask.
    pub fn write(&mut self, address: Word, value: Word) -> Result<()> {
        if address as u32 >= ADDRESS_SPACE_END {
            return Err(CoreError::AddressOutOfRange(address));
        }
        if let Some(idx) = register_index(address) {
            self.registers[idx] = value;
        } else {
            self.words[address as usize] = value;
        }
        if let Some(capture) = self.write_capture.as_mut() {
            capture.push((address, value));
        }
        Ok(())
    }

    pub fn push(&mut self, value: Word) {
        self.stack.push(value);
    }

    /// Pop the top of the stack; `None` means the stack was empty.
    pub fn pop(&mut self) -> Option<Word> {
        self.stack.pop()
    }

    pub fn stack(&self) -> &[Word] {
        &self.stack
    }

    pub fn stack_depth(&self) -> usize {
        self.stack.len()
    }

    pub fn register(&self, idx: usize) -> Option<Word> {
        self.registers.get(idx).copied()
    }

    pub fn set_register(&mut self, idx: usize, value: Word) -> Result<()> {
        let slot = self
            .registers
            .get_mut(idx)
            .ok_or(CoreError::AddressOutOfRange(crate::REGISTER_BASE.wrapping_add(idx as Word)))?;
        *slot = value;
        Ok(())
    }

    pub fn registers(&self) -> &[Word; REGISTER_COUNT] {
        &self.registers
    }

    pub fn words(&self) -> &[Word] {
        &self.words
    }

    /// Replace the complete machine state, as used when restoring a snapshot.
    pub(crate) fn restore(
        &mut self,
        words: &[Word],
        registers: [Word; REGISTER_COUNT],
        stack: Vec<Word>,
        program_len: usize,
    ) -> Result<()> {
        if words.len() > MEMORY_WORDS || program_len > MEMORY_WORDS {
            return Err(CoreError::InvalidSnapshot(format!(
                "memory of {} words (program {program_len}) exceeds {MEMORY_WORDS}",
                words.len()
            )));
        }
        self.words.fill(0);
        self.words[..words.len()].copy_from_slice(words);
        self.registers = registers;
        self.stack = stack;
        self.program_len = program_len;
        Ok(())
    }

    /// Start recording every `(address, value)` store in order.
    pub fn begin_write_capture(&mut self) {
        self.write_capture = Some(Vec::new());
    }

    /// Stop recording and return the stores seen since the capture began.
    pub fn take_write_capture(&mut self) -> Vec<(Word, Word)> {
        self.write_capture.take().unwrap_or_default()
    }
}
