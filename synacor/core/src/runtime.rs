use crate::console::Console;
use crate::constants::Word;
use crate::eval::{Executor, Flow};
use crate::memory::MemoryImage;
use crate::snapshot::{now_timestamp, Snapshot, SNAPSHOT_MAGIC, SNAPSHOT_VERSION};
use crate::Result;

/// Why a bounded or unbounded run returned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunOutcome {
    Halted,
    StepLimit,
}

/// Driving loop around one machine instance.
///
/// A fatal error leaves the program counter on the faulting instruction so
/// the state can be inspected; the run is not meant to be resumed.
pub struct Runtime<C> {
    pub memory: MemoryImage,
    executor: Executor,
    console: C,
    pc: Word,
    halted: bool,
    instruction_count: u64,
}

impl<C: Console> Runtime<C> {
    pub fn new(console: C) -> Self {
        Self {
            memory: MemoryImage::new(),
            executor: Executor::new(),
            console,
            pc: 0,
            halted: false,
            instruction_count: 0,
        }
    }

    pub fn from_image(blob: &[u8], console: C) -> Result<Self> {
        let mut rt = Self::new(console);
        rt.load(blob)?;
        Ok(rt)
    }

    /// Load a program image and reset execution to address 0.
    pub fn load(&mut self, blob: &[u8]) -> Result<()> {
        self.memory.load(blob)?;
        self.pc = 0;
        self.halted = false;
        self.instruction_count = 0;
        Ok(())
    }

    pub fn pc(&self) -> Word {
        self.pc
    }

    pub fn is_halted(&self) -> bool {
        self.halted
    }

    pub fn instruction_count(&self) -> u64 {
        self.instruction_count
    }

    pub fn console(&self) -> &C {
        &self.console
    }

    pub fn console_mut(&mut self) -> &mut C {
        &mut self.console
    }

    pub fn into_console(self) -> C {
        self.console
    }

    /// Execute one instruction. Stepping a halted machine is a no-op.
    pub fn step(&mut self) -> Result<Flow> {
        if self.halted {
            return Ok(Flow::Halt);
        }
        let flow = self
            .executor
            .execute(self.pc, &mut self.memory, &mut self.console)?;
        self.instruction_count = self.instruction_count.wrapping_add(1);
        match flow {
            Flow::Next(pc) => self.pc = pc,
            Flow::Halt => self.halted = true,
        }
        Ok(flow)
    }

    /// Run until the machine halts or a fatal error occurs.
    pub fn run(&mut self) -> Result<RunOutcome> {
        while self.step()? != Flow::Halt {}
        Ok(RunOutcome::Halted)
    }

    /// Run at most `max_steps` instructions.
    pub fn run_for(&mut self, max_steps: u64) -> Result<RunOutcome> {
        for _ in 0..max_steps {
            if self.step()? == Flow::Halt {
                return Ok(RunOutcome::Halted);
            }
        }
        Ok(if self.halted {
            RunOutcome::Halted
        } else {
            RunOutcome::StepLimit
        })
    }

    pub fn snapshot(&self) -> Snapshot {
        let words = self.memory.words();
        let used = words.iter().rposition(|w| *w != 0).map_or(0, |idx| idx + 1);
        Snapshot {
            magic: SNAPSHOT_MAGIC.to_string(),
            version: SNAPSHOT_VERSION,
            created: now_timestamp(),
            pc: self.pc,
            halted: self.halted,
            instruction_count: self.instruction_count,
            registers: *self.memory.registers(),
            stack: self.memory.stack().to_vec(),
            program_len: self.memory.program_len(),
            memory: words[..used].to_vec(),
        }
    }

    /// Rebuild a runtime from a snapshot. Buffered console input is not part
    /// of a snapshot; the new console starts with an empty line buffer.
    pub fn restore(snapshot: &Snapshot, console: C) -> Result<Self> {
        snapshot.validate()?;
        let mut rt = Self::new(console);
        rt.memory.restore(
            &snapshot.memory,
            snapshot.registers,
            snapshot.stack.clone(),
            snapshot.program_len,
        )?;
        rt.pc = snapshot.pc;
        rt.halted = snapshot.halted;
        rt.instruction_count = snapshot.instruction_count;
        Ok(rt)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::console::ScriptedConsole;
    use crate::constants::REGISTER_BASE;
    use crate::CoreError;

    fn bytes(words: &[Word]) -> Vec<u8> {
        words.iter().flat_map(|w| w.to_le_bytes()).collect()
    }

    #[test]
    fn run_counts_instructions_until_halt() {
        // SET r0 4; ADD r0 r0 r0; HALT
        let prog = bytes(&[1, REGISTER_BASE, 4, 9, REGISTER_BASE, REGISTER_BASE, REGISTER_BASE, 0]);
        let mut rt = Runtime::from_image(&prog, ScriptedConsole::default()).unwrap();
        assert_eq!(rt.run().unwrap(), RunOutcome::Halted);
        assert_eq!(rt.memory.register(0), Some(8));
        assert_eq!(rt.instruction_count(), 3);
        assert!(rt.is_halted());
        assert_eq!(rt.step().unwrap(), Flow::Halt);
        assert_eq!(rt.instruction_count(), 3);
    }

    #[test]
    fn run_for_stops_at_step_limit() {
        // JMP 0 forever
        let prog = bytes(&[6, 0]);
        let mut rt = Runtime::from_image(&prog, ScriptedConsole::default()).unwrap();
        assert_eq!(rt.run_for(1000).unwrap(), RunOutcome::StepLimit);
        assert_eq!(rt.instruction_count(), 1000);
        assert_eq!(rt.pc(), 0);
    }

    #[test]
    fn fatal_error_keeps_faulting_pc() {
        let prog = bytes(&[21, 21, 99]);
        let mut rt = Runtime::from_image(&prog, ScriptedConsole::default()).unwrap();
        let err = rt.run().unwrap_err();
        assert!(matches!(err, CoreError::InvalidOpcode { pc: 2, value: 99 }));
        assert_eq!(rt.pc(), 2);
        assert_eq!(rt.instruction_count(), 2);
    }

    #[test]
    fn snapshot_restores_machine_state() {
        // PUSH 7; SET r2 9; NOOP; HALT
        let prog = bytes(&[2, 7, 1, REGISTER_BASE + 2, 9, 21, 0]);
        let mut rt = Runtime::from_image(&prog, ScriptedConsole::default()).unwrap();
        rt.run_for(2).unwrap();
        let snap = rt.snapshot();
        assert_eq!(snap.memory.len(), 7);

        let mut restored = Runtime::restore(&snap, ScriptedConsole::default()).unwrap();
        assert_eq!(restored.pc(), 5);
        assert_eq!(restored.memory.stack(), &[7u16]);
        assert_eq!(restored.memory.register(2), Some(9));
        assert_eq!(restored.memory.program_len(), 7);
        assert_eq!(restored.run().unwrap(), RunOutcome::Halted);
        assert_eq!(restored.instruction_count(), 4);
    }
}
