use std::io::{self, BufRead, Write};
use std::path::PathBuf;

use crate::error::{PatchError, Result};

/// Operator checkpoint before repackaging.
pub trait Checkpoint {
    /// Block until the operator lets the pipeline continue.
    fn wait(&mut self, prompt: &str) -> Result<()>;
}

/// Prints the prompt and waits for a line of input. End of input counts as
/// an acknowledgement.
pub struct LineCheckpoint<R> {
    input: R,
}

impl<R: BufRead> LineCheckpoint<R> {
    pub fn new(input: R) -> Self {
        Self { input }
    }
}

impl LineCheckpoint<io::StdinLock<'static>> {
    pub fn stdin() -> Self {
        Self::new(io::stdin().lock())
    }
}

impl<R: BufRead> Checkpoint for LineCheckpoint<R> {
    fn wait(&mut self, prompt: &str) -> Result<()> {
        print!("{prompt}");
        io::stdout()
            .flush()
            .map_err(|err| PatchError::from_io_error(PathBuf::from("<stdout>"), err))?;

        let mut line = String::new();
        self.input
            .read_line(&mut line)
            .map_err(|err| PatchError::from_io_error(PathBuf::from("<stdin>"), err))?;
        Ok(())
    }
}

/// Never blocks.
#[derive(Debug, Default, Clone, Copy)]
pub struct AutoContinue;

impl Checkpoint for AutoContinue {
    fn wait(&mut self, _prompt: &str) -> Result<()> {
        Ok(())
    }
}
