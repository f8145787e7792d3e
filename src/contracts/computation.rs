use super::contract::{verify_input, verify_output, Contract};
use crate::errors::DafResult;
use crate::store::DafWriter;

/// A computation with declared input and output contracts.
///
/// `run` verifies the inputs strictly before the body executes (so a breach
/// surfaces before any user code touches the store) and the outputs
/// immediately after it returns.
pub struct Computation {
    name: String,
    input: Contract,
    output: Contract,
}

impl Computation {
    pub fn new(name: impl Into<String>, input: Contract, output: Contract) -> Self {
        Self {
            name: name.into(),
            input,
            output,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn run<R>(
        &self,
        daf: &dyn DafWriter,
        body: impl FnOnce(&dyn DafWriter) -> DafResult<R>,
    ) -> DafResult<R> {
        verify_input(&self.input, daf, &self.name)?;
        let result = body(daf)?;
        verify_output(&self.output, daf, &self.name)?;
        Ok(result)
    }
}

/// A computation over two distinct stores, each with its own contracts.
pub struct DualComputation {
    name: String,
    first_input: Contract,
    first_output: Contract,
    second_input: Contract,
    second_output: Contract,
}

impl DualComputation {
    pub fn new(
        name: impl Into<String>,
        first_input: Contract,
        first_output: Contract,
        second_input: Contract,
        second_output: Contract,
    ) -> Self {
        Self {
            name: name.into(),
            first_input,
            first_output,
            second_input,
            second_output,
        }
    }

    pub fn run<R>(
        &self,
        first: &dyn DafWriter,
        second: &dyn DafWriter,
        body: impl FnOnce(&dyn DafWriter, &dyn DafWriter) -> DafResult<R>,
    ) -> DafResult<R> {
        verify_input(&self.first_input, first, &self.name)?;
        verify_input(&self.second_input, second, &self.name)?;
        let result = body(first, second)?;
        verify_output(&self.first_output, first, &self.name)?;
        verify_output(&self.second_output, second, &self.name)?;
        Ok(result)
    }
}
