//! Constant step: the same value for every row.

use trellis_core::error::StepError;
use trellis_core::step::{Step, StepExtra, StepOutput};
use trellis_core::value::{Column, Value};

pub struct ConstantStep {
    pub value: Value,
}

impl ConstantStep {
    pub fn new(value: Value) -> Self {
        Self { value }
    }
}

impl Step for ConstantStep {
    fn name(&self) -> &'static str {
        "constant"
    }

    fn is_sync_and_safe(&self) -> bool {
        true
    }

    fn execute(&self, deps: &[Column], _extra: &StepExtra) -> Result<StepOutput, StepError> {
        let rows = deps
            .first()
            .ok_or_else(|| StepError::input("constant expects a batch-shape input"))?
            .len();
        Ok(StepOutput::values(vec![self.value.clone(); rows]))
    }
}
