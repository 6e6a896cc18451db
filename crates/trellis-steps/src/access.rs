//! Access step: project a key out of an object-valued dependency.

use trellis_core::error::StepError;
use trellis_core::step::{Step, StepExtra, StepOutput};
use trellis_core::value::{Column, Value};

/// Per-row `row[key]` over the first dependency column. Missing keys and
/// non-object rows yield `null` rather than errors, matching the
/// permissive field-access semantics of the query layer above.
pub struct AccessStep {
    pub key: String,
}

impl AccessStep {
    pub fn new(key: impl Into<String>) -> Self {
        Self { key: key.into() }
    }
}

impl Step for AccessStep {
    fn name(&self) -> &'static str {
        "access"
    }

    fn is_sync_and_safe(&self) -> bool {
        true
    }

    fn execute(&self, deps: &[Column], _extra: &StepExtra) -> Result<StepOutput, StepError> {
        let input = deps
            .first()
            .ok_or_else(|| StepError::input("access expects one input"))?;

        let values = input
            .iter()
            .map(|d| {
                d.as_value()
                    .and_then(|v| v.get(self.key.as_str()))
                    .cloned()
                    .unwrap_or(Value::Null)
            })
            .collect();

        Ok(StepOutput::values(values))
    }
}
