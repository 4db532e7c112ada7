//! Statement result aggregation.

use veil_core::SensitiveField;

use crate::error::MaskError;
use crate::field::FieldInfo;

/// Collects the output fields of every analyzed statement, in order.
///
/// The first error recorded wins: later statements are skipped, and
/// [`finish`](FieldCollector::finish) discards any fields gathered so far.
#[derive(Debug, Default)]
pub struct FieldCollector {
    fields: Vec<SensitiveField>,
    error: Option<MaskError>,
}

impl FieldCollector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Run `analyze` unless an earlier statement already failed.
    pub fn collect<F>(&mut self, analyze: F)
    where
        F: FnOnce() -> Result<Vec<FieldInfo>, MaskError>,
    {
        if self.error.is_some() {
            return;
        }
        match analyze() {
            Ok(fields) => self
                .fields
                .extend(fields.into_iter().map(SensitiveField::from)),
            Err(err) => self.error = Some(err),
        }
    }

    pub fn has_failed(&self) -> bool {
        self.error.is_some()
    }

    pub fn finish(self) -> Result<Vec<SensitiveField>, MaskError> {
        match self.error {
            Some(err) => Err(err),
            None => Ok(self.fields),
        }
    }
}
