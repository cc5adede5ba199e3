use std::borrow::Cow;
use std::collections::HashMap;

use validator::{ValidationError, ValidationErrors};

/// Rules a transaction broke during validation. Every violated rule is kept,
/// so a declined tx reports all of its problems at once.
#[derive(Debug, Clone, Default)]
pub struct TxViolations(Vec<(&'static str, ValidationError)>);

impl TxViolations {
    pub fn add(&mut self, field: &'static str, code: &'static str, message: String) {
        let error = ValidationError {
            code: Cow::from(code),
            message: Some(Cow::from(message)),
            params: HashMap::new(),
        };
        self.0.push((field, error));
    }

    pub fn extend(&mut self, other: TxViolations) {
        self.0.extend(other.0);
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn codes(&self) -> Vec<String> {
        self.0.iter().map(|(_, error)| error.code.to_string()).collect()
    }

    pub fn contains(&self, code: &str) -> bool {
        self.0.iter().any(|(_, error)| error.code == code)
    }

    pub fn to_validation_errors(&self) -> ValidationErrors {
        let mut errors = ValidationErrors::new();
        for (field, error) in self.0.iter().cloned() {
            errors.add(field, error);
        }
        errors
    }
}
