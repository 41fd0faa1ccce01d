//! Command output.
//!
//! Every command reports through an `Output`, which either prints
//! human-readable lines or a single JSON document. It is passed down
//! explicitly rather than kept in global state.

use crate::error::{Result, RoverError};
use serde::Serialize;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Output {
    pub json: bool,
    pub verbose: bool,
}

impl Output {
    pub fn new(json: bool, verbosity: u8) -> Self {
        Self {
            json,
            verbose: verbosity > 0,
        }
    }

    /// Print `value` as JSON, or call `human` to print it for people.
    pub fn emit<T: Serialize>(&self, value: &T, human: impl FnOnce()) -> Result<()> {
        if self.json {
            println!("{}", to_json(value)?);
        } else {
            human();
        }
        Ok(())
    }

    /// Report a failed command.
    pub fn error(&self, err: &RoverError) {
        if self.json {
            println!("{}", error_document(err));
        } else {
            eprintln!("Error: {}", err);
        }
    }
}

/// `{"success":false,"error":"..."}`
pub fn error_document(err: &RoverError) -> serde_json::Value {
    serde_json::json!({
        "success": false,
        "error": err.to_string(),
    })
}

fn to_json<T: Serialize>(value: &T) -> Result<String> {
    serde_json::to_string_pretty(value)
        .map_err(|e| RoverError::Save(format!("failed to serialize output: {}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_document() {
        let err = RoverError::NotFound("task 7 not found".to_string());
        let doc = error_document(&err);
        assert_eq!(doc["success"], false);
        assert!(doc["error"].as_str().unwrap().contains("task 7 not found"));
    }

    #[test]
    fn test_human_callback_only_outside_json() {
        let mut called = false;
        Output::new(false, 0)
            .emit(&serde_json::json!({}), || called = true)
            .unwrap();
        assert!(called);

        let mut called = false;
        Output::new(true, 2)
            .emit(&serde_json::json!({}), || called = true)
            .unwrap();
        assert!(!called);
    }

    #[test]
    fn test_verbose_flag() {
        assert!(!Output::new(false, 0).verbose);
        assert!(Output::new(false, 1).verbose);
    }
}
