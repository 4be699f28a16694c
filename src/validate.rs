//! Declarative request-body validation.
//!
//! A `Schema` is a pure description: an ordered list of named field rules
//! plus an unknown-fields policy, reused across requests. Validation is
//! non-short-circuiting at the field level: every violation is collected so
//! the client gets the complete list in one round trip, ordered by declared
//! field order. `partial()` derives the edit-form variant where every field
//! is optional but, when present, still constrained by its original rule.

use regex::Regex;
use serde_json::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldType {
    String,
    Number,
    Boolean,
}

/// Constraint set for one field.
#[derive(Debug, Clone)]
pub struct FieldRule {
    kind: FieldType,
    required: bool,
    pattern: Option<Regex>,
    one_of: Option<Vec<String>>,
    min: Option<f64>,
    max: Option<f64>,
    min_len: Option<usize>,
    max_len: Option<usize>,
}

impl FieldRule {
    fn new(kind: FieldType) -> Self {
        Self {
            kind,
            required: true,
            pattern: None,
            one_of: None,
            min: None,
            max: None,
            min_len: None,
            max_len: None,
        }
    }

    pub fn string() -> Self {
        Self::new(FieldType::String)
    }

    pub fn number() -> Self {
        Self::new(FieldType::Number)
    }

    pub fn boolean() -> Self {
        Self::new(FieldType::Boolean)
    }

    pub fn optional(mut self) -> Self {
        self.required = false;
        self
    }

    /// Regex the whole value must match. Patterns are declared statically at
    /// startup, so a malformed one is a programming error.
    pub fn pattern(mut self, re: &str) -> Self {
        self.pattern = Some(Regex::new(re).expect("invalid field pattern"));
        self
    }

    pub fn one_of(mut self, values: &[&str]) -> Self {
        self.one_of = Some(values.iter().map(|v| v.to_string()).collect());
        self
    }

    pub fn min(mut self, v: f64) -> Self {
        self.min = Some(v);
        self
    }

    pub fn max(mut self, v: f64) -> Self {
        self.max = Some(v);
        self
    }

    pub fn min_len(mut self, n: usize) -> Self {
        self.min_len = Some(n);
        self
    }

    pub fn max_len(mut self, n: usize) -> Self {
        self.max_len = Some(n);
        self
    }

    fn check(&self, name: &str, value: &Value, errors: &mut Vec<String>) {
        match self.kind {
            FieldType::String => {
                let Some(s) = value.as_str() else {
                    errors.push(format!("'{name}' must be a string"));
                    return;
                };
                if let Some(min) = self.min_len {
                    if s.chars().count() < min {
                        errors.push(format!("'{name}' must be at least {min} characters"));
                    }
                }
                if let Some(max) = self.max_len {
                    if s.chars().count() > max {
                        errors.push(format!("'{name}' must be at most {max} characters"));
                    }
                }
                if let Some(re) = &self.pattern {
                    if !re.is_match(s) {
                        errors.push(format!("'{name}' has an invalid format"));
                    }
                }
                if let Some(allowed) = &self.one_of {
                    if !allowed.iter().any(|a| a == s) {
                        errors.push(format!(
                            "'{name}' must be one of: {}",
                            allowed.join(", ")
                        ));
                    }
                }
            }
            FieldType::Number => {
                let Some(n) = value.as_f64() else {
                    errors.push(format!("'{name}' must be a number"));
                    return;
                };
                if let Some(min) = self.min {
                    if n < min {
                        errors.push(format!("'{name}' must be at least {min}"));
                    }
                }
                if let Some(max) = self.max {
                    if n > max {
                        errors.push(format!("'{name}' must be at most {max}"));
                    }
                }
            }
            FieldType::Boolean => {
                if !value.is_boolean() {
                    errors.push(format!("'{name}' must be a boolean"));
                }
            }
        }
    }
}

/// Ordered, reusable description of a request body.
#[derive(Debug, Clone, Default)]
pub struct Schema {
    fields: Vec<(String, FieldRule)>,
    deny_unknown: bool,
}

impl Schema {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn field(mut self, name: &str, rule: FieldRule) -> Self {
        self.fields.push((name.to_string(), rule));
        self
    }

    /// Reject fields the schema does not declare.
    pub fn deny_unknown(mut self) -> Self {
        self.deny_unknown = true;
        self
    }

    /// Variant for partial updates: every field optional, rules unchanged.
    pub fn partial(&self) -> Schema {
        Schema {
            fields: self
                .fields
                .iter()
                .map(|(name, rule)| {
                    let mut rule = rule.clone();
                    rule.required = false;
                    (name.clone(), rule)
                })
                .collect(),
            deny_unknown: self.deny_unknown,
        }
    }

    /// Validate a JSON body. `Err` carries every violation, ordered by
    /// declared field order with unknown-field messages last.
    pub fn validate(&self, input: &Value) -> Result<(), Vec<String>> {
        let Some(object) = input.as_object() else {
            return Err(vec!["Request body must be a JSON object".to_string()]);
        };

        let mut errors = Vec::new();
        for (name, rule) in &self.fields {
            match object.get(name) {
                None | Some(Value::Null) => {
                    if rule.required {
                        errors.push(format!("'{name}' is required"));
                    }
                }
                Some(value) => rule.check(name, value, &mut errors),
            }
        }

        if self.deny_unknown {
            for key in object.keys() {
                if !self.fields.iter().any(|(name, _)| name == key) {
                    errors.push(format!("Unknown field '{key}'"));
                }
            }
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}
