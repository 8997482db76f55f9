//! Per-field validation of candidate records against declared rules.
//!
//! Rules are supplied by the caller per endpoint and immutable once
//! constructed. All violations for all fields are collected in
//! declaration order; within a field the checks run required → format →
//! min length → max length. An empty or absent value only ever produces
//! the required violation: the remaining checks are skipped rather than
//! piled on top.

use regex::Regex;
use std::collections::HashMap;
use std::sync::LazyLock;

static EMAIL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("valid regex"));

static PHONE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\+?[\d\s\-()]{7,20}$").expect("valid regex"));

static ALPHANUMERIC: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z0-9]+$").expect("valid regex"));

static NAME: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z][A-Za-z\s'-]*$").expect("valid regex"));

/// Format family a field value must match.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FieldKind {
    Email,
    Phone,
    Alphanumeric,
    Name,
    /// No format constraint.
    #[default]
    None,
}

impl FieldKind {
    fn matches(self, value: &str) -> bool {
        match self {
            FieldKind::Email => EMAIL.is_match(value),
            FieldKind::Phone => PHONE.is_match(value),
            FieldKind::Alphanumeric => ALPHANUMERIC.is_match(value),
            FieldKind::Name => NAME.is_match(value),
            FieldKind::None => true,
        }
    }

    fn describe(self) -> &'static str {
        match self {
            FieldKind::Email => "a valid email address",
            FieldKind::Phone => "a valid phone number",
            FieldKind::Alphanumeric => "alphanumeric",
            FieldKind::Name => "a valid name",
            FieldKind::None => "",
        }
    }
}

/// Validation rule for a single field.
#[derive(Debug, Clone, Default)]
pub struct FieldRule {
    pub required: bool,
    pub kind: FieldKind,
    pub min_length: Option<usize>,
    pub max_length: Option<usize>,
}

/// Validate `record` against `rules`, collecting every violation.
///
/// `rules` is ordered; the output preserves field-declaration order.
pub fn validate_fields(
    rules: &[(String, FieldRule)],
    record: &HashMap<String, String>,
) -> Vec<String> {
    let mut violations = Vec::new();

    for (field, rule) in rules {
        let value = record.get(field).map(String::as_str).unwrap_or("");

        if value.trim().is_empty() {
            if rule.required {
                violations.push(format!("{field} is required"));
            }
            // Absent or empty: nothing further to check either way.
            continue;
        }

        if !rule.kind.matches(value) {
            violations.push(format!("{field} must be {}", rule.kind.describe()));
        }

        if let Some(min) = rule.min_length {
            if value.len() < min {
                violations.push(format!("{field} must be at least {min} characters"));
            }
        }

        if let Some(max) = rule.max_length {
            if value.len() > max {
                violations.push(format!("{field} must be at most {max} characters"));
            }
        }
    }

    violations
}
