//! Declarative definitions of the control cookies an operator may set
//!
//! A [`DefinitionTable`] names each allowed key, its value domain and its
//! help text. The form builder reads it to pick a widget, and
//! [`validate_submission`] reads it to decide whether a write may happen.
//!
//! Every definition carries a strict parse/format pair: values are stored as
//! strings, but a stored value always parses back to the typed value it was
//! written from.

use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

/// One option of a choice list
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChoiceOption {
    pub value: String,
    pub label: String,
}

impl ChoiceOption {
    pub fn new(value: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            value: value.into(),
            label: label.into(),
        }
    }
}

/// Inclusive numeric bounds with an optional step
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct NumericRange {
    pub min: f64,
    pub max: f64,
    /// `None` accepts any value in range
    #[serde(default)]
    pub step: Option<f64>,
}

impl NumericRange {
    pub fn new(min: f64, max: f64, step: Option<f64>) -> Self {
        Self { min, max, step }
    }

    pub fn contains(&self, value: f64) -> bool {
        (self.min..=self.max).contains(&value)
    }

    /// Whether `value` lies on the step grid anchored at `min`
    pub fn on_step(&self, value: f64) -> bool {
        match self.step {
            Some(step) if step > 0.0 => {
                let steps = (value - self.min) / step;
                (steps - steps.round()).abs() < 1e-6
            }
            _ => true,
        }
    }
}

/// Which widget a definition needs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum InputKind {
    Choice,
    Number,
    Text,
}

/// Allowed values of a control cookie
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ValueDomain {
    Choice { options: Vec<ChoiceOption> },
    Number(NumericRange),
    Text,
}

/// A value parsed against its definition
#[derive(Debug, Clone, PartialEq)]
pub enum TypedValue {
    Choice(String),
    Number(f64),
    Text(String),
}

impl TypedValue {
    /// Canonical string form stored in the jar
    pub fn format(&self) -> String {
        match self {
            TypedValue::Choice(value) | TypedValue::Text(value) => value.clone(),
            TypedValue::Number(value) => value.to_string(),
        }
    }
}

/// Static description of one control cookie
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DefinitionEntry {
    pub name: String,
    pub description: String,
    /// Placeholder guidance for free-form widgets
    #[serde(default)]
    pub help_text: String,
    #[serde(flatten)]
    pub domain: ValueDomain,
}

impl DefinitionEntry {
    pub fn choice(name: &str, description: &str, options: Vec<ChoiceOption>) -> Self {
        Self {
            name: name.to_string(),
            description: description.to_string(),
            help_text: String::new(),
            domain: ValueDomain::Choice { options },
        }
    }

    pub fn number(name: &str, description: &str, help_text: &str, range: NumericRange) -> Self {
        Self {
            name: name.to_string(),
            description: description.to_string(),
            help_text: help_text.to_string(),
            domain: ValueDomain::Number(range),
        }
    }

    pub fn text(name: &str, description: &str, help_text: &str) -> Self {
        Self {
            name: name.to_string(),
            description: description.to_string(),
            help_text: help_text.to_string(),
            domain: ValueDomain::Text,
        }
    }

    pub fn input_kind(&self) -> InputKind {
        match self.domain {
            ValueDomain::Choice { .. } => InputKind::Choice,
            ValueDomain::Number(_) => InputKind::Number,
            ValueDomain::Text => InputKind::Text,
        }
    }

    /// Parse a raw submitted value against this definition
    ///
    /// Numbers outside the range are rejected, never clamped.
    pub fn parse(&self, raw: &str) -> Result<TypedValue, ValidationError> {
        if raw.trim().is_empty() {
            return Err(ValidationError::MissingValue);
        }
        match &self.domain {
            ValueDomain::Choice { options } => options
                .iter()
                .find(|option| option.value == raw)
                .map(|option| TypedValue::Choice(option.value.clone()))
                .ok_or_else(|| ValidationError::UnknownChoice {
                    name: self.name.clone(),
                    value: raw.to_string(),
                }),
            ValueDomain::Number(range) => {
                let value = raw
                    .trim()
                    .parse::<f64>()
                    .ok()
                    .filter(|value| value.is_finite())
                    .ok_or_else(|| ValidationError::NotANumber {
                        value: raw.to_string(),
                    })?;
                if !range.contains(value) {
                    return Err(ValidationError::OutOfRange {
                        value,
                        min: range.min,
                        max: range.max,
                    });
                }
                if let Some(step) = range.step.filter(|_| !range.on_step(value)) {
                    return Err(ValidationError::StepMismatch {
                        value,
                        min: range.min,
                        step,
                    });
                }
                Ok(TypedValue::Number(value))
            }
            ValueDomain::Text => Ok(TypedValue::Text(raw.to_string())),
        }
    }
}

/// Ordered set of definitions, loaded once per page session
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DefinitionTable {
    entries: Vec<DefinitionEntry>,
}

impl DefinitionTable {
    pub fn new(entries: Vec<DefinitionEntry>) -> Self {
        Self { entries }
    }

    /// Load a table from a JSON array of definitions
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    pub fn get(&self, name: &str) -> Option<&DefinitionEntry> {
        self.entries.iter().find(|entry| entry.name == name)
    }

    pub fn iter(&self) -> impl Iterator<Item = &DefinitionEntry> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// The proxy's control cookies
    pub fn mitm_defaults() -> Self {
        let enabled = || {
            vec![
                ChoiceOption::new("true", "Enabled (true)"),
                ChoiceOption::new("false", "Disabled (false)"),
            ]
        };
        Self::new(vec![
            DefinitionEntry::choice(
                "mitm-mode",
                "Control Html content mode",
                vec![
                    ChoiceOption::new("xxx", "Html to XXX"),
                    ChoiceOption::new("hashes", "Html to Hashes"),
                    ChoiceOption::new("abcde-by-size", "Html to ABCDE (by size)"),
                    ChoiceOption::new("xxx-negative-0.5", "Show XXX | Negative > 0.5"),
                    ChoiceOption::new("xxx-negative-1", "Show XXX | Negative > 1"),
                    ChoiceOption::new("xxx-negative-2", "Show XXX | Negative > 2"),
                    ChoiceOption::new("xxx-negative-3", "Show XXX | Negative > 3"),
                    ChoiceOption::new("xxx-negative-4", "Show XXX | Negative > 4"),
                ],
            ),
            DefinitionEntry::choice(
                "mitm-show",
                "Control content display",
                vec![
                    ChoiceOption::new("url-to-html-min-rating", "Filter content (with min 0.5)"),
                    ChoiceOption::new("url-to-html-xxx", "Url to Html XXX"),
                    ChoiceOption::new("url-to-html-hashes", "Url to Html Hashes"),
                    ChoiceOption::new("url-to-html-dict", "Url to Html Dict (json)"),
                    ChoiceOption::new("url-to-html-ratings", "Url to Html Ratings"),
                    ChoiceOption::new("url-to-lines", "Url to Html Lines"),
                    ChoiceOption::new("url-to-text-nodes", "Url to Text Nodes (json)"),
                    ChoiceOption::new("url-to-ratings", "Url to Ratings"),
                    ChoiceOption::new("response-data", "Response Data (json)"),
                ],
            ),
            DefinitionEntry::choice(
                "mitm-inject",
                "Inject debug content",
                vec![
                    ChoiceOption::new("debug-panel", "Debug Panel"),
                    ChoiceOption::new("debug-banner", "Debug Banner"),
                ],
            ),
            DefinitionEntry::text(
                "mitm-replace",
                "Replace text (format: old:new)",
                "oldtext:newtext",
            ),
            DefinitionEntry::choice("mitm-debug", "Enable debug mode", enabled()),
            DefinitionEntry::number(
                "mitm-rating",
                "Set minimum rating threshold",
                "0.5",
                NumericRange::new(0.0, 1.0, Some(0.1)),
            ),
            DefinitionEntry::text(
                "mitm-model",
                "Override WCF model",
                "google/gemini-2.0-flash-lite-001",
            ),
            DefinitionEntry::choice("mitm-cache", "Enable response caching", enabled()),
        ])
    }
}

/// A validated write, ready for the store
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Submission {
    pub key: String,
    /// Canonical formatted value
    pub value: String,
}

/// Check a form submission against the definitions table
///
/// Both a key and a non-empty value are required, the key must be defined,
/// and the value must parse under its definition.
pub fn validate_submission(
    table: &DefinitionTable,
    key: Option<&str>,
    value: &str,
) -> Result<Submission, ValidationError> {
    let key = key
        .map(str::trim)
        .filter(|key| !key.is_empty())
        .ok_or(ValidationError::MissingKey)?;
    if value.trim().is_empty() {
        return Err(ValidationError::MissingValue);
    }
    let definition = table
        .get(key)
        .ok_or_else(|| ValidationError::UnknownKey(key.to_string()))?;
    let typed = definition.parse(value)?;
    Ok(Submission {
        key: definition.name.clone(),
        value: typed.format(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_input_kinds() {
        let table = DefinitionTable::mitm_defaults();
        assert_eq!(table.len(), 8);
        assert_eq!(table.get("mitm-show").unwrap().input_kind(), InputKind::Choice);
        assert_eq!(table.get("mitm-rating").unwrap().input_kind(), InputKind::Number);
        assert_eq!(table.get("mitm-model").unwrap().input_kind(), InputKind::Text);
        assert!(table.get("mitm-unknown").is_none());
    }

    #[test]
    fn test_rating_accepts_in_range_value() {
        let table = DefinitionTable::mitm_defaults();
        let submission = validate_submission(&table, Some("mitm-rating"), "0.5").unwrap();
        assert_eq!(submission.value, "0.5");
    }

    #[test]
    fn test_rating_rejects_out_of_range_without_clamping() {
        let table = DefinitionTable::mitm_defaults();
        assert_eq!(
            validate_submission(&table, Some("mitm-rating"), "5"),
            Err(ValidationError::OutOfRange {
                value: 5.0,
                min: 0.0,
                max: 1.0
            })
        );
        assert!(matches!(
            validate_submission(&table, Some("mitm-rating"), "-0.1"),
            Err(ValidationError::OutOfRange { .. })
        ));
    }

    #[test]
    fn test_rating_rejects_off_step_and_non_numbers() {
        let table = DefinitionTable::mitm_defaults();
        assert!(matches!(
            validate_submission(&table, Some("mitm-rating"), "0.55"),
            Err(ValidationError::StepMismatch { .. })
        ));
        assert!(matches!(
            validate_submission(&table, Some("mitm-rating"), "abc"),
            Err(ValidationError::NotANumber { .. })
        ));
        assert!(matches!(
            validate_submission(&table, Some("mitm-rating"), "NaN"),
            Err(ValidationError::NotANumber { .. })
        ));
    }

    #[test]
    fn test_number_format_round_trips() {
        let rating = DefinitionTable::mitm_defaults();
        let rating = rating.get("mitm-rating").unwrap();
        for raw in ["0", "0.1", "0.7", "1"] {
            let typed = rating.parse(raw).unwrap();
            assert_eq!(rating.parse(&typed.format()).unwrap(), typed);
            assert_eq!(typed.format(), raw);
        }
    }

    #[test]
    fn test_missing_key_or_value() {
        let table = DefinitionTable::mitm_defaults();
        assert_eq!(
            validate_submission(&table, None, "x"),
            Err(ValidationError::MissingKey)
        );
        assert_eq!(
            validate_submission(&table, Some(""), "x"),
            Err(ValidationError::MissingKey)
        );
        assert_eq!(
            validate_submission(&table, Some("mitm-model"), "  "),
            Err(ValidationError::MissingValue)
        );
    }

    #[test]
    fn test_choice_must_be_listed() {
        let table = DefinitionTable::mitm_defaults();
        assert!(validate_submission(&table, Some("mitm-debug"), "true").is_ok());
        assert!(matches!(
            validate_submission(&table, Some("mitm-debug"), "yes"),
            Err(ValidationError::UnknownChoice { .. })
        ));
    }

    #[test]
    fn test_unknown_key_is_rejected() {
        let table = DefinitionTable::mitm_defaults();
        assert_eq!(
            validate_submission(&table, Some("mitm-nope"), "1"),
            Err(ValidationError::UnknownKey("mitm-nope".to_string()))
        );
    }

    #[test]
    fn test_table_from_json() {
        let table = DefinitionTable::from_json(
            r#"[
                {"name": "mitm-debug", "description": "Debug", "type": "choice",
                 "options": [{"value": "true", "label": "On"}]},
                {"name": "mitm-rating", "description": "Rating", "help_text": "0.5",
                 "type": "number", "min": 0, "max": 1, "step": 0.1},
                {"name": "mitm-model", "description": "Model", "type": "text"}
            ]"#,
        )
        .unwrap();

        assert_eq!(table.len(), 3);
        assert_eq!(
            table.get("mitm-rating").unwrap().domain,
            ValueDomain::Number(NumericRange::new(0.0, 1.0, Some(0.1)))
        );
        assert_eq!(table.get("mitm-model").unwrap().input_kind(), InputKind::Text);
    }
}
