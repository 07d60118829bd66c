//! Value input markup driven by the definitions table

use proxy_console_core::{escape, DefinitionEntry, NumericRange, ValueDomain};

/// Placeholder for free-form inputs without help text
pub const DEFAULT_PLACEHOLDER: &str = "Enter value...";

/// Builds the value widget for a selected definition
///
/// Every widget is named `cookieValue` and marked `required`, except the
/// placeholder shown before anything is selected, which is disabled.
pub struct FormBuilder;

impl FormBuilder {
    /// Widget for `definition`, or a disabled placeholder for `None`
    pub fn build_input(definition: Option<&DefinitionEntry>) -> String {
        let Some(definition) = definition else {
            return format!(
                "<input type=\"text\" id=\"cookieValue\" name=\"cookieValue\" placeholder=\"{DEFAULT_PLACEHOLDER}\" disabled>"
            );
        };
        match &definition.domain {
            ValueDomain::Choice { .. } => Self::build_select_input(definition),
            ValueDomain::Number(range) => Self::build_number_input(definition, range),
            ValueDomain::Text => Self::build_text_input(definition),
        }
    }

    /// `<select>` with an empty first option, so a choice must be made
    pub fn build_select_input(definition: &DefinitionEntry) -> String {
        let options: String = match &definition.domain {
            ValueDomain::Choice { options } => options
                .iter()
                .map(|option| {
                    format!(
                        "<option value=\"{}\">{}</option>",
                        escape(&option.value),
                        escape(&option.label)
                    )
                })
                .collect(),
            _ => String::new(),
        };
        format!(
            "<select id=\"cookieValue\" name=\"cookieValue\" required>\
             <option value=\"\">-- Select Value --</option>{options}</select>"
        )
    }

    pub fn build_number_input(definition: &DefinitionEntry, range: &NumericRange) -> String {
        let step = range
            .step
            .map_or_else(|| "any".to_string(), |step| step.to_string());
        format!(
            "<input type=\"number\" id=\"cookieValue\" name=\"cookieValue\" placeholder=\"{}\" \
             min=\"{}\" max=\"{}\" step=\"{}\" required>",
            escape(&definition.help_text),
            range.min,
            range.max,
            step
        )
    }

    pub fn build_text_input(definition: &DefinitionEntry) -> String {
        let placeholder = if definition.help_text.is_empty() {
            DEFAULT_PLACEHOLDER
        } else {
            definition.help_text.as_str()
        };
        format!(
            "<input type=\"text\" id=\"cookieValue\" name=\"cookieValue\" placeholder=\"{}\" required>",
            escape(placeholder)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proxy_console_core::DefinitionTable;

    #[test]
    fn test_choice_renders_one_option_per_value() {
        let table = DefinitionTable::mitm_defaults();
        let html = FormBuilder::build_input(table.get("mitm-debug"));

        assert!(html.starts_with("<select"));
        assert!(html.contains("required"));
        assert!(html.contains("<option value=\"\">-- Select Value --</option>"));
        assert!(html.contains("<option value=\"true\">Enabled (true)</option>"));
        assert!(html.contains("<option value=\"false\">Disabled (false)</option>"));
        assert_eq!(html.matches("<option").count(), 3);
    }

    #[test]
    fn test_number_carries_range_and_step() {
        let table = DefinitionTable::mitm_defaults();
        let html = FormBuilder::build_input(table.get("mitm-rating"));

        assert!(html.contains("type=\"number\""));
        assert!(html.contains("min=\"0\""));
        assert!(html.contains("max=\"1\""));
        assert!(html.contains("step=\"0.1\""));
        assert!(html.contains("placeholder=\"0.5\""));
    }

    #[test]
    fn test_number_without_step_accepts_any() {
        let definition =
            DefinitionEntry::number("mitm-x", "x", "", NumericRange::new(1.0, 5.0, None));
        assert!(FormBuilder::build_input(Some(&definition)).contains("step=\"any\""));
    }

    #[test]
    fn test_text_uses_help_text_as_placeholder() {
        let table = DefinitionTable::mitm_defaults();
        let html = FormBuilder::build_input(table.get("mitm-replace"));
        assert!(html.contains("placeholder=\"oldtext:newtext\""));

        let bare = DefinitionEntry::text("mitm-y", "y", "");
        assert!(FormBuilder::build_input(Some(&bare)).contains("placeholder=\"Enter value...\""));
    }

    #[test]
    fn test_nothing_selected_is_disabled() {
        let html = FormBuilder::build_input(None);
        assert!(html.contains("disabled"));
        assert!(!html.contains("required"));
    }
}
