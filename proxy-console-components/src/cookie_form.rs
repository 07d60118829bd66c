//! Form for setting and clearing control cookies
//!
//! The form offers every defined control cookie in a select, renders the
//! matching value widget through [`FormBuilder`], and validates submissions
//! against the definitions table before anything reaches the store.
//!
//! Form operations are pure state transitions that may write to the store:
//!
//! ```ignore
//! let form = UnitHost::new(CookieForm::new(&page), &page)?;
//! form.mount().await?;
//!
//! form.update(|state| Some(form.unit().select(&state.cloned().unwrap_or_default(), Some("mitm-rating"))));
//! form.update(|state| Some(form.unit().submit(&state.cloned().unwrap_or_default(), Some("mitm-rating"), "0.5")));
//! ```

use std::rc::Rc;
use std::time::Duration;

use proxy_console_core::{
    escape, validate_submission, ChangeEvent, ChangeKind, CookieStore, Dependency,
    DefinitionTable, EventMask, FetchError, PageContext, Submission, Unit, UnitAssets, UnitHost,
    ValidationError,
};
use tracing::debug;

use crate::form_builder::FormBuilder;

pub const TEMPLATE_URL: &str = "components/cookie-form/html/cookie-form.html";
pub const STYLE_URL: &str = "components/cookie-form/css/cookie-form.css";

pub const SET_SUCCESS: &str = "Cookie set successfully!";
pub const CLEAR_SUCCESS: &str = "All proxy cookies cleared!";
const NOTHING_SELECTED: &str = "Select a cookie to configure";

/// How long a status message stays visible
pub const MESSAGE_TIMEOUT: Duration = Duration::from_secs(3);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageKind {
    Success,
    Error,
}

impl MessageKind {
    fn class(self) -> &'static str {
        match self {
            MessageKind::Success => "success",
            MessageKind::Error => "error",
        }
    }
}

/// Status line under the form
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FormMessage {
    pub kind: MessageKind,
    pub text: String,
}

impl FormMessage {
    pub fn success(text: impl Into<String>) -> Self {
        Self {
            kind: MessageKind::Success,
            text: text.into(),
        }
    }

    pub fn error(text: impl Into<String>) -> Self {
        Self {
            kind: MessageKind::Error,
            text: text.into(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FormState {
    /// Selected definition name
    pub selected: Option<String>,
    /// Value the selected cookie currently holds in the jar
    pub current_value: Option<String>,
    pub message: Option<FormMessage>,
}

/// Cookie set/clear form
pub struct CookieForm {
    store: Rc<CookieStore>,
    definitions: Rc<DefinitionTable>,
    prefix: String,
}

impl CookieForm {
    pub fn new(page: &PageContext) -> Self {
        Self {
            store: Rc::clone(page.store()),
            definitions: Rc::clone(page.definitions()),
            prefix: page.config().cookie_prefix.clone(),
        }
    }

    pub fn definitions(&self) -> &DefinitionTable {
        &self.definitions
    }

    /// Check a submission without writing anything
    pub fn validate(&self, key: Option<&str>, value: &str) -> Result<Submission, ValidationError> {
        validate_submission(&self.definitions, key, value)
    }

    /// Select a definition; unknown names clear the selection
    pub fn select(&self, current: &FormState, key: Option<&str>) -> FormState {
        let selected = key
            .and_then(|key| self.definitions.get(key))
            .map(|definition| definition.name.clone());
        FormState {
            current_value: selected.as_deref().and_then(|key| self.store.get(key)),
            selected,
            message: current.message.clone(),
        }
    }

    /// Validate and write a submission
    ///
    /// A missing key or value leaves the form untouched. Any other rejection
    /// is reported in the status line. Rejected submissions never write.
    pub fn submit(&self, current: &FormState, key: Option<&str>, value: &str) -> FormState {
        let submission = match self.validate(key, value) {
            Ok(submission) => submission,
            Err(ValidationError::MissingKey | ValidationError::MissingValue) => {
                return current.clone();
            }
            Err(error) => {
                debug!(?key, %error, "Submission rejected");
                return FormState {
                    message: Some(FormMessage::error(error.to_string())),
                    ..current.clone()
                };
            }
        };

        match self.store.set(&submission.key, &submission.value) {
            Ok(()) => FormState {
                selected: None,
                current_value: None,
                message: Some(FormMessage::success(SET_SUCCESS)),
            },
            Err(error) => FormState {
                message: Some(FormMessage::error(error.to_string())),
                ..current.clone()
            },
        }
    }

    /// Remove every prefixed cookie
    pub fn clear_all(&self, current: &FormState) -> FormState {
        self.store.clear_all(&self.prefix);
        FormState {
            selected: current.selected.clone(),
            current_value: None,
            message: Some(FormMessage::success(CLEAR_SUCCESS)),
        }
    }

    pub fn dismiss_message(&self, current: &FormState) -> FormState {
        FormState {
            message: None,
            ..current.clone()
        }
    }

    /// Hide the status line after [`MESSAGE_TIMEOUT`]
    ///
    /// A message replaced in the meantime is left alone.
    pub async fn auto_dismiss(host: &UnitHost<CookieForm>) {
        let shown = host.state().and_then(|state| state.message);
        if shown.is_none() {
            return;
        }
        tokio::time::sleep(MESSAGE_TIMEOUT).await;
        host.update(|state| {
            let state = state?;
            (state.message == shown).then(|| host.unit().dismiss_message(state))
        });
    }

    fn render_name_select(&self, selected: Option<&str>) -> String {
        let options: String = self
            .definitions
            .iter()
            .map(|definition| {
                let name = escape(&definition.name);
                let marker = if selected == Some(definition.name.as_str()) {
                    " selected"
                } else {
                    ""
                };
                format!("<option value=\"{name}\"{marker}>{name}</option>")
            })
            .collect();
        format!(
            "<select id=\"cookieName\" name=\"cookieName\" required>\
             <option value=\"\">-- Select Cookie --</option>{options}</select>"
        )
    }
}

impl Unit for CookieForm {
    type State = FormState;

    fn name(&self) -> &'static str {
        "cookie-form"
    }

    fn slot(&self) -> &str {
        "cookie-form"
    }

    fn assets(&self) -> UnitAssets {
        UnitAssets::none()
            .script(
                Dependency::new("event-handlers", "components/cookie-form/js/event-handlers.js")
                    .requires(&["form-builder", "message-handler"]),
            )
            .script(
                Dependency::new("form-builder", "components/cookie-form/js/form-builder.js")
                    .requires(&["cookie-definitions"]),
            )
            .script(Dependency::new(
                "cookie-definitions",
                "components/cookie-form/js/cookie-definitions.js",
            ))
            .script(Dependency::new(
                "message-handler",
                "components/cookie-form/js/message-handler.js",
            ))
            .style(STYLE_URL)
            .template(TEMPLATE_URL)
    }

    fn subscriptions(&self) -> EventMask {
        EventMask::ANY_CHANGE
    }

    async fn load(&self, current: Option<&FormState>) -> Result<FormState, FetchError> {
        let current = current.cloned().unwrap_or_default();
        Ok(FormState {
            current_value: current
                .selected
                .as_deref()
                .and_then(|key| self.store.get(key)),
            ..current
        })
    }

    fn refresh(&self, event: &ChangeEvent, current: Option<&FormState>) -> Option<FormState> {
        let current = current?;
        let selected = current.selected.as_deref()?;
        let affected = event.kind == ChangeKind::ClearedAll || event.key.as_deref() == Some(selected);
        affected.then(|| FormState {
            current_value: self.store.get(selected),
            ..current.clone()
        })
    }

    fn render(&self, state: &FormState) -> String {
        let definition = state
            .selected
            .as_deref()
            .and_then(|key| self.definitions.get(key));
        let help = definition.map_or(NOTHING_SELECTED, |definition| definition.description.as_str());
        let current_value = match &state.current_value {
            Some(value) => format!(
                "<small class=\"current-value\">Current value: <code>{}</code></small>",
                escape(value)
            ),
            None => String::new(),
        };
        let message = match &state.message {
            Some(message) => format!(
                "<div class=\"form-message {}\">{}</div>",
                message.kind.class(),
                escape(&message.text)
            ),
            None => String::new(),
        };

        format!(
            "<form id=\"cookieForm\" class=\"cookie-form\">\
             <div class=\"form-group\">\
             <label for=\"cookieName\">Cookie Name</label>{}\
             <small id=\"helpText\" class=\"help-text\">{}</small>\
             </div>\
             <div class=\"form-group\">\
             <label for=\"cookieValue\">Value</label>\
             <div id=\"valueInputContainer\">{}</div>{current_value}\
             </div>\
             <div class=\"form-actions\">\
             <button type=\"submit\" class=\"btn btn-primary\">Set Cookie</button>\
             <button type=\"button\" id=\"clearAllBtn\" class=\"btn btn-danger\" data-action=\"clear-all\">Clear All Proxy Cookies</button>\
             </div>{message}\
             </form>",
            self.render_name_select(state.selected.as_deref()),
            escape(help),
            FormBuilder::build_input(definition),
        )
    }
}
