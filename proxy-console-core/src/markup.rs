//! Markup helpers: escaping, slot templates and render roots
//!
//! A unit's structural template is plain HTML with slot markers:
//!
//! ```html
//! <section class="cookie-table">
//!   <h2>Active Cookies</h2>
//!   <!-- slot:cookie-table -->
//! </section>
//! ```
//!
//! The unit's render output replaces the marker. A root without a template,
//! or whose template lacks the marker, ignores render output.

use std::collections::BTreeMap;

const SLOT_OPEN: &str = "<!-- slot:";
const SLOT_CLOSE: &str = "-->";

/// Escape text for use in element content or a quoted attribute
pub fn escape(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            _ => escaped.push(c),
        }
    }
    escaped
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Text(String),
    Slot(String),
}

/// Structural template split around its slot markers
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Template {
    segments: Vec<Segment>,
}

impl Template {
    /// Parse template source, recognising `<!-- slot:NAME -->` markers
    ///
    /// An unterminated marker is kept as text.
    pub fn parse(source: &str) -> Self {
        let mut segments = Vec::new();
        let mut rest = source;
        while let Some(start) = rest.find(SLOT_OPEN) {
            let after_open = &rest[start + SLOT_OPEN.len()..];
            let Some(end) = after_open.find(SLOT_CLOSE) else {
                break;
            };
            if start > 0 {
                segments.push(Segment::Text(rest[..start].to_string()));
            }
            segments.push(Segment::Slot(after_open[..end].trim().to_string()));
            rest = &after_open[end + SLOT_CLOSE.len()..];
        }
        if !rest.is_empty() {
            segments.push(Segment::Text(rest.to_string()));
        }
        Self { segments }
    }

    /// Template consisting of a single slot, for units without a template
    pub fn bare(slot: &str) -> Self {
        Self {
            segments: vec![Segment::Slot(slot.to_string())],
        }
    }

    pub fn has_slot(&self, name: &str) -> bool {
        self.slots().any(|slot| slot == name)
    }

    /// Slot names in document order
    pub fn slots(&self) -> impl Iterator<Item = &str> {
        self.segments.iter().filter_map(|segment| match segment {
            Segment::Slot(name) => Some(name.as_str()),
            Segment::Text(_) => None,
        })
    }

    /// Render with each slot replaced by its content (empty when unfilled)
    pub fn fill(&self, contents: &BTreeMap<String, String>) -> String {
        let mut html = String::new();
        for segment in &self.segments {
            match segment {
                Segment::Text(text) => html.push_str(text),
                Segment::Slot(name) => {
                    if let Some(content) = contents.get(name) {
                        html.push_str(content);
                    }
                }
            }
        }
        html
    }
}

/// The markup a unit owns: its template plus the content of each slot
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RenderRoot {
    template: Option<Template>,
    slots: BTreeMap<String, String>,
    /// Shown instead of the template when none could be loaded
    fallback: Option<String>,
}

impl RenderRoot {
    pub fn new() -> Self {
        Self::default()
    }

    /// Install the structural template, dropping any fallback
    pub fn set_template(&mut self, template: Template) {
        self.template = Some(template);
        self.fallback = None;
    }

    pub fn has_template(&self) -> bool {
        self.template.is_some()
    }

    pub fn has_slot(&self, name: &str) -> bool {
        self.template
            .as_ref()
            .is_some_and(|template| template.has_slot(name))
    }

    /// Replace a slot's content
    ///
    /// Returns `false` without touching anything when the template is not in
    /// place yet or has no such slot.
    pub fn fill(&mut self, slot: &str, markup: String) -> bool {
        if !self.has_slot(slot) {
            return false;
        }
        self.slots.insert(slot.to_string(), markup);
        true
    }

    pub fn slot(&self, name: &str) -> Option<&str> {
        self.slots.get(name).map(String::as_str)
    }

    pub fn set_fallback(&mut self, markup: String) {
        self.fallback = Some(markup);
    }

    /// Drop template, slot content and fallback
    pub fn clear(&mut self) {
        *self = Self::default();
    }

    /// Current markup of the whole root
    pub fn html(&self) -> String {
        match (&self.template, &self.fallback) {
            (Some(template), _) => template.fill(&self.slots),
            (None, Some(fallback)) => fallback.clone(),
            (None, None) => String::new(),
        }
    }
}

/// Inline error state with a manual retry action
pub fn error_panel(headline: &str, reason: &str) -> String {
    format!(
        "<div class=\"error-state\">\
         <h3>\u{274c} {}</h3>\
         <p>{}</p>\
         <button class=\"btn btn-primary\" data-action=\"retry\">Retry</button>\
         </div>",
        escape(headline),
        escape(reason)
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_escape() {
        assert_eq!(
            escape(r#"<b a="1">Tom & 'Jerry'</b>"#),
            "&lt;b a=&quot;1&quot;&gt;Tom &amp; &#39;Jerry&#39;&lt;/b&gt;"
        );
    }

    #[test]
    fn test_template_slots() {
        let template = Template::parse("<div><!-- slot:a --></div><p><!--slot:b--></p>");
        assert_eq!(template.slots().collect::<Vec<_>>(), vec!["a", "b"]);

        let mut contents = BTreeMap::new();
        contents.insert("a".to_string(), "A".to_string());
        assert_eq!(template.fill(&contents), "<div>A</div><p></p>");
    }

    #[test]
    fn test_unterminated_marker_is_text() {
        let template = Template::parse("x<!-- slot:a");
        assert_eq!(template.slots().count(), 0);
        assert_eq!(template.fill(&BTreeMap::new()), "x<!-- slot:a");
    }

    #[test]
    fn test_fill_without_template_is_noop() {
        let mut root = RenderRoot::new();
        assert!(!root.fill("a", "A".to_string()));
        assert_eq!(root.html(), "");

        root.set_template(Template::parse("<div><!-- slot:a --></div>"));
        assert!(!root.fill("missing", "X".to_string()));
        assert!(root.fill("a", "A".to_string()));
        assert_eq!(root.html(), "<div>A</div>");
    }

    #[test]
    fn test_fallback_until_template() {
        let mut root = RenderRoot::new();
        root.set_fallback(error_panel("Failed", "boom"));
        assert!(root.html().contains("data-action=\"retry\""));

        root.set_template(Template::bare("a"));
        assert_eq!(root.html(), "");
    }
}
