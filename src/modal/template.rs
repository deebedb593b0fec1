use std::sync::Arc;

/// Inputs a template receives when the dialog markup is built
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TemplateContext {
    pub title: Option<String>,
    pub allow_cancel: bool,
    pub ok_text: Option<String>,
    pub cancel_text: Option<String>,
    /// Plain-text body content, when the modal carries any
    pub content_text: Option<String>,
}

/// Template function mapping dialog configuration to markup
pub type Template = Arc<dyn Fn(&TemplateContext) -> Markup + Send + Sync>;

/// Structured dialog markup produced by a template.
///
/// This is the modal's "element": built once per open, owned exclusively by
/// the modal, and destroyed when the hidden signal arrives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Markup {
    pub header: Option<Header>,
    pub body: Body,
    pub footer: Option<Footer>,
}

impl Markup {
    /// Whether the footer carries a confirm button
    pub fn has_ok_button(&self) -> bool {
        self.footer
            .as_ref()
            .map_or(false, |footer| footer.ok.is_some())
    }

    /// Whether the footer carries a dismiss button
    pub fn has_cancel_button(&self) -> bool {
        self.footer
            .as_ref()
            .map_or(false, |footer| footer.cancel.is_some())
    }
}

/// Header region: a title row, optionally with a close icon
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Header {
    pub title: String,
    pub close_icon: bool,
}

/// Body region of the dialog
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum Body {
    /// Nothing to draw beyond the padded region itself
    #[default]
    Empty,
    /// Wrapped plain text
    Text(String),
    /// Region reserved for a nested content view
    ViewSlot,
}

/// Footer region holding up to two action buttons
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Footer {
    pub ok: Option<String>,
    pub cancel: Option<String>,
}

/// Default dialog template.
///
/// A header is present only when a title is set, and its close icon only when
/// cancelling is allowed. The body is always present. The footer is omitted
/// entirely when both button labels are unset; otherwise it carries whichever
/// buttons have labels.
pub fn default_template(ctx: &TemplateContext) -> Markup {
    let header = ctx.title.as_ref().map(|title| Header {
        title: title.clone(),
        close_icon: ctx.allow_cancel,
    });

    let body = match &ctx.content_text {
        Some(text) => Body::Text(text.clone()),
        None => Body::Empty,
    };

    let footer = if ctx.ok_text.is_none() && ctx.cancel_text.is_none() {
        None
    } else {
        Some(Footer {
            ok: ctx.ok_text.clone(),
            cancel: ctx.cancel_text.clone(),
        })
    };

    Markup {
        header,
        body,
        footer,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ctx() -> TemplateContext {
        TemplateContext {
            title: Some("Delete file".to_string()),
            allow_cancel: true,
            ok_text: Some("Delete".to_string()),
            cancel_text: Some("Keep".to_string()),
            content_text: Some("This cannot be undone.".to_string()),
        }
    }

    #[test]
    fn test_default_template_builds_all_regions() {
        let markup = default_template(&ctx());

        let header = markup.header.expect("header should be present");
        assert_eq!(header.title, "Delete file");
        assert!(header.close_icon);
        assert_eq!(markup.body, Body::Text("This cannot be undone.".to_string()));

        let footer = markup.footer.expect("footer should be present");
        assert_eq!(footer.ok.as_deref(), Some("Delete"));
        assert_eq!(footer.cancel.as_deref(), Some("Keep"));
    }

    #[test]
    fn test_header_omitted_without_title() {
        let markup = default_template(&TemplateContext {
            title: None,
            ..ctx()
        });
        assert!(markup.header.is_none());
    }

    #[test]
    fn test_close_icon_follows_allow_cancel() {
        let markup = default_template(&TemplateContext {
            allow_cancel: false,
            ..ctx()
        });
        assert!(!markup.header.expect("header should be present").close_icon);
    }

    #[test]
    fn test_footer_omitted_when_both_labels_unset() {
        let markup = default_template(&TemplateContext {
            ok_text: None,
            cancel_text: None,
            ..ctx()
        });
        assert!(markup.footer.is_none());
    }

    #[test]
    fn test_footer_keeps_single_button() {
        let markup = default_template(&TemplateContext {
            cancel_text: None,
            ..ctx()
        });
        let footer = markup.footer.as_ref().expect("footer should be present");
        assert_eq!(footer.ok.as_deref(), Some("Delete"));
        assert!(footer.cancel.is_none());
        assert!(markup.has_ok_button());
        assert!(!markup.has_cancel_button());
    }

    #[test]
    fn test_empty_body_without_content_text() {
        let markup = default_template(&TemplateContext {
            content_text: None,
            ..ctx()
        });
        assert_eq!(markup.body, Body::Empty);
    }
}
