//! Bindings read from the server's landing page.
//!
//! The chat widget needs a handful of hooks from the page markup: the form,
//! message list and question field must exist, and the CSRF token, quick
//! prompts and input length limit are picked up when present.

use scraper::{Html, Selector};
use std::sync::LazyLock;
use thiserror::Error;

/// Ids the widget cannot run without
pub const REQUIRED_IDS: [&str; 3] = ["chat-form", "chat-messages", "question"];

#[derive(Debug, Error, PartialEq, Eq)]
pub enum BindError {
    #[error("required element #{0} not found on the page")]
    MissingElement(&'static str),
}

/// A clickable quick prompt. Cards without a `data-question` are kept so the
/// list matches the page, but clicking them does nothing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PromptCard {
    pub question: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct PageBindings {
    /// `maxlength` of the question field, if the page sets one
    pub max_length: Option<usize>,
    pub csrf_token: Option<String>,
    pub prompt_cards: Vec<PromptCard>,
    pub has_refresh_prompts: bool,
}

static FORM: LazyLock<Selector> = LazyLock::new(|| selector("#chat-form"));
static MESSAGES: LazyLock<Selector> = LazyLock::new(|| selector("#chat-messages"));
static QUESTION: LazyLock<Selector> = LazyLock::new(|| selector("#question"));
static CSRF: LazyLock<Selector> = LazyLock::new(|| selector("[name=csrfmiddlewaretoken]"));
static PROMPT_CARD: LazyLock<Selector> = LazyLock::new(|| selector(".prompt-card"));
static REFRESH: LazyLock<Selector> = LazyLock::new(|| selector("#refresh-prompts"));

fn selector(css: &'static str) -> Selector {
    Selector::parse(css).expect("selector is valid")
}

impl PageBindings {
    pub fn from_html(html: &str) -> Result<Self, BindError> {
        let document = Html::parse_document(html);

        let hooks: [&Selector; 3] = [&*FORM, &*MESSAGES, &*QUESTION];
        for (id, sel) in REQUIRED_IDS.into_iter().zip(hooks) {
            if document.select(sel).next().is_none() {
                return Err(BindError::MissingElement(id));
            }
        }

        let max_length = document
            .select(&QUESTION)
            .next()
            .and_then(|el| el.value().attr("maxlength"))
            .and_then(|v| v.trim().parse::<usize>().ok())
            .filter(|&n| n > 0);

        let csrf_token = document
            .select(&CSRF)
            .next()
            .and_then(|el| el.value().attr("value"))
            .filter(|v| !v.is_empty())
            .map(str::to_string);

        let prompt_cards = document
            .select(&PROMPT_CARD)
            .map(|el| PromptCard {
                question: el.value().attr("data-question").map(str::to_string),
            })
            .collect();

        Ok(Self {
            max_length,
            csrf_token,
            prompt_cards,
            has_refresh_prompts: document.select(&REFRESH).next().is_some(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PAGE: &str = r#"
<div id="chat-container" class="container">
  <div id="landing-view">
    <button id="refresh-prompts" type="button">Refresh</button>
    <div class="card prompt-card h-100" data-question="What is a lease?">Leases</div>
    <div class='prompt-card' data-question='Can my landlord evict me &amp; keep my deposit?'>Eviction</div>
    <div class="prompt-card">No question</div>
  </div>
  <div id="conversation-view" class="d-none">
    <div id="chat-messages"></div>
  </div>
  <form id="chat-form" method="post">
    <input type="hidden" name="csrfmiddlewaretoken" value="abc123XYZ">
    <textarea id="question" name="question" maxlength="500" placeholder="Ask > anything"></textarea>
    <span class="char-counter">0/500</span>
  </form>
</div>
"#;

    #[test]
    fn test_binds_full_page() {
        let bindings = PageBindings::from_html(PAGE).unwrap();

        assert_eq!(bindings.max_length, Some(500));
        assert_eq!(bindings.csrf_token.as_deref(), Some("abc123XYZ"));
        assert!(bindings.has_refresh_prompts);
        assert_eq!(
            bindings.prompt_cards,
            vec![
                PromptCard { question: Some("What is a lease?".to_string()) },
                PromptCard {
                    question: Some("Can my landlord evict me & keep my deposit?".to_string())
                },
                PromptCard { question: None },
            ]
        );
    }

    #[test]
    fn test_missing_required_element_is_fatal() {
        let page = PAGE.replace("id=\"chat-messages\"", "id=\"messages\"");
        assert_eq!(
            PageBindings::from_html(&page),
            Err(BindError::MissingElement("chat-messages"))
        );

        assert_eq!(
            PageBindings::from_html("<html><body></body></html>"),
            Err(BindError::MissingElement("chat-form"))
        );
    }

    #[test]
    fn test_optional_hooks_may_be_absent() {
        let page = r#"<form id="chat-form"><div id="chat-messages"></div><input id=question></form>"#;
        let bindings = PageBindings::from_html(page).unwrap();

        assert_eq!(bindings.max_length, None);
        assert_eq!(bindings.csrf_token, None);
        assert!(bindings.prompt_cards.is_empty());
        assert!(!bindings.has_refresh_prompts);
    }

    #[test]
    fn test_class_match_is_whole_word() {
        let page = r#"<form id="chat-form"></form><div id="chat-messages"></div>
            <input id="question"><div class="prompt-cards" data-question="nope"></div>"#;
        let bindings = PageBindings::from_html(page).unwrap();
        assert!(bindings.prompt_cards.is_empty());
    }

    #[test]
    fn test_commented_out_hook_does_not_count() {
        let page = r#"<!-- <div id="chat-messages"></div> -->
            <form id="chat-form"></form><textarea id="question"></textarea>"#;
        assert_eq!(
            PageBindings::from_html(page),
            Err(BindError::MissingElement("chat-messages"))
        );
    }

    #[test]
    fn test_hook_inside_script_does_not_count() {
        let page = r#"<form id="chat-form"><textarea id="question"></textarea></form>
            <script>const tpl = '<div id="chat-messages"></div>';</script>"#;
        assert_eq!(
            PageBindings::from_html(page),
            Err(BindError::MissingElement("chat-messages"))
        );
    }

    #[test]
    fn test_prompt_text_entities_are_decoded() {
        let page = r#"<form id="chat-form"></form><div id="chat-messages"></div><input id="question">
            <div class="prompt-card" data-question="Caf&eacute; licence &#8212; &quot;late&quot; hours?"></div>"#;
        let bindings = PageBindings::from_html(page).unwrap();
        assert_eq!(
            bindings.prompt_cards[0].question.as_deref(),
            Some("Caf\u{e9} licence \u{2014} \"late\" hours?")
        );
    }
}
