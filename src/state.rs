//! UI-agnostic conversation state types
//!
//! The transcript is a list of entries. An entry is either a finished message
//! or the "Thinking" placeholder owned by one in-flight question.

pub const WELCOME_TEXT: &str = "Hello! I'm your legal assistant. How can I help you today?";
pub const ERROR_TEXT: &str = "Sorry, I encountered an error. Please try again.";

/// Who a transcript message belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    User,
    Bot,
    Error,
}

/// A rendered chat message. Never mutated after it is appended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    pub role: Role,
    pub paragraphs: Vec<String>,
}

impl Message {
    pub fn user(question: &str) -> Self {
        Self {
            role: Role::User,
            paragraphs: vec![question.to_string()],
        }
    }

    pub fn bot(paragraphs: Vec<String>) -> Self {
        Self {
            role: Role::Bot,
            paragraphs,
        }
    }

    pub fn welcome() -> Self {
        Self::bot(vec![WELCOME_TEXT.to_string()])
    }

    pub fn error() -> Self {
        Self {
            role: Role::Error,
            paragraphs: vec![ERROR_TEXT.to_string()],
        }
    }

    pub fn text(&self) -> String {
        self.paragraphs.join("\n\n")
    }
}

/// Identifies one submitted question for the lifetime of its request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RequestId(pub u64);

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Entry {
    Message(Message),
    /// Typing indicator for the request with this id
    Placeholder(RequestId),
}

/// Landing shows the quick prompts; Conversation shows the transcript.
/// Moves to Conversation once and never back.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ViewState {
    #[default]
    Landing,
    Conversation,
}

/// A question that has been accepted and still needs to be sent
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Submission {
    pub id: RequestId,
    pub question: String,
}

/// Split an answer into paragraphs on blank-line boundaries.
///
/// Blank pieces are dropped. If nothing is left the whole answer becomes one
/// paragraph, so a reply always renders as something.
pub fn format_response(text: &str) -> Vec<String> {
    let paragraphs: Vec<String> = text
        .split("\n\n")
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .map(str::to_string)
        .collect();

    if paragraphs.is_empty() {
        vec![text.to_string()]
    } else {
        paragraphs
    }
}
