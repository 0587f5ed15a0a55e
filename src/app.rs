use ratatui::layout::Rect;
use ratatui::widgets::ListState;
use tracing::{debug, error, info};

use crate::client::AskError;
use crate::page::{PageBindings, PromptCard};
use crate::state::{format_response, Entry, Message, RequestId, Submission, ViewState};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FocusPane {
    Input,
    Prompts, // Quick prompt cards (landing view only)
}

/// Convert a character index to a byte index for UTF-8 safe string operations
fn char_to_byte_index(s: &str, char_idx: usize) -> usize {
    s.char_indices()
        .nth(char_idx)
        .map(|(i, _)| i)
        .unwrap_or(s.len())
}

/// The chat widget: input field, transcript and the landing/conversation
/// toggle. Knows nothing about terminals or HTTP; submissions come back out
/// as [`Submission`] values and their outcomes go in through [`ChatWidget::complete`].
pub struct ChatWidget {
    pub should_quit: bool,
    pub view: ViewState,
    pub focus: FocusPane,

    // Input state
    pub input: String,
    pub cursor: usize, // cursor position in input, in chars
    pub max_length: usize,

    // Transcript
    pub entries: Vec<Entry>,
    pub scroll: u16,
    pub chat_height: u16, // Inner height of the transcript, set during render
    pub chat_width: u16,  // Inner width of the transcript, set during render
    next_request_id: u64,

    // Landing view
    pub prompt_cards: Vec<PromptCard>,
    pub prompt_state: ListState,
    pub has_refresh_prompts: bool,

    // Animation state
    pub animation_frame: u8, // 0-2 for ellipsis animation

    // Areas for mouse hit-testing (updated during render)
    pub chat_area: Option<Rect>,
    pub card_areas: Vec<(usize, Rect)>,

    pub endpoint: String,
}

impl ChatWidget {
    pub fn new(bindings: &PageBindings, max_length: usize, endpoint: &str) -> Self {
        let mut prompt_state = ListState::default();
        if !bindings.prompt_cards.is_empty() {
            prompt_state.select(Some(0));
        }

        Self {
            should_quit: false,
            view: ViewState::Landing,
            focus: FocusPane::Input,

            input: String::new(),
            cursor: 0,
            max_length,

            entries: Vec::new(),
            scroll: 0,
            chat_height: 0,
            chat_width: 0,
            next_request_id: 0,

            prompt_cards: bindings.prompt_cards.clone(),
            prompt_state,
            has_refresh_prompts: bindings.has_refresh_prompts,

            animation_frame: 0,

            chat_area: None,
            card_areas: Vec::new(),

            endpoint: endpoint.to_string(),
        }
    }

    // Input editing

    pub fn input_len(&self) -> usize {
        self.input.chars().count()
    }

    /// Character counter shown next to the input, e.g. `12/500`
    pub fn counter_text(&self) -> String {
        format!("{}/{}", self.input_len(), self.max_length)
    }

    /// Insert at the cursor. Refused once the input is at `max_length`.
    pub fn insert_char(&mut self, c: char) {
        if self.input_len() >= self.max_length {
            return;
        }
        let byte_pos = char_to_byte_index(&self.input, self.cursor);
        self.input.insert(byte_pos, c);
        self.cursor += 1;
    }

    pub fn backspace(&mut self) {
        if self.cursor > 0 {
            self.cursor -= 1;
            let byte_pos = char_to_byte_index(&self.input, self.cursor);
            self.input.remove(byte_pos);
        }
    }

    pub fn delete(&mut self) {
        if self.cursor < self.input_len() {
            let byte_pos = char_to_byte_index(&self.input, self.cursor);
            self.input.remove(byte_pos);
        }
    }

    pub fn cursor_left(&mut self) {
        self.cursor = self.cursor.saturating_sub(1);
    }

    pub fn cursor_right(&mut self) {
        self.cursor = (self.cursor + 1).min(self.input_len());
    }

    pub fn cursor_home(&mut self) {
        self.cursor = 0;
    }

    pub fn cursor_end(&mut self) {
        self.cursor = self.input_len();
    }

    /// Replace the whole input, as a prompt card does
    pub fn set_input(&mut self, text: &str) {
        self.input = text.to_string();
        self.cursor = self.input_len();
    }

    fn clear_input(&mut self) {
        self.input.clear();
        self.cursor = 0;
    }

    // Submission flow

    /// Accept the current input as a question.
    ///
    /// Returns `None` without touching anything when the input is blank.
    /// Otherwise the input is cleared right away, the question and a typing
    /// placeholder are appended, and the returned submission still has to be
    /// sent by the caller.
    pub fn submit(&mut self) -> Option<Submission> {
        let question = self.input.trim().to_string();
        if question.is_empty() {
            return None;
        }

        self.ensure_conversation_view();
        self.clear_input();

        let id = RequestId(self.next_request_id);
        self.next_request_id += 1;

        self.entries.push(Entry::Message(Message::user(&question)));
        self.entries.push(Entry::Placeholder(id));
        self.scroll_to_bottom();

        debug!(request = id.0, chars = question.chars().count(), "question submitted");
        Some(Submission { id, question })
    }

    /// Render the outcome of a submission. Replies land in completion order.
    pub fn complete(&mut self, id: RequestId, result: Result<String, AskError>) {
        self.entries
            .retain(|entry| *entry != Entry::Placeholder(id));

        let message = match result {
            Ok(answer) => Message::bot(format_response(&answer)),
            Err(e) => {
                error!(request = id.0, error = %e, "question failed");
                Message::error()
            }
        };

        self.entries.push(Entry::Message(message));
        self.scroll_to_bottom();
    }

    /// Switch from the landing prompts to the transcript. Only the first
    /// call does anything; it also posts the welcome message.
    pub fn ensure_conversation_view(&mut self) {
        if self.view == ViewState::Conversation {
            return;
        }
        self.view = ViewState::Conversation;
        self.focus = FocusPane::Input;
        self.card_areas.clear();
        self.entries.push(Entry::Message(Message::welcome()));
    }

    /// Fill the input from a quick prompt and submit it like typed text
    pub fn click_prompt(&mut self, index: usize) -> Option<Submission> {
        let question = self
            .prompt_cards
            .get(index)
            .and_then(|card| card.question.clone())
            .filter(|q| !q.is_empty())?;

        self.set_input(&question);
        self.submit()
    }

    pub fn click_selected_prompt(&mut self) -> Option<Submission> {
        let index = self.prompt_state.selected()?;
        self.click_prompt(index)
    }

    /// Hook for fetching a fresh set of prompts. Nothing to fetch them from
    /// yet, so it only records the request.
    pub fn refresh_prompts(&mut self) {
        if self.has_refresh_prompts {
            info!("refresh prompts requested");
        }
    }

    pub fn is_waiting(&self) -> bool {
        self.entries
            .iter()
            .any(|entry| matches!(entry, Entry::Placeholder(_)))
    }

    #[cfg(test)]
    pub fn messages(&self) -> impl Iterator<Item = &Message> {
        self.entries.iter().filter_map(|entry| match entry {
            Entry::Message(message) => Some(message),
            Entry::Placeholder(_) => None,
        })
    }

    // Focus and prompt navigation

    pub fn toggle_focus(&mut self) {
        self.focus = match self.focus {
            FocusPane::Input
                if self.view == ViewState::Landing && !self.prompt_cards.is_empty() =>
            {
                FocusPane::Prompts
            }
            _ => FocusPane::Input,
        };
    }

    pub fn prompt_nav_down(&mut self) {
        let len = self.prompt_cards.len();
        if len > 0 {
            let i = self.prompt_state.selected().unwrap_or(0);
            self.prompt_state.select(Some((i + 1).min(len - 1)));
        }
    }

    pub fn prompt_nav_up(&mut self) {
        let i = self.prompt_state.selected().unwrap_or(0);
        self.prompt_state.select(Some(i.saturating_sub(1)));
    }

    // Transcript scrolling

    /// Tick animation frame (called by Tick event)
    pub fn tick_animation(&mut self) {
        if self.is_waiting() {
            self.animation_frame = (self.animation_frame + 1) % 3;
        }
    }

    /// Number of wrapped lines the transcript renders to at `wrap_width`
    pub fn transcript_lines(&self, wrap_width: usize) -> usize {
        let wrap_width = wrap_width.max(1);
        let mut total_lines: usize = 0;

        for entry in &self.entries {
            total_lines += 1; // Role line ("You:", "Assistant:", ...)
            match entry {
                Entry::Message(message) => {
                    for (i, paragraph) in message.paragraphs.iter().enumerate() {
                        if i > 0 {
                            total_lines += 1; // Blank line between paragraphs
                        }
                        for line in paragraph.split('\n') {
                            // Use character count, not byte length, for proper UTF-8 handling
                            let char_count = line.chars().count();
                            total_lines += char_count.max(1).div_ceil(wrap_width);
                        }
                    }
                }
                Entry::Placeholder(_) => total_lines += 1, // "Thinking..."
            }
            total_lines += 1; // Blank line after each bubble
        }

        total_lines
    }

    fn max_scroll(&self) -> u16 {
        // Fall back to a sane viewport before the first render
        let wrap_width = if self.chat_width > 0 { self.chat_width as usize } else { 50 };
        let visible_height = if self.chat_height > 0 { self.chat_height } else { 20 };

        // Paragraph scroll offsets are u16; anything past that stays pinned
        let max = self
            .transcript_lines(wrap_width)
            .saturating_sub(visible_height as usize);
        u16::try_from(max).unwrap_or(u16::MAX)
    }

    /// Scroll the transcript so the newest bubble is visible
    pub fn scroll_to_bottom(&mut self) {
        self.scroll = self.max_scroll();
    }

    pub fn scroll_up(&mut self, lines: u16) {
        self.scroll = self.scroll.saturating_sub(lines);
    }

    pub fn scroll_down(&mut self, lines: u16) {
        self.scroll = self.scroll.saturating_add(lines).min(self.max_scroll());
    }
}
