use crossterm::event::{KeyCode, KeyEvent, KeyModifiers, MouseButton, MouseEvent, MouseEventKind};
use ratatui::layout::Rect;
use tracing::debug;

use crate::app::{ChatWidget, FocusPane};
use crate::client::AskClient;
use crate::state::{Submission, ViewState};
use crate::tui::{AppEvent, EventSender};

const SCROLL_STEP: u16 = 3;

pub fn handle_event(app: &mut ChatWidget, client: &AskClient, tx: &EventSender, event: AppEvent) {
    let submission = match event {
        AppEvent::Key(key) => handle_key(app, key),
        AppEvent::Mouse(mouse) => handle_mouse(app, mouse),
        AppEvent::Resize(_, _) => None,
        AppEvent::Tick => {
            app.tick_animation();
            None
        }
        AppEvent::Answer { id, result } => {
            app.complete(id, result);
            None
        }
    };

    if let Some(submission) = submission {
        dispatch(client, tx, submission);
    }
}

/// Send a question on its own task. Each one reports back independently, so
/// several can be in flight at once.
fn dispatch(client: &AskClient, tx: &EventSender, submission: Submission) {
    let client = client.clone();
    let tx = tx.clone();

    tokio::spawn(async move {
        let Submission { id, question } = submission;
        let result = client.ask(&question).await;
        debug!(request = id.0, ok = result.is_ok(), "question finished");
        // Receiver is gone only when the app is shutting down
        let _ = tx.send(AppEvent::Answer { id, result });
    });
}

pub fn handle_key(app: &mut ChatWidget, key: KeyEvent) -> Option<Submission> {
    // Global keys that work in any focus
    if key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL) {
        app.should_quit = true;
        return None;
    }
    if key.code == KeyCode::Char('r') && key.modifiers.contains(KeyModifiers::CONTROL) {
        app.refresh_prompts();
        return None;
    }

    match key.code {
        KeyCode::Esc => {
            app.should_quit = true;
            return None;
        }
        KeyCode::Tab | KeyCode::BackTab => {
            app.toggle_focus();
            return None;
        }
        KeyCode::PageUp => {
            app.scroll_up(app.chat_height.max(SCROLL_STEP));
            return None;
        }
        KeyCode::PageDown => {
            app.scroll_down(app.chat_height.max(SCROLL_STEP));
            return None;
        }
        _ => {}
    }

    match app.focus {
        FocusPane::Input => handle_input_key(app, key),
        FocusPane::Prompts => handle_prompts_key(app, key),
    }
}

fn handle_input_key(app: &mut ChatWidget, key: KeyEvent) -> Option<Submission> {
    match key.code {
        // Shift+Enter is a newline, plain Enter sends
        KeyCode::Enter if key.modifiers.contains(KeyModifiers::SHIFT) => {
            app.insert_char('\n');
        }
        KeyCode::Enter => return app.submit(),
        KeyCode::Backspace => app.backspace(),
        KeyCode::Delete => app.delete(),
        KeyCode::Left => app.cursor_left(),
        KeyCode::Right => app.cursor_right(),
        KeyCode::Home => app.cursor_home(),
        KeyCode::End => app.cursor_end(),
        KeyCode::Up if app.view == ViewState::Conversation => app.scroll_up(1),
        KeyCode::Down if app.view == ViewState::Conversation => app.scroll_down(1),
        KeyCode::Char(c)
            if !key.modifiers.intersects(KeyModifiers::CONTROL | KeyModifiers::ALT) =>
        {
            app.insert_char(c)
        }
        _ => {}
    }
    None
}

fn handle_prompts_key(app: &mut ChatWidget, key: KeyEvent) -> Option<Submission> {
    match key.code {
        KeyCode::Down | KeyCode::Char('j') => app.prompt_nav_down(),
        KeyCode::Up | KeyCode::Char('k') => app.prompt_nav_up(),
        KeyCode::Enter => return app.click_selected_prompt(),
        _ => {}
    }
    None
}

/// Check if a point is within a rectangle
fn point_in_rect(x: u16, y: u16, rect: Rect) -> bool {
    x >= rect.x && x < rect.x + rect.width && y >= rect.y && y < rect.y + rect.height
}

pub fn handle_mouse(app: &mut ChatWidget, mouse: MouseEvent) -> Option<Submission> {
    let x = mouse.column;
    let y = mouse.row;

    let in_chat = app.chat_area.map(|r| point_in_rect(x, y, r)).unwrap_or(false);

    match mouse.kind {
        MouseEventKind::ScrollDown if in_chat => app.scroll_down(SCROLL_STEP),
        MouseEventKind::ScrollUp if in_chat => app.scroll_up(SCROLL_STEP),
        MouseEventKind::Down(MouseButton::Left) => {
            let clicked = app
                .card_areas
                .iter()
                .find(|(_, rect)| point_in_rect(x, y, *rect))
                .map(|(index, _)| *index);

            if let Some(index) = clicked {
                app.prompt_state.select(Some(index));
                return app.click_prompt(index);
            }
        }
        _ => {}
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::page::{PageBindings, PromptCard};
    use crate::state::{Entry, Message};
    use crossterm::event::KeyEventKind;

    fn widget() -> ChatWidget {
        let bindings = PageBindings {
            max_length: Some(500),
            csrf_token: None,
            prompt_cards: vec![
                PromptCard { question: Some("What is a lease?".to_string()) },
                PromptCard { question: Some("How do I write a will?".to_string()) },
            ],
            has_refresh_prompts: true,
        };
        ChatWidget::new(&bindings, 500, "http://127.0.0.1:8000")
    }

    fn key(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    fn type_text(app: &mut ChatWidget, text: &str) {
        for c in text.chars() {
            assert!(handle_key(app, key(KeyCode::Char(c))).is_none());
        }
    }

    fn click(column: u16, row: u16) -> MouseEvent {
        MouseEvent {
            kind: MouseEventKind::Down(MouseButton::Left),
            column,
            row,
            modifiers: KeyModifiers::NONE,
        }
    }

    #[test]
    fn test_modified_chars_are_not_typed() {
        let mut app = widget();
        handle_key(&mut app, KeyEvent::new(KeyCode::Char('u'), KeyModifiers::CONTROL));
        handle_key(&mut app, KeyEvent::new(KeyCode::Char('b'), KeyModifiers::ALT));
        assert!(app.input.is_empty());

        handle_key(&mut app, KeyEvent::new(KeyCode::Char('A'), KeyModifiers::SHIFT));
        assert_eq!(app.input, "A");
    }

    #[test]
    fn test_enter_submits() {
        let mut app = widget();
        type_text(&mut app, "Is a verbal contract binding?");

        let submission = handle_key(&mut app, key(KeyCode::Enter)).unwrap();
        assert_eq!(submission.question, "Is a verbal contract binding?");
        assert_eq!(app.counter_text(), "0/500");
    }

    #[test]
    fn test_shift_enter_inserts_newline() {
        let mut app = widget();
        type_text(&mut app, "line one");
        let shift_enter = KeyEvent::new_with_kind(KeyCode::Enter, KeyModifiers::SHIFT, KeyEventKind::Press);

        assert!(handle_key(&mut app, shift_enter).is_none());
        type_text(&mut app, "line two");
        assert_eq!(app.input, "line one\nline two");
        assert!(app.entries.is_empty());
    }

    #[test]
    fn test_enter_on_blank_input_sends_nothing() {
        let mut app = widget();
        type_text(&mut app, "   ");
        assert!(handle_key(&mut app, key(KeyCode::Enter)).is_none());
        assert!(app.entries.is_empty());
    }

    #[test]
    fn test_prompt_focus_enter_clicks_card() {
        let mut app = widget();
        handle_key(&mut app, key(KeyCode::Tab));
        assert_eq!(app.focus, FocusPane::Prompts);
        handle_key(&mut app, key(KeyCode::Down));

        let submission = handle_key(&mut app, key(KeyCode::Enter)).unwrap();
        assert_eq!(submission.question, "How do I write a will?");
        assert_eq!(app.focus, FocusPane::Input);
    }

    #[test]
    fn test_mouse_click_on_card() {
        let mut app = widget();
        app.card_areas = vec![
            (0, Rect::new(2, 5, 40, 1)),
            (1, Rect::new(2, 6, 40, 1)),
        ];

        assert!(handle_mouse(&mut app, click(1, 5)).is_none());
        let submission = handle_mouse(&mut app, click(10, 5)).unwrap();
        assert_eq!(submission.question, "What is a lease?");
        assert_eq!(
            app.entries[1],
            Entry::Message(Message::user("What is a lease?"))
        );
    }

    #[test]
    fn test_ctrl_r_and_quit_keys() {
        let mut app = widget();
        let ctrl_r = KeyEvent::new(KeyCode::Char('r'), KeyModifiers::CONTROL);
        assert!(handle_key(&mut app, ctrl_r).is_none());
        assert_eq!(app.input, "");
        assert!(!app.should_quit);

        let ctrl_c = KeyEvent::new(KeyCode::Char('c'), KeyModifiers::CONTROL);
        handle_key(&mut app, ctrl_c);
        assert!(app.should_quit);
    }

    #[tokio::test]
    async fn test_answer_event_completes_request() {
        let mut app = widget();
        let client = AskClient::new("http://127.0.0.1:9").unwrap();
        let (tx, _rx) = tokio::sync::mpsc::unbounded_channel();

        app.set_input("q");
        let submission = app.submit().unwrap();
        handle_event(
            &mut app,
            &client,
            &tx,
            AppEvent::Answer { id: submission.id, result: Ok("Done.".to_string()) },
        );

        assert!(!app.is_waiting());
        assert_eq!(app.messages().last().unwrap().text(), "Done.");
    }

    #[tokio::test]
    async fn test_dispatched_failure_comes_back_as_error() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let mut app = widget();
        let client = AskClient::new(&format!("http://{}", addr)).unwrap();
        let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel();

        type_text(&mut app, "anyone there?");
        handle_event(&mut app, &client, &tx, AppEvent::Key(key(KeyCode::Enter)));
        assert!(app.is_waiting());

        let event = rx.recv().await.unwrap();
        assert!(matches!(event, AppEvent::Answer { result: Err(_), .. }));
        handle_event(&mut app, &client, &tx, event);

        assert!(!app.is_waiting());
        assert_eq!(app.messages().last().unwrap().role, crate::state::Role::Error);
    }
}
