use ratatui::{
    Frame,
    layout::{Constraint, Layout, Rect},
    style::{Color, Modifier, Style, Stylize},
    text::{Line, Span, Text},
    widgets::{Block, Borders, List, ListItem, Paragraph, Wrap},
};
use crate::app::{ChatWidget, FocusPane};
use crate::state::{Entry, Role, ViewState};

/// Most input rows shown before the input box starts scrolling
const MAX_INPUT_ROWS: u16 = 5;

pub fn render(app: &mut ChatWidget, frame: &mut Frame) {
    let area = frame.area();

    let input_rows = (app.input.split('\n').count() as u16).clamp(1, MAX_INPUT_ROWS);

    // Main layout: header, body, input, footer
    let [header_area, body_area, input_area, footer_area] = Layout::vertical([
        Constraint::Length(1),
        Constraint::Min(0),
        Constraint::Length(input_rows + 2),
        Constraint::Length(1),
    ])
    .areas(area);

    render_header(app, frame, header_area);

    match app.view {
        ViewState::Landing => render_landing(app, frame, body_area),
        ViewState::Conversation => render_conversation(app, frame, body_area),
    }

    render_input(app, frame, input_area);
    render_footer(app, frame, footer_area);
}

fn render_header(app: &ChatWidget, frame: &mut Frame, area: Rect) {
    let title = Line::from(vec![
        Span::styled(" Legal Assistant ", Style::default().fg(Color::Cyan).bold()),
        Span::styled(app.endpoint.clone(), Style::default().fg(Color::Gray)),
        Span::raw(" "),
        Span::styled(
            format!("v{}", env!("CARGO_PKG_VERSION")),
            Style::default().fg(Color::Gray),
        ),
    ]);

    let header = Paragraph::new(title).style(Style::default().bg(Color::DarkGray));
    frame.render_widget(header, area);
}

fn render_landing(app: &mut ChatWidget, frame: &mut Frame, area: Rect) {
    app.chat_area = None;

    let [intro_area, cards_area] = Layout::vertical([
        Constraint::Length(3),
        Constraint::Min(0),
    ])
    .areas(area);

    let intro = Paragraph::new(vec![
        Line::default(),
        Line::from(Span::styled(
            " How can I help you today?",
            Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD),
        )),
        Line::from(Span::styled(
            " Type a legal question below, or pick a quick prompt to get started.",
            Style::default().fg(Color::DarkGray),
        )),
    ]);
    frame.render_widget(intro, intro_area);

    app.card_areas.clear();
    if app.prompt_cards.is_empty() {
        return;
    }

    let focused = app.focus == FocusPane::Prompts;
    let border_color = if focused { Color::Cyan } else { Color::DarkGray };

    let title = if app.has_refresh_prompts {
        " Quick prompts (Tab to focus, Ctrl+R refresh) "
    } else {
        " Quick prompts (Tab to focus) "
    };

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(border_color))
        .title(title);

    let items: Vec<ListItem> = app
        .prompt_cards
        .iter()
        .map(|card| match &card.question {
            Some(question) if !question.is_empty() => ListItem::new(format!(" {} ", question)),
            _ => ListItem::new(Span::styled(
                " (no question) ",
                Style::default().fg(Color::DarkGray),
            )),
        })
        .collect();

    let mut list = List::new(items).block(block);
    if focused {
        list = list
            .highlight_style(
                Style::default()
                    .bg(Color::Cyan)
                    .fg(Color::Black)
                    .add_modifier(Modifier::BOLD),
            )
            .highlight_symbol("> ");
    }

    frame.render_stateful_widget(list, cards_area, &mut app.prompt_state);

    // One row per visible card, inside the borders
    let inner = Rect::new(
        cards_area.x + 1,
        cards_area.y + 1,
        cards_area.width.saturating_sub(2),
        cards_area.height.saturating_sub(2),
    );
    let offset = app.prompt_state.offset();
    for row in 0..inner.height {
        let index = offset + row as usize;
        if index >= app.prompt_cards.len() {
            break;
        }
        app.card_areas
            .push((index, Rect::new(inner.x, inner.y + row, inner.width, 1)));
    }
}

fn role_line(role: Role) -> Line<'static> {
    let (label, color) = match role {
        Role::User => ("You:", Color::Cyan),
        Role::Bot => ("Assistant:", Color::Yellow),
        Role::Error => ("Error:", Color::Red),
    };
    Line::from(Span::styled(
        label,
        Style::default().fg(color).add_modifier(Modifier::BOLD),
    ))
}

/// Transcript lines, laid out the same way `ChatWidget::transcript_lines` counts them
pub fn transcript_text(app: &ChatWidget) -> Text<'static> {
    let mut lines: Vec<Line> = Vec::new();

    for entry in &app.entries {
        match entry {
            Entry::Message(message) => {
                lines.push(role_line(message.role));
                let style = match message.role {
                    Role::Error => Style::default().fg(Color::Red),
                    _ => Style::default(),
                };
                for (i, paragraph) in message.paragraphs.iter().enumerate() {
                    if i > 0 {
                        lines.push(Line::default());
                    }
                    for line in paragraph.split('\n') {
                        lines.push(Line::from(Span::styled(line.to_string(), style)));
                    }
                }
            }
            Entry::Placeholder(_) => {
                lines.push(role_line(Role::Bot));
                // Animated ellipsis: cycles through ".", "..", "..."
                let dots = ".".repeat((app.animation_frame as usize) + 1);
                lines.push(Line::from(Span::styled(
                    format!("Thinking{}", dots),
                    Style::default().fg(Color::DarkGray).add_modifier(Modifier::ITALIC),
                )));
            }
        }
        lines.push(Line::default());
    }

    Text::from(lines)
}

fn render_conversation(app: &mut ChatWidget, frame: &mut Frame, area: Rect) {
    app.card_areas.clear();
    app.chat_area = Some(area);

    // Store chat area dimensions for scroll calculations (inner size minus borders)
    app.chat_height = area.height.saturating_sub(2);
    app.chat_width = area.width.saturating_sub(2);

    let waiting = if app.is_waiting() { " (waiting for reply) " } else { "" };
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::DarkGray))
        .title(format!(" Conversation{} ", waiting));

    let chat = Paragraph::new(transcript_text(app))
        .block(block)
        .wrap(Wrap { trim: false })
        .scroll((app.scroll, 0));

    frame.render_widget(chat, area);
}

fn render_input(app: &ChatWidget, frame: &mut Frame, area: Rect) {
    let focused = app.focus == FocusPane::Input;
    let border_color = if focused { Color::Yellow } else { Color::DarkGray };

    let input_block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(border_color))
        .title(" Ask a legal question ")
        .title_bottom(Line::from(format!(" {} ", app.counter_text())).right_aligned());

    let inner_width = area.width.saturating_sub(2) as usize;
    let inner_height = area.height.saturating_sub(2) as usize;

    // Cursor row/column inside the (possibly multi-line) input
    let before_cursor: String = app.input.chars().take(app.cursor).collect();
    let cursor_row = before_cursor.matches('\n').count();
    let cursor_col = before_cursor
        .rsplit('\n')
        .next()
        .map(|s| s.chars().count())
        .unwrap_or(0);

    // Scroll offsets to keep the cursor visible
    let col_offset = if inner_width > 0 && cursor_col >= inner_width {
        cursor_col - inner_width + 1
    } else {
        0
    };
    let row_offset = if inner_height > 0 && cursor_row >= inner_height {
        cursor_row - inner_height + 1
    } else {
        0
    };

    let visible: Vec<Line> = app
        .input
        .split('\n')
        .skip(row_offset)
        .take(inner_height)
        .map(|line| Line::from(line.chars().skip(col_offset).take(inner_width).collect::<String>()))
        .collect();

    // Use cyan text to match the "You:" style - visible in both light and dark terminals
    let input = Paragraph::new(visible)
        .style(Style::default().fg(Color::Cyan))
        .block(input_block);

    frame.render_widget(input, area);

    if focused {
        let cursor_x = (cursor_col - col_offset) as u16;
        let cursor_y = (cursor_row - row_offset) as u16;
        frame.set_cursor_position((area.x + cursor_x + 1, area.y + cursor_y + 1));
    }
}

fn render_footer(app: &ChatWidget, frame: &mut Frame, area: Rect) {
    let mode_text = match app.view {
        ViewState::Landing => " START ",
        ViewState::Conversation => " CHAT ",
    };
    let mode_style = Style::default().bg(Color::Blue).fg(Color::White);

    // Key style: dark background with bright text for visibility on both light/dark terminals
    let key_style = Style::default().bg(Color::DarkGray).fg(Color::White);
    let label_style = Style::default().bg(Color::Black).fg(Color::White);

    let mut hints = match app.focus {
        FocusPane::Input => vec![
            Span::styled(" Enter ", key_style),
            Span::styled(" send ", label_style),
            Span::styled(" Shift+Enter ", key_style),
            Span::styled(" newline ", label_style),
        ],
        FocusPane::Prompts => vec![
            Span::styled(" j/k ", key_style),
            Span::styled(" nav ", label_style),
            Span::styled(" Enter ", key_style),
            Span::styled(" ask ", label_style),
        ],
    };

    match app.view {
        ViewState::Landing if !app.prompt_cards.is_empty() => {
            hints.extend(vec![
                Span::styled(" Tab ", key_style),
                Span::styled(" focus ", label_style),
            ]);
        }
        ViewState::Conversation => {
            hints.extend(vec![
                Span::styled(" PgUp/PgDn ", key_style),
                Span::styled(" scroll ", label_style),
            ]);
        }
        _ => {}
    }

    hints.extend(vec![
        Span::styled(" Esc ", key_style),
        Span::styled(" quit ", label_style),
    ]);

    let footer_content = Line::from(
        vec![
            Span::styled(mode_text, mode_style),
            Span::styled(" ", label_style),
        ]
        .into_iter()
        .chain(hints)
        .collect::<Vec<_>>(),
    );

    let footer = Paragraph::new(footer_content).style(Style::default().bg(Color::Black));
    frame.render_widget(footer, area);
}
