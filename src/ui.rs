use anyhow::Result;
use crossterm::{
    event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use log::debug;
use ratatui::{
    prelude::*,
    widgets::{Block, Borders, Clear, List, ListItem, ListState, Paragraph, Wrap},
    Frame,
};
use std::{io, time::Duration};
use textwrap::wrap;
use tui_input::{backend::crossterm::EventHandler, Input};

use besedka::{
    ChatApp, ContactAccess, ConversationSummary, Dialog, Intent, Message, Route, UserSession,
};

// Export types needed by main module
pub use ratatui::backend::CrosstermBackend;
pub use ratatui::Terminal;

/// What the main loop should do after a key press
#[derive(Debug, PartialEq, Eq)]
pub enum UiEvent {
    Quit,
    Intent(Intent),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Focus {
    Search,
    Chats,
    Composer,
}

impl Focus {
    fn next(self) -> Self {
        match self {
            Focus::Composer => Focus::Search,
            Focus::Search => Focus::Chats,
            Focus::Chats => Focus::Composer,
        }
    }

    fn previous(self) -> Self {
        match self {
            Focus::Composer => Focus::Chats,
            Focus::Chats => Focus::Search,
            Focus::Search => Focus::Composer,
        }
    }
}

/// Terminal front-end. Holds only editing buffers and cursor positions;
/// everything it shows comes from `ChatApp`.
pub struct ChatUI {
    bot_username: String,
    login_input: Input,
    search_input: Input,
    message_input: Input,
    contact_search_input: Input,
    focus: Focus,
    contact_index: usize,
    status: Option<String>,
}

fn ctrl(key: &KeyEvent) -> bool {
    key.modifiers.contains(KeyModifiers::CONTROL)
}

/// Feed `key` to `input` and report whether its text changed
fn edit(input: &mut Input, key: KeyEvent) -> bool {
    let before = input.value().to_string();
    input.handle_event(&Event::Key(key));
    input.value() != before
}

impl ChatUI {
    pub fn new(bot_username: &str) -> Self {
        ChatUI {
            bot_username: bot_username.to_string(),
            login_input: Input::default(),
            search_input: Input::default(),
            message_input: Input::default(),
            contact_search_input: Input::default(),
            focus: Focus::Composer,
            contact_index: 0,
            status: None,
        }
    }

    /// Drop all typed text, e.g. after logout
    pub fn reset(&mut self) {
        self.login_input.reset();
        self.search_input.reset();
        self.message_input.reset();
        self.contact_search_input.reset();
        self.focus = Focus::Composer;
        self.contact_index = 0;
        self.status = None;
    }

    pub fn show_status(&mut self, status: &str) {
        self.status = Some(status.to_string());
    }

    pub fn clear_status(&mut self) {
        self.status = None;
    }

    pub fn handle_input(&mut self, app: &ChatApp) -> Result<Option<UiEvent>> {
        if event::poll(Duration::from_millis(50))? {
            if let Event::Key(key) = event::read()? {
                if key.kind == KeyEventKind::Press {
                    return Ok(self.handle_key(key, app));
                }
            }
        }
        Ok(None)
    }

    pub fn handle_key(&mut self, key: KeyEvent, app: &ChatApp) -> Option<UiEvent> {
        if key.code == KeyCode::Char('c') && ctrl(&key) {
            return Some(UiEvent::Quit);
        }

        match app.route() {
            Route::Login => self.handle_login_key(key, app),
            Route::Chat => match app.dialog() {
                Some(Dialog::Profile) => self.handle_profile_key(key),
                Some(Dialog::NewChat) => self.handle_new_chat_key(key, app),
                Some(Dialog::VideoCall) => self.handle_video_call_key(key),
                None => self.handle_chat_key(key, app),
            },
        }
    }

    fn handle_login_key(&mut self, key: KeyEvent, app: &ChatApp) -> Option<UiEvent> {
        // Nothing to edit while the redirect is pending
        if app.is_logging_in() {
            return (key.code == KeyCode::Esc).then_some(UiEvent::Quit);
        }

        match key.code {
            KeyCode::Esc => Some(UiEvent::Quit),
            KeyCode::Char('d') if ctrl(&key) => Some(UiEvent::Intent(Intent::DemoLogin)),
            KeyCode::Enter => {
                let payload = self.login_input.value().trim().to_string();
                if payload.is_empty() {
                    None
                } else {
                    Some(UiEvent::Intent(Intent::SubmitLogin(payload)))
                }
            }
            _ => {
                edit(&mut self.login_input, key);
                None
            }
        }
    }

    fn handle_chat_key(&mut self, key: KeyEvent, app: &ChatApp) -> Option<UiEvent> {
        match key.code {
            KeyCode::Esc => return Some(UiEvent::Quit),
            KeyCode::Char('n') if ctrl(&key) => {
                self.contact_search_input.reset();
                self.contact_index = 0;
                return Some(UiEvent::Intent(Intent::OpenDialog(Dialog::NewChat)));
            }
            KeyCode::Char('p') if ctrl(&key) => {
                return Some(UiEvent::Intent(Intent::OpenDialog(Dialog::Profile)));
            }
            KeyCode::Char('k') if ctrl(&key) => {
                return Some(UiEvent::Intent(Intent::OpenDialog(Dialog::VideoCall)));
            }
            KeyCode::Tab => {
                self.focus = self.focus.next();
                return None;
            }
            KeyCode::BackTab => {
                self.focus = self.focus.previous();
                return None;
            }
            _ => {}
        }

        match self.focus {
            Focus::Chats => match key.code {
                KeyCode::Up => self.step_selection(app, false),
                KeyCode::Down => self.step_selection(app, true),
                KeyCode::Enter => {
                    self.focus = Focus::Composer;
                    None
                }
                _ => None,
            },
            Focus::Search => match key.code {
                KeyCode::Enter | KeyCode::Down => {
                    self.focus = Focus::Chats;
                    None
                }
                _ => {
                    if edit(&mut self.search_input, key) {
                        Some(UiEvent::Intent(Intent::SetSearch(
                            self.search_input.value().to_string(),
                        )))
                    } else {
                        None
                    }
                }
            },
            Focus::Composer => match key.code {
                KeyCode::Enter => {
                    let text = self.message_input.value().to_string();
                    if !text.trim().is_empty() {
                        self.message_input.reset();
                    }
                    Some(UiEvent::Intent(Intent::SendMessage(text)))
                }
                _ => {
                    edit(&mut self.message_input, key);
                    None
                }
            },
        }
    }

    /// Select the neighbour of the current chat in the filtered list, wrapping around
    fn step_selection(&self, app: &ChatApp, forward: bool) -> Option<UiEvent> {
        let chats = app.filtered_chats();
        if chats.is_empty() {
            return None;
        }
        let len = chats.len();
        let current = app
            .selected_id()
            .and_then(|id| chats.iter().position(|c| c.id == id));
        let next = match current {
            Some(i) if forward => (i + 1) % len,
            Some(i) => (i + len - 1) % len,
            None => 0,
        };
        Some(UiEvent::Intent(Intent::SelectChat(chats[next].id)))
    }

    fn handle_profile_key(&mut self, key: KeyEvent) -> Option<UiEvent> {
        match key.code {
            KeyCode::Esc => Some(UiEvent::Intent(Intent::CloseDialog)),
            KeyCode::Char('l') | KeyCode::Char('L') => Some(UiEvent::Intent(Intent::Logout)),
            _ => None,
        }
    }

    fn handle_video_call_key(&mut self, key: KeyEvent) -> Option<UiEvent> {
        match key.code {
            KeyCode::Esc | KeyCode::Char('e') | KeyCode::Char('E') => {
                Some(UiEvent::Intent(Intent::CloseDialog))
            }
            _ => None,
        }
    }

    fn handle_new_chat_key(&mut self, key: KeyEvent, app: &ChatApp) -> Option<UiEvent> {
        if key.code == KeyCode::Esc {
            return Some(UiEvent::Intent(Intent::CloseDialog));
        }

        match app.contact_access() {
            ContactAccess::Prompt | ContactAccess::Denied => {
                if key.code == KeyCode::Enter {
                    self.contact_index = 0;
                    Some(UiEvent::Intent(Intent::RequestContacts))
                } else {
                    None
                }
            }
            ContactAccess::Granted => {
                let contacts = app.filtered_contacts();
                match key.code {
                    KeyCode::Up => {
                        if !contacts.is_empty() {
                            self.contact_index =
                                (self.contact_index + contacts.len() - 1) % contacts.len();
                        }
                        None
                    }
                    KeyCode::Down => {
                        if !contacts.is_empty() {
                            self.contact_index = (self.contact_index + 1) % contacts.len();
                        }
                        None
                    }
                    // Unregistered entries can only be invited, not chatted with
                    KeyCode::Enter => contacts
                        .get(self.contact_index)
                        .filter(|c| c.is_registered)
                        .map(|c| UiEvent::Intent(Intent::StartChat(c.id))),
                    _ => {
                        if edit(&mut self.contact_search_input, key) {
                            self.contact_index = 0;
                            Some(UiEvent::Intent(Intent::SetContactSearch(
                                self.contact_search_input.value().to_string(),
                            )))
                        } else {
                            None
                        }
                    }
                }
            }
        }
    }

    pub fn draw<B: Backend>(&self, frame: &mut Frame<B>, app: &ChatApp) {
        let size = frame.size();
        match app.route() {
            Route::Login => self.draw_login(frame, app, size),
            Route::Chat => self.draw_chat(frame, app, size),
        }
    }

    fn draw_login<B: Backend>(&self, frame: &mut Frame<B>, app: &ChatApp, size: Rect) {
        let area = centered_rect(72, 16, size);
        let block = Block::default()
            .title("Добро пожаловать")
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::Cyan));
        let inner = block.inner(area);
        frame.render_widget(Clear, area);
        frame.render_widget(block, area);

        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(3), // Greeting
                Constraint::Length(3), // Payload input or progress
                Constraint::Length(1), // Help line
                Constraint::Min(1),    // Status and terms
            ])
            .split(inner);

        let greeting = Paragraph::new(vec![
            Line::from("Войдите через Telegram, чтобы начать общение"),
            Line::from(Span::styled(
                format!("Бот: @{}", self.bot_username),
                Style::default().fg(Color::Gray),
            )),
        ])
        .alignment(Alignment::Center);
        frame.render_widget(greeting, chunks[0]);

        if app.is_logging_in() {
            let progress = Paragraph::new("Вход в систему...")
                .alignment(Alignment::Center)
                .style(Style::default().fg(Color::Yellow));
            frame.render_widget(progress, chunks[1]);
        } else {
            draw_input(frame, &self.login_input, chunks[1], "Данные входа (JSON виджета)", true);
        }

        let help = Paragraph::new("Enter войти | Ctrl+D демо-вход | Esc выход")
            .style(Style::default().fg(Color::Gray))
            .alignment(Alignment::Center);
        frame.render_widget(help, chunks[2]);

        let mut footer = Vec::new();
        if let Some(status) = &self.status {
            footer.push(Line::from(Span::styled(status.clone(), Style::default().fg(Color::Red))));
        }
        footer.push(Line::from(Span::styled(
            "Нажимая \"Войти\", вы принимаете условия использования",
            Style::default().fg(Color::DarkGray),
        )));
        let footer = Paragraph::new(footer)
            .alignment(Alignment::Center)
            .wrap(Wrap { trim: true });
        frame.render_widget(footer, chunks[3]);
    }

    fn draw_chat<B: Backend>(&self, frame: &mut Frame<B>, app: &ChatApp, size: Rect) {
        let chunks = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([
                Constraint::Percentage(30), // Chat list
                Constraint::Percentage(70), // Conversation
            ])
            .split(size);

        let left = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Length(3), Constraint::Min(3)])
            .split(chunks[0]);

        draw_input(frame, &self.search_input, left[0], "Поиск...", self.focus == Focus::Search);
        draw_chat_list(frame, app, left[1], self.focus == Focus::Chats);

        match app.selected_chat() {
            Some(chat) => {
                let right = Layout::default()
                    .direction(Direction::Vertical)
                    .constraints([
                        Constraint::Length(3), // Header
                        Constraint::Min(3),    // Messages
                        Constraint::Length(3), // Composer
                        Constraint::Length(1), // Help or status line
                    ])
                    .split(chunks[1]);

                draw_chat_header(frame, chat, right[0]);
                let messages = app.active_timeline().map(|t| t.messages()).unwrap_or(&[]);
                draw_messages(frame, messages, chat, right[1]);
                draw_input(
                    frame,
                    &self.message_input,
                    right[2],
                    "Введите сообщение...",
                    self.focus == Focus::Composer,
                );
                self.draw_help_line(frame, right[3]);
            }
            None => {
                let right = Layout::default()
                    .direction(Direction::Vertical)
                    .constraints([Constraint::Min(1), Constraint::Length(1)])
                    .split(chunks[1]);
                let placeholder = Paragraph::new("Выберите чат для начала общения")
                    .alignment(Alignment::Center)
                    .style(Style::default().fg(Color::Gray))
                    .block(Block::default().borders(Borders::ALL));
                frame.render_widget(placeholder, right[0]);
                self.draw_help_line(frame, right[1]);
            }
        }

        match app.dialog() {
            Some(Dialog::Profile) => draw_profile_dialog(frame, app.session(), size),
            Some(Dialog::NewChat) => self.draw_new_chat_dialog(frame, app, size),
            Some(Dialog::VideoCall) => {
                if let Some(chat) = app.selected_chat() {
                    draw_video_call_dialog(frame, chat, size);
                }
            }
            None => {}
        }
    }

    fn draw_help_line<B: Backend>(&self, frame: &mut Frame<B>, area: Rect) {
        let line = match &self.status {
            Some(status) => Paragraph::new(status.as_str()).style(Style::default().fg(Color::Red)),
            None => Paragraph::new(
                "Tab фокус | Ctrl+N новый чат | Ctrl+P профиль | Ctrl+K звонок | Esc выход",
            )
            .style(Style::default().fg(Color::Gray)),
        };
        frame.render_widget(line, area);
    }

    fn draw_new_chat_dialog<B: Backend>(&self, frame: &mut Frame<B>, app: &ChatApp, area: Rect) {
        let popup_area = centered_rect(64, 20, area);
        let popup_block = Block::default()
            .title("Новый чат")
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::Yellow));
        let inner_area = popup_block.inner(popup_area);

        frame.render_widget(Clear, popup_area);
        frame.render_widget(popup_block, popup_area);

        match app.contact_access() {
            ContactAccess::Prompt => {
                let content = Paragraph::new(vec![
                    Line::from(""),
                    Line::from(Span::styled(
                        "Доступ к контактам",
                        Style::default().add_modifier(Modifier::BOLD),
                    )),
                    Line::from("Разрешите доступ к контактам, чтобы найти друзей"),
                    Line::from(""),
                    Line::from(Span::styled(
                        "Enter  Разрешить доступ",
                        Style::default().fg(Color::Green),
                    )),
                    Line::from(Span::styled("Esc  Закрыть", Style::default().fg(Color::Gray))),
                ])
                .alignment(Alignment::Center)
                .wrap(Wrap { trim: true });
                frame.render_widget(content, inner_area);
            }
            ContactAccess::Denied => {
                let content = Paragraph::new(vec![
                    Line::from(""),
                    Line::from(Span::styled(
                        "Доступ к контактам отклонён",
                        Style::default().fg(Color::Red).add_modifier(Modifier::BOLD),
                    )),
                    Line::from(""),
                    Line::from("Enter  Запросить снова"),
                    Line::from(Span::styled("Esc  Закрыть", Style::default().fg(Color::Gray))),
                ])
                .alignment(Alignment::Center)
                .wrap(Wrap { trim: true });
                frame.render_widget(content, inner_area);
            }
            ContactAccess::Granted => {
                let chunks = Layout::default()
                    .direction(Direction::Vertical)
                    .constraints([
                        Constraint::Length(3), // Search
                        Constraint::Min(1),    // Contacts
                        Constraint::Length(1), // Help
                    ])
                    .split(inner_area);

                draw_input(frame, &self.contact_search_input, chunks[0], "Поиск контактов...", true);

                let contacts = app.filtered_contacts();
                let items: Vec<ListItem> = contacts
                    .iter()
                    .map(|c| {
                        let badge = if c.is_registered {
                            Span::styled(" В приложении", Style::default().fg(Color::Green))
                        } else {
                            Span::styled(" Пригласить", Style::default().fg(Color::DarkGray))
                        };
                        let name_style = if c.is_registered {
                            Style::default().add_modifier(Modifier::BOLD)
                        } else {
                            Style::default().fg(Color::DarkGray)
                        };
                        ListItem::new(Text::from(vec![
                            Line::from(vec![Span::styled(c.name.clone(), name_style), badge]),
                            Line::from(Span::styled(c.phone.clone(), Style::default().fg(Color::Gray))),
                        ]))
                    })
                    .collect();

                let mut state = ListState::default();
                if !contacts.is_empty() {
                    state.select(Some(self.contact_index.min(contacts.len() - 1)));
                }
                let list = List::new(items)
                    .highlight_style(Style::default().bg(Color::DarkGray))
                    .highlight_symbol("> ");
                frame.render_stateful_widget(list, chunks[1], &mut state);

                let help = Paragraph::new("Up/Down выбор | Enter начать чат | Esc закрыть")
                    .style(Style::default().fg(Color::Gray));
                frame.render_widget(help, chunks[2]);
            }
        }
    }
}

/// Bordered single-line text box; places the cursor when `focused`
fn draw_input<B: Backend>(f: &mut Frame<B>, input: &Input, area: Rect, title: &str, focused: bool) {
    let width = area.width.saturating_sub(3) as usize;
    let scroll = input.visual_scroll(width);

    let block = Block::default()
        .title(title)
        .borders(Borders::ALL)
        .border_style(if focused {
            Style::default().fg(Color::Yellow)
        } else {
            Style::default()
        });
    let widget = Paragraph::new(input.value())
        .block(block)
        .scroll((0, scroll as u16));
    f.render_widget(widget, area);

    if focused {
        f.set_cursor(
            area.x + (input.cursor().saturating_sub(scroll)) as u16 + 1,
            area.y + 1,
        );
    }
}

fn draw_chat_list<B: Backend>(f: &mut Frame<B>, app: &ChatApp, area: Rect, focused: bool) {
    let chats = app.filtered_chats();
    let selected = app.selected_id();
    let preview_width = area.width.saturating_sub(8) as usize;

    let items: Vec<ListItem> = chats
        .iter()
        .map(|chat| {
            let presence = if chat.online {
                Span::styled("● ", Style::default().fg(Color::Green))
            } else {
                Span::styled("○ ", Style::default().fg(Color::DarkGray))
            };
            let mut preview_line = vec![Span::styled(
                truncate(&chat.last_message, preview_width),
                Style::default().fg(Color::Gray),
            )];
            if chat.unread > 0 {
                preview_line.push(Span::styled(
                    format!(" ({})", chat.unread),
                    Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD),
                ));
            }

            ListItem::new(Text::from(vec![
                Line::from(vec![
                    presence,
                    Span::styled(chat.name.clone(), Style::default().add_modifier(Modifier::BOLD)),
                    Span::styled(format!("  {}", chat.time_label), Style::default().fg(Color::Gray)),
                ]),
                Line::from(preview_line),
            ]))
        })
        .collect();

    let mut state = ListState::default();
    state.select(selected.and_then(|id| chats.iter().position(|c| c.id == id)));

    let list = List::new(items)
        .block(
            Block::default()
                .title("Чаты")
                .borders(Borders::ALL)
                .border_style(if focused {
                    Style::default().fg(Color::Yellow)
                } else {
                    Style::default()
                }),
        )
        .highlight_style(Style::default().bg(Color::DarkGray));
    f.render_stateful_widget(list, area, &mut state);
}

fn draw_chat_header<B: Backend>(f: &mut Frame<B>, chat: &ConversationSummary, area: Rect) {
    let (presence, presence_style) = if chat.online {
        ("в сети", Style::default().fg(Color::Green))
    } else {
        ("не в сети", Style::default().fg(Color::Gray))
    };
    let header = Paragraph::new(Line::from(vec![
        Span::styled(format!("[{}] ", chat.initial()), Style::default().fg(Color::Cyan)),
        Span::styled(chat.name.clone(), Style::default().add_modifier(Modifier::BOLD)),
        Span::raw("  "),
        Span::styled(presence, presence_style),
    ]))
    .block(Block::default().borders(Borders::ALL));
    f.render_widget(header, area);
}

fn draw_messages<B: Backend>(f: &mut Frame<B>, messages: &[Message], chat: &ConversationSummary, area: Rect) {
    let wrap_width = area.width.saturating_sub(2).max(1) as usize; // Account for borders

    let items: Vec<ListItem> = messages
        .iter()
        .flat_map(|m| {
            let author = if m.is_outgoing { "Вы" } else { chat.name.as_str() };
            let full_content = format!("[{}] {}: {}", m.time_label, author, m.text);

            let style = if m.is_outgoing {
                Style::default().fg(Color::Cyan)
            } else {
                Style::default()
            };

            wrap(&full_content, wrap_width)
                .into_iter()
                .map(|l| l.into_owned())
                .collect::<Vec<String>>()
                .into_iter()
                .map(move |line| ListItem::new(Text::from(line)).style(style))
        })
        .collect();

    // Keep the newest message in view
    let mut list_state = ListState::default();
    if !items.is_empty() {
        list_state.select(Some(items.len() - 1));
    }

    let list = List::new(items)
        .block(Block::default().borders(Borders::ALL).title("Сообщения"))
        .highlight_style(Style::default());
    f.render_stateful_widget(list, area, &mut list_state);
}

fn draw_profile_dialog<B: Backend>(f: &mut Frame<B>, session: Option<&UserSession>, area: Rect) {
    let popup_area = centered_rect(50, 16, area);
    let popup_block = Block::default()
        .title("Профиль")
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Yellow));
    let inner_area = popup_block.inner(popup_area);

    f.render_widget(Clear, popup_area);
    f.render_widget(popup_block, popup_area);

    let name = session
        .map(|s| s.display_name())
        .unwrap_or_else(|| "Мой профиль".to_string());
    let mut lines = vec![
        Line::from(Span::styled("[Я]", Style::default().fg(Color::Cyan))),
        Line::from(Span::styled(name, Style::default().add_modifier(Modifier::BOLD))),
    ];
    if let Some(username) = session.and_then(|s| s.username.as_deref()) {
        lines.push(Line::from(Span::styled(
            format!("@{}", username),
            Style::default().fg(Color::Gray),
        )));
    }
    lines.push(Line::from(Span::styled("в сети", Style::default().fg(Color::Green))));
    lines.push(Line::from(""));
    for item in ["Редактировать профиль", "Настройки", "Уведомления", "Приватность"] {
        lines.push(Line::from(format!("  {}", item)));
    }
    lines.push(Line::from(""));
    lines.push(Line::from(Span::styled(
        "L выйти из аккаунта | Esc закрыть",
        Style::default().fg(Color::Gray),
    )));

    let content = Paragraph::new(lines).alignment(Alignment::Center);
    f.render_widget(content, inner_area);
}

fn draw_video_call_dialog<B: Backend>(f: &mut Frame<B>, chat: &ConversationSummary, area: Rect) {
    let popup_area = centered_rect(60, 12, area);
    let popup_block = Block::default()
        .title(format!("Видеозвонок с {}", chat.name))
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Magenta));
    let inner_area = popup_block.inner(popup_area);

    f.render_widget(Clear, popup_area);
    f.render_widget(popup_block, popup_area);

    let content = Paragraph::new(vec![
        Line::from(""),
        Line::from(Span::styled(
            format!("[ {} ]", chat.initial()),
            Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD),
        )),
        Line::from(""),
        Line::from(Span::styled("[Я]", Style::default().fg(Color::Gray))),
        Line::from(""),
        Line::from(Span::styled("E / Esc завершить звонок", Style::default().fg(Color::Red))),
    ])
    .alignment(Alignment::Center);
    f.render_widget(content, inner_area);
}

/// Centered popup of at most `width` x `height`, leaving a small margin
fn centered_rect(width: u16, height: u16, area: Rect) -> Rect {
    let popup_width = width.min(area.width.saturating_sub(4));
    let popup_height = height.min(area.height.saturating_sub(4));

    let popup_x = area.x + (area.width - popup_width) / 2;
    let popup_y = area.y + (area.height - popup_height) / 2;

    Rect::new(popup_x, popup_y, popup_width, popup_height)
}

fn truncate(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        return text.to_string();
    }
    let mut short: String = text.chars().take(max_chars.saturating_sub(1)).collect();
    short.push('…');
    short
}

pub fn setup_terminal() -> Result<Terminal<CrosstermBackend<io::Stdout>>> {
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let terminal = Terminal::new(backend)?;
    debug!("Terminal initialised");
    Ok(terminal)
}

pub fn restore_terminal(mut terminal: Terminal<CrosstermBackend<io::Stdout>>) -> Result<()> {
    disable_raw_mode()?;
    execute!(
        terminal.backend_mut(),
        LeaveAlternateScreen
    )?;
    terminal.show_cursor()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use besedka::contacts::{ContactDirectory, MockContactSource};
    use besedka::session::{AuthPolicy, SessionStore};
    use ratatui::backend::TestBackend;
    use std::time::Instant;

    fn logged_in_app(dir: &std::path::Path) -> ChatApp {
        let mut app = ChatApp::new(
            SessionStore::in_dir(dir),
            AuthPolicy::default(),
            ContactDirectory::new(Box::new(MockContactSource)),
        )
        .with_redirect_delay(Duration::ZERO);
        app.demo_login().unwrap();
        app.poll_redirect(Instant::now());
        app
    }

    fn press(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    fn screen_text(terminal: &Terminal<TestBackend>) -> String {
        terminal
            .backend()
            .buffer()
            .content
            .iter()
            .map(|cell| cell.symbol.as_str())
            .collect()
    }

    #[test]
    fn ctrl_d_on_login_screen_is_demo_login() {
        let dir = tempfile::tempdir().unwrap();
        let app = ChatApp::new(
            SessionStore::in_dir(dir.path()),
            AuthPolicy::default(),
            ContactDirectory::new(Box::new(MockContactSource)),
        );
        let mut ui = ChatUI::new("bot");
        let event = ui.handle_key(KeyEvent::new(KeyCode::Char('d'), KeyModifiers::CONTROL), &app);
        assert_eq!(event, Some(UiEvent::Intent(Intent::DemoLogin)));
    }

    #[test]
    fn typing_and_enter_sends_message() {
        let dir = tempfile::tempdir().unwrap();
        let app = logged_in_app(dir.path());
        let mut ui = ChatUI::new("bot");

        assert_eq!(ui.handle_key(press(KeyCode::Char('h')), &app), None);
        assert_eq!(ui.handle_key(press(KeyCode::Char('i')), &app), None);
        assert_eq!(
            ui.handle_key(press(KeyCode::Enter), &app),
            Some(UiEvent::Intent(Intent::SendMessage("hi".to_string())))
        );
        assert_eq!(ui.message_input.value(), "");
    }

    #[test]
    fn arrows_in_chat_list_wrap_around() {
        let dir = tempfile::tempdir().unwrap();
        let app = logged_in_app(dir.path());
        let mut ui = ChatUI::new("bot");
        ui.focus = Focus::Chats;

        let ids: Vec<_> = app.chats().iter().map(|c| c.id).collect();
        assert_eq!(
            ui.handle_key(press(KeyCode::Down), &app),
            Some(UiEvent::Intent(Intent::SelectChat(ids[1])))
        );
        assert_eq!(
            ui.handle_key(press(KeyCode::Up), &app),
            Some(UiEvent::Intent(Intent::SelectChat(ids[4])))
        );
    }

    #[test]
    fn search_edits_raise_set_search() {
        let dir = tempfile::tempdir().unwrap();
        let app = logged_in_app(dir.path());
        let mut ui = ChatUI::new("bot");
        ui.handle_key(press(KeyCode::Tab), &app);
        assert_eq!(ui.focus, Focus::Search);

        assert_eq!(
            ui.handle_key(press(KeyCode::Char('м')), &app),
            Some(UiEvent::Intent(Intent::SetSearch("м".to_string())))
        );
    }

    #[test]
    fn chat_screen_renders_list_and_history() {
        let dir = tempfile::tempdir().unwrap();
        let app = logged_in_app(dir.path());
        let ui = ChatUI::new("bot");

        let mut terminal = Terminal::new(TestBackend::new(120, 30)).unwrap();
        terminal.draw(|f| ui.draw(f, &app)).unwrap();

        let text = screen_text(&terminal);
        assert!(text.contains("Чаты"));
        assert!(text.contains("Мария"));
        assert!(text.contains("Давай встретимся завтра"));
    }

    #[test]
    fn login_screen_shows_bot_name() {
        let dir = tempfile::tempdir().unwrap();
        let app = ChatApp::new(
            SessionStore::in_dir(dir.path()),
            AuthPolicy::default(),
            ContactDirectory::new(Box::new(MockContactSource)),
        );
        let ui = ChatUI::new("my_bot");

        let mut terminal = Terminal::new(TestBackend::new(100, 24)).unwrap();
        terminal.draw(|f| ui.draw(f, &app)).unwrap();
        assert!(screen_text(&terminal).contains("@my_bot"));
    }

    #[test]
    fn centered_rect_fits_small_areas() {
        let area = Rect::new(0, 0, 3, 3);
        let popup = centered_rect(50, 10, area);
        assert_eq!(popup.width, 0);
        assert_eq!(popup.height, 0);
    }

    #[test]
    fn truncate_marks_cut_text() {
        assert_eq!(truncate("Привет", 10), "Привет");
        assert_eq!(truncate("Привет, мир", 5), "Прив…");
    }
}
