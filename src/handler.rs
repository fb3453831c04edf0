use anyhow::Result;
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};

use crate::app::{App, InputMode};
use crate::gateway::PokeApiClient;

pub fn handle_key_event(app: &mut App, gateway: &PokeApiClient, key: KeyEvent) -> Result<()> {
    // Ctrl-C always quits, regardless of mode
    if key.modifiers.contains(KeyModifiers::CONTROL) && key.code == KeyCode::Char('c') {
        app.should_quit = true;
        return Ok(());
    }

    match app.input_mode {
        InputMode::Normal => handle_normal(app, key),
        InputMode::Editing => handle_editing(app, gateway, key),
    }

    Ok(())
}

fn handle_normal(app: &mut App, key: KeyEvent) {
    match key.code {
        KeyCode::Char('q') => {
            app.should_quit = true;
        }
        KeyCode::Char('s') => {
            // Sign out, then leave; main clears the session after restore
            app.sign_out = true;
            app.should_quit = true;
        }
        KeyCode::Char('i') | KeyCode::Enter => {
            app.input_mode = InputMode::Editing;
        }
        KeyCode::Up | KeyCode::Char('k') => {
            app.scroll_up();
        }
        KeyCode::Down | KeyCode::Char('j') => {
            app.scroll_down();
        }
        _ => {}
    }
}

fn handle_editing(app: &mut App, gateway: &PokeApiClient, key: KeyEvent) {
    match key.code {
        KeyCode::Esc => {
            app.input_mode = InputMode::Normal;
        }
        KeyCode::Enter => {
            // One exchange at a time: ignore Enter while a task is in flight
            if app.exchange_task.is_none() {
                let text = app.input.clone();
                if let Some(exchange) = app.begin_exchange(&text) {
                    app.input.clear();
                    app.cursor = 0;

                    // Scroll to bottom so "Thinking..." is visible
                    app.scroll_to_bottom();

                    let client = gateway.clone();
                    let seq = exchange.seq;
                    app.exchange_task = Some((
                        seq,
                        tokio::spawn(async move {
                            client
                                .query(&exchange.query, exchange.conversation_id.as_deref())
                                .await
                        }),
                    ));
                }
            }
        }
        KeyCode::Backspace => {
            if app.cursor > 0 {
                app.cursor -= 1;
                let byte_pos = char_to_byte_index(&app.input, app.cursor);
                app.input.remove(byte_pos);
            }
        }
        KeyCode::Delete => {
            let char_count = app.input.chars().count();
            if app.cursor < char_count {
                let byte_pos = char_to_byte_index(&app.input, app.cursor);
                app.input.remove(byte_pos);
            }
        }
        KeyCode::Left => {
            app.cursor = app.cursor.saturating_sub(1);
        }
        KeyCode::Right => {
            let char_count = app.input.chars().count();
            app.cursor = (app.cursor + 1).min(char_count);
        }
        KeyCode::Home => {
            app.cursor = 0;
        }
        KeyCode::End => {
            app.cursor = app.input.chars().count();
        }
        KeyCode::Char(c) => {
            let byte_pos = char_to_byte_index(&app.input, app.cursor);
            app.input.insert(byte_pos, c);
            app.cursor += 1;
        }
        _ => {}
    }
}

/// Convert a character index to a byte index for string operations
fn char_to_byte_index(s: &str, char_idx: usize) -> usize {
    s.char_indices()
        .nth(char_idx)
        .map(|(i, _)| i)
        .unwrap_or(s.len())
}
