//! Key handling, kept free of terminal I/O so it can be tested directly.

use super::state::UiState;
use crate::orchestrator::UiCommand;
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};

pub const TAB_COUNT: usize = 2;

#[derive(Debug, PartialEq, Eq)]
pub enum KeyAction {
    Nothing,
    Send(UiCommand),
    CopySelected,
    Quit,
}

pub fn handle_key(state: &mut UiState, k: KeyEvent) -> KeyAction {
    if k.modifiers == KeyModifiers::CONTROL && k.code == KeyCode::Char('c') {
        return KeyAction::Quit;
    }

    // A visible notice is modal until dismissed.
    if !state.notices.is_empty() {
        if matches!(k.code, KeyCode::Esc | KeyCode::Enter | KeyCode::Char(' ')) {
            state.dismiss_notice();
        }
        return KeyAction::Nothing;
    }

    if state.input_focused {
        return handle_input_key(state, k);
    }

    match k.code {
        KeyCode::Char('q') => KeyAction::Quit,
        KeyCode::Tab => {
            state.tab = (state.tab + 1) % TAB_COUNT;
            KeyAction::Nothing
        }
        KeyCode::Char('?') => {
            state.tab = 1;
            KeyAction::Nothing
        }
        _ if state.tab != 0 => KeyAction::Nothing,
        KeyCode::Char('s') => match state.trigger_block_reason() {
            Some(reason) => {
                state.info = reason;
                KeyAction::Nothing
            }
            None => {
                state.info = "Saving current page…".into();
                KeyAction::Send(UiCommand::Save)
            }
        },
        KeyCode::Char('/') | KeyCode::Char('i') => {
            state.input_focused = true;
            KeyAction::Nothing
        }
        KeyCode::Up | KeyCode::Char('k') => {
            state.select_prev();
            KeyAction::Nothing
        }
        KeyCode::Down | KeyCode::Char('j') => {
            state.select_next();
            KeyAction::Nothing
        }
        KeyCode::Char('y') => {
            if state.selected_record().is_some() {
                KeyAction::CopySelected
            } else {
                state.info = "No memory selected to copy".into();
                KeyAction::Nothing
            }
        }
        _ => KeyAction::Nothing,
    }
}

fn handle_input_key(state: &mut UiState, k: KeyEvent) -> KeyAction {
    match k.code {
        KeyCode::Esc => {
            state.input_focused = false;
            KeyAction::Nothing
        }
        KeyCode::Enter => {
            if state.input.trim().is_empty() {
                return KeyAction::Nothing;
            }
            match state.trigger_block_reason() {
                Some(reason) => {
                    state.info = reason;
                    KeyAction::Nothing
                }
                None => {
                    state.info = format!("Searching memory for: {}", state.input.trim());
                    KeyAction::Send(UiCommand::Search(state.input.clone()))
                }
            }
        }
        // The box is locked while a call is in flight so a result cannot clear newer text.
        _ if state.busy.is_some() => KeyAction::Nothing,
        KeyCode::Backspace => {
            state.input.pop();
            KeyAction::Nothing
        }
        KeyCode::Char(c) => {
            state.input.push(c);
            KeyAction::Nothing
        }
        _ => KeyAction::Nothing,
    }
}
