use std::io;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{mpsc, Arc};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use crossterm::terminal::{disable_raw_mode, enable_raw_mode};
use research_core::Msg;
use research_logging::{research_debug, research_warn};

use crate::platform::app::SessionEvent;

const POLL_TIMEOUT: Duration = Duration::from_millis(100);

/// Map one key press to a message.
pub(crate) fn key_to_msg(key: &KeyEvent) -> Option<Msg> {
    if key.kind != KeyEventKind::Press {
        return None;
    }
    if key.modifiers.contains(KeyModifiers::CONTROL) {
        // Raw mode swallows SIGINT, so Ctrl+C quits here.
        return matches!(key.code, KeyCode::Char('c')).then_some(Msg::ViewClosed);
    }
    match key.code {
        KeyCode::Char('r') | KeyCode::Char('R') => Some(Msg::RefreshClicked),
        KeyCode::Char('a') | KeyCode::Char('A') => Some(Msg::AutoRefreshToggled),
        KeyCode::Char('q') | KeyCode::Char('Q') | KeyCode::Esc => Some(Msg::ViewClosed),
        _ => None,
    }
}

/// Keeps the terminal in raw mode while alive.
pub(crate) struct RawModeGuard;

impl RawModeGuard {
    pub(crate) fn enable() -> io::Result<Self> {
        enable_raw_mode()?;
        Ok(Self)
    }
}

impl Drop for RawModeGuard {
    fn drop(&mut self) {
        if let Err(err) = disable_raw_mode() {
            research_warn!("Failed to restore terminal mode: {}", err);
        }
    }
}

/// Read single key presses until `stop` is set, the receiver goes away or the
/// terminal stops delivering events. Always ends with
/// [`SessionEvent::InputClosed`].
pub(crate) fn spawn_key_reader(
    event_tx: mpsc::Sender<SessionEvent>,
    stop: Arc<AtomicBool>,
) -> JoinHandle<()> {
    thread::spawn(move || {
        while !stop.load(Ordering::Relaxed) {
            match event::poll(POLL_TIMEOUT) {
                Ok(false) => {}
                Ok(true) => match event::read() {
                    Ok(Event::Key(key)) => {
                        let Some(msg) = key_to_msg(&key) else {
                            continue;
                        };
                        if event_tx.send(SessionEvent::App(msg)).is_err() {
                            return;
                        }
                    }
                    Ok(_) => {}
                    Err(err) => {
                        research_debug!("Key input failed: {}", err);
                        break;
                    }
                },
                Err(err) => {
                    research_debug!("Key input failed: {}", err);
                    break;
                }
            }
        }
        let _ = event_tx.send(SessionEvent::InputClosed);
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn press(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    #[test]
    fn single_keys_map_to_messages() {
        assert_eq!(key_to_msg(&press(KeyCode::Char('r'))), Some(Msg::RefreshClicked));
        assert_eq!(
            key_to_msg(&press(KeyCode::Char('A'))),
            Some(Msg::AutoRefreshToggled)
        );
        assert_eq!(key_to_msg(&press(KeyCode::Char('q'))), Some(Msg::ViewClosed));
        assert_eq!(key_to_msg(&press(KeyCode::Esc)), Some(Msg::ViewClosed));
    }

    #[test]
    fn ctrl_c_quits_and_other_keys_are_ignored() {
        let ctrl_c = KeyEvent::new(KeyCode::Char('c'), KeyModifiers::CONTROL);
        assert_eq!(key_to_msg(&ctrl_c), Some(Msg::ViewClosed));

        let ctrl_r = KeyEvent::new(KeyCode::Char('r'), KeyModifiers::CONTROL);
        assert_eq!(key_to_msg(&ctrl_r), None);
        assert_eq!(key_to_msg(&press(KeyCode::Char('x'))), None);
        assert_eq!(key_to_msg(&press(KeyCode::Enter)), None);
    }

    #[test]
    fn key_release_is_ignored() {
        let mut release = press(KeyCode::Char('r'));
        release.kind = KeyEventKind::Release;
        assert_eq!(key_to_msg(&release), None);
    }
}
