//! Window presence: whether the front end is currently showing itself, and
//! the show/quit commands a tray icon can send.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::watch;
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WindowState {
    Visible,
    Hidden,
}

/// Commands coming from the tray icon
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrayCommand {
    Show,
    Hide,
    Quit,
}

/// Shared visibility flag plus a quit signal. Clones share state.
#[derive(Debug, Clone)]
pub struct Presence {
    visible: Arc<AtomicBool>,
    quit: Arc<watch::Sender<bool>>,
}

impl Presence {
    pub fn new(initial: WindowState) -> Self {
        let (quit, _) = watch::channel(false);
        Self {
            visible: Arc::new(AtomicBool::new(initial == WindowState::Visible)),
            quit: Arc::new(quit),
        }
    }

    pub fn state(&self) -> WindowState {
        if self.is_visible() {
            WindowState::Visible
        } else {
            WindowState::Hidden
        }
    }

    pub fn is_visible(&self) -> bool {
        self.visible.load(Ordering::Acquire)
    }

    /// Make the window visible. Returns true if it was hidden before.
    pub fn show(&self) -> bool {
        !self.visible.swap(true, Ordering::AcqRel)
    }

    pub fn hide(&self) {
        self.visible.store(false, Ordering::Release);
    }

    pub fn handle(&self, command: TrayCommand) {
        debug!("Tray command: {:?}", command);
        match command {
            TrayCommand::Show => {
                self.show();
            }
            TrayCommand::Hide => self.hide(),
            TrayCommand::Quit => {
                self.quit.send_replace(true);
            }
        }
    }

    pub fn quit_requested(&self) -> bool {
        *self.quit.borrow()
    }

    /// Receiver that observes the quit signal
    pub fn subscribe_quit(&self) -> watch::Receiver<bool> {
        self.quit.subscribe()
    }
}

impl Default for Presence {
    fn default() -> Self {
        Self::new(WindowState::Visible)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_show_hide() {
        let presence = Presence::new(WindowState::Hidden);
        let other = presence.clone();
        assert_eq!(presence.state(), WindowState::Hidden);

        assert!(other.show());
        assert!(presence.is_visible());
        assert!(!presence.show());

        presence.handle(TrayCommand::Hide);
        assert_eq!(other.state(), WindowState::Hidden);
    }

    #[tokio::test]
    async fn test_quit_is_observed() {
        let presence = Presence::default();
        let mut quit = presence.subscribe_quit();
        assert!(!presence.quit_requested());

        presence.handle(TrayCommand::Quit);
        quit.changed().await.unwrap();
        assert!(*quit.borrow());
        assert!(presence.quit_requested());
    }
}
