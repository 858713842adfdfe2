//! Per-screen view models. Each owns its in-memory state, runs its guard on
//! mount, and keeps the last failure as inline text next to the action that
//! caused it.

mod connect;
mod linker;
mod links;
mod verify;

pub use connect::ConnectScreen;
pub use linker::{CHAT_LINKED_MESSAGE, ChatLinkerScreen};
pub use links::{ActiveLinksScreen, LinkRow};
pub use verify::VerifyCodeScreen;

use crate::flow::Screen;

/// Result of mounting a guarded screen.
#[derive(Debug)]
pub enum Mount<T> {
    Ready(T),
    Redirect(Screen),
}

impl<T> Mount<T> {
    pub fn redirect(&self) -> Option<Screen> {
        match self {
            Self::Ready(_) => None,
            Self::Redirect(screen) => Some(*screen),
        }
    }

    pub fn ready(self) -> Option<T> {
        match self {
            Self::Ready(screen) => Some(screen),
            Self::Redirect(_) => None,
        }
    }
}
