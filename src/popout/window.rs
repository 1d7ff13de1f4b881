//! The two ambient window primitives pop-out management sits on top of:
//! opening a new browser window, and reading back whether it's still open.

/// A live handle to a window the primary opened. The pop-out manager polls
/// `is_closed` on a timer rather than relying on a close
/// event.
pub trait WindowHandle: Send + Sync {
    fn is_closed(&self) -> bool;
    /// Bring an already-open window to the foreground.
    fn focus(&self);
}

/// Opens a new window at a given route. The only thing standing between
/// `PopoutManager::open` and an actual `window.open()` call.
pub trait WindowOpener: Send + Sync {
    /// Returns `None` if the browser blocked the popup.
    fn open(&self, route: &str) -> Option<Box<dyn WindowHandle>>;
}
