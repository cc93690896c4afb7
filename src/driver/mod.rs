//! Browser capability used by the form protocol.
//!
//! The protocol never talks to a browser directly; it only needs the small
//! command surface of [`PageDriver`]. [`chromium`] implements it on a local
//! Chromium driven over the DevTools protocol, and tests use an in-memory page.

pub mod chromium;

use std::fmt;
use thiserror::Error;
use tracing::warn;

pub use chromium::{ChromiumFactory, ChromiumSession};

/// Errors raised by page driver commands.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DriverError {
    /// No element matched the locator
    #[error("no such element: {0}")]
    NoSuchElement(String),
    /// A dialog blocks the page
    #[error("unexpected alert open: {0}")]
    UnexpectedAlert(String),
    /// The browser rejected a command
    #[error("{command} failed: {message}")]
    Command { command: String, message: String },
    /// The browser could not be started or stopped responding
    #[error("transport error: {0}")]
    Transport(String),
    /// The driver answered with something unexpected
    #[error("malformed driver response: {0}")]
    Protocol(String),
}

pub type DriverResult<T> = Result<T, DriverError>;

/// How to find an element on the page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Locator {
    Name(String),
    Id(String),
    ClassName(String),
    TagName(String),
    XPath(String),
}

impl Locator {
    pub fn name(value: impl Into<String>) -> Self {
        Self::Name(value.into())
    }

    pub fn id(value: impl Into<String>) -> Self {
        Self::Id(value.into())
    }

    pub fn class_name(value: impl Into<String>) -> Self {
        Self::ClassName(value.into())
    }

    pub fn tag_name(value: impl Into<String>) -> Self {
        Self::TagName(value.into())
    }

    pub fn xpath(value: impl Into<String>) -> Self {
        Self::XPath(value.into())
    }

    /// Locator for the direct parent of an element.
    pub fn parent() -> Self {
        Self::XPath("..".to_string())
    }
}

impl fmt::Display for Locator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Name(v) => write!(f, "name={v}"),
            Self::Id(v) => write!(f, "id={v}"),
            Self::ClassName(v) => write!(f, "class={v}"),
            Self::TagName(v) => write!(f, "tag={v}"),
            Self::XPath(v) => write!(f, "xpath={v}"),
        }
    }
}

/// Opaque handle to an element found by a driver.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ElementRef(pub String);

impl ElementRef {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Commands the form protocol needs from a browser session.
///
/// Clicking is the only mutation; checkboxes and options toggle on click.
#[allow(async_fn_in_trait)]
pub trait PageDriver {
    async fn navigate(&mut self, url: &str) -> DriverResult<()>;

    /// First element matching the locator.
    async fn find_element(&mut self, locator: &Locator) -> DriverResult<ElementRef>;

    /// Every element matching the locator, in document order.
    async fn find_elements(&mut self, locator: &Locator) -> DriverResult<Vec<ElementRef>>;

    /// First element matching the locator, searched from `element`.
    async fn find_child(
        &mut self,
        element: &ElementRef,
        locator: &Locator,
    ) -> DriverResult<ElementRef>;

    /// Every element matching the locator, searched from `element`.
    async fn find_children(
        &mut self,
        element: &ElementRef,
        locator: &Locator,
    ) -> DriverResult<Vec<ElementRef>>;

    async fn click(&mut self, element: &ElementRef) -> DriverResult<()>;

    /// Attribute or DOM property value, `None` when absent.
    async fn attribute(&mut self, element: &ElementRef, name: &str)
        -> DriverResult<Option<String>>;

    async fn text(&mut self, element: &ElementRef) -> DriverResult<String>;

    async fn is_selected(&mut self, element: &ElementRef) -> DriverResult<bool>;

    async fn is_displayed(&mut self, element: &ElementRef) -> DriverResult<bool>;

    /// Dismisses an open dialog, returning its text, or `None` when no dialog is open.
    async fn dismiss_alert(&mut self) -> DriverResult<Option<String>>;

    /// Focuses the most recently opened window.
    async fn switch_to_last_window(&mut self) -> DriverResult<()>;

    /// Ends the session.
    async fn quit(self) -> DriverResult<()>;
}

/// Opens fresh page driver sessions.
#[allow(async_fn_in_trait)]
pub trait SessionFactory {
    type Driver: PageDriver;

    async fn open(&self) -> DriverResult<Self::Driver>;
}

/// Work a session needs after its browser is up and before it takes commands.
#[allow(async_fn_in_trait)]
pub trait SessionSetup: PageDriver + Sized {
    async fn setup(&mut self) -> DriverResult<()>;
}

/// Runs setup on a started session.
///
/// A session whose setup fails is quit before the error is returned, so a
/// browser that was started is never left running.
pub async fn start_session<D: SessionSetup>(mut session: D) -> DriverResult<D> {
    if let Err(e) = session.setup().await {
        if let Err(quit_err) = session.quit().await {
            warn!(error = %quit_err, "Failed to close browser after setup error");
        }
        return Err(e);
    }
    Ok(session)
}
