//! [`PageDriver`] on a local Chromium, driven through chromiumoxide.
//!
//! Every session launches its own browser process and closes it on
//! [`quit`](PageDriver::quit). Element handles are indexes into a per-session
//! registry of chromiumoxide elements. Dialogs raised by the page are
//! dismissed as soon as they open and their text is kept for
//! [`dismiss_alert`](PageDriver::dismiss_alert).

use super::{
    start_session, DriverError, DriverResult, ElementRef, Locator, PageDriver, SessionFactory,
    SessionSetup,
};
use chromiumoxide::browser::{Browser, BrowserConfig};
use chromiumoxide::cdp::browser_protocol::page::{
    EventJavascriptDialogOpening, HandleJavaScriptDialogParams,
};
use chromiumoxide::element::Element;
use chromiumoxide::error::CdpError;
use chromiumoxide::page::Page;
use futures::StreamExt;
use serde_json::Value;
use std::future::Future;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::{sleep, Instant};
use tracing::{debug, warn};

/// Pause between element lookups while waiting for an element to render.
const POLL_INTERVAL: Duration = Duration::from_millis(100);

/// How long a dialog may take to open after the click that caused it.
const DIALOG_GRACE: Duration = Duration::from_millis(300);

/// Attribute used to hand a parent element back to a selector lookup.
const PARENT_MARKER: &str = "data-census-parent";

/// Toggles an `option` like a ctrl-click would; other elements are left to a real click.
const TOGGLE_OPTION_JS: &str = "function() { \
    if (this.tagName !== 'OPTION') { return false; } \
    this.selected = !this.selected; \
    const select = this.closest('select'); \
    if (select) { select.dispatchEvent(new Event('change', { bubbles: true })); } \
    return true; }";

const IS_SELECTED_JS: &str = "function() { return !!(this.checked || this.selected); }";

const IS_DISPLAYED_JS: &str = "function() { \
    const style = window.getComputedStyle(this); \
    return style.display !== 'none' && style.visibility !== 'hidden' \
        && this.getClientRects().length > 0; }";

/// Launches a Chromium per session.
#[derive(Debug, Clone)]
pub struct ChromiumFactory {
    chrome_path: Option<PathBuf>,
    headless: bool,
    implicit_wait: Duration,
}

impl ChromiumFactory {
    /// `chrome_path` overrides the executable chromiumoxide finds on its own.
    pub fn new(chrome_path: Option<PathBuf>, headless: bool, implicit_wait_ms: u64) -> Self {
        Self {
            chrome_path,
            headless,
            implicit_wait: Duration::from_millis(implicit_wait_ms),
        }
    }

    pub fn implicit_wait(&self) -> Duration {
        self.implicit_wait
    }

    fn browser_config(&self) -> DriverResult<BrowserConfig> {
        let mut builder = BrowserConfig::builder()
            .arg("--no-sandbox")
            .arg("--disable-gpu")
            .arg("--disable-dev-shm-usage")
            .arg("--disable-extensions");
        if let Some(path) = &self.chrome_path {
            builder = builder.chrome_executable(path);
        }
        if !self.headless {
            builder = builder.with_head();
        }
        builder
            .build()
            .map_err(|e| DriverError::Transport(format!("failed to build browser config: {e}")))
    }
}

impl SessionFactory for ChromiumFactory {
    type Driver = ChromiumSession;

    async fn open(&self) -> DriverResult<ChromiumSession> {
        let config = self.browser_config()?;
        let (browser, mut handler) = Browser::launch(config)
            .await
            .map_err(|e| DriverError::Transport(format!("failed to launch Chromium: {e}")))?;

        let handler = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if let Err(e) = event {
                    debug!(error = %e, "DevTools handler error");
                }
            }
        });

        let session = ChromiumSession {
            browser,
            handler,
            page: None,
            dialogs: None,
            last_dialog: Arc::new(Mutex::new(None)),
            elements: Vec::new(),
            implicit_wait: self.implicit_wait,
        };
        let session = start_session(session).await?;
        debug!(headless = self.headless, "Chromium session opened");
        Ok(session)
    }
}

/// One browser process with the page the protocol works on.
pub struct ChromiumSession {
    browser: Browser,
    handler: JoinHandle<()>,
    page: Option<Page>,
    dialogs: Option<JoinHandle<()>>,
    last_dialog: Arc<Mutex<Option<String>>>,
    elements: Vec<Element>,
    implicit_wait: Duration,
}

impl ChromiumSession {
    fn page(&self) -> DriverResult<&Page> {
        self.page
            .as_ref()
            .ok_or_else(|| DriverError::Protocol("session has no open page".into()))
    }

    fn element(&self, element: &ElementRef) -> DriverResult<&Element> {
        element
            .as_str()
            .parse::<usize>()
            .ok()
            .and_then(|index| self.elements.get(index))
            .ok_or_else(|| DriverError::NoSuchElement(format!("stale element {}", element.as_str())))
    }

    fn register(&mut self, element: Element) -> ElementRef {
        self.elements.push(element);
        ElementRef::new((self.elements.len() - 1).to_string())
    }

    fn take_dialog(&self) -> Option<String> {
        self.last_dialog.lock().ok().and_then(|mut slot| slot.take())
    }

    async fn find_in_page(&self, locator: &Locator) -> DriverResult<Element> {
        let page = self.page()?;
        let result = match locator {
            Locator::XPath(xpath) => {
                poll(self.implicit_wait, || page.find_xpath(xpath.clone()), |_| true).await
            }
            _ => {
                let css = css_selector(locator)?;
                poll(self.implicit_wait, || page.find_element(css.clone()), |_| true).await
            }
        };
        result.map_err(|e| not_found(locator, e))
    }

    async fn find_all_in_page(&self, locator: &Locator) -> DriverResult<Vec<Element>> {
        let page = self.page()?;
        let result = match locator {
            Locator::XPath(xpath) => {
                poll(
                    self.implicit_wait,
                    || page.find_xpaths(xpath.clone()),
                    |found: &Vec<Element>| !found.is_empty(),
                )
                .await
            }
            _ => {
                let css = css_selector(locator)?;
                poll(
                    self.implicit_wait,
                    || page.find_elements(css.clone()),
                    |found: &Vec<Element>| !found.is_empty(),
                )
                .await
            }
        };
        result.map_err(|e| not_found(locator, e))
    }

    /// The parent of `element`, tagged with a one-off marker and looked up again.
    async fn parent_of(&self, element: &ElementRef) -> DriverResult<Element> {
        let marker = self.elements.len();
        let script = format!(
            "function() {{ \
             document.querySelectorAll('[{PARENT_MARKER}]') \
                 .forEach(e => e.removeAttribute('{PARENT_MARKER}')); \
             const parent = this.parentElement; \
             if (parent) {{ parent.setAttribute('{PARENT_MARKER}', '{marker}'); }} \
             return parent !== null; }}"
        );
        if !js_bool(self.element(element)?, &script, "find parent").await? {
            return Err(DriverError::NoSuchElement(format!(
                "{} has no parent",
                element.as_str()
            )));
        }
        let locator = Locator::xpath(format!("//*[@{PARENT_MARKER}='{marker}']"));
        self.find_in_page(&locator).await
    }
}

impl SessionSetup for ChromiumSession {
    async fn setup(&mut self) -> DriverResult<()> {
        let page = self
            .browser
            .new_page("about:blank")
            .await
            .map_err(command_error("new page"))?;

        let mut opened = page
            .event_listener::<EventJavascriptDialogOpening>()
            .await
            .map_err(command_error("listen for dialogs"))?;
        let dialog_page = page.clone();
        let last_dialog = Arc::clone(&self.last_dialog);
        self.dialogs = Some(tokio::spawn(async move {
            while let Some(event) = opened.next().await {
                if let Ok(mut slot) = last_dialog.lock() {
                    *slot = Some(event.message.clone());
                }
                if let Err(e) = dialog_page
                    .execute(HandleJavaScriptDialogParams::new(false))
                    .await
                {
                    warn!(error = %e, "Failed to dismiss dialog");
                }
            }
        }));

        self.page = Some(page);
        Ok(())
    }
}

impl PageDriver for ChromiumSession {
    async fn navigate(&mut self, url: &str) -> DriverResult<()> {
        let page = self.page()?;
        page.goto(url).await.map_err(command_error("navigate"))?;
        page.wait_for_navigation()
            .await
            .map_err(command_error("wait for navigation"))?;
        Ok(())
    }

    async fn find_element(&mut self, locator: &Locator) -> DriverResult<ElementRef> {
        let found = self.find_in_page(locator).await?;
        Ok(self.register(found))
    }

    async fn find_elements(&mut self, locator: &Locator) -> DriverResult<Vec<ElementRef>> {
        let found = self.find_all_in_page(locator).await?;
        Ok(found.into_iter().map(|e| self.register(e)).collect())
    }

    async fn find_child(
        &mut self,
        element: &ElementRef,
        locator: &Locator,
    ) -> DriverResult<ElementRef> {
        let found = if *locator == Locator::parent() {
            self.parent_of(element).await?
        } else {
            let css = css_selector(locator)?;
            self.element(element)?
                .find_element(css)
                .await
                .map_err(|e| not_found(locator, e))?
        };
        Ok(self.register(found))
    }

    async fn find_children(
        &mut self,
        element: &ElementRef,
        locator: &Locator,
    ) -> DriverResult<Vec<ElementRef>> {
        let css = css_selector(locator)?;
        let found = self
            .element(element)?
            .find_elements(css)
            .await
            .map_err(|e| not_found(locator, e))?;
        Ok(found.into_iter().map(|e| self.register(e)).collect())
    }

    async fn click(&mut self, element: &ElementRef) -> DriverResult<()> {
        let target = self.element(element)?;
        if js_bool(target, TOGGLE_OPTION_JS, "toggle option").await? {
            return Ok(());
        }
        target.click().await.map_err(command_error("click"))?;
        Ok(())
    }

    async fn attribute(
        &mut self,
        element: &ElementRef,
        name: &str,
    ) -> DriverResult<Option<String>> {
        let target = self.element(element)?;
        let value = match name {
            "innerHTML" => target.inner_html().await,
            _ => target.attribute(name).await,
        };
        value.map_err(command_error("get attribute"))
    }

    async fn text(&mut self, element: &ElementRef) -> DriverResult<String> {
        let text = self
            .element(element)?
            .inner_text()
            .await
            .map_err(command_error("get text"))?;
        Ok(text.unwrap_or_default().trim().to_string())
    }

    async fn is_selected(&mut self, element: &ElementRef) -> DriverResult<bool> {
        js_bool(self.element(element)?, IS_SELECTED_JS, "is selected").await
    }

    async fn is_displayed(&mut self, element: &ElementRef) -> DriverResult<bool> {
        js_bool(self.element(element)?, IS_DISPLAYED_JS, "is displayed").await
    }

    async fn dismiss_alert(&mut self) -> DriverResult<Option<String>> {
        if let Some(text) = self.take_dialog() {
            return Ok(Some(text));
        }
        sleep(DIALOG_GRACE).await;
        Ok(self.take_dialog())
    }

    async fn switch_to_last_window(&mut self) -> DriverResult<()> {
        let current = self.page()?.target_id().clone();
        let pages = self
            .browser
            .pages()
            .await
            .map_err(command_error("list windows"))?;
        let Some(newest) = pages.into_iter().rev().find(|p| *p.target_id() != current) else {
            // The table opened in the same window.
            return Ok(());
        };
        newest
            .wait_for_navigation()
            .await
            .map_err(command_error("wait for table window"))?;
        self.page = Some(newest);
        Ok(())
    }

    async fn quit(mut self) -> DriverResult<()> {
        if let Some(dialogs) = self.dialogs.take() {
            dialogs.abort();
        }

        let closed = self.browser.close().await.map(|_| ());
        if closed.is_err() {
            if let Some(Err(e)) = self.browser.kill().await {
                warn!(error = %e, "Failed to kill Chromium");
            }
        }
        if let Err(e) = self.browser.wait().await {
            warn!(error = %e, "Failed to wait for Chromium to exit");
        }
        self.handler.abort();

        closed.map_err(command_error("close browser"))?;
        debug!("Chromium session closed");
        Ok(())
    }
}

/// Retries `lookup` until `ready` accepts its result or `wait` runs out.
///
/// The last result is returned either way, so an empty lookup still yields
/// its error or empty value after the wait.
async fn poll<T, F, Fut>(wait: Duration, mut lookup: F, ready: fn(&T) -> bool) -> Result<T, CdpError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, CdpError>>,
{
    let deadline = Instant::now() + wait;
    loop {
        let result = lookup().await;
        let done = result.as_ref().map(ready).unwrap_or(false);
        if done || Instant::now() >= deadline {
            return result;
        }
        sleep(POLL_INTERVAL).await;
    }
}

async fn js_bool(element: &Element, function: &str, command: &'static str) -> DriverResult<bool> {
    let returns = element
        .call_js_fn(function, false)
        .await
        .map_err(command_error(command))?;
    returns
        .result
        .value
        .as_ref()
        .and_then(Value::as_bool)
        .ok_or_else(|| DriverError::Protocol(format!("{command}: expected a boolean")))
}

fn css_selector(locator: &Locator) -> DriverResult<String> {
    match locator {
        Locator::Name(name) => Ok(format!("[name=\"{name}\"]")),
        Locator::Id(id) => Ok(format!("[id=\"{id}\"]")),
        Locator::ClassName(class) => Ok(format!(".{class}")),
        Locator::TagName(tag) => Ok(tag.clone()),
        Locator::XPath(_) => Err(DriverError::Command {
            command: "find element".into(),
            message: format!("{locator} is only supported from the page root"),
        }),
    }
}

fn not_found(locator: &Locator, err: CdpError) -> DriverError {
    DriverError::NoSuchElement(format!("{locator}: {err}"))
}

fn command_error(command: &'static str) -> impl Fn(CdpError) -> DriverError {
    move |err| DriverError::Command {
        command: command.to_string(),
        message: err.to_string(),
    }
}
