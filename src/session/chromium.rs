//! Chromium-backed site session using chromiumoxide.
//!
//! One headless browser, one page, driven through injected JavaScript for
//! element interaction. Every wait is bounded by `tokio::time::timeout`
//! and surfaces as `SessionError::Timeout` instead of blocking.

use super::locators;
use super::settle::{self, SettleOp};
use super::{ResultProbe, SessionError, SitePort};
use crate::config::FetchConfig;
use crate::model::{InvestorType, JurisdictionProfile};
use anyhow::{Context, Result};
use async_trait::async_trait;
use chromiumoxide::browser::{Browser, BrowserConfig};
use chromiumoxide::page::Page;
use futures::StreamExt;
use std::path::PathBuf;
use std::time::Duration;

/// Poll interval for element-appearance waits.
const POLL_INTERVAL: Duration = Duration::from_millis(250);

/// How long `readyState == "complete"` must hold to count as settled.
const SETTLE_WINDOW: Duration = Duration::from_millis(500);

/// Find the Chromium binary path.
pub fn find_chromium() -> Option<PathBuf> {
    // 1. FACTFETCH_CHROMIUM_PATH env
    if let Ok(p) = std::env::var("FACTFETCH_CHROMIUM_PATH") {
        let path = PathBuf::from(&p);
        if path.exists() {
            return Some(path);
        }
    }

    // 2. ~/.factfetch/chromium/
    if let Some(home) = dirs::home_dir() {
        let candidates = if cfg!(target_os = "macos") {
            vec![
                home.join(".factfetch/chromium/Google Chrome for Testing.app/Contents/MacOS/Google Chrome for Testing"),
                home.join(".factfetch/chromium/chrome"),
            ]
        } else {
            vec![
                home.join(".factfetch/chromium/chrome-linux64/chrome"),
                home.join(".factfetch/chromium/chrome"),
            ]
        };
        for c in candidates {
            if c.exists() {
                return Some(c);
            }
        }
    }

    // 3. System PATH
    for name in ["google-chrome", "chromium", "chromium-browser"] {
        if let Ok(path) = which::which(name) {
            return Some(path);
        }
    }

    // 4. Common macOS location
    if cfg!(target_os = "macos") {
        let common =
            PathBuf::from("/Applications/Google Chrome.app/Contents/MacOS/Google Chrome");
        if common.exists() {
            return Some(common);
        }
    }

    None
}

/// Script testing that a selector matches a rendered element. Visibility
/// is judged by client rects, not `offsetParent` — fixed-position elements
/// (cookie banners, overlays) have no offsetParent while fully visible.
fn selector_visible_script(selector: &str) -> String {
    format!(
        r#"(() => {{
            const el = document.querySelector('{}');
            return !!el && el.getClientRects().length > 0;
        }})()"#,
        sanitize_js_string(selector)
    )
}

/// Escape a value for injection into a single-quoted JS string literal.
fn sanitize_js_string(s: &str) -> String {
    s.replace('\\', "\\\\")
        .replace('\'', "\\'")
        .replace('"', "\\\"")
        .replace('\n', "\\n")
        .replace('\r', "\\r")
}

/// A live Chromium page against the fund site.
pub struct ChromiumSession {
    // Dropping the browser tears the whole session down; keep it alive for
    // the page's lifetime.
    _browser: Browser,
    page: Page,
    short_wait: Duration,
    idle_wait: Duration,
    idle_reload_attempts: u32,
}

impl ChromiumSession {
    /// Launch headless Chromium and open a blank page.
    ///
    /// Failure here is batch-fatal — no session, no run.
    pub async fn launch(cfg: &FetchConfig) -> Result<Self> {
        let chrome_path =
            find_chromium().context("Chromium not found. See `factfetch doctor`.")?;

        let browser_config = BrowserConfig::builder()
            .chrome_executable(chrome_path)
            .arg("--headless=new")
            .arg("--disable-gpu")
            .arg("--no-sandbox")
            .arg("--disable-dev-shm-usage")
            .arg("--disable-extensions")
            .arg("--disable-background-networking")
            .build()
            .map_err(|e| anyhow::anyhow!("failed to build browser config: {e}"))?;

        let (browser, mut handler) = Browser::launch(browser_config)
            .await
            .context("failed to launch Chromium")?;

        // Drain CDP events for the browser's lifetime.
        tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                let _ = event;
            }
        });

        let page = browser
            .new_page("about:blank")
            .await
            .context("failed to create page")?;

        Ok(Self {
            _browser: browser,
            page,
            short_wait: Duration::from_millis(cfg.short_wait_timeout_ms),
            idle_wait: Duration::from_millis(cfg.network_idle_timeout_ms),
            idle_reload_attempts: cfg.idle_reload_attempts,
        })
    }

    /// Evaluate JS in the page, mapping driver failures.
    async fn eval(&self, op: &'static str, script: &str) -> Result<serde_json::Value, SessionError> {
        let result = self.page.evaluate(script).await.map_err(|e| {
            SessionError::Driver {
                op,
                message: e.to_string(),
            }
        })?;
        result.into_value().map_err(|e| SessionError::Driver {
            op,
            message: format!("failed to convert JS result: {e:?}"),
        })
    }

    /// Poll until a selector matches a visible element, bounded by the
    /// short wait.
    async fn wait_for_selector(
        &self,
        op: &'static str,
        selector: &str,
    ) -> Result<(), SessionError> {
        let script = selector_visible_script(selector);

        let waited = tokio::time::timeout(self.short_wait, async {
            loop {
                if let Ok(v) = self.eval(op, &script).await {
                    if v.as_bool().unwrap_or(false) {
                        return;
                    }
                }
                tokio::time::sleep(POLL_INTERVAL).await;
            }
        })
        .await;

        waited.map_err(|_| SessionError::Timeout { op })
    }

    /// Wait for a selector, then click it.
    async fn click(&self, op: &'static str, selector: &str) -> Result<(), SessionError> {
        self.wait_for_selector(op, selector).await?;
        let script = format!(
            r#"(() => {{
                const el = document.querySelector('{}');
                if (el) {{ el.click(); return true; }}
                return false;
            }})()"#,
            sanitize_js_string(selector)
        );
        let clicked = self.eval(op, &script).await?;
        if clicked.as_bool().unwrap_or(false) {
            Ok(())
        } else {
            Err(SessionError::Timeout { op })
        }
    }

    /// Set an input's value and fire an input event.
    async fn fill(
        &self,
        op: &'static str,
        selector: &str,
        value: &str,
    ) -> Result<(), SessionError> {
        let script = format!(
            r#"(() => {{
                const el = document.querySelector('{}');
                if (el) {{
                    el.value = '{}';
                    el.dispatchEvent(new Event('input', {{ bubbles: true }}));
                    return true;
                }}
                return false;
            }})()"#,
            sanitize_js_string(selector),
            sanitize_js_string(value)
        );
        let filled = self.eval(op, &script).await?;
        if filled.as_bool().unwrap_or(false) {
            Ok(())
        } else {
            Err(SessionError::Timeout { op })
        }
    }

    async fn goto(&self, op: &'static str, url: &str) -> Result<(), SessionError> {
        let nav = tokio::time::timeout(self.idle_wait, self.page.goto(url)).await;
        match nav {
            Ok(Ok(_)) => {
                // Best effort: let the load event fire before returning.
                let _ = self.page.wait_for_navigation().await;
                Ok(())
            }
            Ok(Err(e)) => Err(SessionError::Driver {
                op,
                message: e.to_string(),
            }),
            Err(_) => Err(SessionError::Timeout { op }),
        }
    }

    /// Wait until `document.readyState` is "complete" and stays that way
    /// across the settle window, reloading between timed-out waits up to
    /// `idle_reload_attempts` times. Returns false once the budget is
    /// spent — callers degrade to "no result" rather than erroring.
    async fn wait_until_settled(&mut self) -> Result<bool, SessionError> {
        let max_reloads = self.idle_reload_attempts;
        let mut op = PageSettle { session: self };
        settle::settle_with_reloads(&mut op, max_reloads).await
    }

    async fn ready_state_complete(&self, op: &'static str) -> Result<bool, SessionError> {
        let v = self.eval(op, "document.readyState").await?;
        Ok(v.as_str() == Some("complete"))
    }

    /// Resolve a possibly relative href against the page's current URL.
    async fn absolute_link(&self, op: &'static str, href: &str) -> Result<String, SessionError> {
        if url::Url::parse(href).is_ok() {
            return Ok(href.to_string());
        }
        let current = self
            .page
            .url()
            .await
            .map_err(|e| SessionError::Driver {
                op,
                message: e.to_string(),
            })?
            .map(|u| u.to_string())
            .unwrap_or_default();
        let base = url::Url::parse(&current).map_err(|e| SessionError::Driver {
            op,
            message: format!("bad page url {current:?}: {e}"),
        })?;
        let joined = base.join(href).map_err(|e| SessionError::Driver {
            op,
            message: format!("cannot resolve link {href:?}: {e}"),
        })?;
        Ok(joined.to_string())
    }
}

/// Adapts one page to the settle/reload recovery loop.
struct PageSettle<'a> {
    session: &'a mut ChromiumSession,
}

#[async_trait]
impl SettleOp for PageSettle<'_> {
    async fn wait(&mut self) -> Result<bool, SessionError> {
        let waited = tokio::time::timeout(self.session.idle_wait, async {
            loop {
                if self.session.ready_state_complete("resolve_result_link").await? {
                    tokio::time::sleep(SETTLE_WINDOW).await;
                    if self.session.ready_state_complete("resolve_result_link").await? {
                        return Ok::<(), SessionError>(());
                    }
                }
                tokio::time::sleep(POLL_INTERVAL).await;
            }
        })
        .await;

        match waited {
            Ok(Ok(())) => Ok(true),
            Ok(Err(e)) => Err(e),
            Err(_) => Ok(false),
        }
    }

    async fn reload(&mut self) -> Result<(), SessionError> {
        SitePort::reload(self.session).await
    }
}

#[async_trait]
impl SitePort for ChromiumSession {
    async fn open(&mut self, base_url: &str) -> Result<(), SessionError> {
        self.goto("open", base_url).await
    }

    async fn dismiss_consent_if_present(&mut self) -> Result<(), SessionError> {
        // Best effort: the banner may legitimately never appear.
        match self
            .wait_for_selector("dismiss_consent", locators::ACCEPT_ALL_BUTTON)
            .await
        {
            Ok(()) => {
                self.click("dismiss_consent", locators::ACCEPT_ALL_BUTTON)
                    .await?;
                tracing::debug!("dismissed cookie banner");
                Ok(())
            }
            Err(SessionError::Timeout { .. }) => {
                tracing::debug!("no cookie banner within wait, moving on");
                Ok(())
            }
            Err(e) => Err(e),
        }
    }

    async fn select_jurisdiction(
        &mut self,
        profile: &JurisdictionProfile,
    ) -> Result<(), SessionError> {
        const OP: &str = "select_jurisdiction";

        let country_item = locators::country_item(&profile.country_code);

        self.click(OP, locators::INVESTOR_COUNTRY_BUTTON).await?;
        self.wait_for_selector(OP, &country_item).await?;
        self.click(OP, locators::COUNTRY_SELECTOR).await?;
        self.click(OP, &country_item).await?;

        match profile.investor_type {
            InvestorType::Professional => {
                self.click(OP, locators::PROFESSIONAL_INVESTOR_LABEL).await
            }
        }
    }

    async fn accept_terms(&mut self) -> Result<(), SessionError> {
        const OP: &str = "accept_terms";
        self.click(OP, locators::TOS_CHECKBOX).await?;
        self.click(OP, locators::CONFIRM_BUTTON).await
    }

    async fn search(&mut self, isin: &str) -> Result<(), SessionError> {
        const OP: &str = "search";
        self.wait_for_selector(OP, locators::SEARCH_INPUT_CONTAINER)
            .await?;
        self.click(OP, locators::SEARCH_INPUT_CONTAINER).await?;
        self.fill(OP, locators::SEARCH_INPUT, isin).await?;
        self.click(OP, locators::SEARCH_BUTTON).await
    }

    async fn resolve_result_link(&mut self) -> Result<ResultProbe, SessionError> {
        const OP: &str = "resolve_result_link";

        // A page that never settles is treated as an empty result list so
        // the caller's fallback loop still gets to try other jurisdictions.
        if !self.wait_until_settled().await? {
            return Ok(ResultProbe::NoResult);
        }

        let probe_script = format!(
            r#"(() => {{
                if (document.querySelector('{not_member}')) {{
                    return {{ kind: "denied" }};
                }}
                const row = document.querySelector('{row}');
                if (!row || row.getClientRects().length === 0) {{
                    return {{ kind: "empty" }};
                }}
                if (row.getAttribute('data-empty') === 'true') {{
                    return {{ kind: "empty" }};
                }}
                return {{ kind: "present" }};
            }})()"#,
            not_member = sanitize_js_string(locators::NOT_MEMBER_ROW),
            row = sanitize_js_string(locators::RESULT_ROW),
        );

        let probe = self.eval(OP, &probe_script).await?;
        match probe.get("kind").and_then(|k| k.as_str()) {
            Some("denied") => return Ok(ResultProbe::AccessDenied),
            Some("present") => {}
            _ => return Ok(ResultProbe::NoResult),
        }

        // The href is populated lazily; a hover on the row reveals it.
        let reveal_script = format!(
            r#"(() => {{
                const row = document.querySelector('{row}');
                if (row) {{
                    row.dispatchEvent(new MouseEvent('mouseover', {{ bubbles: true }}));
                }}
                const link = document.querySelector('{link}');
                return link ? link.getAttribute('href') : null;
            }})()"#,
            row = sanitize_js_string(locators::RESULT_ROW),
            link = sanitize_js_string(locators::PDF_LINK),
        );

        let href = self.eval(OP, &reveal_script).await?;
        match href.as_str() {
            Some(link) if !link.is_empty() => Ok(ResultProbe::Document(
                self.absolute_link(OP, link).await?,
            )),
            _ => Ok(ResultProbe::NoResult),
        }
    }

    async fn reload(&mut self) -> Result<(), SessionError> {
        const OP: &str = "reload";
        let nav = tokio::time::timeout(self.idle_wait, self.page.reload()).await;
        match nav {
            Ok(Ok(_)) => Ok(()),
            Ok(Err(e)) => Err(SessionError::Driver {
                op: OP,
                message: e.to_string(),
            }),
            Err(_) => Err(SessionError::Timeout { op: OP }),
        }
    }

    async fn close(self: Box<Self>) -> Result<(), SessionError> {
        let _ = self.page.close().await;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_visibility_check_handles_fixed_elements() {
        // offsetParent is null for position:fixed elements (cookie banners
        // typically are), so the check must go through client rects.
        let script = selector_visible_script("#qc-cmp2-ui button[mode='primary']");
        assert!(script.contains("getClientRects().length > 0"));
        assert!(!script.contains("offsetParent"));
        assert!(script.contains("button[mode=\\'primary\\']"));
    }

    #[test]
    fn test_sanitize_js_string() {
        assert_eq!(sanitize_js_string("plain"), "plain");
        assert_eq!(sanitize_js_string("a'b"), "a\\'b");
        assert_eq!(sanitize_js_string("a\\b"), "a\\\\b");
        assert_eq!(sanitize_js_string("a\nb"), "a\\nb");
    }

    #[tokio::test]
    #[ignore] // Requires Chromium to be installed
    async fn test_launch_and_open() {
        let cfg = FetchConfig::default();
        let mut session = ChromiumSession::launch(&cfg)
            .await
            .expect("failed to launch");
        session
            .open("data:text/html,<h1>Hello</h1>")
            .await
            .expect("open failed");
        Box::new(session).close().await.expect("close failed");
    }
}
