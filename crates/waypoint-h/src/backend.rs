use crate::cdp::CdpClient;
use crate::inject::{classify_error, execute_command};
use async_trait::async_trait;
use chromiumoxide::cdp::browser_protocol::input::{DispatchKeyEventParams, DispatchKeyEventType};
use chromiumoxide::cdp::browser_protocol::network::{CookieParam, TimeSinceEpoch};
use serde::Deserialize;
use serde_json::json;
use tracing::{info, warn};
use waypoint_engine::config::SurfaceConfig;
use waypoint_engine::protocol::{
    Capture, ClassifiedAction, Cookie, ElementRecord, Gesture, NavigationResult, OriginState,
    Probe, ProbeOutcome, SessionState,
};
use waypoint_engine::surface::{Surface, SurfaceError};

/// A `Surface` backed by a locally launched Chromium driven over CDP.
pub struct HeadlessSurface {
    client: Option<CdpClient>,
    config: SurfaceConfig,
}

#[derive(Debug, Deserialize)]
struct GestureReply {
    #[serde(default)]
    hit: bool,
}

impl HeadlessSurface {
    pub fn new(config: SurfaceConfig) -> Self {
        Self {
            client: None,
            config,
        }
    }

    fn page(&self) -> Result<&chromiumoxide::Page, SurfaceError> {
        self.client
            .as_ref()
            .map(|c| &c.page)
            .ok_or(SurfaceError::NotReady)
    }

    async fn get_navigation_result(
        page: &chromiumoxide::Page,
    ) -> Result<NavigationResult, SurfaceError> {
        let title = page
            .get_title()
            .await
            .unwrap_or_default()
            .unwrap_or_default();
        let url = page
            .url()
            .await
            .map_err(classify_error)?
            .unwrap_or_default();
        Ok(NavigationResult {
            url,
            title,
            status: 200,
        })
    }

    async fn press_key(&self, key: &str) -> Result<(), SurfaceError> {
        let page = self.page()?;

        for event_type in [DispatchKeyEventType::KeyDown, DispatchKeyEventType::KeyUp] {
            let event = DispatchKeyEventParams::builder()
                .r#type(event_type)
                .key(key)
                .build()
                .map_err(|e| SurfaceError::Other(format!("Failed to build key event: {:?}", e)))?;
            page.execute(event).await.map_err(classify_error)?;
        }

        Ok(())
    }

    async fn apply_local_storage(&self, origin: &OriginState) -> Result<(), SurfaceError> {
        if origin.local_storage.is_empty() {
            return Ok(());
        }
        let page = self.page()?;
        page.goto(origin.origin.as_str())
            .await
            .map_err(|e| SurfaceError::Navigation(e.to_string()))?;

        for entry in &origin.local_storage {
            let script = format!(
                "window.localStorage.setItem({}, {})",
                serde_json::to_string(&entry.name)?,
                serde_json::to_string(&entry.value)?
            );
            page.evaluate(script).await.map_err(classify_error)?;
        }
        Ok(())
    }
}

fn cookie_param(cookie: &Cookie) -> Option<CookieParam> {
    let mut builder = CookieParam::builder()
        .name(cookie.name.clone())
        .value(cookie.value.clone());
    if let Some(domain) = &cookie.domain {
        builder = builder.domain(domain.clone());
    }
    if let Some(path) = &cookie.path {
        builder = builder.path(path.clone());
    }
    if let Some(expires) = cookie.expires
        && expires > 0.0
    {
        builder = builder.expires(TimeSinceEpoch::new(expires));
    }
    if let Some(http_only) = cookie.http_only {
        builder = builder.http_only(http_only);
    }
    if let Some(secure) = cookie.secure {
        builder = builder.secure(secure);
    }
    builder.build().ok()
}

#[async_trait]
impl Surface for HeadlessSurface {
    async fn launch(&mut self) -> Result<(), SurfaceError> {
        info!("Launching headless surface (Chromium)...");
        self.client = Some(CdpClient::launch(&self.config).await?);
        Ok(())
    }

    async fn close(&mut self) -> Result<(), SurfaceError> {
        if let Some(client) = self.client.take() {
            client.close().await?;
        }
        Ok(())
    }

    async fn is_ready(&self) -> bool {
        self.client.is_some()
    }

    async fn navigate(&mut self, url: &str) -> Result<NavigationResult, SurfaceError> {
        let page = self.page()?;

        info!("Navigating to: {}", url);
        page.goto(url)
            .await
            .map_err(|e| SurfaceError::Navigation(e.to_string()))?;

        Self::get_navigation_result(page).await
    }

    async fn restore_session(&mut self, session: &SessionState) -> Result<(), SurfaceError> {
        let page = self.page()?;

        let cookies: Vec<CookieParam> = session
            .cookies
            .iter()
            .filter_map(|c| {
                let param = cookie_param(c);
                if param.is_none() {
                    warn!("Skipping malformed session cookie '{}'", c.name);
                }
                param
            })
            .collect();
        if !cookies.is_empty() {
            info!("Restoring {} session cookies", cookies.len());
            page.set_cookies(cookies).await.map_err(classify_error)?;
        }

        for origin in &session.origins {
            if let Err(e) = self.apply_local_storage(origin).await {
                if e.is_fatal() {
                    return Err(e);
                }
                warn!("Could not restore storage for {}: {}", origin.origin, e);
            }
        }
        Ok(())
    }

    async fn current_url(&mut self) -> Result<String, SurfaceError> {
        let page = self.page()?;
        Ok(page.url().await.map_err(classify_error)?.unwrap_or_default())
    }

    async fn capture(&mut self) -> Result<Capture, SurfaceError> {
        let page = self.page()?;
        let data = execute_command(page, json!({ "op": "capture" })).await?;
        Ok(serde_json::from_value(data)?)
    }

    async fn perform(
        &mut self,
        element: &ElementRecord,
        action: &ClassifiedAction,
    ) -> Result<(), SurfaceError> {
        let page = self.page()?;
        let data = execute_command(
            page,
            json!({ "op": "perform", "element": element, "action": action }),
        )
        .await?;
        tracing::debug!("perform resolved via {}", data["used"]);
        Ok(())
    }

    async fn probe(&mut self, probe: &Probe) -> Result<ProbeOutcome, SurfaceError> {
        let page = self.page()?;
        let data = execute_command(page, json!({ "op": "probe", "probe": probe })).await?;
        Ok(serde_json::from_value(data)?)
    }

    async fn gesture(&mut self, gesture: &Gesture) -> Result<bool, SurfaceError> {
        if let Gesture::PressKey { key } = gesture {
            self.press_key(key).await?;
            return Ok(true);
        }
        let page = self.page()?;
        let data = execute_command(page, json!({ "op": "gesture", "gesture": gesture })).await?;
        let reply: GestureReply = serde_json::from_value(data)?;
        Ok(reply.hit)
    }

    async fn screenshot(&mut self) -> Result<Vec<u8>, SurfaceError> {
        let page = self.page()?;
        page.screenshot(
            chromiumoxide::page::ScreenshotParams::builder()
                .full_page(true)
                .build(),
        )
        .await
        .map_err(|e| match classify_error(&e) {
            SurfaceError::Script(_) => SurfaceError::Other(format!("Screenshot failed: {}", e)),
            fatal => fatal,
        })
    }
}
