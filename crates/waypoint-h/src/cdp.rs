//! Chromium process and page lifecycle for the headless surface.

use crate::inject::classify_error;
use chromiumoxide::cdp::browser_protocol::page::{
    EventJavascriptDialogOpening, HandleJavaScriptDialogParams,
};
use chromiumoxide::cdp::js_protocol::runtime::EventConsoleApiCalled;
use chromiumoxide::handler::viewport::Viewport;
use chromiumoxide::{Browser, BrowserConfig, Page};
use futures::StreamExt;
use std::path::PathBuf;
use std::time::{SystemTime, UNIX_EPOCH};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};
use waypoint_engine::config::SurfaceConfig;
use waypoint_engine::surface::SurfaceError;

const CHROME_BIN_ENV: &str = "CHROME_BIN";
const USER_DATA_DIR_ENV: &str = "WAYPOINT_USER_DATA_DIR";

/// The browser profile directory, and whether it is ours to delete.
#[derive(Debug)]
struct Profile {
    dir: PathBuf,
    ephemeral: bool,
}

impl Profile {
    fn resolve(config: &SurfaceConfig) -> Result<Self, SurfaceError> {
        let configured = config
            .user_data_dir
            .clone()
            .or_else(|| std::env::var_os(USER_DATA_DIR_ENV).map(PathBuf::from));

        let profile = match configured {
            Some(dir) => Profile {
                dir,
                ephemeral: false,
            },
            None => {
                let nanos = SystemTime::now()
                    .duration_since(UNIX_EPOCH)
                    .map(|d| d.as_nanos())
                    .unwrap_or_default();
                Profile {
                    dir: std::env::temp_dir().join(format!(
                        "waypoint-profile-{}-{}",
                        std::process::id(),
                        nanos
                    )),
                    ephemeral: true,
                }
            }
        };

        std::fs::create_dir_all(&profile.dir).map_err(|e| {
            SurfaceError::Other(format!(
                "Cannot create profile dir {}: {}",
                profile.dir.display(),
                e
            ))
        })?;
        Ok(profile)
    }

    fn discard(&self) {
        if !self.ephemeral {
            return;
        }
        if let Err(e) = std::fs::remove_dir_all(&self.dir) {
            debug!("Failed to remove profile {}: {}", self.dir.display(), e);
        }
    }
}

fn chrome_executable(config: &SurfaceConfig) -> Option<PathBuf> {
    config
        .chrome_bin
        .clone()
        .or_else(|| std::env::var_os(CHROME_BIN_ENV).map(PathBuf::from))
}

fn browser_config(config: &SurfaceConfig, profile: &Profile) -> Result<BrowserConfig, SurfaceError> {
    let mut builder = BrowserConfig::builder()
        .no_sandbox()
        .user_data_dir(&profile.dir)
        .window_size(config.viewport_width, config.viewport_height)
        .viewport(Viewport {
            width: config.viewport_width,
            height: config.viewport_height,
            ..Default::default()
        });
    if config.visible {
        builder = builder.with_head();
    }
    if let Some(bin) = chrome_executable(config) {
        info!("Using Chrome binary {}", bin.display());
        builder = builder.chrome_executable(bin);
    }
    builder
        .build()
        .map_err(|e| SurfaceError::Other(format!("Invalid browser config: {}", e)))
}

/// One browser with the single page a run drives.
pub struct CdpClient {
    pub browser: Browser,
    pub page: Page,
    handler: JoinHandle<()>,
    profile: Profile,
}

impl CdpClient {
    pub async fn launch(config: &SurfaceConfig) -> Result<Self, SurfaceError> {
        let profile = Profile::resolve(config)?;
        info!(
            "Launching Chromium ({}, {}x{}, profile {})",
            if config.visible { "visible" } else { "headless" },
            config.viewport_width,
            config.viewport_height,
            profile.dir.display()
        );

        let (browser, mut events) = Browser::launch(browser_config(config, &profile)?)
            .await
            .map_err(|e| SurfaceError::Other(format!("Failed to launch browser: {}", e)))?;

        let handler = tokio::spawn(async move {
            while let Some(event) = events.next().await {
                if let Err(e) = event {
                    debug!("CDP handler error: {}", e);
                }
            }
            debug!("CDP handler finished");
        });

        let page = browser
            .new_page("about:blank")
            .await
            .map_err(classify_error)?;
        forward_console(&page).await?;
        accept_js_dialogs(&page).await?;

        Ok(Self {
            browser,
            page,
            handler,
            profile,
        })
    }

    pub async fn close(mut self) -> Result<(), SurfaceError> {
        let closed = self.browser.close().await.map(|_| ()).map_err(classify_error);
        if closed.is_err() {
            self.handler.abort();
        }
        if let Err(e) = self.handler.await
            && !e.is_cancelled()
        {
            warn!("CDP handler task failed: {}", e);
        }
        self.profile.discard();
        closed
    }
}

async fn forward_console(page: &Page) -> Result<(), SurfaceError> {
    let mut calls = page
        .event_listener::<EventConsoleApiCalled>()
        .await
        .map_err(classify_error)?;
    tokio::spawn(async move {
        while let Some(call) = calls.next().await {
            let line: Vec<&str> = call
                .args
                .iter()
                .filter_map(|arg| arg.description.as_deref())
                .collect();
            debug!("page console.{:?}: {}", call.r#type, line.join(" "));
        }
    });
    Ok(())
}

/// alert/confirm/prompt freeze the page until answered, which would stall
/// every evaluation after it.
async fn accept_js_dialogs(page: &Page) -> Result<(), SurfaceError> {
    let mut opened = page
        .event_listener::<EventJavascriptDialogOpening>()
        .await
        .map_err(classify_error)?;
    let page = page.clone();
    tokio::spawn(async move {
        while let Some(dialog) = opened.next().await {
            info!("Accepting JS {:?}: {}", dialog.r#type, dialog.message);
            if let Err(e) = page.execute(HandleJavaScriptDialogParams::new(true)).await {
                warn!("Failed to accept JS dialog: {}", e);
            }
        }
    });
    Ok(())
}
