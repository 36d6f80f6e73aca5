use chromiumoxide::cdp::browser_protocol::page::{
    EventJavascriptDialogOpening, HandleJavaScriptDialogParams,
};
use chromiumoxide::cdp::js_protocol::runtime::EventConsoleApiCalled;
use chromiumoxide::{Browser, BrowserConfig, Page};
use futures::StreamExt;
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};
use tokio::task::JoinHandle;

pub type CdpError = Box<dyn std::error::Error + Send + Sync>;

pub struct CdpClient {
    pub browser: Browser,
    pub handler_task: JoinHandle<()>,
    pub page: Page,
    user_data_dir: PathBuf,
    cleanup_user_data_dir: bool,
}

impl CdpClient {
    /// Starts Chromium with one blank tab.
    ///
    /// A profile directory passed in (or set through `HIREBOT_USER_DATA_DIR`)
    /// is kept after close so the hiring site session survives restarts.
    pub async fn launch(visible: bool, profile: Option<&Path>) -> Result<Self, CdpError> {
        let mut config_builder = BrowserConfig::builder();
        config_builder = config_builder.no_sandbox();
        let (user_data_dir, cleanup_user_data_dir) = resolve_user_data_dir(profile)?;
        config_builder = config_builder.user_data_dir(&user_data_dir);

        if visible {
            tracing::info!("Launching browser in visible mode");
            config_builder = config_builder.with_head();
        } else {
            tracing::info!("Launching browser in headless mode");
        }

        if let Ok(chrome_bin) = std::env::var("CHROME_BIN") {
            tracing::info!("Using custom Chrome binary: {}", chrome_bin);
            config_builder = config_builder.chrome_executable(chrome_bin);
        }

        let (browser, mut handler) = Browser::launch(
            config_builder
                .build()
                .map_err(|e| format!("Failed to build browser config: {}", e))?,
        )
        .await
        .map_err(|e| format!("Failed to launch browser: {}", e))?;

        let handler_task = tokio::spawn(async move {
            while let Some(h) = handler.next().await {
                if let Err(e) = h {
                    tracing::error!("Browser handler error (ignoring): {}", e);
                }
            }
            tracing::info!("Browser handler task ended");
        });

        let page = browser
            .new_page("about:blank")
            .await
            .map_err(|e| format!("Failed to create page: {}", e))?;
        attach_listeners(&page).await?;

        Ok(Self {
            browser,
            handler_task,
            page,
            user_data_dir,
            cleanup_user_data_dir,
        })
    }

    /// Opens a new tab at `url` with the same listeners as the first one.
    pub async fn new_tab(&self, url: &str) -> Result<Page, CdpError> {
        let page = self
            .browser
            .new_page(url)
            .await
            .map_err(|e| format!("Failed to open tab: {}", e))?;
        attach_listeners(&page).await?;
        Ok(page)
    }

    pub async fn close(mut self) -> Result<(), CdpError> {
        self.browser
            .close()
            .await
            .map_err(|e| format!("Error closing browser: {}", e))?;
        self.handler_task
            .await
            .map_err(|e| format!("Error awaiting handler: {}", e))?;

        if self.cleanup_user_data_dir {
            if let Err(e) = std::fs::remove_dir_all(&self.user_data_dir) {
                tracing::debug!(
                    "Failed to clean up user-data-dir {}: {}",
                    self.user_data_dir.display(),
                    e
                );
            }
        }

        Ok(())
    }
}

/// Mirrors page console output into the log and auto-accepts dialogs, which
/// would otherwise block every evaluation on the page.
async fn attach_listeners(page: &Page) -> Result<(), CdpError> {
    let mut console_events = page
        .event_listener::<EventConsoleApiCalled>()
        .await
        .map_err(|e| format!("Failed to subscribe to console events: {}", e))?;

    tokio::spawn(async move {
        while let Some(event) = console_events.next().await {
            let args: Vec<String> = event
                .args
                .iter()
                .map(|arg| {
                    arg.description
                        .clone()
                        .or_else(|| arg.value.as_ref().map(|v| v.to_string()))
                        .unwrap_or_else(|| "unknown".to_string())
                })
                .collect();
            tracing::debug!("Browser Console [{:?}]: {}", event.r#type, args.join(" "));
        }
    });

    let mut dialog_events = page
        .event_listener::<EventJavascriptDialogOpening>()
        .await
        .map_err(|e| format!("Failed to subscribe to dialog events: {}", e))?;

    let dialog_page = page.clone();
    tokio::spawn(async move {
        while let Some(event) = dialog_events.next().await {
            tracing::info!(
                "Accepting JavaScript dialog: {} ({:?})",
                event.message,
                event.r#type
            );
            let cmd = HandleJavaScriptDialogParams::new(true);
            if let Err(e) = dialog_page.execute(cmd).await {
                tracing::error!("Failed to accept dialog: {}", e);
            }
        }
    });

    Ok(())
}

fn resolve_user_data_dir(profile: Option<&Path>) -> Result<(PathBuf, bool), CdpError> {
    let configured = profile
        .map(Path::to_path_buf)
        .or_else(|| std::env::var("HIREBOT_USER_DATA_DIR").ok().map(PathBuf::from));
    if let Some(path) = configured {
        std::fs::create_dir_all(&path)?;
        tracing::info!("Using persistent user data dir: {}", path.display());
        return Ok((path, false));
    }

    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_err(|e| format!("System clock error: {}", e))?
        .as_nanos();
    let unique = format!("hirebot-chromium-profile-{}-{}", std::process::id(), nanos);
    let path = std::env::temp_dir().join(unique);
    std::fs::create_dir_all(&path)?;
    tracing::info!("Using isolated user data dir: {}", path.display());
    Ok((path, true))
}
