use std::{
    borrow::Cow,
    collections::BTreeMap,
    sync::{
        PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard,
        atomic::{AtomicU64, Ordering},
    },
};

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use tauri::{
    AppHandle, Manager as _, Runtime, UriSchemeContext, WebviewUrl, WebviewWindowBuilder,
    http::{
        Request, Response, StatusCode,
        header::{CONTENT_TYPE, HeaderValue},
    },
    plugin::PluginApi,
};
use youtube_player_models::PlayerOptions;
use youtube_player_webview::{HostError, ScriptHost, WebViewBackend, cookies::Cookie};

/// Scheme the player documents are served from.
pub const URI_SCHEME: &str = "ytplayer";

const LABEL_PREFIX: &str = "youtube-player-";

/// Posts every document message to the `bridge_message` command.
const MESSAGE_HANDLER: &str = r#"function (message) {
  window.__TAURI_INTERNALS__.invoke("plugin:youtube-player|bridge_message", { message: message });
}"#;

pub type Backend<R> = WebViewBackend<TauriScriptHost<R>>;

pub fn init<R: Runtime, C: DeserializeOwned>(
    app: &AppHandle<R>,
    _api: &PluginApi<R, C>,
) -> Backend<R> {
    WebViewBackend::new(TauriScriptHost::new(app.clone()), MESSAGE_HANDLER)
}

struct HostedSurface {
    label: String,
    document: String,
}

/// Shows each player in its own webview window.
pub struct TauriScriptHost<R: Runtime> {
    app: AppHandle<R>,
    next_label: AtomicU64,
    surfaces: RwLock<BTreeMap<String, HostedSurface>>,
}

impl<R: Runtime> TauriScriptHost<R> {
    const fn new(app: AppHandle<R>) -> Self {
        Self {
            app,
            next_label: AtomicU64::new(1),
            surfaces: RwLock::new(BTreeMap::new()),
        }
    }

    fn read_surfaces(&self) -> RwLockReadGuard<'_, BTreeMap<String, HostedSurface>> {
        self.surfaces.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write_surfaces(&self) -> RwLockWriteGuard<'_, BTreeMap<String, HostedSurface>> {
        self.surfaces.write().unwrap_or_else(PoisonError::into_inner)
    }

    /// Document of `player_id`, as served to its window.
    #[must_use]
    pub fn document(&self, player_id: &str) -> Option<String> {
        self.read_surfaces()
            .get(player_id)
            .map(|x| x.document.clone())
    }

    /// Player hosted by the window labelled `label`.
    #[must_use]
    pub fn player_for_label(&self, label: &str) -> Option<String> {
        self.read_surfaces()
            .iter()
            .find(|(_, x)| x.label == label)
            .map(|(id, _)| id.clone())
    }

    fn label(&self, player_id: &str) -> Result<String, HostError> {
        self.read_surfaces()
            .get(player_id)
            .map(|x| x.label.clone())
            .ok_or_else(|| HostError(format!("No window for player '{player_id}'")))
    }
}

fn document_url(player_id: &str) -> Result<tauri::Url, HostError> {
    let path = urlencoding::encode(player_id);

    #[cfg(any(windows, target_os = "android"))]
    let url = format!("http://{URI_SCHEME}.localhost/{path}");
    #[cfg(not(any(windows, target_os = "android")))]
    let url = format!("{URI_SCHEME}://localhost/{path}");

    url.parse::<tauri::Url>()
        .map_err(|e| HostError(format!("Invalid document url {url}: {e}")))
}

#[async_trait]
impl<R: Runtime> ScriptHost for TauriScriptHost<R> {
    async fn open_surface(
        &self,
        options: &PlayerOptions,
        document: String,
    ) -> Result<(), HostError> {
        let player_id = &options.player_id;
        let label = format!(
            "{LABEL_PREFIX}{}",
            self.next_label.fetch_add(1, Ordering::Relaxed)
        );
        let url = document_url(player_id)?;

        self.write_surfaces().insert(
            player_id.clone(),
            HostedSurface {
                label: label.clone(),
                document,
            },
        );

        let mut builder =
            WebviewWindowBuilder::new(&self.app, &label, WebviewUrl::CustomProtocol(url))
                .title(format!("YouTube player {player_id}"))
                .fullscreen(options.is_fullscreen())
                .incognito(options.is_privacy_enhanced());

        let size = options.player_size;
        if size.width > 0 && size.height > 0 {
            builder = builder.inner_size(f64::from(size.width), f64::from(size.height));
        }

        if let Err(e) = builder.build() {
            self.write_surfaces().remove(player_id);
            return Err(HostError(format!(
                "Failed to open window for player '{player_id}': {e}"
            )));
        }

        log::debug!("open_surface: player_id={player_id} label={label}");

        Ok(())
    }

    async fn evaluate(&self, player_id: &str, script: &str) -> Result<(), HostError> {
        let label = self.label(player_id)?;
        let window = self
            .app
            .get_webview_window(&label)
            .ok_or_else(|| HostError(format!("Window of player '{player_id}' was closed")))?;

        window
            .eval(script)
            .map_err(|e| HostError(format!("Failed to evaluate script: {e}")))
    }

    async fn close_surface(&self, player_id: &str) -> Result<(), HostError> {
        let Some(surface) = self.write_surfaces().remove(player_id) else {
            return Ok(());
        };

        if let Some(window) = self.app.get_webview_window(&surface.label) {
            window
                .destroy()
                .map_err(|e| HostError(format!("Failed to close window: {e}")))?;
        }

        Ok(())
    }

    async fn set_cookies(&self, player_id: &str, cookies: &[Cookie]) -> Result<(), HostError> {
        log::debug!(
            "set_cookies: player_id={player_id} dropping {} cookie(s)",
            cookies.len()
        );
        Err(HostError(
            "Setting cookies is not supported by desktop webviews".to_string(),
        ))
    }
}

fn respond(status: StatusCode, content_type: &'static str, body: Vec<u8>) -> Response<Vec<u8>> {
    let mut response = Response::new(body);
    *response.status_mut() = status;
    response
        .headers_mut()
        .insert(CONTENT_TYPE, HeaderValue::from_static(content_type));
    response
}

/// Serves `ytplayer://localhost/<player id>`.
pub fn serve_document<R: Runtime>(
    ctx: UriSchemeContext<'_, R>,
    request: Request<Vec<u8>>,
) -> Response<Vec<u8>> {
    let path = request.uri().path().trim_start_matches('/');
    let player_id = urlencoding::decode(path).unwrap_or(Cow::Borrowed(path));

    let document = ctx
        .app_handle()
        .try_state::<crate::YoutubePlayer<R>>()
        .and_then(|player| player.bridge().backend().host().document(&player_id));

    document.map_or_else(
        || {
            log::debug!("serve_document: no document for player_id={player_id}");
            respond(
                StatusCode::NOT_FOUND,
                "text/plain; charset=utf-8",
                b"Player not found".to_vec(),
            )
        },
        |document| {
            respond(
                StatusCode::OK,
                "text/html; charset=utf-8",
                document.into_bytes(),
            )
        },
    )
}
