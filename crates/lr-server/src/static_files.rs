//! Static file serving.
//!
//! Serves the watched directory as-is, plus a small client script that
//! connects a page to the live reload endpoint.

use std::path::Path;
use std::sync::Arc;

use axum::extract::State;
use axum::http::header;
use axum::response::IntoResponse;
use tower_http::services::ServeDir;

use crate::state::AppState;

pub(crate) use lr_config::CLIENT_SCRIPT_PATH;

/// Delay before a page tries to reconnect after losing the socket.
const RECONNECT_DELAY_MS: u32 = 1000;

/// Client script template; `__ENDPOINT__` and `__RECONNECT_MS__` are filled in.
const CLIENT_SCRIPT: &str = r#"(() => {
  const endpoint = __ENDPOINT__;
  const scheme = location.protocol === "https:" ? "wss" : "ws";
  const connect = () => {
    const socket = new WebSocket(`${scheme}://${location.host}${endpoint}`);
    socket.onmessage = (event) => {
      if (event.data === "reload") location.reload();
    };
    socket.onclose = () => setTimeout(connect, __RECONNECT_MS__);
  };
  connect();
})();
"#;

/// Service serving files from `root`, with `index.html` for directories.
pub(crate) fn serve_dir(root: &Path) -> ServeDir {
    ServeDir::new(root)
}

/// Serve the live reload client script.
pub(crate) async fn client_script(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    (
        [(header::CONTENT_TYPE, "text/javascript; charset=utf-8")],
        render_client_script(&state.endpoint),
    )
}

fn render_client_script(endpoint: &str) -> String {
    // A JSON string is a valid JS string literal
    let endpoint = serde_json::Value::from(endpoint).to_string();
    CLIENT_SCRIPT
        .replace("__ENDPOINT__", &endpoint)
        .replace("__RECONNECT_MS__", &RECONNECT_DELAY_MS.to_string())
}
