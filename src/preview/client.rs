use axum::{
    body::Body,
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
};

pub(super) const CLIENT_PATH: &str = "/__kiln/client.js";
pub(super) const RELOAD_PATH: &str = "/__kiln/reload";

pub(super) const CLIENT_SCRIPT: &str = r#"(function () {
  var protocol = location.protocol === "https:" ? "wss:" : "ws:";
  var socket = new WebSocket(protocol + "//" + location.host + "/__kiln/reload");
  socket.addEventListener("message", function (event) {
    var message = JSON.parse(event.data);
    if (message.type === "reload") {
      location.reload();
    }
  });
  socket.addEventListener("close", function () {
    console.info("[kiln] lost connection to the preview server");
  });
})();
"#;

pub(super) async fn client_script() -> impl IntoResponse {
    (
        [(header::CONTENT_TYPE, "text/javascript; charset=utf-8")],
        CLIENT_SCRIPT,
    )
}

/// Adds the reload client to an HTML document, just before `</body>` if there is one.
pub fn inject_client(html: &str) -> String {
    let tag = format!(r#"<script src="{CLIENT_PATH}"></script>"#);
    match html.rfind("</body>") {
        Some(index) => {
            let mut injected = String::with_capacity(html.len() + tag.len());
            injected.push_str(&html[..index]);
            injected.push_str(&tag);
            injected.push_str(&html[index..]);
            injected
        }
        None => format!("{html}{tag}"),
    }
}

/// Response middleware that injects the reload client into served HTML pages
pub(super) async fn inject_reload_client(response: Response) -> Response {
    let is_html = response
        .headers()
        .get(header::CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .map(|value| value.starts_with("text/html"))
        .unwrap_or_default();

    if response.status() != StatusCode::OK || !is_html {
        return response;
    }

    let (mut parts, body) = response.into_parts();
    let bytes = match axum::body::to_bytes(body, usize::MAX).await {
        Ok(bytes) => bytes,
        Err(e) => {
            tracing::warn!("Couldn't read page for reload injection: {e}");
            return (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()).into_response();
        }
    };

    let html = inject_client(&String::from_utf8_lossy(&bytes));
    parts.headers.remove(header::CONTENT_LENGTH);
    parts.headers.insert(
        header::CONTENT_TYPE,
        HeaderValue::from_static("text/html; charset=utf-8"),
    );

    Response::from_parts(parts, Body::from(html))
}
