use std::borrow::Cow;
use std::error::Error;

use rust_embed::Embed;
use wry::http::header::CONTENT_TYPE;
use wry::http::{Request, Response};

/// Scheme the bundled dialog pages are served under.
pub const PROTOCOL: &str = "app";

pub const BRIDGE_SCRIPT: &str = "bridge.js";

#[derive(Embed)]
#[folder = "static"]
struct Asset;

/// URL for a bundled page. WebView2 and Android only accept custom schemes
/// through the `http://<scheme>.localhost` form.
pub fn local_url(path: &str) -> String {
    if cfg!(any(target_os = "windows", target_os = "android")) {
        format!("http://{}.localhost/{}", PROTOCOL, path)
    } else {
        format!("{}://localhost/{}", PROTOCOL, path)
    }
}

pub fn text(path: &str) -> Result<String, Box<dyn Error>> {
    let asset =
        Asset::get(path).ok_or_else(|| format!("Asset not found: {}", path))?;
    Ok(String::from_utf8(asset.data.into_owned())?)
}

pub fn serve(
    request: Request<Vec<u8>>,
) -> Result<Response<Vec<u8>>, Box<dyn Error>> {
    let uri_path = request.uri().path();
    let path = uri_path.trim_start_matches('/');

    let asset =
        Asset::get(path).ok_or_else(|| format!("Asset not found: {}", path))?;

    Response::builder()
        .header(CONTENT_TYPE, mimetype(path))
        .body(asset.data.into_owned())
        .map_err(Into::into)
}

/// Never fails; a missing asset becomes a plain-text 404.
pub fn respond(request: Request<Vec<u8>>) -> Response<Cow<'static, [u8]>> {
    match serve(request) {
        Ok(response) => response.map(Into::into),
        Err(err) => {
            let mut response = Response::new(err.to_string().into_bytes());
            *response.status_mut() = wry::http::StatusCode::NOT_FOUND;
            response.headers_mut().insert(
                CONTENT_TYPE,
                wry::http::HeaderValue::from_static("text/plain"),
            );
            response.map(Into::into)
        }
    }
}

fn mimetype(path: &str) -> &'static str {
    if path.ends_with(".html") {
        "text/html"
    } else if path.ends_with(".js") {
        "text/javascript"
    } else if path.ends_with(".css") {
        "text/css"
    } else {
        "application/octet-stream"
    }
}
