//! Static file terminal.
//!
//! # Responsibilities
//! - Map a request path onto the domain's static root without escaping it
//! - Serve files as streams with type, length and caching headers
//! - Serve `index.html` or a generated listing for directories
//!
//! # Design Decisions
//! - Decoding happens before the traversal check, so `%2e%2e` is caught too
//! - Any `..` segment, backslash or NUL is refused outright, never normalized

use std::io;
use std::path::{Path, PathBuf};

use axum::body::Body;
use axum::http::{header, HeaderValue, StatusCode, Uri};
use axum::response::Response;
use bytes::BytesMut;
use percent_encoding::{percent_decode_str, utf8_percent_encode, AsciiSet, CONTROLS};
use tokio::fs::File;
use tokio::io::AsyncReadExt;

use crate::http::response;

const CACHE_CONTROL: &str = "public, max-age=3600";
const CHUNK_SIZE: usize = 64 * 1024;

const HREF_ENCODE: &AsciiSet = &CONTROLS
    .add(b' ')
    .add(b'"')
    .add(b'#')
    .add(b'%')
    .add(b'<')
    .add(b'>')
    .add(b'?')
    .add(b'`')
    .add(b'{')
    .add(b'}');

/// Why a static request could not be served.
#[derive(Debug, thiserror::Error)]
pub enum StaticError {
    #[error("path escapes the static root")]
    Traversal,

    #[error("not found")]
    NotFound,

    #[error("permission denied")]
    Forbidden,
}

impl StaticError {
    fn from_io(e: &io::Error) -> Self {
        match e.kind() {
            io::ErrorKind::PermissionDenied => StaticError::Forbidden,
            _ => StaticError::NotFound,
        }
    }

    fn into_response(self) -> Response {
        match self {
            StaticError::Traversal | StaticError::Forbidden => response::forbidden(),
            StaticError::NotFound => response::not_found(),
        }
    }
}

/// Resolve a raw (percent-encoded) request path under `root`.
pub fn resolve_path(root: &Path, raw_path: &str) -> Result<PathBuf, StaticError> {
    let decoded = percent_decode_str(raw_path)
        .decode_utf8()
        .map_err(|_| StaticError::NotFound)?;

    if decoded.contains('\\') || decoded.contains('\0') {
        return Err(StaticError::Traversal);
    }

    let mut resolved = root.to_path_buf();
    for segment in decoded.split('/') {
        match segment {
            "" | "." => continue,
            ".." => return Err(StaticError::Traversal),
            s => resolved.push(s),
        }
    }
    Ok(resolved)
}

/// Serve a request target from the static root.
pub async fn serve(root: &Path, uri: &Uri) -> Response {
    let raw_path = uri.path();
    match serve_path(root, raw_path, uri.query()).await {
        Ok(response) => response,
        Err(e) => {
            tracing::debug!(path = %raw_path, error = %e, "Static request refused");
            e.into_response()
        }
    }
}

async fn serve_path(root: &Path, raw_path: &str, query: Option<&str>) -> Result<Response, StaticError> {
    let path = resolve_path(root, raw_path)?;
    let metadata = tokio::fs::metadata(&path)
        .await
        .map_err(|e| StaticError::from_io(&e))?;

    if !metadata.is_dir() {
        return serve_file(&path).await;
    }

    if !raw_path.ends_with('/') {
        return Ok(response::moved_permanently(&slash_location(raw_path, query)));
    }

    let index = path.join("index.html");
    if tokio::fs::metadata(&index).await.is_ok_and(|m| m.is_file()) {
        return serve_file(&index).await;
    }
    listing(&path, raw_path).await
}

/// Same-origin location of a directory with its trailing slash added.
///
/// Leading slashes collapse to one; `//host` would leave the origin.
pub fn slash_location(raw_path: &str, query: Option<&str>) -> String {
    let path = format!("/{}/", raw_path.trim_start_matches('/'));
    match query {
        Some(q) => format!("{}?{}", path, q),
        None => path,
    }
}

async fn serve_file(path: &Path) -> Result<Response, StaticError> {
    let file = File::open(path).await.map_err(|e| StaticError::from_io(&e))?;
    let len = file
        .metadata()
        .await
        .map_err(|e| StaticError::from_io(&e))?
        .len();

    let mime = mime_guess::from_path(path).first_or_octet_stream();
    let content_type =
        HeaderValue::from_str(mime.as_ref()).unwrap_or(HeaderValue::from_static("application/octet-stream"));

    Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, content_type)
        .header(header::CONTENT_LENGTH, len)
        .header(header::CACHE_CONTROL, CACHE_CONTROL)
        .body(file_body(file))
        .map_err(|_| StaticError::NotFound)
}

fn file_body(file: File) -> Body {
    let stream = futures_util::stream::unfold(Some(file), |state| async move {
        let mut file = state?;
        let mut buf = BytesMut::with_capacity(CHUNK_SIZE);
        match file.read_buf(&mut buf).await {
            Ok(0) => None,
            Ok(_) => Some((Ok(buf.freeze()), Some(file))),
            Err(e) => Some((Err(e), None)),
        }
    });
    Body::from_stream(stream)
}

async fn listing(dir: &Path, raw_path: &str) -> Result<Response, StaticError> {
    let mut entries = tokio::fs::read_dir(dir)
        .await
        .map_err(|e| StaticError::from_io(&e))?;

    let mut names = Vec::new();
    while let Ok(Some(entry)) = entries.next_entry().await {
        let mut name = entry.file_name().to_string_lossy().into_owned();
        if entry.file_type().await.is_ok_and(|t| t.is_dir()) {
            name.push('/');
        }
        names.push(name);
    }
    names.sort();

    let title = escape_html(&percent_decode_str(raw_path).decode_utf8_lossy());
    let mut html = format!("<html>\n<head><title>Index of {title}</title></head>\n<body>\n<h1>Index of {title}</h1>\n<pre>\n");
    for name in &names {
        html.push_str(&format!(
            "<a href=\"{}\">{}</a>\n",
            utf8_percent_encode(name, HREF_ENCODE),
            escape_html(name)
        ));
    }
    html.push_str("</pre>\n</body>\n</html>\n");

    Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, "text/html; charset=utf-8")
        .body(Body::from(html))
        .map_err(|_| StaticError::NotFound)
}

/// Escape text for inclusion in HTML.
pub fn escape_html(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for c in input.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            c => out.push(c),
        }
    }
    out
}
