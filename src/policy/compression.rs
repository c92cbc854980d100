//! On-the-fly response compression.
//!
//! # Responsibilities
//! - Negotiate gzip or deflate from `Accept-Encoding`
//! - Stream the response body through a `flate2` encoder
//!
//! # Design Decisions
//! - Never re-encode: responses with `Content-Encoding` pass through
//! - Skip bodiless responses and media that is already compressed
//! - `deflate` is the zlib format, as HTTP defines it

use std::io::{self, Write};

use axum::body::Body;
use axum::http::{header, HeaderMap, HeaderValue, Method, Request, StatusCode};
use axum::response::Response;
use bytes::Bytes;
use flate2::write::{GzEncoder, ZlibEncoder};
use flate2::Compression;
use futures_util::future::BoxFuture;
use futures_util::StreamExt;

use crate::policy::chain::{Next, PolicyStage, RequestContext};

/// A supported content coding.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Encoding {
    Gzip,
    Deflate,
}

impl Encoding {
    fn header_value(self) -> HeaderValue {
        match self {
            Encoding::Gzip => HeaderValue::from_static("gzip"),
            Encoding::Deflate => HeaderValue::from_static("deflate"),
        }
    }
}

/// Pick the preferred supported coding; gzip wins ties.
pub fn negotiate(accept_encoding: &str) -> Option<Encoding> {
    let mut best: Option<(Encoding, f32)> = None;

    for item in accept_encoding.split(',') {
        let mut parts = item.split(';');
        let coding = parts.next().unwrap_or_default().trim();
        let encoding = if coding.eq_ignore_ascii_case("gzip") || coding.eq_ignore_ascii_case("x-gzip") {
            Encoding::Gzip
        } else if coding.eq_ignore_ascii_case("deflate") {
            Encoding::Deflate
        } else {
            continue;
        };

        let q = parts
            .filter_map(|p| p.trim().strip_prefix("q="))
            .find_map(|v| v.trim().parse::<f32>().ok())
            .unwrap_or(1.0);
        if q <= 0.0 {
            continue;
        }

        best = match best {
            Some((current, best_q)) if best_q > q || (best_q == q && current == Encoding::Gzip) => {
                Some((current, best_q))
            }
            _ => Some((encoding, q)),
        };
    }

    best.map(|(encoding, _)| encoding)
}

/// Whether a response is worth compressing.
pub fn is_compressible(method: &Method, status: StatusCode, headers: &HeaderMap) -> bool {
    if method == Method::HEAD
        || status.is_informational()
        || status == StatusCode::NO_CONTENT
        || status == StatusCode::NOT_MODIFIED
        || headers.contains_key(header::CONTENT_ENCODING)
    {
        return false;
    }

    let content_type = headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_ascii_lowercase();

    !(content_type.starts_with("image/")
        || content_type.starts_with("video/")
        || content_type.starts_with("audio/")
        || content_type.contains("zip")
        || content_type.contains("compressed")
        || content_type.starts_with("font/woff"))
}

enum Encoder {
    Gzip(GzEncoder<Vec<u8>>),
    Deflate(ZlibEncoder<Vec<u8>>),
}

impl Encoder {
    fn new(encoding: Encoding, level: Compression) -> Self {
        match encoding {
            Encoding::Gzip => Encoder::Gzip(GzEncoder::new(Vec::new(), level)),
            Encoding::Deflate => Encoder::Deflate(ZlibEncoder::new(Vec::new(), level)),
        }
    }

    /// Feed a chunk and take whatever compressed output is ready.
    fn write(&mut self, chunk: &[u8]) -> io::Result<Bytes> {
        let buf = match self {
            Encoder::Gzip(e) => {
                e.write_all(chunk)?;
                e.get_mut()
            }
            Encoder::Deflate(e) => {
                e.write_all(chunk)?;
                e.get_mut()
            }
        };
        Ok(Bytes::from(std::mem::take(buf)))
    }

    fn finish(self) -> io::Result<Bytes> {
        let out = match self {
            Encoder::Gzip(e) => e.finish()?,
            Encoder::Deflate(e) => e.finish()?,
        };
        Ok(Bytes::from(out))
    }
}

/// Wrap a body in a streaming encoder.
pub fn compress_body(body: Body, encoding: Encoding, level: u32) -> Body {
    let encoder = Encoder::new(encoding, Compression::new(level.min(9)));
    let state = Some((body.into_data_stream(), encoder));

    let stream = futures_util::stream::unfold(state, |state| async move {
        let (mut inner, mut encoder) = state?;
        loop {
            match inner.next().await {
                Some(Ok(chunk)) => match encoder.write(&chunk) {
                    Ok(out) if out.is_empty() => continue,
                    Ok(out) => return Some((Ok(out), Some((inner, encoder)))),
                    Err(e) => return Some((Err(e), None)),
                },
                Some(Err(e)) => return Some((Err(io::Error::other(e)), None)),
                None => return Some((encoder.finish(), None)),
            }
        }
    });

    Body::from_stream(stream)
}

pub struct CompressionStage {
    level: u32,
}

impl CompressionStage {
    pub fn new(level: u32) -> Self {
        Self { level }
    }
}

impl PolicyStage for CompressionStage {
    fn name(&self) -> &'static str {
        "compression"
    }

    fn handle<'a>(
        &'a self,
        ctx: &'a RequestContext,
        req: Request<Body>,
        next: Next<'a>,
    ) -> BoxFuture<'a, Response> {
        Box::pin(async move {
            let method = req.method().clone();
            let encoding = req
                .headers()
                .get(header::ACCEPT_ENCODING)
                .and_then(|v| v.to_str().ok())
                .and_then(negotiate);

            let response = next.run(ctx, req).await;

            let Some(encoding) = encoding else {
                return response;
            };
            if !is_compressible(&method, response.status(), response.headers()) {
                return response;
            }

            let (mut parts, body) = response.into_parts();
            parts.headers.remove(header::CONTENT_LENGTH);
            parts
                .headers
                .insert(header::CONTENT_ENCODING, encoding.header_value());
            parts
                .headers
                .append(header::VARY, HeaderValue::from_static("Accept-Encoding"));

            Response::from_parts(parts, compress_body(body, encoding, self.level))
        })
    }
}
