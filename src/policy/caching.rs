//! Response caching stage.

use std::sync::Arc;

use axum::body::Body;
use axum::http::{header, HeaderMap, HeaderValue, Method, Request};
use axum::response::Response;
use bytes::{Bytes, BytesMut};
use futures_util::future::BoxFuture;
use futures_util::StreamExt;

use crate::cache::{cache_key, CachedResponse, ResponseCache};
use crate::http::response;
use crate::observability::metrics;
use crate::policy::chain::{Next, PolicyStage, RequestContext};
use crate::routing::matcher::Target;

pub static X_CACHE: header::HeaderName = header::HeaderName::from_static("x-cache");

pub struct CachingStage {
    cache: Arc<ResponseCache>,
}

impl CachingStage {
    pub fn new(cache: Arc<ResponseCache>) -> Self {
        Self { cache }
    }

    fn applies(&self, ctx: &RequestContext, method: &Method) -> bool {
        self.cache.enabled()
            && matches!(ctx.target, Target::Route(_) | Target::Static)
            && (method == Method::GET || method == Method::HEAD)
    }
}

/// Whether a response's headers allow it to be shared with other clients.
///
/// Responses that set cookies or carry `Cache-Control: no-store` or
/// `private` are relayed but never stored.
pub fn is_storable(headers: &HeaderMap) -> bool {
    if headers.contains_key(header::SET_COOKIE) {
        return false;
    }
    !headers
        .get_all(header::CACHE_CONTROL)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(','))
        .map(|d| d.split('=').next().unwrap_or("").trim())
        .any(|d| d.eq_ignore_ascii_case("no-store") || d.eq_ignore_ascii_case("private"))
}

/// Rebuild a response from a stored entry.
pub fn replay(entry: &CachedResponse) -> Response {
    let mut response = Response::new(Body::from(entry.body.clone()));
    *response.status_mut() = entry.status;
    *response.headers_mut() = entry.headers.clone();
    response
        .headers_mut()
        .insert(X_CACHE.clone(), HeaderValue::from_static("HIT"));
    response
}

impl PolicyStage for CachingStage {
    fn name(&self) -> &'static str {
        "caching"
    }

    fn handle<'a>(
        &'a self,
        ctx: &'a RequestContext,
        req: Request<Body>,
        next: Next<'a>,
    ) -> BoxFuture<'a, Response> {
        Box::pin(async move {
            if !self.applies(ctx, req.method()) {
                return next.run(ctx, req).await;
            }

            let key = cache_key(req.method(), &ctx.host, req.uri());
            if let Some(entry) = self.cache.get(&key, ctx.snapshot.generation) {
                metrics::record_cache_hit();
                tracing::debug!(request_id = %ctx.request_id, key = %key, "Cache hit");
                return replay(&entry);
            }
            metrics::record_cache_miss();

            let response = next.run(ctx, req).await;
            if !response.status().is_success()
                || response.headers().contains_key(header::CONTENT_ENCODING)
            {
                return response;
            }
            if !is_storable(response.headers()) {
                tracing::debug!(request_id = %ctx.request_id, key = %key, "Response not storable");
                return response;
            }

            let (mut parts, body) = response.into_parts();
            let mut stream = body.into_data_stream();
            let mut buf = BytesMut::new();
            let cap = self.cache.max_entry_bytes();

            while let Some(chunk) = stream.next().await {
                let chunk = match chunk {
                    Ok(chunk) => chunk,
                    Err(e) => {
                        tracing::warn!(request_id = %ctx.request_id, error = %e, "Body failed while caching");
                        return response::bad_gateway();
                    }
                };
                buf.extend_from_slice(&chunk);

                if buf.len() > cap {
                    tracing::debug!(request_id = %ctx.request_id, key = %key, cap, "Response too large to cache");
                    let prefix: Bytes = buf.freeze();
                    let rest = futures_util::stream::once(async move { Ok::<Bytes, axum::Error>(prefix) }).chain(stream);
                    return Response::from_parts(parts, Body::from_stream(rest));
                }
            }

            let body = buf.freeze();
            self.cache.insert(
                key,
                CachedResponse::new(
                    parts.status,
                    parts.headers.clone(),
                    body.clone(),
                    ctx.snapshot.generation,
                ),
            );
            parts
                .headers
                .insert(X_CACHE.clone(), HeaderValue::from_static("MISS"));
            Response::from_parts(parts, Body::from(body))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn headers(pairs: &[(&'static str, &'static str)]) -> HeaderMap {
        let mut map = HeaderMap::new();
        for (name, value) in pairs {
            map.append(*name, HeaderValue::from_static(value));
        }
        map
    }

    #[test]
    fn test_plain_responses_are_storable() {
        assert!(is_storable(&HeaderMap::new()));
        assert!(is_storable(&headers(&[("cache-control", "public, max-age=3600")])));
        assert!(is_storable(&headers(&[("cache-control", "no-cache")])));
    }

    #[test]
    fn test_cookies_are_never_stored() {
        assert!(!is_storable(&headers(&[("set-cookie", "session=abc; HttpOnly")])));
    }

    #[test]
    fn test_private_and_no_store_are_never_stored() {
        assert!(!is_storable(&headers(&[("cache-control", "no-store")])));
        assert!(!is_storable(&headers(&[("cache-control", "max-age=60, Private")])));
        assert!(!is_storable(&headers(&[
            ("cache-control", "max-age=60"),
            ("cache-control", "no-store"),
        ])));
        assert!(!is_storable(&headers(&[("cache-control", "private=\"set-cookie\"")])));
    }
}
