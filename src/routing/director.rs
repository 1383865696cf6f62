//! Request director.
//!
//! # Responsibilities
//! - Find the first route whose pattern matches the request path
//! - Pick one of the route's upstreams uniformly at random
//! - Rewrite the request destination (scheme, authority, path)
//! - Stamp the route's filter chain on the request
//!
//! # Design Decisions
//! - Unmatched requests are left untouched
//! - gRPC upstreams keep the path; the method symbol rides in [`GrpcMethod`]
//! - Origin fallback applies to GET requests only

use std::sync::Arc;

use axum::http::header::HOST;
use axum::http::uri::{Authority, PathAndQuery, Scheme, Uri};
use axum::http::{HeaderName, HeaderValue, Method, Request};
use rand::Rng;

use crate::config::UpstreamScheme;
use crate::routing::route::{Route, RouteTable, Upstream};

/// Internal header carrying the comma-joined filter chain from the director
/// to the filter pipeline. Removed before the upstream call.
pub const FILTERS_HEADER: HeaderName = HeaderName::from_static("mini-gateway-filters");

/// Fully qualified gRPC method the request is bound to,
/// e.g. `proto.GrpcUpstreamService/Hello`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GrpcMethod(pub String);

/// Rewrites inbound requests towards their upstream.
#[derive(Debug, Clone)]
pub struct Director {
    table: Arc<RouteTable>,
}

impl Director {
    pub fn new(table: Arc<RouteTable>) -> Self {
        Self { table }
    }

    pub fn table(&self) -> &RouteTable {
        &self.table
    }

    /// Direct the request to the first matching route.
    ///
    /// Returns the matched route, or `None` when the request passes through
    /// unmodified.
    pub fn direct<B>(&self, req: &mut Request<B>) -> Option<&Route> {
        let path = req.uri().path().to_string();

        for (index, route) in self.table.routes().iter().enumerate() {
            let Some(captures) = route.pattern().captures(&path) else {
                continue;
            };

            let upstream = pick_upstream(route.upstreams());

            let rewritten_path = match upstream.scheme {
                UpstreamScheme::Grpc => None,
                UpstreamScheme::Http => {
                    if !route.has_capture_group() {
                        tracing::warn!(
                            route = index,
                            pattern = %route.pattern(),
                            "HTTP route pattern has no capture group, route ignored"
                        );
                        continue;
                    }
                    let tail = captures.get(1).map(|m| m.as_str()).unwrap_or_default();
                    Some(format!("/{}", tail))
                }
            };

            if let Err(e) = rewrite(req, upstream, rewritten_path) {
                tracing::warn!(route = index, path = %path, error = %e, "Failed to rewrite request, route ignored");
                continue;
            }

            if let Some(endpoint) = &upstream.grpc_endpoint {
                if upstream.scheme == UpstreamScheme::Grpc {
                    req.extensions_mut().insert(GrpcMethod(endpoint.clone()));
                }
            }

            match HeaderValue::from_str(&route.filters().join(",")) {
                Ok(value) => {
                    req.headers_mut().insert(FILTERS_HEADER, value);
                }
                Err(e) => {
                    tracing::warn!(route = index, error = %e, "Filter names are not a valid header value, chain dropped");
                }
            }

            tracing::debug!(
                route = index,
                path = %path,
                upstream = %req.uri(),
                scheme = %upstream.scheme,
                "Request directed"
            );
            return Some(route);
        }

        None
    }
}

fn pick_upstream(upstreams: &[Upstream]) -> &Upstream {
    if upstreams.len() == 1 {
        return &upstreams[0];
    }
    let index = rand::thread_rng().gen_range(0..upstreams.len());
    &upstreams[index]
}

/// Point the request at `upstream`, optionally replacing the path.
fn rewrite<B>(
    req: &mut Request<B>,
    upstream: &Upstream,
    path: Option<String>,
) -> Result<(), axum::http::Error> {
    let original = req.uri().clone();

    let path_and_query = match path {
        Some(path) => {
            let rewritten = match original.query() {
                Some(query) => format!("{}?{}", path, query),
                None => path,
            };
            PathAndQuery::try_from(rewritten.as_str())?
        }
        None => original
            .path_and_query()
            .cloned()
            .unwrap_or_else(|| PathAndQuery::from_static("/")),
    };

    let mut host = upstream.host.clone();
    if host.is_empty() {
        host = origin_fallback(req, &original).unwrap_or_default();
    }

    let mut parts = original.into_parts();
    parts.path_and_query = Some(path_and_query);
    if host.is_empty() {
        parts.scheme = None;
        parts.authority = None;
    } else {
        parts.scheme = Some(Scheme::try_from(upstream.scheme.as_str())?);
        parts.authority = Some(Authority::try_from(host.as_str())?);
    }

    *req.uri_mut() = Uri::from_parts(parts)?;
    Ok(())
}

/// Host to use when the upstream leaves the destination empty.
///
/// GET only: the `Host` header first, then the authority the request
/// arrived with.
fn origin_fallback<B>(req: &Request<B>, original: &Uri) -> Option<String> {
    if req.method() != Method::GET {
        return None;
    }

    req.headers()
        .get(HOST)
        .and_then(|h| h.to_str().ok())
        .filter(|h| !h.is_empty())
        .map(str::to_string)
        .or_else(|| original.authority().map(|a| a.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{RouteConfig, UpstreamConfig};

    fn http_route(pattern: &str, host: &str, filters: &[&str]) -> RouteConfig {
        RouteConfig {
            pattern: pattern.into(),
            upstreams: vec![UpstreamConfig {
                host: host.into(),
                scheme: UpstreamScheme::Http,
                grpc_endpoint: None,
            }],
            filters: filters.iter().map(|f| f.to_string()).collect(),
        }
    }

    fn grpc_route(pattern: &str) -> RouteConfig {
        RouteConfig {
            pattern: pattern.into(),
            upstreams: vec![UpstreamConfig {
                host: "localhost:8081".into(),
                scheme: UpstreamScheme::Grpc,
                grpc_endpoint: Some("proto.GrpcUpstreamService/Hello".into()),
            }],
            filters: vec!["auth".into(), "inspector".into()],
        }
    }

    fn director(routes: Vec<RouteConfig>) -> Director {
        Director::new(Arc::new(RouteTable::from_config(&routes)))
    }

    fn request(method: Method, uri: &str) -> Request<()> {
        Request::builder().method(method).uri(uri).body(()).unwrap()
    }

    #[test]
    fn rewrites_http_path_from_first_group() {
        let d = director(vec![http_route("^/svc1/(.*)", "localhost:8081", &["auth", "inspector"])]);
        let mut req = request(Method::GET, "/svc1/ping");

        assert!(d.direct(&mut req).is_some());
        assert_eq!(req.uri().to_string(), "http://localhost:8081/ping");
        assert_eq!(req.headers().get(FILTERS_HEADER).unwrap(), "auth,inspector");
        assert!(req.extensions().get::<GrpcMethod>().is_none());
    }

    #[test]
    fn keeps_query_string() {
        let d = director(vec![http_route("^/svc1/(.*)", "localhost:8081", &[])]);
        let mut req = request(Method::GET, "/svc1/a/b?x=1&y=2");

        d.direct(&mut req);
        assert_eq!(req.uri().to_string(), "http://localhost:8081/a/b?x=1&y=2");
    }

    #[test]
    fn first_matching_route_wins() {
        let d = director(vec![
            http_route("^/svc1/(.*)", "first:1", &["a"]),
            http_route("^/svc1/(ping)", "second:2", &["b"]),
        ]);
        let mut req = request(Method::GET, "/svc1/ping");

        d.direct(&mut req);
        assert_eq!(req.uri().authority().unwrap().as_str(), "first:1");
        assert_eq!(req.headers().get(FILTERS_HEADER).unwrap(), "a");
    }

    #[test]
    fn grpc_route_binds_method_and_keeps_path() {
        let d = director(vec![grpc_route("^/svc2/grpc_hello$")]);
        let mut req = request(Method::POST, "/svc2/grpc_hello");

        d.direct(&mut req);
        assert_eq!(req.uri().scheme_str(), Some("grpc"));
        assert_eq!(req.uri().authority().unwrap().as_str(), "localhost:8081");
        assert_eq!(req.uri().path(), "/svc2/grpc_hello");
        assert_eq!(
            req.extensions().get::<GrpcMethod>(),
            Some(&GrpcMethod("proto.GrpcUpstreamService/Hello".into()))
        );
    }

    #[test]
    fn unmatched_request_is_untouched() {
        let d = director(vec![http_route("^/svc1/(.*)", "localhost:8081", &["auth"])]);
        let mut req = request(Method::GET, "/other/ping");

        assert!(d.direct(&mut req).is_none());
        assert_eq!(req.uri().to_string(), "/other/ping");
        assert!(req.headers().get(FILTERS_HEADER).is_none());
    }

    #[test]
    fn directing_twice_is_a_no_op() {
        let d = director(vec![http_route("^/svc1/(.*)", "localhost:8081", &["auth"])]);
        let mut req = request(Method::GET, "/svc1/ping");

        d.direct(&mut req);
        let first = req.uri().clone();
        assert!(d.direct(&mut req).is_none());
        assert_eq!(req.uri(), &first);
    }

    #[test]
    fn route_without_group_falls_through_for_http() {
        let d = director(vec![
            http_route("^/svc1/ping$", "broken:1", &[]),
            http_route("^/svc1/(.*)", "working:2", &[]),
        ]);
        let mut req = request(Method::GET, "/svc1/ping");

        d.direct(&mut req);
        assert_eq!(req.uri().authority().unwrap().as_str(), "working:2");
    }

    #[test]
    fn empty_host_falls_back_to_host_header_for_get() {
        let d = director(vec![http_route("^/echo/(.*)", "", &[])]);
        let mut req = Request::builder()
            .method(Method::GET)
            .uri("http://conn-host:9000/echo/hi")
            .header(HOST, "header-host:8000")
            .body(())
            .unwrap();

        d.direct(&mut req);
        assert_eq!(req.uri().to_string(), "http://header-host:8000/hi");
    }

    #[test]
    fn empty_host_falls_back_to_connection_host_without_header() {
        let d = director(vec![http_route("^/echo/(.*)", "", &[])]);
        let mut req = request(Method::GET, "http://conn-host:9000/echo/hi");

        d.direct(&mut req);
        assert_eq!(req.uri().to_string(), "http://conn-host:9000/hi");
    }

    #[test]
    fn no_origin_fallback_for_non_get() {
        let d = director(vec![http_route("^/echo/(.*)", "", &[])]);
        let mut req = Request::builder()
            .method(Method::POST)
            .uri("/echo/hi")
            .header(HOST, "header-host:8000")
            .body(())
            .unwrap();

        d.direct(&mut req);
        assert!(req.uri().authority().is_none());
        assert_eq!(req.uri().path(), "/hi");
    }

    #[test]
    fn random_choice_stays_within_upstreams() {
        let mut route = http_route("^/svc1/(.*)", "a:1", &[]);
        route.upstreams.push(UpstreamConfig {
            host: "b:2".into(),
            scheme: UpstreamScheme::Http,
            grpc_endpoint: None,
        });
        let d = director(vec![route]);

        for _ in 0..32 {
            let mut req = request(Method::GET, "/svc1/x");
            d.direct(&mut req);
            let host = req.uri().authority().unwrap().as_str().to_string();
            assert!(host == "a:1" || host == "b:2");
        }
    }
}
