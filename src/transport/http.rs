//! HTTP pass-through transport.

use std::time::Duration;

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{header, HeaderMap, HeaderName, Request, Response, Version};
use hyper_util::{
    client::legacy::{connect::HttpConnector, Client},
    rt::TokioExecutor,
};

use crate::transport::{Transport, UpstreamError};

/// Headers that describe a single hop and are not forwarded.
const HOP_BY_HOP: [HeaderName; 8] = [
    header::CONNECTION,
    HeaderName::from_static("keep-alive"),
    HeaderName::from_static("proxy-connection"),
    header::PROXY_AUTHENTICATE,
    header::PROXY_AUTHORIZATION,
    header::TE,
    header::TRAILER,
    header::UPGRADE,
];

/// Forwards requests over a pooled hyper client.
#[derive(Clone)]
pub struct HttpTransport {
    client: Client<HttpConnector, Body>,
}

impl HttpTransport {
    pub fn new(connect_timeout: Duration) -> Self {
        let mut connector = HttpConnector::new();
        connector.set_connect_timeout(Some(connect_timeout));

        let client = Client::builder(TokioExecutor::new()).build(connector);
        Self { client }
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn round_trip(&self, mut req: Request<Body>) -> Result<Response<Body>, UpstreamError> {
        let Some(target) = req.uri().authority().map(|a| a.to_string()) else {
            return Err(UpstreamError::MissingTarget);
        };

        strip_hop_by_hop(req.headers_mut());
        req.headers_mut().remove(header::TRANSFER_ENCODING);
        *req.version_mut() = Version::HTTP_11;

        let response = self
            .client
            .request(req)
            .await
            .map_err(|source| UpstreamError::Http { target, source })?;

        let (mut parts, body) = response.into_parts();
        strip_hop_by_hop(&mut parts.headers);
        Ok(Response::from_parts(parts, Body::new(body)))
    }
}

fn strip_hop_by_hop(headers: &mut HeaderMap) {
    for name in HOP_BY_HOP.iter() {
        headers.remove(name);
    }
}
