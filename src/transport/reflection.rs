//! gRPC invoker driven by server reflection.
//!
//! # Responsibilities
//! - Dial the target with a connect timeout
//! - Fetch the service's file descriptors (and their dependencies) over
//!   the reflection service, v1 first and v1alpha when v1 is unimplemented
//! - Encode the JSON payload as a dynamic message, make a unary call,
//!   render the reply as JSON
//!
//! # Design Decisions
//! - One channel per call; it is dropped on every exit path
//! - Descriptors are fetched per call, nothing is cached

use std::collections::{HashMap, HashSet};
use std::time::Duration;

use async_trait::async_trait;
use axum::http::uri::PathAndQuery;
use prost::Message;
use prost_reflect::{DescriptorPool, DynamicMessage, MessageDescriptor, MethodDescriptor};
use prost_types::{FileDescriptorProto, FileDescriptorSet};
use tonic::codec::{Codec, DecodeBuf, Decoder, EncodeBuf, Encoder};
use tonic::transport::{Channel, Endpoint};
use tonic::{Code, Status};
use tonic_reflection::pb::{v1, v1alpha};

use crate::transport::grpc::{GrpcError, GrpcInvoker};

/// Default [`GrpcInvoker`].
#[derive(Debug, Clone)]
pub struct ReflectionInvoker {
    connect_timeout: Duration,
}

impl ReflectionInvoker {
    pub fn new(connect_timeout: Duration) -> Self {
        Self { connect_timeout }
    }

    async fn dial(&self, target: &str) -> Result<Channel, GrpcError> {
        let endpoint = Endpoint::from_shared(format!("http://{}", target))
            .map_err(|_| GrpcError::InvalidTarget(target.to_string()))?
            .connect_timeout(self.connect_timeout);

        endpoint.connect().await.map_err(|source| GrpcError::Dial {
            target: target.to_string(),
            source,
        })
    }
}

#[async_trait]
impl GrpcInvoker for ReflectionInvoker {
    async fn invoke(&self, target: &str, symbol: &str, payload: &str) -> Result<String, GrpcError> {
        let (service, method) =
            split_symbol(symbol).ok_or_else(|| GrpcError::UnknownMethod(symbol.to_string()))?;

        let channel = self.dial(target).await?;
        let pool = fetch_descriptors(channel.clone(), target, service).await?;
        let method = resolve_method(&pool, service, method)?;

        let request = decode_payload(method.input(), payload)?;
        let path = PathAndQuery::try_from(format!("/{}/{}", service, method.name()).as_str())
            .map_err(|_| GrpcError::UnknownMethod(symbol.to_string()))?;

        let mut grpc = tonic::client::Grpc::new(channel);
        grpc.ready().await.map_err(|source| GrpcError::Dial {
            target: target.to_string(),
            source,
        })?;

        let reply = grpc
            .unary(tonic::Request::new(request), path, DynamicCodec::new(method.output()))
            .await
            .map_err(|status| GrpcError::Status {
                code: status.code(),
                message: status.message().to_string(),
            })?
            .into_inner();

        tracing::debug!(target_host = %target, method = %symbol, "gRPC call completed");
        serde_json::to_string(&reply).map_err(|e| GrpcError::Decode(e.to_string()))
    }
}

/// Split `pkg.Service/Method` (or `pkg.Service.Method`) into service and method.
pub fn split_symbol(symbol: &str) -> Option<(&str, &str)> {
    let symbol = symbol.trim_start_matches('/');
    let (service, method) = symbol
        .rsplit_once('/')
        .or_else(|| symbol.rsplit_once('.'))?;

    if service.is_empty() || method.is_empty() {
        return None;
    }
    Some((service, method))
}

fn resolve_method(pool: &DescriptorPool, service: &str, method: &str) -> Result<MethodDescriptor, GrpcError> {
    let symbol = format!("{}/{}", service, method);
    let descriptor = pool
        .get_service_by_name(service)
        .and_then(|s| s.methods().find(|m| m.name() == method))
        .ok_or_else(|| GrpcError::UnknownMethod(symbol.clone()))?;

    if descriptor.is_client_streaming() || descriptor.is_server_streaming() {
        return Err(GrpcError::Streaming(symbol));
    }
    Ok(descriptor)
}

/// Parse a JSON payload into a message of type `desc`. Blank means empty message.
fn decode_payload(desc: MessageDescriptor, payload: &str) -> Result<DynamicMessage, GrpcError> {
    if payload.trim().is_empty() {
        return Ok(DynamicMessage::new(desc));
    }

    let mut deserializer = serde_json::Deserializer::from_str(payload);
    let message = DynamicMessage::deserialize(desc, &mut deserializer)
        .map_err(|e| GrpcError::Encode(e.to_string()))?;
    deserializer.end().map_err(|e| GrpcError::Encode(e.to_string()))?;
    Ok(message)
}

/// Collect the file defining `service` and every file it depends on.
async fn fetch_descriptors(channel: Channel, target: &str, service: &str) -> Result<DescriptorPool, GrpcError> {
    let mut client = ReflectionClient::V1(v1::server_reflection_client::ServerReflectionClient::new(channel.clone()));
    let mut files: HashMap<String, FileDescriptorProto> = HashMap::new();
    let mut requested: HashSet<String> = HashSet::new();
    let mut pending = vec![Query::Symbol(service.to_string())];

    let failed = |reason: String| GrpcError::Reflection {
        target: target.to_string(),
        reason,
    };

    while let Some(query) = pending.pop() {
        let raw = match client.files(target, &query).await {
            Err(ReflectionFailure::Status(status)) if status.code() == Code::Unimplemented => {
                let Some(fallback) = client.downgrade(&channel) else {
                    return Err(failed(describe(&status)));
                };
                tracing::debug!(target_host = %target, "Reflection v1 unimplemented, trying v1alpha");
                client = fallback;
                client.files(target, &query).await
            }
            other => other,
        }
        .map_err(|e| failed(e.to_string()))?;

        for bytes in raw {
            let proto = FileDescriptorProto::decode(bytes.as_slice()).map_err(|e| failed(e.to_string()))?;
            for dependency in &proto.dependency {
                if !files.contains_key(dependency) && requested.insert(dependency.clone()) {
                    pending.push(Query::File(dependency.clone()));
                }
            }
            requested.insert(proto.name().to_string());
            files.insert(proto.name().to_string(), proto);
        }
    }

    let set = FileDescriptorSet {
        file: order_by_dependency(files),
    };
    DescriptorPool::decode(set.encode_to_vec().as_slice()).map_err(|e| failed(e.to_string()))
}

/// What to ask the reflection service for.
#[derive(Debug, Clone)]
enum Query {
    Symbol(String),
    File(String),
}

#[derive(Debug)]
enum ReflectionFailure {
    Status(Status),
    Reply(String),
}

impl std::fmt::Display for ReflectionFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ReflectionFailure::Status(status) => f.write_str(&describe(status)),
            ReflectionFailure::Reply(reason) => f.write_str(reason),
        }
    }
}

fn describe(status: &Status) -> String {
    if status.message().is_empty() {
        format!("{:?}", status.code())
    } else {
        format!("{:?}: {}", status.code(), status.message())
    }
}

/// Reflection client for either protocol revision.
enum ReflectionClient {
    V1(v1::server_reflection_client::ServerReflectionClient<Channel>),
    V1Alpha(v1alpha::server_reflection_client::ServerReflectionClient<Channel>),
}

impl ReflectionClient {
    /// The v1alpha client on `channel`, if not already using it.
    fn downgrade(&self, channel: &Channel) -> Option<ReflectionClient> {
        match self {
            ReflectionClient::V1(_) => Some(ReflectionClient::V1Alpha(
                v1alpha::server_reflection_client::ServerReflectionClient::new(channel.clone()),
            )),
            ReflectionClient::V1Alpha(_) => None,
        }
    }

    /// One request/response exchange on the reflection stream, returning
    /// the encoded file descriptors.
    async fn files(&mut self, target: &str, query: &Query) -> Result<Vec<Vec<u8>>, ReflectionFailure> {
        match self {
            ReflectionClient::V1(client) => {
                use v1::server_reflection_request::MessageRequest;
                use v1::server_reflection_response::MessageResponse;

                let request = v1::ServerReflectionRequest {
                    host: target.to_string(),
                    message_request: Some(match query.clone() {
                        Query::Symbol(symbol) => MessageRequest::FileContainingSymbol(symbol),
                        Query::File(name) => MessageRequest::FileByFilename(name),
                    }),
                };
                let mut stream = client
                    .server_reflection_info(futures_util::stream::iter(vec![request]))
                    .await
                    .map_err(ReflectionFailure::Status)?
                    .into_inner();
                let reply = stream
                    .message()
                    .await
                    .map_err(ReflectionFailure::Status)?
                    .ok_or_else(closed)?;

                match reply.message_response {
                    Some(MessageResponse::FileDescriptorResponse(r)) => Ok(r.file_descriptor_proto),
                    Some(MessageResponse::ErrorResponse(e)) => Err(rejected(e.error_code, &e.error_message)),
                    _ => Err(unexpected()),
                }
            }
            ReflectionClient::V1Alpha(client) => {
                use v1alpha::server_reflection_request::MessageRequest;
                use v1alpha::server_reflection_response::MessageResponse;

                let request = v1alpha::ServerReflectionRequest {
                    host: target.to_string(),
                    message_request: Some(match query.clone() {
                        Query::Symbol(symbol) => MessageRequest::FileContainingSymbol(symbol),
                        Query::File(name) => MessageRequest::FileByFilename(name),
                    }),
                };
                let mut stream = client
                    .server_reflection_info(futures_util::stream::iter(vec![request]))
                    .await
                    .map_err(ReflectionFailure::Status)?
                    .into_inner();
                let reply = stream
                    .message()
                    .await
                    .map_err(ReflectionFailure::Status)?
                    .ok_or_else(closed)?;

                match reply.message_response {
                    Some(MessageResponse::FileDescriptorResponse(r)) => Ok(r.file_descriptor_proto),
                    Some(MessageResponse::ErrorResponse(e)) => Err(rejected(e.error_code, &e.error_message)),
                    _ => Err(unexpected()),
                }
            }
        }
    }
}

fn closed() -> ReflectionFailure {
    ReflectionFailure::Reply("reflection stream closed without a reply".to_string())
}

fn unexpected() -> ReflectionFailure {
    ReflectionFailure::Reply("unexpected reflection reply".to_string())
}

fn rejected(code: i32, message: &str) -> ReflectionFailure {
    ReflectionFailure::Reply(format!("{:?}: {}", Code::from_i32(code), message))
}

/// Dependencies first, then dependents. Ties in name order.
fn order_by_dependency(mut files: HashMap<String, FileDescriptorProto>) -> Vec<FileDescriptorProto> {
    let mut names: Vec<String> = files.keys().cloned().collect();
    names.sort();

    let mut visited = HashSet::new();
    let mut ordered = Vec::with_capacity(files.len());
    for name in names {
        visit(&name, &mut files, &mut visited, &mut ordered);
    }
    ordered
}

fn visit(
    name: &str,
    files: &mut HashMap<String, FileDescriptorProto>,
    visited: &mut HashSet<String>,
    ordered: &mut Vec<FileDescriptorProto>,
) {
    if !visited.insert(name.to_string()) {
        return;
    }
    let Some(file) = files.remove(name) else {
        return;
    };
    for dependency in &file.dependency {
        visit(dependency, files, visited, ordered);
    }
    ordered.push(file);
}

/// Codec moving [`DynamicMessage`]s over a tonic channel.
#[derive(Debug, Clone)]
pub struct DynamicCodec {
    output: MessageDescriptor,
}

impl DynamicCodec {
    pub fn new(output: MessageDescriptor) -> Self {
        Self { output }
    }
}

impl Codec for DynamicCodec {
    type Encode = DynamicMessage;
    type Decode = DynamicMessage;
    type Encoder = DynamicEncoder;
    type Decoder = DynamicDecoder;

    fn encoder(&mut self) -> Self::Encoder {
        DynamicEncoder
    }

    fn decoder(&mut self) -> Self::Decoder {
        DynamicDecoder {
            output: self.output.clone(),
        }
    }
}

#[derive(Debug)]
pub struct DynamicEncoder;

impl Encoder for DynamicEncoder {
    type Item = DynamicMessage;
    type Error = Status;

    fn encode(&mut self, item: Self::Item, dst: &mut EncodeBuf<'_>) -> Result<(), Self::Error> {
        item.encode(dst)
            .map_err(|e| Status::internal(format!("failed to encode message: {}", e)))
    }
}

#[derive(Debug)]
pub struct DynamicDecoder {
    output: MessageDescriptor,
}

impl Decoder for DynamicDecoder {
    type Item = DynamicMessage;
    type Error = Status;

    fn decode(&mut self, src: &mut DecodeBuf<'_>) -> Result<Option<Self::Item>, Self::Error> {
        let mut message = DynamicMessage::new(self.output.clone());
        message
            .merge(src)
            .map_err(|e| Status::internal(format!("failed to decode message: {}", e)))?;
        Ok(Some(message))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::routing::GrpcMethod;
    use crate::transport::{GrpcTransport, Transport};
    use futures_util::future::BoxFuture;
    use prost_reflect::Value;
    use prost_types::field_descriptor_proto::{Label, Type};
    use prost_types::{DescriptorProto, FieldDescriptorProto, MethodDescriptorProto, ServiceDescriptorProto};
    use std::convert::Infallible;
    use std::sync::Arc;
    use std::task::{Context, Poll};
    use tokio_stream::wrappers::TcpListenerStream;
    use tonic::server::{NamedService, UnaryService};
    use tonic::transport::Server;

    fn string_field(name: &str, number: i32) -> FieldDescriptorProto {
        FieldDescriptorProto {
            name: Some(name.into()),
            number: Some(number),
            label: Some(Label::Optional as i32),
            r#type: Some(Type::String as i32),
            json_name: Some(name.into()),
            ..Default::default()
        }
    }

    fn message(name: &str, field: &str) -> DescriptorProto {
        DescriptorProto {
            name: Some(name.into()),
            field: vec![string_field(field, 1)],
            ..Default::default()
        }
    }

    fn greeter_file() -> FileDescriptorProto {
        FileDescriptorProto {
            name: Some("upstream.proto".into()),
            package: Some("proto".into()),
            syntax: Some("proto3".into()),
            message_type: vec![message("HelloRequest", "name"), message("HelloReply", "message")],
            service: vec![ServiceDescriptorProto {
                name: Some("GrpcUpstreamService".into()),
                method: vec![
                    MethodDescriptorProto {
                        name: Some("Hello".into()),
                        input_type: Some(".proto.HelloRequest".into()),
                        output_type: Some(".proto.HelloReply".into()),
                        ..Default::default()
                    },
                    MethodDescriptorProto {
                        name: Some("Watch".into()),
                        input_type: Some(".proto.HelloRequest".into()),
                        output_type: Some(".proto.HelloReply".into()),
                        server_streaming: Some(true),
                        ..Default::default()
                    },
                ],
                ..Default::default()
            }],
            ..Default::default()
        }
    }

    fn pool() -> DescriptorPool {
        let set = FileDescriptorSet {
            file: vec![greeter_file()],
        };
        DescriptorPool::decode(set.encode_to_vec().as_slice()).unwrap()
    }

    fn named(name: &str, deps: &[&str]) -> FileDescriptorProto {
        FileDescriptorProto {
            name: Some(name.into()),
            dependency: deps.iter().map(|d| d.to_string()).collect(),
            ..Default::default()
        }
    }

    #[test]
    fn split_symbol_accepts_both_separators() {
        assert_eq!(
            split_symbol("proto.GrpcUpstreamService/Hello"),
            Some(("proto.GrpcUpstreamService", "Hello"))
        );
        assert_eq!(
            split_symbol("proto.GrpcUpstreamService.Hello"),
            Some(("proto.GrpcUpstreamService", "Hello"))
        );
        assert_eq!(
            split_symbol("/proto.GrpcUpstreamService/Hello"),
            Some(("proto.GrpcUpstreamService", "Hello"))
        );
        assert_eq!(split_symbol("Hello"), None);
        assert_eq!(split_symbol("proto.Svc/"), None);
    }

    #[test]
    fn resolves_unary_methods_only() {
        let pool = pool();

        let hello = resolve_method(&pool, "proto.GrpcUpstreamService", "Hello").unwrap();
        assert_eq!(hello.input().full_name(), "proto.HelloRequest");

        assert!(matches!(
            resolve_method(&pool, "proto.GrpcUpstreamService", "Watch"),
            Err(GrpcError::Streaming(_))
        ));
        assert!(matches!(
            resolve_method(&pool, "proto.GrpcUpstreamService", "Nope"),
            Err(GrpcError::UnknownMethod(_))
        ));
        assert!(matches!(
            resolve_method(&pool, "proto.Missing", "Hello"),
            Err(GrpcError::UnknownMethod(_))
        ));
    }

    #[test]
    fn json_payload_becomes_message() {
        let pool = pool();
        let desc = pool.get_message_by_name("proto.HelloRequest").unwrap();

        let msg = decode_payload(desc.clone(), r#"{"name":"bob"}"#).unwrap();
        assert_eq!(serde_json::to_string(&msg).unwrap(), r#"{"name":"bob"}"#);

        let empty = decode_payload(desc.clone(), "  ").unwrap();
        assert_eq!(serde_json::to_string(&empty).unwrap(), "{}");

        assert!(matches!(
            decode_payload(desc, r#"{"name": 1"#),
            Err(GrpcError::Encode(_))
        ));
    }

    #[test]
    fn dependencies_come_first() {
        let mut files = HashMap::new();
        for file in [
            named("app.proto", &["common.proto", "google/protobuf/empty.proto"]),
            named("common.proto", &["google/protobuf/empty.proto"]),
            named("google/protobuf/empty.proto", &[]),
        ] {
            files.insert(file.name().to_string(), file);
        }

        let order: Vec<String> = order_by_dependency(files)
            .iter()
            .map(|f| f.name().to_string())
            .collect();
        assert_eq!(order, vec!["google/protobuf/empty.proto", "common.proto", "app.proto"]);
    }

    /// Minimal `proto.GrpcUpstreamService` answering `Hello` with dynamic messages.
    #[derive(Clone)]
    struct Greeter {
        pool: DescriptorPool,
    }

    impl NamedService for Greeter {
        const NAME: &'static str = "proto.GrpcUpstreamService";
    }

    impl tower::Service<axum::http::Request<tonic::body::Body>> for Greeter {
        type Response = axum::http::Response<tonic::body::Body>;
        type Error = Infallible;
        type Future = BoxFuture<'static, Result<Self::Response, Infallible>>;

        fn poll_ready(&mut self, _cx: &mut Context<'_>) -> Poll<Result<(), Infallible>> {
            Poll::Ready(Ok(()))
        }

        fn call(&mut self, req: axum::http::Request<tonic::body::Body>) -> Self::Future {
            let path = req.uri().path().to_string();
            let input = self.pool.get_message_by_name("proto.HelloRequest");
            let output = self.pool.get_message_by_name("proto.HelloReply");

            Box::pin(async move {
                match (path.as_str(), input, output) {
                    ("/proto.GrpcUpstreamService/Hello", Some(input), Some(output)) => {
                        let mut grpc = tonic::server::Grpc::new(DynamicCodec::new(input));
                        Ok(grpc.unary(Hello { reply: output }, req).await)
                    }
                    _ => Ok(Status::unimplemented("no such method").into_http()),
                }
            })
        }
    }

    struct Hello {
        reply: MessageDescriptor,
    }

    impl UnaryService<DynamicMessage> for Hello {
        type Response = DynamicMessage;
        type Future = BoxFuture<'static, Result<tonic::Response<DynamicMessage>, Status>>;

        fn call(&mut self, request: tonic::Request<DynamicMessage>) -> Self::Future {
            let name = request
                .get_ref()
                .get_field_by_name("name")
                .and_then(|v| v.as_str().map(str::to_string))
                .unwrap_or_default();
            let reply = self.reply.clone();

            Box::pin(async move {
                if name.is_empty() {
                    return Err(Status::invalid_argument("name is required"));
                }
                let mut message = DynamicMessage::new(reply);
                message.set_field_by_name("message", Value::String(format!("hello {}", name)));
                Ok(tonic::Response::new(message))
            })
        }
    }

    enum ReflectionVersion {
        V1,
        V1Alpha,
        Disabled,
    }

    async fn start_upstream(version: ReflectionVersion) -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let incoming = TcpListenerStream::new(listener);

        let greeter = Greeter { pool: pool() };
        let reflection = tonic_reflection::server::Builder::configure().register_file_descriptor_set(FileDescriptorSet {
            file: vec![greeter_file()],
        });

        match version {
            ReflectionVersion::V1 => {
                let service = reflection.build_v1().unwrap();
                let router = Server::builder().add_service(service).add_service(greeter);
                tokio::spawn(router.serve_with_incoming(incoming));
            }
            ReflectionVersion::V1Alpha => {
                let service = reflection.build_v1alpha().unwrap();
                let router = Server::builder().add_service(service).add_service(greeter);
                tokio::spawn(router.serve_with_incoming(incoming));
            }
            ReflectionVersion::Disabled => {
                let router = Server::builder().add_service(greeter);
                tokio::spawn(router.serve_with_incoming(incoming));
            }
        }

        addr.to_string()
    }

    fn invoker() -> ReflectionInvoker {
        ReflectionInvoker::new(Duration::from_secs(2))
    }

    #[tokio::test]
    async fn unary_call_through_reflection() {
        let target = start_upstream(ReflectionVersion::V1).await;

        let reply = invoker()
            .invoke(&target, "proto.GrpcUpstreamService/Hello", r#"{"name":"bob"}"#)
            .await
            .unwrap();
        assert_eq!(reply, r#"{"message":"hello bob"}"#);

        let reply = invoker()
            .invoke(&target, "proto.GrpcUpstreamService.Hello", r#"{"name":"amy"}"#)
            .await
            .unwrap();
        assert_eq!(reply, r#"{"message":"hello amy"}"#);
    }

    #[tokio::test]
    async fn v1alpha_only_upstream_is_bridged() {
        let target = start_upstream(ReflectionVersion::V1Alpha).await;

        let reply = invoker()
            .invoke(&target, "proto.GrpcUpstreamService/Hello", r#"{"name":"bob"}"#)
            .await
            .unwrap();
        assert_eq!(reply, r#"{"message":"hello bob"}"#);
    }

    #[tokio::test]
    async fn missing_reflection_names_the_status() {
        let target = start_upstream(ReflectionVersion::Disabled).await;

        let err = invoker()
            .invoke(&target, "proto.GrpcUpstreamService/Hello", "{}")
            .await
            .unwrap_err();
        match err {
            GrpcError::Reflection { reason, .. } => assert!(reason.contains("Unimplemented"), "reason: {}", reason),
            other => panic!("expected reflection error, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn unknown_method_and_remote_status() {
        let target = start_upstream(ReflectionVersion::V1).await;

        let err = invoker()
            .invoke(&target, "proto.GrpcUpstreamService/Nope", "{}")
            .await
            .unwrap_err();
        assert!(matches!(err, GrpcError::UnknownMethod(_)));

        let err = invoker()
            .invoke(&target, "proto.GrpcUpstreamService/Hello", "{}")
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            GrpcError::Status {
                code: tonic::Code::InvalidArgument,
                ..
            }
        ));
    }

    #[tokio::test]
    async fn transport_maps_live_outcomes_to_status_codes() {
        let target = start_upstream(ReflectionVersion::V1).await;
        let transport = GrpcTransport::new(Arc::new(invoker()));

        let request = |uri: String| {
            let mut req = axum::http::Request::builder()
                .method("POST")
                .uri(uri)
                .body(axum::body::Body::empty())
                .unwrap();
            req.extensions_mut()
                .insert(GrpcMethod("proto.GrpcUpstreamService/Hello".into()));
            req
        };

        let resp = transport
            .round_trip(request(format!("grpc://{}/svc2/grpc_hello?name=bob", target)))
            .await
            .unwrap();
        assert_eq!(resp.status(), axum::http::StatusCode::OK);
        let body = axum::body::to_bytes(resp.into_body(), usize::MAX).await.unwrap();
        assert_eq!(&body[..], br#"{"message":"hello bob"}"#);

        let resp = transport
            .round_trip(request(format!("grpc://{}/svc2/grpc_hello", target)))
            .await
            .unwrap();
        assert_eq!(resp.status(), axum::http::StatusCode::INTERNAL_SERVER_ERROR);
        let body = axum::body::to_bytes(resp.into_body(), usize::MAX).await.unwrap();
        assert!(body.is_empty());
    }

    #[tokio::test]
    async fn unreachable_target_is_a_dial_error() {
        let invoker = ReflectionInvoker::new(Duration::from_millis(200));
        let err = invoker
            .invoke("127.0.0.1:1", "proto.GrpcUpstreamService/Hello", "{}")
            .await
            .unwrap_err();
        assert!(matches!(err, GrpcError::Dial { .. }));
    }
}
