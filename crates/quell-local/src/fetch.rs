use std::time::Duration;

use quell::{GraphqlRequest, TransportError, TransportInner, TransportResult};

/// Sends queries to a GraphQL server over HTTP
#[derive(Clone)]
pub struct NativeTransport {
    client: reqwest::Client,
}

impl NativeTransport {
    pub fn new() -> TransportResult<Self> {
        Ok(NativeTransport {
            client: reqwest::Client::builder()
                .pool_idle_timeout(Some(Duration::from_secs(5)))
                .build()
                .map_err(TransportError::failed)?,
        })
    }
}

#[derive(serde::Serialize)]
struct RequestBody<'a> {
    query: &'a str,
}

#[async_trait::async_trait]
impl TransportInner for NativeTransport {
    async fn send(&self, request: GraphqlRequest<'_>) -> TransportResult<serde_json::Value> {
        let response = self
            .client
            .post(request.endpoint)
            .headers(request.headers.clone())
            .json(&RequestBody { query: request.query })
            .send()
            .await
            .map_err(TransportError::failed)?;

        let status = response.status();
        if !status.is_success() {
            tracing::debug!(%status, "server responded with a non-success status");
        }

        response.json().await.map_err(TransportError::failed)
    }
}

#[cfg(test)]
mod tests {
    use http::{header, HeaderMap, HeaderValue};
    use quell::Transport;
    use serde_json::json;
    use wiremock::{
        matchers::{body_json, header as header_matcher, method, path},
        Mock, MockServer, ResponseTemplate,
    };

    use super::*;

    fn headers() -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(header::CONTENT_TYPE, HeaderValue::from_static("application/json"));
        headers.insert(header::AUTHORIZATION, HeaderValue::from_static("Bearer secret"));
        headers
    }

    #[tokio::test]
    async fn test_posts_queries() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/graphql"))
            .and(header_matcher("authorization", "Bearer secret"))
            .and(body_json(json!({"query": "{ getCharacter(_id: 1) { name } }"})))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"data": {"getCharacter": {"name": "Luke"}}})))
            .expect(1)
            .mount(&server)
            .await;

        let transport = Transport::new(NativeTransport::new().unwrap());
        let endpoint = format!("{}/graphql", server.uri());
        let headers = headers();

        let data = transport
            .fetch_data(GraphqlRequest {
                endpoint: &endpoint,
                query: "{ getCharacter(_id: 1) { name } }",
                headers: &headers,
            })
            .await
            .unwrap();

        assert_eq!(data, json!({"getCharacter": {"name": "Luke"}}));
    }

    #[tokio::test]
    async fn test_error_bodies_are_returned() {
        let server = MockServer::start().await;
        let body = json!({"errors": [{"message": "Cannot query field \"nope\""}]});
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(400).set_body_json(body.clone()))
            .mount(&server)
            .await;

        let transport = NativeTransport::new().unwrap();
        let headers = headers();

        let response = transport
            .send(GraphqlRequest {
                endpoint: &server.uri(),
                query: "{ nope }",
                headers: &headers,
            })
            .await
            .unwrap();

        assert_eq!(response, body);
    }

    #[tokio::test]
    async fn test_non_json_responses_fail() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(502).set_body_string("bad gateway"))
            .mount(&server)
            .await;

        let transport = NativeTransport::new().unwrap();
        let headers = headers();

        let error = transport
            .send(GraphqlRequest {
                endpoint: &server.uri(),
                query: "{ a }",
                headers: &headers,
            })
            .await
            .unwrap_err();

        assert!(matches!(error, TransportError::Failed(_)), "{error:?}");
    }
}
