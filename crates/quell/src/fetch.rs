use std::sync::Arc;

#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("request failed: {0}")]
    Failed(String),
    #[error("server responded with errors: {0}")]
    ErrorPayload(serde_json::Value),
    #[error("server response had no data")]
    MissingData,
}

impl TransportError {
    pub fn failed(error: impl ToString) -> Self {
        TransportError::Failed(error.to_string())
    }
}

pub type TransportResult<T> = Result<T, TransportError>;

pub struct GraphqlRequest<'a> {
    pub endpoint: &'a str,
    pub query: &'a str,
    pub headers: &'a http::HeaderMap,
}

/// Sends a query somewhere and hands back the JSON that came back
#[async_trait::async_trait]
pub trait TransportInner: Send + Sync {
    async fn send(&self, request: GraphqlRequest<'_>) -> TransportResult<serde_json::Value>;
}

#[derive(Clone)]
pub struct Transport {
    inner: Arc<dyn TransportInner>,
}

impl Transport {
    pub fn new(transport: impl TransportInner + 'static) -> Transport {
        Transport {
            inner: Arc::new(transport),
        }
    }

    /// Sends a request, treating any `error` or `errors` in the response as a failure.
    ///
    /// Returns the `data` of the response.
    pub async fn fetch_data(&self, request: GraphqlRequest<'_>) -> TransportResult<serde_json::Value> {
        let mut body = self.inner.send(request).await?;

        let Some(object) = body.as_object_mut() else {
            return Err(TransportError::MissingData);
        };

        if let Some(errors) = object.get("errors").or_else(|| object.get("error")) {
            return Err(TransportError::ErrorPayload(errors.clone()));
        }

        object.remove("data").ok_or(TransportError::MissingData)
    }
}

impl std::ops::Deref for Transport {
    type Target = dyn TransportInner;

    fn deref(&self) -> &Self::Target {
        self.inner.as_ref()
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    struct Canned(serde_json::Value);

    #[async_trait::async_trait]
    impl TransportInner for Canned {
        async fn send(&self, _request: GraphqlRequest<'_>) -> TransportResult<serde_json::Value> {
            Ok(self.0.clone())
        }
    }

    fn request(headers: &http::HeaderMap) -> GraphqlRequest<'_> {
        GraphqlRequest {
            endpoint: "/graphql",
            query: "{ a }",
            headers,
        }
    }

    #[tokio::test]
    async fn test_fetch_data_unwraps_data() {
        let headers = http::HeaderMap::new();
        let transport = Transport::new(Canned(json!({"data": {"a": 1}})));

        let data = transport.fetch_data(request(&headers)).await.unwrap();

        assert_eq!(data, json!({"a": 1}));
    }

    #[tokio::test]
    async fn test_fetch_data_rejects_error_payloads() {
        let headers = http::HeaderMap::new();

        let transport = Transport::new(Canned(json!({"data": null, "errors": [{"message": "boom"}]})));
        let error = transport.fetch_data(request(&headers)).await.unwrap_err();
        assert!(matches!(error, TransportError::ErrorPayload(_)), "{error:?}");

        let transport = Transport::new(Canned(json!({"error": "boom"})));
        let error = transport.fetch_data(request(&headers)).await.unwrap_err();
        assert!(matches!(error, TransportError::ErrorPayload(_)), "{error:?}");

        let transport = Transport::new(Canned(json!({})));
        let error = transport.fetch_data(request(&headers)).await.unwrap_err();
        assert!(matches!(error, TransportError::MissingData), "{error:?}");
    }
}
