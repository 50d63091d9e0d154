use serde_json::Value;

/// How a response was produced
#[derive(Clone, Copy, Debug, PartialEq, Eq, strum::Display, strum::IntoStaticStr)]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum CacheStatus {
    /// Everything came from the cache
    Hit,
    /// Some of the response came from the cache, the rest from the server
    PartialHit,
    /// Nothing useful was cached, so the whole query went to the server
    Miss,
    /// The operation isn't cacheable and was sent through untouched
    PassThrough,
}

#[derive(Clone, Debug, PartialEq)]
pub struct Response {
    /// The response body, an object with a `data` key
    pub body: Value,
    pub status: CacheStatus,
}

impl Response {
    pub(crate) fn hit(data: Value) -> Self {
        Response::wrapped(data, CacheStatus::Hit)
    }

    pub(crate) fn partial_hit(data: Value) -> Self {
        Response::wrapped(data, CacheStatus::PartialHit)
    }

    pub(crate) fn miss(data: Value) -> Self {
        Response::wrapped(data, CacheStatus::Miss)
    }

    /// A pass-through response is returned exactly as the server sent it
    pub(crate) fn pass_through(body: Value) -> Self {
        Response {
            body,
            status: CacheStatus::PassThrough,
        }
    }

    fn wrapped(data: Value, status: CacheStatus) -> Self {
        let mut body = serde_json::Map::new();
        body.insert("data".to_string(), data);

        Response {
            body: Value::Object(body),
            status,
        }
    }

    pub fn data(&self) -> Option<&Value> {
        self.body.get("data")
    }

    pub fn into_body(self) -> Value {
        self.body
    }
}
