use serde::Serialize;
use serde_json::{Map, Value};

/// Ordered set of `httpRequest` fields attached to a log event.
///
/// Field names follow the Cloud Logging `HttpRequest` message. The record
/// builder embeds the map as-is, so anything put here ends up on the wire.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct HttpRequestContext {
    fields: Map<String, Value>,
}

/// Inbound request attributes used to populate an [`HttpRequestContext`].
#[derive(Debug, Clone, Default)]
pub struct RequestInfo {
    pub method: String,
    pub scheme: String,
    pub server_name: String,
    /// `0` when the request did not name a port.
    pub server_port: u16,
    pub path: String,
    pub query: Option<String>,
    pub content_length: Option<u64>,
    pub user_agent: Option<String>,
    /// Value of the `X-Forwarded-For` header.
    pub forwarded_for: Option<String>,
    pub referer: Option<String>,
    pub protocol: String,
}

impl RequestInfo {
    /// Reconstruct the full request URL, query string included.
    ///
    /// The port is left out when it is the default one for the scheme.
    pub fn request_url(&self) -> String {
        let mut url = String::with_capacity(64 + self.path.len());
        url.push_str(&self.scheme);
        url.push_str("://");
        url.push_str(&self.server_name);
        let default_port = match self.scheme.as_str() {
            "http" => self.server_port == 0 || self.server_port == 80,
            "https" => self.server_port == 443,
            _ => false,
        };
        if !default_port {
            url.push(':');
            url.push_str(&self.server_port.to_string());
        }
        url.push_str(&self.path);
        if let Some(query) = &self.query {
            url.push('?');
            url.push_str(query);
        }
        url
    }
}

impl HttpRequestContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_fields(fields: Map<String, Value>) -> Self {
        Self { fields }
    }

    /// Build the context from an inbound request and, when available, the
    /// status of the response sent for it.
    pub fn from_request(request: Option<&RequestInfo>, status: Option<u16>) -> Self {
        let mut ctx = Self::new();
        if let Some(req) = request {
            ctx.put("requestMethod", req.method.clone());
            ctx.put("requestUrl", req.request_url());
            ctx.put(
                "requestSize",
                req.content_length.map(|n| n as i64).unwrap_or(-1).to_string(),
            );
            if let Some(ua) = &req.user_agent {
                ctx.put("userAgent", ua.clone());
            }
            if let Some(ip) = &req.forwarded_for {
                ctx.put("remoteIp", ip.clone());
            }
            if let Some(referer) = &req.referer {
                ctx.put("referer", referer.clone());
            }
            ctx.put("protocol", req.protocol.clone());
        }
        if let Some(status) = status {
            ctx.put("status", status.to_string());
        }
        ctx
    }

    /// Latency as a duration string; whole seconds keep their decimal,
    /// e.g. `1.0s`.
    pub fn set_latency(&mut self, latency_seconds: f64) {
        self.put("latency", format!("{:?}s", latency_seconds));
    }

    pub fn set_cache_lookup(&mut self, cache_lookup: bool) {
        self.put("cacheLookup", cache_lookup);
    }

    pub fn set_cache_hit(&mut self, cache_hit: bool) {
        self.put("cacheHit", cache_hit);
    }

    pub fn set_cache_validated_with_origin_server(&mut self, validated: bool) {
        self.put("cacheValidatedWithOriginServer", validated);
    }

    pub fn set_cache_fill_bytes(&mut self, bytes: u64) {
        self.put("cacheFillBytes", bytes.to_string());
    }

    /// Insert or replace a field, returning the previous value.
    pub fn put(&mut self, key: impl Into<String>, value: impl Into<Value>) -> Option<Value> {
        self.fields.insert(key.into(), value.into())
    }

    pub fn fields(&self) -> &Map<String, Value> {
        &self.fields
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(scheme: &str, port: u16) -> RequestInfo {
        RequestInfo {
            method: "GET".into(),
            scheme: scheme.into(),
            server_name: "api.example.com".into(),
            server_port: port,
            path: "/v1/items".into(),
            query: Some("page=2".into()),
            content_length: Some(12),
            user_agent: Some("curl/8.0".into()),
            forwarded_for: None,
            referer: None,
            protocol: "HTTP/1.1".into(),
        }
    }

    #[test]
    fn request_url_omits_default_ports() {
        assert_eq!(request("http", 80).request_url(), "http://api.example.com/v1/items?page=2");
        assert_eq!(request("http", 0).request_url(), "http://api.example.com/v1/items?page=2");
        assert_eq!(request("https", 443).request_url(), "https://api.example.com/v1/items?page=2");
        assert_eq!(
            request("https", 8443).request_url(),
            "https://api.example.com:8443/v1/items?page=2"
        );
    }

    #[test]
    fn fields_keep_insertion_order_and_skip_missing_headers() {
        let mut ctx = HttpRequestContext::from_request(Some(&request("https", 443)), Some(404));
        ctx.set_latency(0.25);
        ctx.set_cache_hit(false);

        let keys: Vec<&str> = ctx.fields().keys().map(String::as_str).collect();
        assert_eq!(
            keys,
            [
                "requestMethod",
                "requestUrl",
                "requestSize",
                "userAgent",
                "protocol",
                "status",
                "latency",
                "cacheHit"
            ]
        );
        assert_eq!(ctx.fields()["status"], "404");
        assert_eq!(ctx.fields()["latency"], "0.25s");
        assert_eq!(ctx.fields()["requestSize"], "12");
    }

    #[test]
    fn whole_second_latency_keeps_decimal() {
        let mut ctx = HttpRequestContext::new();
        ctx.set_latency(1.0);
        assert_eq!(ctx.fields()["latency"], "1.0s");
    }

    #[test]
    fn response_only_context() {
        let ctx = HttpRequestContext::from_request(None, Some(500));
        assert_eq!(ctx.fields().len(), 1);
        assert_eq!(ctx.fields()["status"], "500");
    }
}
