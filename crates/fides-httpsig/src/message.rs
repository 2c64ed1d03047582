/// Capability consumed by the canonicalizer and verifier.
///
/// Anything that can expose a method, a target URI, case-insensitive header
/// lookup and an optional body can be signed or verified; server frameworks
/// adapt their request types to this trait instead of converting into a
/// concrete struct.
pub trait CanonicalRequest {
    /// The HTTP method as sent (any case).
    fn method(&self) -> &str;

    /// The full request URI as transmitted.
    fn target_uri(&self) -> &str;

    /// Case-insensitive header lookup.
    fn header(&self, name: &str) -> Option<&str>;

    /// The request body, if one was sent.
    fn body(&self) -> Option<&[u8]>;
}

/// A concrete HTTP message used by clients when signing outgoing requests.
///
/// Headers preserve insertion order; lookup and replacement are
/// case-insensitive.
#[derive(Debug, Clone)]
pub struct HttpMessage {
    method: String,
    url: String,
    headers: Vec<(String, String)>,
    body: Option<Vec<u8>>,
}

impl HttpMessage {
    /// Create a message with no headers and no body.
    pub fn new(method: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            method: method.into(),
            url: url.into(),
            headers: Vec::new(),
            body: None,
        }
    }

    /// Builder-style header attachment.
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.set_header(name, value);
        self
    }

    /// Builder-style body attachment.
    pub fn with_body(mut self, body: impl Into<Vec<u8>>) -> Self {
        self.body = Some(body.into());
        self
    }

    /// Set or replace a header (case-insensitive on the name).
    pub fn set_header(&mut self, name: impl Into<String>, value: impl Into<String>) {
        let name = name.into();
        let value = value.into();
        if let Some(existing) = self
            .headers
            .iter_mut()
            .find(|(n, _)| n.eq_ignore_ascii_case(&name))
        {
            existing.1 = value;
        } else {
            self.headers.push((name, value));
        }
    }

    /// Replace the body.
    pub fn set_body(&mut self, body: impl Into<Vec<u8>>) {
        self.body = Some(body.into());
    }

    /// All headers in insertion order.
    pub fn headers(&self) -> &[(String, String)] {
        &self.headers
    }
}

impl CanonicalRequest for HttpMessage {
    fn method(&self) -> &str {
        &self.method
    }

    fn target_uri(&self) -> &str {
        &self.url
    }

    fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    fn body(&self) -> Option<&[u8]> {
        self.body.as_deref()
    }
}
