//! The request template cloned for each send.
use http::{HeaderMap, HeaderName, HeaderValue, Method};
use url::Url;

/// An immutable description of the outbound call.
///
/// The engine only reads the template. The producer stage clones it once per
/// emission, so aborting one in-flight send never touches its siblings.
#[derive(Clone, Debug)]
pub struct RequestTemplate {
    method: Method,
    url: Url,
    headers: HeaderMap,
}

impl RequestTemplate {
    /// Create a template for the given method and target.
    pub fn new(method: Method, url: Url) -> Self {
        Self { method, url, headers: HeaderMap::new() }
    }

    /// Create a body-less GET template.
    pub fn get(url: Url) -> Self {
        Self::new(Method::GET, url)
    }

    /// Attach a header sent with every request.
    pub fn header(mut self, name: HeaderName, value: HeaderValue) -> Self {
        self.headers.insert(name, value);
        self
    }

    /// The request method.
    pub fn method(&self) -> &Method {
        &self.method
    }

    /// The target URL.
    pub fn url(&self) -> &Url {
        &self.url
    }

    /// Headers sent with every request.
    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clones_are_independent() {
        let template = RequestTemplate::get(Url::parse("http://localhost:8080/ping").unwrap())
            .header(http::header::ACCEPT, HeaderValue::from_static("text/plain"));

        let clone = template.clone();
        assert_eq!(clone.method(), &Method::GET);
        assert_eq!(clone.url().as_str(), "http://localhost:8080/ping");
        assert_eq!(clone.headers().len(), 1);
    }
}
