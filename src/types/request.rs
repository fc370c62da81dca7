use std::io;
use std::sync::Arc;

use serde_json::Value;

use crate::build::ConditionBuilder;

use super::condition::Condition;
use super::error::BuildError;
use super::string_condition::{Extractor, StringCondition, StringOp};

/// String-valued accessors over an inbound request, consumed by condition
/// leaves. Every accessor is a pure function of the request; only the body
/// read may fail.
pub trait RequestView {
    fn method(&self) -> Option<String>;
    fn path(&self) -> Option<String>;
    fn query(&self) -> Option<String>;
    fn content_type(&self) -> Option<String>;
    fn header(&self, name: &str) -> Option<String>;
    fn param(&self, name: &str) -> Option<String>;
    fn remote_addr(&self) -> Option<String>;
    fn local_addr(&self) -> Option<String>;

    /// The request body. May be re-read by multiple leaves during one
    /// evaluation.
    ///
    /// # Errors
    ///
    /// I/O errors reading the body. Leaves degrade the error to its
    /// display text rather than propagating it.
    fn body(&self) -> io::Result<Vec<u8>>;
}

/// The output side of a dispatch: status, headers, and a byte payload.
/// Status, content type, and length are set before body bytes are written.
pub trait ResponseSink {
    fn set_status(&mut self, status: u16);
    fn set_content_type(&mut self, value: &str);
    fn set_content_length(&mut self, length: u64);
    fn add_header(&mut self, name: &str, value: &str);

    /// Append a chunk of body bytes.
    ///
    /// # Errors
    ///
    /// I/O errors writing to the underlying transport.
    fn write_body(&mut self, chunk: &[u8]) -> io::Result<()>;
}

/// A plain in-memory request, usable as the dispatch subject directly or as
/// a test stand-in for a server-specific request type.
#[derive(Debug, Clone, Default)]
pub struct SimpleRequest {
    method: String,
    path: String,
    query: Option<String>,
    content_type: Option<String>,
    headers: Vec<(String, String)>,
    params: Vec<(String, String)>,
    remote_addr: Option<String>,
    local_addr: Option<String>,
    body: Vec<u8>,
}

impl SimpleRequest {
    #[must_use]
    pub fn new(method: impl Into<String>, path: impl Into<String>) -> Self {
        Self {
            method: method.into(),
            path: path.into(),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_query(mut self, value: impl Into<String>) -> Self {
        self.query = Some(value.into());
        self
    }

    #[must_use]
    pub fn with_content_type(mut self, value: impl Into<String>) -> Self {
        self.content_type = Some(value.into());
        self
    }

    #[must_use]
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    #[must_use]
    pub fn with_param(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.params.push((name.into(), value.into()));
        self
    }

    #[must_use]
    pub fn with_remote_addr(mut self, value: impl Into<String>) -> Self {
        self.remote_addr = Some(value.into());
        self
    }

    #[must_use]
    pub fn with_local_addr(mut self, value: impl Into<String>) -> Self {
        self.local_addr = Some(value.into());
        self
    }

    #[must_use]
    pub fn with_body(mut self, body: impl Into<Vec<u8>>) -> Self {
        self.body = body.into();
        self
    }
}

impl RequestView for SimpleRequest {
    fn method(&self) -> Option<String> {
        Some(self.method.clone())
    }

    fn path(&self) -> Option<String> {
        Some(self.path.clone())
    }

    fn query(&self) -> Option<String> {
        self.query.clone()
    }

    fn content_type(&self) -> Option<String> {
        self.content_type.clone()
    }

    fn header(&self, name: &str) -> Option<String> {
        self.headers
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.clone())
    }

    fn param(&self, name: &str) -> Option<String> {
        if let Some(value) = self
            .params
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v.clone())
        {
            return Some(value);
        }
        // Fall back to the query string.
        let query = self.query.as_deref()?;
        query.split('&').find_map(|pair| {
            let (n, v) = pair.split_once('=')?;
            (n == name).then(|| v.to_owned())
        })
    }

    fn remote_addr(&self) -> Option<String> {
        self.remote_addr.clone()
    }

    fn local_addr(&self) -> Option<String> {
        self.local_addr.clone()
    }

    fn body(&self) -> io::Result<Vec<u8>> {
        Ok(self.body.clone())
    }
}

/// An in-memory [`ResponseSink`] that records what an action wrote.
#[derive(Debug, Clone, Default)]
pub struct CapturedResponse {
    status: u16,
    content_type: Option<String>,
    content_length: Option<u64>,
    headers: Vec<(String, String)>,
    body: Vec<u8>,
}

impl CapturedResponse {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn status(&self) -> u16 {
        self.status
    }

    #[must_use]
    pub fn content_type(&self) -> Option<&str> {
        self.content_type.as_deref()
    }

    #[must_use]
    pub fn content_length(&self) -> Option<u64> {
        self.content_length
    }

    #[must_use]
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    #[must_use]
    pub fn headers(&self) -> &[(String, String)] {
        &self.headers
    }

    #[must_use]
    pub fn body(&self) -> &[u8] {
        &self.body
    }

    /// The body decoded as UTF-8 (lossy).
    #[must_use]
    pub fn body_text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }
}

impl ResponseSink for CapturedResponse {
    fn set_status(&mut self, status: u16) {
        self.status = status;
    }

    fn set_content_type(&mut self, value: &str) {
        self.content_type = Some(value.to_owned());
    }

    fn set_content_length(&mut self, length: u64) {
        self.content_length = Some(length);
    }

    fn add_header(&mut self, name: &str, value: &str) {
        self.headers.push((name.to_owned(), value.to_owned()));
    }

    fn write_body(&mut self, chunk: &[u8]) -> io::Result<()> {
        self.body.extend_from_slice(chunk);
        Ok(())
    }
}

/// Condition builder over request subjects: the combinators of
/// [`ConditionBuilder`] plus a leaf factory per request accessor.
///
/// Written the way the expression reads:
///
/// ```
/// use mimicry::{RequestConditionBuilder, SimpleRequest};
///
/// let condition = RequestConditionBuilder::new()
///     .method().equals("GET")
///     .and()
///     .open_group()
///         .path().starts_with("/foo")
///         .or()
///         .path().starts_with("/bar")
///     .close_group()
///     .build()
///     .unwrap();
///
/// assert!(condition.check(&SimpleRequest::new("GET", "/foo/1")));
/// assert!(!condition.check(&SimpleRequest::new("POST", "/foo/1")));
/// ```
pub struct RequestConditionBuilder<T = SimpleRequest> {
    inner: ConditionBuilder<T>,
}

impl<T> RequestConditionBuilder<T> {
    #[must_use]
    pub fn new() -> Self {
        Self {
            inner: ConditionBuilder::new(),
        }
    }

    #[must_use]
    pub fn not(mut self) -> Self {
        self.inner = self.inner.not();
        self
    }

    #[must_use]
    pub fn and(mut self) -> Self {
        self.inner = self.inner.and();
        self
    }

    #[must_use]
    pub fn or(mut self) -> Self {
        self.inner = self.inner.or();
        self
    }

    #[must_use]
    pub fn open_group(mut self) -> Self {
        self.inner = self.inner.open_group();
        self
    }

    #[must_use]
    pub fn close_group(mut self) -> Self {
        self.inner = self.inner.close_group();
        self
    }

    /// Add a prebuilt condition as the next operand.
    #[must_use]
    pub fn cond(mut self, condition: Condition<T>) -> Self {
        self.inner = self.inner.add(condition);
        self
    }

    /// A leaf that matches every request.
    #[must_use]
    pub fn any(self) -> Self {
        self.cond(Condition::always(true))
    }

    /// Finalize the expression. See [`ConditionBuilder::build`].
    ///
    /// # Errors
    ///
    /// Returns [`BuildError`] for a malformed expression or an invalid
    /// leaf pattern.
    pub fn build(self) -> Result<Condition<T>, BuildError> {
        self.inner.build()
    }

    pub(crate) fn fail(&mut self, error: BuildError) {
        self.inner.fail(error);
    }
}

impl<T: 'static> RequestConditionBuilder<T> {
    /// A named predicate leaf for tests the string operations cannot
    /// express.
    #[must_use]
    pub fn test(
        self,
        name: impl Into<String>,
        test: impl Fn(&T) -> bool + Send + Sync + 'static,
    ) -> Self {
        self.cond(Condition::test(name, test))
    }
}

impl<T: RequestView + 'static> RequestConditionBuilder<T> {
    #[must_use]
    pub fn method(self) -> StringConditionBuilder<T> {
        self.string_leaf("method", |r: &T| Ok(r.method()))
    }

    #[must_use]
    pub fn path(self) -> StringConditionBuilder<T> {
        self.string_leaf("path", |r: &T| Ok(r.path()))
    }

    #[must_use]
    pub fn query(self) -> StringConditionBuilder<T> {
        self.string_leaf("query", |r: &T| Ok(r.query()))
    }

    #[must_use]
    pub fn content_type(self) -> StringConditionBuilder<T> {
        self.string_leaf("contentType", |r: &T| Ok(r.content_type()))
    }

    #[must_use]
    pub fn header(self, name: impl Into<String>) -> StringConditionBuilder<T> {
        let name = name.into();
        let display = format!("header[{name}]");
        self.string_leaf(display, move |r: &T| Ok(r.header(&name)))
    }

    #[must_use]
    pub fn param(self, name: impl Into<String>) -> StringConditionBuilder<T> {
        let name = name.into();
        let display = format!("param[{name}]");
        self.string_leaf(display, move |r: &T| Ok(r.param(&name)))
    }

    #[must_use]
    pub fn remote_addr(self) -> StringConditionBuilder<T> {
        self.string_leaf("remoteAddr", |r: &T| Ok(r.remote_addr()))
    }

    #[must_use]
    pub fn local_addr(self) -> StringConditionBuilder<T> {
        self.string_leaf("localAddr", |r: &T| Ok(r.local_addr()))
    }

    /// The request body decoded as UTF-8.
    #[must_use]
    pub fn content(self) -> StringConditionBuilder<T> {
        self.string_leaf("content", |r: &T| {
            let body = r.body()?;
            Ok(Some(String::from_utf8_lossy(&body).into_owned()))
        })
    }

    /// A scalar extracted from the JSON request body at a key path.
    /// Array segments may be numeric indices. An unparseable body degrades
    /// to the parse error's text; a missing path is an absent value.
    #[must_use]
    pub fn json_content(self, path: &[&str]) -> StringConditionBuilder<T> {
        let segments: Vec<String> = path.iter().map(|s| (*s).to_owned()).collect();
        let display = format!("jsonContent [{}]", segments.join(", "));
        self.string_leaf(display, move |r: &T| {
            let body = r.body()?;
            json_literal(&body, &segments)
        })
    }

    fn string_leaf(
        self,
        name: impl Into<String>,
        extract: impl Fn(&T) -> io::Result<Option<String>> + Send + Sync + 'static,
    ) -> StringConditionBuilder<T> {
        StringConditionBuilder {
            parent: self,
            name: name.into(),
            extract: Arc::new(extract),
        }
    }
}

impl<T> Default for RequestConditionBuilder<T> {
    fn default() -> Self {
        Self::new()
    }
}

/// Child builder finishing one string leaf: pick the operation, get the
/// parent back.
pub struct StringConditionBuilder<T> {
    parent: RequestConditionBuilder<T>,
    name: String,
    extract: Extractor<T>,
}

impl<T> StringConditionBuilder<T> {
    #[must_use]
    pub fn exists(self) -> RequestConditionBuilder<T> {
        self.finish(StringOp::Exists, None)
    }

    #[must_use]
    pub fn equals(self, param: &str) -> RequestConditionBuilder<T> {
        self.finish(StringOp::Equals, Some(param))
    }

    #[must_use]
    pub fn equals_ignore_case(self, param: &str) -> RequestConditionBuilder<T> {
        self.finish(StringOp::EqualsIgnoreCase, Some(param))
    }

    #[must_use]
    pub fn starts_with(self, param: &str) -> RequestConditionBuilder<T> {
        self.finish(StringOp::StartsWith, Some(param))
    }

    #[must_use]
    pub fn ends_with(self, param: &str) -> RequestConditionBuilder<T> {
        self.finish(StringOp::EndsWith, Some(param))
    }

    #[must_use]
    pub fn contains(self, param: &str) -> RequestConditionBuilder<T> {
        self.finish(StringOp::Contains, Some(param))
    }

    /// Ant-style path pattern match (`*`, `**`, `?`).
    #[must_use]
    pub fn matches(self, param: &str) -> RequestConditionBuilder<T> {
        self.finish(StringOp::Match, Some(param))
    }

    /// Full-string regular expression match.
    #[must_use]
    pub fn regexp(self, param: &str) -> RequestConditionBuilder<T> {
        self.finish(StringOp::Regexp, Some(param))
    }

    fn finish(self, op: StringOp, param: Option<&str>) -> RequestConditionBuilder<T> {
        let Self {
            mut parent,
            name,
            extract,
        } = self;
        match StringCondition::from_extractor(name, op, param, extract) {
            Ok(leaf) => parent.cond(Condition::Leaf(leaf)),
            Err(error) => {
                parent.fail(error);
                parent
            }
        }
    }
}

fn json_literal(bytes: &[u8], path: &[String]) -> io::Result<Option<String>> {
    let root: Value = serde_json::from_slice(bytes).map_err(io::Error::other)?;
    let mut current = &root;
    for segment in path {
        current = match current {
            Value::Object(map) => match map.get(segment) {
                Some(value) => value,
                None => return Ok(None),
            },
            Value::Array(items) => {
                match segment.parse::<usize>().ok().and_then(|i| items.get(i)) {
                    Some(value) => value,
                    None => return Ok(None),
                }
            }
            _ => return Ok(None),
        };
    }
    Ok(match current {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        Value::Null | Value::Object(_) | Value::Array(_) => None,
    })
}
