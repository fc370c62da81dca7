use std::fmt;
use std::fs;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use super::error::ActionError;
use super::request::ResponseSink;

const COPY_BUF_SIZE: usize = 8192;

/// Something that can answer a matched request.
///
/// `Ok(true)` means the request was handled and dispatch stops; `Ok(false)`
/// means the action declined and later cases are still tried. Errors abort
/// the dispatch and propagate to the caller.
pub trait Action<T, S>: Send + Sync {
    fn respond(&self, subject: &T, sink: &mut S) -> Result<bool, ActionError>;

    /// Human-readable description for configuration logging.
    fn describe(&self) -> String {
        String::from("?")
    }
}

/// Adapter turning a closure into an [`Action`].
pub struct FnAction<F> {
    f: F,
    name: String,
}

impl<F> FnAction<F> {
    #[must_use]
    pub fn named(name: impl Into<String>, f: F) -> Self {
        Self {
            f,
            name: name.into(),
        }
    }
}

/// Wrap a closure as an [`Action`].
pub fn action_fn<T, S, F>(f: F) -> FnAction<F>
where
    F: Fn(&T, &mut S) -> Result<bool, ActionError> + Send + Sync,
{
    FnAction {
        f,
        name: String::from("fn"),
    }
}

impl<T, S, F> Action<T, S> for FnAction<F>
where
    F: Fn(&T, &mut S) -> Result<bool, ActionError> + Send + Sync,
{
    fn respond(&self, subject: &T, sink: &mut S) -> Result<bool, ActionError> {
        (self.f)(subject, sink)
    }

    fn describe(&self) -> String {
        self.name.clone()
    }
}

/// Where response bytes come from.
///
/// `Bytes` is fixed at configuration time; the other variants are re-read
/// on every dispatch, so file edits or supplier state show up in later
/// responses.
pub enum Content {
    /// Fixed in-memory bytes, length known.
    Bytes(Vec<u8>),
    /// Re-invocable byte supplier, length unknown ahead of time.
    Supplier(Arc<dyn Fn() -> Vec<u8> + Send + Sync>),
    /// A file, re-opened per dispatch, length taken from metadata.
    File(PathBuf),
    /// A resource locator: `file:` prefix or a plain path. Other schemes
    /// are reported as [`ActionError::UnsupportedScheme`] at use.
    Resource(String),
}

impl Content {
    /// Byte length if known ahead of writing.
    #[must_use]
    pub fn length(&self) -> Option<u64> {
        match self {
            Content::Bytes(bytes) => Some(bytes.len() as u64),
            Content::Supplier(_) => None,
            Content::File(path) => fs::metadata(path).map(|m| m.len()).ok(),
            Content::Resource(locator) => match resolve_locator(locator) {
                Ok(path) => fs::metadata(path).map(|m| m.len()).ok(),
                Err(_) => None,
            },
        }
    }

    pub(crate) fn write_to<S: ResponseSink>(&self, sink: &mut S) -> Result<(), ActionError> {
        match self {
            Content::Bytes(bytes) => sink.write_body(bytes)?,
            Content::Supplier(supplier) => sink.write_body(&supplier())?,
            Content::File(path) => copy_file(path, sink)?,
            Content::Resource(locator) => copy_file(&resolve_locator(locator)?, sink)?,
        }
        Ok(())
    }

    fn describe(&self) -> String {
        match self {
            Content::Bytes(bytes) => format!("bytes({})", bytes.len()),
            Content::Supplier(_) => String::from("supplier"),
            Content::File(path) => format!("file: {}", path.display()),
            Content::Resource(locator) => format!("resource: {locator}"),
        }
    }
}

impl fmt::Debug for Content {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.describe())
    }
}

fn resolve_locator(locator: &str) -> Result<PathBuf, ActionError> {
    if let Some(path) = locator.strip_prefix("file:") {
        return Ok(PathBuf::from(path));
    }
    // A scheme prefix other than file: (e.g. "classpath:") is not
    // resolvable here. Windows-style drive letters are not schemes.
    if let Some(colon) = locator.find(':') {
        if colon > 1 {
            return Err(ActionError::UnsupportedScheme {
                locator: locator.to_owned(),
            });
        }
    }
    Ok(PathBuf::from(locator))
}

fn copy_file<S: ResponseSink>(path: &Path, sink: &mut S) -> Result<(), ActionError> {
    let mut file = fs::File::open(path)?;
    let mut buf = [0_u8; COPY_BUF_SIZE];
    loop {
        let n = file.read(&mut buf)?;
        if n == 0 {
            return Ok(());
        }
        sink.write_body(&buf[..n])?;
    }
}

/// The built-in response-producing action: status, headers, and one
/// optional content source, streamed to the sink.
///
/// Status, content type, length (when known), and headers are all set
/// before the first body byte is written.
#[derive(Debug)]
pub struct Responder {
    name: Option<String>,
    status: u16,
    content_type: Option<String>,
    headers: Vec<(String, String)>,
    length: Option<u64>,
    content: Option<Content>,
}

impl Responder {
    #[must_use]
    pub fn builder() -> ResponderBuilder {
        ResponderBuilder::default()
    }

    #[must_use]
    pub fn status(&self) -> u16 {
        self.status
    }

    fn describe(&self) -> String {
        if let Some(name) = &self.name {
            return name.clone();
        }
        match &self.content {
            Some(content) => content.describe(),
            None => format!("status({})", self.status),
        }
    }
}

impl<T, S: ResponseSink> Action<T, S> for Responder {
    fn respond(&self, _subject: &T, sink: &mut S) -> Result<bool, ActionError> {
        if let Some(content_type) = &self.content_type {
            sink.set_content_type(content_type);
        }
        let length = self
            .length
            .or_else(|| self.content.as_ref().and_then(Content::length));
        if let Some(length) = length {
            sink.set_content_length(length);
        }
        sink.set_status(self.status);
        for (name, value) in &self.headers {
            sink.add_header(name, value);
        }
        if let Some(content) = &self.content {
            content.write_to(sink)?;
        }
        Ok(true)
    }

    fn describe(&self) -> String {
        Responder::describe(self)
    }
}

/// Builder for [`Responder`].
///
/// # Example
///
/// ```
/// use mimicry::Responder;
///
/// let responder = Responder::builder()
///     .status(200)
///     .content_type("application/json")
///     .text(r#"{"ok":true}"#)
///     .build();
/// assert_eq!(responder.status(), 200);
/// ```
#[derive(Debug)]
pub struct ResponderBuilder {
    name: Option<String>,
    status: u16,
    content_type: Option<String>,
    headers: Vec<(String, String)>,
    length: Option<u64>,
    content: Option<Content>,
}

impl Default for ResponderBuilder {
    fn default() -> Self {
        Self {
            name: None,
            status: 200,
            content_type: None,
            headers: Vec::new(),
            length: None,
            content: None,
        }
    }
}

impl ResponderBuilder {
    /// Name used in configuration logging instead of the content summary.
    #[must_use]
    pub fn name(mut self, value: impl Into<String>) -> Self {
        self.name = Some(value.into());
        self
    }

    #[must_use]
    pub fn status(mut self, value: u16) -> Self {
        self.status = value;
        self
    }

    #[must_use]
    pub fn content_type(mut self, value: impl Into<String>) -> Self {
        self.content_type = Some(value.into());
        self
    }

    #[must_use]
    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    /// Override the reported content length. Normally derived from the
    /// content source when known.
    #[must_use]
    pub fn length(mut self, value: u64) -> Self {
        self.length = Some(value);
        self
    }

    /// Fixed text content.
    #[must_use]
    pub fn text(mut self, value: impl Into<String>) -> Self {
        self.content = Some(Content::Bytes(value.into().into_bytes()));
        self
    }

    /// Fixed byte content.
    #[must_use]
    pub fn bytes(mut self, value: Vec<u8>) -> Self {
        self.content = Some(Content::Bytes(value));
        self
    }

    /// Dynamic content, re-evaluated on every dispatch.
    #[must_use]
    pub fn supplier(mut self, supplier: impl Fn() -> Vec<u8> + Send + Sync + 'static) -> Self {
        self.content = Some(Content::Supplier(Arc::new(supplier)));
        self
    }

    /// File content, re-opened on every dispatch.
    #[must_use]
    pub fn file(mut self, path: impl Into<PathBuf>) -> Self {
        self.content = Some(Content::File(path.into()));
        self
    }

    /// Content from a resource locator (`file:` prefix or plain path).
    #[must_use]
    pub fn resource(mut self, locator: impl Into<String>) -> Self {
        self.content = Some(Content::Resource(locator.into()));
        self
    }

    #[must_use]
    pub fn build(self) -> Responder {
        Responder {
            name: self.name,
            status: self.status,
            content_type: self.content_type,
            headers: self.headers,
            length: self.length,
            content: self.content,
        }
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;
    use crate::types::request::CapturedResponse;

    #[test]
    fn responder_writes_status_headers_and_body() {
        let responder = Responder::builder()
            .status(201)
            .content_type("text/plain")
            .header("x-mock", "yes")
            .text("created")
            .build();

        let mut sink = CapturedResponse::new();
        let handled = Action::<(), _>::respond(&responder, &(), &mut sink).unwrap();

        assert!(handled);
        assert_eq!(sink.status(), 201);
        assert_eq!(sink.content_type(), Some("text/plain"));
        assert_eq!(sink.content_length(), Some(7));
        assert_eq!(sink.header("x-mock"), Some("yes"));
        assert_eq!(sink.body_text(), "created");
    }

    #[test]
    fn responder_without_content_sets_status_only() {
        let responder = Responder::builder().status(204).build();
        let mut sink = CapturedResponse::new();
        Action::<(), _>::respond(&responder, &(), &mut sink).unwrap();
        assert_eq!(sink.status(), 204);
        assert!(sink.body().is_empty());
        assert_eq!(sink.content_length(), None);
    }

    #[test]
    fn explicit_length_overrides_content_length() {
        let responder = Responder::builder().length(3).text("abcdef").build();
        let mut sink = CapturedResponse::new();
        Action::<(), _>::respond(&responder, &(), &mut sink).unwrap();
        assert_eq!(sink.content_length(), Some(3));
        assert_eq!(sink.body_text(), "abcdef");
    }

    #[test]
    fn supplier_content_is_reinvoked_per_dispatch() {
        use std::sync::atomic::{AtomicUsize, Ordering};
        let counter = Arc::new(AtomicUsize::new(0));
        let counter_clone = Arc::clone(&counter);
        let responder = Responder::builder()
            .supplier(move || {
                let n = counter_clone.fetch_add(1, Ordering::SeqCst);
                format!("call {n}").into_bytes()
            })
            .build();

        let mut first = CapturedResponse::new();
        Action::<(), _>::respond(&responder, &(), &mut first).unwrap();
        let mut second = CapturedResponse::new();
        Action::<(), _>::respond(&responder, &(), &mut second).unwrap();

        assert_eq!(first.body_text(), "call 0");
        assert_eq!(second.body_text(), "call 1");
        // Supplier length is unknown ahead of time.
        assert_eq!(first.content_length(), None);
    }

    #[test]
    fn file_content_is_reread_per_dispatch() {
        let mut tmp = tempfile::NamedTempFile::new().unwrap();
        write!(tmp, "first").unwrap();
        let responder = Responder::builder().file(tmp.path()).build();

        let mut sink = CapturedResponse::new();
        Action::<(), _>::respond(&responder, &(), &mut sink).unwrap();
        assert_eq!(sink.body_text(), "first");
        assert_eq!(sink.content_length(), Some(5));

        std::fs::write(tmp.path(), b"second!").unwrap();
        let mut sink = CapturedResponse::new();
        Action::<(), _>::respond(&responder, &(), &mut sink).unwrap();
        assert_eq!(sink.body_text(), "second!");
    }

    #[test]
    fn missing_file_propagates_as_error() {
        let responder = Responder::builder().file("/definitely/not/here.txt").build();
        let mut sink = CapturedResponse::new();
        let result = Action::<(), _>::respond(&responder, &(), &mut sink);
        assert!(matches!(result, Err(ActionError::Io(_))));
    }

    #[test]
    fn resource_file_prefix_resolves() {
        let mut tmp = tempfile::NamedTempFile::new().unwrap();
        write!(tmp, "resource data").unwrap();
        let locator = format!("file:{}", tmp.path().display());
        let responder = Responder::builder().resource(locator).build();

        let mut sink = CapturedResponse::new();
        Action::<(), _>::respond(&responder, &(), &mut sink).unwrap();
        assert_eq!(sink.body_text(), "resource data");
    }

    #[test]
    fn resource_unknown_scheme_is_rejected() {
        let responder = Responder::builder().resource("classpath:data.json").build();
        let mut sink = CapturedResponse::new();
        let result = Action::<(), _>::respond(&responder, &(), &mut sink);
        assert!(matches!(result, Err(ActionError::UnsupportedScheme { .. })));
    }

    #[test]
    fn action_fn_adapts_closures() {
        let action = action_fn(|subject: &u32, sink: &mut CapturedResponse| {
            sink.set_status(200);
            sink.write_body(subject.to_string().as_bytes())?;
            Ok(true)
        });
        let mut sink = CapturedResponse::new();
        assert!(action.respond(&42, &mut sink).unwrap());
        assert_eq!(sink.body_text(), "42");
        assert_eq!(action.describe(), "fn");
    }

    #[test]
    fn named_action_fn_describe() {
        let action = FnAction::named("teapot", |_: &(), sink: &mut CapturedResponse| {
            sink.set_status(418);
            Ok(true)
        });
        assert_eq!(Action::<(), CapturedResponse>::describe(&action), "teapot");
    }

    #[test]
    fn describe_prefers_name_then_content() {
        let named = Responder::builder().name("health").text("ok").build();
        assert_eq!(named.describe(), "health");

        let content_only = Responder::builder().text("ok").build();
        assert_eq!(content_only.describe(), "bytes(2)");

        let bare = Responder::builder().status(404).build();
        assert_eq!(bare.describe(), "status(404)");
    }
}
