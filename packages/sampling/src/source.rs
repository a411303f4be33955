//! Incremental reader for the `features` array of a `GeoJSON` document.
//!
//! [`FeatureStream`] scans the document byte by byte and buffers only the
//! feature currently being decoded, so peak memory tracks the largest
//! single feature rather than the file. Members of the top-level object
//! other than `features` are skipped without being decoded.
//!
//! The stream is forward-only and yields each feature once. Any structural
//! error, including a document that ends early, ends the stream with
//! [`SamplingError::InvalidInput`].

use std::fs::File;
use std::io::{BufRead, BufReader, ErrorKind};
use std::path::Path;

use serde_json::{Map, Value};

use crate::SamplingError;

/// Read buffer size for source files.
const READ_BUFFER_SIZE: usize = 64 * 1024;

/// One feature of the collection, holding only what sampling needs.
#[derive(Debug, Clone, PartialEq)]
pub struct RawFeature {
    /// The `geometry` member, or `null` when absent.
    pub geometry: Value,
    /// The `properties` member; empty when absent or `null`.
    pub properties: Map<String, Value>,
}

impl RawFeature {
    /// Builds a feature from a decoded array item.
    ///
    /// Returns `None` for items that are not JSON objects and for features
    /// whose `properties` is neither an object nor `null`.
    #[must_use]
    pub fn from_value(value: Value) -> Option<Self> {
        let Value::Object(mut object) = value else {
            return None;
        };
        let properties = match object.remove("properties") {
            Some(Value::Object(map)) => map,
            None | Some(Value::Null) => Map::new(),
            Some(_) => return None,
        };
        let geometry = object.remove("geometry").unwrap_or(Value::Null);
        Some(Self {
            geometry,
            properties,
        })
    }
}

/// Opens `path` and returns a stream over its features.
///
/// # Errors
///
/// * [`SamplingError::NotFound`] if `path` does not exist or is not a
///   regular file
/// * [`SamplingError::Io`] if the file cannot be opened
pub fn open_features(path: &Path) -> Result<FeatureStream<BufReader<File>>, SamplingError> {
    let metadata = match std::fs::metadata(path) {
        Ok(metadata) => metadata,
        Err(e) if e.kind() == ErrorKind::NotFound => {
            return Err(SamplingError::NotFound(path.display().to_string()));
        }
        Err(e) => return Err(e.into()),
    };
    if !metadata.is_file() {
        return Err(SamplingError::NotFound(path.display().to_string()));
    }

    let file = File::open(path)?;
    Ok(FeatureStream::new(BufReader::with_capacity(
        READ_BUFFER_SIZE,
        file,
    )))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    /// Nothing read yet.
    Start,
    /// Inside the `features` array.
    Features { first: bool },
    /// Exhausted or failed.
    Done,
}

/// Lazy iterator over the features of a `GeoJSON` `FeatureCollection`.
///
/// Items that are not objects, or whose `properties` is not an object or
/// `null`, are skipped. A document without a `features` array yields
/// nothing.
pub struct FeatureStream<R> {
    reader: R,
    state: State,
    /// Bytes consumed so far, for error messages.
    offset: u64,
    /// Raw bytes of the value being captured.
    buf: Vec<u8>,
}

impl<R: BufRead> FeatureStream<R> {
    /// Wraps a buffered reader positioned at the start of the document.
    pub const fn new(reader: R) -> Self {
        Self {
            reader,
            state: State::Start,
            offset: 0,
            buf: Vec::new(),
        }
    }

    fn peek(&mut self) -> Result<Option<u8>, SamplingError> {
        loop {
            match self.reader.fill_buf() {
                Ok(bytes) => return Ok(bytes.first().copied()),
                Err(e) if e.kind() == ErrorKind::Interrupted => {}
                Err(e) => return Err(e.into()),
            }
        }
    }

    fn bump(&mut self) {
        self.reader.consume(1);
        self.offset += 1;
    }

    /// Consumes and returns the next byte, failing at end of input.
    fn next_byte(&mut self) -> Result<u8, SamplingError> {
        let byte = self.peek()?.ok_or_else(|| self.truncated())?;
        self.bump();
        Ok(byte)
    }

    /// Skips whitespace and peeks at the next byte.
    fn skip_whitespace(&mut self) -> Result<Option<u8>, SamplingError> {
        while let Some(byte) = self.peek()? {
            if !byte.is_ascii_whitespace() {
                return Ok(Some(byte));
            }
            self.bump();
        }
        Ok(None)
    }

    /// Skips whitespace and peeks at the next byte, failing at end of input.
    fn skip_whitespace_required(&mut self) -> Result<u8, SamplingError> {
        self.skip_whitespace()?.ok_or_else(|| self.truncated())
    }

    fn truncated(&self) -> SamplingError {
        SamplingError::InvalidInput {
            message: format!("document ends unexpectedly at byte {}", self.offset),
        }
    }

    fn unexpected(&self, byte: u8, expected: &str) -> SamplingError {
        SamplingError::InvalidInput {
            message: format!(
                "expected {expected} at byte {}, found {:?}",
                self.offset,
                char::from(byte)
            ),
        }
    }

    fn take(&mut self, byte: u8, capture: bool) {
        if capture {
            self.buf.push(byte);
        }
    }

    /// Consumes a string whose opening quote has already been consumed.
    fn scan_string_body(&mut self, capture: bool) -> Result<(), SamplingError> {
        loop {
            let byte = self.next_byte()?;
            self.take(byte, capture);
            match byte {
                b'"' => return Ok(()),
                b'\\' => {
                    let escaped = self.next_byte()?;
                    self.take(escaped, capture);
                }
                _ => {}
            }
        }
    }

    /// Consumes one JSON value, optionally copying its bytes into `buf`.
    ///
    /// Only bracket nesting and string boundaries are checked here; captured
    /// values are fully validated when decoded.
    fn scan_value(&mut self, capture: bool) -> Result<(), SamplingError> {
        let first = self.skip_whitespace_required()?;
        match first {
            b'{' | b'[' => {
                let mut closers = Vec::new();
                loop {
                    let byte = self.next_byte()?;
                    self.take(byte, capture);
                    match byte {
                        b'{' => closers.push(b'}'),
                        b'[' => closers.push(b']'),
                        b'}' | b']' => {
                            if closers.pop() != Some(byte) {
                                return Err(self.unexpected(byte, "a matching bracket"));
                            }
                            if closers.is_empty() {
                                return Ok(());
                            }
                        }
                        b'"' => self.scan_string_body(capture)?,
                        _ => {}
                    }
                }
            }
            b'"' => {
                self.bump();
                self.take(first, capture);
                self.scan_string_body(capture)
            }
            b'-' | b'0'..=b'9' | b't' | b'f' | b'n' => {
                while let Some(byte) = self.peek()? {
                    if byte.is_ascii_whitespace() || matches!(byte, b',' | b']' | b'}') {
                        break;
                    }
                    self.bump();
                    self.take(byte, capture);
                }
                Ok(())
            }
            other => Err(self.unexpected(other, "a value")),
        }
    }

    /// Reads an object key, including its trailing colon.
    fn scan_key(&mut self) -> Result<String, SamplingError> {
        let quote = self.skip_whitespace_required()?;
        if quote != b'"' {
            return Err(self.unexpected(quote, "an object key"));
        }
        self.buf.clear();
        self.scan_value(true)?;
        let key = serde_json::from_slice::<String>(&self.buf).map_err(|e| {
            SamplingError::InvalidInput {
                message: format!("invalid object key: {e}"),
            }
        })?;

        let colon = self.skip_whitespace_required()?;
        if colon != b':' {
            return Err(self.unexpected(colon, "':'"));
        }
        self.bump();
        Ok(key)
    }

    /// Walks top-level members until a `features` array is entered.
    ///
    /// Returns `false` once the closing brace of the document is reached
    /// without finding (another) features array.
    fn seek_features(&mut self, mut first: bool) -> Result<bool, SamplingError> {
        loop {
            let byte = self.skip_whitespace_required()?;
            if byte == b'}' {
                self.bump();
                return Ok(false);
            }
            if !first {
                if byte != b',' {
                    return Err(self.unexpected(byte, "',' or '}'"));
                }
                self.bump();
            }
            first = false;

            let key = self.scan_key()?;
            if key == "features" {
                if self.skip_whitespace_required()? == b'[' {
                    self.bump();
                    return Ok(true);
                }
                log::warn!("Ignoring non-array \"features\" member");
            }
            self.scan_value(false)?;
        }
    }

    /// Checks that nothing but whitespace follows the document.
    fn finish(&mut self) -> Result<(), SamplingError> {
        match self.skip_whitespace()? {
            None => Ok(()),
            Some(byte) => Err(self.unexpected(byte, "end of document")),
        }
    }

    /// Advances to the next array item, returning its decoded value.
    fn next_item(&mut self) -> Result<Option<Value>, SamplingError> {
        loop {
            match self.state {
                State::Done => return Ok(None),
                State::Start => {
                    let Some(byte) = self.skip_whitespace()? else {
                        return Err(SamplingError::InvalidInput {
                            message: "document is empty".to_string(),
                        });
                    };
                    if byte != b'{' {
                        return Err(self.unexpected(byte, "a GeoJSON object"));
                    }
                    self.bump();
                    self.state = if self.seek_features(true)? {
                        State::Features { first: true }
                    } else {
                        self.finish()?;
                        State::Done
                    };
                }
                State::Features { first } => {
                    let byte = self.skip_whitespace_required()?;
                    if byte == b']' {
                        self.bump();
                        self.state = if self.seek_features(false)? {
                            State::Features { first: true }
                        } else {
                            self.finish()?;
                            State::Done
                        };
                        continue;
                    }
                    if !first {
                        if byte != b',' {
                            return Err(self.unexpected(byte, "',' or ']'"));
                        }
                        self.bump();
                    }

                    self.buf.clear();
                    self.scan_value(true)?;
                    self.state = State::Features { first: false };

                    let value = serde_json::from_slice::<Value>(&self.buf).map_err(|e| {
                        SamplingError::InvalidInput {
                            message: format!("invalid feature before byte {}: {e}", self.offset),
                        }
                    })?;
                    return Ok(Some(value));
                }
            }
        }
    }
}

impl<R: BufRead> Iterator for FeatureStream<R> {
    type Item = Result<RawFeature, SamplingError>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            match self.next_item() {
                Ok(Some(value)) => {
                    if let Some(feature) = RawFeature::from_value(value) {
                        return Some(Ok(feature));
                    }
                    log::trace!("Skipping malformed feature");
                }
                Ok(None) => return None,
                Err(e) => {
                    self.state = State::Done;
                    return Some(Err(e));
                }
            }
        }
    }
}
