//! Pull-based field extractor over `quick-xml` events.

use std::borrow::Cow;

use quick_xml::Reader;
use quick_xml::events::{BytesStart, Event};
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;

use super::error::XmlError;

/// One field of a form schema.
///
/// `path` is relative to the instance root element, e.g. `/meta/audit` for
/// `<data><meta><audit>…</audit></meta></data>`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FieldSchema {
    /// Slash-separated element path below the root.
    pub path: String,
    /// Whether the field holds a file reference.
    pub binary: bool,
}

impl FieldSchema {
    /// Create a schema entry.
    #[must_use]
    pub fn new(path: impl Into<String>, binary: bool) -> Self {
        Self {
            path: path.into(),
            binary,
        }
    }

    /// Create a binary (file reference) schema entry.
    #[must_use]
    pub fn binary(path: impl Into<String>) -> Self {
        Self::new(path, true)
    }
}

/// A schema field found in the document together with its text content.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldOccurrence {
    /// The schema entry that matched.
    pub field: FieldSchema,
    /// Unescaped text content, untrimmed. Empty for `<field/>`.
    pub text: String,
}

/// The element currently being captured.
struct Capture {
    field: usize,
    depth: usize,
    text: String,
}

/// Lazy, non-restartable sequence of field occurrences.
///
/// Yields `Err` at most once; after an error or the end of the document
/// the stream only returns `None`.
pub struct FieldStream<'a> {
    reader: Reader<&'a [u8]>,
    fields: &'a [FieldSchema],
    /// Local names of the open elements, root first.
    stack: Vec<String>,
    /// Length of `path` before each open element was pushed.
    marks: Vec<usize>,
    /// Path of the innermost open element, root excluded.
    path: String,
    capture: Option<Capture>,
    root_closed: bool,
    done: bool,
}

impl<'a> FieldStream<'a> {
    /// Start a traversal of `xml` matching against `fields`.
    #[must_use]
    pub fn new(fields: &'a [FieldSchema], xml: &'a str) -> Self {
        let mut reader = Reader::from_str(xml);
        reader.config_mut().check_end_names = true;

        Self {
            reader,
            fields,
            stack: Vec::new(),
            marks: Vec::new(),
            path: String::new(),
            capture: None,
            root_closed: false,
            done: false,
        }
    }

    fn position(&self) -> u64 {
        u64::try_from(self.reader.buffer_position()).unwrap_or_default()
    }

    fn malformed(&self, err: impl std::fmt::Display) -> XmlError {
        XmlError::malformed(self.position(), err.to_string())
    }

    fn local_name(&self, start: &BytesStart<'_>) -> Result<String, XmlError> {
        let name = start.local_name();
        std::str::from_utf8(name.as_ref())
            .map(str::to_owned)
            .map_err(|e| self.malformed(e))
    }

    fn matching_field(&self) -> Option<usize> {
        self.fields.iter().position(|f| f.path == self.path)
    }

    /// Push an element onto the stack and update the current path.
    fn open(&mut self, name: String) -> Result<(), XmlError> {
        if self.root_closed {
            return Err(self.malformed(format!("unexpected element <{name}> after root")));
        }
        self.marks.push(self.path.len());
        if !self.stack.is_empty() {
            self.path.push('/');
            self.path.push_str(&name);
        }
        self.stack.push(name);
        Ok(())
    }

    fn close(&mut self) {
        self.stack.pop();
        if let Some(mark) = self.marks.pop() {
            self.path.truncate(mark);
        }
        if self.stack.is_empty() {
            self.root_closed = true;
        }
    }

    fn push_text(&mut self, text: Cow<'_, str>) {
        if let Some(capture) = self.capture.as_mut() {
            capture.text.push_str(&text);
        }
    }

    fn occurrence(&self, field: usize, text: String) -> FieldOccurrence {
        FieldOccurrence {
            field: self.fields[field].clone(),
            text,
        }
    }

    fn step(&mut self) -> Result<Option<FieldOccurrence>, XmlError> {
        loop {
            let event = self.reader.read_event().map_err(|e| self.malformed(e))?;
            match event {
                Event::Start(start) => {
                    let name = self.local_name(&start)?;
                    self.open(name)?;
                    if self.capture.is_none() && self.stack.len() > 1 {
                        if let Some(field) = self.matching_field() {
                            self.capture = Some(Capture {
                                field,
                                depth: self.stack.len(),
                                text: String::new(),
                            });
                        }
                    }
                }
                Event::Empty(start) => {
                    let name = self.local_name(&start)?;
                    self.open(name)?;
                    let found = if self.capture.is_none() && self.stack.len() > 1 {
                        self.matching_field()
                    } else {
                        None
                    };
                    self.close();
                    if let Some(field) = found {
                        return Ok(Some(self.occurrence(field, String::new())));
                    }
                }
                Event::End(_) => {
                    let depth = self.stack.len();
                    self.close();
                    if self.capture.as_ref().is_some_and(|c| c.depth == depth) {
                        if let Some(capture) = self.capture.take() {
                            return Ok(Some(self.occurrence(capture.field, capture.text)));
                        }
                    }
                }
                Event::Text(text) => {
                    if self.capture.is_some() {
                        let text = text.unescape().map_err(|e| self.malformed(e))?;
                        self.push_text(text);
                    }
                }
                Event::CData(data) => {
                    if self.capture.is_some() {
                        let text = std::str::from_utf8(&data).map_err(|e| self.malformed(e))?;
                        self.push_text(Cow::Borrowed(text));
                    }
                }
                Event::Eof => {
                    if let Some(open) = self.stack.last() {
                        return Err(XmlError::UnexpectedEof { open: open.clone() });
                    }
                    if !self.root_closed {
                        return Err(XmlError::Empty);
                    }
                    return Ok(None);
                }
                Event::Decl(_) | Event::PI(_) | Event::DocType(_) | Event::Comment(_) => {}
            }
        }
    }
}

impl Iterator for FieldStream<'_> {
    type Item = Result<FieldOccurrence, XmlError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        match self.step() {
            Ok(Some(occurrence)) => Some(Ok(occurrence)),
            Ok(None) => {
                self.done = true;
                None
            }
            Err(err) => {
                self.done = true;
                Some(Err(err))
            }
        }
    }
}

impl std::iter::FusedIterator for FieldStream<'_> {}

/// Run a traversal on the blocking pool, delivering through a bounded channel.
///
/// The parser blocks once `capacity` occurrences are waiting, and stops as
/// soon as the receiver is dropped. Must be called from within a Tokio
/// runtime.
pub fn spawn_field_stream(
    fields: Vec<FieldSchema>,
    xml: String,
    capacity: usize,
) -> mpsc::Receiver<Result<FieldOccurrence, XmlError>> {
    let (tx, rx) = mpsc::channel(capacity.max(1));
    tokio::task::spawn_blocking(move || {
        for item in FieldStream::new(&fields, &xml) {
            if tx.blocking_send(item).is_err() {
                tracing::debug!("field stream receiver dropped, stopping traversal");
                break;
            }
        }
    });
    rx
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn collect(fields: &[FieldSchema], xml: &str) -> Result<Vec<(String, String)>, XmlError> {
        FieldStream::new(fields, xml)
            .map(|r| r.map(|o| (o.field.path, o.text)))
            .collect()
    }

    #[test]
    fn test_extracts_fields_in_document_order() {
        let fields = vec![
            FieldSchema::binary("/photo"),
            FieldSchema::binary("/group/sketch"),
            FieldSchema::new("/name", false),
        ];
        let xml = r#"<?xml version="1.0"?>
            <data id="f">
              <name>Alice</name>
              <group><sketch>s.png</sketch></group>
              <photo>photo.jpg</photo>
            </data>"#;

        let found = collect(&fields, xml).unwrap();
        assert_eq!(
            found,
            vec![
                ("/name".to_string(), "Alice".to_string()),
                ("/group/sketch".to_string(), "s.png".to_string()),
                ("/photo".to_string(), "photo.jpg".to_string()),
            ]
        );
    }

    #[test]
    fn test_repeated_fields_yield_each_occurrence() {
        let fields = vec![FieldSchema::binary("/rep/file")];
        let xml = "<data><rep><file>a</file></rep><rep><file>b</file></rep></data>";
        let texts: Vec<_> = collect(&fields, xml)
            .unwrap()
            .into_iter()
            .map(|(_, t)| t)
            .collect();
        assert_eq!(texts, vec!["a", "b"]);
    }

    #[test]
    fn test_self_closing_field_yields_empty_text() {
        let fields = vec![FieldSchema::binary("/photo")];
        let found = collect(&fields, "<data><photo/></data>").unwrap();
        assert_eq!(found, vec![("/photo".to_string(), String::new())]);
    }

    #[test]
    fn test_text_is_unescaped_and_untrimmed() {
        let fields = vec![FieldSchema::binary("/photo")];
        let found = collect(&fields, "<data><photo> a&amp;b.jpg </photo></data>").unwrap();
        assert_eq!(found[0].1, " a&b.jpg ");
    }

    #[test]
    fn test_cdata_is_captured() {
        let fields = vec![FieldSchema::binary("/photo")];
        let found = collect(&fields, "<data><photo><![CDATA[x<y>.jpg]]></photo></data>").unwrap();
        assert_eq!(found[0].1, "x<y>.jpg");
    }

    #[test]
    fn test_namespace_prefixes_are_ignored() {
        let fields = vec![FieldSchema::binary("/meta/audit")];
        let xml = r#"<data xmlns:orx="http://openrosa.org/xforms"><orx:meta><orx:audit>audit.csv</orx:audit></orx:meta></data>"#;
        let found = collect(&fields, xml).unwrap();
        assert_eq!(found[0].1, "audit.csv");
    }

    #[test]
    fn test_root_element_is_not_part_of_path() {
        let fields = vec![FieldSchema::binary("/data")];
        assert!(collect(&fields, "<data>x</data>").unwrap().is_empty());
    }

    #[test]
    fn test_mismatched_end_tag_is_fatal() {
        let fields = vec![FieldSchema::binary("/photo")];
        let result = collect(&fields, "<data><photo>a.jpg</video></data>");
        assert!(matches!(result, Err(XmlError::Malformed { .. })));
    }

    #[test]
    fn test_unclosed_document_is_fatal() {
        let fields = vec![FieldSchema::binary("/photo")];
        let result = collect(&fields, "<data><photo>a.jpg</photo>");
        assert!(matches!(
            result,
            Err(XmlError::UnexpectedEof { .. } | XmlError::Malformed { .. })
        ));
    }

    #[test]
    fn test_empty_document_is_fatal() {
        let fields = vec![FieldSchema::binary("/photo")];
        assert_eq!(collect(&fields, "   "), Err(XmlError::Empty));
    }

    #[test]
    fn test_stream_is_fused_after_error() {
        let fields = vec![FieldSchema::binary("/a")];
        let mut stream = FieldStream::new(&fields, "<data><a>x</a><b></c></data>");
        assert!(matches!(stream.next(), Some(Ok(_))));
        assert!(matches!(stream.next(), Some(Err(_))));
        assert!(stream.next().is_none());
        assert!(stream.next().is_none());
    }

    #[test]
    fn test_second_root_is_fatal() {
        let fields = vec![FieldSchema::binary("/a")];
        let result = collect(&fields, "<data/><data/>");
        assert!(matches!(result, Err(XmlError::Malformed { .. })));
    }

    #[tokio::test]
    async fn test_spawned_stream_delivers_all_occurrences() {
        let fields = vec![FieldSchema::binary("/f")];
        let xml: String = std::iter::once("<data>".to_string())
            .chain((0..50).map(|i| format!("<f>{i}.jpg</f>")))
            .chain(std::iter::once("</data>".to_string()))
            .collect();

        let mut rx = spawn_field_stream(fields, xml, 4);
        let mut seen = Vec::new();
        while let Some(item) = rx.recv().await {
            seen.push(item.unwrap().text);
        }
        assert_eq!(seen.len(), 50);
        assert_eq!(seen[0], "0.jpg");
        assert_eq!(seen[49], "49.jpg");
    }

    #[tokio::test]
    async fn test_spawned_stream_reports_error_last() {
        let fields = vec![FieldSchema::binary("/f")];
        let mut rx = spawn_field_stream(fields, "<data><f>a</f><f>".to_string(), 1);
        assert!(matches!(rx.recv().await, Some(Ok(_))));
        assert!(matches!(rx.recv().await, Some(Err(_))));
        assert!(rx.recv().await.is_none());
    }

    proptest! {
        #[test]
        fn prop_every_generated_leaf_is_found(names in prop::collection::vec("[a-z]{1,8}\\.jpg", 0..20)) {
            let fields = vec![FieldSchema::binary("/g/f")];
            let body: String = names.iter().map(|n| format!("<g><f>{n}</f></g>")).collect();
            let xml = format!("<data>{body}</data>");
            let texts: Vec<String> = collect(&fields, &xml)
                .unwrap()
                .into_iter()
                .map(|(_, t)| t)
                .collect();
            prop_assert_eq!(texts, names);
        }
    }
}
