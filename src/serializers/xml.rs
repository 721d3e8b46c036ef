use std::io::Write;

use quick_xml::{
    Writer,
    events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event},
};
use tracing::{debug, trace};

use super::chunked::Base64Chunks;
use crate::{
    FieldSchema, Node, Rendering, Schema, SerializationError, Serializer, Settings, Value,
    node::{is_attachment_empty, is_empty},
};

struct ObjectWriter<T: Write> {
    writer: Writer<T>,
    chunk_size: usize,
}

impl<T: Write> ObjectWriter<T> {
    fn new(buffer: T, settings: &Settings) -> Self {
        let writer = if settings.indent_size > 0 {
            Writer::new_with_indent(buffer, settings.indent_char, settings.indent_size)
        } else {
            Writer::new(buffer)
        };

        Self {
            writer,
            chunk_size: settings.chunk_size,
        }
    }

    fn write_declaration(&mut self) -> Result<(), SerializationError> {
        self.writer
            .write_event(Event::Decl(BytesDecl::new(Settings::XML_VERSION, Some(Settings::XML_ENCODING), None)))?;
        Ok(())
    }

    fn write_open(&mut self, name: &str) -> Result<(), SerializationError> {
        self.writer.write_event(Event::Start(BytesStart::new(name)))?;
        Ok(())
    }

    fn write_close(&mut self, name: &str) -> Result<(), SerializationError> {
        self.writer.write_event(Event::End(BytesEnd::new(name)))?;
        Ok(())
    }

    fn write_text(&mut self, text: &str) -> Result<(), SerializationError> {
        self.writer.write_event(Event::Text(BytesText::new(text)))?;
        Ok(())
    }

    fn flush(&mut self) -> Result<(), SerializationError> {
        self.writer.get_mut().flush()?;
        Ok(())
    }

    fn write_leaf(&mut self, name: &str, value: &Value) -> Result<(), SerializationError> {
        let text = value.to_string();

        if text.is_empty() {
            return Ok(());
        }

        self.write_open(name)?;
        self.write_text(&text)?;
        self.write_close(name)
    }

    /// Streams a file as base64 fragments, flushing after each one. Missing and empty files are skipped.
    fn write_attachment(&mut self, value: &Value, element: Option<&str>) -> Result<(), SerializationError> {
        let Some(path) = value.as_path() else {
            return Ok(());
        };

        if is_attachment_empty(path) {
            debug!(path = %path.display(), "skipping missing or empty attachment");
            return Ok(());
        }

        let file_access = |source| SerializationError::FileAccess {
            path: path.to_path_buf(),
            source,
        };

        let chunks = Base64Chunks::open(path, self.chunk_size).map_err(file_access)?;

        if let Some(element) = element {
            self.write_open(element)?;
        }

        for chunk in chunks {
            let chunk = chunk.map_err(file_access)?;
            self.write_text(&chunk)?;
            self.flush()?;
            trace!(path = %path.display(), length = chunk.len(), "wrote base64 chunk");
        }

        if let Some(element) = element {
            self.write_close(element)?;
        }

        Ok(())
    }

    fn write_array(&mut self, container: &str, item: Option<&str>, items: &[&dyn Node]) -> Result<(), SerializationError> {
        if items.iter().all(|item| is_empty(*item)) {
            debug!(container, "skipping empty array");
            return Ok(());
        }

        self.write_open(container)?;
        for node in items {
            self.write_node(*node, item)?;
        }
        self.write_close(container)
    }

    fn write_node(&mut self, node: &dyn Node, name: Option<&str>) -> Result<(), SerializationError> {
        let schema = node.schema()?;
        let element = name.unwrap_or(schema.element_name());

        if is_empty(node) {
            debug!(element, "skipping empty node");
            return Ok(());
        }

        let values = node.values();
        check_field_count(schema, &values)?;

        self.write_open(element)?;

        for (field, value) in schema.get_fields().zip(&values) {
            match (field.get_rendering(), value) {
                (_, Value::Null) => {}
                (Rendering::Base64Inline, Value::Text(_) | Value::Path(_)) => self.write_attachment(value, None)?,
                (Rendering::Base64Element { element }, Value::Text(_) | Value::Path(_)) => self.write_attachment(value, Some(element.as_str()))?,
                (Rendering::Array { container, item }, Value::Sequence(items)) => self.write_array(container, item.as_deref(), items)?,
                (Rendering::NestedNode, Value::Node(child)) => self.write_node(*child, None)?,
                (Rendering::NamedElement { element } | Rendering::Simple { element }, value) if is_scalar(value) => self.write_leaf(element, value)?,
                (rendering, value) => return Err(value_mismatch(schema, field, rendering, value)),
            }
        }

        self.write_close(element)
    }
}

fn is_scalar(value: &Value) -> bool {
    !matches!(value, Value::Node(_) | Value::Sequence(_))
}

fn accepts(rendering: &Rendering, value: &Value) -> bool {
    match rendering {
        _ if value.is_null() => true,
        Rendering::Base64Inline | Rendering::Base64Element { .. } => matches!(value, Value::Text(_) | Value::Path(_)),
        Rendering::Array { .. } => matches!(value, Value::Sequence(_)),
        Rendering::NestedNode => matches!(value, Value::Node(_)),
        Rendering::NamedElement { .. } | Rendering::Simple { .. } => is_scalar(value),
    }
}

fn expected(rendering: &Rendering) -> &'static str {
    match rendering {
        Rendering::Base64Inline | Rendering::Base64Element { .. } => "A Path",
        Rendering::Array { .. } => "A Sequence",
        Rendering::NestedNode => "A Node",
        Rendering::NamedElement { .. } | Rendering::Simple { .. } => "A Scalar",
    }
}

fn value_mismatch(schema: &Schema, field: &FieldSchema, rendering: &Rendering, value: &Value) -> SerializationError {
    SerializationError::ValueMismatch {
        node: schema.get_type_name().to_string(),
        field: field.get_name().to_string(),
        expected: expected(rendering),
        found: value.kind(),
    }
}

fn check_field_count(schema: &Schema, values: &[Value]) -> Result<(), SerializationError> {
    let fields = schema.get_fields().len();

    if fields != values.len() {
        return Err(SerializationError::FieldCountMismatch {
            node: schema.get_type_name().to_string(),
            fields,
            values: values.len(),
        });
    }

    Ok(())
}

pub struct XMLSerializer;

impl XMLSerializer {
    /// Walks the whole graph checking schemas and value shapes without writing anything.
    pub fn validate(root: &dyn Node) -> Result<(), SerializationError> {
        let schema = root.schema()?;
        let values = root.values();
        check_field_count(schema, &values)?;

        for (field, value) in schema.get_fields().zip(&values) {
            let rendering = field.get_rendering();

            if !accepts(rendering, value) {
                return Err(value_mismatch(schema, field, rendering, value));
            }

            match value {
                Value::Node(child) => Self::validate(*child)?,
                Value::Sequence(items) => {
                    for item in items {
                        Self::validate(*item)?;
                    }
                }
                _ => {}
            }
        }

        Ok(())
    }

    /// Writes the document without checking the settings first.
    pub(crate) fn write(buffer: &mut impl Write, settings: &Settings, root: &dyn Node) -> Result<(), SerializationError> {
        let mut writer = ObjectWriter::new(buffer, settings);

        if settings.declaration {
            writer.write_declaration()?;
        }

        writer.write_node(root, None)?;
        writer.flush()
    }
}

impl Serializer for XMLSerializer {
    type Error = SerializationError;

    fn name() -> &'static str {
        "xml"
    }

    fn serialize(buffer: &mut impl Write, settings: &Settings, root: &dyn Node) -> Result<(), Self::Error> {
        settings.validate()?;
        Self::write(buffer, settings, root)
    }
}
