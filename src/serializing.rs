use std::{
    fs::File,
    io::{BufWriter, Error, ErrorKind, Write},
    path::{Path, PathBuf},
};

use thiserror::Error as ThisError;
use tracing::{debug, warn};

use crate::{ClassificationError, Node, serializers::XMLSerializer};

pub trait Serializer {
    type Error;

    fn name() -> &'static str;

    fn serialize(buffer: &mut impl Write, settings: &Settings, root: &dyn Node) -> Result<(), Self::Error>;
}

#[derive(Debug, ThisError)]
pub enum SerializationError {
    #[error("IO Error: {0}")]
    Io(#[from] Error),
    #[error("XML Error: {0}")]
    Xml(#[from] quick_xml::Error),
    #[error("Can't Create Output File {path:?}: {source}")]
    OutputUnavailable { path: PathBuf, source: Error },
    #[error("Permission Denied For Output File {0:?}")]
    FilePermissionDenied(PathBuf),
    #[error("Can't Read Attachment {path:?}: {source}")]
    FileAccess { path: PathBuf, source: Error },
    #[error("Classification Error: {0}")]
    Classification(#[from] ClassificationError),
    #[error("Chunk Size Must Be Greater Than Zero")]
    InvalidChunkSize,
    #[error("Node {node} Has {values} Values For {fields} Fields")]
    FieldCountMismatch { node: String, fields: usize, values: usize },
    #[error("Field {field} Of {node} Expected {expected} Value But Found {found}")]
    ValueMismatch {
        node: String,
        field: String,
        expected: &'static str,
        found: &'static str,
    },
}

/// Options for writing a document.
#[derive(Debug, Clone)]
pub struct Settings {
    /// Bytes read from an attachment per base64 fragment.
    pub chunk_size: usize,
    pub indent_char: u8,
    /// Indent characters per nesting level. Zero writes everything on one line.
    pub indent_size: usize,
    /// Whether the `<?xml ...?>` declaration is written.
    pub declaration: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            chunk_size: Self::DEFAULT_CHUNK_SIZE,
            indent_char: b' ',
            indent_size: Self::DEFAULT_INDENT_SIZE,
            declaration: true,
        }
    }
}

impl Settings {
    /// A multiple of 3, so base64 groups never straddle two fragments.
    pub const DEFAULT_CHUNK_SIZE: usize = 3072;
    pub const DEFAULT_INDENT_SIZE: usize = 2;
    pub const XML_VERSION: &'static str = "1.0";
    pub const XML_ENCODING: &'static str = "UTF-8";

    pub fn with_chunk_size(mut self, chunk_size: usize) -> Self {
        self.chunk_size = chunk_size;
        self
    }

    pub fn with_indent(mut self, indent_char: u8, indent_size: usize) -> Self {
        self.indent_char = indent_char;
        self.indent_size = indent_size;
        self
    }

    pub fn with_declaration(mut self, declaration: bool) -> Self {
        self.declaration = declaration;
        self
    }

    /// Rejects a zero chunk size. Sizes that are not a multiple of 3 are allowed but logged.
    pub fn validate(&self) -> Result<(), SerializationError> {
        if self.chunk_size == 0 {
            return Err(SerializationError::InvalidChunkSize);
        }

        if self.chunk_size % 3 != 0 {
            warn!(chunk_size = self.chunk_size, "chunk size is not a multiple of 3, base64 fragments will contain padding");
        }

        Ok(())
    }
}

/// Writes a node graph as an XML document into any writer.
///
/// The graph and settings are checked before anything is written.
pub fn serialize_to(buffer: &mut impl Write, root: &dyn Node, settings: &Settings) -> Result<(), SerializationError> {
    settings.validate()?;
    XMLSerializer::validate(root)?;
    XMLSerializer::write(buffer, settings, root)?;
    buffer.flush()?;
    Ok(())
}

/// Writes a node graph as an XML document to a file, creating or truncating it.
///
/// Settings and schema errors are reported before the file is created.
/// Any later failure leaves a partially written file behind.
pub fn serialize<P: AsRef<Path>>(path: P, root: &dyn Node, settings: &Settings) -> Result<(), SerializationError> {
    let path = path.as_ref();

    settings.validate()?;
    XMLSerializer::validate(root)?;

    let file = File::create(path).map_err(|error| match error.kind() {
        ErrorKind::PermissionDenied => SerializationError::FilePermissionDenied(path.to_path_buf()),
        _ => SerializationError::OutputUnavailable {
            path: path.to_path_buf(),
            source: error,
        },
    })?;

    debug!(path = %path.display(), serializer = XMLSerializer::name(), "writing document");

    let mut buffer = BufWriter::new(file);
    XMLSerializer::write(&mut buffer, settings, root)?;
    buffer.flush()?;

    debug!(path = %path.display(), "finished document");

    Ok(())
}

/// Writes a node graph to a file with default settings and the given attachment chunk size.
pub fn write_object_to_file<P: AsRef<Path>>(root: &dyn Node, path: P, chunk_size: usize) -> Result<(), SerializationError> {
    serialize(path, root, &Settings::default().with_chunk_size(chunk_size))
}

#[cfg(test)]
mod tests {
    use std::sync::{
        Arc,
        atomic::{AtomicUsize, Ordering},
    };

    use tracing::{
        Event, Level, Metadata, Subscriber,
        span::{Attributes, Id, Record},
    };

    use super::*;
    use crate::declare_node;

    struct Counter {
        count: u32,
    }

    declare_node! {
        Counter {
            count: value,
        }
    }

    /// Counts warning events.
    struct WarningCounter(Arc<AtomicUsize>);

    impl Subscriber for WarningCounter {
        fn enabled(&self, _: &Metadata<'_>) -> bool {
            true
        }

        fn new_span(&self, _: &Attributes<'_>) -> Id {
            Id::from_u64(1)
        }

        fn record(&self, _: &Id, _: &Record<'_>) {}

        fn record_follows_from(&self, _: &Id, _: &Id) {}

        fn event(&self, event: &Event<'_>) {
            if *event.metadata().level() == Level::WARN {
                self.0.fetch_add(1, Ordering::SeqCst);
            }
        }

        fn enter(&self, _: &Id) {}

        fn exit(&self, _: &Id) {}
    }

    #[test]
    fn uneven_chunk_size_warns_once() {
        let warnings = Arc::new(AtomicUsize::new(0));
        let counter = Counter { count: 3 };
        let settings = Settings::default().with_chunk_size(4);

        tracing::subscriber::with_default(WarningCounter(warnings.clone()), || {
            let mut buffer = Vec::new();
            serialize_to(&mut buffer, &counter, &settings).unwrap();

            let directory = tempfile::tempdir().unwrap();
            serialize(directory.path().join("counter.xml"), &counter, &settings).unwrap();
        });

        assert_eq!(warnings.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn zero_chunk_size_is_rejected() {
        let counter = Counter { count: 3 };
        assert!(matches!(Settings::default().with_chunk_size(0).validate(), Err(SerializationError::InvalidChunkSize)));

        let mut buffer = Vec::new();
        assert!(matches!(
            serialize_to(&mut buffer, &counter, &Settings::default().with_chunk_size(0)),
            Err(SerializationError::InvalidChunkSize)
        ));
        assert!(buffer.is_empty());
    }
}
