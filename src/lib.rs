//! Writes annotated object graphs as XML documents.
//!
//! Types describe their fields once with a [Schema], usually through [declare_node], and the
//! [XMLSerializer](serializers::XMLSerializer) walks the graph depth first. File attachments are streamed as base64 in bounded chunks.

mod annotation;

pub use annotation::Annotation;
pub use annotation::ClassificationError;
pub use annotation::FieldType;
pub use annotation::Rendering;
pub use annotation::classify;

mod value;

pub use value::Value;

mod node;

pub use node::FieldSchema;
pub use node::Node;
pub use node::Schema;
pub use node::SchemaBuilder;
pub use node::is_empty;

mod serializing;

pub use serializing::SerializationError;
pub use serializing::Serializer;
pub use serializing::Settings;
pub use serializing::serialize;
pub use serializing::serialize_to;
pub use serializing::write_object_to_file;

pub mod serializers;
