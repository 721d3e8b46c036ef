//! Structures for serializing.

mod chunked;
pub use chunked::Base64Chunks;

mod xml;
pub use xml::XMLSerializer;
