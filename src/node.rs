use std::{fs::File, io::Read, path::Path};

use indexmap::IndexMap;

use crate::{
    Value,
    annotation::{Annotation, ClassificationError, FieldType, Rendering, classify, validate_element_name},
};

/// An object that can be written as an XML element.
///
/// Implementations describe their fields once through a [Schema] and hand out the current values in the same order.
/// The [declare_node](crate::declare_node) macro writes both for plain structs.
pub trait Node {
    /// Returns the static description of this node's type.
    fn schema(&self) -> Result<&Schema, ClassificationError>;

    /// Returns the current field values in declaration order.
    fn values(&self) -> Vec<Value<'_>>;
}

/// A single field of a [Schema].
#[derive(Clone, Debug)]
pub struct FieldSchema {
    name: String,
    declared: FieldType,
    annotations: Vec<Annotation>,
    rendering: Rendering,
}

impl FieldSchema {
    /// Returns the name of the field.
    pub fn get_name(&self) -> &str {
        &self.name
    }

    /// Returns the type the field was declared with.
    pub fn get_declared(&self) -> FieldType {
        self.declared
    }

    /// Returns the annotations the field was declared with.
    pub fn get_annotations(&self) -> &[Annotation] {
        &self.annotations
    }

    /// Returns how the field is written.
    pub fn get_rendering(&self) -> &Rendering {
        &self.rendering
    }
}

/// The static description of a node type: its name, optional root name and classified fields.
#[derive(Clone, Debug)]
pub struct Schema {
    type_name: String,
    root_name: Option<String>,
    fields: IndexMap<String, FieldSchema>,
}

impl Schema {
    /// Starts describing a type with the given identifier.
    pub fn builder(type_name: impl Into<String>) -> SchemaBuilder {
        SchemaBuilder {
            type_name: type_name.into(),
            root_name: None,
            fields: Vec::new(),
        }
    }

    /// Returns the type identifier.
    pub fn get_type_name(&self) -> &str {
        &self.type_name
    }

    /// Returns the root name annotation, if the type has one.
    pub fn get_root_name(&self) -> Option<&str> {
        self.root_name.as_deref()
    }

    /// Returns the name elements of this type are written with.
    pub fn element_name(&self) -> &str {
        self.root_name.as_deref().unwrap_or(&self.type_name)
    }

    /// Returns the field with the given name.
    pub fn get_field(&self, name: impl AsRef<str>) -> Option<&FieldSchema> {
        self.fields.get(name.as_ref())
    }

    /// Returns the fields in declaration order.
    pub fn get_fields(&self) -> impl ExactSizeIterator<Item = &FieldSchema> {
        self.fields.values()
    }
}

pub struct SchemaBuilder {
    type_name: String,
    root_name: Option<String>,
    fields: Vec<(String, FieldType, Vec<Annotation>)>,
}

impl SchemaBuilder {
    /// Overrides the type identifier as element name wherever the type is written.
    pub fn root_name(mut self, name: impl Into<String>) -> Self {
        self.root_name = Some(name.into());
        self
    }

    /// Appends a field. Fields are written in the order they are added.
    pub fn field(mut self, name: impl Into<String>, declared: FieldType, annotations: &[Annotation]) -> Self {
        self.fields.push((name.into(), declared, annotations.to_vec()));
        self
    }

    /// Classifies every field and validates every element name.
    pub fn build(self) -> Result<Schema, ClassificationError> {
        validate_element_name(&self.type_name)?;
        if let Some(root_name) = &self.root_name {
            validate_element_name(root_name)?;
        }

        let mut fields = IndexMap::with_capacity(self.fields.len());

        for (name, declared, annotations) in self.fields {
            if fields.contains_key(&name) {
                return Err(ClassificationError::DuplicateField(name));
            }

            let rendering = classify(&name, declared, &annotations)?;

            fields.insert(
                name.clone(),
                FieldSchema {
                    name,
                    declared,
                    annotations,
                    rendering,
                },
            );
        }

        Ok(Schema {
            type_name: self.type_name,
            root_name: self.root_name,
            fields,
        })
    }
}

/// Returns true when writing the node would produce neither text nor child elements.
///
/// Attachments count as empty when their path does not name a file with content. Nodes with an invalid schema are never empty so their error surfaces when written.
pub fn is_empty(node: &dyn Node) -> bool {
    let Ok(schema) = node.schema() else {
        return false;
    };

    schema.get_fields().zip(node.values()).all(|(field, value)| is_value_empty(field.get_rendering(), &value))
}

pub(crate) fn is_value_empty(rendering: &Rendering, value: &Value) -> bool {
    match (rendering, value) {
        (_, Value::Null) => true,
        (Rendering::Base64Inline | Rendering::Base64Element { .. }, value) => value.as_path().is_none_or(is_attachment_empty),
        (_, Value::Node(node)) => is_empty(*node),
        (_, Value::Sequence(items)) => items.iter().all(|item| is_empty(*item)),
        (_, value) => value.to_string().is_empty(),
    }
}

/// Returns true when the path names no regular file or the file yields no bytes.
///
/// Some files report a length of zero but still have content, so those are checked with a single one byte read.
/// A file that can't be read is not empty, the error is reported when it is streamed.
pub(crate) fn is_attachment_empty(path: &Path) -> bool {
    match path.metadata() {
        Ok(metadata) if metadata.is_file() => {
            metadata.len() == 0 && matches!(File::open(path).and_then(|mut file| file.read(&mut [0; 1])), Ok(0))
        }
        _ => true,
    }
}

/// Implements [Node] for a struct from a list of its fields.
///
/// Every field is given a kind, `value` for primitives and text, `node` for an `Option` of a nested node and `sequence` for a `Vec` of nodes,
/// followed by an optional list of [Annotation] variants.
///
/// ```
/// use dynamic_xml::declare_node;
///
/// struct Category {
///     id: i32,
///     name: Option<String>,
/// }
///
/// declare_node! {
///     Category as "category" {
///         id: value [ElementName(Some("id"))],
///         name: value,
///     }
/// }
/// ```
#[macro_export]
macro_rules! declare_node {
    (@kind value) => {
        $crate::FieldType::Value
    };
    (@kind node) => {
        $crate::FieldType::Node
    };
    (@kind sequence) => {
        $crate::FieldType::Sequence
    };
    (@value value, $field:expr) => {
        $crate::Value::from(&$field)
    };
    (@value node, $field:expr) => {
        $crate::Value::node($field.as_ref())
    };
    (@value sequence, $field:expr) => {
        $crate::Value::sequence(&$field)
    };
    (
        $node:ident $(as $root:literal)? {
            $($field:ident : $kind:ident $([$($annotation:expr),* $(,)?])?),* $(,)?
        }
    ) => {
        impl $crate::Node for $node {
            fn schema(&self) -> ::std::result::Result<&$crate::Schema, $crate::ClassificationError> {
                static SCHEMA: ::std::sync::LazyLock<::std::result::Result<$crate::Schema, $crate::ClassificationError>> =
                    ::std::sync::LazyLock::new(|| {
                        #[allow(unused_imports)]
                        use $crate::Annotation::*;

                        $crate::Schema::builder(::std::stringify!($node))
                            $(.root_name($root))?
                            $(.field(::std::stringify!($field), $crate::declare_node!(@kind $kind), &[$($($annotation),*)?]))*
                            .build()
                    });

                SCHEMA.as_ref().map_err(::std::clone::Clone::clone)
            }

            fn values(&self) -> ::std::vec::Vec<$crate::Value<'_>> {
                ::std::vec![$($crate::declare_node!(@value $kind, self.$field)),*]
            }
        }
    };
}
