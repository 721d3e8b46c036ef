use std::sync::LazyLock;

use regex::Regex;
use thiserror::Error as ThisError;

/// Rendering metadata attached to a field.
///
/// When more than one annotation applies, they are considered in the order of the variants below.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Annotation {
    /// The value is a file path, its contents are written as base64 text straight into the enclosing element.
    Base64InElement,
    /// The value is a file path, its contents are written as base64 text inside a child element.
    ImageToBase64,
    /// The value is a sequence of nodes wrapped in one container element, optionally named.
    ArrayContainer(Option<&'static str>),
    /// Names every item element of an array container.
    ArrayItem(&'static str),
    /// The value is written as a single leaf element, optionally named.
    ///
    /// On a nested node field the annotation has no effect, nested nodes are always named by their root name or type name.
    ElementName(Option<&'static str>),
}

/// The type a field was declared with.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FieldType {
    /// Primitive or text values, including file paths.
    Value,
    /// A nested node.
    Node,
    /// An ordered sequence of nodes.
    Sequence,
}

/// How a field is written, resolved once when its schema is built.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Rendering {
    Base64Inline,
    Base64Element { element: String },
    Array { container: String, item: Option<String> },
    NamedElement { element: String },
    NestedNode,
    Simple { element: String },
}

#[derive(Clone, Debug, PartialEq, Eq, ThisError)]
pub enum ClassificationError {
    #[error("Sequence Field {0} Is Missing An Array Container Annotation")]
    UnmarkedSequence(String),
    #[error("Annotation {annotation} Can't Be Used On {declared:?} Field {field}")]
    AnnotationMismatch {
        field: String,
        annotation: &'static str,
        declared: FieldType,
    },
    #[error("Invalid Element Name: {0:?}")]
    InvalidElementName(String),
    #[error("Duplicate Field: {0}")]
    DuplicateField(String),
}

static ELEMENT_NAME: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^[A-Za-z_][A-Za-z0-9_.\-]*$").expect("element name pattern is valid"));

/// Checks a name against the ASCII subset of the XML `Name` production.
pub fn validate_element_name(name: &str) -> Result<(), ClassificationError> {
    if !ELEMENT_NAME.is_match(name) {
        return Err(ClassificationError::InvalidElementName(name.to_string()));
    }
    Ok(())
}

/// Resolves the rendering of a field from its declared type and annotations.
pub fn classify(field: &str, declared: FieldType, annotations: &[Annotation]) -> Result<Rendering, ClassificationError> {
    let mut inline = false;
    let mut image = false;
    let mut container = None;
    let mut item = None;
    let mut element = None;

    for annotation in annotations {
        match annotation {
            Annotation::Base64InElement => inline = true,
            Annotation::ImageToBase64 => image = true,
            Annotation::ArrayContainer(name) => container = Some(*name),
            Annotation::ArrayItem(name) => item = Some(*name),
            Annotation::ElementName(name) => element = Some(*name),
        }
    }

    let mismatch = |annotation| ClassificationError::AnnotationMismatch {
        field: field.to_string(),
        annotation,
        declared,
    };

    if item.is_some() && declared != FieldType::Sequence {
        return Err(mismatch("ArrayItem"));
    }

    let element_name = element.flatten().unwrap_or(field);

    let rendering = if inline || image {
        if declared != FieldType::Value {
            return Err(mismatch(if inline { "Base64InElement" } else { "ImageToBase64" }));
        }

        if inline {
            Rendering::Base64Inline
        } else {
            Rendering::Base64Element {
                element: element_name.to_string(),
            }
        }
    } else if let Some(name) = container {
        if declared != FieldType::Sequence {
            return Err(mismatch("ArrayContainer"));
        }

        Rendering::Array {
            container: name.unwrap_or(element_name).to_string(),
            item: item.map(str::to_string),
        }
    } else {
        match declared {
            // Nested nodes are named by their own schema.
            FieldType::Node => Rendering::NestedNode,
            FieldType::Sequence => return Err(ClassificationError::UnmarkedSequence(field.to_string())),
            FieldType::Value => match element {
                Some(_) => Rendering::NamedElement {
                    element: element_name.to_string(),
                },
                None => Rendering::Simple { element: field.to_string() },
            },
        }
    };

    match &rendering {
        Rendering::Base64Element { element } | Rendering::NamedElement { element } | Rendering::Simple { element } => validate_element_name(element)?,
        Rendering::Array { container, item } => {
            validate_element_name(container)?;
            if let Some(item) = item {
                validate_element_name(item)?;
            }
        }
        Rendering::Base64Inline | Rendering::NestedNode => {}
    }

    Ok(rendering)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn attachment_annotations_take_priority() {
        let annotations = [Annotation::ElementName(Some("Text")), Annotation::ImageToBase64, Annotation::Base64InElement];
        assert_eq!(classify("image_path", FieldType::Value, &annotations), Ok(Rendering::Base64Inline));

        let annotations = [Annotation::ImageToBase64, Annotation::ElementName(Some("Text"))];
        assert_eq!(
            classify("image_path", FieldType::Value, &annotations),
            Ok(Rendering::Base64Element { element: String::from("Text") })
        );

        assert_eq!(
            classify("image_path", FieldType::Value, &[Annotation::ImageToBase64]),
            Ok(Rendering::Base64Element {
                element: String::from("image_path")
            })
        );
    }

    #[test]
    fn array_container_names() {
        assert_eq!(
            classify("products", FieldType::Sequence, &[Annotation::ArrayContainer(None)]),
            Ok(Rendering::Array {
                container: String::from("products"),
                item: None
            })
        );

        let annotations = [Annotation::ElementName(Some("items")), Annotation::ArrayContainer(None)];
        assert_eq!(
            classify("products", FieldType::Sequence, &annotations),
            Ok(Rendering::Array {
                container: String::from("items"),
                item: None
            })
        );

        let annotations = [
            Annotation::ArrayContainer(Some("EvidencePackages")),
            Annotation::ArrayItem("EvidencePackage"),
            Annotation::ElementName(Some("ignored")),
        ];
        assert_eq!(
            classify("packages", FieldType::Sequence, &annotations),
            Ok(Rendering::Array {
                container: String::from("EvidencePackages"),
                item: Some(String::from("EvidencePackage"))
            })
        );
    }

    #[test]
    fn fallbacks_follow_declared_type() {
        assert_eq!(classify("category", FieldType::Node, &[]), Ok(Rendering::NestedNode));
        assert_eq!(classify("category", FieldType::Node, &[Annotation::ElementName(Some("category"))]), Ok(Rendering::NestedNode));
        assert_eq!(classify("name", FieldType::Value, &[]), Ok(Rendering::Simple { element: String::from("name") }));
        assert_eq!(
            classify("Name", FieldType::Value, &[Annotation::ElementName(None)]),
            Ok(Rendering::NamedElement { element: String::from("Name") })
        );
    }

    #[test]
    fn unmarked_sequences_are_rejected() {
        assert_eq!(
            classify("products", FieldType::Sequence, &[]),
            Err(ClassificationError::UnmarkedSequence(String::from("products")))
        );
        assert_eq!(
            classify("products", FieldType::Sequence, &[Annotation::ElementName(Some("products"))]),
            Err(ClassificationError::UnmarkedSequence(String::from("products")))
        );
    }

    #[test]
    fn mismatched_annotations_are_rejected() {
        assert!(matches!(
            classify("name", FieldType::Value, &[Annotation::ArrayContainer(None)]),
            Err(ClassificationError::AnnotationMismatch { annotation: "ArrayContainer", .. })
        ));
        assert!(matches!(
            classify("child", FieldType::Node, &[Annotation::ImageToBase64]),
            Err(ClassificationError::AnnotationMismatch { annotation: "ImageToBase64", .. })
        ));
        assert!(matches!(
            classify("name", FieldType::Value, &[Annotation::ArrayItem("entry")]),
            Err(ClassificationError::AnnotationMismatch { annotation: "ArrayItem", .. })
        ));
        assert!(matches!(
            classify("child", FieldType::Node, &[Annotation::ElementName(None), Annotation::ArrayItem("entry")]),
            Err(ClassificationError::AnnotationMismatch { annotation: "ArrayItem", .. })
        ));
    }

    #[test]
    fn element_names_are_validated() {
        assert!(validate_element_name("orderDate").is_ok());
        assert!(validate_element_name("_private.value-2").is_ok());
        assert!(validate_element_name("2fast").is_err());
        assert!(validate_element_name("has space").is_err());
        assert!(validate_element_name("XmlConfig").is_ok());
        assert!(validate_element_name("xmlData").is_ok());
        assert_eq!(
            classify("id", FieldType::Value, &[Annotation::ElementName(Some("<id>"))]),
            Err(ClassificationError::InvalidElementName(String::from("<id>")))
        );
    }
}
