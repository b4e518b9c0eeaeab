//! Attribute schemas for the provider block and its resources.

use serde::Serialize;

/// Value type of an attribute.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case", tag = "type")]
pub enum AttributeType {
    String,
    List,
    /// Map of string keys to nested objects
    MapNested { attributes: Vec<Attribute> },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Attribute {
    pub name: String,
    #[serde(flatten)]
    pub kind: AttributeType,
    pub required: bool,
    pub optional: bool,
    pub computed: bool,
    pub sensitive: bool,
    pub description: String,
}

impl Attribute {
    fn new(name: &str, kind: AttributeType, description: &str) -> Self {
        Self {
            name: name.to_string(),
            kind,
            required: false,
            optional: false,
            computed: false,
            sensitive: false,
            description: description.to_string(),
        }
    }

    pub fn required(name: &str, kind: AttributeType, description: &str) -> Self {
        Self {
            required: true,
            ..Self::new(name, kind, description)
        }
    }

    pub fn optional(name: &str, kind: AttributeType, description: &str) -> Self {
        Self {
            optional: true,
            ..Self::new(name, kind, description)
        }
    }

    pub fn computed(name: &str, kind: AttributeType, description: &str) -> Self {
        Self {
            computed: true,
            ..Self::new(name, kind, description)
        }
    }

    pub fn sensitive(mut self) -> Self {
        self.sensitive = true;
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Schema {
    pub description: String,
    pub attributes: Vec<Attribute>,
}

impl Schema {
    pub fn attribute(&self, name: &str) -> Option<&Attribute> {
        self.attributes.iter().find(|a| a.name == name)
    }
}
