//! Single property definition and raw type parsing

use std::fmt;
use std::sync::{Arc, LazyLock};

use regex::Regex;

/// Base type assigned to every typed-collection definition
pub const COLLECTION_MARKER: &str = "array";

static DEFAULT_SYNTAX: LazyLock<Arc<TypeSyntax>> =
    LazyLock::new(|| Arc::new(TypeSyntax::default()));

/// Rules for recognising typed-collection notation in raw types
///
/// Two forms are recognised: a trailing suffix (`Address[]`) and a
/// single-parameter generic (`array<Address>`).
pub struct TypeSyntax {
    collection_suffix: String,
    generic: Regex,
}

impl TypeSyntax {
    /// Build a syntax from a suffix and the accepted generic collection names
    ///
    /// # Arguments
    /// * `collection_suffix` - Suffix marking a typed collection (e.g., `"[]"`)
    /// * `generic_names` - Names accepted as `name<T>` (matched case-insensitively)
    pub fn new(collection_suffix: &str, generic_names: &[&str]) -> Result<Self, regex::Error> {
        let names = generic_names
            .iter()
            .map(|n| regex::escape(n))
            .collect::<Vec<_>>()
            .join("|");
        let generic = Regex::new(&format!(r"^(?i:{})\s*<\s*([^,]+?)\s*>$", names))?;
        Ok(Self {
            collection_suffix: collection_suffix.to_string(),
            generic,
        })
    }

    /// Shared default syntax (`[]`, `array<T>`, `list<T>`, `iterable<T>`)
    pub fn shared() -> Arc<TypeSyntax> {
        Arc::clone(&DEFAULT_SYNTAX)
    }

    /// Element type of a typed-collection raw type, if it is one
    pub fn element_of<'a>(&self, raw: &'a str) -> Option<&'a str> {
        if !self.collection_suffix.is_empty() {
            if let Some(element) = raw.strip_suffix(self.collection_suffix.as_str()) {
                return Some(element.trim());
            }
        }
        self.generic
            .captures(raw)
            .and_then(|caps| caps.get(1))
            .map(|m| m.as_str())
    }
}

impl Default for TypeSyntax {
    fn default() -> Self {
        Self {
            collection_suffix: "[]".to_string(),
            generic: Regex::new(r"^(?i:array|list|iterable)\s*<\s*([^,]+?)\s*>$")
                .expect("default collection pattern is valid"),
        }
    }
}

impl fmt::Debug for TypeSyntax {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TypeSyntax")
            .field("collection_suffix", &self.collection_suffix)
            .field("generic", &self.generic.as_str())
            .finish()
    }
}

/// Declared type of one field
///
/// Invariant: `element_type` is present iff the raw type denotes a typed
/// collection, in which case `base_type` is [`COLLECTION_MARKER`].
#[derive(Clone)]
pub struct PropertyDefinition {
    name: String,
    raw_type: String,
    base_type: String,
    element_type: Option<String>,
    syntax: Arc<TypeSyntax>,
}

impl PropertyDefinition {
    /// Parse a definition with the default syntax
    pub fn new(name: impl Into<String>, raw_type: &str) -> Self {
        Self::with_syntax(TypeSyntax::shared())
            .set_name(name)
            .set_raw_type(raw_type)
    }

    /// Empty definition carrying `syntax`, used as a collection prototype
    pub fn with_syntax(syntax: Arc<TypeSyntax>) -> Self {
        Self {
            name: String::new(),
            raw_type: String::new(),
            base_type: String::new(),
            element_type: None,
            syntax,
        }
    }

    pub fn set_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Parse `raw` into base and element types
    ///
    /// No check is made that the types are known; an empty raw type yields an
    /// empty base type.
    pub fn set_raw_type(mut self, raw: &str) -> Self {
        let raw = raw.trim();
        self.raw_type = raw.to_string();
        match self.syntax.element_of(raw) {
            Some(element) => {
                self.element_type = Some(element.to_string());
                self.base_type = COLLECTION_MARKER.to_string();
            }
            None => {
                self.element_type = None;
                self.base_type = raw.to_string();
            }
        }
        self
    }

    /// Synthetic definition for one element of this collection
    ///
    /// Returns `None` if this is not a typed collection.
    pub fn element_definition(&self, key: &str) -> Option<PropertyDefinition> {
        let element = self.element_type.as_deref()?;
        Some(
            Self::with_syntax(Arc::clone(&self.syntax))
                .set_name(format!("{}[{}]", self.name, key))
                .set_raw_type(element),
        )
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn raw_type(&self) -> &str {
        &self.raw_type
    }

    pub fn base_type(&self) -> &str {
        &self.base_type
    }

    pub fn element_type(&self) -> Option<&str> {
        self.element_type.as_deref()
    }

    pub fn is_collection(&self) -> bool {
        self.element_type.is_some()
    }
}

impl Default for PropertyDefinition {
    fn default() -> Self {
        Self::with_syntax(TypeSyntax::shared())
    }
}

impl PartialEq for PropertyDefinition {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name
            && self.raw_type == other.raw_type
            && self.base_type == other.base_type
            && self.element_type == other.element_type
    }
}

impl Eq for PropertyDefinition {}

impl fmt::Debug for PropertyDefinition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PropertyDefinition")
            .field("name", &self.name)
            .field("raw_type", &self.raw_type)
            .field("base_type", &self.base_type)
            .field("element_type", &self.element_type)
            .finish()
    }
}
