//! Hierarchical symbol names
//!
//! A symbol is identified by its [`NameHierarchy`]: an ordered list of
//! `{prefix, name, postfix}` elements plus the delimiter used to join them
//! (`"."` for Python, `"::"` for C++, ...). The encoded form produced by
//! [`NameHierarchy::encode`] is the interning key stored in the database.
//!
//! Encoded layout:
//!
//! ```text
//! delimiter \tm name \ts prefix \tp postfix ( \tn name \ts prefix \tp postfix )*
//! ```

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

const META_DELIMITER: &str = "\tm";
const NAME_DELIMITER: &str = "\tn";
const PARTS_DELIMITER: &str = "\ts";
const SIGNATURE_DELIMITER: &str = "\tp";

const RESERVED: [&str; 4] = [
    META_DELIMITER,
    NAME_DELIMITER,
    PARTS_DELIMITER,
    SIGNATURE_DELIMITER,
];

/// A single element of a symbol's name, e.g. `{"void", "foo", "()"}`
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct NameElement {
    #[serde(default)]
    pub prefix: String,
    pub name: String,
    #[serde(default)]
    pub postfix: String,
}

impl NameElement {
    pub fn new(
        prefix: impl Into<String>,
        name: impl Into<String>,
        postfix: impl Into<String>,
    ) -> Self {
        Self {
            prefix: prefix.into(),
            name: name.into(),
            postfix: postfix.into(),
        }
    }

    /// An element with a bare name and no prefix or postfix
    pub fn named(name: impl Into<String>) -> Self {
        Self::new("", name, "")
    }
}

/// The full name of a symbol
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct NameHierarchy {
    #[serde(rename = "name_delimiter")]
    pub delimiter: String,
    #[serde(rename = "name_elements", default)]
    pub elements: Vec<NameElement>,
}

impl NameHierarchy {
    pub fn new(delimiter: impl Into<String>) -> Self {
        Self {
            delimiter: delimiter.into(),
            elements: Vec::new(),
        }
    }

    /// Build a hierarchy from bare names, outermost first
    pub fn from_names<I, S>(delimiter: impl Into<String>, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            delimiter: delimiter.into(),
            elements: names.into_iter().map(NameElement::named).collect(),
        }
    }

    pub fn push(mut self, element: NameElement) -> Self {
        self.elements.push(element);
        self
    }

    pub fn len(&self) -> usize {
        self.elements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }

    /// Every enclosing hierarchy from the outermost element down to `self`
    pub fn ancestry(&self) -> impl Iterator<Item = NameHierarchy> + '_ {
        (1..=self.elements.len()).map(move |depth| Self {
            delimiter: self.delimiter.clone(),
            elements: self.elements[..depth].to_vec(),
        })
    }

    /// Check that the hierarchy can be encoded and decoded losslessly
    pub fn validate(&self) -> Result<()> {
        if self.elements.is_empty() {
            return Err(Error::MalformedName(
                "a name hierarchy needs at least one element".to_string(),
            ));
        }
        check_reserved("delimiter", &self.delimiter)?;
        for (i, element) in self.elements.iter().enumerate() {
            if element.name.is_empty() {
                return Err(Error::MalformedName(format!("element {} has an empty name", i)));
            }
            check_reserved("prefix", &element.prefix)?;
            check_reserved("name", &element.name)?;
            check_reserved("postfix", &element.postfix)?;
        }
        Ok(())
    }

    /// Encode into the canonical interning key
    pub fn encode(&self) -> Result<String> {
        self.validate()?;

        let mut encoded = String::with_capacity(self.delimiter.len() + 2);
        encoded.push_str(&self.delimiter);
        encoded.push_str(META_DELIMITER);
        for (i, element) in self.elements.iter().enumerate() {
            if i != 0 {
                encoded.push_str(NAME_DELIMITER);
            }
            encoded.push_str(&element.name);
            encoded.push_str(PARTS_DELIMITER);
            encoded.push_str(&element.prefix);
            encoded.push_str(SIGNATURE_DELIMITER);
            encoded.push_str(&element.postfix);
        }
        Ok(encoded)
    }

    /// Decode a key produced by [`NameHierarchy::encode`]
    pub fn decode(key: &str) -> Result<Self> {
        let (delimiter, rest) = key
            .split_once(META_DELIMITER)
            .ok_or_else(|| Error::MalformedName(format!("missing meta marker in {:?}", key)))?;

        let mut elements = Vec::new();
        for part in rest.split(NAME_DELIMITER) {
            let (name, rest) = part.split_once(PARTS_DELIMITER).ok_or_else(|| {
                Error::MalformedName(format!("missing name marker in element {:?}", part))
            })?;
            let (prefix, postfix) = rest.split_once(SIGNATURE_DELIMITER).ok_or_else(|| {
                Error::MalformedName(format!("missing signature marker in element {:?}", part))
            })?;
            elements.push(NameElement::new(prefix, name, postfix));
        }

        let hierarchy = Self {
            delimiter: delimiter.to_string(),
            elements,
        };
        hierarchy.validate()?;
        Ok(hierarchy)
    }

    /// Parse the JSON document form:
    /// `{"name_delimiter": ".", "name_elements": [{"prefix": "", "name": "A", "postfix": ""}]}`
    pub fn from_json(document: &str) -> Result<Self> {
        let hierarchy: NameHierarchy = serde_json::from_str(document)
            .map_err(|e| Error::MalformedName(format!("invalid name document: {}", e)))?;
        hierarchy.validate()?;
        Ok(hierarchy)
    }

    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string_pretty(self)
            .map_err(|e| Error::MalformedName(format!("unable to serialize name: {}", e)))
    }

    /// Human-readable form, e.g. `void foo::bar()`
    pub fn display_name(&self) -> String {
        let joined = self
            .elements
            .iter()
            .map(|e| e.name.as_str())
            .collect::<Vec<_>>()
            .join(&self.delimiter);

        let (prefix, postfix) = match self.elements.last() {
            Some(last) => (last.prefix.as_str(), last.postfix.as_str()),
            None => ("", ""),
        };

        let mut display = String::new();
        if !prefix.is_empty() {
            display.push_str(prefix);
            display.push(' ');
        }
        display.push_str(&joined);
        display.push_str(postfix);
        display
    }
}

fn check_reserved(field: &str, value: &str) -> Result<()> {
    if let Some(marker) = RESERVED.iter().find(|m| value.contains(*m)) {
        return Err(Error::MalformedName(format!(
            "{} {:?} contains reserved sequence {:?}",
            field, value, marker
        )));
    }
    Ok(())
}
