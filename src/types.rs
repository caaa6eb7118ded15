//! Core type definitions for symdb
//!
//! Defines the record kinds stored in an index database:
//! - Symbols: hierarchically named program entities (classes, methods, ...)
//! - References: kind-tagged edges between symbols
//! - Files and source ranges within them
//!
//! Every kind enumeration is closed. Each value has a stable integer code used
//! by integer-driven callers and a stable text form used in the database.

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::name::NameHierarchy;

/// Represents the kind of a recorded symbol
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SymbolKind {
    Type,
    BuiltinType,
    Module,
    Namespace,
    Package,
    Struct,
    Class,
    Interface,
    Annotation,
    GlobalVariable,
    Field,
    Function,
    Method,
    Enum,
    EnumConstant,
    Typedef,
    TypeParameter,
    Macro,
    Union,
    TemplateParameter,
}

impl SymbolKind {
    pub const ALL: [SymbolKind; 20] = [
        SymbolKind::Type,
        SymbolKind::BuiltinType,
        SymbolKind::Module,
        SymbolKind::Namespace,
        SymbolKind::Package,
        SymbolKind::Struct,
        SymbolKind::Class,
        SymbolKind::Interface,
        SymbolKind::Annotation,
        SymbolKind::GlobalVariable,
        SymbolKind::Field,
        SymbolKind::Function,
        SymbolKind::Method,
        SymbolKind::Enum,
        SymbolKind::EnumConstant,
        SymbolKind::Typedef,
        SymbolKind::TypeParameter,
        SymbolKind::Macro,
        SymbolKind::Union,
        SymbolKind::TemplateParameter,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            SymbolKind::Type => "type",
            SymbolKind::BuiltinType => "builtin_type",
            SymbolKind::Module => "module",
            SymbolKind::Namespace => "namespace",
            SymbolKind::Package => "package",
            SymbolKind::Struct => "struct",
            SymbolKind::Class => "class",
            SymbolKind::Interface => "interface",
            SymbolKind::Annotation => "annotation",
            SymbolKind::GlobalVariable => "global_variable",
            SymbolKind::Field => "field",
            SymbolKind::Function => "function",
            SymbolKind::Method => "method",
            SymbolKind::Enum => "enum",
            SymbolKind::EnumConstant => "enum_constant",
            SymbolKind::Typedef => "typedef",
            SymbolKind::TypeParameter => "type_parameter",
            SymbolKind::Macro => "macro",
            SymbolKind::Union => "union",
            SymbolKind::TemplateParameter => "template_parameter",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|kind| kind.as_str() == s)
    }

    /// Integer code, stable across releases of the same database version
    pub fn code(&self) -> i32 {
        *self as i32
    }

    pub fn from_code(code: i32) -> Result<Self> {
        usize::try_from(code)
            .ok()
            .and_then(|i| Self::ALL.get(i).copied())
            .ok_or_else(|| Error::invalid_enum("symbol kind", code))
    }
}

/// Whether a symbol's appearance in the indexed sources is a definition
///
/// Symbols that never get a definition kind are "non-indexed": they are
/// referenced from indexed code but defined somewhere outside of it.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DefinitionKind {
    Implicit,
    Explicit,
    #[default]
    NonIndexed,
}

impl DefinitionKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            DefinitionKind::Implicit => "implicit",
            DefinitionKind::Explicit => "explicit",
            DefinitionKind::NonIndexed => "non_indexed",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "implicit" => Some(DefinitionKind::Implicit),
            "explicit" => Some(DefinitionKind::Explicit),
            "non_indexed" => Some(DefinitionKind::NonIndexed),
            _ => None,
        }
    }

    pub fn code(&self) -> i32 {
        match self {
            DefinitionKind::Implicit => 0,
            DefinitionKind::Explicit => 1,
            DefinitionKind::NonIndexed => 2,
        }
    }

    pub fn from_code(code: i32) -> Result<Self> {
        match code {
            0 => Ok(DefinitionKind::Implicit),
            1 => Ok(DefinitionKind::Explicit),
            2 => Ok(DefinitionKind::NonIndexed),
            _ => Err(Error::invalid_enum("definition kind", code)),
        }
    }
}

/// Represents the kind of a recorded reference between two symbols
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReferenceKind {
    /// Source uses target as a type
    TypeUsage,
    /// Source reads or writes target
    Usage,
    /// Source calls target function/method
    Call,
    /// Source derives from target
    Inheritance,
    /// Source overrides target method
    Override,
    /// Target is passed as a type argument within source
    TypeArgument,
    /// Source is a specialization of target template
    TemplateSpecialization,
    /// Source file includes target file
    Include,
    /// Source imports target module/symbol
    Import,
    /// Source expands target macro
    MacroUsage,
    /// Source is annotated with target
    AnnotationUsage,
}

impl ReferenceKind {
    pub const ALL: [ReferenceKind; 11] = [
        ReferenceKind::TypeUsage,
        ReferenceKind::Usage,
        ReferenceKind::Call,
        ReferenceKind::Inheritance,
        ReferenceKind::Override,
        ReferenceKind::TypeArgument,
        ReferenceKind::TemplateSpecialization,
        ReferenceKind::Include,
        ReferenceKind::Import,
        ReferenceKind::MacroUsage,
        ReferenceKind::AnnotationUsage,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ReferenceKind::TypeUsage => "type_usage",
            ReferenceKind::Usage => "usage",
            ReferenceKind::Call => "call",
            ReferenceKind::Inheritance => "inheritance",
            ReferenceKind::Override => "override",
            ReferenceKind::TypeArgument => "type_argument",
            ReferenceKind::TemplateSpecialization => "template_specialization",
            ReferenceKind::Include => "include",
            ReferenceKind::Import => "import",
            ReferenceKind::MacroUsage => "macro_usage",
            ReferenceKind::AnnotationUsage => "annotation_usage",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|kind| kind.as_str() == s)
    }

    pub fn code(&self) -> i32 {
        *self as i32
    }

    pub fn from_code(code: i32) -> Result<Self> {
        usize::try_from(code)
            .ok()
            .and_then(|i| Self::ALL.get(i).copied())
            .ok_or_else(|| Error::invalid_enum("reference kind", code))
    }
}

/// Kind of a stored edge. Member edges are created implicitly between a
/// symbol and the symbols nested below it in the name hierarchy; every other
/// edge is a recorded reference.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EdgeKind {
    Member,
    Reference(ReferenceKind),
}

impl EdgeKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            EdgeKind::Member => "member",
            EdgeKind::Reference(kind) => kind.as_str(),
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "member" => Some(EdgeKind::Member),
            other => ReferenceKind::from_str(other).map(EdgeKind::Reference),
        }
    }
}

/// Role a source location plays for the element it is attached to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LocationKind {
    /// The span of a symbol's name
    Token,
    /// The full body of a symbol
    Scope,
    /// A symbol used as the qualifier of another name
    Qualifier,
    LocalSymbol,
    /// The span shown when a symbol is hovered
    Signature,
    /// A range that must never be displayed partially
    Atomic,
    Error,
    /// An occurrence of a reference
    Reference,
    /// Occurrence of a reference whose target could not be resolved
    Unsolved,
}

impl LocationKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            LocationKind::Token => "token",
            LocationKind::Scope => "scope",
            LocationKind::Qualifier => "qualifier",
            LocationKind::LocalSymbol => "local_symbol",
            LocationKind::Signature => "signature",
            LocationKind::Atomic => "atomic",
            LocationKind::Error => "error",
            LocationKind::Reference => "reference",
            LocationKind::Unsolved => "unsolved",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "token" => Some(LocationKind::Token),
            "scope" => Some(LocationKind::Scope),
            "qualifier" => Some(LocationKind::Qualifier),
            "local_symbol" => Some(LocationKind::LocalSymbol),
            "signature" => Some(LocationKind::Signature),
            "atomic" => Some(LocationKind::Atomic),
            "error" => Some(LocationKind::Error),
            "reference" => Some(LocationKind::Reference),
            "unsolved" => Some(LocationKind::Unsolved),
            _ => None,
        }
    }

    /// Single-valued kinds replace any previous location of the same kind on
    /// the same element; the rest accumulate.
    pub fn is_single_valued(&self) -> bool {
        matches!(
            self,
            LocationKind::Token | LocationKind::Scope | LocationKind::Signature
        )
    }
}

/// A range of characters in a recorded file.
///
/// Line and column numbers start at 1 and both ends are inclusive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SourceRange {
    pub file_id: i64,
    pub start_line: u32,
    pub start_column: u32,
    pub end_line: u32,
    pub end_column: u32,
}

impl SourceRange {
    pub fn new(
        file_id: i64,
        start_line: u32,
        start_column: u32,
        end_line: u32,
        end_column: u32,
    ) -> Self {
        Self {
            file_id,
            start_line,
            start_column,
            end_line,
            end_column,
        }
    }

    /// Check that the range is 1-based and that its end does not precede its start
    pub fn validate(&self) -> Result<()> {
        if self.start_line == 0
            || self.start_column == 0
            || self.end_line == 0
            || self.end_column == 0
        {
            return Err(Error::InvalidRange(format!(
                "{} - line and column numbers start at 1",
                self
            )));
        }
        if (self.end_line, self.end_column) < (self.start_line, self.start_column) {
            return Err(Error::InvalidRange(format!(
                "{} - end precedes start",
                self
            )));
        }
        Ok(())
    }
}

impl std::fmt::Display for SourceRange {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "file {} [{}:{}-{}:{}]",
            self.file_id, self.start_line, self.start_column, self.end_line, self.end_column
        )
    }
}

/// A recorded source file
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileRecord {
    pub id: i64,
    pub path: String,
    pub language: Option<String>,
    /// Unix seconds, 0 when the file did not exist at record time
    pub modification_time: i64,
    pub line_count: u32,
    pub content_hash: Option<String>,
}

/// Facts gathered from disk when a file is first recorded
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FileMetadata {
    pub modification_time: i64,
    pub line_count: u32,
    pub content_hash: Option<String>,
    pub content: Option<String>,
}

/// A recorded symbol
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SymbolRecord {
    pub id: i64,
    pub name: NameHierarchy,
    /// `None` until a kind is recorded
    pub kind: Option<SymbolKind>,
    pub definition_kind: DefinitionKind,
}

/// A recorded reference between two symbols
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReferenceRecord {
    pub id: i64,
    pub source_id: i64,
    pub target_id: i64,
    pub kind: ReferenceKind,
    pub ambiguous: bool,
}

/// A stored source location together with its role
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LocationRecord {
    pub id: i64,
    pub kind: LocationKind,
    pub range: SourceRange,
}

/// A recorded function-local symbol
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LocalSymbolRecord {
    pub id: i64,
    pub name: String,
}

/// An indexing error reported by the caller
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorRecord {
    pub id: i64,
    pub message: String,
    pub fatal: bool,
}

/// Database statistics
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseStats {
    pub version: Option<i32>,
    pub total_files: u64,
    pub total_symbols: u64,
    pub total_references: u64,
    pub total_locations: u64,
    pub total_errors: u64,
    pub db_size_bytes: u64,
    pub symbol_kinds: Vec<(SymbolKind, u64)>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_symbol_kind_as_str() {
        assert_eq!(SymbolKind::Class.as_str(), "class");
        assert_eq!(SymbolKind::GlobalVariable.as_str(), "global_variable");
        assert_eq!(SymbolKind::EnumConstant.as_str(), "enum_constant");
        assert_eq!(SymbolKind::TemplateParameter.as_str(), "template_parameter");
    }

    #[test]
    fn test_symbol_kind_from_str() {
        assert_eq!(SymbolKind::from_str("method"), Some(SymbolKind::Method));
        assert_eq!(SymbolKind::from_str("builtin_type"), Some(SymbolKind::BuiltinType));
        assert_eq!(SymbolKind::from_str("Method"), None);
        assert_eq!(SymbolKind::from_str(""), None);
    }

    #[test]
    fn test_symbol_kind_codes_follow_declaration_order() {
        assert_eq!(SymbolKind::Type.code(), 0);
        assert_eq!(SymbolKind::Class.code(), 6);
        assert_eq!(SymbolKind::Field.code(), 10);
        assert_eq!(SymbolKind::Method.code(), 12);
        for (i, kind) in SymbolKind::ALL.iter().enumerate() {
            assert_eq!(kind.code(), i as i32);
            assert_eq!(SymbolKind::from_code(i as i32).unwrap(), *kind);
        }
    }

    #[test]
    fn test_symbol_kind_rejects_unknown_code() {
        let err = SymbolKind::from_code(20).unwrap_err();
        assert!(matches!(err, Error::InvalidEnum { kind: "symbol kind", .. }));
        assert!(SymbolKind::from_code(-1).is_err());
    }

    #[test]
    fn test_definition_kind_codes() {
        assert_eq!(DefinitionKind::from_code(0).unwrap(), DefinitionKind::Implicit);
        assert_eq!(DefinitionKind::from_code(1).unwrap(), DefinitionKind::Explicit);
        assert_eq!(DefinitionKind::from_code(2).unwrap(), DefinitionKind::NonIndexed);
        assert!(matches!(
            DefinitionKind::from_code(3),
            Err(Error::InvalidEnum { .. })
        ));
        assert_eq!(DefinitionKind::default(), DefinitionKind::NonIndexed);
    }

    #[test]
    fn test_reference_kind_roundtrip() {
        for kind in ReferenceKind::ALL {
            assert_eq!(ReferenceKind::from_str(kind.as_str()), Some(kind));
            assert_eq!(ReferenceKind::from_code(kind.code()).unwrap(), kind);
        }
        assert_eq!(ReferenceKind::Usage.code(), 1);
        assert!(ReferenceKind::from_code(11).is_err());
    }

    #[test]
    fn test_edge_kind_from_str() {
        assert_eq!(EdgeKind::from_str("member"), Some(EdgeKind::Member));
        assert_eq!(
            EdgeKind::from_str("call"),
            Some(EdgeKind::Reference(ReferenceKind::Call))
        );
        assert_eq!(EdgeKind::from_str("calls"), None);
    }

    #[test]
    fn test_location_kind_single_valued() {
        assert!(LocationKind::Token.is_single_valued());
        assert!(LocationKind::Scope.is_single_valued());
        assert!(LocationKind::Signature.is_single_valued());
        assert!(!LocationKind::Qualifier.is_single_valued());
        assert!(!LocationKind::LocalSymbol.is_single_valued());
        assert!(!LocationKind::Reference.is_single_valued());
    }

    #[test]
    fn test_source_range_validate() {
        assert!(SourceRange::new(1, 2, 7, 2, 12).validate().is_ok());
        assert!(SourceRange::new(1, 2, 1, 7, 1).validate().is_ok());
        // single character range
        assert!(SourceRange::new(1, 3, 3, 3, 3).validate().is_ok());
    }

    #[test]
    fn test_source_range_rejects_zero_and_reversed() {
        assert!(matches!(
            SourceRange::new(1, 0, 1, 1, 1).validate(),
            Err(Error::InvalidRange(_))
        ));
        assert!(matches!(
            SourceRange::new(1, 1, 1, 1, 0).validate(),
            Err(Error::InvalidRange(_))
        ));
        assert!(matches!(
            SourceRange::new(1, 4, 1, 3, 9).validate(),
            Err(Error::InvalidRange(_))
        ));
        assert!(matches!(
            SourceRange::new(1, 4, 5, 4, 4).validate(),
            Err(Error::InvalidRange(_))
        ));
    }

    #[test]
    fn test_symbol_kind_serialization() {
        let json = serde_json::to_string(&SymbolKind::GlobalVariable).unwrap();
        assert_eq!(json, "\"global_variable\"");

        let parsed: SymbolKind = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, SymbolKind::GlobalVariable);
    }

    #[test]
    fn test_reference_kind_serialization() {
        let json = serde_json::to_string(&ReferenceKind::MacroUsage).unwrap();
        assert_eq!(json, "\"macro_usage\"");
    }
}
