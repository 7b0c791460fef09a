//! Source model supplied by the host: declarations, references and
//! annotations of every Java and Kotlin file, with byte spans into the file
//! text.
//!
//! The model is plain serde data so any front end (a compiler plugin, an IDE
//! index export, a test fixture) can produce it. Class names are internal
//! (`a/b/C$D`), descriptors are JVM descriptors.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use remap_core::patch::Span;

/// Parsed view of a whole workspace plus library classes used for
/// hierarchy queries.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceIndex {
    /// Source files by workspace-relative path.
    #[serde(default)]
    pub files: BTreeMap<String, JavaSource>,
    /// Classes with no source in the workspace.
    #[serde(default)]
    pub libraries: Vec<ClassDecl>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct JavaSource {
    #[serde(default)]
    pub package: Option<PackageDecl>,
    #[serde(default)]
    pub imports: Vec<ImportDecl>,
    #[serde(default)]
    pub classes: Vec<ClassDecl>,
    #[serde(default)]
    pub references: Vec<ReferenceSite>,
    #[serde(default)]
    pub annotations: Vec<AnnotationDecl>,
}

impl JavaSource {
    pub fn class(&self, jvm_name: &str) -> Option<&ClassDecl> {
        self.classes.iter().find(|c| c.jvm_name == jvm_name)
    }

    pub fn declares(&self, jvm_name: &str) -> bool {
        self.class(jvm_name).is_some()
    }
}

/// `package a.b;` with the span of `a.b`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PackageDecl {
    pub name: String,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImportDecl {
    /// Dotted path as written, without `static` or `.*`.
    pub path: String,
    /// Span of the whole statement, `import` through `;`.
    pub span: Span,
    #[serde(default)]
    pub is_static: bool,
    #[serde(default)]
    pub on_demand: bool,
    /// Internal name of the imported class (or the owner, for static imports).
    #[serde(default)]
    pub class_name: Option<String>,
    /// Span of the member name in a single static import.
    #[serde(default)]
    pub member_span: Option<Span>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassDecl {
    pub jvm_name: String,
    /// Span of the declared simple name; absent for library classes.
    #[serde(default)]
    pub name_span: Option<Span>,
    /// Start of the declaration, including modifiers and annotations.
    #[serde(default)]
    pub decl_start: u64,
    /// Superclass and interfaces, internal names.
    #[serde(default)]
    pub supertypes: Vec<String>,
    #[serde(default)]
    pub is_record: bool,
    #[serde(default)]
    pub fields: Vec<FieldDecl>,
    #[serde(default)]
    pub methods: Vec<MethodDecl>,
    #[serde(default)]
    pub record_components: Vec<RecordComponent>,
}

impl ClassDecl {
    pub fn is_nested(&self) -> bool {
        self.jvm_name.contains('$')
    }

    pub fn field(&self, name: &str) -> Option<&FieldDecl> {
        self.fields.iter().find(|f| f.name == name)
    }

    pub fn method(&self, name: &str, desc: &str) -> Option<&MethodDecl> {
        self.methods.iter().find(|m| m.name == name && m.desc == desc)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldDecl {
    pub name: String,
    pub desc: String,
    #[serde(default)]
    pub name_span: Option<Span>,
    #[serde(default)]
    pub decl_start: u64,
    #[serde(default)]
    pub is_static: bool,
    #[serde(default)]
    pub is_private: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MethodDecl {
    pub name: String,
    pub desc: String,
    #[serde(default)]
    pub name_span: Option<Span>,
    #[serde(default)]
    pub decl_start: u64,
    #[serde(default)]
    pub is_constructor: bool,
    #[serde(default)]
    pub is_static: bool,
    #[serde(default)]
    pub is_private: bool,
}

impl MethodDecl {
    /// Private, static and constructor methods never override anything.
    pub fn can_override(&self) -> bool {
        !(self.is_private || self.is_static || self.is_constructor)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordComponent {
    pub name: String,
    pub desc: String,
    #[serde(default)]
    pub name_span: Option<Span>,
    #[serde(default)]
    pub decl_start: u64,
}

// ============================================================================
// References
// ============================================================================

/// What a reference denotes, as resolved by the host.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Symbol {
    Class { name: String },
    Field { owner: String, name: String },
    Method { owner: String, name: String, desc: String },
    Constructor { owner: String, desc: String },
    /// Slash-separated package name.
    Package { name: String },
}

impl Symbol {
    pub fn field(owner: impl Into<String>, name: impl Into<String>) -> Self {
        Symbol::Field {
            owner: owner.into(),
            name: name.into(),
        }
    }

    pub fn method(owner: impl Into<String>, name: impl Into<String>, desc: impl Into<String>) -> Self {
        Symbol::Method {
            owner: owner.into(),
            name: name.into(),
            desc: desc.into(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RefContext {
    #[default]
    Code,
    /// The class path of an `import` statement.
    Import,
    /// `{@link}` / `@see` in a doc comment.
    Doc,
    /// Kotlin property syntax for a Java getter: `a.name` for `a.getName()`.
    Property,
}

/// The qualifier written before a reference: `a.b` in `a.b.C`, without the
/// trailing dot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Qualifier {
    pub span: Span,
    /// What the qualifier resolves to, when it is a package or class.
    #[serde(default)]
    pub target: Option<Symbol>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReferenceSite {
    /// Span of the referenced simple name.
    pub span: Span,
    /// `None` when the host could not resolve the reference.
    #[serde(default)]
    pub target: Option<Symbol>,
    #[serde(default)]
    pub qualifier: Option<Qualifier>,
    #[serde(default)]
    pub context: RefContext,
    /// Start of the innermost enclosing declaration, for diagnostics.
    #[serde(default)]
    pub enclosing: u64,
}

// ============================================================================
// Annotations
// ============================================================================

/// The element an annotation is attached to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum AnnotatedElement {
    Class { name: String },
    Field { owner: String, name: String },
    Method { owner: String, name: String, desc: String },
}

impl AnnotatedElement {
    /// The class the element belongs to.
    pub fn class_name(&self) -> &str {
        match self {
            AnnotatedElement::Class { name } => name,
            AnnotatedElement::Field { owner, .. } | AnnotatedElement::Method { owner, .. } => owner,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AnnotationValue {
    /// A string literal; `span` covers the quotes.
    String { value: String, span: Span },
    Array { values: Vec<AnnotationValue> },
    /// `Foo.class`, with the internal name of `Foo`.
    ClassLiteral { name: String, span: Span },
    Bool { value: bool },
    Annotation { annotation: Box<AnnotationDecl> },
    /// Anything else (enum constants, numbers, expressions).
    Other { text: String },
}

impl AnnotationValue {
    /// The value itself, or each element of an array.
    pub fn elements(&self) -> Vec<&AnnotationValue> {
        match self {
            AnnotationValue::Array { values } => values.iter().collect(),
            other => vec![other],
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            AnnotationValue::String { value, .. } => Some(value),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnnotationDecl {
    /// Fully qualified dotted type name.
    pub type_name: String,
    /// Span of the whole annotation, `@` through the closing parenthesis.
    pub span: Span,
    /// Span between the parentheses; absent for marker annotations.
    #[serde(default)]
    pub args: Option<Span>,
    pub element: AnnotatedElement,
    #[serde(default)]
    pub attributes: BTreeMap<String, AnnotationValue>,
    /// Start of the annotated declaration, for diagnostics.
    #[serde(default)]
    pub anchor: u64,
}

impl AnnotationDecl {
    pub fn attribute(&self, name: &str) -> Option<&AnnotationValue> {
        self.attributes.get(name)
    }

    /// `remap = false` turns remapping off for the annotation.
    pub fn is_remapped(&self) -> bool {
        !matches!(
            self.attributes.get("remap"),
            Some(AnnotationValue::Bool { value: false })
        )
    }

    pub fn simple_name(&self) -> &str {
        self.type_name.rsplit('.').next().unwrap_or(&self.type_name)
    }
}
