//! # Type Descriptors
//!
//! A `TypeDef` is a static description of a native type's shape, paired with a
//! name and free-text description for documentation and code generation.
//!
//! ## Invariants
//!
//! - Descriptors are immutable once built and may be cloned freely.
//! - Child order (fields, tags) is significant: it fixes marshalling order.
//! - Descriptor graphs are acyclic. Recursive types refer to themselves with
//!   `Type::Ref`, never by embedding their own definition.

use std::fmt;

/// The primitive kinds a `Type::Basic` can carry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BasicKind {
    Int64,
    Int32,
    Int,
    String,
    Float,
    Bool,
    Char,
}

impl BasicKind {
    pub fn name(self) -> &'static str {
        match self {
            BasicKind::Int64 => "int64",
            BasicKind::Int32 => "int32",
            BasicKind::Int => "int",
            BasicKind::String => "string",
            BasicKind::Float => "float",
            BasicKind::Bool => "bool",
            BasicKind::Char => "char",
        }
    }
}

/// The shape of a value.
#[derive(Debug, Clone, PartialEq)]
pub enum Type {
    Basic(BasicKind),
    DateTime,
    Struct(Vec<Field>),
    Variant(Vec<Tag>),
    Array(Box<TypeDef>),
    /// Identical to `Array` on the wire; differs only in native mapping.
    List(Box<TypeDef>),
    Dict(BasicKind, Box<TypeDef>),
    Option(Box<TypeDef>),
    Tuple(Box<TypeDef>, Box<TypeDef>),
    Unit,
    /// A reference to a named declaration, used to close recursive types.
    Ref(String),
}

impl Type {
    /// A short name for the outermost shape.
    pub fn shape(&self) -> &'static str {
        match self {
            Type::Basic(kind) => kind.name(),
            Type::DateTime => "datetime",
            Type::Struct(_) => "struct",
            Type::Variant(_) => "variant",
            Type::Array(_) => "array",
            Type::List(_) => "list",
            Type::Dict(..) => "dict",
            Type::Option(_) => "option",
            Type::Tuple(..) => "tuple",
            Type::Unit => "unit",
            Type::Ref(_) => "ref",
        }
    }
}

impl fmt::Display for Type {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Type::Basic(kind) => write!(f, "{}", kind.name()),
            Type::DateTime => write!(f, "datetime"),
            Type::Struct(fields) => {
                write!(f, "{{ ")?;
                for field in fields {
                    write!(f, "{}: {}; ", field.name, field.def.ty)?;
                }
                write!(f, "}}")
            }
            Type::Variant(tags) => {
                for (i, tag) in tags.iter().enumerate() {
                    if i > 0 {
                        write!(f, " | ")?;
                    }
                    match &tag.payload {
                        Some(def) => write!(f, "{} of {}", tag.name, def.ty)?,
                        None => write!(f, "{}", tag.name)?,
                    }
                }
                Ok(())
            }
            Type::Array(def) => write!(f, "{} array", def.ty),
            Type::List(def) => write!(f, "{} list", def.ty),
            Type::Dict(key, def) => write!(f, "({}, {}) dict", key.name(), def.ty),
            Type::Option(def) => write!(f, "{} option", def.ty),
            Type::Tuple(a, b) => write!(f, "({} * {})", a.ty, b.ty),
            Type::Unit => write!(f, "unit"),
            Type::Ref(name) => write!(f, "{}", name),
        }
    }
}

/// A named, documented descriptor.
#[derive(Debug, Clone, PartialEq)]
pub struct TypeDef {
    pub name: String,
    pub description: String,
    pub ty: Type,
}

impl TypeDef {
    pub fn new(name: impl Into<String>, description: impl Into<String>, ty: Type) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            ty,
        }
    }

    /// Replaces the name, keeping shape and description.
    pub fn rename(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Replaces the description, keeping shape and name.
    pub fn describe(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// Direct child descriptors, in marshalling order.
    pub fn children(&self) -> Vec<&TypeDef> {
        match &self.ty {
            Type::Struct(fields) => fields.iter().map(|f| &f.def).collect(),
            Type::Variant(tags) => tags.iter().filter_map(|t| t.payload.as_ref()).collect(),
            Type::Array(def) | Type::List(def) | Type::Option(def) | Type::Dict(_, def) => vec![def],
            Type::Tuple(a, b) => vec![a, b],
            Type::Basic(_) | Type::DateTime | Type::Unit | Type::Ref(_) => Vec::new(),
        }
    }

    /// Walks this descriptor and all of its descendants, parents first.
    pub fn visit<'a>(&'a self, f: &mut impl FnMut(&'a TypeDef)) {
        f(self);
        for child in self.children() {
            child.visit(f);
        }
    }
}

/// A named member of a `Type::Struct`.
#[derive(Debug, Clone, PartialEq)]
pub struct Field {
    pub name: String,
    pub description: String,
    pub def: TypeDef,
    /// Name of the struct this field belongs to.
    pub owner: String,
}

/// A case of a `Type::Variant`. `payload` is `None` for unit cases.
#[derive(Debug, Clone, PartialEq)]
pub struct Tag {
    pub name: String,
    pub description: String,
    pub payload: Option<TypeDef>,
}
