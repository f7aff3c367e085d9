//! # Interfaces
//!
//! An interface is declared once, as a struct generic over a `Backend`:
//!
//! ```
//! use rpcidl::{signature, Backend, Interface, InterfaceInfo, Param};
//! use rpcidl::{Arrow, Returning};
//!
//! struct Calculator<B: Backend> {
//!     add: B::Method<Arrow<i64, Arrow<i64, Returning<i64>>>>,
//! }
//!
//! impl<B: Backend> Calculator<B> {
//!     fn declare(backend: &mut B) -> Self {
//!         Self {
//!             add: backend.declare("add", "Adds two integers", signature!(
//!                 Param::<i64>::new("a", ""),
//!                 Param::<i64>::new("b", "")
//!                 => Param::<i64>::mk(None, None)
//!             )),
//!         }
//!     }
//! }
//!
//! let mut describer = Interface::new(InterfaceInfo::new("calculator"));
//! let calc = Calculator::declare(&mut describer);
//! assert_eq!(calc.add.params.len(), 2);
//! ```
//!
//! Declaring against a `Client` yields callable methods, against a
//! `ServerBuilder` yields registrations, and against an `Interface` yields
//! descriptions for code generators.

use rpctype::Rpc;
use rpctype::Type;
use rpctype::TypeDef;

use crate::error::InterfaceError;
use crate::error::InternalError;
use crate::param::ParamDescription;
use crate::signature::Signature;

/// Reinterprets method declarations.
pub trait Backend {
    /// What a declaration produces on this backend.
    type Method<S: Signature>;

    fn declare<S: Signature>(&mut self, name: &str, description: &str, signature: S) -> Self::Method<S>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InterfaceInfo {
    pub name: String,
    pub namespace: Option<String>,
    pub description: String,
    pub version: (u32, u32, u32),
}

impl InterfaceInfo {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            namespace: None,
            description: String::new(),
            version: (0, 1, 0),
        }
    }

    pub fn namespace(mut self, namespace: impl Into<String>) -> Self {
        self.namespace = Some(namespace.into());
        self
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn version(mut self, major: u32, minor: u32, patch: u32) -> Self {
        self.version = (major, minor, patch);
        self
    }

    /// The name a method is called by on the wire.
    pub fn wire_name(&self, method: &str) -> String {
        match &self.namespace {
            Some(ns) => format!("{}.{}", ns, method),
            None => method.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct MethodDescription {
    pub name: String,
    pub description: String,
    pub params: Vec<ParamDescription>,
    pub result: ParamDescription,
    pub errors: TypeDef,
}

/// The describing backend. Accumulates method descriptions in declaration
/// order.
#[derive(Debug, Clone)]
pub struct Interface {
    pub info: InterfaceInfo,
    pub errors: TypeDef,
    pub methods: Vec<MethodDescription>,
}

impl Interface {
    pub fn new(info: InterfaceInfo) -> Self {
        Self {
            info,
            errors: InternalError::typedef(),
            methods: Vec::new(),
        }
    }

    pub fn with_errors<E: InterfaceError>(mut self) -> Self {
        self.errors = E::typedef();
        for method in &mut self.methods {
            method.errors = self.errors.clone();
        }
        self
    }

    /// Describes a method without recording it.
    pub fn describe<S: Signature>(&self, name: &str, description: &str, signature: &S) -> MethodDescription {
        MethodDescription {
            name: name.to_string(),
            description: description.to_string(),
            params: signature.params(),
            result: signature.result(),
            errors: self.errors.clone(),
        }
    }

    pub fn method(&self, name: &str) -> Option<&MethodDescription> {
        self.methods.iter().find(|m| m.name == name)
    }

    /// Named struct and variant declarations reachable from this interface,
    /// first occurrence first.
    pub fn type_decls(&self) -> Vec<&TypeDef> {
        let mut decls = Vec::new();
        for method in &self.methods {
            for param in &method.params {
                collect_decls(&param.def, &mut decls);
            }
            collect_decls(&method.result.def, &mut decls);
        }
        collect_decls(&self.errors, &mut decls);
        decls
    }
}

fn collect_decls<'a>(def: &'a TypeDef, decls: &mut Vec<&'a TypeDef>) {
    def.visit(&mut |d: &'a TypeDef| {
        let named = matches!(d.ty, Type::Struct(_) | Type::Variant(_));
        if named && !decls.iter().any(|seen| seen.name == d.name) {
            decls.push(d);
        }
    });
}

impl Backend for Interface {
    type Method<S: Signature> = MethodDescription;

    fn declare<S: Signature>(&mut self, name: &str, description: &str, signature: S) -> MethodDescription {
        let method = self.describe(name, description, &signature);
        self.methods.push(method.clone());
        method
    }
}

/// A group of interfaces published together.
#[derive(Debug, Clone)]
pub struct Interfaces {
    pub name: String,
    pub title: String,
    pub description: String,
    pub interfaces: Vec<Interface>,
}

impl Interfaces {
    pub fn new(name: impl Into<String>, title: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            title: title.into(),
            description: description.into(),
            interfaces: Vec::new(),
        }
    }

    pub fn add(mut self, interface: Interface) -> Self {
        self.interfaces.push(interface);
        self
    }

    /// Type declarations across all interfaces, deduplicated by name.
    pub fn type_decls(&self) -> Vec<&TypeDef> {
        let mut decls: Vec<&TypeDef> = Vec::new();
        for decl in self.interfaces.iter().flat_map(Interface::type_decls) {
            if !decls.iter().any(|d| d.name == decl.name) {
                decls.push(decl);
            }
        }
        decls
    }
}
