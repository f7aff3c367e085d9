//! # Parameters
//!
//! A `Param<T>` is a named, documented slot of native type `T`: an argument
//! of a method, or its result.

use std::marker::PhantomData;

use rpctype::Rpc;
use rpctype::TypeDef;
use rpctype::Value;

use crate::error::DispatchError;

pub struct Param<T> {
    pub name: String,
    pub description: String,
    pub def: TypeDef,
    _marker: PhantomData<fn() -> T>,
}

impl<T: Rpc> Param<T> {
    pub fn new(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            def: T::typedef(),
            _marker: PhantomData,
        }
    }

    /// Like `new`, but name and description default to the type's own.
    pub fn mk(name: Option<&str>, description: Option<&str>) -> Self {
        let def = T::typedef();
        Self {
            name: name.unwrap_or(&def.name).to_string(),
            description: description.unwrap_or(&def.description).to_string(),
            def,
            _marker: PhantomData,
        }
    }

    pub fn describe(&self) -> ParamDescription {
        ParamDescription {
            name: self.name.clone(),
            description: self.description.clone(),
            def: self.def.clone(),
        }
    }

    /// Reads this parameter from named arguments. Names match exactly and the
    /// first match wins.
    pub(crate) fn extract(&self, args: &[(String, Value)]) -> Result<T, DispatchError> {
        match args.iter().find(|(name, _)| *name == self.name) {
            Some((_, value)) => T::unmarshal(value).map_err(|source| DispatchError::InvalidArgument {
                name: self.name.clone(),
                source,
            }),
            None => T::absent().ok_or_else(|| DispatchError::MissingArgument(self.name.clone())),
        }
    }
}

impl<T> Clone for Param<T> {
    fn clone(&self) -> Self {
        Self {
            name: self.name.clone(),
            description: self.description.clone(),
            def: self.def.clone(),
            _marker: PhantomData,
        }
    }
}

impl<T> std::fmt::Debug for Param<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Param")
            .field("name", &self.name)
            .field("description", &self.description)
            .field("def", &self.def)
            .finish()
    }
}

/// The untyped, introspectable form of a `Param`.
#[derive(Debug, Clone, PartialEq)]
pub struct ParamDescription {
    pub name: String,
    pub description: String,
    pub def: TypeDef,
}
