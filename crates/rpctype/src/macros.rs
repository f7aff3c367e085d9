//! Derivation macros.
//!
//! `rpc_struct!` and `rpc_variant!` implement `Rpc` for an existing native
//! struct or enum from its shape alone: field and case names, their wire
//! names, and their documentation. The generated code only calls into
//! `record` at use time.
//!
//! ```
//! use rpctype::rpc_struct;
//!
//! #[derive(Debug, PartialEq)]
//! struct Point { x: i64, y: i64 }
//!
//! rpc_struct! {
//!     Point as "point", "A point on the plane" {
//!         x: i64 as "x", "Horizontal offset";
//!         y: i64 as "y", "Vertical offset";
//!     }
//! }
//! ```

/// Implements `Rpc` for a struct with named fields.
///
/// Each field is listed as `field: Type as "wire_name", "description";`.
/// The wire name may differ from the Rust field name.
#[macro_export]
macro_rules! rpc_struct {
    (
        $ty:ident as $name:literal, $desc:literal {
            $( $field:ident : $fty:ty as $wire:literal, $fdesc:literal );* $(;)?
        }
    ) => {
        impl $crate::Rpc for $ty {
            fn typedef() -> $crate::TypeDef {
                $crate::TypeDef::new($name, $desc, $crate::Type::Struct(vec![
                    $(
                        $crate::Field {
                            name: $wire.to_string(),
                            description: $fdesc.to_string(),
                            def: <$fty as $crate::Rpc>::typedef(),
                            owner: $name.to_string(),
                        }
                    ),*
                ]))
            }

            fn marshal(&self) -> $crate::Value {
                $crate::StructEncoder::new()
                    $( .field::<$fty>($wire, &self.$field) )*
                    .finish()
            }

            fn unmarshal(value: &$crate::Value) -> $crate::Result<Self> {
                let fields = $crate::StructDecoder::new($name, value)?;
                Ok($ty {
                    $( $field: fields.field::<$fty>($wire)? ),*
                })
            }
        }
    };
}

/// Implements `Rpc` for an enum whose cases carry at most one payload.
///
/// Each case is listed as `Case as "Wire", "description";` or
/// `Case(Payload) as "Wire", "description";`.
#[macro_export]
macro_rules! rpc_variant {
    (
        $ty:ident as $name:literal, $desc:literal {
            $( $case:ident $( ( $pty:ty ) )? as $wire:literal, $cdesc:literal );* $(;)?
        }
    ) => {
        impl $crate::Rpc for $ty {
            fn typedef() -> $crate::TypeDef {
                $crate::TypeDef::new($name, $desc, $crate::Type::Variant(vec![
                    $(
                        $crate::Tag {
                            name: $wire.to_string(),
                            description: $cdesc.to_string(),
                            payload: $crate::__rpc_payload_def!($($pty)?),
                        }
                    ),*
                ]))
            }

            fn marshal(&self) -> $crate::Value {
                match self {
                    $(
                        $crate::__rpc_case_pat!($ty, $case, payload $(, $pty)?) =>
                            $crate::__rpc_case_marshal!($wire, payload $(, $pty)?),
                    )*
                }
            }

            fn unmarshal(value: &$crate::Value) -> $crate::Result<Self> {
                let tag = $crate::VariantDecoder::new($name, value)?;
                $(
                    if tag.is($wire) {
                        return Ok($crate::__rpc_case_unmarshal!($ty, $case, tag $(, $pty)?));
                    }
                )*
                Err(tag.unknown())
            }
        }
    };
}

#[doc(hidden)]
#[macro_export]
macro_rules! __rpc_payload_def {
    () => { None };
    ($pty:ty) => { Some(<$pty as $crate::Rpc>::typedef()) };
}

#[doc(hidden)]
#[macro_export]
macro_rules! __rpc_case_pat {
    ($ty:ident, $case:ident, $bind:ident) => { $ty::$case };
    ($ty:ident, $case:ident, $bind:ident, $pty:ty) => { $ty::$case($bind) };
}

#[doc(hidden)]
#[macro_export]
macro_rules! __rpc_case_marshal {
    ($wire:literal, $bind:ident) => {
        $crate::variant_value($wire, None)
    };
    ($wire:literal, $bind:ident, $pty:ty) => {
        $crate::variant_value($wire, Some(<$pty as $crate::Rpc>::marshal($bind)))
    };
}

#[doc(hidden)]
#[macro_export]
macro_rules! __rpc_case_unmarshal {
    ($ty:ident, $case:ident, $dec:ident) => {{
        $dec.unit()?;
        $ty::$case
    }};
    ($ty:ident, $case:ident, $dec:ident, $pty:ty) => {
        $ty::$case($dec.payload::<$pty>()?)
    };
}
