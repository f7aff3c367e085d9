//! # Method Signatures
//!
//! A signature is built right to left as a typed chain:
//!
//! ```text
//! Arrow<A, Arrow<B, Returning<R>>>   ~   fn(A, B) -> R
//! ```
//!
//! Its arguments travel as a nested tuple `(A, (B, ()))`. `IntoArgs` lets
//! callers pass the flat tuple `(a, b)` instead, and `Handler` lets servers
//! install a plain `Fn(A, B) -> Result<R, E>`.
//!
//! Use `signature!` to build a chain:
//!
//! ```
//! use rpcidl::{signature, Param};
//!
//! let add = signature!(
//!     Param::<i64>::new("a", "First addend"),
//!     Param::<i64>::new("b", "Second addend")
//!     => Param::<i64>::new("sum", "a + b")
//! );
//! assert_eq!(rpcidl::Signature::params(&add).len(), 2);
//! ```

use rpctype::Rpc;
use rpctype::Value;

use crate::error::DispatchError;
use crate::param::Param;
use crate::param::ParamDescription;

/// The end of a signature chain: the result parameter.
#[derive(Debug, Clone)]
pub struct Returning<R> {
    pub result: Param<R>,
}

impl<R> Returning<R> {
    pub fn new(result: Param<R>) -> Self {
        Self { result }
    }
}

/// One argument followed by the rest of the chain.
#[derive(Debug, Clone)]
pub struct Arrow<A, S> {
    pub param: Param<A>,
    pub rest: S,
}

impl<A, S> Arrow<A, S> {
    pub fn new(param: Param<A>, rest: S) -> Self {
        Self { param, rest }
    }
}

pub trait Signature: Send + Sync + 'static {
    /// Arguments as a nested tuple, `()` terminated.
    type Args;
    type Ret: Rpc;

    fn collect_params(&self, out: &mut Vec<ParamDescription>);

    fn result(&self) -> ParamDescription;

    /// Marshals each argument under its parameter name, in order.
    fn marshal_args(&self, args: &Self::Args, out: &mut Vec<(String, Value)>);

    fn unmarshal_args(&self, args: &[(String, Value)]) -> Result<Self::Args, DispatchError>;

    fn params(&self) -> Vec<ParamDescription> {
        let mut out = Vec::new();
        self.collect_params(&mut out);
        out
    }
}

impl<R: Rpc + 'static> Signature for Returning<R> {
    type Args = ();
    type Ret = R;

    fn collect_params(&self, _out: &mut Vec<ParamDescription>) {}

    fn result(&self) -> ParamDescription {
        self.result.describe()
    }

    fn marshal_args(&self, _args: &(), _out: &mut Vec<(String, Value)>) {}

    fn unmarshal_args(&self, _args: &[(String, Value)]) -> Result<(), DispatchError> {
        Ok(())
    }
}

impl<A: Rpc + 'static, S: Signature> Signature for Arrow<A, S> {
    type Args = (A, S::Args);
    type Ret = S::Ret;

    fn collect_params(&self, out: &mut Vec<ParamDescription>) {
        out.push(self.param.describe());
        self.rest.collect_params(out);
    }

    fn result(&self) -> ParamDescription {
        self.rest.result()
    }

    fn marshal_args(&self, args: &Self::Args, out: &mut Vec<(String, Value)>) {
        out.push((self.param.name.clone(), args.0.marshal()));
        self.rest.marshal_args(&args.1, out);
    }

    fn unmarshal_args(&self, args: &[(String, Value)]) -> Result<Self::Args, DispatchError> {
        let head = self.param.extract(args)?;
        Ok((head, self.rest.unmarshal_args(args)?))
    }
}

// ============================================================================
//  ARITY ADAPTERS
// ============================================================================

/// Converts a flat argument tuple into a signature's nested form.
pub trait IntoArgs<Nested> {
    fn into_args(self) -> Nested;
}

/// A native implementation of a method with nested arguments `Args`.
pub trait Handler<Args, R, E>: Send + Sync + 'static {
    fn invoke(&self, args: Args) -> Result<R, E>;
}

macro_rules! arity {
    (@nest) => { () };
    (@nest $head:ident $(, $tail:ident)*) => { ($head, arity!(@nest $($tail),*)) };

    ($($t:ident),*) => {
        impl<$($t,)*> IntoArgs<arity!(@nest $($t),*)> for ($($t,)*) {
            #[allow(non_snake_case)]
            fn into_args(self) -> arity!(@nest $($t),*) {
                let ($($t,)*) = self;
                arity!(@nest $($t),*)
            }
        }

        impl<Func, Res, Err, $($t,)*> Handler<arity!(@nest $($t),*), Res, Err> for Func
        where
            Func: Fn($($t),*) -> Result<Res, Err> + Send + Sync + 'static,
        {
            #[allow(non_snake_case)]
            fn invoke(&self, args: arity!(@nest $($t),*)) -> Result<Res, Err> {
                let arity!(@nest $($t),*) = args;
                self($($t),*)
            }
        }
    };
}

arity!();
arity!(T1);
arity!(T1, T2);
arity!(T1, T2, T3);
arity!(T1, T2, T3, T4);
arity!(T1, T2, T3, T4, T5);
arity!(T1, T2, T3, T4, T5, T6);
arity!(T1, T2, T3, T4, T5, T6, T7);
arity!(T1, T2, T3, T4, T5, T6, T7, T8);

/// Builds a signature chain from parameters: `signature!(a, b => result)`.
#[macro_export]
macro_rules! signature {
    ($($param:expr),* => $result:expr) => {
        $crate::__signature!(@nest [$($param),*] $result)
    };
}

#[doc(hidden)]
#[macro_export]
macro_rules! __signature {
    (@nest [] $result:expr) => {
        $crate::Returning::new($result)
    };
    (@nest [$head:expr $(, $tail:expr)*] $result:expr) => {
        $crate::Arrow::new($head, $crate::__signature!(@nest [$($tail),*] $result))
    };
}
