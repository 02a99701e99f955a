//! The invocation seam: one tool, bound JSON arguments in, JSON out.

use crate::error::ToolFailure;
use async_trait::async_trait;
use serde_json::Value;

/// Arguments bound against a tool's signature, keyed by parameter name.
pub type Args = serde_json::Map<String, Value>;

/// A loaded tool's primary callable.
///
/// Implementations may block on their own I/O; the engine awaits each
/// call to completion and provides no cancellation.
#[async_trait]
pub trait Callable: Send + Sync {
    /// Execute the tool. Arguments have already been checked against
    /// the signature and have defaults filled in.
    async fn call(&self, args: Args) -> Result<Value, ToolFailure>;
}

/// [`Callable`] backed by a synchronous closure.
pub struct FnCallable<F> {
    f: F,
}

#[async_trait]
impl<F> Callable for FnCallable<F>
where
    F: Fn(&Args) -> Result<Value, ToolFailure> + Send + Sync,
{
    async fn call(&self, args: Args) -> Result<Value, ToolFailure> {
        (self.f)(&args)
    }
}

/// Create a callable from a closure.
///
/// # Example
///
/// ```
/// use serde_json::json;
/// use toolsmith_types::{Callable, ToolFailure, callable_fn};
///
/// let double = callable_fn(|args| {
///     let v = args["value"].as_i64().ok_or_else(|| ToolFailure::type_error("value must be an integer"))?;
///     Ok(json!(v * 2))
/// });
/// # let _ = double;
/// ```
#[must_use]
pub fn callable_fn<F>(f: F) -> FnCallable<F>
where
    F: Fn(&Args) -> Result<Value, ToolFailure> + Send + Sync,
{
    FnCallable { f }
}
