//! Operation interception.

use crate::api_error::ApiError;

/// Observes the terminal result of each asynchronous dispatcher operation.
///
/// Injected at dispatcher construction (`Fs::with_hook`) rather than
/// installed as process-wide state, so two dispatchers can carry different
/// hooks. Tests use this as their observation channel for deferral and
/// per-operation accounting.
pub trait OpHook: Send + Sync {
    /// Called once per asynchronous operation, after the operation has
    /// produced its result and before that result is returned.
    fn on_complete(&self, op: &'static str, error: Option<&ApiError>);
}
