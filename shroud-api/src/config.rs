//! 全局环境（供 CLI 和脚本宿主使用）
//!
//! 库用户应该显式传递 [`Environment`]；这里只是一个可选的进程级单例。

use crate::error::ShroudError;
use once_cell::sync::OnceCell;
use shroud_core::{Environment, Request, Value};

static AMBIENT: OnceCell<Environment> = OnceCell::new();

/// Install the process-wide environment
///
/// Fails with [`ShroudError::AlreadyInitialized`] on the second call; the
/// first environment stays in place.
pub fn init(env: Environment) -> Result<(), ShroudError> {
    AMBIENT.set(env).map_err(|_| ShroudError::AlreadyInitialized)?;
    tracing::debug!("ambient environment installed");
    Ok(())
}

/// Get the ambient environment, if one was installed
pub fn ambient() -> Option<&'static Environment> {
    AMBIENT.get()
}

/// Check if the ambient environment is initialized
pub fn is_initialized() -> bool {
    AMBIENT.get().is_some()
}

/// Require a unit from the ambient environment
pub fn require(request: impl Into<Request>) -> Result<Value, ShroudError> {
    let env = AMBIENT.get().ok_or(ShroudError::NotInitialized)?;
    Ok(env.require(request)?)
}
