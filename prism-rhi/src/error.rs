//! Error taxonomy shared by the frontend and every backend.

use crate::handle::ObjectKind;
use crate::Backend;

pub type RhiResult<T> = Result<T, RhiError>;

/// Every recoverable failure the RHI can report. Invariant violations
/// (out-of-range handles, reentrant init, missing required plugin entries)
/// do not take this path; they go through [`fatal`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RhiError {
    #[error("RHI has not been initialized")]
    NotInitialized,

    #[error("RHI is already initialized")]
    AlreadyInitialized,

    #[error("backend {0:?} is unavailable")]
    BackendUnavailable(Backend),

    #[error("feature {0} is not supported by the adapter or backend")]
    FeatureUnsupported(&'static str),

    #[error("invalid descriptor field {field}: {reason}")]
    DescriptorInvalid { field: &'static str, reason: &'static str },

    #[error("out of {0} memory")]
    OutOfMemory(MemoryDomain),

    #[error("invalid {0:?} handle")]
    HandleInvalid(ObjectKind),

    #[error("{0:?} object is in an invalid state")]
    ObjectInInvalidState(ObjectKind),

    #[error("swapchain is suboptimal for the surface")]
    SwapchainSuboptimal,

    #[error("swapchain is out of date and must be rebuilt")]
    SwapchainOutOfDate,

    #[error("fence wait timed out")]
    Timeout,

    #[error("{op} is not implemented by the {backend:?} backend")]
    NotImplemented { op: &'static str, backend: Backend },

    #[error("{format:?} is not supported by this backend")]
    FormatUnsupported { format: crate::TextureFormat },

    #[error("backend error {code}: {message}")]
    BackendError { code: i32, message: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MemoryDomain {
    Host,
    Device,
}

impl std::fmt::Display for MemoryDomain {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MemoryDomain::Host => write!(f, "host"),
            MemoryDomain::Device => write!(f, "device"),
        }
    }
}

/// Abort the process over a broken invariant. The log line carries the
/// location and the offending object so postmortems do not need a debugger.
#[doc(hidden)]
pub fn fatal_abort(file: &str, line: u32, message: std::fmt::Arguments<'_>) -> ! {
    log::error!("fatal RHI invariant violation at {file}:{line}: {message}");
    std::process::abort();
}

/// Invariant violations are not user inputs; they terminate the process.
macro_rules! fatal {
    ($($arg:tt)*) => {
        $crate::error::fatal_abort(file!(), line!(), format_args!($($arg)*))
    };
}
pub(crate) use fatal;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handle::ObjectKind;

    #[test]
    fn error_messages_name_the_object() {
        let err = RhiError::HandleInvalid(ObjectKind::Buffer);
        assert_eq!(err.to_string(), "invalid Buffer handle");

        let err = RhiError::NotImplemented { op: "create_raytracing_pipeline", backend: Backend::Vulkan };
        assert!(err.to_string().contains("create_raytracing_pipeline"));

        let err = RhiError::OutOfMemory(MemoryDomain::Device);
        assert_eq!(err.to_string(), "out of device memory");
    }
}
