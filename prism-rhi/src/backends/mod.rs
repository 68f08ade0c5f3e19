//! Backend binding: resolves a [`Backend`](crate::Backend) selection to a
//! plugin entry, either statically linked or loaded from a dynamic library
//! by conventional name.

pub mod null;

use crate::enums::Backend;
use crate::error::RhiResult;
use crate::rhi::BoundPlugin;

pub(crate) fn default_backend() -> Backend {
    if cfg!(all(target_os = "macos", not(feature = "vulkan"))) {
        Backend::Metal
    } else if cfg!(feature = "vulkan") {
        Backend::Vulkan
    } else {
        Backend::Null
    }
}

pub(crate) fn bind(backend: Backend) -> RhiResult<BoundPlugin> {
    match backend {
        #[cfg(feature = "vulkan")]
        Backend::Vulkan => Ok(BoundPlugin {
            entry: crate::vulkan::PLUGIN,
            #[cfg(feature = "dylib")]
            dynamic: None,
        }),
        Backend::Null => Ok(BoundPlugin {
            entry: null::PLUGIN,
            #[cfg(feature = "dylib")]
            dynamic: None,
        }),
        #[cfg(feature = "dylib")]
        other => {
            let plugin = crate::api::DynamicPlugin::load(other)?;
            Ok(BoundPlugin { entry: plugin.entry, dynamic: Some(plugin) })
        }
        #[cfg(not(feature = "dylib"))]
        other => {
            log::warn!("backend {other:?} is not linked into this build");
            Err(crate::error::RhiError::BackendUnavailable(other))
        }
    }
}
