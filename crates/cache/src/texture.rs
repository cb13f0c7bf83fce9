//! GPU texture handle
//!
//! Stores an opaque reference to a GPU-resident texture with its pixel
//! dimensions. Uses a trait object so different GPU backends (Metal,
//! Vulkan, test mocks) can be stored behind the same type.

use std::any::Any;
use std::sync::Arc;

/// Handle to a GPU-resident texture.
///
/// The underlying resource is released when the last handle clone is
/// dropped; destroying a cache entry therefore releases the GPU resource
/// unless a draw in progress still holds a clone.
#[derive(Clone)]
pub struct GpuTexture {
    handle: Arc<dyn Any + Send + Sync>,
    width: u32,
    height: u32,
}

impl GpuTexture {
    /// Wrap a platform-specific texture handle.
    pub fn new<T: Any + Send + Sync>(handle: T, width: u32, height: u32) -> Self {
        Self { handle: Arc::new(handle), width, height }
    }

    /// Width of the texture in physical pixels.
    pub fn width(&self) -> u32 {
        self.width
    }

    /// Height of the texture in physical pixels.
    pub fn height(&self) -> u32 {
        self.height
    }

    /// Downcast to the backend's concrete handle type.
    ///
    /// Returns `None` if the type doesn't match.
    pub fn handle_ref<T: Any>(&self) -> Option<&T> {
        self.handle.downcast_ref::<T>()
    }
}

impl std::fmt::Debug for GpuTexture {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GpuTexture")
            .field("width", &self.width)
            .field("height", &self.height)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, PartialEq)]
    struct MockHandle {
        id: u32,
    }

    #[test]
    fn test_downcast_to_original_type() {
        let texture = GpuTexture::new(MockHandle { id: 7 }, 640, 480);

        assert_eq!(texture.width(), 640);
        assert_eq!(texture.height(), 480);
        assert_eq!(texture.handle_ref::<MockHandle>().map(|h| h.id), Some(7));
        assert!(texture.handle_ref::<String>().is_none());
    }

    #[test]
    fn test_clone_shares_underlying_resource() {
        let counter = Arc::new(());
        let texture = GpuTexture::new(Arc::clone(&counter), 8, 8);
        let clone = texture.clone();

        assert_eq!(Arc::strong_count(&counter), 2);
        drop(texture);
        assert_eq!(Arc::strong_count(&counter), 2);
        drop(clone);
        assert_eq!(Arc::strong_count(&counter), 1);
    }
}
