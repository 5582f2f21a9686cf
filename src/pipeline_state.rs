//! Pipeline state objects and the handles callers hold
//!
//! A [`PipelineState`] is immutable once built. Its reference count is the
//! number of live [`PipelineStateHandle`]s (plus zero-count residency in a
//! deferred-eviction cache). The count is only changed while the owning
//! cache's lock is held, which is what keeps a decrement to zero from racing
//! a concurrent lookup that would revive the same entry.

use std::fmt;
use std::ops::Deref;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::Arc;
use smallvec::SmallVec;

use crate::cache::CacheShared;
use crate::description::PipelineStateDescription;
use crate::error::{PipelineStateError, Result};
use crate::hashed::HashedDescription;
use crate::input_layout::{self, VertexBufferLayout};
use crate::native::{NativePipelineHandle, PipelineFactory};

/// A constructed pipeline state shared by every caller that asked for an
/// equal description
pub struct PipelineState {
    description: Arc<PipelineStateDescription>,
    key_hash: u64,
    native: NativePipelineHandle,
    input_binding_count: u32,
    vertex_buffers: SmallVec<[VertexBufferLayout; 4]>,
    references: AtomicU32,
    destroyed: AtomicBool,
}

impl PipelineState {
    /// Wraps a freshly built native object; the count starts at 1
    pub(crate) fn new(key: &HashedDescription, native: NativePipelineHandle) -> Self {
        let description = key.description().clone();
        let elements = description.input_elements.as_deref().unwrap_or(&[]);

        Self {
            input_binding_count: input_layout::input_binding_count(elements),
            vertex_buffers: input_layout::vertex_buffer_layouts(elements),
            key_hash: key.hash_value(),
            native,
            description,
            references: AtomicU32::new(1),
            destroyed: AtomicBool::new(false),
        }
    }

    /// Number of vertex buffer slots the input layout uses
    pub fn input_binding_count(&self) -> u32 {
        self.input_binding_count
    }

    pub fn vertex_buffers(&self) -> &[VertexBufferLayout] {
        &self.vertex_buffers
    }

    pub fn native_handle(&self) -> NativePipelineHandle {
        self.native
    }

    /// The cache's own copy of the description this state was built from
    pub fn description(&self) -> &PipelineStateDescription {
        &self.description
    }

    pub fn reference_count(&self) -> u32 {
        self.references.load(Ordering::Acquire)
    }

    pub fn is_destroyed(&self) -> bool {
        self.destroyed.load(Ordering::Acquire)
    }

    pub(crate) fn key(&self) -> HashedDescription {
        HashedDescription::from_parts(self.description.clone(), self.key_hash)
    }

    /// Returns the new count. Caller holds the cache lock.
    pub(crate) fn add_reference(&self) -> u32 {
        self.references.fetch_add(1, Ordering::AcqRel) + 1
    }

    /// Returns the new count. Caller holds the cache lock.
    ///
    /// A count already at zero is a lifecycle bug in the caller: it panics in
    /// debug builds and is reported as an error otherwise. The count is left
    /// at zero either way.
    pub(crate) fn release_reference(&self) -> Result<u32> {
        let current = self.references.load(Ordering::Acquire);
        if current == 0 {
            log::error!(
                "Pipeline state {} (hash: {:x}) released more times than acquired",
                self.native.raw(),
                self.key_hash
            );
            debug_assert!(current > 0, "pipeline state released more times than acquired");
            return Err(PipelineStateError::ReleaseUnderflow { count: current });
        }
        self.references.store(current - 1, Ordering::Release);
        Ok(current - 1)
    }

    /// Destroys the native object; only the first call reaches the factory
    pub(crate) fn destroy(&self, factory: &dyn PipelineFactory) -> bool {
        if self.destroyed.swap(true, Ordering::AcqRel) {
            return false;
        }
        log::info!(
            "Destroying pipeline state {} (hash: {:x})",
            self.native.raw(),
            self.key_hash
        );
        factory.destroy(self.native);
        true
    }
}

impl fmt::Debug for PipelineState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PipelineState")
            .field("native", &self.native)
            .field("hash", &format_args!("{:x}", self.key_hash))
            .field("input_binding_count", &self.input_binding_count)
            .field("references", &self.reference_count())
            .field("destroyed", &self.is_destroyed())
            .finish()
    }
}

impl Drop for PipelineState {
    fn drop(&mut self) {
        if !*self.destroyed.get_mut() {
            log::warn!(
                "Pipeline state {} dropped without destroying its native object",
                self.native.raw()
            );
        }
    }
}

/// A counted reference to a cached [`PipelineState`]
///
/// Cloning adds a reference, dropping releases one. [`release`] does the same
/// as drop but reports the remaining count.
///
/// [`release`]: PipelineStateHandle::release
pub struct PipelineStateHandle {
    state: Arc<PipelineState>,
    cache: Arc<CacheShared>,
    released: bool,
}

impl PipelineStateHandle {
    /// Takes over a reference the cache has already counted
    pub(crate) fn new(state: Arc<PipelineState>, cache: Arc<CacheShared>) -> Self {
        Self {
            state,
            cache,
            released: false,
        }
    }

    /// Release this reference and return the remaining count
    pub fn release(mut self) -> Result<u32> {
        self.released = true;
        self.cache.release(&self.state)
    }

    /// Whether two handles refer to the same object
    pub fn ptr_eq(a: &Self, b: &Self) -> bool {
        Arc::ptr_eq(&a.state, &b.state)
    }
}

impl Deref for PipelineStateHandle {
    type Target = PipelineState;

    fn deref(&self) -> &PipelineState {
        &self.state
    }
}

impl Clone for PipelineStateHandle {
    fn clone(&self) -> Self {
        self.cache.add_reference(&self.state);
        Self::new(self.state.clone(), self.cache.clone())
    }
}

impl fmt::Debug for PipelineStateHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("PipelineStateHandle").field(&*self.state).finish()
    }
}

impl Drop for PipelineStateHandle {
    fn drop(&mut self) {
        if self.released {
            return;
        }
        if let Err(e) = self.cache.release(&self.state) {
            log::error!("Failed to release pipeline state: {}", e);
        }
    }
}
