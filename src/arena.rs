//! Allocation backends for the queue's structural nodes.
//!
//! Handle nodes, bags, and slot nodes are reachable through raw pointers
//! published across threads, and merged-away nodes stay linked into other
//! queues' pending-merge lists for as long as anyone might still walk them.
//! Rather than tracking reachability, the queue delegates reclamation to an
//! arena: structural memory is released in bulk when the arena says so, and
//! never before.
//!
//! Two backends are provided:
//!
//! - [`GlobalArena`]: allocates from the global allocator and never frees.
//!   Structural nodes are small and per-queue (one handle node plus `width`
//!   slots per queue), so the deferred destruction is bounded by the number
//!   of queues created.
//! - [`BumpArena`]: a chunked bump allocator that releases all of its
//!   chunks when dropped. The caller must keep the arena alive for at
//!   least as long as every queue carved out of it, including queues it
//!   has been merged with; sharing one arena per merge group via
//!   [`Arc`](std::sync::Arc) is the intended pattern.

use std::alloc::{alloc, dealloc, handle_alloc_error, Layout};
use std::ptr::NonNull;
use std::sync::Mutex;

/// Allocation contract for structural nodes.
///
/// # Safety
///
/// Implementors must return pointers that are non-null, properly aligned
/// for the requested layout, exclusive (never handed out twice), and valid
/// for reads and writes until the arena itself is destroyed. Allocation
/// failure is fatal and must not return.
pub unsafe trait NodeArena {
    /// Allocates `layout.size()` bytes with `layout.align()` alignment.
    fn alloc_bytes(&self, layout: Layout) -> NonNull<u8>;

    /// Allocates and constructs a `T` in place.
    fn alloc<T>(&self, value: T) -> NonNull<T> {
        let ptr = self.alloc_bytes(Layout::new::<T>()).cast::<T>();
        unsafe { ptr.as_ptr().write(value) };
        ptr
    }
}

/// Arena that defers destruction forever: allocations come straight from
/// the global allocator and are intentionally never released.
#[derive(Debug, Default, Clone, Copy)]
pub struct GlobalArena;

unsafe impl NodeArena for GlobalArena {
    fn alloc_bytes(&self, layout: Layout) -> NonNull<u8> {
        debug_assert!(layout.size() > 0);
        let ptr = unsafe { alloc(layout) };
        match NonNull::new(ptr) {
            Some(ptr) => ptr,
            None => handle_alloc_error(layout),
        }
    }
}

/// Chunked bump arena. All chunks are released when the arena is dropped;
/// destructors of the values constructed inside are never run.
#[derive(Debug)]
pub struct BumpArena {
    chunk_size: usize,
    state: Mutex<BumpState>,
}

#[derive(Debug)]
struct BumpState {
    chunks: Vec<(NonNull<u8>, Layout)>,
    cursor: usize,
    end: usize,
}

unsafe impl Send for BumpState {}

impl BumpArena {
    /// Creates an arena that requests memory from the global allocator in
    /// chunks of `chunk_size` bytes (oversized allocations get a dedicated
    /// chunk).
    pub fn new(chunk_size: usize) -> Self {
        assert!(chunk_size > 0, "arena chunk size must be at least 1 byte");
        BumpArena {
            chunk_size,
            state: Mutex::new(BumpState {
                chunks: Vec::new(),
                cursor: 0,
                end: 0,
            }),
        }
    }

    fn grow(state: &mut BumpState, chunk_size: usize, layout: Layout) {
        let size = chunk_size.max(layout.size() + layout.align());
        let chunk_layout = Layout::from_size_align(size, layout.align().max(16))
            .expect("arena chunk layout overflow");
        let ptr = unsafe { alloc(chunk_layout) };
        let ptr = match NonNull::new(ptr) {
            Some(ptr) => ptr,
            None => handle_alloc_error(chunk_layout),
        };
        state.cursor = ptr.as_ptr() as usize;
        state.end = state.cursor + size;
        state.chunks.push((ptr, chunk_layout));
    }
}

unsafe impl NodeArena for BumpArena {
    fn alloc_bytes(&self, layout: Layout) -> NonNull<u8> {
        debug_assert!(layout.size() > 0);
        let mut state = self.state.lock().expect("arena mutex poisoned");
        let aligned = state
            .cursor
            .checked_add(layout.align() - 1)
            .expect("arena cursor overflow")
            & !(layout.align() - 1);
        if aligned + layout.size() > state.end {
            Self::grow(&mut state, self.chunk_size, layout);
            let aligned = (state.cursor + layout.align() - 1) & !(layout.align() - 1);
            state.cursor = aligned + layout.size();
            // fresh chunks are sized to fit the request
            debug_assert!(state.cursor <= state.end);
            return unsafe { NonNull::new_unchecked(aligned as *mut u8) };
        }
        state.cursor = aligned + layout.size();
        unsafe { NonNull::new_unchecked(aligned as *mut u8) }
    }
}

impl Drop for BumpArena {
    fn drop(&mut self) {
        let state = self.state.get_mut().expect("arena mutex poisoned");
        for (ptr, layout) in state.chunks.drain(..) {
            unsafe { dealloc(ptr.as_ptr(), layout) };
        }
    }
}

#[cfg(all(test, not(loom)))]
mod tests {
    use super::*;

    #[test]
    fn global_arena_allocates_typed_values() {
        let arena = GlobalArena;
        let a = arena.alloc(41u64);
        let b = arena.alloc([0u8; 3]);
        unsafe {
            assert_eq!(*a.as_ptr(), 41);
            assert_eq!(*b.as_ptr(), [0, 0, 0]);
        }
    }

    #[test]
    fn bump_arena_respects_alignment() {
        let arena = BumpArena::new(64);
        for _ in 0..100 {
            let p = arena.alloc_bytes(Layout::from_size_align(24, 8).unwrap());
            assert_eq!(p.as_ptr() as usize % 8, 0);
        }
    }

    #[test]
    fn bump_arena_handles_oversized_requests() {
        let arena = BumpArena::new(16);
        let layout = Layout::from_size_align(4096, 64).unwrap();
        let p = arena.alloc_bytes(layout);
        assert_eq!(p.as_ptr() as usize % 64, 0);
        unsafe { p.as_ptr().write_bytes(0xAB, 4096) };
    }
}
