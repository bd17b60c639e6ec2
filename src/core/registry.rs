// Handle registry: issues handles, owns live stacks, resolves handles to stacks.
use std::fmt;

use crate::core::error::{Error, ErrorKind};
use crate::core::stack::Stack;

/// Opaque stack identifier. Only meaningful while its stack is live.
#[repr(transparent)]
#[derive(Clone, Copy, Debug, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct Handle(i32);

impl Handle {
    pub const fn from_raw(raw: i32) -> Self {
        Self(raw)
    }

    pub const fn raw(self) -> i32 {
        self.0
    }
}

impl fmt::Display for Handle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct RegistryOptions {
    /// Highest handle value `create` will issue.
    pub max_handle: i32,
}

impl RegistryOptions {
    pub const fn new() -> Self {
        Self {
            max_handle: i32::MAX,
        }
    }

    pub const fn with_max_handle(mut self, max_handle: i32) -> Self {
        self.max_handle = max_handle;
        self
    }
}

impl Default for RegistryOptions {
    fn default() -> Self {
        Self::new()
    }
}

/// Sole owner of every live stack.
///
/// Stacks are kept in creation order. Handles only ever grow, so that order is
/// also handle order and lookups can binary search. Destroyed handles are never
/// issued again; once `max_handle` has been handed out `create` fails with
/// [`ErrorKind::Exhausted`] instead of wrapping.
#[derive(Debug)]
pub struct Registry {
    options: RegistryOptions,
    stacks: Vec<Stack>,
    next_handle: Option<i32>,
}

impl Registry {
    pub const fn new() -> Self {
        Self::with_options(RegistryOptions::new())
    }

    pub const fn with_options(options: RegistryOptions) -> Self {
        let next_handle = if options.max_handle >= 0 { Some(0) } else { None };
        Self {
            options,
            stacks: Vec::new(),
            next_handle,
        }
    }

    pub fn options(&self) -> RegistryOptions {
        self.options
    }

    /// Number of live stacks.
    pub fn live_count(&self) -> usize {
        self.stacks.len()
    }

    pub fn create(&mut self) -> Result<Handle, Error> {
        let Some(raw) = self.next_handle else {
            tracing::warn!(max_handle = self.options.max_handle, "stack handles exhausted");
            return Err(Error::new(ErrorKind::Exhausted).with_message("no stack handles left"));
        };
        let handle = Handle(raw);
        self.next_handle = raw
            .checked_add(1)
            .filter(|next| *next <= self.options.max_handle);
        self.stacks.push(Stack::new(handle));
        tracing::debug!(handle = raw, live = self.stacks.len(), "stack created");
        Ok(handle)
    }

    /// Releases the stack and all of its elements. Unknown handles are ignored;
    /// the return value only says whether anything was destroyed.
    pub fn destroy(&mut self, handle: Handle) -> bool {
        let Ok(index) = self.position(handle) else {
            return false;
        };
        let released = self.stacks.remove(index).release();
        tracing::debug!(
            handle = handle.raw(),
            released,
            live = self.stacks.len(),
            "stack destroyed"
        );
        true
    }

    pub fn is_valid(&self, handle: Handle) -> bool {
        self.position(handle).is_ok()
    }

    /// Element count, or 0 when the handle is not live.
    pub fn size(&self, handle: Handle) -> usize {
        self.lookup(handle).map_or(0, Stack::len)
    }

    pub fn push(&mut self, handle: Handle, data: &[u8]) -> Result<(), Error> {
        let stack = self.lookup_mut(handle).ok_or_else(|| not_found(handle))?;
        stack.push(data)?;
        tracing::trace!(handle = handle.raw(), len = data.len(), "push");
        Ok(())
    }

    pub fn pop(&mut self, handle: Handle, out: &mut [u8]) -> Result<usize, Error> {
        let stack = self.lookup_mut(handle).ok_or_else(|| not_found(handle))?;
        let len = stack.pop(out)?;
        tracing::trace!(handle = handle.raw(), len, "pop");
        Ok(len)
    }

    pub fn lookup(&self, handle: Handle) -> Option<&Stack> {
        self.position(handle).ok().map(|index| &self.stacks[index])
    }

    fn lookup_mut(&mut self, handle: Handle) -> Option<&mut Stack> {
        self.position(handle).ok().map(|index| &mut self.stacks[index])
    }

    fn position(&self, handle: Handle) -> Result<usize, usize> {
        self.stacks.binary_search_by_key(&handle, Stack::handle)
    }
}

impl Default for Registry {
    fn default() -> Self {
        Self::new()
    }
}

fn not_found(handle: Handle) -> Error {
    Error::new(ErrorKind::NotFound)
        .with_message("no live stack for handle")
        .with_handle(handle.raw())
}

#[cfg(test)]
mod tests {
    use super::{Handle, Registry, RegistryOptions};
    use crate::core::error::ErrorKind;
    use proptest::prelude::*;

    #[test]
    fn push_pop_scenario() {
        let mut registry = Registry::new();
        let h0 = registry.create().unwrap();
        assert_eq!(h0.raw(), 0);

        registry.push(h0, b"abc").unwrap();
        registry.push(h0, b"z").unwrap();
        assert_eq!(registry.size(h0), 2);

        let mut buf = [0u8; 10];
        assert_eq!(registry.pop(h0, &mut buf).unwrap(), 1);
        assert_eq!(buf[0], b'z');
        assert_eq!(registry.pop(h0, &mut buf).unwrap(), 3);
        assert_eq!(&buf[..3], b"abc");
        assert_eq!(registry.size(h0), 0);
        assert_eq!(
            registry.pop(h0, &mut buf).unwrap_err().kind(),
            ErrorKind::Empty
        );
    }

    #[test]
    fn destroyed_handle_behaves_like_never_issued() {
        let mut registry = Registry::new();
        let _h0 = registry.create().unwrap();
        let h1 = registry.create().unwrap();
        registry.push(h1, b"12345").unwrap();

        assert!(registry.destroy(h1));
        assert!(!registry.is_valid(h1));
        assert_eq!(registry.size(h1), 0);
        assert_eq!(
            registry.push(h1, b"more").unwrap_err().kind(),
            ErrorKind::NotFound
        );
        let mut buf = [0u8; 8];
        assert_eq!(
            registry.pop(h1, &mut buf).unwrap_err().kind(),
            ErrorKind::NotFound
        );
        assert!(!registry.destroy(h1));

        let never = Handle::from_raw(99);
        assert!(!registry.is_valid(never));
        assert_eq!(registry.size(never), 0);
        assert!(!registry.destroy(never));
        assert_eq!(registry.live_count(), 1);
    }

    #[test]
    fn handles_increase_and_survive_neighbour_destroy() {
        let mut registry = Registry::new();
        let a = registry.create().unwrap();
        let b = registry.create().unwrap();
        let c = registry.create().unwrap();
        assert!(a < b && b < c);

        registry.push(b, b"keep").unwrap();
        assert!(registry.destroy(a));
        assert!(registry.is_valid(b));
        assert!(registry.is_valid(c));
        assert_eq!(registry.size(b), 1);
        assert_eq!(registry.lookup(b).map(|stack| stack.handle()), Some(b));
    }

    #[test]
    fn handles_are_never_reissued() {
        let mut registry = Registry::new();
        let first = registry.create().unwrap();
        assert!(registry.destroy(first));
        assert_eq!(registry.live_count(), 0);

        let second = registry.create().unwrap();
        assert_ne!(first, second);
        assert_eq!(second.raw(), 1);
        assert!(!registry.is_valid(first));
    }

    #[test]
    fn negative_handles_are_never_found() {
        let mut registry = Registry::new();
        registry.create().unwrap();
        assert!(!registry.is_valid(Handle::from_raw(-1)));
        assert!(!registry.destroy(Handle::from_raw(i32::MIN)));
    }

    #[test]
    fn exhaustion_is_explicit_and_sticky() {
        let mut registry = Registry::with_options(RegistryOptions::new().with_max_handle(1));
        assert_eq!(registry.create().unwrap().raw(), 0);
        let last = registry.create().unwrap();
        assert_eq!(last.raw(), 1);

        assert!(registry.destroy(last));
        for _ in 0..2 {
            assert_eq!(registry.create().unwrap_err().kind(), ErrorKind::Exhausted);
        }
        assert_eq!(registry.live_count(), 1);
    }

    #[test]
    fn max_handle_at_type_limit_does_not_overflow() {
        let mut registry = Registry::new();
        registry.next_handle = Some(i32::MAX);
        assert_eq!(registry.create().unwrap().raw(), i32::MAX);
        assert_eq!(registry.create().unwrap_err().kind(), ErrorKind::Exhausted);
    }

    #[test]
    fn destroy_releases_elements() {
        let mut registry = Registry::new();
        let h = registry.create().unwrap();
        for len in 1..=3 {
            registry.push(h, &vec![0xAB; len]).unwrap();
        }
        assert!(registry.destroy(h));
        assert_eq!(registry.size(h), 0);
        assert!(registry.lookup(h).is_none());
    }

    proptest! {
        #[test]
        fn pops_mirror_pushes(
            payloads in prop::collection::vec(prop::collection::vec(any::<u8>(), 1..64), 0..32)
        ) {
            let mut registry = Registry::new();
            let h = registry.create().unwrap();
            for payload in &payloads {
                registry.push(h, payload).unwrap();
            }
            prop_assert_eq!(registry.size(h), payloads.len());

            let mut buf = [0u8; 64];
            for expected in payloads.iter().rev() {
                let len = registry.pop(h, &mut buf).unwrap();
                prop_assert_eq!(&buf[..len], expected.as_slice());
            }
            prop_assert_eq!(registry.size(h), 0);
        }

        #[test]
        fn size_tracks_pushes_minus_pops(pushes in 0usize..40, pops in 0usize..40) {
            let pops = pops.min(pushes);
            let mut registry = Registry::new();
            let h = registry.create().unwrap();
            for i in 0..pushes {
                registry.push(h, &[i as u8]).unwrap();
            }
            let mut buf = [0u8; 1];
            for _ in 0..pops {
                registry.pop(h, &mut buf).unwrap();
            }
            prop_assert_eq!(registry.size(h), pushes - pops);
        }
    }
}
