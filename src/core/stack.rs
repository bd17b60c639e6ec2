// Stack instance: a LIFO of owned byte payloads addressed through its handle.
use crate::core::error::{Error, ErrorKind};
use crate::core::registry::Handle;

/// One stored element. The payload is a private copy of the caller's bytes.
#[derive(Debug)]
struct Node {
    payload: Box<[u8]>,
}

impl Node {
    fn new(data: &[u8]) -> Self {
        Self {
            payload: data.into(),
        }
    }

    fn len(&self) -> usize {
        self.payload.len()
    }
}

#[derive(Debug)]
pub struct Stack {
    handle: Handle,
    // Last element is the top; each node sits directly above the one before it.
    nodes: Vec<Node>,
}

impl Stack {
    pub(crate) fn new(handle: Handle) -> Self {
        Self {
            handle,
            nodes: Vec::new(),
        }
    }

    pub fn handle(&self) -> Handle {
        self.handle
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub(crate) fn push(&mut self, data: &[u8]) -> Result<(), Error> {
        if data.is_empty() {
            return Err(Error::new(ErrorKind::Usage)
                .with_message("payload is empty")
                .with_handle(self.handle.raw()));
        }
        self.nodes.push(Node::new(data));
        Ok(())
    }

    /// Copies the top payload into `out` and releases it.
    ///
    /// On any error the stack is left untouched, so a `TooSmall` caller can
    /// retry with a buffer of `Error::needed()` bytes.
    pub(crate) fn pop(&mut self, out: &mut [u8]) -> Result<usize, Error> {
        let Some(top) = self.nodes.last() else {
            return Err(Error::new(ErrorKind::Empty)
                .with_message("stack is empty")
                .with_handle(self.handle.raw()));
        };
        if out.is_empty() {
            return Err(Error::new(ErrorKind::Usage)
                .with_message("output buffer is empty")
                .with_handle(self.handle.raw()));
        }
        let len = top.len();
        if len > out.len() {
            return Err(Error::new(ErrorKind::TooSmall)
                .with_message("output buffer too small")
                .with_handle(self.handle.raw())
                .with_needed(len));
        }
        out[..len].copy_from_slice(&top.payload);
        self.nodes.pop();
        Ok(len)
    }

    /// Drops every node, returning how many were released.
    pub(crate) fn release(&mut self) -> usize {
        let released = self.nodes.len();
        self.nodes.clear();
        released
    }
}
