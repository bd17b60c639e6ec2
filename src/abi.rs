//! Purpose: C ABI bridge over a process-wide stack registry (libhstack).
//! Exports: `stack_new`, `stack_free`, `stack_valid_handler`, `stack_size`,
//! `stack_push`, `stack_pop`, `stack_pop_status`.
//! Role: Link-compatible surface for existing `cstack.h` callers.
//! Invariants: Invalid handles and malformed arguments are silent no-ops.
//! Invariants: Status codes map 1:1 with core error kinds.
//! Notes: The registry has no internal locking. Callers on more than one
//! thread must serialise every call into this module themselves.
use std::cell::UnsafeCell;

use libc::{c_int, c_uint, c_void};

use crate::core::error::{Error, ErrorKind};
use crate::core::registry::{Handle, Registry};

#[allow(non_camel_case_types)]
pub type hstack_t = c_int;

pub const HSTACK_OK: c_int = 0;
pub const HSTACK_INVALID: hstack_t = -1;

struct GlobalRegistry(UnsafeCell<Registry>);

// SAFETY: access is unsynchronised; callers uphold the external
// synchronisation precondition documented on this module.
unsafe impl Sync for GlobalRegistry {}

static REGISTRY: GlobalRegistry = GlobalRegistry(UnsafeCell::new(Registry::new()));

fn with_registry<R>(f: impl FnOnce(&mut Registry) -> R) -> R {
    // SAFETY: single logical caller at a time, and `f` never re-enters this module.
    let registry = unsafe { &mut *REGISTRY.0.get() };
    f(registry)
}

/// Returns a new handle, or `HSTACK_INVALID` once handles are exhausted.
/// Exhaustion is permanent for the process; callers must check for it.
#[unsafe(no_mangle)]
pub extern "C" fn stack_new() -> hstack_t {
    with_registry(|registry| raw_or_invalid(registry.create()))
}

#[unsafe(no_mangle)]
pub extern "C" fn stack_free(hstack: hstack_t) {
    with_registry(|registry| {
        registry.destroy(Handle::from_raw(hstack));
    });
}

/// Returns 0 when `hstack` names a live stack and 1 otherwise.
#[unsafe(no_mangle)]
pub extern "C" fn stack_valid_handler(hstack: hstack_t) -> c_int {
    with_registry(|registry| {
        if registry.is_valid(Handle::from_raw(hstack)) {
            0
        } else {
            1
        }
    })
}

#[unsafe(no_mangle)]
pub extern "C" fn stack_size(hstack: hstack_t) -> c_uint {
    let size = with_registry(|registry| registry.size(Handle::from_raw(hstack)));
    c_uint::try_from(size).unwrap_or(c_uint::MAX)
}

#[unsafe(no_mangle)]
pub extern "C" fn stack_push(hstack: hstack_t, data_in: *const c_void, size: c_uint) {
    let Some(data) = borrow_input(data_in, size) else {
        return;
    };
    with_registry(|registry| {
        let _ = registry.push(Handle::from_raw(hstack), data);
    });
}

/// Returns the number of bytes written, or 0 on any failure.
#[unsafe(no_mangle)]
pub extern "C" fn stack_pop(hstack: hstack_t, data_out: *mut c_void, size: c_uint) -> c_uint {
    let mut written: c_uint = 0;
    if stack_pop_status(hstack, data_out, size, &mut written) == HSTACK_OK {
        written
    } else {
        0
    }
}

/// Tagged variant of `stack_pop`: returns `HSTACK_OK` or the status code of
/// the failure, and stores the byte count in `out_written` when non-null.
/// On `TooSmall` the required length is stored in `out_written` instead.
#[unsafe(no_mangle)]
pub extern "C" fn stack_pop_status(
    hstack: hstack_t,
    data_out: *mut c_void,
    size: c_uint,
    out_written: *mut c_uint,
) -> c_int {
    let result = with_registry(|registry| {
        let handle = Handle::from_raw(hstack);
        if !registry.is_valid(handle) {
            return Err(Error::new(ErrorKind::NotFound).with_handle(hstack));
        }
        if registry.size(handle) == 0 {
            return Err(Error::new(ErrorKind::Empty).with_handle(hstack));
        }
        let out = borrow_output(data_out, size).ok_or_else(|| {
            Error::new(ErrorKind::Usage)
                .with_message("output buffer is null or empty")
                .with_handle(hstack)
        })?;
        registry.pop(handle, out)
    });
    let (code, written) = match result {
        Ok(len) => (HSTACK_OK, len),
        Err(err) => (error_kind_code(err.kind()), err.needed().unwrap_or(0)),
    };
    if !out_written.is_null() {
        unsafe {
            *out_written = c_uint::try_from(written).unwrap_or(c_uint::MAX);
        }
    }
    code
}

fn raw_or_invalid(created: Result<Handle, Error>) -> hstack_t {
    match created {
        Ok(handle) => handle.raw(),
        Err(err) => {
            tracing::error!(error = %err, "stack_new failed; returning HSTACK_INVALID");
            HSTACK_INVALID
        }
    }
}

fn borrow_input<'a>(data: *const c_void, size: c_uint) -> Option<&'a [u8]> {
    if data.is_null() || size == 0 {
        return None;
    }
    Some(unsafe { std::slice::from_raw_parts(data.cast::<u8>(), size as usize) })
}

fn borrow_output<'a>(data: *mut c_void, size: c_uint) -> Option<&'a mut [u8]> {
    if data.is_null() || size == 0 {
        return None;
    }
    Some(unsafe { std::slice::from_raw_parts_mut(data.cast::<u8>(), size as usize) })
}

fn error_kind_code(kind: ErrorKind) -> c_int {
    match kind {
        ErrorKind::Internal => 1,
        ErrorKind::Usage => 2,
        ErrorKind::NotFound => 3,
        ErrorKind::Empty => 4,
        ErrorKind::TooSmall => 5,
        ErrorKind::Exhausted => 6,
    }
}
