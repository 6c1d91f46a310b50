//! Erasure of the concrete receiver type.

use crate::exec::Receiver;
use crate::executor::panic_handler::panic_message;
use std::fmt;
use std::mem::ManuallyDrop;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::ptr::NonNull;

/// A receiver of unknown type behind an opaque pointer and a table of
/// C-ABI trampolines.
///
/// Only [`ReceiverBridge::new`] is generic; everything that consumes a
/// bridge can stay non-generic. The bridge owns the boxed receiver:
/// signalling consumes the bridge and hands the receiver to exactly one of
/// its completion methods, and dropping an unsignalled bridge drops the
/// receiver without signalling it.
///
/// The trampolines are plain `extern "C"`: a panic raised by the concrete
/// receiver is caught and logged inside the trampoline and never reaches
/// whoever signalled the bridge.
#[repr(C)]
pub struct ReceiverBridge {
    target: NonNull<()>,
    set_value: unsafe extern "C" fn(NonNull<()>),
    set_stopped: unsafe extern "C" fn(NonNull<()>),
    drop_target: unsafe extern "C" fn(NonNull<()>),
}

// SAFETY: `new` only accepts `Send` receivers, and the bridge is the sole
// owner of the pointee.
unsafe impl Send for ReceiverBridge {}

fn contain(signal: &'static str, f: impl FnOnce()) {
    if let Err(payload) = catch_unwind(AssertUnwindSafe(f)) {
        tracing::error!(signal, panic = panic_message(&*payload), "receiver panicked");
    }
}

unsafe extern "C" fn set_value_trampoline<R: Receiver>(target: NonNull<()>) {
    // SAFETY: `target` came from `Box::leak` in `new` and is consumed once.
    let receiver = unsafe { Box::from_raw(target.cast::<R>().as_ptr()) };
    contain("value", move || (*receiver).set_value());
}

unsafe extern "C" fn set_stopped_trampoline<R: Receiver>(target: NonNull<()>) {
    // SAFETY: as above.
    let receiver = unsafe { Box::from_raw(target.cast::<R>().as_ptr()) };
    contain("stopped", move || (*receiver).set_stopped());
}

unsafe extern "C" fn drop_trampoline<R: Receiver>(target: NonNull<()>) {
    // SAFETY: as above.
    let receiver = unsafe { Box::from_raw(target.cast::<R>().as_ptr()) };
    contain("drop", move || drop(receiver));
}

impl ReceiverBridge {
    pub fn new<R: Receiver>(receiver: R) -> Self {
        let target = NonNull::from(Box::leak(Box::new(receiver))).cast::<()>();
        Self {
            target,
            set_value: set_value_trampoline::<R>,
            set_stopped: set_stopped_trampoline::<R>,
            drop_target: drop_trampoline::<R>,
        }
    }

    pub fn set_value(self) {
        let this = ManuallyDrop::new(self);
        // SAFETY: `this` is never dropped, so the target is consumed exactly once.
        unsafe { (this.set_value)(this.target) }
    }

    pub fn set_stopped(self) {
        let this = ManuallyDrop::new(self);
        // SAFETY: as above.
        unsafe { (this.set_stopped)(this.target) }
    }
}

impl Drop for ReceiverBridge {
    fn drop(&mut self) {
        // SAFETY: reached only when neither signal consumed the target.
        unsafe { (self.drop_target)(self.target) }
    }
}

impl Receiver for ReceiverBridge {
    fn set_value(self) {
        ReceiverBridge::set_value(self)
    }

    fn set_stopped(self) {
        ReceiverBridge::set_stopped(self)
    }
}

impl fmt::Debug for ReceiverBridge {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ReceiverBridge")
            .field("target", &self.target)
            .finish()
    }
}
