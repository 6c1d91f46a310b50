//! Generic sender/receiver protocol.
//!
//! A [`Sender`] describes work that has not started yet. Connecting it to a
//! [`Receiver`] yields an [`OperationState`]; starting the operation
//! eventually delivers exactly one completion signal to the receiver. Both
//! signals consume the receiver, so a receiver cannot be completed twice.
//!
//! Completions carry no payload values. The value channel means "the work
//! ran", the stopped channel means "the work was cancelled or could not make
//! progress".

mod sync_wait;
mod then;

pub use sync_wait::sync_wait;
pub use then::{Then, ThenReceiver};

/// Target of a completion signal.
pub trait Receiver: Send + 'static {
    /// The work completed successfully.
    fn set_value(self);

    /// The work was cancelled or the resource could not run it.
    fn set_stopped(self);
}

/// A connected, not-yet-started (or in-flight) unit of work.
pub trait OperationState: Send {
    /// Begins execution. Must be called at most once.
    fn start(&mut self);
}

/// Lazy description of work that completes through a [`Receiver`].
pub trait Sender: Send + Sized {
    type Operation<R: Receiver>: OperationState;

    /// Binds the sender to a receiver. Never runs any work and never
    /// signals the receiver.
    fn connect<R: Receiver>(self, receiver: R) -> Self::Operation<R>;
}

/// Which completion channel a query refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CompletionSignal {
    Value,
    Stopped,
}

/// Static promise a scheduler makes about admitted work.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ForwardProgressGuarantee {
    /// Every admitted unit of work progresses independently of the others.
    Parallel,
    /// Progress is guaranteed once a unit of work has started.
    WeaklyParallel,
}

/// Factory for senders that complete on a particular execution resource.
pub trait Scheduler: Clone + PartialEq + Send + Sync + 'static {
    type Sender: Sender;

    fn schedule(&self) -> Self::Sender;

    fn forward_progress_guarantee(&self) -> ForwardProgressGuarantee {
        ForwardProgressGuarantee::WeaklyParallel
    }
}

/// Scheduler that can fan a function out over an index range.
pub trait BulkScheduler: Scheduler {
    type BulkSender<F>: Sender
    where
        F: Fn(usize) + Send + Sync + 'static;

    /// Invokes `f` once for every index in `0..shape`, completing with value
    /// after the last invocation has returned.
    fn bulk<F>(&self, shape: usize, f: F) -> Self::BulkSender<F>
    where
        F: Fn(usize) + Send + Sync + 'static;
}

/// Sender environment query: where will each completion signal be delivered.
pub trait CompletionScheduler {
    type Scheduler: Scheduler;

    fn completion_scheduler(&self, signal: CompletionSignal) -> Self::Scheduler;
}

/// Combinators available on every sender.
pub trait SenderExt: Sender {
    /// Runs `f` on the completing thread before forwarding the value signal.
    fn then<F>(self, f: F) -> Then<Self, F>
    where
        F: FnOnce() + Send + 'static,
    {
        Then::new(self, f)
    }

    /// Blocks the calling thread until the sender completes.
    ///
    /// Returns `Some(())` for value completion and `None` for stopped.
    fn sync_wait(self) -> Option<()> {
        sync_wait(self)
    }
}

impl<S: Sender> SenderExt for S {}

pub fn schedule<S: Scheduler>(scheduler: &S) -> S::Sender {
    scheduler.schedule()
}

pub fn get_forward_progress_guarantee<S: Scheduler>(scheduler: &S) -> ForwardProgressGuarantee {
    scheduler.forward_progress_guarantee()
}

pub fn get_completion_scheduler<S: CompletionScheduler>(
    sender: &S,
    signal: CompletionSignal,
) -> S::Scheduler {
    sender.completion_scheduler(signal)
}
