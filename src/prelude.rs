pub use crate::config::{Config, ConfigBuilder};
pub use crate::error::{Error, Result};
pub use crate::exec::{
    get_completion_scheduler, get_forward_progress_guarantee, schedule, sync_wait, BulkScheduler,
    CompletionScheduler, CompletionSignal, ForwardProgressGuarantee, OperationState, Receiver,
    Scheduler, Sender, SenderExt,
};
pub use crate::executor::PanicStrategy;
pub use crate::system::{
    ChainedBulkSender, ReceiverBridge, SystemBulkSender, SystemContext, SystemOperation,
    SystemScheduler, SystemSender,
};
