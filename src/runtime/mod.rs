//! Runtime — executes parsed statements and drives the loop scheduler.

pub mod alias;
pub mod cancel;
pub mod handlers;
pub mod interpreter;
pub mod scheduler;
pub mod session;

pub use alias::{AliasTable, ImportRecord, ResolveError, SampleResolver};
pub use cancel::CancellationToken;
pub use handlers::{ActionContext, ActionRegistry, ParamRegistry, PLAY_ACTION, WAIT_ACTION};
pub use interpreter::{Interpreter, Outcome};
pub use scheduler::{ActionSpacing, LoopEnv, LoopScheduler, ScheduleError};
pub use session::{SessionHandle, SessionSnapshot, SessionState};
