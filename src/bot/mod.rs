// The decision side of the bot: belief state, policy, pacing, and the loop
// that drives one perception-action cycle per iteration.

pub mod controller;
pub mod dispatch;
pub mod planner;
pub mod state;
pub mod types;

pub use controller::LoopController;
pub use dispatch::Dispatcher;
pub use planner::ActionPlanner;
pub use state::{BotState, StateTracker, Transition};
pub use types::{Action, BotEvent, ControlCommand, Counters, Snapshot, control_channels};
