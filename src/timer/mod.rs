pub mod controller;
pub mod engine;
pub mod state;

pub use controller::{TimerController, TimerEvent};
pub use engine::{EngineStatus, FocusEngine, TickReport};
pub use state::{ClockPhase, ClockTick, PhaseTransition, SessionClock, TimerSettings};
