//! Placement execution (tick orchestration, checkpoint digests).

pub mod checkpoint;
mod engine;

pub use engine::{
    AllocationConfig, ExecutorConfig, PlacementExecutor, ScheduleConfig, SimulationError,
    TickResult,
};
