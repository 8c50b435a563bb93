pub mod clear_done;
pub mod common;
pub mod delete;
pub mod finish;
pub mod inspections;
pub mod queue;
pub mod sync;
