//! Frame scheduling.
//!
//! A fixed pool of frame slots bounds how far the CPU may run ahead of the GPU. Every
//! submitted slot keeps its plan (and so the resource versions it reads) alive until the
//! device reports completion, and carries the retire list that becomes safe to release at
//! that point.

mod scheduler;
mod slot;

pub use scheduler::{FrameScheduler, FrameStats};
pub use slot::{FrameSlot, SlotState};
