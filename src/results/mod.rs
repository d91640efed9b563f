//! Results review workflow: grouping, batch approval, student visibility.

pub mod aggregate;
pub mod approval;
pub mod display;
pub mod gate;
