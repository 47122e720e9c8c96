//! Array-backed binary heap that dequeues elements in an order fixed at construction,
//! either ascending or descending.

mod queue;

pub use self::queue::{Orientation, PriorityQueue};
