#[macro_use]
extern crate serde_derive;

pub mod priority_queue;
pub mod red_black_tree;
