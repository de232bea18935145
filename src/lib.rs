pub mod arrange_engine;
pub mod common;
pub mod controller;
pub mod model;
pub mod rendezvous;
pub mod sys;

#[cfg(test)]
mod testing;
