pub mod data;
pub mod engine;
pub mod graph;
pub mod lsq;
pub mod mapper;
pub mod optype;
pub mod pe;

#[cfg(test)]
mod unit_tests;
