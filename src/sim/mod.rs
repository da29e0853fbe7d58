pub mod config;
pub mod log;
pub mod mem_iface;
pub mod sparse_mem;
pub mod top;
