pub mod base;
pub mod llyr;
pub mod sim;
pub mod timeq;
pub mod ui;
