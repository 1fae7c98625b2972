//! navstack library exports: the navigation engine and the terminal demo host

pub mod core;
pub mod tui;

#[cfg(test)]
pub mod test_support;
