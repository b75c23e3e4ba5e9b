pub mod output;
pub mod registry;
pub mod screencopy;
