pub mod formatters;
pub mod logging;
pub mod validators;
