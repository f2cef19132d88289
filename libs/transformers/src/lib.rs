pub mod json;
pub mod senml;
