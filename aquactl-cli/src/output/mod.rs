pub mod json;
pub mod report;
pub mod table;
