pub mod generation_log;
pub mod resume;
