pub mod auto_capture_use_case;
pub mod capture_executor;
pub mod frame_analyzer;
pub mod infrastructure;
pub mod pipeline_logger;
