pub mod capture_controller;
pub mod capture_naming;
pub mod image_sink;
