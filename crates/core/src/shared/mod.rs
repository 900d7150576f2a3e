pub mod constants;
pub mod face_box;
pub mod frame;
pub mod frame_lease;
pub mod rate_limiter;
pub mod settings;
