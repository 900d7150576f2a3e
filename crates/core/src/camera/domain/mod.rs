pub mod frame_source;
pub mod permission_gate;
