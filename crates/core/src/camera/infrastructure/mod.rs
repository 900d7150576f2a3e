pub mod device_permission_gate;
pub mod ffmpeg_frame_source;
