pub mod latest_frame_queue;
pub mod threaded_capture_executor;
