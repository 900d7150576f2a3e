pub mod channel_status_sink;
