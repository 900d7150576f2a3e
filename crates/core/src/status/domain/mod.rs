pub mod status_sink;
