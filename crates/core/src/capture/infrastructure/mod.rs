pub mod jpeg_file_sink;
