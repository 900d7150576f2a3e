pub mod camera;
pub mod capture;
pub mod centering;
pub mod detection;
pub mod pipeline;
pub mod shared;
pub mod status;
