pub mod beat;
pub mod camera;
pub mod config;
pub mod count;
pub mod pipeline;
pub mod pose;
pub mod timeline;
pub mod tracker;
pub mod transform;
