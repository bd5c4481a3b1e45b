pub mod pose;
pub mod template;
pub mod video;
