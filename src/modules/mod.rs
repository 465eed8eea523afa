pub mod blink;
pub mod eye_model;
pub mod head_pose;
pub mod screen_map;
