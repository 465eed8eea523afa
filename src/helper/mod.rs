pub mod landmark_source;
