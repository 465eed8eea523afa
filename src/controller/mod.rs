pub mod controller;
pub mod scan;
