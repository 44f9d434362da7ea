pub mod api;
pub mod controller;
pub mod files;
