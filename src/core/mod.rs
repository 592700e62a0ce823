pub mod api;
pub mod clipboard;
pub mod config;
pub mod html;
pub mod models;
pub mod popup;
pub mod storage;
pub mod surface;
pub mod theme;
