//! Controller logic for the FLOW admin dashboards.
//!
//! Two front ends live here: the analytics viewer ([`analytics`]) and the image-generation
//! pages ([`imageweb`] and [`links`]). Both talk to the backend through [`core::api::ApiClient`]
//! and render into a [`core::surface::Surface`].

pub mod analytics;
pub mod core;
pub mod imageweb;
pub mod links;
pub mod logging;

pub use crate::core::api::{ApiClient, ApiError};
pub use crate::core::config::DashboardConfig;
pub use crate::core::storage::{FileStore, KeyValueStore, MemoryStore, Storage, StorageError};
pub use crate::core::surface::Surface;
