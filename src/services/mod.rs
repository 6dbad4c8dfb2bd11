pub mod bulk_loader;
pub mod catalog;
pub mod refresh_service;
