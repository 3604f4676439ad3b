pub mod asset_service;
pub mod auth_service;
pub mod blog_service;
pub mod order_service;
pub mod smartphone_service;
