pub mod downloaders;
pub mod repositories;
pub mod services;
