pub mod helm;
pub mod kctl;
pub mod pkg;
