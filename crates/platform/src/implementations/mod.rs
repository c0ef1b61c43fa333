//! Host implementations of the platform collaborators

pub mod headless;
