pub mod adapters;
pub mod collaborators;
pub mod configuration;
pub mod domain;
pub mod enrollment;
pub mod startup;
pub mod utils;
