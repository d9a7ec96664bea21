pub mod agent;
pub mod config;
pub mod directive;
pub mod errors;
pub mod models;
pub mod prompt_template;
pub mod providers;
pub mod scanner;
pub mod tools;
pub mod turn;
pub mod visualization;
