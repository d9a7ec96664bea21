//! These models represent the objects passed around by the research agent
//!
//! A session moves three kinds of data: the transcript of role-tagged messages
//! sent to the model, the directives the model emits inside tags, and the
//! research steps recorded for every loop iteration.
pub mod directive;
pub mod message;
pub mod role;
pub mod step;
