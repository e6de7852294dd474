pub mod chunker;
pub mod combine;
pub mod gemini;
pub mod normalize;
pub mod parser;
pub mod rules;
pub mod runner;
pub mod types;
pub mod verify;
