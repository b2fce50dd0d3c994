//! Text processing, matching and scoring

pub mod analyzer;
pub mod combiner;
pub mod contact;
pub mod document;
pub mod embeddings;
pub mod similarity;
pub mod skill_matcher;
pub mod static_embedder;
pub mod text_processor;
