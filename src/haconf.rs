//! Main module for haconf library functionality

pub mod catalog;
pub mod directive;
pub mod engine;
pub mod error;
pub mod lexing;
pub mod options;
pub mod parsers;
pub mod processing;
pub mod registry;
pub mod section;
pub mod sorter;
pub mod testing;
pub mod writer;
