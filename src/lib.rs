//! Per-group letter generation: a spreadsheet of records is grouped, each
//! group is routed to a DOCX template, and the template's placeholders and
//! records table are filled in.

use indexmap::IndexMap;

pub mod cli;
pub mod config;
pub mod data;
pub mod docx;
pub mod export;
pub mod files;
pub mod letters;
pub mod routing;
pub mod text;

pub use crate::config::Settings;
pub use crate::letters::{generate_letters_per_group, GenerationOptions, GenerationReport};
pub use crate::routing::{load_routing_yaml, RoutingConfig, RoutingRule};

/// File name -> file bytes, in insertion order.
pub type NamedBlobs = IndexMap<String, Vec<u8>>;
