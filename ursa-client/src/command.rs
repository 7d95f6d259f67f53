//! # Command Assembly
//!
//! Purpose: Build the single-line text commands ursadb understands. All
//! commands are terminated with `;`; replies to them are single JSON
//! messages decoded in `reply`.

use std::fmt::Write;

/// Administrative command asking for server status.
pub const STATUS: &str = "status;";

/// Administrative command asking for the index topology.
pub const TOPOLOGY: &str = "topology;";

/// Builds a `select ... into iterator <expr>;` command.
///
/// The optional taints clause always precedes the optional datasets clause.
/// Both are omitted entirely when not supplied.
pub fn select(expr: &str, taints: &[String], dataset: Option<&str>) -> String {
    let mut command = String::from("select ");
    if !taints.is_empty() {
        let _ = write!(command, "with taints [\"{}\"] ", taints.join("\", \""));
    }
    if let Some(dataset) = dataset {
        let _ = write!(command, "with datasets [\"{}\"] ", dataset);
    }
    let _ = write!(command, "into iterator {};", expr);
    command
}

/// Builds an `iterator "<id>" pop <count>;` command.
pub fn pop(iterator: &str, count: usize) -> String {
    format!("iterator \"{}\" pop {};", iterator, count)
}
