// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The prefix → store-path routes table (`.beads/routes.jsonl`).
//!
//! One JSON object per line; first match wins. By convention `hq-` maps
//! to `.` (the town's own store).

use serde::{Deserialize, Serialize};
use std::io;
use std::path::Path;

/// One routing entry. `prefix` includes the trailing dash.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Route {
    pub prefix: String,
    pub path: String,
}

impl Route {
    pub fn new(prefix: impl Into<String>, path: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
            path: path.into(),
        }
    }
}

/// Load all routes. A missing file is an empty table.
pub fn load_routes(routes_file: &Path) -> io::Result<Vec<Route>> {
    if !routes_file.exists() {
        return Ok(Vec::new());
    }
    let content = std::fs::read_to_string(routes_file)?;
    let mut routes = Vec::new();
    for line in content.lines() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        let route: Route = serde_json::from_str(line)
            .map_err(|e| io::Error::other(format!("bad route line {:?}: {}", line, e)))?;
        routes.push(route);
    }
    Ok(routes)
}

/// Append a route. Duplicate prefixes are rejected; the table holds
/// exactly one entry per active rig.
pub fn append_route(routes_file: &Path, route: &Route) -> io::Result<()> {
    let existing = load_routes(routes_file)?;
    if existing.iter().any(|r| r.prefix == route.prefix) {
        return Err(io::Error::new(
            io::ErrorKind::AlreadyExists,
            format!("route for prefix {} already exists", route.prefix),
        ));
    }
    if let Some(parent) = routes_file.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let mut line = serde_json::to_string(route).map_err(io::Error::other)?;
    line.push('\n');
    use std::io::Write;
    let mut file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(routes_file)?;
    file.write_all(line.as_bytes())
}

/// Remove the route for a prefix. Rewrites the table without it.
pub fn remove_route(routes_file: &Path, prefix: &str) -> io::Result<()> {
    let routes = load_routes(routes_file)?;
    let kept: Vec<&Route> = routes.iter().filter(|r| r.prefix != prefix).collect();
    let mut content = String::new();
    for route in kept {
        content.push_str(&serde_json::to_string(route).map_err(io::Error::other)?);
        content.push('\n');
    }
    std::fs::write(routes_file, content)
}

/// Resolve the store path for a bead id: first route whose prefix
/// matches wins.
pub fn route_for<'a>(routes: &'a [Route], bead_id: &str) -> Option<&'a Route> {
    let prefix = gt_core::id::extract_prefix(bead_id)?;
    routes.iter().find(|r| r.prefix == prefix)
}

#[cfg(test)]
#[path = "routes_tests.rs"]
mod tests;
