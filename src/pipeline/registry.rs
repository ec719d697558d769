// Route registry: (method, path pattern) -> pipeline, independent of the web framework
use std::collections::HashMap;
use std::sync::Arc;

use axum::http::Method;
use percent_encoding::percent_decode_str;

use crate::pipeline::driver::Pipeline;

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Literal(String),
    Param(String),
}

/// A path pattern such as `/id/:userId/locations`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathPattern {
    segments: Vec<Segment>,
}

impl PathPattern {
    pub fn parse(pattern: &str) -> Self {
        let segments = split_path(pattern)
            .map(|segment| match segment.strip_prefix(':') {
                Some(name) => Segment::Param(name.to_string()),
                None => Segment::Literal(segment.to_string()),
            })
            .collect();

        Self { segments }
    }

    /// Captured parameters if `path` fits this pattern
    pub fn matches(&self, path: &str) -> Option<HashMap<String, String>> {
        let parts: Vec<&str> = split_path(path).collect();
        if parts.len() != self.segments.len() {
            return None;
        }

        let mut params = HashMap::new();
        for (segment, part) in self.segments.iter().zip(parts) {
            match segment {
                Segment::Literal(literal) if literal == part => {}
                Segment::Literal(_) => return None,
                Segment::Param(name) => {
                    params.insert(name.clone(), decode_segment(part));
                }
            }
        }
        Some(params)
    }
}

/// Percent-decode a captured segment. Bytes that are not UTF-8 once decoded
/// leave the segment as sent, so identifier validation rejects it.
fn decode_segment(segment: &str) -> String {
    match percent_decode_str(segment).decode_utf8() {
        Ok(decoded) => decoded.into_owned(),
        Err(_) => segment.to_string(),
    }
}

fn split_path(path: &str) -> impl Iterator<Item = &str> {
    path.split('/').filter(|segment| !segment.is_empty())
}

pub struct Route {
    pub method: Method,
    pub pattern: PathPattern,
    pub pipeline: Arc<Pipeline>,
}

/// Outcome of looking a request up in the table
pub enum RouteLookup {
    Found {
        pipeline: Arc<Pipeline>,
        params: HashMap<String, String>,
    },
    /// The path exists but not for this method
    MethodNotAllowed(Vec<Method>),
    NotFound,
}

/// All routes mounted under one prefix
pub struct RouteTable {
    prefix: String,
    routes: Vec<Route>,
}

impl RouteTable {
    pub fn new(prefix: impl Into<String>) -> Self {
        let prefix: String = prefix.into();
        Self {
            prefix: prefix.trim_end_matches('/').to_string(),
            routes: Vec::new(),
        }
    }

    pub fn route(mut self, method: Method, pattern: &str, pipeline: Pipeline) -> Self {
        tracing::debug!(
            "Registered {} {}{} -> {}",
            method,
            self.prefix,
            pattern,
            pipeline.name()
        );
        self.routes.push(Route {
            method,
            pattern: PathPattern::parse(pattern),
            pipeline: Arc::new(pipeline),
        });
        self
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    pub fn routes(&self) -> &[Route] {
        &self.routes
    }

    /// Path below the prefix, or None if the path is outside this table
    pub fn strip_prefix<'a>(&self, path: &'a str) -> Option<&'a str> {
        let rest = path.strip_prefix(self.prefix.as_str())?;
        if rest.is_empty() {
            Some("/")
        } else if rest.starts_with('/') {
            Some(rest)
        } else {
            None
        }
    }

    /// Find the pipeline for a path relative to the prefix
    pub fn lookup(&self, method: &Method, path: &str) -> RouteLookup {
        let mut allowed = Vec::new();

        for route in &self.routes {
            if let Some(params) = route.pattern.matches(path) {
                if route.method == *method {
                    return RouteLookup::Found {
                        pipeline: route.pipeline.clone(),
                        params,
                    };
                }
                allowed.push(route.method.clone());
            }
        }

        if allowed.is_empty() {
            RouteLookup::NotFound
        } else {
            RouteLookup::MethodNotAllowed(allowed)
        }
    }
}
