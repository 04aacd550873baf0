//! Nodes and locations on them.
//!
//! A `NodeRef` is whatever SSH accepts as a destination. A `PathSpec` pins an
//! absolute path to one node, written `node:/path` the way rsync does.

use std::fmt;
use std::path::Path;
use std::str::FromStr;

use colored::*;
use colourado::Color;
use serde::{Deserialize, Serialize};
use void::Void;

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodeRef(String);

impl NodeRef {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// For pretty-printing the node name.
    /// Surrounds with brackets and colors it with the given palette color.
    pub fn prettify(&self, color: Color) -> ColoredString {
        let r = (color.red * 255.0) as u8;
        let g = (color.green * 255.0) as u8;
        let b = (color.blue * 255.0) as u8;
        format!("[{}]", self.0).truecolor(r, g, b)
    }
}

impl fmt::Display for NodeRef {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for NodeRef {
    fn from(name: &str) -> Self {
        Self::new(name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PathSpec {
    pub node: NodeRef,
    pub path: String,
}

impl PathSpec {
    pub fn new(node: impl Into<NodeRef>, path: impl Into<String>) -> Self {
        Self {
            node: node.into(),
            path: path.into(),
        }
    }

    /// Directory that has to exist before anything can be written to `path`.
    pub fn parent(&self) -> String {
        match Path::new(&self.path).parent() {
            Some(parent) if parent.as_os_str().is_empty() => ".".to_string(),
            Some(parent) => parent.to_string_lossy().into_owned(),
            None => self.path.clone(),
        }
    }

    /// The same location with a trailing separator, so that rsync merges
    /// the directory's contents into the target instead of nesting it.
    pub fn with_trailing_slash(&self) -> Self {
        let mut path = self.path.clone();
        if !path.ends_with('/') {
            path.push('/');
        }
        Self {
            node: self.node.clone(),
            path,
        }
    }
}

impl fmt::Display for PathSpec {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}:{}", self.node, self.path)
    }
}

/// `node:/path`. A string without a colon names a path on `localhost`.
impl FromStr for PathSpec {
    type Err = Void;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s.split_once(':') {
            Some((node, path)) => Self::new(node, path),
            None => Self::new("localhost", s),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_node_and_path() {
        let spec: PathSpec = "nodeA:/data/big.txt".parse().unwrap();
        assert_eq!(spec.node.as_str(), "nodeA");
        assert_eq!(spec.path, "/data/big.txt");
        assert_eq!(spec.to_string(), "nodeA:/data/big.txt");
    }

    #[test]
    fn test_parse_bare_path_is_local() {
        let spec: PathSpec = "/tmp/out".parse().unwrap();
        assert_eq!(spec.node.as_str(), "localhost");
        assert_eq!(spec.path, "/tmp/out");
    }

    #[test]
    fn test_parent() {
        assert_eq!(PathSpec::new("n", "/out/part0").parent(), "/out");
        assert_eq!(PathSpec::new("n", "/out/dir/").parent(), "/out");
        assert_eq!(PathSpec::new("n", "part0").parent(), ".");
        assert_eq!(PathSpec::new("n", "/").parent(), "/");
    }

    #[test]
    fn test_trailing_slash_added_once() {
        let spec = PathSpec::new("n", "/data/shard");
        assert_eq!(spec.with_trailing_slash().path, "/data/shard/");
        assert_eq!(
            spec.with_trailing_slash().with_trailing_slash().path,
            "/data/shard/"
        );
    }
}
