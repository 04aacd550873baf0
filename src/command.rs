//! Shell command lines sent to nodes.
//!
//! Every parameter is shell-quoted before it is substituted, so templates
//! render with escaping turned off.

use handlebars::Handlebars;
use serde_json::json;

use crate::error::Result;
use crate::listing::LineInterval;
use crate::node::PathSpec;

const COPY: &str = "mkdir -p {{parent}} && rsync -a {{src}} {{dst}}";
const COPY_FILES_FROM: &str = "mkdir -p {{parent}} && rsync -a --files-from=- {{src}} {{dst}}";
const SEND_LINES: &str = "{{reader}} | ssh {{dst_node}} {{sink}}";
const SINK: &str = "mkdir -p {{parent}} && cat {{redirect}} {{dst}}";
const LIST_FILES: &str = "find {{folder}} -type f";
const IS_FILE: &str = "test -f {{path}}";
const LINE_COUNT: &str = "awk 'END {print NR}' {{path}}";
const REMOVE_FILE: &str = "rm -f {{path}}";

pub struct Templates {
    registry: Handlebars<'static>,
}

impl Templates {
    pub fn new() -> Result<Self> {
        let mut registry = Handlebars::new();
        registry.register_escape_fn(handlebars::no_escape);
        registry.set_strict_mode(true);
        for (name, template) in [
            ("copy", COPY),
            ("copy_files_from", COPY_FILES_FROM),
            ("send_lines", SEND_LINES),
            ("sink", SINK),
            ("list_files", LIST_FILES),
            ("is_file", IS_FILE),
            ("line_count", LINE_COUNT),
            ("remove_file", REMOVE_FILE),
        ] {
            registry
                .register_template_string(name, template)
                .map_err(Box::new)?;
        }
        Ok(Self { registry })
    }

    /// Runs on the destination node and pulls from the source node.
    pub fn copy(&self, src: &PathSpec, dst: &PathSpec, files_from: bool) -> Result<String> {
        let name = if files_from { "copy_files_from" } else { "copy" };
        Ok(self.registry.render(
            name,
            &json!({
                "parent": quote(&dst.parent()),
                "src": quote(&src.to_string()),
                "dst": quote(&dst.path),
            }),
        )?)
    }

    /// Runs on the source node and pipes the selected lines to the
    /// destination node over a second SSH hop.
    pub fn send_lines(
        &self,
        src: &PathSpec,
        dst: &PathSpec,
        interval: LineInterval,
        append: bool,
    ) -> Result<String> {
        let sink = self.registry.render(
            "sink",
            &json!({
                "parent": quote(&dst.parent()),
                "redirect": if append { ">>" } else { ">" },
                "dst": quote(&dst.path),
            }),
        )?;
        let path = quote(&src.path);
        let reader = if interval.is_whole() {
            format!("cat {}", path)
        } else if interval.is_empty() {
            "true".to_string()
        } else {
            match interval.to {
                Some(to) => format!("sed -n '{},{}p' {}", interval.from + 1, to, path),
                None => format!("sed -n '{},$p' {}", interval.from + 1, path),
            }
        };
        Ok(self.registry.render(
            "send_lines",
            &json!({
                "reader": reader,
                "dst_node": quote(dst.node.as_str()),
                "sink": quote(&sink),
            }),
        )?)
    }

    pub fn list_files(&self, folder: &str) -> Result<String> {
        Ok(self
            .registry
            .render("list_files", &json!({ "folder": quote(folder) }))?)
    }

    pub fn is_file(&self, path: &str) -> Result<String> {
        self.on_path("is_file", path)
    }

    pub fn line_count(&self, path: &str) -> Result<String> {
        self.on_path("line_count", path)
    }

    pub fn remove_file(&self, path: &str) -> Result<String> {
        self.on_path("remove_file", path)
    }

    fn on_path(&self, name: &str, path: &str) -> Result<String> {
        Ok(self.registry.render(name, &json!({ "path": quote(path) }))?)
    }
}

/// Quotes `arg` for a POSIX shell. Plain words are left as they are.
pub fn quote(arg: &str) -> String {
    let plain = !arg.is_empty()
        && arg
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || b"_-./:@%+=,".contains(&b));
    if plain {
        arg.to_string()
    } else {
        format!("'{}'", arg.replace('\'', r"'\''"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn templates() -> Templates {
        Templates::new().unwrap()
    }

    #[test]
    fn test_quote() {
        assert_eq!(quote("/data/big.txt"), "/data/big.txt");
        assert_eq!(quote("nodeA:/data"), "nodeA:/data");
        assert_eq!(quote("my file"), "'my file'");
        assert_eq!(quote("it's"), r"'it'\''s'");
        assert_eq!(quote(""), "''");
    }

    #[test]
    fn test_copy_command() {
        let cmd = templates()
            .copy(
                &PathSpec::new("nodeA", "/data/in"),
                &PathSpec::new("nodeB", "/data/out"),
                false,
            )
            .unwrap();
        assert_eq!(cmd, "mkdir -p /data && rsync -a nodeA:/data/in /data/out");
    }

    #[test]
    fn test_copy_files_from_command() {
        let cmd = templates()
            .copy(
                &PathSpec::new("nodeA", "/data/in"),
                &PathSpec::new("nodeB", "/scratch/shard 1"),
                true,
            )
            .unwrap();
        assert_eq!(
            cmd,
            "mkdir -p /scratch && rsync -a --files-from=- nodeA:/data/in '/scratch/shard 1'"
        );
    }

    #[test]
    fn test_send_bounded_interval() {
        let cmd = templates()
            .send_lines(
                &PathSpec::new("nodeA", "/data/big.txt"),
                &PathSpec::new("nodeB", "/out/part0"),
                LineInterval::new(0, Some(50)),
                true,
            )
            .unwrap();
        assert_eq!(
            cmd,
            "sed -n '1,50p' /data/big.txt | ssh nodeB 'mkdir -p /out && cat >> /out/part0'"
        );
    }

    #[test]
    fn test_send_open_and_whole_intervals() {
        let t = templates();
        let src = PathSpec::new("nodeA", "/data/big.txt");
        let dst = PathSpec::new("nodeC", "/out/part1");
        let open = t
            .send_lines(&src, &dst, LineInterval::new(50, None), false)
            .unwrap();
        assert!(open.starts_with("sed -n '51,$p' /data/big.txt | ssh nodeC "));
        assert!(open.ends_with("'mkdir -p /out && cat > /out/part1'"));
        let whole = t.send_lines(&src, &dst, LineInterval::WHOLE, true).unwrap();
        assert!(whole.starts_with("cat /data/big.txt | "));
        let empty = t
            .send_lines(&src, &dst, LineInterval::new(3, Some(3)), true)
            .unwrap();
        assert!(empty.starts_with("true | "));
        let inverted = t
            .send_lines(&src, &dst, LineInterval::new(5, Some(3)), true)
            .unwrap();
        assert!(inverted.starts_with("true | "));
    }

    #[test]
    fn test_queries() {
        let t = templates();
        assert_eq!(t.list_files("/data").unwrap(), "find /data -type f");
        assert_eq!(t.is_file("/a b").unwrap(), "test -f '/a b'");
        assert_eq!(
            t.line_count("/x").unwrap(),
            "awk 'END {print NR}' /x"
        );
        assert_eq!(t.remove_file("/x").unwrap(), "rm -f /x");
    }
}
