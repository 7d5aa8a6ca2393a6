//! Indentation-aware text writer for generated sources

use std::fmt::{self, Write};
use weaver_core::facts::TypeIdentity;

/// Header written at the top of every generated file.
pub const GENERATED_HEADER: &[&str] = &["// <auto-generated/>", "#nullable enable"];

pub struct SourceWriter {
    output: String,
    level: usize,
    indent_size: usize,
}

impl SourceWriter {
    pub fn new(indent_size: usize) -> Self {
        Self {
            output: String::new(),
            level: 0,
            indent_size,
        }
    }

    fn indent(&self) -> String {
        " ".repeat(self.level * self.indent_size)
    }

    pub fn header(&mut self) -> fmt::Result {
        for line in GENERATED_HEADER {
            self.line(line)?;
        }
        self.blank()
    }

    pub fn line(&mut self, text: impl AsRef<str>) -> fmt::Result {
        let indent = self.indent();
        writeln!(self.output, "{}{}", indent, text.as_ref())
    }

    /// A line one level deeper than the current block, e.g. a base constructor call.
    pub fn continuation(&mut self, text: impl AsRef<str>) -> fmt::Result {
        self.level += 1;
        let result = self.line(text);
        self.level -= 1;
        result
    }

    pub fn blank(&mut self) -> fmt::Result {
        writeln!(self.output)
    }

    /// Write `header` and open a brace block.
    pub fn open(&mut self, header: impl AsRef<str>) -> fmt::Result {
        self.line(header)?;
        self.open_block()
    }

    /// Open a brace block whose header was already written.
    pub fn open_block(&mut self) -> fmt::Result {
        self.line("{")?;
        self.level += 1;
        Ok(())
    }

    pub fn close(&mut self) -> fmt::Result {
        self.level = self.level.saturating_sub(1);
        self.line("}")
    }

    /// Like [`close`](Self::close) but with a trailing `;`, for initializer blocks.
    pub fn close_statement(&mut self) -> fmt::Result {
        self.level = self.level.saturating_sub(1);
        self.line("};")
    }

    /// Re-open the containing types of a declaration, outermost first.
    ///
    /// Returns the number of blocks opened; pass it to
    /// [`close_scopes`](Self::close_scopes).
    pub fn open_containing_types(&mut self, identity: &TypeIdentity) -> Result<usize, fmt::Error> {
        for scope in &identity.containing_types {
            self.open(format!("partial {} {}", scope.keyword, scope.declared_name()))?;
        }
        Ok(identity.containing_types.len())
    }

    pub fn close_scopes(&mut self, count: usize) -> fmt::Result {
        for _ in 0..count {
            self.close()?;
        }
        Ok(())
    }

    pub fn finish(self) -> String {
        self.output
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use weaver_core::facts::ScopeType;
    use weaver_core::model::TypeKind;

    #[test]
    fn test_nested_scopes() {
        let identity = TypeIdentity {
            namespace: None,
            containing_types: vec![ScopeType {
                name: "Outer".to_string(),
                keyword: "class".to_string(),
                type_parameters: vec!["T".to_string()],
            }],
            name: "Inner".to_string(),
            kind: TypeKind::Class,
            type_parameters: vec![],
        };

        let mut writer = SourceWriter::new(2);
        writer.open("namespace Root").unwrap();
        let opened = writer.open_containing_types(&identity).unwrap();
        writer.line("partial class Inner { }").unwrap();
        writer.close_scopes(opened).unwrap();
        writer.close().unwrap();

        assert_eq!(
            writer.finish(),
            "namespace Root\n{\n  partial class Outer<T>\n  {\n    partial class Inner { }\n  }\n}\n"
        );
    }
}
