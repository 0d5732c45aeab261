//! Source-structure extraction with tree-sitter.
//!
//! Walks the whole syntax tree in source order and collects function names,
//! class names and verbatim import statements for Python, JavaScript and
//! TypeScript buffers.

use serde::Serialize;
use std::path::Path;
use tree_sitter::{Language, Node, Parser};

use crate::error::ParserError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceLanguage {
    Python,
    JavaScript,
    TypeScript,
}

impl SourceLanguage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Python => "python",
            Self::JavaScript => "javascript",
            Self::TypeScript => "typescript",
        }
    }

    fn grammar(&self) -> Language {
        match self {
            Self::Python => tree_sitter_python::LANGUAGE.into(),
            Self::JavaScript => tree_sitter_javascript::LANGUAGE.into(),
            Self::TypeScript => tree_sitter_typescript::LANGUAGE_TYPESCRIPT.into(),
        }
    }

    fn function_kinds(&self) -> &'static [&'static str] {
        match self {
            Self::Python => &["function_definition"],
            Self::JavaScript => &[
                "function_declaration",
                "generator_function_declaration",
                "method_definition",
            ],
            Self::TypeScript => &[
                "function_declaration",
                "generator_function_declaration",
                "function_signature",
                "method_definition",
            ],
        }
    }

    fn class_kinds(&self) -> &'static [&'static str] {
        match self {
            Self::Python => &["class_definition"],
            Self::JavaScript => &["class_declaration"],
            Self::TypeScript => &["class_declaration", "abstract_class_declaration"],
        }
    }

    fn import_kinds(&self) -> &'static [&'static str] {
        match self {
            Self::Python => &[
                "import_statement",
                "import_from_statement",
                "future_import_statement",
            ],
            Self::JavaScript | Self::TypeScript => &["import_statement"],
        }
    }
}

impl std::str::FromStr for SourceLanguage {
    type Err = ParserError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "python" => Ok(Self::Python),
            "javascript" => Ok(Self::JavaScript),
            "typescript" => Ok(Self::TypeScript),
            _ => Err(ParserError::UnsupportedLanguage(s.to_string())),
        }
    }
}

/// Language tag for a file path. Anything that is not JavaScript or
/// TypeScript by extension is analyzed as Python.
pub fn infer_language(path: &Path) -> String {
    match path.extension().and_then(|e| e.to_str()) {
        Some("py") => "python".into(),
        Some("js") | Some("mjs") | Some("cjs") => "javascript".into(),
        Some("ts") => "typescript".into(),
        _ => "python".into(),
    }
}

/// Report for one buffer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CodeStructure {
    pub language: SourceLanguage,
    pub functions: Vec<String>,
    pub classes: Vec<String>,
    pub imports: Vec<String>,
}

pub trait CodeParser: Send + Sync {
    fn analyze(&self, text: &str, language: &str) -> Result<CodeStructure, ParserError>;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct TreeSitterParser;

impl CodeParser for TreeSitterParser {
    fn analyze(&self, text: &str, language: &str) -> Result<CodeStructure, ParserError> {
        let language: SourceLanguage = language.parse()?;

        let mut parser = Parser::new();
        parser
            .set_language(&language.grammar())
            .map_err(|e| ParserError::Unavailable(e.to_string()))?;
        let tree = parser
            .parse(text, None)
            .ok_or_else(|| ParserError::Unavailable("parse was cancelled".into()))?;

        let mut report = CodeStructure {
            language,
            functions: Vec::new(),
            classes: Vec::new(),
            imports: Vec::new(),
        };
        let source = text.as_bytes();

        let mut cursor = tree.walk();
        'walk: loop {
            collect(&cursor.node(), language, source, &mut report);

            if cursor.goto_first_child() || cursor.goto_next_sibling() {
                continue;
            }
            loop {
                if !cursor.goto_parent() {
                    break 'walk;
                }
                if cursor.goto_next_sibling() {
                    break;
                }
            }
        }

        Ok(report)
    }
}

fn collect(node: &Node<'_>, language: SourceLanguage, source: &[u8], report: &mut CodeStructure) {
    let kind = node.kind();
    if language.function_kinds().contains(&kind) {
        if let Some(name) = field_text(node, "name", source) {
            report.functions.push(name);
        }
    } else if language.class_kinds().contains(&kind) {
        if let Some(name) = field_text(node, "name", source) {
            report.classes.push(name);
        }
    } else if language.import_kinds().contains(&kind) {
        if let Ok(text) = node.utf8_text(source) {
            report.imports.push(text.trim().to_string());
        }
    }
}

fn field_text(node: &Node<'_>, field: &str, source: &[u8]) -> Option<String> {
    node.child_by_field_name(field)
        .and_then(|n| n.utf8_text(source).ok())
        .map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn python_structure() {
        let src = "def foo():\n    pass\n\nclass Bar:\n    pass\nimport os\n";
        let report = TreeSitterParser.analyze(src, "python").unwrap();
        assert_eq!(report.functions, vec!["foo"]);
        assert_eq!(report.classes, vec!["Bar"]);
        assert_eq!(report.imports, vec!["import os"]);
    }

    #[test]
    fn python_methods_and_from_imports() {
        let src = "from a import b\n\nclass K:\n    def m(self):\n        pass\n";
        let report = TreeSitterParser.analyze(src, "python").unwrap();
        assert_eq!(report.functions, vec!["m"]);
        assert_eq!(report.classes, vec!["K"]);
        assert_eq!(report.imports, vec!["from a import b"]);
    }

    #[test]
    fn javascript_structure() {
        let src = "import fs from 'fs';\nfunction load() {}\nclass Store { save() {} }\n";
        let report = TreeSitterParser.analyze(src, "javascript").unwrap();
        assert_eq!(report.functions, vec!["load", "save"]);
        assert_eq!(report.classes, vec!["Store"]);
        assert_eq!(report.imports, vec!["import fs from 'fs';"]);
    }

    #[test]
    fn typescript_structure() {
        let src = "import { x } from './x';\nexport function run(a: number): void {}\nabstract class Base {}\n";
        let report = TreeSitterParser.analyze(src, "typescript").unwrap();
        assert_eq!(report.functions, vec!["run"]);
        assert_eq!(report.classes, vec!["Base"]);
        assert_eq!(report.imports, vec!["import { x } from './x';"]);
    }

    #[test]
    fn unsupported_language() {
        let err = TreeSitterParser.analyze("fn main() {}", "rust").unwrap_err();
        assert_eq!(err, ParserError::UnsupportedLanguage("rust".into()));
    }

    #[test]
    fn infers_language_from_extension() {
        assert_eq!(infer_language(Path::new("sample.py")), "python");
        assert_eq!(infer_language(Path::new("app.js")), "javascript");
        assert_eq!(infer_language(Path::new("app.ts")), "typescript");
        assert_eq!(infer_language(Path::new("main.rb")), "python");
        assert_eq!(infer_language(Path::new("Makefile")), "python");
    }
}
