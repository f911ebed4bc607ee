//! Line-oriented symbol extraction.
//!
//! One regex pair per language family, applied line by line. Precision is
//! deliberately low: no grammar, no nesting, tolerant of broken source. Files
//! in unsupported languages simply produce no symbols.

use std::sync::LazyLock;

use regex::Regex;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SymbolKind {
    Class,
    Function,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Symbol {
    pub name: String,
    pub kind: SymbolKind,
    /// 1-based line number.
    pub line: usize,
}

/// Language families with declaration patterns.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Language {
    Python,
    JavaScript,
    Go,
    Rust,
    /// Java and C#.
    JavaLike,
    /// C and C++, headers included.
    CFamily,
}

impl Language {
    /// `ext` is lowercase with a leading dot, as stored in the index.
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext {
            ".py" => Some(Language::Python),
            ".js" | ".ts" | ".jsx" | ".tsx" | ".mjs" => Some(Language::JavaScript),
            ".go" => Some(Language::Go),
            ".rs" => Some(Language::Rust),
            ".java" | ".cs" => Some(Language::JavaLike),
            ".c" | ".cpp" | ".cc" | ".h" | ".hpp" => Some(Language::CFamily),
            _ => None,
        }
    }

    fn patterns(self) -> &'static Patterns {
        match self {
            Language::Python => &PYTHON,
            Language::JavaScript => &JAVASCRIPT,
            Language::Go => &GO,
            Language::Rust => &RUST,
            Language::JavaLike => &JAVA_LIKE,
            Language::CFamily => &C_FAMILY,
        }
    }
}

struct Patterns {
    class: Regex,
    function: Regex,
}

impl Patterns {
    fn new(class: &str, function: &str) -> Self {
        Self {
            class: Regex::new(class).expect("class pattern should compile"),
            function: Regex::new(function).expect("function pattern should compile"),
        }
    }
}

static PYTHON: LazyLock<Patterns> = LazyLock::new(|| {
    Patterns::new(r"^\s*class\s+(\w+)", r"^\s*(?:async\s+)?def\s+(\w+)")
});

static JAVASCRIPT: LazyLock<Patterns> = LazyLock::new(|| {
    Patterns::new(
        r"\bclass\s+(\w+)",
        r"(?:function\s*\*?\s*(\w+)|(?:const|let|var)\s+(\w+)\s*=\s*(?:async\s*)?(?:\(|function\b))",
    )
});

static GO: LazyLock<Patterns> = LazyLock::new(|| {
    Patterns::new(r"^type\s+(\w+)\s+(?:struct|interface)\b", r"^func\s+(?:\([^)]*\)\s*)?(\w+)")
});

static RUST: LazyLock<Patterns> = LazyLock::new(|| {
    Patterns::new(
        r"^\s*(?:pub(?:\([^)]*\))?\s+)?(?:struct|enum|trait)\s+(\w+)",
        r"^\s*(?:pub(?:\([^)]*\))?\s+)?(?:const\s+)?(?:async\s+)?(?:unsafe\s+)?fn\s+(\w+)",
    )
});

static JAVA_LIKE: LazyLock<Patterns> = LazyLock::new(|| {
    Patterns::new(
        r"\b(?:class|interface|enum|record)\s+(\w+)",
        r"^\s*(?:(?:public|private|protected|internal|static|final|abstract|async|override|virtual|synchronized)\s+)+[\w<>\[\],?]+\s+(\w+)\s*\(",
    )
});

static C_FAMILY: LazyLock<Patterns> = LazyLock::new(|| {
    Patterns::new(r"\b(?:class|struct)\s+(\w+)\s*(?:[:{]|$)", r"^[\w*&:<>]+[\s*&]+(\w+)\s*\([^;]*$")
});

/// Words that look like a declaration to the loose patterns above.
const NOT_A_NAME: &[&str] =
    &["if", "for", "while", "switch", "return", "else", "sizeof", "catch", "new", "delete"];

/// Extract declared symbols from `text`, in line order.
pub fn extract(text: &str, language: Language) -> Vec<Symbol> {
    let patterns = language.patterns();
    let mut symbols = Vec::new();

    for (idx, line) in text.lines().enumerate() {
        for (kind, regex) in [(SymbolKind::Class, &patterns.class), (SymbolKind::Function, &patterns.function)] {
            for caps in regex.captures_iter(line) {
                let Some(name) = caps.iter().skip(1).flatten().next() else { continue };
                let name = name.as_str();
                if NOT_A_NAME.contains(&name) {
                    continue;
                }
                symbols.push(Symbol { name: name.to_string(), kind, line: idx + 1 });
            }
        }
    }

    symbols
}

#[cfg(test)]
mod tests {
    use super::*;

    fn names(symbols: &[Symbol], kind: SymbolKind) -> Vec<&str> {
        symbols.iter().filter(|s| s.kind == kind).map(|s| s.name.as_str()).collect()
    }

    #[test]
    fn python_classes_and_defs() {
        let src = "import os\n\nclass ProjectModule(Base):\n    def handle(self):\n        pass\n\nasync def main():\n    pass\n";
        let syms = extract(src, Language::Python);
        assert_eq!(names(&syms, SymbolKind::Class), vec!["ProjectModule"]);
        assert_eq!(names(&syms, SymbolKind::Function), vec!["handle", "main"]);
        assert_eq!(syms[0].line, 3);
    }

    #[test]
    fn javascript_function_forms() {
        let src = "export class Router {}\nfunction route(a) {}\nconst handler = async (req) => {}\nlet x = 5;\n";
        let syms = extract(src, Language::JavaScript);
        assert_eq!(names(&syms, SymbolKind::Class), vec!["Router"]);
        assert_eq!(names(&syms, SymbolKind::Function), vec!["route", "handler"]);
    }

    #[test]
    fn go_methods_and_types() {
        let src = "type Server struct {\n}\nfunc (s *Server) Start() error {\n}\nfunc main() {}\n";
        let syms = extract(src, Language::Go);
        assert_eq!(names(&syms, SymbolKind::Class), vec!["Server"]);
        assert_eq!(names(&syms, SymbolKind::Function), vec!["Start", "main"]);
    }

    #[test]
    fn rust_items() {
        let src = "pub struct Index;\nenum Tier { A }\nimpl Index {\n    pub(crate) async fn scan() {}\n}\nfn helper() {}\n";
        let syms = extract(src, Language::Rust);
        assert_eq!(names(&syms, SymbolKind::Class), vec!["Index", "Tier"]);
        assert_eq!(names(&syms, SymbolKind::Function), vec!["scan", "helper"]);
    }

    #[test]
    fn java_keywords_filtered() {
        let src = "public class Main {\n    public static void run(String[] args) {\n        return compute(args);\n    }\n}\n";
        let syms = extract(src, Language::JavaLike);
        assert_eq!(names(&syms, SymbolKind::Class), vec!["Main"]);
        assert_eq!(names(&syms, SymbolKind::Function), vec!["run"]);
    }

    #[test]
    fn c_functions_skip_prototypes_and_control_flow() {
        let src = "struct node {\nint count(struct node *n) {\n    if (n) {\nint proto(int a);\n";
        let syms = extract(src, Language::CFamily);
        assert_eq!(names(&syms, SymbolKind::Class), vec!["node"]);
        assert_eq!(names(&syms, SymbolKind::Function), vec!["count"]);
    }

    #[test]
    fn malformed_source_is_tolerated() {
        let src = "class\ndef (\n}}}{{{\nclass 123abc";
        let syms = extract(src, Language::Python);
        assert!(syms.iter().all(|s| !s.name.is_empty()));
    }

    #[test]
    fn extension_mapping() {
        assert_eq!(Language::from_extension(".tsx"), Some(Language::JavaScript));
        assert_eq!(Language::from_extension(".hpp"), Some(Language::CFamily));
        assert_eq!(Language::from_extension(".md"), None);
    }
}
