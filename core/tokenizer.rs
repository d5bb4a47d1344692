pub mod c_family;
pub mod common;
pub mod haskell_elm;
pub mod hash;
pub mod lua;
pub mod markup;
pub mod python;
pub mod rust;
pub mod sql;

pub use common::{CommentKind, Token, TokenKind, TokenizeError};
pub use hash::HashFlavor;

use std::path::Path;

/// Splits source text into classified tokens that concatenate back to the input.
pub trait Tokenizer {
    fn name(&self) -> &'static str;

    fn tokenize<'a>(&self, input: &'a str) -> Result<Vec<Token<'a>>, TokenizeError>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Grammar {
    CFamily,
    /// JavaScript and TypeScript: C-family plus regex literals.
    Script,
    Css,
    Rust,
    Python,
    Hash(HashFlavor),
    Lua,
    HaskellElm,
    Sql,
    Markup,
}

impl Tokenizer for Grammar {
    fn name(&self) -> &'static str {
        match self {
            Grammar::CFamily => "c-family",
            Grammar::Script => "javascript",
            Grammar::Css => "css",
            Grammar::Rust => "rust",
            Grammar::Python => "python",
            Grammar::Hash(HashFlavor::Shell) => "shell",
            Grammar::Hash(HashFlavor::Yaml) => "yaml",
            Grammar::Hash(HashFlavor::Ruby) => "ruby",
            Grammar::Hash(HashFlavor::Plain) => "hash",
            Grammar::Lua => "lua",
            Grammar::HaskellElm => "haskell",
            Grammar::Sql => "sql",
            Grammar::Markup => "markup",
        }
    }

    fn tokenize<'a>(&self, input: &'a str) -> Result<Vec<Token<'a>>, TokenizeError> {
        let mut spans = match self {
            Grammar::CFamily => c_family::find_comments(input)?,
            Grammar::Script => c_family::find_script_comments(input)?,
            Grammar::Css => c_family::find_block_comments(input)?,
            Grammar::Rust => rust::find_comments(input)?,
            Grammar::Python => python::find_comments(input)?,
            Grammar::Hash(flavor) => hash::find_comments(input, *flavor)?,
            Grammar::Lua => lua::find_comments(input)?,
            Grammar::HaskellElm => haskell_elm::find_comments(input)?,
            Grammar::Sql => sql::find_comments(input)?,
            Grammar::Markup => markup::find_comments(input)?,
        };
        if matches!(self, Grammar::Python | Grammar::Hash(_)) {
            common::mark_shebang(input, &mut spans);
        }
        let tokens = common::assemble(input, spans)?;
        common::verify_lossless(input, &tokens)?;
        Ok(tokens)
    }
}

const C_FAMILY_EXTENSIONS: &[&str] = &[
    "c", "h", "cpp", "cxx", "cc", "hpp", "hh", "hxx", "go", "java", "kt", "kts", "swift", "cs",
    "scala", "dart", "groovy", "gradle", "proto", "json", "jsonc", "json5", "scss", "less", "zig",
];
const SCRIPT_EXTENSIONS: &[&str] = &["js", "mjs", "cjs", "jsx", "ts", "mts", "cts", "tsx"];
const CSS_EXTENSIONS: &[&str] = &["css"];
const RUST_EXTENSIONS: &[&str] = &["rs"];
const PYTHON_EXTENSIONS: &[&str] = &["py", "pyw", "pyi"];
const SHELL_EXTENSIONS: &[&str] = &[
    "sh", "bash", "zsh", "ksh", "fish", "pl", "pm", "r", "cmake", "mk", "mak", "conf",
    "dockerfile",
];
const SHELL_SPECIAL_FILES: &[&str] = &[
    "Dockerfile",
    "Containerfile",
    "Makefile",
    "GNUmakefile",
    "makefile",
    "CMakeLists.txt",
    ".bashrc",
    ".bash_profile",
    ".zshrc",
    ".profile",
];
const YAML_EXTENSIONS: &[&str] = &["yaml", "yml"];
const RUBY_EXTENSIONS: &[&str] = &["rb", "rake", "gemspec", "ru", "cr"];
const RUBY_SPECIAL_FILES: &[&str] = &["Rakefile", "Gemfile", "Vagrantfile", "Guardfile"];
const PLAIN_HASH_EXTENSIONS: &[&str] = &["toml", "nix"];
const PLAIN_HASH_SPECIAL_FILES: &[&str] = &[".gitignore", ".dockerignore", ".gitattributes"];
const LUA_EXTENSIONS: &[&str] = &["lua"];
const HASKELL_ELM_EXTENSIONS: &[&str] = &["hs", "elm", "cabal"];
const SQL_EXTENSIONS: &[&str] = &["sql"];
const MARKUP_EXTENSIONS: &[&str] = &[
    "html", "htm", "xhtml", "xml", "svg", "vue", "md", "markdown",
];

fn grammar_for_special_file(name: &str) -> Option<Grammar> {
    if SHELL_SPECIAL_FILES.contains(&name) {
        Some(Grammar::Hash(HashFlavor::Shell))
    } else if RUBY_SPECIAL_FILES.contains(&name) {
        Some(Grammar::Hash(HashFlavor::Ruby))
    } else if PLAIN_HASH_SPECIAL_FILES.contains(&name) {
        Some(Grammar::Hash(HashFlavor::Plain))
    } else {
        None
    }
}

fn grammar_for_extension(ext: &str) -> Option<Grammar> {
    let table: &[(&[&str], Grammar)] = &[
        (C_FAMILY_EXTENSIONS, Grammar::CFamily),
        (SCRIPT_EXTENSIONS, Grammar::Script),
        (CSS_EXTENSIONS, Grammar::Css),
        (RUST_EXTENSIONS, Grammar::Rust),
        (PYTHON_EXTENSIONS, Grammar::Python),
        (SHELL_EXTENSIONS, Grammar::Hash(HashFlavor::Shell)),
        (YAML_EXTENSIONS, Grammar::Hash(HashFlavor::Yaml)),
        (RUBY_EXTENSIONS, Grammar::Hash(HashFlavor::Ruby)),
        (PLAIN_HASH_EXTENSIONS, Grammar::Hash(HashFlavor::Plain)),
        (LUA_EXTENSIONS, Grammar::Lua),
        (HASKELL_ELM_EXTENSIONS, Grammar::HaskellElm),
        (SQL_EXTENSIONS, Grammar::Sql),
        (MARKUP_EXTENSIONS, Grammar::Markup),
    ];
    table
        .iter()
        .find(|(extensions, _)| extensions.contains(&ext))
        .map(|(_, grammar)| *grammar)
}

/// Picks a grammar from a file name: well-known names first, then the lowercased extension.
pub fn lookup(path: &Path) -> Option<Grammar> {
    let name = path.file_name()?.to_string_lossy();
    if let Some(grammar) = grammar_for_special_file(&name) {
        return Some(grammar);
    }
    let ext = path.extension()?.to_string_lossy().to_lowercase();
    grammar_for_extension(&ext)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lookup_by_extension_and_special_name() {
        assert_eq!(lookup(Path::new("src/main.RS")), Some(Grammar::Rust));
        assert_eq!(lookup(Path::new("app/index.tsx")), Some(Grammar::Script));
        assert_eq!(lookup(Path::new("Main.java")), Some(Grammar::CFamily));
        assert_eq!(
            lookup(Path::new("docker/Dockerfile")),
            Some(Grammar::Hash(HashFlavor::Shell))
        );
        assert_eq!(
            lookup(Path::new("CMakeLists.txt")),
            Some(Grammar::Hash(HashFlavor::Shell))
        );
        assert_eq!(lookup(Path::new("Gemfile")), Some(Grammar::Hash(HashFlavor::Ruby)));
        assert_eq!(lookup(Path::new("notes.txt")), None);
        assert_eq!(lookup(Path::new("LICENSE")), None);
    }

    #[test]
    fn tokens_reassemble_input() {
        let src = "#!/usr/bin/env python3\nimport os  # os\n\"\"\"doc\"\"\"\n";
        let tokens = Grammar::Python.tokenize(src).unwrap();
        let joined: String = tokens.iter().map(|t| t.text).collect();
        assert_eq!(joined, src);
        assert!(tokens[0].kind.is_preproc());
        assert_eq!(tokens[0].text, "#!/usr/bin/env python3");
    }

    #[test]
    fn shebang_is_plain_code_for_c_family() {
        let src = "#!/usr/bin/env node\nconsole.log(1) // hi\n";
        let tokens = Grammar::CFamily.tokenize(src).unwrap();
        assert_eq!(tokens[0].kind, TokenKind::Code);
        assert_eq!(tokens.iter().filter(|t| t.kind.is_comment()).count(), 1);
    }

    #[test]
    fn rust_doc_comments_are_not_comment_tokens() {
        let tokens = Grammar::Rust.tokenize("/// docs\nfn f() {} // c\n").unwrap();
        let kinds: Vec<TokenKind> = tokens.iter().map(|t| t.kind).collect();
        assert_eq!(
            kinds,
            vec![
                TokenKind::Doc,
                TokenKind::Code,
                TokenKind::Comment(CommentKind::Line),
                TokenKind::Code,
            ]
        );
    }

    #[test]
    fn empty_input_has_no_tokens() {
        assert!(Grammar::Sql.tokenize("").unwrap().is_empty());
    }

    #[test]
    fn script_grammar_keeps_regex_literals() {
        let src = "const re = /https?:\\/\\//; go();\n";
        let tokens = Grammar::Script.tokenize(src).unwrap();
        assert!(tokens.iter().all(|t| !t.kind.is_comment()));
    }
}
