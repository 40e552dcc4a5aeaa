//! Service model produced by the parser and consumed by the emitter.
//!
//! Methods, parameters and returns are ordered sequences: emitted code
//! follows declaration order, so identical models render identical stubs.

use std::fmt;

/// Types a parameter or return value may carry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PrimitiveType {
    Int,
    Float,
    String,
    Bool,
}

impl PrimitiveType {
    /// Resolve an IDL type token.
    pub fn from_token(token: &str) -> Option<Self> {
        match token {
            "int" => Some(Self::Int),
            "float" => Some(Self::Float),
            "string" => Some(Self::String),
            "bool" => Some(Self::Bool),
            _ => None,
        }
    }

    /// The IDL spelling of this type.
    pub const fn idl_name(self) -> &'static str {
        match self {
            Self::Int => "int",
            Self::Float => "float",
            Self::String => "string",
            Self::Bool => "bool",
        }
    }

    /// Owned Rust type, used for server-side arguments and all return values.
    pub const fn rust_type(self) -> &'static str {
        match self {
            Self::Int => "i64",
            Self::Float => "f64",
            Self::String => "String",
            Self::Bool => "bool",
        }
    }

    /// Rust type for client-side arguments; strings are borrowed.
    pub const fn rust_arg_type(self) -> &'static str {
        match self {
            Self::String => "&str",
            other => other.rust_type(),
        }
    }
}

impl fmt::Display for PrimitiveType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.idl_name())
    }
}

/// A named, typed parameter or return value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Field {
    pub name: String,
    pub ty: PrimitiveType,
}

impl Field {
    pub fn new(name: impl Into<String>, ty: PrimitiveType) -> Self {
        Self {
            name: name.into(),
            ty,
        }
    }
}

/// One RPC method. `name` is the exported (wire) form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Method {
    pub name: String,
    pub params: Vec<Field>,
    pub returns: Vec<Field>,
}

impl Method {
    /// Rust function name for this method (`GetUser` -> `get_user`).
    pub fn fn_name(&self) -> String {
        rust_ident(&snake_case(&self.name))
    }
}

/// A parsed and validated service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Service {
    pub name: String,
    pub methods: Vec<Method>,
}

impl Service {
    /// Rust type name used for the generated trait and client.
    pub fn type_name(&self) -> String {
        rust_ident(&export_name(&self.name))
    }

    /// File stem for the generated stubs (`Calculator` -> `calculator`).
    pub fn file_stem(&self) -> String {
        snake_case(&self.name)
    }

    /// Look up a method by its exported name.
    pub fn method(&self, name: &str) -> Option<&Method> {
        self.methods.iter().find(|method| method.name == name)
    }
}

/// Export a name by uppercasing its first character.
pub fn export_name(name: &str) -> String {
    let mut chars = name.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// Convert an identifier to snake_case, splitting before an uppercase letter
/// that follows a lowercase letter or digit.
pub fn snake_case(name: &str) -> String {
    let mut out = String::with_capacity(name.len() + 4);
    let mut prev: Option<char> = None;
    for c in name.chars() {
        if c.is_ascii_uppercase() {
            if prev.is_some_and(|p| p.is_ascii_lowercase() || p.is_ascii_digit()) {
                out.push('_');
            }
            out.push(c.to_ascii_lowercase());
        } else {
            out.push(c);
        }
        prev = Some(c);
    }
    out
}

/// Make `name` usable as a Rust identifier.
pub fn rust_ident(name: &str) -> String {
    match name {
        "self" | "Self" | "super" | "crate" | "_" => format!("{name}_"),
        _ if RUST_KEYWORDS.contains(&name) => format!("r#{name}"),
        _ => name.to_owned(),
    }
}

const RUST_KEYWORDS: &[&str] = &[
    "abstract", "as", "async", "await", "become", "box", "break", "const", "continue", "do",
    "dyn", "else", "enum", "extern", "false", "final", "fn", "for", "gen", "if", "impl", "in",
    "let", "loop", "macro", "match", "mod", "move", "mut", "override", "priv", "pub", "ref",
    "return", "static", "struct", "trait", "true", "try", "type", "typeof", "unsafe", "unsized",
    "use", "virtual", "where", "while", "yield",
];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn export_uppercases_first_letter_only() {
        assert_eq!(export_name("add"), "Add");
        assert_eq!(export_name("getUser"), "GetUser");
        assert_eq!(export_name("Sub"), "Sub");
        assert_eq!(export_name("_hidden"), "_hidden");
        assert_eq!(export_name(""), "");
    }

    #[test]
    fn snake_case_splits_words() {
        assert_eq!(snake_case("Add"), "add");
        assert_eq!(snake_case("GetUserName"), "get_user_name");
        assert_eq!(snake_case("Sha256Sum"), "sha256_sum");
        assert_eq!(snake_case("already_snake"), "already_snake");
    }

    #[test]
    fn keywords_are_escaped() {
        assert_eq!(rust_ident("type"), "r#type");
        assert_eq!(rust_ident("self"), "self_");
        assert_eq!(rust_ident("Self"), "Self_");
        assert_eq!(rust_ident("value"), "value");
    }

    #[test]
    fn type_tokens() {
        assert_eq!(PrimitiveType::from_token("int"), Some(PrimitiveType::Int));
        assert_eq!(PrimitiveType::from_token("double"), None);
        assert_eq!(PrimitiveType::String.rust_arg_type(), "&str");
        assert_eq!(PrimitiveType::String.rust_type(), "String");
        assert_eq!(PrimitiveType::Float.rust_arg_type(), "f64");
    }

    #[test]
    fn method_fn_name() {
        let method = Method {
            name: "Type".into(),
            params: vec![],
            returns: vec![Field::new("r", PrimitiveType::Bool)],
        };
        assert_eq!(method.fn_name(), "r#type");
    }
}
