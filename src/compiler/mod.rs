//! IDL-to-stub compiler.
//!
//! The pipeline is `tokenize -> parse -> render -> write`:
//!
//! - [`parse`] turns IDL text into a validated [`Service`] or a located
//!   [`ParseError`].
//! - [`render`] fills the client and server stub templates from the model.
//! - [`write`] places both stubs atomically in their output directories.
//! - [`run`] chains the three for one IDL file.
//!
//! This module only refers to its own submodules and external crates;
//! `build.rs` includes it by path to compile `idl/calculator.idl`.

mod emitter;
mod error;
mod lexer;
mod model;
mod parser;

use std::fs;
use std::path::PathBuf;

use tracing::info;

pub use emitter::{GeneratedFiles, RenderedStubs, render, write};
pub use error::{CompileError, GenerationError, ParseError, ParseErrorKind};
pub use lexer::{LexError, Token, TokenKind, tokenize};
pub use model::{Field, Method, PrimitiveType, Service, export_name, rust_ident, snake_case};
pub use parser::parse;

/// Inputs and outputs of one generation run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenerateOptions {
    /// IDL source file.
    pub input: PathBuf,
    /// Directory receiving `<service>_client.rs`.
    pub client_dir: PathBuf,
    /// Directory receiving `<service>_server.rs`.
    pub server_dir: PathBuf,
}

impl Default for GenerateOptions {
    fn default() -> Self {
        Self {
            input: PathBuf::from("idl/calculator.idl"),
            client_dir: PathBuf::from("client/stub"),
            server_dir: PathBuf::from("server/stub"),
        }
    }
}

/// Read, parse, render and write the stubs described by `options`.
pub fn run(options: &GenerateOptions) -> Result<GeneratedFiles, CompileError> {
    let source = fs::read_to_string(&options.input).map_err(|source| CompileError::Read {
        path: options.input.clone(),
        source,
    })?;

    let service = parse(&source)?;
    info!(
        service = %service.name,
        methods = service.methods.len(),
        input = %options.input.display(),
        "parsed IDL"
    );

    let stubs = render(&service)?;
    let files = write(&stubs, &options.client_dir, &options.server_dir)?;
    info!(
        client = %files.client.display(),
        server = %files.server.display(),
        "stubs generated"
    );
    Ok(files)
}
