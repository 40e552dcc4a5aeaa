//! Stub emission.
//!
//! Rendering is pure: the askama templates under `templates/` are filled
//! from a view of the [`Service`] built in declaration order. Writing stages
//! both stubs in temporary files next to their destinations and renames
//! them into place only once both are complete.

use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use askama::Template;
use tempfile::NamedTempFile;
use tracing::debug;

use super::error::GenerationError;
use super::model::{Field, Method, Service, rust_ident};

/// Rendered stub sources, not yet written anywhere.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedStubs {
    pub client_file: String,
    pub client: String,
    pub server_file: String,
    pub server: String,
}

/// Paths of stubs written by a successful run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneratedFiles {
    pub client: PathBuf,
    pub server: PathBuf,
}

#[derive(Template)]
#[template(path = "client_stub.rs.txt", escape = "none")]
struct ClientStub<'a> {
    service: &'a str,
    type_name: &'a str,
    methods: &'a [MethodView],
}

#[derive(Template)]
#[template(path = "server_stub.rs.txt", escape = "none")]
struct ServerStub<'a> {
    service: &'a str,
    type_name: &'a str,
    methods: &'a [MethodView],
}

struct MethodView {
    wire_name: String,
    fn_name: String,
    return_type: &'static str,
    params: Vec<ParamView>,
    /// Closure argument name; underscored when the method takes nothing.
    params_binding: &'static str,
    call_args: String,
}

struct ParamView {
    name: String,
    ident: String,
    local: String,
    owned_type: &'static str,
    arg_type: &'static str,
}

impl From<&Field> for ParamView {
    fn from(field: &Field) -> Self {
        Self {
            name: field.name.clone(),
            ident: rust_ident(&field.name),
            local: format!("arg_{}", field.name),
            owned_type: field.ty.rust_type(),
            arg_type: field.ty.rust_arg_type(),
        }
    }
}

impl From<&Method> for MethodView {
    fn from(method: &Method) -> Self {
        let params: Vec<ParamView> = method.params.iter().map(ParamView::from).collect();
        let call_args = params
            .iter()
            .map(|param| param.local.as_str())
            .collect::<Vec<_>>()
            .join(", ");
        Self {
            wire_name: method.name.clone(),
            fn_name: method.fn_name(),
            return_type: method
                .returns
                .first()
                .map_or("()", |field| field.ty.rust_type()),
            params_binding: if params.is_empty() { "_params" } else { "params" },
            params,
            call_args,
        }
    }
}

/// Render the client and server stubs for `service`.
pub fn render(service: &Service) -> Result<RenderedStubs, GenerationError> {
    let type_name = service.type_name();
    let methods: Vec<MethodView> = service.methods.iter().map(MethodView::from).collect();
    let stem = service.file_stem();

    let client = ClientStub {
        service: &service.name,
        type_name: &type_name,
        methods: &methods,
    }
    .render()
    .map_err(|source| GenerationError::Render {
        stub: "client",
        source,
    })?;

    let server = ServerStub {
        service: &service.name,
        type_name: &type_name,
        methods: &methods,
    }
    .render()
    .map_err(|source| GenerationError::Render {
        stub: "server",
        source,
    })?;

    debug!(
        service = %service.name,
        client_bytes = client.len(),
        server_bytes = server.len(),
        "rendered stubs"
    );

    Ok(RenderedStubs {
        client_file: format!("{stem}_client.rs"),
        client,
        server_file: format!("{stem}_server.rs"),
        server,
    })
}

/// Write rendered stubs into their output directories.
///
/// Both files are fully written to temporaries before either is renamed
/// into place. On failure the temporaries are removed.
pub fn write(
    stubs: &RenderedStubs,
    client_dir: &Path,
    server_dir: &Path,
) -> Result<GeneratedFiles, GenerationError> {
    let client = stage(client_dir, &stubs.client)?;
    let server = stage(server_dir, &stubs.server)?;

    let files = GeneratedFiles {
        client: client_dir.join(&stubs.client_file),
        server: server_dir.join(&stubs.server_file),
    };
    persist(client, &files.client)?;
    persist(server, &files.server)?;
    Ok(files)
}

fn stage(dir: &Path, contents: &str) -> Result<NamedTempFile, GenerationError> {
    let io_error = |source: io::Error| GenerationError::Io {
        path: dir.to_path_buf(),
        source,
    };

    fs::create_dir_all(dir).map_err(io_error)?;
    let mut file = NamedTempFile::new_in(dir).map_err(io_error)?;
    file.write_all(contents.as_bytes()).map_err(io_error)?;
    file.as_file().sync_all().map_err(io_error)?;
    Ok(file)
}

fn persist(file: NamedTempFile, path: &Path) -> Result<(), GenerationError> {
    file.persist(path).map_err(|e| GenerationError::Io {
        path: path.to_path_buf(),
        source: e.error,
    })?;
    debug!(path = %path.display(), "stub written");
    Ok(())
}
