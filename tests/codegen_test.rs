//! Stub emission: rendered content, determinism, and atomic writes.

use std::fs;
use std::path::{Path, PathBuf};

use courier::compiler::{CompileError, GenerateOptions, GenerationError, parse, render, run, write};

const CALCULATOR_IDL: &str =
    include_str!(concat!(env!("CARGO_MANIFEST_DIR"), "/idl/calculator.idl"));

fn calculator_idl_path() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR")).join("idl/calculator.idl")
}

fn file_count(dir: &Path) -> usize {
    match fs::read_dir(dir) {
        Ok(entries) => entries.count(),
        Err(_) => 0,
    }
}

// ============================================================================
// Rendering
// ============================================================================

#[test]
fn client_stub_exposes_typed_methods() {
    let stubs = render(&parse(CALCULATOR_IDL).unwrap()).unwrap();
    assert_eq!(stubs.client_file, "calculator_client.rs");
    assert!(stubs.client.starts_with("// @generated by courier-gen"));
    assert!(stubs.client.contains("pub struct CalculatorClient"));
    assert!(
        stubs
            .client
            .contains("pub async fn add(&self, a: i64, b: i64) -> courier::Result<i64>")
    );
    assert!(
        stubs
            .client
            .contains("pub async fn sub(&self, a: i64, b: i64) -> courier::Result<i64>")
    );
    assert!(stubs.client.contains(r#"self.client.call("Add", params)"#));
    assert!(stubs.client.contains(r#"self.client.call("Sub", params)"#));
}

#[test]
fn server_stub_declares_trait_and_table() {
    let stubs = render(&parse(CALCULATOR_IDL).unwrap()).unwrap();
    assert_eq!(stubs.server_file, "calculator_server.rs");
    assert!(stubs.server.contains("pub trait Calculator: Send + Sync + 'static"));
    assert!(
        stubs
            .server
            .contains("fn add(&self, a: i64, b: i64) -> courier::HandlerResult<i64>;")
    );
    assert!(stubs.server.contains(r#"builder.register("Add""#));
    assert!(stubs.server.contains(r#"builder.register("Sub""#));
    assert!(
        stubs
            .server
            .contains(r#"let arg_a: i64 = courier::protocol::param(params, "a")?;"#)
    );
}

#[test]
fn methods_render_in_declaration_order() {
    let stubs = render(&parse(CALCULATOR_IDL).unwrap()).unwrap();
    let add = stubs.client.find("fn add(").unwrap();
    let sub = stubs.client.find("fn sub(").unwrap();
    assert!(add < sub);
}

#[test]
fn strings_are_borrowed_on_the_client_and_owned_on_the_server() {
    let service = parse("service Greeter\ngreet(string name) -> (string greeting);\n").unwrap();
    let stubs = render(&service).unwrap();
    assert!(
        stubs
            .client
            .contains("pub async fn greet(&self, name: &str) -> courier::Result<String>")
    );
    assert!(
        stubs
            .server
            .contains("fn greet(&self, name: String) -> courier::HandlerResult<String>;")
    );
}

#[test]
fn keyword_names_are_escaped() {
    let service = parse("service Registry\nmatch(string type) -> (bool found);\n").unwrap();
    let stubs = render(&service).unwrap();
    assert!(stubs.client.contains("pub async fn r#match(&self, r#type: &str)"));
    assert!(
        stubs
            .client
            .contains(r#"("type".to_owned(), courier::protocol::into_value(&r#type)?)"#)
    );
    assert!(stubs.server.contains(r#"builder.register("Match""#));
}

#[test]
fn service_without_methods_renders() {
    let stubs = render(&parse("service Idle\n").unwrap()).unwrap();
    assert!(stubs.server.contains("drop(service);"));
    assert!(stubs.client.contains("pub struct IdleClient"));
}

#[test]
fn rendering_is_deterministic() {
    let first = render(&parse(CALCULATOR_IDL).unwrap()).unwrap();
    let second = render(&parse(CALCULATOR_IDL).unwrap()).unwrap();
    assert_eq!(first, second);
}

#[test]
fn build_script_output_matches_render() {
    let stubs = render(&parse(CALCULATOR_IDL).unwrap()).unwrap();
    let built_client = include_str!(concat!(env!("OUT_DIR"), "/calculator_client.rs"));
    let built_server = include_str!(concat!(env!("OUT_DIR"), "/calculator_server.rs"));
    assert_eq!(stubs.client, built_client);
    assert_eq!(stubs.server, built_server);
}

// ============================================================================
// Writing
// ============================================================================

#[test]
fn run_writes_both_stubs() {
    let dir = tempfile::tempdir().unwrap();
    let options = GenerateOptions {
        input: calculator_idl_path(),
        client_dir: dir.path().join("client/stub"),
        server_dir: dir.path().join("server/stub"),
    };

    let files = run(&options).unwrap();
    assert_eq!(files.client, options.client_dir.join("calculator_client.rs"));
    assert_eq!(files.server, options.server_dir.join("calculator_server.rs"));
    assert_eq!(file_count(&options.client_dir), 1);
    assert_eq!(file_count(&options.server_dir), 1);

    let stubs = render(&parse(CALCULATOR_IDL).unwrap()).unwrap();
    assert_eq!(fs::read_to_string(&files.client).unwrap(), stubs.client);
    assert_eq!(fs::read_to_string(&files.server).unwrap(), stubs.server);
}

#[test]
fn repeated_runs_are_byte_identical() {
    let dir = tempfile::tempdir().unwrap();
    let options = GenerateOptions {
        input: calculator_idl_path(),
        client_dir: dir.path().join("client"),
        server_dir: dir.path().join("server"),
    };

    let files = run(&options).unwrap();
    let client = fs::read(&files.client).unwrap();
    let server = fs::read(&files.server).unwrap();

    run(&options).unwrap();
    assert_eq!(fs::read(&files.client).unwrap(), client);
    assert_eq!(fs::read(&files.server).unwrap(), server);
    assert_eq!(file_count(&options.client_dir), 1);
}

#[test]
fn failed_write_leaves_no_files() {
    let dir = tempfile::tempdir().unwrap();
    let blocker = dir.path().join("not-a-dir");
    fs::write(&blocker, "occupied").unwrap();

    let client_dir = dir.path().join("client");
    let server_dir = blocker.join("server");
    let stubs = render(&parse(CALCULATOR_IDL).unwrap()).unwrap();

    let err = write(&stubs, &client_dir, &server_dir).unwrap_err();
    assert!(matches!(err, GenerationError::Io { .. }));
    assert_eq!(file_count(&client_dir), 0, "staged client stub must be removed");
    assert!(!server_dir.exists());
}

#[test]
fn parse_failure_writes_nothing() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("broken.idl");
    fs::write(&input, "service Broken\nadd(int a -> (int r);\n").unwrap();

    let options = GenerateOptions {
        input,
        client_dir: dir.path().join("client"),
        server_dir: dir.path().join("server"),
    };
    let err = run(&options).unwrap_err();
    assert!(matches!(err, CompileError::Parse(_)));
    assert!(!options.client_dir.exists());
    assert!(!options.server_dir.exists());
}

#[test]
fn missing_input_is_a_read_error() {
    let dir = tempfile::tempdir().unwrap();
    let options = GenerateOptions {
        input: dir.path().join("missing.idl"),
        client_dir: dir.path().join("client"),
        server_dir: dir.path().join("server"),
    };
    assert!(matches!(run(&options), Err(CompileError::Read { .. })));
}
