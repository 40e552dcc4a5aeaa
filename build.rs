use std::path::PathBuf;

use vergen_gitcl::{Build, Cargo, Emitter, Gitcl};

// Same compiler courier-gen runs; emits the Calculator stubs into OUT_DIR.
#[path = "src/compiler/mod.rs"]
#[allow(dead_code, unused_imports)]
mod compiler;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let build = Build::builder().build_timestamp(true).build();
    let cargo = Cargo::builder().build();
    let gitcl = Gitcl::builder().sha(true).build();

    Emitter::default()
        .add_instructions(&build)?
        .add_instructions(&cargo)?
        .add_instructions(&gitcl)?
        .emit()?;

    println!("cargo:rerun-if-changed=idl");
    println!("cargo:rerun-if-changed=templates");
    println!("cargo:rerun-if-changed=src/compiler");

    let out_dir = PathBuf::from(std::env::var("OUT_DIR")?);
    compiler::run(&compiler::GenerateOptions {
        input: PathBuf::from("idl/calculator.idl"),
        client_dir: out_dir.clone(),
        server_dir: out_dir,
    })?;

    Ok(())
}
