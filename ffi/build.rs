use std::env;
use std::path::PathBuf;

fn main() {
    println!("cargo:rerun-if-changed=src/lib.rs");
    println!("cargo:rerun-if-changed=src/types.rs");

    let crate_dir = env::var("CARGO_MANIFEST_DIR").unwrap_or_else(|_| ".".to_string());
    let Ok(out_dir) = env::var("OUT_DIR") else {
        println!("cargo:warning=OUT_DIR not set, header not generated");
        return;
    };
    let include = PathBuf::from(out_dir).join("include");
    if let Err(err) = std::fs::create_dir_all(&include) {
        println!("cargo:warning=cannot create {}: {err}", include.display());
        return;
    }

    // A header failure must not break the Rust build; the library is still usable.
    match cbindgen::Builder::new()
        .with_crate(&crate_dir)
        .with_language(cbindgen::Language::C)
        .with_include_guard("LAUNCHER_H")
        .generate()
    {
        Ok(bindings) => {
            let header = include.join("launcher.h");
            bindings.write_to_file(&header);
        }
        Err(err) => println!("cargo:warning=header not generated: {err}"),
    }
}
