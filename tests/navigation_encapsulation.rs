//! The URL state broker is the only place in the crate permitted to
//! depend on `NavigationBackend` directly. Every other subsystem must go
//! through `UrlStateBroker::{set_params, clear_params, snapshot}` instead.
//!
//! This is a static-text conformance check rather than a runtime assertion:
//! nothing about Rust's type system stops a second module from importing
//! the trait, so the invariant is enforced the same way a lint rule would
//! be — by scanning the source tree.

use std::fs;
use std::path::Path;

fn rust_files_under(dir: &Path) -> Vec<std::path::PathBuf> {
    let mut files = Vec::new();
    for entry in fs::read_dir(dir).unwrap_or_else(|e| panic!("reading {}: {e}", dir.display())) {
        let entry = entry.unwrap();
        let path = entry.path();
        if path.is_dir() {
            files.extend(rust_files_under(&path));
        } else if path.extension().is_some_and(|ext| ext == "rs") {
            files.push(path);
        }
    }
    files
}

#[test]
fn only_the_broker_module_names_navigation_backend() {
    let src_dir = Path::new(env!("CARGO_MANIFEST_DIR")).join("src");
    let broker_dir = src_dir.join("broker");
    let testing_dir = src_dir.join("testing");
    let lib_rs = src_dir.join("lib.rs");

    for path in rust_files_under(&src_dir) {
        if path.starts_with(&broker_dir) || path.starts_with(&testing_dir) || path == lib_rs {
            // The broker module is the trait's home; `testing` provides the
            // in-memory fake implementation used to construct a broker in
            // tests; `lib.rs` only re-exports the type name for downstream
            // callers to name without depending on its internals.
            continue;
        }
        let contents = fs::read_to_string(&path).unwrap();
        assert!(
            !contents.contains("NavigationBackend"),
            "{} references NavigationBackend directly; only the broker (and its \
             test fakes) may depend on the navigation primitive — route through \
             UrlStateBroker instead",
            path.display()
        );
    }
}
