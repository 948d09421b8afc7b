#![forbid(unsafe_code)]

// Build metadata logged by hello_server at startup.
fn main() {
    build_data::set_GIT_BRANCH();
    build_data::set_GIT_COMMIT_SHORT();
    build_data::set_GIT_DIRTY();
    build_data::set_SOURCE_TIMESTAMP();  // BUILD_TIMESTAMP would make builds unreproducible.
    build_data::set_RUSTC_VERSION();
}
