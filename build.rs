fn main() {
    // The webview shell only exists behind the `desktop` feature; headless
    // builds of the journal core skip the Tauri codegen entirely.
    if std::env::var_os("CARGO_FEATURE_DESKTOP").is_some() {
        tauri_build::build()
    }
}
