/// SpyLab entry point for native builds
#[cfg(not(target_arch = "wasm32"))]
fn main() {
    spylab::native::main();
}

// WASM doesn't use main(), it uses wasm_bindgen's start function
#[cfg(target_arch = "wasm32")]
fn main() {}
