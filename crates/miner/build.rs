fn main() {
    // If MIDAS_VERSION is set during the build (e.g., in CI),
    // pass it to the rustc compiler.
    if let Ok(version) = std::env::var("MIDAS_VERSION") {
        println!("cargo:rustc-env=MIDAS_VERSION={}", version);
    }
}
