fn main() {
    // Stamp the build date into `tangle --version`
    let build_date = chrono::Utc::now().format("%Y-%m-%d").to_string();
    println!("cargo:rustc-env=TANGLE_BUILD_DATE={}", build_date);

    println!("cargo:rerun-if-changed=Cargo.toml");
}
