use std::env;
use std::path::PathBuf;

fn main() {
    // libbcm_host only ships with the Raspberry Pi firmware userland. When it
    // is missing we still build, and the backend reports itself unavailable.
    println!("cargo:rustc-check-cfg=cfg(bcm_host)");
    println!("cargo:rerun-if-env-changed=BCM_HOST_LIB_DIR");

    if env::var("CARGO_CFG_TARGET_OS").as_deref() != Ok("linux") {
        return;
    }

    let lib_dir = env::var("BCM_HOST_LIB_DIR")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("/opt/vc/lib"));

    if lib_dir.join("libbcm_host.so").exists() {
        println!("cargo:rustc-link-search=native={}", lib_dir.display());
        println!("cargo:rustc-link-lib=dylib=bcm_host");
        println!("cargo:rustc-cfg=bcm_host");
    } else {
        println!(
            "cargo:warning=libbcm_host.so not found in {}; building without DispmanX",
            lib_dir.display()
        );
    }
}
