use std::env;
use std::path::Path;

fn main() {
    // 告诉 cargo 在 build.rs 变化时重新运行
    println!("cargo:rerun-if-changed=build.rs");

    // 主机测试 (无 firmware feature) 不需要链接脚本
    if env::var_os("CARGO_FEATURE_FIRMWARE").is_none() {
        return;
    }

    // 添加 ld 目录到链接路径（如果有自定义链接脚本）
    if let Some(manifest_dir) = env::var_os("CARGO_MANIFEST_DIR") {
        let ld_dir = Path::new(&manifest_dir).join("ld");
        if ld_dir.is_dir() {
            println!("cargo:rerun-if-changed={}", ld_dir.display());
            println!("cargo:rustc-link-search={}", ld_dir.display());
        }
    }
}
