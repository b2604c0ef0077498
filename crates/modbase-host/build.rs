use std::process::Command;

fn main() {
    let version = env!("CARGO_PKG_VERSION");

    let profile = std::env::var("PROFILE").unwrap_or_default();
    let is_release = profile == "release";

    let version_str = if is_release {
        version.to_string()
    } else {
        let git_hash = Command::new("git")
            .args(["rev-parse", "--short", "HEAD"])
            .output()
            .ok()
            .filter(|output| output.status.success())
            .and_then(|output| String::from_utf8(output.stdout).ok())
            .map(|hash| hash.trim().to_string())
            .unwrap_or_else(|| "unknown".to_string());

        let is_dirty = Command::new("git")
            .args(["diff-index", "--quiet", "HEAD"])
            .output()
            .ok()
            .map(|output| !output.status.success())
            .unwrap_or(false);

        if is_dirty {
            format!("{}+{}-dirty", version, git_hash)
        } else {
            format!("{}+{}", version, git_hash)
        }
    };

    println!("cargo:rustc-env=VERSION_STRING={}", version_str);
}
