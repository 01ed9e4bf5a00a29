fn main() {
    println!("cargo:rerun-if-changed=.git/HEAD");

    let output = std::process::Command::new("git")
        .args(["describe", "--always", "--dirty"])
        .output();

    let version = match output {
        Ok(o) if o.status.success() => String::from_utf8_lossy(&o.stdout).trim().to_string(),
        _ => "dev".to_string(),
    };

    println!("cargo:rustc-env=GIT_VERSION={}", version);
}
