/// The crate version, tagged with the git commit when the build had one.
pub fn get_version() -> String {
    let version = env!("CARGO_PKG_VERSION");
    let sha = env!("VERGEN_GIT_SHA");

    // vergen falls back to this placeholder when the build has no git metadata
    if sha == "VERGEN_IDEMPOTENT_OUTPUT" {
        return version.to_string();
    }

    if env!("VERGEN_GIT_DIRTY") == "true" {
        format!("{version} ({sha}, dirty)")
    } else {
        format!("{version} ({sha})")
    }
}
