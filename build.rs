use anyhow::Error;
use vergen_gitcl::{Emitter, GitclBuilder};

fn main() -> Result<(), Error> {
    // sqlx::migrate! embeds these at compile time
    println!("cargo:rerun-if-changed=migrations");

    // release pipelines build from a tarball and pass the commit in explicitly
    match std::env::var("VERGEN_GIT_SHA") {
        Ok(sha) if sha != "unknown" => {
            println!("cargo:rustc-env=VERGEN_GIT_SHA={sha}");
            println!("cargo:rustc-env=VERGEN_GIT_DIRTY=false");
        }
        _ => {
            let gitcl = GitclBuilder::default().sha(true).dirty(false).build()?;

            Emitter::default().add_instructions(&gitcl)?.emit()?;
        }
    }

    Ok(())
}
