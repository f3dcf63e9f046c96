use std::env;
use std::path::PathBuf;

// Distribution builds can bake in non-default database locations without
// patching the source: HWCONF_DB_DIR_HINT / HWCONF_LOCAL_DIR_HINT.
fn main() {
    for name in ["HWCONF_DB_DIR_HINT", "HWCONF_LOCAL_DIR_HINT"] {
        println!("cargo:rerun-if-env-changed={name}");

        if let Ok(raw_hint) = env::var(name) {
            if raw_hint.trim().is_empty() {
                continue;
            }
            let candidate = PathBuf::from(raw_hint);
            let canonical = candidate.canonicalize().unwrap_or(candidate);

            println!("cargo:rustc-env={name}={}", canonical.display());
        }
    }
}
