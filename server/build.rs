/// This makes project rebuild if migrations folder has changed.
/// Migrations are embedded into the application binary, so the
/// server must be recompiled whenever they change.
fn main() {
    println!("cargo::rerun-if-changed=migrations/");
}
