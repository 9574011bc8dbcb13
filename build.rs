use vergen::EmitBuilder;

fn main() {
    // build timestamp for `--version`
    EmitBuilder::builder()
        .all_build()
        .emit()
        .expect("Failed to generate build information");
}
