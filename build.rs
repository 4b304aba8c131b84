use std::env;

const LIBRARY_DIR_VAR: &str = "ROBOT_CONTROLLER_LIB_DIR";
const LIBRARY_NAME_VAR: &str = "ROBOT_CONTROLLER_LIB_NAME";
const DEFAULT_LIBRARY_NAME: &str = "robot_controller";

fn main() {
    println!("cargo::rerun-if-env-changed={LIBRARY_DIR_VAR}");
    println!("cargo::rerun-if-env-changed={LIBRARY_NAME_VAR}");

    if env::var_os("CARGO_FEATURE_NATIVE_CONTROLLER").is_none() {
        return;
    }

    let library_dir = env::var(LIBRARY_DIR_VAR)
        .unwrap_or_else(|_| panic!("{LIBRARY_DIR_VAR} must point to the controller library"));
    let library_name =
        env::var(LIBRARY_NAME_VAR).unwrap_or_else(|_| DEFAULT_LIBRARY_NAME.to_string());

    println!("cargo::rerun-if-changed={library_dir}");
    println!("cargo::rustc-link-search={library_dir}");
    println!("cargo::rustc-link-lib=static={library_name}");
}
