fn main() {
    // The bundled configuration is baked into the firmware image with
    // `include_str!`; rebuild when it changes.
    println!("cargo:rerun-if-changed=config/default.json");

    #[cfg(feature = "espidf")]
    embuild::espidf::sysenv::output();
}
