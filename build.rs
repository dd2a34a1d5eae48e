fn main() {
    println!("cargo:rerun-if-changed=config/espsense.json");

    // ESP-IDF link arguments are only needed for device builds.
    #[cfg(feature = "espidf")]
    if std::env::var("CARGO_CFG_TARGET_OS").as_deref() == Ok("espidf") {
        embuild::espidf::sysenv::output();
    }
}
