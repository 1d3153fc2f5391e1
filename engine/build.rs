fn main() -> Result<(), Box<dyn std::error::Error>> {
    println!("cargo:rerun-if-changed=proto/backtester.proto");
    tonic_build::configure()
        .build_server(true) // Engine serves it
        .build_client(true) // GUI and tests call it
        .compile(&["proto/backtester.proto"], &["proto"])?;
    Ok(())
}
