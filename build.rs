fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Vendored protoc so builds do not depend on a system install
    std::env::set_var("PROTOC", protoc_bin_vendored::protoc_bin_path()?);

    let proto_files: Vec<_> = std::fs::read_dir("proto")?
        .filter_map(|e| e.ok())
        .filter(|e| e.path().extension().is_some_and(|ext| ext == "proto"))
        .map(|e| e.path())
        .collect();

    tonic_prost_build::configure()
        .build_server(true)
        .build_client(true)
        .compile_protos(&proto_files, &[std::path::PathBuf::from("proto")])?;

    println!("cargo:rerun-if-changed=proto/");
    Ok(())
}
