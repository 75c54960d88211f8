fn main() -> Result<(), Box<dyn std::error::Error>> {
    println!("cargo:rerun-if-changed=proto/raft.proto");

    tonic_build::compile_protos("proto/raft.proto")?;
    Ok(())
}
