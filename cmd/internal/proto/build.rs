fn main() {
    let method = |name: &str, route: &str, input: &str, output: &str| {
        tonic_build::manual::Method::builder()
            .name(name)
            .route_name(route)
            .input_type(input)
            .output_type(output)
            .codec_path("tonic::codec::ProstCodec")
            .build()
    };

    let locker = tonic_build::manual::Service::builder()
        .name("Locker")
        .package("dsync")
        .method(method("login", "Login", "crate::lock::LoginArgs", "crate::lock::LoginReply"))
        .method(method("lock", "Lock", "crate::lock::LockArgs", "crate::lock::LockReply"))
        .method(method("unlock", "Unlock", "crate::lock::LockArgs", "crate::lock::LockReply"))
        .method(method("r_lock", "RLock", "crate::lock::LockArgs", "crate::lock::LockReply"))
        .method(method("r_unlock", "RUnlock", "crate::lock::LockArgs", "crate::lock::LockReply"))
        .build();

    let disk_format = tonic_build::manual::Service::builder()
        .name("DiskFormat")
        .package("storage")
        .method(method(
            "load_format",
            "LoadFormat",
            "crate::storage::LoadFormatArgs",
            "crate::storage::LoadFormatReply",
        ))
        .method(method(
            "save_format",
            "SaveFormat",
            "crate::storage::SaveFormatArgs",
            "crate::storage::SaveFormatReply",
        ))
        .build();

    tonic_build::manual::Builder::new().compile(&[locker, disk_format]);
    println!("cargo:rerun-if-changed=build.rs");
}
