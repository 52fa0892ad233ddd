#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("resource kind field error")]
    KindField,
    #[error("decoding {kind}")]
    Decode {
        kind: &'static str,
        #[source]
        source: serde_json::Error,
    },
    #[error("encoding {kind}")]
    Encode {
        kind: &'static str,
        #[source]
        source: serde_json::Error,
    },
    #[error("{key} field of {section} config need to be set")]
    MissingTag {
        section: &'static str,
        key: &'static str,
    },
    #[error("unsupported type of volume config: {0}")]
    UnsupportedVolumeType(String),
    #[error("unsupported provisioner of storageclass config: {0}")]
    UnsupportedProvisioner(String),
    #[error("alibabacloud {target} config is invalid. {fields} should not be empty")]
    EmptyFields {
        target: &'static str,
        fields: &'static str,
    },
    #[error("unsupported alibabacloud Disk volume fsType: {0}")]
    UnsupportedFsType(String),
    #[error("unsupported alibabacloud Disk StorageClass type: {0}")]
    UnsupportedDiskType(String),
    #[error(r#"unsupported nfs version {0}, "3" or "4.0" are supported"#)]
    UnsupportedNfsVersion(String),
    #[error("drivertype {0} is illegal for alibabacloud ACK NAS StorageClass")]
    IllegalDriverType(String),
    #[error("mountOptions field should not be empty")]
    EmptyMountOptions,
    #[error("cannot change the image as it's not a string")]
    ImageNotString,
}
