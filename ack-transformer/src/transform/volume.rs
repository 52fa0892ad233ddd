use std::{collections::BTreeMap, fmt, str::FromStr};

use indexmap::IndexMap;
use k8s_openapi::api::core::v1::{
    FlexPersistentVolumeSource, PersistentVolume, PersistentVolumeSpec,
};

use crate::{
    Error,
    config::{Attributes, Str},
    resource::{self, Object},
};

use super::{Outcome, Transformer, TypedTransformer};

pub const TRANSFORM_TO_KEY: &str = "transform_to";

const ZONE_LABEL: &str = "failure-domain.beta.kubernetes.io/zone";
const REGION_LABEL: &str = "failure-domain.beta.kubernetes.io/region";

const DISK_FS_TYPES: [&str; 4] = ["ext4", "ext3", "xfs", "vfat"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VolumeTarget {
    Oss,
    Disk,
    Nas,
}

impl VolumeTarget {
    pub fn driver(self) -> &'static str {
        match self {
            VolumeTarget::Oss => "alicloud/oss",
            VolumeTarget::Disk => "alicloud/disk",
            VolumeTarget::Nas => "alicloud/nas",
        }
    }
}

impl FromStr for VolumeTarget {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "OSS" => Ok(VolumeTarget::Oss),
            "DISK" => Ok(VolumeTarget::Disk),
            "NAS" => Ok(VolumeTarget::Nas),
            _ => Err(Error::UnsupportedVolumeType(s.to_owned())),
        }
    }
}

impl fmt::Display for VolumeTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            VolumeTarget::Oss => write!(f, "OSS"),
            VolumeTarget::Disk => write!(f, "DISK"),
            VolumeTarget::Nas => write!(f, "NAS"),
        }
    }
}

/// Turns configured PersistentVolumes into Alibaba Cloud flex volumes.
pub struct PersistentVolumeTransformer<'a>(pub &'a IndexMap<Str, Attributes>);

impl TypedTransformer for PersistentVolumeTransformer<'_> {
    type Resource = PersistentVolume;

    #[tracing::instrument(skip_all, name = "pv_transform", fields(pv = resource::typed_name(&*pv)))]
    fn transform_typed(&self, pv: &mut PersistentVolume) -> Result<Outcome, Error> {
        let Some(attrs) = self.0.get(resource::typed_name(&*pv)) else {
            tracing::debug!("no volume config, leaving PersistentVolume as is");
            return Ok(Outcome::Unchanged);
        };

        let target = attrs
            .get(TRANSFORM_TO_KEY)
            .ok_or(Error::MissingTag {
                section: "volume",
                key: TRANSFORM_TO_KEY,
            })?
            .parse::<VolumeTarget>()?;

        match target {
            VolumeTarget::Oss => oss_volume(pv, attrs)?,
            VolumeTarget::Disk => disk_volume(pv, attrs)?,
            VolumeTarget::Nas => nas_volume(pv, attrs)?,
        }

        tracing::debug!(%target, "rewrote volume source");
        Ok(Outcome::Rewritten)
    }
}

impl Transformer for PersistentVolumeTransformer<'_> {
    fn transform(&self, object: &mut Object) -> Result<Outcome, Error> {
        super::apply_typed(self, object)
    }
}

fn oss_volume(pv: &mut PersistentVolume, attrs: &Attributes) -> Result<(), Error> {
    const REQUIRED: [&str; 4] = ["bucket", "url", "akId", "akSecret"];

    if REQUIRED.iter().any(|key| attrs.value(key).is_empty()) {
        return Err(Error::EmptyFields {
            target: "OSS volume",
            fields: "bucket, url, akId, akSecret",
        });
    }

    let flex = reset_volume_source(pv, VolumeTarget::Oss);
    let options = flex.options.get_or_insert_default();
    for key in REQUIRED.into_iter().chain(["otherOpts"]) {
        options.insert(key.to_owned(), attrs.value(key).to_owned());
    }

    Ok(())
}

fn disk_volume(pv: &mut PersistentVolume, attrs: &Attributes) -> Result<(), Error> {
    let [region, zone, fs_type, volume_id] =
        ["region", "zone", "fsType", "volumeId"].map(|key| attrs.value(key));

    if [region, zone, fs_type, volume_id].iter().any(|v| v.is_empty()) {
        return Err(Error::EmptyFields {
            target: "Disk volume",
            fields: "region, zone, fsType, volumeId",
        });
    }

    if !DISK_FS_TYPES.contains(&fs_type) {
        return Err(Error::UnsupportedFsType(fs_type.to_owned()));
    }

    pv.metadata.labels = Some(BTreeMap::from([
        (ZONE_LABEL.to_owned(), zone.to_owned()),
        (REGION_LABEL.to_owned(), region.to_owned()),
    ]));

    let flex = reset_volume_source(pv, VolumeTarget::Disk);
    flex.fs_type = Some(fs_type.to_owned());
    flex.options
        .get_or_insert_default()
        .insert("volumeId".to_owned(), volume_id.to_owned());

    Ok(())
}

fn nas_volume(pv: &mut PersistentVolume, attrs: &Attributes) -> Result<(), Error> {
    let [server, path, vers] = ["server", "path", "vers"].map(|key| attrs.value(key));

    if server.is_empty() || path.is_empty() {
        return Err(Error::EmptyFields {
            target: "NAS volume",
            fields: "server, path",
        });
    }
    super::validate_nfs_version(vers)?;

    let flex = reset_volume_source(pv, VolumeTarget::Nas);
    let options = flex.options.get_or_insert_default();
    options.insert("server".to_owned(), server.to_owned());
    options.insert("path".to_owned(), path.to_owned());
    if !vers.is_empty() {
        options.insert("vers".to_owned(), vers.to_owned());
    }

    Ok(())
}

/// Clears every member of the volume source union and leaves an empty flex volume for
/// `target` as the only member. Mount options are reset as well.
fn reset_volume_source(
    pv: &mut PersistentVolume,
    target: VolumeTarget,
) -> &mut FlexPersistentVolumeSource {
    let spec = pv.spec.take().unwrap_or_default();
    let spec = pv.spec.insert(PersistentVolumeSpec {
        access_modes: spec.access_modes,
        capacity: spec.capacity,
        claim_ref: spec.claim_ref,
        node_affinity: spec.node_affinity,
        persistent_volume_reclaim_policy: spec.persistent_volume_reclaim_policy,
        storage_class_name: spec.storage_class_name,
        volume_attributes_class_name: spec.volume_attributes_class_name,
        volume_mode: spec.volume_mode,
        mount_options: Some(vec![]),
        ..Default::default()
    });

    spec.flex_volume.insert(FlexPersistentVolumeSource {
        driver: target.driver().to_owned(),
        options: Some(BTreeMap::new()),
        ..Default::default()
    })
}

#[cfg(test)]
mod tests {
    use serde_json::{Value, json};

    use super::*;
    use crate::{config::TransformConfig, resource::object};

    fn config(volumes: Value) -> TransformConfig {
        serde_json::from_value(json!({ "PersistentVolume": volumes })).unwrap()
    }

    fn nfs_pv(name: &str) -> PersistentVolume {
        serde_json::from_value(json!({
            "apiVersion": "v1",
            "kind": "PersistentVolume",
            "metadata": { "name": name, "labels": { "app": "db" } },
            "spec": {
                "capacity": { "storage": "20Gi" },
                "accessModes": ["ReadWriteMany"],
                "persistentVolumeReclaimPolicy": "Retain",
                "storageClassName": "nfs",
                "mountOptions": ["hard"],
                "nfs": { "server": "10.0.0.1", "path": "/exports" },
            },
        }))
        .unwrap()
    }

    fn transform(config: &TransformConfig, pv: &mut PersistentVolume) -> Result<Outcome, Error> {
        PersistentVolumeTransformer(&config.persistent_volumes).transform_typed(pv)
    }

    fn flex(pv: &PersistentVolume) -> &FlexPersistentVolumeSource {
        pv.spec.as_ref().and_then(|spec| spec.flex_volume.as_ref()).unwrap()
    }

    fn options(pv: &PersistentVolume) -> Value {
        serde_json::to_value(&flex(pv).options).unwrap()
    }

    /// The volume source members that are set, as their serialized keys.
    fn volume_sources(pv: &PersistentVolume) -> Vec<String> {
        const NOT_SOURCES: [&str; 9] = [
            "accessModes",
            "capacity",
            "claimRef",
            "mountOptions",
            "nodeAffinity",
            "persistentVolumeReclaimPolicy",
            "storageClassName",
            "volumeAttributesClassName",
            "volumeMode",
        ];

        let spec = serde_json::to_value(&pv.spec).unwrap();
        spec.as_object()
            .unwrap()
            .keys()
            .filter(|key| !NOT_SOURCES.contains(&key.as_str()))
            .cloned()
            .collect()
    }

    #[test]
    fn oss() -> anyhow::Result<()> {
        let config = config(json!({
            "pv-a": {
                "transform_to": "OSS",
                "bucket": "b",
                "url": "u",
                "akId": "i",
                "akSecret": "s",
                "otherOpts": "-o",
            },
        }));
        let mut pv = nfs_pv("pv-a");

        assert_eq!(transform(&config, &mut pv)?, Outcome::Rewritten);
        assert_eq!(volume_sources(&pv), ["flexVolume"]);
        assert_eq!(flex(&pv).driver, "alicloud/oss");
        assert_eq!(
            options(&pv),
            json!({ "bucket": "b", "url": "u", "akId": "i", "akSecret": "s", "otherOpts": "-o" })
        );

        let spec = pv.spec.as_ref().unwrap();
        assert_eq!(spec.mount_options, Some(vec![]));
        assert_eq!(spec.storage_class_name.as_deref(), Some("nfs"));
        assert_eq!(spec.access_modes, Some(vec!["ReadWriteMany".to_owned()]));
        Ok(())
    }

    #[test]
    fn oss_other_opts_defaults_to_empty() -> anyhow::Result<()> {
        let config = config(json!({
            "pv-a": { "transform_to": "OSS", "bucket": "b", "url": "u", "akId": "i", "akSecret": "s" },
        }));
        let mut pv = nfs_pv("pv-a");
        transform(&config, &mut pv)?;
        assert_eq!(options(&pv)["otherOpts"], json!(""));
        Ok(())
    }

    #[test]
    fn oss_requires_credentials() {
        let config = config(json!({
            "pv-a": { "transform_to": "OSS", "bucket": "b", "url": "u", "akId": "i" },
        }));
        let mut pv = nfs_pv("pv-a");
        let err = transform(&config, &mut pv).unwrap_err();
        assert!(matches!(err, Error::EmptyFields { .. }), "{err}");
    }

    #[test]
    fn disk() -> anyhow::Result<()> {
        let config = config(json!({
            "pv-b": {
                "transform_to": "DISK",
                "region": "cn-hangzhou",
                "zone": "cn-hangzhou-b",
                "fsType": "ext4",
                "volumeId": "d-1",
            },
        }));
        let mut pv = nfs_pv("pv-b");

        assert_eq!(transform(&config, &mut pv)?, Outcome::Rewritten);
        assert_eq!(volume_sources(&pv), ["flexVolume"]);
        assert_eq!(flex(&pv).driver, "alicloud/disk");
        assert_eq!(flex(&pv).fs_type.as_deref(), Some("ext4"));
        assert_eq!(options(&pv), json!({ "volumeId": "d-1" }));
        assert_eq!(
            serde_json::to_value(&pv.metadata.labels)?,
            json!({
                "failure-domain.beta.kubernetes.io/zone": "cn-hangzhou-b",
                "failure-domain.beta.kubernetes.io/region": "cn-hangzhou",
            })
        );
        Ok(())
    }

    #[test]
    fn disk_rejects_unknown_fs_type() {
        let config = config(json!({
            "pv-b": {
                "transform_to": "DISK",
                "region": "cn-hangzhou",
                "zone": "cn-hangzhou-b",
                "fsType": "ntfs",
                "volumeId": "d-1",
            },
        }));
        let mut pv = nfs_pv("pv-b");
        let err = transform(&config, &mut pv).unwrap_err();
        assert_eq!(err.to_string(), "unsupported alibabacloud Disk volume fsType: ntfs");
    }

    #[test]
    fn nas() -> anyhow::Result<()> {
        let config = config(json!({
            "pv-c": { "transform_to": "NAS", "server": "x.nas.aliyuncs.com", "path": "/share", "vers": "4.0" },
            "pv-d": { "transform_to": "NAS", "server": "x.nas.aliyuncs.com", "path": "/share" },
        }));

        let mut pv = nfs_pv("pv-c");
        transform(&config, &mut pv)?;
        assert_eq!(volume_sources(&pv), ["flexVolume"]);
        assert_eq!(flex(&pv).driver, "alicloud/nas");
        assert_eq!(
            options(&pv),
            json!({ "server": "x.nas.aliyuncs.com", "path": "/share", "vers": "4.0" })
        );

        let mut pv = nfs_pv("pv-d");
        transform(&config, &mut pv)?;
        assert_eq!(options(&pv), json!({ "server": "x.nas.aliyuncs.com", "path": "/share" }));
        Ok(())
    }

    #[test]
    fn nas_rejects_unknown_version() {
        let config = config(json!({
            "pv-c": { "transform_to": "NAS", "server": "s", "path": "/", "vers": "4.1" },
        }));
        let mut pv = nfs_pv("pv-c");
        let err = transform(&config, &mut pv).unwrap_err();
        assert!(matches!(err, Error::UnsupportedNfsVersion(ref v) if v == "4.1"), "{err}");
    }

    #[test]
    fn unconfigured_volume_passes_through() -> anyhow::Result<()> {
        let config = config(json!({ "other": { "transform_to": "NAS" } }));
        let mut pv = nfs_pv("pv-a");
        assert_eq!(transform(&config, &mut pv)?, Outcome::Unchanged);
        assert_eq!(pv, nfs_pv("pv-a"));
        Ok(())
    }

    #[test]
    fn tag_is_required_and_checked() {
        let config = config(json!({
            "missing": { "bucket": "b" },
            "unknown": { "transform_to": "EBS" },
        }));

        let err = transform(&config, &mut nfs_pv("missing")).unwrap_err();
        assert_eq!(err.to_string(), "transform_to field of volume config need to be set");

        let err = transform(&config, &mut nfs_pv("unknown")).unwrap_err();
        assert_eq!(err.to_string(), "unsupported type of volume config: EBS");
    }

    #[test]
    fn object_is_untouched_on_error() {
        let config = config(json!({
            "pv-b": { "transform_to": "DISK", "region": "r", "zone": "z", "fsType": "ntfs", "volumeId": "d" },
        }));
        let mut tree = object(serde_json::to_value(nfs_pv("pv-b")).unwrap());
        let before = tree.clone();
        let result = PersistentVolumeTransformer(&config.persistent_volumes).transform(&mut tree);
        assert!(result.is_err());
        assert_eq!(tree, before);
    }
}
