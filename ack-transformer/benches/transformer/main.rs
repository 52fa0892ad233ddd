use ack_transformer::{
    Object, TransformConfig,
    transform::{ImageTransformer, Transformer},
    visit,
};
use serde_json::json;

fn main() {
    divan::main();
}

fn deployment(containers: usize) -> Object {
    let containers = (0..containers)
        .map(|i| {
            json!({
                "name": format!("c{i}"),
                "image": format!("gcr.io/google_containers/app-{i}:v1"),
                "env": [{ "name": "A", "value": "b" }],
                "ports": [{ "containerPort": 8080 }],
            })
        })
        .collect::<Vec<_>>();

    match json!({
        "apiVersion": "apps/v1",
        "kind": "Deployment",
        "metadata": { "name": "bench", "labels": { "app": "bench" } },
        "spec": { "template": { "spec": { "containers": containers } } },
    }) {
        serde_json::Value::Object(object) => object,
        _ => unreachable!(),
    }
}

#[divan::bench(args = [1, 10, 100])]
fn walk_fields(bencher: divan::Bencher, containers: usize) {
    bencher
        .with_inputs(|| deployment(containers))
        .bench_local_values(|mut object| {
            visit::operate_fields::<()>(&mut object, "image", |_| Ok(())).unwrap();
            object
        });
}

#[divan::bench(args = [1, 10, 100])]
fn rewrite_images(bencher: divan::Bencher, containers: usize) {
    let config: TransformConfig = serde_json::from_value(json!({
        "ImageSources": {
            "gcr.io/google_containers": "registry.cn-hangzhou.aliyuncs.com/google_containers",
            "docker.io": "registry.cn-hangzhou.aliyuncs.com",
        },
    }))
    .unwrap();

    bencher
        .with_inputs(|| deployment(containers))
        .bench_local_values(|mut object| {
            ImageTransformer(&config.image_sources)
                .transform(&mut object)
                .unwrap();
            object
        });
}
