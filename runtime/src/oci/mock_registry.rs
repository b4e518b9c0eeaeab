//! In-process registry for exercising the client offline.
//!
//! Serves the distribution API routes the client uses over plain HTTP on
//! 127.0.0.1. Clients must list the server address in
//! `insecure_registries`.

use std::path::Path;
use std::sync::{Arc, Mutex};

use dockerless_core::config::ProviderConfig;
use oci_distribution::manifest::OCI_IMAGE_MEDIA_TYPE;
use wiremock::matchers::{method, path, path_regex};
use wiremock::{Mock, MockServer, Request, Respond, ResponseTemplate};

use super::layout::sha256_digest;
use super::registry::RegistryClient;

/// Manifest bytes captured from the last manifest PUT.
pub(crate) type PushedManifest = Arc<Mutex<Option<Vec<u8>>>>;

/// A single-layer image served by the source repository.
pub(crate) struct SourceImage {
    pub(crate) manifest: Vec<u8>,
    pub(crate) digest: String,
    pub(crate) blobs: Vec<(String, Vec<u8>)>,
}

impl SourceImage {
    /// The manifest is pretty-printed so any re-serialization changes its digest.
    pub(crate) fn sample() -> Self {
        let config = br#"{"architecture":"amd64","os":"linux","rootfs":{"type":"layers","diff_ids":[]}}"#.to_vec();
        let layer = b"layer-one".to_vec();
        let config_digest = sha256_digest(&config);
        let layer_digest = sha256_digest(&layer);

        let manifest = serde_json::to_vec_pretty(&serde_json::json!({
            "schemaVersion": 2,
            "mediaType": OCI_IMAGE_MEDIA_TYPE,
            "config": {
                "mediaType": "application/vnd.oci.image.config.v1+json",
                "digest": config_digest,
                "size": config.len()
            },
            "layers": [{
                "mediaType": "application/vnd.oci.image.layer.v1.tar+gzip",
                "digest": layer_digest,
                "size": layer.len()
            }]
        }))
        .unwrap();

        Self {
            digest: sha256_digest(&manifest),
            manifest,
            blobs: vec![(config_digest, config), (layer_digest, layer)],
        }
    }
}

/// Client for `server` that creates its temporary directories in `work_dir`.
pub(crate) fn local_client(server: &MockServer, work_dir: &Path) -> RegistryClient {
    let config = ProviderConfig {
        insecure_registries: vec![server.address().to_string()],
        work_dir: Some(work_dir.to_path_buf()),
        ..Default::default()
    };
    RegistryClient::new(&config).unwrap()
}

/// `GET /v2/` without a challenge: anonymous access.
pub(crate) async fn mount_api_root(server: &MockServer) {
    Mock::given(method("GET"))
        .and(path("/v2/"))
        .respond_with(ResponseTemplate::new(200))
        .mount(server)
        .await;
}

/// Serve `image` under `repo` by any tag or digest. Blobs are left out when
/// `with_blobs` is false.
pub(crate) async fn mount_source(
    server: &MockServer,
    repo: &str,
    image: &SourceImage,
    with_blobs: bool,
) {
    Mock::given(method("GET"))
        .and(path_regex(format!("^/v2/{}/manifests/.+$", repo)))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("Docker-Content-Digest", image.digest.as_str())
                .set_body_raw(image.manifest.clone(), OCI_IMAGE_MEDIA_TYPE),
        )
        .mount(server)
        .await;

    if !with_blobs {
        return;
    }
    for (digest, data) in &image.blobs {
        Mock::given(method("GET"))
            .and(path(format!("/v2/{}/blobs/{}", repo, digest)))
            .respond_with(
                ResponseTemplate::new(200).set_body_raw(data.clone(), "application/octet-stream"),
            )
            .mount(server)
            .await;
    }
}

/// Accept blob uploads and manifest pushes for `repo:tag`, returning the
/// captured manifest bytes.
pub(crate) async fn mount_target(server: &MockServer, repo: &str, tag: &str) -> PushedManifest {
    let pushed: PushedManifest = Arc::default();
    let session = format!("{}/v2/{}/blobs/uploads/session", server.uri(), repo);
    let manifest_path = format!("/v2/{}/manifests/{}", repo, tag);

    Mock::given(method("HEAD"))
        .and(path_regex(format!("^/v2/{}/blobs/.+$", repo)))
        .respond_with(ResponseTemplate::new(404))
        .mount(server)
        .await;

    Mock::given(method("POST"))
        .and(path_regex(format!("^/v2/{}/blobs/uploads/?$", repo)))
        .respond_with(
            ResponseTemplate::new(202)
                .insert_header("Location", session.as_str())
                .insert_header("Range", "0-0"),
        )
        .mount(server)
        .await;

    Mock::given(method("PATCH"))
        .and(path(format!("/v2/{}/blobs/uploads/session", repo)))
        .respond_with(UploadChunk {
            location: session.clone(),
        })
        .mount(server)
        .await;

    Mock::given(method("PUT"))
        .and(path(format!("/v2/{}/blobs/uploads/session", repo)))
        .respond_with(ResponseTemplate::new(201).insert_header("Location", session.as_str()))
        .mount(server)
        .await;

    Mock::given(method("PUT"))
        .and(path(manifest_path.as_str()))
        .respond_with(StoreManifest {
            pushed: pushed.clone(),
            location: format!("{}{}", server.uri(), manifest_path),
        })
        .mount(server)
        .await;

    for verb in ["HEAD", "GET"] {
        Mock::given(method(verb))
            .and(path(manifest_path.as_str()))
            .respond_with(ServeManifest {
                pushed: pushed.clone(),
            })
            .mount(server)
            .await;
    }

    pushed
}

struct UploadChunk {
    location: String,
}

impl Respond for UploadChunk {
    fn respond(&self, request: &Request) -> ResponseTemplate {
        let end = request.body.len().saturating_sub(1);
        ResponseTemplate::new(202)
            .insert_header("Location", self.location.as_str())
            .insert_header("Range", format!("0-{}", end).as_str())
    }
}

struct StoreManifest {
    pushed: PushedManifest,
    location: String,
}

impl Respond for StoreManifest {
    fn respond(&self, request: &Request) -> ResponseTemplate {
        *self.pushed.lock().unwrap() = Some(request.body.clone());
        ResponseTemplate::new(201)
            .insert_header("Location", self.location.as_str())
            .insert_header("Docker-Content-Digest", sha256_digest(&request.body).as_str())
    }
}

struct ServeManifest {
    pushed: PushedManifest,
}

impl Respond for ServeManifest {
    fn respond(&self, _request: &Request) -> ResponseTemplate {
        match self.pushed.lock().unwrap().as_ref() {
            Some(body) => ResponseTemplate::new(200)
                .insert_header("Docker-Content-Digest", sha256_digest(body).as_str())
                .set_body_raw(body.clone(), OCI_IMAGE_MEDIA_TYPE),
            None => ResponseTemplate::new(404),
        }
    }
}
