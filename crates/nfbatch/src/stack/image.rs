use serde_json::json;
use std::path::Path;

use cfngraph::arn;
use cfngraph::asset::{AssetManifest, ImageAsset, source_hash};
use cfngraph::template::Template;

use crate::common::error::NfError;
use crate::stack::DeployEnv;

/// The five image build contexts published for the pipeline, as
/// `(asset id, context directory, repository name)`.
///
/// Only `nextflow` is wired into job definitions; the genomic-toolkit images
/// are published for pipeline processes to reference directly.
const BUILD_CONTEXTS: [(&str, &str, &str); 5] = [
    ("nextflow-asset", "docker", "nextflow"),
    ("gatk-asset", "docker_gatk", "gatk"),
    ("gatk-4110-asset", "docker_gatk4110", "gatk-4.1.1.0"),
    ("gotc-asset", "docker_gotc", "gotc"),
    ("gatk-joint-asset", "docker_gatk_joint", "gatk-joint"),
];

const PIPELINE_IMAGE_ID: &str = "nextflow-asset";

/// Image assets registered for the deployment. The external image builder
/// consumes the manifest; synthesis only computes tags and repositories.
pub struct ImageAssets {
    manifest: AssetManifest,
    pipeline_image_uri: String,
}

impl ImageAssets {
    /// URI of the pipeline-runner image that job definitions execute.
    pub fn pipeline_image_uri(&self) -> &str {
        &self.pipeline_image_uri
    }

    pub fn manifest(&self) -> &AssetManifest {
        &self.manifest
    }

    pub fn into_manifest(self) -> AssetManifest {
        self.manifest
    }
}

/// Registers one repository and one build instruction per context. The five
/// builds are independent; their order carries no meaning.
pub fn build(
    template: &mut Template,
    env: &DeployEnv,
    project_dir: &Path,
) -> crate::Result<ImageAssets> {
    let mut manifest = AssetManifest::default();
    let mut pipeline_image_uri = None;

    for (id, context_dir, repository) in BUILD_CONTEXTS {
        let context = project_dir.join(context_dir);
        if !context.join("Dockerfile").is_file() {
            return Err(NfError::ConfigError(format!(
                "Build context {} has no Dockerfile",
                context.display()
            )));
        }

        let tag = source_hash(&context)?;
        let image_uri = arn::ecr_image(&env.account, &env.region, repository, &tag);
        template.add(
            &[id, "repository"],
            "AWS::ECR::Repository",
            json!({"RepositoryName": repository}),
        )?;
        log::debug!("Registered image asset {repository}:{tag}");

        if id == PIPELINE_IMAGE_ID {
            pipeline_image_uri = Some(image_uri.clone());
        }
        manifest.push(ImageAsset {
            id: id.to_string(),
            repository: repository.to_string(),
            tag,
            context,
            image_uri,
        });
    }

    // The build table always carries the pipeline image.
    let pipeline_image_uri = pipeline_image_uri
        .ok_or_else(|| NfError::GenericError("Pipeline image missing from build table".into()))?;
    Ok(ImageAssets {
        manifest,
        pipeline_image_uri,
    })
}
