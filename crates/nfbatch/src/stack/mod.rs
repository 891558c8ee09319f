//! Declarative assembly of the deployed topology.
//!
//! Each submodule owns one slice of the resource graph and runs exactly once
//! per synthesis, in dependency order: network, images, storage, access,
//! compute. Handles returned by earlier stages are passed by reference into
//! later ones and never mutated; a failure anywhere aborts the whole pass.

pub mod access;
pub mod compute;
pub mod image;
pub mod network;
pub mod storage;

use std::path::Path;

use cfngraph::asset::AssetManifest;
use cfngraph::template::Template;

use crate::config::Props;
use crate::probe::CloudProbe;

pub const DEPLOYMENT_NAME: &str = "nf-gatk";

pub const TEMPLATE_FILE: &str = "template.json";
pub const ASSETS_FILE: &str = "assets.json";

/// Account and region the synthesized graph targets.
#[derive(Debug, Clone)]
pub struct DeployEnv {
    pub account: String,
    pub region: String,
}

/// The complete synthesized deployment: the resource graph plus the image
/// build plan, the sole output artifacts of this program.
pub struct Synthesis {
    pub template: Template,
    pub assets: AssetManifest,
}

impl Synthesis {
    /// Write the artifacts into the output directory.
    pub fn write(&self, output_dir: &Path) -> crate::Result<()> {
        std::fs::create_dir_all(output_dir)?;
        self.template.write(&output_dir.join(TEMPLATE_FILE))?;
        self.assets.write(&output_dir.join(ASSETS_FILE))?;
        Ok(())
    }
}

pub async fn synthesize(
    props: &Props,
    env: &DeployEnv,
    probe: &dyn CloudProbe,
    project_dir: &Path,
) -> crate::Result<Synthesis> {
    let mut template = Template::new(format!("{DEPLOYMENT_NAME} batch computing environment"));

    let network = network::build(&mut template, props, probe).await?;
    let images = image::build(&mut template, env, project_dir)?;
    let storage = storage::build(&mut template, env, probe, props, &network).await?;
    let access = access::build(&mut template, env, &storage)?;
    compute::build(
        &mut template,
        project_dir,
        &network,
        &storage,
        &access,
        &images,
    )?;

    Ok(Synthesis {
        template,
        assets: images.into_manifest(),
    })
}
