use clap::{CommandFactory, FromArgMatches};

use nfbatch::common::cli::{RootOptions, SubCommand, SynthOpts};
use nfbatch::common::env::deployment_region;
use nfbatch::common::setup::setup_logging;
use nfbatch::config::Props;
use nfbatch::probe::{AwsCliProbe, CloudProbe};
use nfbatch::stack::{DeployEnv, synthesize};

async fn command_synth(opts: SynthOpts) -> anyhow::Result<()> {
    let props = Props::load(&opts.props)?;
    let region = deployment_region()?;

    let probe = AwsCliProbe::new()?;
    let identity = probe.caller_identity().await?;
    log::info!(
        "Synthesizing as {} in account {}",
        identity.arn,
        identity.account
    );

    let env = DeployEnv {
        account: identity.account,
        region,
    };
    let synthesis = synthesize(&props, &env, &probe, &opts.project_dir).await?;
    synthesis.write(&opts.output)?;

    log::info!(
        "Wrote {} resources and {} image assets to {}",
        synthesis.template.len(),
        synthesis.assets.images.len(),
        opts.output.display()
    );
    Ok(())
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> nfbatch::Result<()> {
    let matches = RootOptions::command().get_matches();
    let top_opts = match RootOptions::from_arg_matches(&matches) {
        Ok(opts) => opts,
        Err(error) => error.exit(),
    };

    setup_logging(top_opts.common.debug);

    let result = match top_opts.subcmd {
        SubCommand::Synth(opts) => command_synth(opts).await,
    };

    if let Err(e) = result {
        log::error!("{e:#}");
        std::process::exit(1);
    }

    Ok(())
}
