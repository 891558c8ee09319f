use std::path::PathBuf;

use clap::Parser;

#[derive(Parser)]
pub struct CommonOpts {
    /// Enable debug logging
    #[arg(long, global = true, help_heading("GLOBAL OPTIONS"))]
    pub debug: bool,
}

#[derive(Parser)]
#[command(
    name = "nfbatch",
    about = "Synthesizes a genomics batch-computing deployment",
    version = crate::NF_VERSION,
    disable_help_subcommand(true)
)]
pub struct RootOptions {
    #[clap(flatten)]
    pub common: CommonOpts,

    #[clap(subcommand)]
    pub subcmd: SubCommand,
}

#[derive(Parser)]
pub enum SubCommand {
    /// Synthesize the deployment artifacts
    Synth(SynthOpts),
}

#[derive(Parser)]
pub struct SynthOpts {
    /// Path to the deployment properties file
    #[arg(long, default_value = "props.json", value_hint = clap::ValueHint::FilePath)]
    pub props: PathBuf,

    /// Directory containing the image build contexts and the launch template
    /// script
    #[arg(long, default_value = ".", value_hint = clap::ValueHint::DirPath)]
    pub project_dir: PathBuf,

    /// Directory where the synthesized artifacts are written
    #[arg(long, default_value = "nfbatch.out", value_hint = clap::ValueHint::DirPath)]
    pub output: PathBuf,
}
