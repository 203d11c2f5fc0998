//! Command-line surface.

use crate::config::{IdStrategy, MonikerMode, OutputFormat, Settings};
use clap::Parser;
use std::path::PathBuf;

#[derive(Debug, Parser)]
#[command(name = "tsgraph")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Generate an LSIF dump from a checked TypeScript program snapshot")]
pub struct Cli {
    /// Project snapshot file or a directory containing program.json
    #[arg(short = 'p', value_name = "PATH", default_value = ".")]
    pub project: PathBuf,

    /// Dump output path (defaults to the project name with a .lsif suffix)
    #[arg(long)]
    pub out: Option<PathBuf>,

    /// Write the dump to standard output
    #[arg(long)]
    pub stdout: bool,

    /// Emitter format
    #[arg(long = "outputFormat", value_enum)]
    pub output_format: Option<OutputFormat>,

    /// Id generator strategy
    #[arg(long, value_enum)]
    pub id: Option<IdStrategy>,

    /// Workspace group name
    #[arg(long)]
    pub group: Option<String>,

    /// Override the project name
    #[arg(long = "projectName")]
    pub project_name: Option<String>,

    /// Omit base64-encoded source bodies from document and project vertices
    #[arg(long = "noContents")]
    pub no_contents: bool,

    /// Do not follow project references
    #[arg(long = "noProjectReferences")]
    pub no_project_references: bool,

    /// Record that the front end ran JS type acquisition
    #[arg(long = "typeAcquisition")]
    pub type_acquisition: bool,

    /// Moniker failure handling for exported symbols
    #[arg(long, value_enum)]
    pub moniker: Option<MonikerMode>,
}

impl Cli {
    /// Layer the CLI flags over loaded settings (CLI wins).
    pub fn apply(&self, settings: &mut Settings) {
        if let Some(format) = self.output_format {
            settings.output.format = format;
        }
        if let Some(out) = &self.out {
            settings.output.out = Some(out.clone());
        }
        if self.stdout {
            settings.output.stdout = true;
        }
        if self.no_contents {
            settings.output.no_contents = true;
        }
        if let Some(id) = self.id {
            settings.id = id;
        }
        if let Some(moniker) = self.moniker {
            settings.moniker = moniker;
        }
        if let Some(group) = &self.group {
            settings.group = Some(group.clone());
        }
        if let Some(name) = &self.project_name {
            settings.project_name = Some(name.clone());
        }
        if self.no_project_references {
            settings.no_project_references = true;
        }
        if self.type_acquisition {
            settings.type_acquisition = true;
        }
    }
}
