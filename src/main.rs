use anyhow::Context;
use clap::Parser;
use std::collections::HashSet;
use std::io::{BufWriter, Write};
use std::path::Path;
use std::process::ExitCode;

use tsgraph::checker::SemanticHost;
use tsgraph::cli::Cli;
use tsgraph::config::{IdStrategy, OutputFormat, collect_snapshots};
use tsgraph::emitter::{Emitter, JsonEmitter, LineEmitter};
use tsgraph::graph::{Builder, Counter, IdGenerator, UuidGenerator};
use tsgraph::linker::Linker;
use tsgraph::{IndexError, IndexerOptions, ProjectError, Session, Settings};

fn main() -> ExitCode {
    let cli = Cli::parse();

    let mut settings = match Settings::load() {
        Ok(settings) => settings,
        Err(error) => {
            eprintln!("tsgraph: invalid configuration: {error}");
            return ExitCode::from(1);
        }
    };
    cli.apply(&mut settings);
    tsgraph::logging::init_with_config(&settings.logging);

    match run(&cli, &settings) {
        Ok(()) => ExitCode::SUCCESS,
        Err(error) => {
            eprintln!("tsgraph: {error:#}");
            // Bad arguments and missing project files exit 1; fatal
            // validation errors (an invalid dump) exit 2.
            let code = if error.downcast_ref::<ProjectError>().is_some() {
                1
            } else if let Some(index_error) = error.downcast_ref::<IndexError>() {
                for suggestion in index_error.recovery_suggestions() {
                    eprintln!("  hint: {suggestion}");
                }
                2
            } else {
                2
            };
            ExitCode::from(code)
        }
    }
}

fn run(cli: &Cli, settings: &Settings) -> anyhow::Result<()> {
    let snapshots = collect_snapshots(&cli.project, !settings.no_project_references)?;
    let (first_path, first) = snapshots.first().expect("collect yields at least one");

    let workspace_root = if first.program.common_source_directory().is_empty() {
        first_path
            .parent()
            .map(|p| p.to_string_lossy().into_owned())
            .unwrap_or_else(|| "/".to_string())
    } else {
        first.program.common_source_directory().to_string()
    };
    let group_name = settings
        .group
        .clone()
        .unwrap_or_else(|| default_group_name(&workspace_root));

    let generator: Box<dyn IdGenerator> = match settings.id {
        IdStrategy::Number => Box::new(Counter::new()),
        IdStrategy::Uuid => Box::new(UuidGenerator),
    };

    let mut linker = Linker::new(workspace_root.clone());
    let manifest = Path::new(&workspace_root).join("package.json");
    if manifest.is_file() {
        linker = linker.with_project_manifest(manifest)?;
    }

    let options = IndexerOptions {
        workspace_root,
        group_name,
        no_contents: settings.output.no_contents,
        moniker_mode: settings.moniker,
        tool_args: std::env::args().skip(1).collect(),
    };

    let mut emitter = open_sink(cli, settings)?;
    let mut session = Session::new(Builder::new(generator), linker, options);
    session.begin(&mut *emitter)?;

    for (path, snapshot) in &snapshots {
        let name = settings
            .project_name
            .clone()
            .or_else(|| snapshot.name.clone())
            .unwrap_or_else(|| project_name_from(path));
        let base = path.parent().unwrap_or_else(|| Path::new("."));
        let root_files: HashSet<String> = snapshot
            .tsconfig
            .root_files(base, &snapshot.program.root_file_names);
        let resource = Some(tsgraph::project::file_uri(&path.to_string_lossy()));
        let contents = (!settings.output.no_contents)
            .then(|| std::fs::read(path).ok())
            .flatten()
            .map(|bytes| {
                use base64::Engine as _;
                base64::engine::general_purpose::STANDARD.encode(bytes)
            });

        session.index_project(
            &snapshot.program,
            &mut *emitter,
            &name,
            resource,
            contents,
            root_files,
        )?;
    }

    session.finish(&mut *emitter)?;
    emitter.end()?;
    Ok(())
}

fn open_sink(cli: &Cli, settings: &Settings) -> anyhow::Result<Box<dyn Emitter>> {
    let writer: Box<dyn Write> = if settings.output.stdout {
        Box::new(std::io::stdout())
    } else {
        let out = settings
            .output
            .out
            .clone()
            .unwrap_or_else(|| cli.project.with_extension("lsif"));
        let file = std::fs::File::create(&out)
            .with_context(|| format!("cannot create dump file '{}'", out.display()))?;
        Box::new(BufWriter::new(file))
    };
    Ok(match settings.output.format {
        OutputFormat::Line => Box::new(LineEmitter::new(writer)),
        OutputFormat::Json => Box::new(JsonEmitter::new(writer)),
    })
}

fn default_group_name(workspace_root: &str) -> String {
    Path::new(workspace_root)
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| "workspace".to_string())
}

fn project_name_from(path: &Path) -> String {
    path.parent()
        .and_then(|dir| dir.file_name())
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| "project".to_string())
}
