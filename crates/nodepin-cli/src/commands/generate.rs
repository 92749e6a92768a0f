//! `nodepin <npm|yarn> <LOCKFILE>` implementation.

use miette::{IntoDiagnostic, Result};
use nodepin_core::config::Dialect;
use nodepin_core::pkg::{
    generate_packages, GenerateReport, JsonManifest, LockfileProvider, ModuleProvider,
    NoSpecialSources, NodeHeaders, NpmProviderFactory, Package, PkgError, ProviderFactory,
    ProviderOptions, YarnProviderFactory,
};
use nodepin_core::{Config, Error};
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Schema version of the `--json` result.
pub const GENERATE_SCHEMA_VERSION: u32 = 1;

/// Arguments for one run.
#[derive(Debug, Clone)]
pub struct GenerateArgs {
    pub dialect: Dialect,
    pub lockfile: PathBuf,
    pub output: PathBuf,
    pub no_devel: bool,
    pub keep_going: bool,
    pub node_headers: Option<String>,
    pub node_runtime: Option<String>,
}

#[derive(Debug, Serialize)]
struct FailureJson {
    package: String,
    code: String,
    message: String,
}

#[derive(Debug, Serialize)]
struct ErrorJson {
    code: String,
    message: String,
}

#[derive(Debug, Serialize)]
struct GenerateResult {
    schema_version: u32,
    ok: bool,
    dialect: String,
    lockfile: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    output: Option<String>,
    packages: usize,
    generated: usize,
    skipped: usize,
    entries: usize,
    failures: Vec<FailureJson>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<ErrorJson>,
}

/// What a finished run produced.
struct Summary {
    packages: usize,
    entries: usize,
    report: GenerateReport,
    written: bool,
}

/// Run the command.
pub fn run(config: &Config, args: &GenerateArgs, json: bool) -> Result<()> {
    let runtime = tokio::runtime::Runtime::new().into_diagnostic()?;

    let outcome = config.validate().and_then(|()| {
        let options = ProviderOptions::default()
            .with_no_devel(args.no_devel)
            .with_channel(config.channel);
        match args.dialect {
            Dialect::Npm => runtime.block_on(generate(
                NpmProviderFactory::new,
                options,
                config,
                args,
            )),
            Dialect::Yarn => runtime.block_on(generate(
                YarnProviderFactory::new,
                options,
                config,
                args,
            )),
        }
    });

    match outcome {
        Ok(summary) => {
            let failed = !summary.report.is_success();
            let ok = !failed || args.keep_going;
            if json {
                print_json(&result_json(args, &summary, ok, None))?;
            } else {
                print_human(args, &summary);
            }
            if !ok {
                std::process::exit(1);
            }
            Ok(())
        }
        Err(e) => {
            if json {
                let error = ErrorJson {
                    code: e.code().to_string(),
                    message: e.to_string(),
                };
                let summary = Summary {
                    packages: 0,
                    entries: 0,
                    report: GenerateReport::default(),
                    written: false,
                };
                print_json(&result_json(args, &summary, false, Some(error)))?;
            } else {
                eprintln!("error: {e}");
            }
            std::process::exit(1);
        }
    }
}

async fn generate<F: ProviderFactory>(
    make_factory: impl Fn(ProviderOptions) -> F,
    mut options: ProviderOptions,
    config: &Config,
    args: &GenerateArgs,
) -> Result<Summary, Error> {
    if !args.lockfile.is_file() {
        return Err(Error::LockfileNotFound {
            path: args.lockfile.clone(),
        });
    }
    let lockfile_dir = args
        .lockfile
        .parent()
        .map_or_else(|| config.cwd.clone(), Path::to_path_buf);

    // rcfiles live next to the lockfile; earlier flavors win
    let mut headers: Vec<NodeHeaders> = Vec::new();
    for rc in make_factory(options.clone()).create_rcfile_providers() {
        let path = rc.rcfile_path(&lockfile_dir);
        if !path.is_file() {
            continue;
        }
        debug!(rcfile = %path.display(), "reading rcfile");
        let rcfile = rc.parse_rcfile(&path)?;
        match rcfile.node_headers(&path) {
            Ok(Some(h)) => {
                if !headers.contains(&h) {
                    headers.push(h);
                }
            }
            Ok(None) => {}
            Err(e) => warn!(
                rcfile = %path.display(),
                code = e.code(),
                "skipping node headers: {}",
                e.message()
            ),
        }
        options = options.with_rcfile(&rcfile);
    }
    if let Some(target) = &args.node_headers {
        let h = NodeHeaders::with_defaults(target, args.node_runtime.as_deref(), None)?;
        if !headers.contains(&h) {
            headers.push(h);
        }
    }

    let factory = make_factory(options);

    let packages: Vec<Package> = factory
        .create_lockfile_provider()
        .process_lockfile(&args.lockfile)?
        .collect::<Result<_, PkgError>>()?;
    info!(
        lockfile = %args.lockfile.display(),
        dialect = %args.dialect,
        packages = packages.len(),
        "processing lockfile"
    );
    let package_count = packages.len();

    let manifest = Arc::new(JsonManifest::new());
    let report = {
        let provider = factory.create_module_provider(manifest.clone(), NoSpecialSources)?;

        for h in &headers {
            debug!(target_version = %h.target, runtime = %h.runtime, "adding node headers");
            provider.generate_node_headers(h).await?;
        }

        generate_packages(&provider, packages, config.max_parallel).await
    };

    for failure in &report.failures {
        warn!(
            package = %failure.package,
            code = failure.error.code(),
            "{}",
            failure.error.message()
        );
    }
    if let Some(fatal) = report.fatal() {
        return Err(fatal.error.clone().into());
    }

    let written = report.is_success() || args.keep_going;
    if written {
        manifest.write_to(&args.output)?;
        info!(output = %args.output.display(), "wrote manifest");
    }

    Ok(Summary {
        packages: package_count,
        entries: manifest.entries()?.len(),
        report,
        written,
    })
}

fn result_json(
    args: &GenerateArgs,
    summary: &Summary,
    ok: bool,
    error: Option<ErrorJson>,
) -> GenerateResult {
    GenerateResult {
        schema_version: GENERATE_SCHEMA_VERSION,
        ok,
        dialect: args.dialect.to_string(),
        lockfile: args.lockfile.display().to_string(),
        output: summary
            .written
            .then(|| args.output.display().to_string()),
        packages: summary.packages,
        generated: summary.report.generated,
        skipped: summary.report.skipped,
        entries: summary.entries,
        failures: summary
            .report
            .failures
            .iter()
            .map(|f| FailureJson {
                package: f.package.clone(),
                code: f.error.code().to_string(),
                message: f.error.message().to_string(),
            })
            .collect(),
        error,
    }
}

fn print_json(result: &GenerateResult) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(result).into_diagnostic()?);
    Ok(())
}

fn print_human(args: &GenerateArgs, summary: &Summary) {
    for failure in &summary.report.failures {
        eprintln!("warning: {}: {}", failure.package, failure.error);
    }
    if summary.written {
        println!(
            "Wrote {} sources for {} packages to {}",
            summary.entries,
            summary.packages,
            args.output.display()
        );
    } else {
        eprintln!(
            "error: {} packages failed to fetch; rerun with --keep-going to write a partial manifest",
            summary.report.failures.len()
        );
    }
}
