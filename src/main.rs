//! bladeaudit CLI binary entry point.
//! Delegates to the library for resolution and analysis and prints results.

use bladeaudit::analyze::Analyzer;
use bladeaudit::cli::{Cli, Commands, CommonArgs};
use bladeaudit::config::{self, Effective, VersionSource};
use bladeaudit::error::AuditError;
use bladeaudit::resolver::ViewResolver;
use bladeaudit::{output, utils};
use clap::Parser;

fn main() {
    let cli = Cli::parse();
    match cli.cmd {
        Commands::Version => {
            println!("{}", env!("CARGO_PKG_VERSION"));
        }
        Commands::Audit {
            view,
            all,
            host_version,
            fail_on_warnings,
            common,
        } => {
            let eff = setup(&common, host_version.as_deref());
            let compiler = eff.compiler();
            let finder = eff.finder();
            let analyzer = Analyzer::new(&compiler, &finder, eff.warning_engine());

            let warnings = if all {
                let batch = analyzer.analyze_all();
                output::print_batch(&batch, &eff.output, &eff.root);
                batch.summary.warnings
            } else {
                let name = view.unwrap_or_default();
                match analyzer.analyze_view(&name) {
                    Ok(report) => {
                        output::print_report(&report, &eff.output, &eff.root);
                        report.result.warnings.len()
                    }
                    Err(AuditError::NotFound { name, tried }) => {
                        for path in &tried {
                            tracing::debug!("Tried {}", path.display());
                        }
                        eprintln!("{} view [{}] not found!", utils::error_prefix(), name);
                        std::process::exit(2);
                    }
                    Err(e) => {
                        eprintln!("{} {}", utils::error_prefix(), e);
                        std::process::exit(2);
                    }
                }
            };
            if fail_on_warnings && warnings > 0 {
                std::process::exit(1);
            }
        }
        Commands::List { common } => {
            let eff = setup(&common, None);
            let names = eff.finder().list_all();
            if eff.output == "json" {
                match serde_json::to_string_pretty(&names) {
                    Ok(s) => println!("{}", s),
                    Err(e) => tracing::error!("Failed to serialize view list: {}", e),
                }
            } else {
                for name in names {
                    println!("{}", name);
                }
            }
        }
    }
}

/// Initialize logging and resolve the effective config, exiting 2 on errors.
fn setup(common: &CommonArgs, host_version: Option<&str>) -> Effective {
    utils::init_tracing(common.verbose);
    let eff = match config::resolve_effective(
        common.root.as_deref(),
        host_version,
        common.output.as_deref(),
    ) {
        Ok(eff) => eff,
        Err(e) => {
            eprintln!("{} {}", utils::error_prefix(), e);
            std::process::exit(2);
        }
    };
    // Friendly note if no config was found
    if !eff.config_found && eff.output != "json" {
        eprintln!(
            "{} No bladeaudit.toml found; using defaults.",
            utils::note_prefix()
        );
    }
    if eff.version_source == VersionSource::Default && eff.output != "json" {
        eprintln!(
            "{} Framework version not detected; assuming {}.",
            utils::note_prefix(),
            eff.host_version
        );
    }
    tracing::debug!(
        "Root {} with host version {} ({:?})",
        eff.root.display(),
        eff.host_version,
        eff.version_source
    );
    eff
}
