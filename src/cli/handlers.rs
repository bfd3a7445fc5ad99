// FILE: src/cli/handlers.rs
use crate::{
    cli::OutputFormat, // Import from the `cli` module
    convert_files, reference, ConverterOptions, ImportReport, Result, Severity, TokenError,
    TokenIndex,
};

use notify::{Event, RecommendedWatcher, RecursiveMode, Watcher};
use std::fs;
use std::path::Path;
use std::sync::mpsc::channel;
use std::time::Instant;

fn input_paths(matches: &clap::ArgMatches) -> Vec<String> {
    matches
        .get_many::<String>("inputs")
        .map(|values| values.cloned().collect())
        .unwrap_or_default()
}

// --- CONVERT ---
pub fn handle_convert_command(cli: &super::TokenCli, matches: &clap::ArgMatches) -> Result<i32> {
    let inputs = input_paths(matches);
    let output_path = cli.output_file(matches);
    let options = cli.build_converter_options(matches)?;
    let format = matches
        .get_one::<OutputFormat>("format")
        .cloned()
        .unwrap_or(OutputFormat::Json);

    if matches.get_flag("watch") {
        watch_and_convert(&inputs, output_path.as_deref(), &format, options)?;
        Ok(0)
    } else {
        let report = convert_once(&inputs, output_path.as_deref(), &format, options)?;
        if matches.get_flag("stats") {
            print_detailed_stats(&report);
        }
        Ok(0)
    }
}

fn render(report: &ImportReport, format: &OutputFormat) -> Result<String> {
    match format {
        OutputFormat::Json => serde_json::to_string_pretty(report).map_err(|e| TokenError::InvalidFormat {
            message: format!("JSON serialization error: {}", e),
        }),
        OutputFormat::Debug => Ok(format!("{:#?}", report)),
    }
}

fn convert_once(
    inputs: &[String],
    output_path: Option<&str>,
    format: &OutputFormat,
    options: ConverterOptions,
) -> Result<ImportReport> {
    let convert_start = Instant::now();
    let report = convert_files(inputs, options)?;
    let elapsed = convert_start.elapsed();

    let rendered = render(&report, format)?;
    match output_path {
        Some(path) => {
            fs::write(path, rendered)?;
            eprintln!("✅ Wrote {} tokens to {}", report.tokens.len(), path);
        }
        None => println!("{}", rendered),
    }

    eprintln!(
        "   Created: {}  Updated: {}  Skipped: {}  ({}ms)",
        report.stats.created,
        report.stats.updated,
        report.stats.skipped,
        elapsed.as_millis()
    );
    print_diagnostics(&report);
    Ok(report)
}

fn watch_and_convert(
    inputs: &[String],
    output_path: Option<&str>,
    format: &OutputFormat,
    options: ConverterOptions,
) -> Result<()> {
    eprintln!("👀 Watching {} for changes...", inputs.join(", "));

    let (tx, rx) = channel();
    let mut watcher = RecommendedWatcher::new(
        move |res: notify::Result<Event>| {
            if let Ok(event) = res {
                if let Err(e) = tx.send(event) {
                    eprintln!("Watch error: {}", e);
                }
            }
        },
        notify::Config::default(),
    )
    .map_err(|e| TokenError::Io {
        message: format!("Failed to create file watcher: {}", e),
    })?;

    for input in inputs {
        let mode = if Path::new(input).is_dir() {
            RecursiveMode::Recursive
        } else {
            RecursiveMode::NonRecursive
        };
        watcher.watch(Path::new(input), mode).map_err(|e| TokenError::Io {
            message: format!("Failed to watch {}: {}", input, e),
        })?;
    }

    if let Err(e) = convert_once(inputs, output_path, format, options.clone()) {
        eprintln!("❌ Initial conversion failed: {}", e);
    }

    loop {
        match rx.recv() {
            Ok(event) => {
                // Ignore our own writes to the output file
                if let Some(out) = output_path {
                    if event.paths.iter().all(|p| p.ends_with(out)) {
                        continue;
                    }
                }
                eprintln!("🔄 Tokens changed, converting again...");
                if let Err(e) = convert_once(inputs, output_path, format, options.clone()) {
                    eprintln!("❌ Conversion failed: {}", e);
                }
            }
            Err(e) => {
                eprintln!("Watch error: {}", e);
                break;
            }
        }
    }

    Ok(())
}

fn print_diagnostics(report: &ImportReport) {
    for diagnostic in &report.diagnostics {
        let marker = match diagnostic.severity {
            Severity::Error => "❌",
            Severity::Warning => "⚠️ ",
        };
        eprintln!(
            "{} {} [{}] {}",
            marker, diagnostic.token, diagnostic.category, diagnostic.message
        );
    }
}

fn print_detailed_stats(report: &ImportReport) {
    let stats = &report.stats;
    eprintln!("\n📊 Import Statistics:");
    eprintln!("   Collection: {}", report.collection);
    eprintln!("   Tokens in set: {}", report.tokens.len());
    eprintln!("   Created: {}", stats.created);
    eprintln!("   Updated: {}", stats.updated);
    eprintln!("   Skipped: {}", stats.skipped);
    eprintln!("   Aliases resolved: {}", stats.aliases_resolved);
    eprintln!("   Warnings: {}", stats.warnings);

    let total = stats.created + stats.updated + stats.skipped;
    if total > 0 {
        eprintln!(
            "   Success rate: {:.1}%",
            (total - stats.skipped) as f64 / total as f64 * 100.0
        );
    }
}

// --- CHECK ---
pub fn handle_check_command(cli: &super::TokenCli, matches: &clap::ArgMatches) -> Result<i32> {
    let inputs = input_paths(matches);
    let options = cli.build_converter_options(matches)?;

    eprintln!("🔍 Checking {}", inputs.join(", "));
    let report = convert_files(&inputs, options)?;
    print_diagnostics(&report);

    if report.stats.skipped > 0 {
        eprintln!("❌ {} of {} tokens have errors", report.stats.skipped, report.stats.created + report.stats.updated + report.stats.skipped);
        Ok(1)
    } else {
        eprintln!("✅ {} tokens, no issues found", report.tokens.len());
        Ok(0)
    }
}

// --- EXPLAIN ---
pub fn handle_explain_command(cli: &super::TokenCli, matches: &clap::ArgMatches) -> Result<i32> {
    let inputs = input_paths(matches);
    let options = cli.build_converter_options(matches)?;
    let raw_reference = matches
        .get_one::<String>("reference")
        .ok_or_else(|| TokenError::invalid("reference", "", "missing --reference"))?;
    let path = reference::extract_reference_path(raw_reference).unwrap_or(raw_reference.as_str());

    let report = convert_files(&inputs, options.clone())?;
    let index = build_index(&report, &options);
    let explanation = index.explain(path);

    println!("Reference: {{{}}}", explanation.reference);
    println!("After prefix strip: {}", explanation.stripped);
    match &explanation.hit {
        Some(hit) => {
            println!("Match: {} ({} tier)", hit.key, hit.tier);
            if let Some(token) = report.tokens.get(&hit.key) {
                if let Some(value) = token.effective_value() {
                    let rendered = serde_json::to_string(value).unwrap_or_else(|_| format!("{:?}", value));
                    println!("Value: {}", rendered);
                }
            }
        }
        None => println!("Match: none"),
    }
    if !explanation.fuzzy_candidates.is_empty() {
        println!("Fuzzy candidates (in document order):");
        for candidate in &explanation.fuzzy_candidates {
            println!("  {}", candidate);
        }
    }

    Ok(if explanation.hit.is_some() { 0 } else { 1 })
}

fn build_index(report: &ImportReport, options: &ConverterOptions) -> TokenIndex {
    let mut index = TokenIndex::with_prefixes(options.collection_prefixes.iter().cloned());
    index.add_prefix(&options.collection);
    for token in report.tokens.iter() {
        index.insert(token.qualified_name.clone(), token.id.clone());
    }
    index
}
