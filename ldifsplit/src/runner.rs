//! One tool invocation, end to end: validate the configuration, load the
//! schema, build the strategy, run the pipeline, print the summary.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use tracing::info;

use ldifsplit_core::Schema;
use ldifsplit_router::{OutsideHandling, SplitStrategy, Translator};

use crate::args::{Cli, SplitCommand};
use crate::dispatcher::{Dispatcher, RunSummary};
use crate::{pipeline, source};

pub fn run(cli: Cli) -> Result<RunSummary> {
    let global = &cli.global;
    let base_path = resolve_base_path(global)?;
    let schema = load_schema(global)?;
    let outside = OutsideHandling::from_flags(
        global.outside_to_all_sets,
        global.outside_to_dedicated_set,
    );

    let strategy = build_strategy(&cli, schema, outside)?;
    let translator = Arc::new(Translator::new(strategy));

    let source = source::open_source(&global.source_ldif, global.source_compressed)?;
    let stream = pipeline::spawn(
        source,
        Arc::clone(&translator),
        global.num_threads as usize,
    );

    info!(
        base = %global.split_base_dn,
        threads = global.num_threads,
        "splitting LDIF data below the base DN"
    );

    let dispatcher = Dispatcher::new(base_path, global.compress_target, translator);
    let summary = dispatcher.run(stream)?;
    print_summary(&summary);
    Ok(summary)
}

fn resolve_base_path(global: &crate::args::GlobalArgs) -> Result<PathBuf> {
    if let Some(path) = &global.target_ldif_base_path {
        return Ok(path.clone());
    }
    match global.source_ldif.len() {
        0 => bail!(
            "--targetLDIFBasePath is required when reading from standard input"
        ),
        1 => Ok(global.source_ldif[0].clone()),
        _ => bail!(
            "--targetLDIFBasePath is required when multiple --sourceLDIF values are provided"
        ),
    }
}

/// Explicit schema paths are authoritative and their failures fatal; with
/// none given, `$INSTANCE_ROOT/config/schema` is tried quietly.
fn load_schema(global: &crate::args::GlobalArgs) -> Result<Option<Schema>> {
    if !global.schema_path.is_empty() {
        let schema = Schema::load_paths(&global.schema_path).context("unable to load schema")?;
        return Ok(Some(schema));
    }
    Ok(Schema::from_instance_root())
}

fn build_strategy(
    cli: &Cli,
    schema: Option<Schema>,
    outside: OutsideHandling,
) -> Result<SplitStrategy> {
    let base = cli.global.split_base_dn.clone();
    let strategy = match &cli.command {
        SplitCommand::HashOnRdn(args) => {
            SplitStrategy::hash_on_rdn(base, args.num_sets, outside)?
        }
        SplitCommand::HashOnAttribute(args) => SplitStrategy::hash_on_attribute(
            base,
            args.num_sets,
            args.attribute_name.clone(),
            args.use_all_values,
            args.assume_flat_dit,
            outside,
        )?,
        SplitCommand::FewestEntries(args) => SplitStrategy::fewest_entries(
            base,
            args.num_sets,
            args.assume_flat_dit,
            outside,
        )?,
        SplitCommand::Filter(args) => SplitStrategy::filter(
            base,
            args.filter.clone(),
            schema,
            args.assume_flat_dit,
            outside,
        )?,
    };
    Ok(strategy)
}

fn print_summary(summary: &RunSummary) {
    println!("Processing complete. Read {} total entries.", summary.entries_read);
    if summary.entries_excluded > 0 {
        println!("Excluded {} entries.", summary.entries_excluded);
    }
    for (path, entries) in &summary.files {
        println!("{} entries written to {}", entries, path.display());
    }
}
