use std::collections::HashSet;

use anyhow::{Result, bail};
use rand::SeedableRng;
use rand::rngs::StdRng;
use rand::seq::index;
use tracing::info;

use crate::cli::SampleArgs;
use crate::dataset::{
    CHUNKS_FILE, DOCUMENTS_FILE, Dataset, EVENTS_FILE, RUNS_FILE, SCENARIOS_FILE,
};
use crate::table::Table;
use crate::util::ensure_directory;

pub fn run(args: SampleArgs) -> Result<()> {
    let dataset = Dataset::load(&args.data_dir)?;
    let sample = draw_sample(&dataset, args.n_events, args.seed)?;

    ensure_directory(&args.out)?;
    sample.documents.write_csv(&args.out.join(DOCUMENTS_FILE))?;
    sample.chunks.write_csv(&args.out.join(CHUNKS_FILE))?;
    sample.runs.write_csv(&args.out.join(RUNS_FILE))?;
    sample.scenarios.write_csv(&args.out.join(SCENARIOS_FILE))?;
    sample.events.write_csv(&args.out.join(EVENTS_FILE))?;

    info!(
        events = sample.events.len(),
        runs = sample.runs.len(),
        chunks = sample.chunks.len(),
        documents = sample.documents.len(),
        scenarios = sample.scenarios.len(),
        out = %args.out.display(),
        "sample created"
    );

    Ok(())
}

/// Draws `n_events` event rows (capped at the table size) uniformly without
/// replacement, then restricts every other table to the rows reachable from
/// the sample by foreign key, so referential closure holds on the output.
pub fn draw_sample(dataset: &Dataset, n_events: usize, seed: u64) -> Result<Dataset> {
    let events = sample_events(&dataset.events, n_events, seed);

    let run_ids = collect_ids(&events, "run_id")?;
    let chunk_ids = collect_ids(&events, "chunk_id")?;
    let mut scenario_ids = if events.has_column("scenario_id") {
        collect_ids(&events, "scenario_id")?
    } else {
        HashSet::new()
    };

    let Some(run_key) = dataset.runs.column("run_id") else {
        bail!("[{}] expected column 'run_id'", dataset.runs.name());
    };
    let runs = dataset.runs.filter_by_key_set(run_key, &run_ids);
    // runs may reference scenarios no sampled event names directly
    if let Some(scenario_key) = runs.column("scenario_id") {
        scenario_ids.extend(
            runs.distinct_non_null(scenario_key)
                .into_iter()
                .map(ToOwned::to_owned),
        );
    }

    let Some(chunk_key) = dataset.chunks.column("chunk_id") else {
        bail!("[{}] expected column 'chunk_id'", dataset.chunks.name());
    };
    let chunks = dataset.chunks.filter_by_key_set(chunk_key, &chunk_ids);

    let doc_ids = match chunks.column("doc_id") {
        Some(doc_key) => chunks
            .distinct_non_null(doc_key)
            .into_iter()
            .map(ToOwned::to_owned)
            .collect::<HashSet<String>>(),
        None => HashSet::new(),
    };
    let documents = match dataset.documents.column("doc_id") {
        Some(doc_key) => dataset.documents.filter_by_key_set(doc_key, &doc_ids),
        None => dataset.documents.empty_like(),
    };

    let Some(scenario_key) = dataset.scenarios.column("scenario_id") else {
        bail!("[{}] expected column 'scenario_id'", dataset.scenarios.name());
    };
    let scenarios = dataset.scenarios.filter_by_key_set(scenario_key, &scenario_ids);

    Ok(Dataset {
        documents,
        chunks,
        runs,
        scenarios,
        events,
    })
}

fn sample_events(events: &Table, n_events: usize, seed: u64) -> Table {
    let amount = n_events.min(events.len());
    let mut rng = StdRng::seed_from_u64(seed);
    let mut positions = index::sample(&mut rng, events.len(), amount).into_vec();
    // the drawn set is fixed by the seed; emit it in source order
    positions.sort_unstable();

    let mut sampled = events.empty_like();
    for position in positions {
        sampled.push_row(events.rows()[position].clone());
    }
    sampled
}

fn collect_ids(table: &Table, column: &str) -> Result<HashSet<String>> {
    let Some(index) = table.column(column) else {
        bail!("[{}] expected column '{column}'", table.name());
    };
    Ok(table
        .distinct_non_null(index)
        .into_iter()
        .map(ToOwned::to_owned)
        .collect())
}
