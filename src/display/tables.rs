//! Table formatting for `info` and `search` output.

use comfy_table::{
    Attribute, Cell, CellAlignment, Color, ContentArrangement, Table,
    modifiers::UTF8_ROUND_CORNERS, presets::UTF8_FULL,
};

use crate::index::{ClusterFailure, LoadOutcome};
use crate::search::SearchResult;

fn new_table(headers: &[&str]) -> Table {
    let mut table = Table::new();
    table.load_preset(UTF8_FULL);
    table.apply_modifier(UTF8_ROUND_CORNERS);
    table.set_content_arrangement(ContentArrangement::Dynamic);
    table.set_header(
        headers
            .iter()
            .map(|h| Cell::new(h).add_attribute(Attribute::Bold))
            .collect::<Vec<_>>(),
    );
    table
}

fn number(value: impl ToString) -> Cell {
    Cell::new(value.to_string()).set_alignment(CellAlignment::Right)
}

/// One row per manifest cluster: declared count, loaded count and status.
pub fn create_cluster_table(outcome: &LoadOutcome) -> String {
    let mut table = new_table(&["Cluster", "Declared", "Loaded", "Status"]);

    for entry in &outcome.manifest.clusters {
        let loaded = outcome.index.cluster(entry.cluster_id).map(|c| c.count());
        let failure = outcome
            .cluster_errors
            .iter()
            .find(|f| f.cluster_id == entry.cluster_id);

        let status = match (loaded, failure) {
            (_, Some(failure)) => Cell::new(failure.error.status_code()).fg(Color::Red),
            (Some(_), None) if entry.is_empty() => Cell::new("empty").fg(Color::DarkGrey),
            (Some(_), None) => Cell::new("ok").fg(Color::Green),
            (None, None) => Cell::new("missing").fg(Color::Yellow),
        };

        table.add_row(vec![
            number(entry.cluster_id),
            number(entry.count),
            number(loaded.map_or_else(|| "-".to_string(), |c| c.to_string())),
            status,
        ]);
    }

    table.to_string()
}

/// Dropped clusters with the reason each one failed.
pub fn create_failure_table(failures: &[ClusterFailure]) -> String {
    let mut table = new_table(&["Cluster", "Code", "Error"]);
    for failure in failures {
        table.add_row(vec![
            number(failure.cluster_id),
            Cell::new(failure.error.status_code()),
            Cell::new(failure.error.to_string()),
        ]);
    }
    table.to_string()
}

/// Ranked search hits.
pub fn create_results_table(results: &[SearchResult]) -> String {
    let mut table = new_table(&["#", "Score", "Cluster", "Kind", "Id", "Text"]);
    for (rank, result) in results.iter().enumerate() {
        table.add_row(vec![
            number(rank + 1),
            number(format!("{:.4}", result.score.get())),
            number(result.cluster_id),
            Cell::new(result.metadata.kind_str()),
            Cell::new(&result.id),
            Cell::new(&result.text),
        ]);
    }
    table.to_string()
}
