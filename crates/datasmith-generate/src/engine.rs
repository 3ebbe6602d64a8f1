use std::collections::BTreeMap;
use std::time::Instant;

use tracing::{debug, info, warn};

use datasmith_core::{PlanOutcome, Row, Schema, plan_tables};

use crate::checks::check_row;
use crate::edge_cases::apply_edge_cases;
use crate::generators::generate_value;
use crate::model::{CompiledTable, GenerationOptions, GenerationOutcome, PoolArena, TableStats};
use crate::repair::repair_row;
use crate::rng::SequenceRng;

/// Entry point for generating a dataset from a normalized schema.
#[derive(Debug, Clone, Default)]
pub struct GenerationEngine {
    options: GenerationOptions,
}

impl GenerationEngine {
    pub fn new(options: GenerationOptions) -> Self {
        Self { options }
    }

    pub fn options(&self) -> &GenerationOptions {
        &self.options
    }

    /// Generate every table in dependency order from one seeded sequence.
    ///
    /// Never fails: rows that exhaust their repair attempts are committed as
    /// they are and counted, and a dependency cycle falls back to
    /// declaration order.
    pub fn run(&self, schema: &Schema) -> GenerationOutcome {
        let start = Instant::now();
        let dataset = &schema.dataset;
        let options = self.options.effective(&dataset.mode);
        let plan = plan_tables(schema);

        info!(
            dataset = %dataset.name,
            seed = dataset.seed,
            mode = %dataset.mode,
            tables = plan.order().len(),
            max_attempts = dataset.max_attempts,
            "generation started"
        );

        if let PlanOutcome::Cyclic {
            offending_edges, ..
        } = &plan
        {
            let edges: Vec<String> = offending_edges
                .iter()
                .map(|edge| format!("{}->{}", edge.from, edge.to))
                .collect();
            warn!(
                edges = %edges.join(", "),
                "foreign key cycle detected; generating in declaration order"
            );
        }

        let mut rng = SequenceRng::new(dataset.seed);
        let mut pools = PoolArena::new();
        let mut rows_by_table = BTreeMap::new();
        let mut stats = BTreeMap::new();

        for table_name in plan.order() {
            let Some(table) = schema.table(table_name) else {
                continue;
            };
            let table_start = Instant::now();
            let compiled = CompiledTable::new(table);
            let requested = schema.rows_for(table_name);
            info!(table = %table_name, rows = requested, "generating table");

            pools.begin_table(table);
            let mut rows = Vec::with_capacity(row_capacity(requested));
            let mut table_stats = TableStats {
                rows_requested: requested,
                ..TableStats::default()
            };

            for row_index in 0..requested {
                let result = repair_row(
                    dataset.max_attempts,
                    || build_row(&compiled, schema, &options, &pools, &mut rng),
                    |row| check_row(&compiled, row, &pools),
                );
                table_stats.repair_attempts += u64::from(result.attempts);
                if let Some(rejection) = &result.rejection {
                    table_stats.exhausted_rows += 1;
                    debug!(
                        table = %table_name,
                        row = row_index,
                        attempts = result.attempts,
                        reason = %rejection,
                        "row committed after exhausting repair attempts"
                    );
                }
                pools.commit(table, &result.row);
                rows.push(result.row);
            }

            table_stats.rows_generated = rows.len() as u64;
            info!(
                table = %table_name,
                rows_generated = table_stats.rows_generated,
                repair_attempts = table_stats.repair_attempts,
                exhausted_rows = table_stats.exhausted_rows,
                duration_ms = table_start.elapsed().as_millis() as u64,
                "table generated"
            );
            stats.insert(table_name.clone(), table_stats);
            rows_by_table.insert(table_name.clone(), rows);
        }

        let dataset_id = format!("synth-{:06}", (rng.next_unit() * 999_999.0).floor() as u64);
        info!(
            dataset_id = %dataset_id,
            duration_ms = start.elapsed().as_millis() as u64,
            "generation completed"
        );

        GenerationOutcome {
            dataset_id,
            plan,
            rows_by_table,
            pools,
            stats,
        }
    }
}

/// Largest up-front row allocation; bigger tables grow as they fill.
const MAX_PREALLOCATED_ROWS: u64 = 1 << 16;

fn row_capacity(requested: u64) -> usize {
    usize::try_from(requested.min(MAX_PREALLOCATED_ROWS)).unwrap_or(0)
}

/// One candidate row: base value then edge cases, column by column.
fn build_row(
    table: &CompiledTable<'_>,
    schema: &Schema,
    options: &GenerationOptions,
    pools: &PoolArena,
    rng: &mut SequenceRng,
) -> Row {
    let mut row = Row::with_capacity(table.columns.len());
    for compiled in &table.columns {
        let base = generate_value(compiled, &schema.dataset.mode, pools, rng);
        let value = apply_edge_cases(base, compiled.column, options, rng);
        row.insert(compiled.column.name.clone(), value);
    }
    row
}
