use std::collections::{BTreeMap, BTreeSet, VecDeque};

use serde::Serialize;

use crate::schema::Schema;

/// A foreign-key dependency: `to` must be generated after `from`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize)]
pub struct DependencyEdge {
    pub from: String,
    pub to: String,
}

/// Result of ordering tables by their foreign-key dependencies.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum PlanOutcome {
    Ordered(Vec<String>),
    /// The graph has a cycle; tables fall back to declaration order.
    Cyclic {
        fallback: Vec<String>,
        offending_edges: Vec<DependencyEdge>,
    },
}

impl PlanOutcome {
    /// Order in which tables are generated.
    pub fn order(&self) -> &[String] {
        match self {
            PlanOutcome::Ordered(order) => order,
            PlanOutcome::Cyclic { fallback, .. } => fallback,
        }
    }

    pub fn offending_edges(&self) -> Option<&[DependencyEdge]> {
        match self {
            PlanOutcome::Ordered(_) => None,
            PlanOutcome::Cyclic {
                offending_edges, ..
            } => Some(offending_edges),
        }
    }

    pub fn is_cyclic(&self) -> bool {
        matches!(self, PlanOutcome::Cyclic { .. })
    }
}

/// Order tables so that every referenced table precedes its referrers.
pub fn plan_tables(schema: &Schema) -> PlanOutcome {
    let declared: Vec<String> = schema.tables.iter().map(|t| t.name.clone()).collect();
    let graph = build_adjacency(schema);

    match toposort(&declared, &graph) {
        Ok(order) => PlanOutcome::Ordered(order),
        Err(remaining) => {
            let offending_edges = graph
                .iter()
                .filter(|(from, _)| remaining.contains(*from))
                .flat_map(|(from, targets)| {
                    targets
                        .iter()
                        .filter(|to| remaining.contains(*to))
                        .map(|to| DependencyEdge {
                            from: from.clone(),
                            to: to.clone(),
                        })
                })
                .collect();
            PlanOutcome::Cyclic {
                fallback: declared,
                offending_edges,
            }
        }
    }
}

/// Successor lists keyed by referenced table, targets in first-seen order.
fn build_adjacency(schema: &Schema) -> BTreeMap<String, Vec<String>> {
    let mut graph: BTreeMap<String, Vec<String>> = schema
        .tables
        .iter()
        .map(|table| (table.name.clone(), Vec::new()))
        .collect();

    for table in &schema.tables {
        for fk in &table.foreign_keys {
            let Some(targets) = graph.get_mut(&fk.ref_table) else {
                continue;
            };
            if !targets.contains(&table.name) {
                targets.push(table.name.clone());
            }
        }
    }

    graph
}

fn toposort(
    declared: &[String],
    graph: &BTreeMap<String, Vec<String>>,
) -> Result<Vec<String>, BTreeSet<String>> {
    let mut indegree: BTreeMap<&str, usize> =
        declared.iter().map(|name| (name.as_str(), 0)).collect();
    for targets in graph.values() {
        for target in targets {
            if let Some(count) = indegree.get_mut(target.as_str()) {
                *count += 1;
            }
        }
    }

    let mut ready: VecDeque<&str> = declared
        .iter()
        .map(String::as_str)
        .filter(|name| indegree.get(name) == Some(&0))
        .collect();
    let mut order = Vec::with_capacity(declared.len());

    while let Some(node) = ready.pop_front() {
        order.push(node.to_string());
        if let Some(targets) = graph.get(node) {
            for target in targets {
                if let Some(count) = indegree.get_mut(target.as_str()) {
                    *count = count.saturating_sub(1);
                    if *count == 0 {
                        ready.push_back(target.as_str());
                    }
                }
            }
        }
    }

    if order.len() == declared.len() {
        Ok(order)
    } else {
        Err(indegree
            .into_iter()
            .filter_map(|(node, count)| (count > 0).then(|| node.to_string()))
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::normalize::normalize_schema;
    use serde_json::json;

    fn schema(raw: serde_json::Value) -> Schema {
        normalize_schema(&raw).unwrap()
    }

    #[test]
    fn toposort_orders_dependencies() {
        let schema = schema(json!({
            "tables": {
                "orders": { "foreign_keys": [{ "column": "customer_id", "ref_table": "customers" }] },
                "customers": {},
                "items": { "foreign_keys": [{ "column": "order_id", "ref_table": "orders" }] }
            }
        }));
        let outcome = plan_tables(&schema);
        assert_eq!(
            outcome,
            PlanOutcome::Ordered(vec![
                "customers".to_string(),
                "orders".to_string(),
                "items".to_string()
            ])
        );
    }

    #[test]
    fn toposort_reports_cycle() {
        let schema = schema(json!({
            "tables": {
                "a": { "foreign_keys": [{ "column": "b_id", "ref_table": "b" }] },
                "b": { "foreign_keys": [{ "column": "a_id", "ref_table": "a" }] },
                "c": {}
            }
        }));
        let outcome = plan_tables(&schema);
        assert!(outcome.is_cyclic());
        assert_eq!(outcome.order(), &["a", "b", "c"]);
        let edges = outcome.offending_edges().unwrap();
        assert_eq!(edges.len(), 2);
        assert!(edges.iter().all(|edge| edge.from != "c" && edge.to != "c"));
    }

    #[test]
    fn self_reference_is_a_cycle() {
        let schema = schema(json!({
            "tables": { "node": { "foreign_keys": [{ "column": "parent", "ref_table": "node" }] } }
        }));
        let outcome = plan_tables(&schema);
        assert_eq!(
            outcome.offending_edges().unwrap(),
            &[DependencyEdge {
                from: "node".to_string(),
                to: "node".to_string()
            }]
        );
    }

    #[test]
    fn dangling_and_duplicate_references_are_harmless() {
        let schema = schema(json!({
            "tables": {
                "orders": { "foreign_keys": [
                    { "column": "customer_id", "ref_table": "customers" },
                    { "column": "billing_id", "ref_table": "customers" },
                    { "column": "ghost_id", "ref_table": "ghosts" }
                ] },
                "customers": {}
            }
        }));
        assert_eq!(
            plan_tables(&schema).order(),
            &["customers".to_string(), "orders".to_string()]
        );
    }
}
