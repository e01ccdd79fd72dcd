use std::fmt;

use super::common::nest;
use super::to_sql::ToSql;
use crate::config::QueryConfig;
use crate::select_plan::{
    ProjectionColumn, ProjectionState, SelectExpr, SourceExpr, SourcePayload,
    DEFAULT_COLUMN_ALIAS,
};

impl ToSql for ProjectionColumn {
    fn to_sql(&self, config: &QueryConfig) -> String {
        let expr = self.expression.to_sql(config);
        match self.expression.access_name() {
            Some(name) if name == self.alias => expr,
            _ => format!("{} AS {}", expr, self.alias),
        }
    }
}

impl ToSql for SourceExpr {
    fn to_sql(&self, config: &QueryConfig) -> String {
        let payload = match self.payload() {
            SourcePayload::Root(container) => container.alias.clone(),
            SourcePayload::Select(select) => nest(&select.to_sql(config), config.indent_width),
            SourcePayload::Collection(expr) => expr.to_sql(config),
            SourcePayload::Raw(raw) => format!("({})", raw.sql),
        };

        if self.with_in() {
            format!("{} IN {}", self.alias(), payload)
        } else {
            format!("{} {}", payload, self.alias())
        }
    }
}

fn select_clause(select: &SelectExpr, config: &QueryConfig) -> String {
    let mut clause = String::from("SELECT ");
    if select.is_distinct() {
        clause.push_str("DISTINCT ");
    }
    if select.uses_single_value_projection() {
        clause.push_str("VALUE ");
    }

    // An unfrozen block is previewed as if it were frozen now.
    let preview;
    let columns = match select.projection_state() {
        ProjectionState::Frozen { columns, .. } => columns.as_slice(),
        pending @ ProjectionState::Pending(_) => {
            let mut frozen = pending.clone();
            frozen.freeze(DEFAULT_COLUMN_ALIAS);
            preview = frozen;
            preview.columns()
        }
    };

    if columns.is_empty() {
        clause.push('1');
    } else if select.uses_single_value_projection() {
        clause.push_str(&columns[0].expression.to_sql(config));
    } else {
        let rendered: Vec<String> = columns.iter().map(|c| c.to_sql(config)).collect();
        clause.push_str(&rendered.join(", "));
    }
    clause
}

fn paging_clause(select: &SelectExpr, config: &QueryConfig) -> Option<String> {
    match (select.offset(), select.limit()) {
        (None, None) => None,
        (Some(offset), None) => Some(format!("OFFSET {} ROWS", offset.to_sql(config))),
        (offset, Some(limit)) => Some(format!(
            "OFFSET {} ROWS FETCH NEXT {} ROWS ONLY",
            offset.map(|o| o.to_sql(config)).unwrap_or_else(|| "0".to_string()),
            limit.to_sql(config)
        )),
    }
}

impl ToSql for SelectExpr {
    fn to_sql(&self, config: &QueryConfig) -> String {
        let mut lines = vec![select_clause(self, config)];

        for (i, source) in self.sources().iter().enumerate() {
            let keyword = if i == 0 { "FROM" } else { "JOIN" };
            lines.push(format!("{} {}", keyword, source.to_sql(config)));
        }

        if let Some(predicate) = self.predicate() {
            lines.push(format!("WHERE {}", predicate.to_sql(config)));
        }

        if !self.orderings().is_empty() {
            let keys: Vec<String> = self.orderings().iter().map(|o| o.to_sql(config)).collect();
            lines.push(format!("ORDER BY {}", keys.join(", ")));
        }

        if let Some(paging) = paging_clause(self, config) {
            lines.push(paging);
        }

        lines.join("\n")
    }
}

/// The binding table followed by the query text.
pub fn debug_view(select: &SelectExpr, config: &QueryConfig) -> String {
    let pad = " ".repeat(config.indent_width);
    let mut out = String::from("Projection Mapping:\n");

    match select.projection_state() {
        ProjectionState::Pending(mapping) => {
            for (member, expr) in mapping.iter() {
                out.push_str(&format!("{}{} -> {}\n", pad, member, expr.to_sql(config)));
            }
        }
        ProjectionState::Frozen { bindings, .. } => {
            for (member, index) in bindings.iter() {
                out.push_str(&format!("{}{} -> column #{}\n", pad, member, index));
            }
        }
    }

    out.push_str(&select.to_sql(config));
    out
}

impl fmt::Display for SelectExpr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_sql(&QueryConfig::default()))
    }
}
