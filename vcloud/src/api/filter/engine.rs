use super::condition::Condition;
use super::date::{parse_date, DateExpr};
use super::definition::{compile, FilterDef, FilterKey};
use super::item::QueryItem;
use crate::api::error::ApiError;
use crate::api::query::{escape_filter_value, Query, QueryType};
use crate::api::Client;

/// Compiles the criteria of `def` that are evaluated on the client
pub fn build_conditions(def: &FilterDef) -> Result<Vec<Condition>, ApiError> {
    let mut conditions = Vec::new();

    for (key, value) in def.filters() {
        let condition = match key {
            FilterKey::NameRegex => Condition::Name(compile(key.as_str(), value)?),
            FilterKey::Ip => Condition::Ip(compile(key.as_str(), value)?),
            FilterKey::Date => Condition::Date(DateExpr::parse(value)?),
            FilterKey::Parent => Condition::Parent(value.to_string()),
            FilterKey::ParentId => Condition::ParentId(value.to_string()),
            FilterKey::Latest | FilterKey::Earliest => continue,
        };
        conditions.push(condition);
    }

    if !def.use_metadata_api_filter() {
        for m in def.metadata() {
            conditions.push(Condition::Metadata {
                key: m.key.clone(),
                value: compile(&m.key, &m.value)?,
                is_system: m.is_system,
            });
        }
    }

    Ok(conditions)
}

/// Keeps the items matching every condition, then applies latest/earliest
pub fn select_items(items: Vec<QueryItem>, def: &FilterDef) -> Result<Vec<QueryItem>, ApiError> {
    let conditions = build_conditions(def)?;

    let mut candidates = Vec::new();
    for item in items {
        let mut keep = true;
        for condition in &conditions {
            if !condition.matches(&item)? {
                keep = false;
                break;
            }
        }
        if keep {
            candidates.push(item);
        }
    }

    if def.flag(FilterKey::Latest) {
        Ok(pick_by_date(candidates, true))
    } else if def.flag(FilterKey::Earliest) {
        Ok(pick_by_date(candidates, false))
    } else {
        Ok(candidates)
    }
}

/// Reduces `candidates` to the newest (or oldest) one with a parseable date
fn pick_by_date(candidates: Vec<QueryItem>, newest: bool) -> Vec<QueryItem> {
    let total = candidates.len();
    let picked = candidates
        .into_iter()
        .filter_map(|item| {
            let when = parse_date(item.date()?).ok()?.when;
            Some((when, item))
        })
        .reduce(|best, next| {
            let better = if newest {
                next.0 > best.0
            } else {
                next.0 < best.0
            };
            if better {
                next
            } else {
                best
            }
        });

    match picked {
        Some((_, item)) => vec![item],
        None => {
            if total > 0 {
                tracing::warn!(
                    "None of {} candidates has a usable date, nothing selected",
                    total
                );
            }
            Vec::new()
        }
    }
}

/// Builds the records query that feeds a filter search
pub(crate) fn query_for(query_type: QueryType, def: &FilterDef) -> Query {
    let mut query = Query::new(query_type);

    if let (Some(parent), Some(field)) = (def.get(FilterKey::Parent), query_type.parent_name_field())
    {
        query = query.and_filter(format!("{}=={}", field, escape_filter_value(parent)));
    }

    if def.metadata().is_empty() {
        return query;
    }

    if def.use_metadata_api_filter() {
        for m in def.metadata() {
            query = query.and_filter(format!(
                "metadata{}:{}=={}:{}",
                if m.is_system { "@SYSTEM" } else { "" },
                m.key,
                m.kind.query_name(),
                escape_filter_value(&m.value)
            ));
        }
    } else {
        let mut fields: Vec<String> = query_type
            .default_fields()
            .iter()
            .map(|f| f.to_string())
            .collect();
        for m in def.metadata() {
            fields.push(format!(
                "metadata{}:{}",
                if m.is_system { "@SYSTEM" } else { "" },
                m.key
            ));
        }
        query = query.with_fields(fields.join(","));
    }

    query
}

impl Client {
    /// Runs a query of `query_type` and returns the items matching `def`
    pub async fn search_by_filter(
        &self,
        query_type: QueryType,
        def: &FilterDef,
    ) -> Result<Vec<QueryItem>, ApiError> {
        let query = query_for(query_type, def);
        tracing::debug!(
            "Searching {} with filter [{}]",
            query_type,
            def.describe()
        );
        let records = self.query_with_admin(query).await?;
        select_items(records.into_items(), def)
    }
}

#[cfg(test)]
#[path = "./engine_test.rs"]
mod engine_test;
