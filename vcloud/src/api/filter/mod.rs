//! Client-side filtering of query results
//!
//! A [`FilterDef`] collects criteria (name and IP regexes, date expressions,
//! parent scoping, metadata matches and latest/earliest selection). The engine
//! turns it into [`Condition`]s, runs the matching query and keeps the
//! [`QueryItem`]s that satisfy every condition.

mod condition;
mod date;
mod definition;
mod engine;
mod item;

pub use condition::Condition;
pub use date::{parse_date, DateExpr, DateOp};
pub use definition::{FilterDef, FilterKey, MetadataDef};
pub use engine::{build_conditions, select_items};
pub use item::QueryItem;
