//! Typed client for the vCloud Director REST API
//!
//! Entities (`Org`, `Vdc`, `Catalog`, `VApp`, `Vm`, ...) wrap the decoded XML
//! document together with a cheap [`Client`] handle; they are built by a
//! lookup or a create call and stay a snapshot until `refresh` is called.

pub mod admin_org;
pub mod catalog;
pub mod catalog_item;
pub mod client;
pub mod common;
pub mod config;
pub mod disk;
pub mod edge_gateway;
pub mod error;
pub mod filter;
pub mod href;
pub mod lookup;
pub mod media;
pub mod metadata;
pub mod nsxv;
pub mod org;
pub mod pool;
pub mod query;
pub mod response;
pub mod session;
pub mod task;
pub mod upload;
pub mod user;
pub mod vapp;
pub mod vapp_template;
pub mod vdc;
pub mod version;
pub mod vm;

#[cfg(test)]
mod test_helpers;

pub use admin_org::AdminOrg;
pub use catalog::{AdminCatalog, Catalog};
pub use catalog_item::CatalogItem;
pub use client::Client;
pub use config::{AuthType, ClientConfig, RetryConfig};
pub use disk::{Disk, DiskSpec};
pub use edge_gateway::EdgeGateway;
pub use error::ApiError;
pub use filter::{FilterDef, FilterKey, QueryItem};
pub use media::Media;
pub use metadata::{MetadataHolder, MetadataType};
pub use nsxv::{FirewallRule, NatRule};
pub use org::Org;
pub use query::{Query, QueryType};
pub use task::{Task, TaskStatus};
pub use upload::{UploadProgress, UploadTask};
pub use user::{OrgUser, OrgUserConfiguration};
pub use vapp::{UndeployAction, VApp};
pub use vapp_template::VAppTemplate;
pub use vdc::Vdc;
pub use vm::Vm;
