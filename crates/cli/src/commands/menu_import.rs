//! Import of the legacy per-restaurant menu export.
//!
//! # Usage
//!
//! ```bash
//! pf-cli menu import-legacy menu-export.json
//! ```
//!
//! The export maps each restaurant id to its menu entries:
//!
//! ```json
//! { "thai-garden": [ { "id": "pad-thai", "name": "Pad Thai",
//!                      "description": "", "price": 12.5,
//!                      "available": true, "category": "Noodles" } ] }
//! ```
//!
//! Entries are validated like admin input and upserted into `menu_items`
//! under their original ids. Categories are matched by name
//! (case-insensitive) and created when missing.

use std::collections::{BTreeMap, HashMap};
use std::path::Path;

use rust_decimal::Decimal;
use serde::Deserialize;

use plateful_admin::db::MenuRepository;
use plateful_admin::models::{MenuItemInput, NewCategory, ValidMenuItem};
use plateful_core::order::FieldError;
use plateful_core::{CategoryId, MenuItemId, RestaurantId};

use super::{CommandError, connect};

/// One entry of the legacy export.
#[derive(Debug, Clone, Deserialize)]
pub struct LegacyMenuItem {
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub price: Option<Decimal>,
    #[serde(default = "default_available")]
    pub available: bool,
    #[serde(default)]
    pub category: Option<String>,
}

const fn default_available() -> bool {
    true
}

/// Restaurant id to menu entries.
pub type LegacyExport = BTreeMap<String, Vec<LegacyMenuItem>>;

/// A validated entry ready to write.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlannedItem {
    pub restaurant_id: RestaurantId,
    pub item_id: MenuItemId,
    pub category: Option<String>,
    pub item: ValidMenuItem,
}

/// An entry that was not imported.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rejected {
    pub restaurant: String,
    pub item: String,
    pub reason: String,
}

/// Outcome of an import run.
#[derive(Debug, Default)]
pub struct ImportSummary {
    pub imported: usize,
    pub categories_created: usize,
    pub rejected: Vec<Rejected>,
}

/// Parse an export document.
///
/// # Errors
///
/// Returns `CommandError::Parse` if the document does not have the legacy shape.
pub fn parse_export(json: &str) -> Result<LegacyExport, CommandError> {
    Ok(serde_json::from_str(json)?)
}

/// Validate every entry, splitting the export into writable items and
/// rejections.
#[must_use]
pub fn plan(export: LegacyExport) -> (Vec<PlannedItem>, Vec<Rejected>) {
    let mut planned = Vec::new();
    let mut rejected = Vec::new();

    for (restaurant, entries) in export {
        let restaurant_id = match RestaurantId::parse(&restaurant) {
            Ok(id) => id,
            Err(e) => {
                rejected.extend(entries.into_iter().map(|entry| Rejected {
                    restaurant: restaurant.clone(),
                    item: entry.id,
                    reason: format!("invalid restaurant id: {e}"),
                }));
                continue;
            }
        };

        for entry in entries {
            let reject = |reason: String| Rejected {
                restaurant: restaurant.clone(),
                item: entry.id.clone(),
                reason,
            };

            let item_id = match MenuItemId::parse(&entry.id) {
                Ok(id) => id,
                Err(e) => {
                    rejected.push(reject(format!("invalid item id: {e}")));
                    continue;
                }
            };

            let input = MenuItemInput {
                name: entry.name.clone(),
                description: entry.description.clone(),
                price: entry.price,
                category_id: None,
                is_available: entry.available,
                image_url: None,
            };
            match input.validate() {
                Ok(item) => planned.push(PlannedItem {
                    restaurant_id: restaurant_id.clone(),
                    item_id,
                    category: entry
                        .category
                        .as_deref()
                        .map(str::trim)
                        .filter(|c| !c.is_empty())
                        .map(str::to_string),
                    item,
                }),
                Err(fields) => rejected.push(reject(describe(&fields))),
            }
        }
    }

    (planned, rejected)
}

fn describe(fields: &[FieldError]) -> String {
    fields
        .iter()
        .map(|f| format!("{}: {}", f.field, f.message))
        .collect::<Vec<_>>()
        .join("; ")
}

/// Category ids by lowercased name, loaded per restaurant on first use.
#[derive(Default)]
struct CategoryCache {
    by_restaurant: HashMap<RestaurantId, HashMap<String, CategoryId>>,
}

impl CategoryCache {
    async fn resolve(
        &mut self,
        repo: &MenuRepository<'_>,
        restaurant_id: &RestaurantId,
        name: &str,
        summary: &mut ImportSummary,
    ) -> Result<CategoryId, CommandError> {
        if !self.by_restaurant.contains_key(restaurant_id) {
            let existing = repo
                .categories(restaurant_id)
                .await?
                .into_iter()
                .map(|c| (c.name.to_lowercase(), c.id))
                .collect();
            self.by_restaurant.insert(restaurant_id.clone(), existing);
        }
        let known = self.by_restaurant.entry(restaurant_id.clone()).or_default();

        let key = name.to_lowercase();
        if let Some(id) = known.get(&key) {
            return Ok(id.clone());
        }

        let created = repo
            .create_category(
                restaurant_id,
                &NewCategory {
                    name: name.to_string(),
                    position: None,
                },
            )
            .await?;
        summary.categories_created += 1;
        known.insert(key, created.id.clone());
        Ok(created.id)
    }
}

/// Import an export file into `menu_items`.
///
/// Entries that fail validation or whose write fails are reported in the
/// summary; the rest are still imported.
///
/// # Errors
///
/// Returns an error if the file cannot be read or parsed, or the database
/// is unreachable.
pub async fn import_legacy(path: &Path) -> Result<ImportSummary, CommandError> {
    let raw = tokio::fs::read_to_string(path)
        .await
        .map_err(|source| CommandError::Io {
            path: path.display().to_string(),
            source,
        })?;
    let (planned, rejected) = plan(parse_export(&raw)?);
    tracing::info!(
        valid = planned.len(),
        rejected = rejected.len(),
        "Legacy menu parsed"
    );

    let pool = connect().await?;
    let repo = MenuRepository::new(&pool);
    let mut categories = CategoryCache::default();
    let mut summary = ImportSummary {
        rejected,
        ..ImportSummary::default()
    };

    for PlannedItem {
        restaurant_id,
        item_id,
        category,
        mut item,
    } in planned
    {
        let written = async {
            if let Some(name) = &category {
                item.category_id = Some(
                    categories
                        .resolve(&repo, &restaurant_id, name, &mut summary)
                        .await?,
                );
            }
            repo.upsert_item(&restaurant_id, &item_id, &item).await?;
            Ok::<_, CommandError>(())
        }
        .await;

        match written {
            Ok(()) => summary.imported += 1,
            Err(e) => {
                tracing::warn!(restaurant_id = %restaurant_id, item_id = %item_id, error = %e, "Import failed");
                summary.rejected.push(Rejected {
                    restaurant: restaurant_id.to_string(),
                    item: item_id.to_string(),
                    reason: e.to_string(),
                });
            }
        }
    }

    Ok(summary)
}
