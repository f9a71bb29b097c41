//! SQLite-backed task store.
//!
//! # Responsibility
//! - Persist items in the `items` table created by migration 1.
//! - Keep SQL details behind the `TaskStore` boundary.
//!
//! # Invariants
//! - Container listing is deterministic: `sort_order, created_at, id`.
//! - A bulk order write either applies every entry or none (one transaction).
//! - The connection is never touched across an await point.

use super::events::{TaskEvent, TaskEventBus};
use super::{ItemPatch, NewItem, OrderUpdate, StoreError, StoreResult, TaskStore};
use crate::db::migrations::ensure_current;
use crate::db::{open_db, open_db_in_memory};
use crate::model::item::{ContainerId, Item, ItemId, ItemType};
use async_trait::async_trait;
use log::{error, info};
use rusqlite::types::Value;
use rusqlite::{params, params_from_iter, Connection, Row, TransactionBehavior};
use std::path::Path;
use std::sync::{Mutex, PoisonError};
use uuid::Uuid;

const ITEM_SELECT_SQL: &str = "SELECT
    id,
    container_id,
    item_type,
    content,
    sort_order,
    group_id,
    is_collapsed,
    created_at
FROM items";

/// `TaskStore` over one SQLite connection.
#[derive(Debug)]
pub struct SqliteTaskStore {
    conn: Mutex<Connection>,
    events: Option<TaskEventBus>,
}

impl SqliteTaskStore {
    /// Wraps a migrated connection.
    ///
    /// # Errors
    /// - `StoreError::Db(DbError::SchemaMismatch)` when the connection is not
    ///   at the current schema version.
    pub fn try_new(conn: Connection) -> StoreResult<Self> {
        ensure_current(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
            events: None,
        })
    }

    pub fn open(path: impl AsRef<Path>) -> StoreResult<Self> {
        Self::try_new(open_db(path)?)
    }

    pub fn open_in_memory() -> StoreResult<Self> {
        Self::try_new(open_db_in_memory()?)
    }

    /// Publishes successful writes to `bus`.
    pub fn with_event_bus(mut self, bus: TaskEventBus) -> Self {
        self.events = Some(bus);
        self
    }

    /// Loads one item by id.
    pub fn get_item(&self, id: ItemId) -> StoreResult<Option<Item>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(&format!("{ITEM_SELECT_SQL} WHERE id = ?1;"))?;
            let mut rows = stmt.query([id.to_string()])?;
            if let Some(row) = rows.next()? {
                return Ok(Some(parse_item_row(row)?));
            }
            Ok(None)
        })
    }

    fn with_conn<T>(&self, f: impl FnOnce(&mut Connection) -> StoreResult<T>) -> StoreResult<T> {
        let mut conn = self.conn.lock().unwrap_or_else(PoisonError::into_inner);
        f(&mut conn)
    }

    fn publish(&self, event: TaskEvent) {
        if let Some(bus) = &self.events {
            bus.publish(event);
        }
    }

    fn create_sync(&self, request: &NewItem) -> StoreResult<Item> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO items (
                    id,
                    container_id,
                    item_type,
                    content,
                    sort_order,
                    group_id,
                    is_collapsed
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, 0);",
                params![
                    request.id.to_string(),
                    request.container_id.to_string(),
                    request.item_type.as_str(),
                    request.content.as_str(),
                    request.order,
                    request.group_id.map(|value| value.to_string()),
                ],
            )?;
            load_required_item(conn, request.id)
        })
    }

    fn update_sync(&self, id: ItemId, patch: &ItemPatch) -> StoreResult<()> {
        if patch.is_empty() {
            return Ok(());
        }

        let mut assignments = Vec::new();
        let mut bind_values: Vec<Value> = Vec::new();
        if let Some(content) = &patch.content {
            bind_values.push(Value::Text(content.clone()));
            assignments.push(format!("content = ?{}", bind_values.len()));
        }
        if let Some(container_id) = patch.container_id {
            bind_values.push(Value::Text(container_id.to_string()));
            assignments.push(format!("container_id = ?{}", bind_values.len()));
        }
        if let Some(order) = patch.order {
            bind_values.push(Value::Integer(order));
            assignments.push(format!("sort_order = ?{}", bind_values.len()));
        }
        if let Some(group_id) = patch.group_id {
            bind_values.push(group_id.map_or(Value::Null, |value| Value::Text(value.to_string())));
            assignments.push(format!("group_id = ?{}", bind_values.len()));
        }
        if let Some(is_collapsed) = patch.is_collapsed {
            bind_values.push(Value::Integer(bool_to_int(is_collapsed)));
            assignments.push(format!("is_collapsed = ?{}", bind_values.len()));
        }
        bind_values.push(Value::Text(id.to_string()));
        let sql = format!(
            "UPDATE items
             SET {},
                 updated_at = (strftime('%s', 'now') * 1000)
             WHERE id = ?{};",
            assignments.join(", "),
            bind_values.len()
        );

        self.with_conn(|conn| {
            let changed = conn.execute(&sql, params_from_iter(bind_values.iter()))?;
            if changed == 0 {
                return Err(StoreError::NotFound(id));
            }
            Ok(())
        })
    }

    fn update_order_sync(&self, updates: &[OrderUpdate]) -> StoreResult<()> {
        self.with_conn(|conn| {
            let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
            for update in updates {
                let changed = match update.group_id {
                    Some(group_id) => tx.execute(
                        "UPDATE items
                         SET sort_order = ?2,
                             group_id = ?3,
                             updated_at = (strftime('%s', 'now') * 1000)
                         WHERE id = ?1;",
                        params![
                            update.id.to_string(),
                            update.order,
                            group_id.map(|value| value.to_string()),
                        ],
                    )?,
                    None => tx.execute(
                        "UPDATE items
                         SET sort_order = ?2,
                             updated_at = (strftime('%s', 'now') * 1000)
                         WHERE id = ?1;",
                        params![update.id.to_string(), update.order],
                    )?,
                };
                if changed == 0 {
                    return Err(StoreError::NotFound(update.id));
                }
            }
            tx.commit()?;
            Ok(())
        })
    }

    fn list_sync(&self, container_id: ContainerId) -> StoreResult<Vec<Item>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(&format!(
                "{ITEM_SELECT_SQL}
                 WHERE container_id = ?1
                 ORDER BY sort_order ASC, created_at ASC, id ASC;"
            ))?;
            let mut rows = stmt.query([container_id.to_string()])?;
            let mut items = Vec::new();
            while let Some(row) = rows.next()? {
                items.push(parse_item_row(row)?);
            }
            Ok(items)
        })
    }
}

#[async_trait]
impl TaskStore for SqliteTaskStore {
    async fn create_item(&self, item: NewItem) -> StoreResult<Item> {
        let created = log_write("create_item", 1, self.create_sync(&item))?;
        self.publish(TaskEvent::Created(created.clone()));
        Ok(created)
    }

    async fn update_item(&self, id: ItemId, patch: ItemPatch) -> StoreResult<()> {
        log_write("update_item", 1, self.update_sync(id, &patch))?;
        self.publish(TaskEvent::Updated { id, patch });
        Ok(())
    }

    async fn update_item_order(&self, updates: Vec<OrderUpdate>) -> StoreResult<()> {
        log_write(
            "update_item_order",
            updates.len(),
            self.update_order_sync(&updates),
        )?;
        self.publish(TaskEvent::OrderUpdated(updates));
        Ok(())
    }

    async fn list_container(&self, container_id: ContainerId) -> StoreResult<Vec<Item>> {
        self.list_sync(container_id)
    }
}

fn log_write<T>(operation: &'static str, rows: usize, result: StoreResult<T>) -> StoreResult<T> {
    match &result {
        Ok(_) => info!(
            "event=store_write module=store status=ok backend=sqlite op={} rows={}",
            operation, rows
        ),
        Err(err) => error!(
            "event=store_write module=store status=error backend=sqlite op={} rows={} error={}",
            operation, rows, err
        ),
    }
    result
}

fn load_required_item(conn: &Connection, id: ItemId) -> StoreResult<Item> {
    let mut stmt = conn.prepare(&format!("{ITEM_SELECT_SQL} WHERE id = ?1;"))?;
    let mut rows = stmt.query([id.to_string()])?;
    if let Some(row) = rows.next()? {
        return parse_item_row(row);
    }
    Err(StoreError::NotFound(id))
}

fn parse_item_row(row: &Row<'_>) -> StoreResult<Item> {
    let id_text: String = row.get("id")?;
    let container_text: String = row.get("container_id")?;
    let group_id = row
        .get::<_, Option<String>>("group_id")?
        .map(|value| parse_uuid(&value, "items.group_id"))
        .transpose()?;

    let type_text: String = row.get("item_type")?;
    let item_type = ItemType::parse(&type_text).ok_or_else(|| {
        StoreError::InvalidData(format!("invalid item type `{type_text}` in items.item_type"))
    })?;

    let is_collapsed = match row.get::<_, i64>("is_collapsed")? {
        0 => false,
        1 => true,
        other => {
            return Err(StoreError::InvalidData(format!(
                "invalid is_collapsed value `{other}` in items.is_collapsed"
            )));
        }
    };

    Ok(Item {
        id: parse_uuid(&id_text, "items.id")?,
        container_id: parse_uuid(&container_text, "items.container_id")?,
        order: row.get("sort_order")?,
        item_type,
        group_id,
        is_collapsed,
        content: row.get("content")?,
        created_at: row.get("created_at")?,
    })
}

fn parse_uuid(value: &str, column: &'static str) -> StoreResult<Uuid> {
    Uuid::parse_str(value)
        .map_err(|_| StoreError::InvalidData(format!("invalid uuid `{value}` in {column}")))
}

fn bool_to_int(value: bool) -> i64 {
    i64::from(value)
}
