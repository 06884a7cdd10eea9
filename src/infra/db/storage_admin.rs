//! Postgres storage administrator.
//!
//! Tables are created and dropped through sea-orm-migration's
//! [`SchemaManager`]. Tags are kept as a JSON object in the table comment,
//! so `find_by_tag` only needs the system catalogue.

use std::collections::BTreeMap;

use async_trait::async_trait;
use sea_orm::{ConnectionTrait, DatabaseConnection, DbBackend, Statement};
use sea_orm_migration::prelude::{Alias, ColumnDef, Table};
use sea_orm_migration::SchemaManager;

use crate::errors::{AppError, AppResult};
use crate::migrate::{
    Attribute, AttributeKind, ResourceSchema, ResourceState, StorageAdmin, Tag,
};

type TagSet = BTreeMap<String, String>;

/// [`StorageAdmin`] over the current Postgres schema
pub struct SqlStorageAdmin {
    db: DatabaseConnection,
}

impl SqlStorageAdmin {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    fn manager(&self) -> SchemaManager<'_> {
        SchemaManager::new(&self.db)
    }

    async fn read_tags(&self, name: &str) -> AppResult<TagSet> {
        let row = self
            .db
            .query_one(Statement::from_sql_and_values(
                DbBackend::Postgres,
                "SELECT obj_description(to_regclass($1::text), 'pg_class') AS comment",
                [name.into()],
            ))
            .await?;

        let comment = match row {
            Some(row) => row.try_get::<Option<String>>("", "comment")?,
            None => None,
        };
        Ok(comment.as_deref().and_then(parse_tags).unwrap_or_default())
    }
}

fn column(attribute: &Attribute) -> ColumnDef {
    let mut def = ColumnDef::new(Alias::new(attribute.name.as_str()));
    match attribute.kind {
        AttributeKind::String => def.string(),
        AttributeKind::Number => def.decimal(),
        AttributeKind::Binary => def.binary(),
        AttributeKind::Timestamp => def.timestamp_with_time_zone(),
    };
    if attribute.nullable {
        def.null();
    } else {
        def.not_null();
    }
    def
}

fn parse_tags(comment: &str) -> Option<TagSet> {
    match serde_json::from_str(comment) {
        Ok(tags) => Some(tags),
        Err(e) => {
            tracing::debug!(error = %e, "table comment is not a tag set");
            None
        }
    }
}

fn quote_identifier(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

fn quote_literal(text: &str) -> String {
    format!("'{}'", text.replace('\'', "''"))
}

#[async_trait]
impl StorageAdmin for SqlStorageAdmin {
    async fn create_resource(&self, schema: &ResourceSchema) -> AppResult<()> {
        let mut table = Table::create();
        table.table(Alias::new(schema.name.as_str()));

        let mut key = column(&schema.key);
        key.primary_key();
        table.col(&mut key);
        for attribute in &schema.attributes {
            table.col(&mut column(attribute));
        }

        self.manager().create_table(table).await?;
        tracing::info!(table = %schema.name, "table created");
        Ok(())
    }

    async fn delete_resource(&self, name: &str) -> AppResult<()> {
        self.manager()
            .drop_table(Table::drop().table(Alias::new(name)).to_owned())
            .await?;
        tracing::info!(table = name, "table dropped");
        Ok(())
    }

    async fn describe_resource(&self, name: &str) -> AppResult<ResourceState> {
        if self.manager().has_table(name).await? {
            Ok(ResourceState::Active)
        } else {
            Ok(ResourceState::Absent)
        }
    }

    async fn tag_resource(&self, name: &str, tags: &[Tag]) -> AppResult<()> {
        if !self.manager().has_table(name).await? {
            return Err(AppError::storage(format!("table {} does not exist", name)));
        }

        let mut merged = self.read_tags(name).await?;
        for tag in tags {
            merged.insert(tag.key.clone(), tag.value.clone());
        }

        let comment = serde_json::to_string(&merged)
            .map_err(|e| AppError::internal(format!("tag encoding failed: {}", e)))?;
        self.db
            .execute(Statement::from_string(
                DbBackend::Postgres,
                format!(
                    "COMMENT ON TABLE {} IS {}",
                    quote_identifier(name),
                    quote_literal(&comment)
                ),
            ))
            .await?;
        Ok(())
    }

    async fn find_by_tag(&self, key: &str, value: &str) -> AppResult<Vec<String>> {
        let rows = self
            .db
            .query_all(Statement::from_string(
                DbBackend::Postgres,
                "SELECT c.relname AS name, obj_description(c.oid, 'pg_class') AS comment \
                 FROM pg_class c JOIN pg_namespace n ON n.oid = c.relnamespace \
                 WHERE c.relkind = 'r' AND n.nspname = current_schema() \
                 AND obj_description(c.oid, 'pg_class') IS NOT NULL \
                 ORDER BY c.relname"
                    .to_string(),
            ))
            .await?;

        let mut names = Vec::new();
        for row in rows {
            let name: String = row.try_get("", "name")?;
            let comment: String = row.try_get("", "comment")?;
            let matches = parse_tags(&comment)
                .and_then(|tags| tags.get(key).map(|v| v == value))
                .unwrap_or(false);
            if matches {
                names.push(name);
            }
        }
        Ok(names)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_tags() {
        let tags = parse_tags(r#"{"Migration":"20250405000000_users_table"}"#).unwrap();
        assert_eq!(tags["Migration"], "20250405000000_users_table");
        assert!(parse_tags("users of the service").is_none());
    }

    #[test]
    fn test_quoting() {
        assert_eq!(quote_identifier(r#"we"ird"#), r#""we""ird""#);
        assert_eq!(quote_literal(r#"{"a":"it's"}"#), r#"'{"a":"it''s"}'"#);
    }
}
