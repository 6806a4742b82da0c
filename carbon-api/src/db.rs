//! Database Connection Pool Module
//!
//! PostgreSQL connection pooling via deadpool-postgres and the `Store`
//! implementation for the catalog tables. Lists are ordered by id; electric
//! tariffs are soft-deleted through `deleted_at`.

use async_trait::async_trait;
use carbon_core::{
    CarbonError, CarbonResult, Electric, ElectricRequest, EntityId, EntityType, Fuel,
    FuelRequest, StorageError, Tree, TreeCategory, TreeCategoryRequest, TreeRequest,
    ValidationError,
};
use carbon_storage::Store;
use deadpool_postgres::{Config, ManagerConfig, Pool, RecyclingMethod, Runtime};
use std::time::Duration;
use tokio_postgres::error::SqlState;
use tokio_postgres::{NoTls, Row};

use crate::error::{ApiError, ApiResult};

// ============================================================================
// CONNECTION POOL CONFIGURATION
// ============================================================================

/// Database connection pool configuration.
#[derive(Debug, Clone)]
pub struct DbConfig {
    /// PostgreSQL host
    pub host: String,
    /// PostgreSQL port
    pub port: u16,
    /// Database name
    pub dbname: String,
    /// Database user
    pub user: String,
    /// Database password
    pub password: String,
    /// Maximum pool size
    pub max_size: usize,
    /// Wait for a pooled connection before giving up
    pub timeout: Duration,
}

impl Default for DbConfig {
    fn default() -> Self {
        Self {
            host: "localhost".to_string(),
            port: 5432,
            dbname: "carbon".to_string(),
            user: "postgres".to_string(),
            password: "".to_string(),
            max_size: 16,
            timeout: Duration::from_secs(30),
        }
    }
}

impl DbConfig {
    /// Create a new database configuration from environment variables.
    pub fn from_env() -> Self {
        Self {
            host: std::env::var("CARBON_DB_HOST").unwrap_or_else(|_| "localhost".to_string()),
            port: std::env::var("CARBON_DB_PORT")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(5432),
            dbname: std::env::var("CARBON_DB_NAME").unwrap_or_else(|_| "carbon".to_string()),
            user: std::env::var("CARBON_DB_USER").unwrap_or_else(|_| "postgres".to_string()),
            password: std::env::var("CARBON_DB_PASSWORD").unwrap_or_default(),
            max_size: std::env::var("CARBON_DB_POOL_SIZE")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(16),
            timeout: Duration::from_secs(
                std::env::var("CARBON_DB_TIMEOUT")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(30),
            ),
        }
    }

    /// Create a connection pool from this configuration.
    pub fn create_pool(&self) -> ApiResult<Pool> {
        let mut cfg = Config::new();
        cfg.host = Some(self.host.clone());
        cfg.port = Some(self.port);
        cfg.dbname = Some(self.dbname.clone());
        cfg.user = Some(self.user.clone());
        cfg.password = Some(self.password.clone());

        cfg.manager = Some(ManagerConfig {
            recycling_method: RecyclingMethod::Fast,
        });

        let mut pool_cfg = deadpool_postgres::PoolConfig::new(self.max_size);
        pool_cfg.timeouts.wait = Some(self.timeout);
        cfg.pool = Some(pool_cfg);

        let pool = cfg
            .create_pool(Some(Runtime::Tokio1), NoTls)
            .map_err(|e| ApiError::database_error(format!("Failed to create pool: {}", e)))?;

        Ok(pool)
    }
}

// ============================================================================
// SCHEMA
// ============================================================================

const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS fuels (
    id              BIGSERIAL PRIMARY KEY,
    category        TEXT NOT NULL,
    name            TEXT NOT NULL,
    emission_factor DOUBLE PRECISION NOT NULL,
    price           DOUBLE PRECISION NOT NULL,
    unit            TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS electrics (
    id              BIGSERIAL PRIMARY KEY,
    province        TEXT NOT NULL,
    emission_factor DOUBLE PRECISION NOT NULL,
    price           DOUBLE PRECISION NOT NULL,
    deleted_at      TIMESTAMPTZ
);
CREATE INDEX IF NOT EXISTS idx_electrics_deleted_at ON electrics (deleted_at);

CREATE TABLE IF NOT EXISTS tree_categories (
    id   BIGSERIAL PRIMARY KEY,
    name TEXT NOT NULL UNIQUE
);

CREATE TABLE IF NOT EXISTS trees (
    id               BIGSERIAL PRIMARY KEY,
    tree_category_id BIGINT NOT NULL REFERENCES tree_categories (id) ON DELETE RESTRICT,
    name             TEXT NOT NULL UNIQUE,
    description      TEXT NOT NULL,
    price            DOUBLE PRECISION NOT NULL,
    stock            BIGINT NOT NULL
);
"#;

// ============================================================================
// DATABASE CLIENT WRAPPER
// ============================================================================

/// Database client that wraps a connection pool.
#[derive(Clone)]
pub struct DbClient {
    pool: Pool,
}

impl DbClient {
    /// Create a new database client with the given pool.
    pub fn new(pool: Pool) -> Self {
        Self { pool }
    }

    /// Create a new database client from configuration.
    pub fn from_config(config: &DbConfig) -> ApiResult<Self> {
        let pool = config.create_pool()?;
        Ok(Self::new(pool))
    }

    /// Create the catalog tables if they do not exist yet.
    pub async fn migrate(&self) -> CarbonResult<()> {
        let conn = self.get_conn().await?;
        conn.batch_execute(SCHEMA)
            .await
            .map_err(|e| query_error(e, EntityType::Fuel, None))?;
        tracing::info!("Database schema ready");
        Ok(())
    }

    /// Get a connection from the pool.
    async fn get_conn(&self) -> CarbonResult<deadpool_postgres::Object> {
        self.pool.get().await.map_err(|e| {
            tracing::error!("Connection pool error: {:?}", e);
            CarbonError::Storage(StorageError::Unavailable {
                reason: e.to_string(),
            })
        })
    }

    async fn query_rows<T>(
        &self,
        entity_type: EntityType,
        sql: &str,
        params: &[&(dyn tokio_postgres::types::ToSql + Sync)],
        map: fn(&Row) -> Result<T, tokio_postgres::Error>,
    ) -> CarbonResult<Vec<T>> {
        let conn = self.get_conn().await?;
        let rows = conn
            .query(sql, params)
            .await
            .map_err(|e| query_error(e, entity_type, None))?;
        rows.iter()
            .map(|row| map(row).map_err(|e| query_error(e, entity_type, None)))
            .collect()
    }

    async fn query_opt<T>(
        &self,
        entity_type: EntityType,
        sql: &str,
        params: &[&(dyn tokio_postgres::types::ToSql + Sync)],
        map: fn(&Row) -> Result<T, tokio_postgres::Error>,
    ) -> CarbonResult<Option<T>> {
        let conn = self.get_conn().await?;
        let row = conn
            .query_opt(sql, params)
            .await
            .map_err(|e| query_error(e, entity_type, None))?;
        row.as_ref()
            .map(map)
            .transpose()
            .map_err(|e| query_error(e, entity_type, None))
    }

    /// Run an INSERT or UPDATE ... RETURNING. No row means the target id
    /// does not exist.
    async fn write_returning<T>(
        &self,
        entity_type: EntityType,
        id: Option<EntityId>,
        name: Option<&str>,
        sql: &str,
        params: &[&(dyn tokio_postgres::types::ToSql + Sync)],
        map: fn(&Row) -> Result<T, tokio_postgres::Error>,
    ) -> CarbonResult<T> {
        let conn = self.get_conn().await?;
        let row = conn
            .query_opt(sql, params)
            .await
            .map_err(|e| query_error(e, entity_type, name))?;
        match row {
            Some(row) => map(&row).map_err(|e| query_error(e, entity_type, name)),
            None => Err(StorageError::NotFound {
                entity_type,
                id: id.unwrap_or_default(),
            }
            .into()),
        }
    }

    async fn execute_delete(
        &self,
        entity_type: EntityType,
        id: EntityId,
        sql: &str,
    ) -> CarbonResult<()> {
        let conn = self.get_conn().await?;
        let affected = conn
            .execute(sql, &[&id])
            .await
            .map_err(|e| query_error(e, entity_type, None))?;
        if affected == 0 {
            return Err(StorageError::NotFound { entity_type, id }.into());
        }
        Ok(())
    }
}

// ============================================================================
// ROW MAPPING
// ============================================================================

fn fuel_from_row(row: &Row) -> Result<Fuel, tokio_postgres::Error> {
    Ok(Fuel {
        id: row.try_get("id")?,
        category: row.try_get("category")?,
        name: row.try_get("name")?,
        emission_factor: row.try_get("emission_factor")?,
        price: row.try_get("price")?,
        unit: row.try_get("unit")?,
    })
}

fn electric_from_row(row: &Row) -> Result<Electric, tokio_postgres::Error> {
    Ok(Electric {
        id: row.try_get("id")?,
        province: row.try_get("province")?,
        emission_factor: row.try_get("emission_factor")?,
        price: row.try_get("price")?,
    })
}

fn tree_from_row(row: &Row) -> Result<Tree, tokio_postgres::Error> {
    Ok(Tree {
        id: row.try_get("id")?,
        tree_category_id: row.try_get("tree_category_id")?,
        name: row.try_get("name")?,
        description: row.try_get("description")?,
        price: row.try_get("price")?,
        stock: row.try_get("stock")?,
    })
}

fn tree_category_from_row(row: &Row) -> Result<TreeCategory, tokio_postgres::Error> {
    Ok(TreeCategory {
        id: row.try_get("id")?,
        name: row.try_get("name")?,
    })
}

/// Map a driver error onto the storage taxonomy.
///
/// `name` is the unique value being written, if any, and only shapes the
/// conflict message.
fn query_error(
    err: tokio_postgres::Error,
    entity_type: EntityType,
    name: Option<&str>,
) -> CarbonError {
    if let Some(code) = err.code() {
        if *code == SqlState::UNIQUE_VIOLATION {
            return StorageError::AlreadyExists {
                entity_type,
                field: "name".to_string(),
                value: name.unwrap_or_default().to_string(),
            }
            .into();
        }
        if *code == SqlState::FOREIGN_KEY_VIOLATION {
            let reason = match entity_type {
                EntityType::TreeCategory => "tree category is still used by trees",
                _ => "tree category does not exist",
            };
            let field = match entity_type {
                EntityType::TreeCategory => "id",
                _ => "tree_category_id",
            };
            return ValidationError::InvalidValue {
                field: field.to_string(),
                reason: reason.to_string(),
            }
            .into();
        }
    }

    tracing::error!("Database error: {:?}", err);
    if err.is_closed() {
        StorageError::Unavailable {
            reason: err.to_string(),
        }
        .into()
    } else {
        StorageError::QueryFailed {
            reason: err.to_string(),
        }
        .into()
    }
}

// ============================================================================
// STORE IMPLEMENTATION
// ============================================================================

#[async_trait]
impl Store for DbClient {
    // === Fuel Operations ===

    async fn fuel_list(&self) -> CarbonResult<Vec<Fuel>> {
        self.query_rows(
            EntityType::Fuel,
            "SELECT id, category, name, emission_factor, price, unit FROM fuels ORDER BY id",
            &[],
            fuel_from_row,
        )
        .await
    }

    async fn fuel_get(&self, id: EntityId) -> CarbonResult<Option<Fuel>> {
        self.query_opt(
            EntityType::Fuel,
            "SELECT id, category, name, emission_factor, price, unit FROM fuels WHERE id = $1",
            &[&id],
            fuel_from_row,
        )
        .await
    }

    async fn fuel_create(&self, req: &FuelRequest) -> CarbonResult<Fuel> {
        self.write_returning(
            EntityType::Fuel,
            None,
            Some(&req.name),
            "INSERT INTO fuels (category, name, emission_factor, price, unit) \
             VALUES ($1, $2, $3, $4, $5) \
             RETURNING id, category, name, emission_factor, price, unit",
            &[
                &req.category,
                &req.name,
                &req.emission_factor,
                &req.price,
                &req.unit,
            ],
            fuel_from_row,
        )
        .await
    }

    async fn fuel_update(&self, id: EntityId, req: &FuelRequest) -> CarbonResult<Fuel> {
        self.write_returning(
            EntityType::Fuel,
            Some(id),
            Some(&req.name),
            "UPDATE fuels SET category = $2, name = $3, emission_factor = $4, price = $5, \
             unit = $6 WHERE id = $1 \
             RETURNING id, category, name, emission_factor, price, unit",
            &[
                &id,
                &req.category,
                &req.name,
                &req.emission_factor,
                &req.price,
                &req.unit,
            ],
            fuel_from_row,
        )
        .await
    }

    async fn fuel_delete(&self, id: EntityId) -> CarbonResult<()> {
        self.execute_delete(EntityType::Fuel, id, "DELETE FROM fuels WHERE id = $1")
            .await
    }

    // === Electric Operations ===

    async fn electric_list(&self) -> CarbonResult<Vec<Electric>> {
        self.query_rows(
            EntityType::Electric,
            "SELECT id, province, emission_factor, price FROM electrics \
             WHERE deleted_at IS NULL ORDER BY id",
            &[],
            electric_from_row,
        )
        .await
    }

    async fn electric_get(&self, id: EntityId) -> CarbonResult<Option<Electric>> {
        self.query_opt(
            EntityType::Electric,
            "SELECT id, province, emission_factor, price FROM electrics \
             WHERE id = $1 AND deleted_at IS NULL",
            &[&id],
            electric_from_row,
        )
        .await
    }

    async fn electric_create(&self, req: &ElectricRequest) -> CarbonResult<Electric> {
        self.write_returning(
            EntityType::Electric,
            None,
            None,
            "INSERT INTO electrics (province, emission_factor, price) VALUES ($1, $2, $3) \
             RETURNING id, province, emission_factor, price",
            &[&req.province, &req.emission_factor, &req.price],
            electric_from_row,
        )
        .await
    }

    async fn electric_update(
        &self,
        id: EntityId,
        req: &ElectricRequest,
    ) -> CarbonResult<Electric> {
        self.write_returning(
            EntityType::Electric,
            Some(id),
            None,
            "UPDATE electrics SET province = $2, emission_factor = $3, price = $4 \
             WHERE id = $1 AND deleted_at IS NULL \
             RETURNING id, province, emission_factor, price",
            &[&id, &req.province, &req.emission_factor, &req.price],
            electric_from_row,
        )
        .await
    }

    async fn electric_delete(&self, id: EntityId) -> CarbonResult<()> {
        self.execute_delete(
            EntityType::Electric,
            id,
            "UPDATE electrics SET deleted_at = now() WHERE id = $1 AND deleted_at IS NULL",
        )
        .await
    }

    // === Tree Operations ===

    async fn tree_list(&self) -> CarbonResult<Vec<Tree>> {
        self.query_rows(
            EntityType::Tree,
            "SELECT id, tree_category_id, name, description, price, stock FROM trees ORDER BY id",
            &[],
            tree_from_row,
        )
        .await
    }

    async fn tree_get(&self, id: EntityId) -> CarbonResult<Option<Tree>> {
        self.query_opt(
            EntityType::Tree,
            "SELECT id, tree_category_id, name, description, price, stock FROM trees \
             WHERE id = $1",
            &[&id],
            tree_from_row,
        )
        .await
    }

    async fn tree_create(&self, req: &TreeRequest) -> CarbonResult<Tree> {
        self.write_returning(
            EntityType::Tree,
            None,
            Some(&req.name),
            "INSERT INTO trees (tree_category_id, name, description, price, stock) \
             VALUES ($1, $2, $3, $4, $5) \
             RETURNING id, tree_category_id, name, description, price, stock",
            &[
                &req.tree_category_id,
                &req.name,
                &req.description,
                &req.price,
                &req.stock,
            ],
            tree_from_row,
        )
        .await
    }

    async fn tree_update(&self, id: EntityId, req: &TreeRequest) -> CarbonResult<Tree> {
        self.write_returning(
            EntityType::Tree,
            Some(id),
            Some(&req.name),
            "UPDATE trees SET tree_category_id = $2, name = $3, description = $4, \
             price = $5, stock = $6 WHERE id = $1 \
             RETURNING id, tree_category_id, name, description, price, stock",
            &[
                &id,
                &req.tree_category_id,
                &req.name,
                &req.description,
                &req.price,
                &req.stock,
            ],
            tree_from_row,
        )
        .await
    }

    async fn tree_delete(&self, id: EntityId) -> CarbonResult<()> {
        self.execute_delete(EntityType::Tree, id, "DELETE FROM trees WHERE id = $1")
            .await
    }

    // === Tree Category Operations ===

    async fn tree_category_list(&self) -> CarbonResult<Vec<TreeCategory>> {
        self.query_rows(
            EntityType::TreeCategory,
            "SELECT id, name FROM tree_categories ORDER BY id",
            &[],
            tree_category_from_row,
        )
        .await
    }

    async fn tree_category_get(&self, id: EntityId) -> CarbonResult<Option<TreeCategory>> {
        self.query_opt(
            EntityType::TreeCategory,
            "SELECT id, name FROM tree_categories WHERE id = $1",
            &[&id],
            tree_category_from_row,
        )
        .await
    }

    async fn tree_category_create(
        &self,
        req: &TreeCategoryRequest,
    ) -> CarbonResult<TreeCategory> {
        self.write_returning(
            EntityType::TreeCategory,
            None,
            Some(&req.name),
            "INSERT INTO tree_categories (name) VALUES ($1) RETURNING id, name",
            &[&req.name],
            tree_category_from_row,
        )
        .await
    }

    async fn tree_category_update(
        &self,
        id: EntityId,
        req: &TreeCategoryRequest,
    ) -> CarbonResult<TreeCategory> {
        self.write_returning(
            EntityType::TreeCategory,
            Some(id),
            Some(&req.name),
            "UPDATE tree_categories SET name = $2 WHERE id = $1 RETURNING id, name",
            &[&id, &req.name],
            tree_category_from_row,
        )
        .await
    }

    async fn tree_category_delete(&self, id: EntityId) -> CarbonResult<()> {
        self.execute_delete(
            EntityType::TreeCategory,
            id,
            "DELETE FROM tree_categories WHERE id = $1",
        )
        .await
    }

    async fn ping(&self) -> CarbonResult<()> {
        let conn = self.get_conn().await?;
        conn.simple_query("SELECT 1")
            .await
            .map_err(|e| query_error(e, EntityType::Fuel, None))?;
        Ok(())
    }
}
