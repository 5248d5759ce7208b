use std::ops::Deref;
use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, TryLockError};
use std::thread;
use std::time::{Duration, Instant};

use rusqlite::{Connection, ErrorCode, Row, ToSql};
use tracing::{debug, warn};

use crate::core::{
    BaseVehicle, BrandScope, CascadeFilter, CatalogError, ConfigAttribute, ConfigAttributeType,
    FitmentStore, Part, PartCatalog, StoreConfig, StoreError, Submodel, VehicleAttributeRow,
};

const SCHEMA: &str = include_str!("schema.sql");

const CASCADE_FROM: &str = "FROM vehicle_part vp
    JOIN part p ON p.id = vp.part_id
    JOIN vehicle v ON v.id = vp.vehicle_id
    JOIN base_vehicle bv ON bv.id = v.base_vehicle_id
    JOIN make ma ON ma.id = bv.make_id
    JOIN model mo ON mo.id = bv.model_id
    LEFT JOIN submodel sm ON sm.id = v.submodel_id";

const VEHICLE_ROWS: &str = "SELECT v.id, bv.id, bv.external_id, bv.year_id,
        ma.id, ma.name, mo.id, mo.name,
        sm.id, sm.external_id, sm.name,
        cat.name, ca.value
    FROM vehicle v
    JOIN base_vehicle bv ON bv.id = v.base_vehicle_id
    JOIN make ma ON ma.id = bv.make_id
    JOIN model mo ON mo.id = bv.model_id
    LEFT JOIN submodel sm ON sm.id = v.submodel_id
    LEFT JOIN vehicle_config_attribute vca ON vca.vehicle_id = v.id
    LEFT JOIN config_attribute ca ON ca.id = vca.attribute_id
    LEFT JOIN config_attribute_type cat ON cat.id = ca.type_id";

/// Virtual machine steps between deadline checks.
const PROGRESS_STEPS: i32 = 1_000;

const LOCK_RETRY: Duration = Duration::from_millis(2);

type SqlParams = Vec<Box<dyn ToSql>>;

/// [`FitmentStore`] and [`PartCatalog`] over a SQLite database.
///
/// The connection is shared behind a mutex. The configured timeout bounds
/// each call: waiting for the connection and running the statement share it,
/// and a locked database file is waited on for at most the same span. A call
/// that runs out fails with [`StoreError::Timeout`].
pub struct SqliteFitmentStore {
    conn: Mutex<Connection>,
    published_statuses: Vec<i32>,
    timeout: Duration,
    deadline: Arc<Deadline>,
}

/// When the statement in flight must stop. Zero when nothing is running.
struct Deadline {
    epoch: Instant,
    at_ms: AtomicU64,
}

impl Deadline {
    fn new() -> Self {
        Self {
            epoch: Instant::now(),
            at_ms: AtomicU64::new(0),
        }
    }

    fn now_ms(&self) -> u64 {
        u64::try_from(self.epoch.elapsed().as_millis()).unwrap_or(u64::MAX)
    }

    fn arm(&self, remaining: Duration) {
        let remaining = u64::try_from(remaining.as_millis()).unwrap_or(u64::MAX);
        let at = self.now_ms().saturating_add(remaining).max(1);
        self.at_ms.store(at, Ordering::Relaxed);
    }

    fn disarm(&self) {
        self.at_ms.store(0, Ordering::Relaxed);
    }

    fn expired(&self) -> bool {
        let at = self.at_ms.load(Ordering::Relaxed);
        at != 0 && self.now_ms() >= at
    }
}

/// Connection access with the deadline armed; disarms on drop.
struct ConnGuard<'a> {
    conn: MutexGuard<'a, Connection>,
    deadline: &'a Deadline,
}

impl Deref for ConnGuard<'_> {
    type Target = Connection;

    fn deref(&self) -> &Connection {
        &self.conn
    }
}

impl Drop for ConnGuard<'_> {
    fn drop(&mut self) {
        self.deadline.disarm();
    }
}

impl SqliteFitmentStore {
    /// Open a database file with default settings.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let conn = Connection::open(path).map_err(|e| StoreError::Unavailable(e.to_string()))?;
        Self::with_connection(conn, &StoreConfig::default())
    }

    /// Open a private in-memory database with the schema created.
    pub fn open_in_memory() -> Result<Self, StoreError> {
        let conn =
            Connection::open_in_memory().map_err(|e| StoreError::Unavailable(e.to_string()))?;
        let store = Self::with_connection(conn, &StoreConfig::default())?;
        store.init_schema()?;
        Ok(store)
    }

    /// Open the database named by the configuration (`:memory:` for in-memory).
    pub fn from_config(config: &StoreConfig) -> Result<Self, StoreError> {
        let conn = if config.path == ":memory:" {
            Connection::open_in_memory()
        } else {
            Connection::open(&config.path)
        }
        .map_err(|e| StoreError::Unavailable(e.to_string()))?;
        Self::with_connection(conn, config)
    }

    fn with_connection(conn: Connection, config: &StoreConfig) -> Result<Self, StoreError> {
        let timeout = config.busy_timeout();
        conn.busy_timeout(timeout)
            .map_err(|e| StoreError::Unavailable(e.to_string()))?;
        let deadline = Arc::new(Deadline::new());
        let watch = Arc::clone(&deadline);
        conn.progress_handler(PROGRESS_STEPS, Some(move || watch.expired()));
        Ok(Self {
            conn: Mutex::new(conn),
            published_statuses: config.published_statuses.clone(),
            timeout,
            deadline,
        })
    }

    /// Replace the part statuses that count as published.
    pub fn with_published_statuses(mut self, statuses: Vec<i32>) -> Self {
        self.published_statuses = statuses;
        self
    }

    /// Create tables and indexes if they do not exist.
    pub fn init_schema(&self) -> Result<(), StoreError> {
        self.execute_batch(SCHEMA)
    }

    /// Run a batch of SQL statements (schema setup, fixtures).
    pub fn execute_batch(&self, sql: &str) -> Result<(), StoreError> {
        self.lock()?.execute_batch(sql).map_err(store_err)
    }

    /// Wait for the connection, then arm the deadline with whatever time the
    /// wait left over.
    fn lock(&self) -> Result<ConnGuard<'_>, StoreError> {
        let started = Instant::now();
        let conn = loop {
            match self.conn.try_lock() {
                Ok(conn) => break conn,
                Err(TryLockError::Poisoned(_)) => {
                    return Err(StoreError::Unavailable("connection lock poisoned".into()));
                }
                Err(TryLockError::WouldBlock) if started.elapsed() >= self.timeout => {
                    warn!(
                        waited_ms = started.elapsed().as_millis() as u64,
                        "timed out waiting for the store connection"
                    );
                    return Err(StoreError::Timeout);
                }
                Err(TryLockError::WouldBlock) => thread::sleep(LOCK_RETRY),
            }
        };
        self.deadline.arm(self.timeout.saturating_sub(started.elapsed()));
        Ok(ConnGuard {
            conn,
            deadline: &self.deadline,
        })
    }

    fn query_list<T>(
        &self,
        sql: &str,
        params: &[Box<dyn ToSql>],
        map: impl FnMut(&Row<'_>) -> rusqlite::Result<T>,
    ) -> Result<Vec<T>, StoreError> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(sql).map_err(store_err)?;
        let refs: Vec<&dyn ToSql> = params.iter().map(|p| p.as_ref()).collect();
        let rows = stmt.query_map(refs.as_slice(), map).map_err(store_err)?;
        rows.collect::<Result<Vec<_>, _>>().map_err(store_err)
    }

    /// `SELECT {select}` over the fitment join, filtered by publication, brand
    /// and the supplied cascade dimensions, followed by `tail`.
    fn cascade_select(
        &self,
        select: &str,
        filter: &CascadeFilter,
        scope: &BrandScope,
        extra: &str,
        tail: &str,
    ) -> (String, SqlParams) {
        let mut params: SqlParams = Vec::new();
        let mut sql = format!("SELECT {select} {CASCADE_FROM} WHERE p.status IN (");
        push_in_list(&mut sql, &mut params, self.published_statuses.iter().copied());
        sql.push_str(") AND p.brand_id IN (");
        push_in_list(&mut sql, &mut params, scope.iter());
        sql.push(')');

        if let Some(year) = filter.year {
            sql.push_str(" AND bv.year_id = ?");
            params.push(Box::new(year));
        }
        if let Some(ref make) = filter.make {
            sql.push_str(" AND ma.name = ? COLLATE NOCASE");
            params.push(Box::new(make.clone()));
        }
        if let Some(ref model) = filter.model {
            sql.push_str(" AND mo.name = ? COLLATE NOCASE");
            params.push(Box::new(model.clone()));
        }
        if let Some(ref style) = filter.style {
            sql.push_str(" AND sm.name = ? COLLATE NOCASE");
            params.push(Box::new(style.clone()));
        }
        sql.push_str(extra);
        sql.push(' ');
        sql.push_str(tail);
        (sql, params)
    }

    fn cascade_names(
        &self,
        column: &str,
        filter: &CascadeFilter,
        scope: &BrandScope,
        extra: &str,
    ) -> Result<Vec<String>, StoreError> {
        if scope.is_empty() {
            return Ok(Vec::new());
        }
        // Names equal ignoring case are one option, spelled by the smallest variant.
        let select = format!("MIN({column})");
        let tail = format!("GROUP BY {column} COLLATE NOCASE ORDER BY {select} COLLATE NOCASE");
        let (sql, params) = self.cascade_select(&select, filter, scope, extra, &tail);
        self.query_list(&sql, &params, |row| row.get(0))
    }
}

fn push_in_list<T: ToSql + 'static>(
    sql: &mut String,
    params: &mut SqlParams,
    values: impl IntoIterator<Item = T>,
) {
    for (i, value) in values.into_iter().enumerate() {
        if i > 0 {
            sql.push_str(", ");
        }
        sql.push('?');
        params.push(Box::new(value));
    }
}

fn store_err(e: rusqlite::Error) -> StoreError {
    match &e {
        rusqlite::Error::SqliteFailure(err, _)
            if matches!(
                err.code,
                ErrorCode::DatabaseBusy
                    | ErrorCode::DatabaseLocked
                    | ErrorCode::OperationInterrupted
            ) =>
        {
            StoreError::Timeout
        }
        _ => StoreError::Query(e.to_string()),
    }
}

fn vehicle_row(row: &Row<'_>) -> rusqlite::Result<VehicleAttributeRow> {
    let submodel = match row.get::<_, Option<i64>>(8)? {
        Some(id) => Some(Submodel {
            id,
            external_id: row.get(9)?,
            name: row.get(10)?,
        }),
        None => None,
    };
    let attribute = match (row.get::<_, Option<String>>(11)?, row.get::<_, Option<String>>(12)?) {
        (Some(type_name), Some(value)) => Some((type_name, value)),
        _ => None,
    };
    Ok(VehicleAttributeRow {
        vehicle_id: row.get(0)?,
        base_vehicle: BaseVehicle {
            id: row.get(1)?,
            external_id: row.get(2)?,
            year_id: row.get(3)?,
            make_id: row.get(4)?,
            make_name: row.get(5)?,
            model_id: row.get(6)?,
            model_name: row.get(7)?,
        },
        submodel,
        attribute,
    })
}

impl FitmentStore for SqliteFitmentStore {
    fn years(&self, scope: &BrandScope) -> Result<Vec<i32>, StoreError> {
        if scope.is_empty() {
            return Ok(Vec::new());
        }
        let (sql, params) = self.cascade_select(
            "DISTINCT bv.year_id",
            &CascadeFilter::default(),
            scope,
            "",
            "ORDER BY bv.year_id DESC",
        );
        self.query_list(&sql, &params, |row| row.get(0))
    }

    fn makes(&self, filter: &CascadeFilter, scope: &BrandScope) -> Result<Vec<String>, StoreError> {
        let filter = CascadeFilter {
            year: filter.year,
            ..Default::default()
        };
        self.cascade_names("ma.name", &filter, scope, "")
    }

    fn models(
        &self,
        filter: &CascadeFilter,
        scope: &BrandScope,
    ) -> Result<Vec<String>, StoreError> {
        let filter = CascadeFilter {
            year: filter.year,
            make: filter.make.clone(),
            ..Default::default()
        };
        self.cascade_names("mo.name", &filter, scope, "")
    }

    fn styles(
        &self,
        filter: &CascadeFilter,
        scope: &BrandScope,
    ) -> Result<Vec<String>, StoreError> {
        let filter = CascadeFilter {
            style: None,
            ..filter.clone()
        };
        self.cascade_names("sm.name", &filter, scope, " AND sm.name IS NOT NULL")
    }

    fn cascade_part_ids(
        &self,
        filter: &CascadeFilter,
        scope: &BrandScope,
    ) -> Result<Vec<i64>, StoreError> {
        if scope.is_empty() {
            return Ok(Vec::new());
        }
        let (sql, params) =
            self.cascade_select("DISTINCT p.id", filter, scope, "", "ORDER BY p.id");
        let ids = self.query_list(&sql, &params, |row| row.get(0))?;
        debug!(parts = ids.len(), "cascade part ids");
        Ok(ids)
    }

    fn config_attribute_types(&self) -> Result<Vec<ConfigAttributeType>, StoreError> {
        self.query_list(
            "SELECT id, name, external_type_code FROM config_attribute_type ORDER BY id",
            &[],
            |row| {
                Ok(ConfigAttributeType {
                    id: row.get(0)?,
                    name: row.get(1)?,
                    external_type_code: row.get(2)?,
                })
            },
        )
    }

    fn config_attributes(&self) -> Result<Vec<ConfigAttribute>, StoreError> {
        self.query_list(
            "SELECT id, type_id, value, external_value_code FROM config_attribute ORDER BY id",
            &[],
            |row| {
                Ok(ConfigAttribute {
                    id: row.get(0)?,
                    type_id: row.get(1)?,
                    value: row.get(2)?,
                    external_value_code: row.get(3)?,
                })
            },
        )
    }

    fn vehicle_rows(
        &self,
        base_vehicle_external_id: i64,
        submodel_external_id: Option<i64>,
    ) -> Result<Vec<VehicleAttributeRow>, StoreError> {
        let sql = format!(
            "{VEHICLE_ROWS} WHERE bv.external_id = ? \
             AND (v.submodel_id IS NULL OR sm.external_id = ?) \
             ORDER BY v.id, cat.name"
        );
        let params: SqlParams = vec![
            Box::new(base_vehicle_external_id),
            Box::new(submodel_external_id),
        ];
        self.query_list(&sql, &params, vehicle_row)
    }

    fn vehicle_rows_by_id(&self, vehicle_id: i64) -> Result<Vec<VehicleAttributeRow>, StoreError> {
        let sql = format!("{VEHICLE_ROWS} WHERE v.id = ? ORDER BY cat.name");
        let params: SqlParams = vec![Box::new(vehicle_id)];
        self.query_list(&sql, &params, vehicle_row)
    }

    fn vehicle_part_ids(
        &self,
        vehicle_ids: &[i64],
        scope: &BrandScope,
    ) -> Result<Vec<i64>, StoreError> {
        if vehicle_ids.is_empty() || scope.is_empty() {
            return Ok(Vec::new());
        }
        let mut params: SqlParams = Vec::new();
        let mut sql = String::from(
            "SELECT DISTINCT p.id FROM vehicle_part vp JOIN part p ON p.id = vp.part_id \
             WHERE vp.vehicle_id IN (",
        );
        push_in_list(&mut sql, &mut params, vehicle_ids.iter().copied());
        sql.push_str(") AND p.status IN (");
        push_in_list(&mut sql, &mut params, self.published_statuses.iter().copied());
        sql.push_str(") AND p.brand_id IN (");
        push_in_list(&mut sql, &mut params, scope.iter());
        sql.push_str(") ORDER BY p.id");
        self.query_list(&sql, &params, |row| row.get(0))
    }
}

impl PartCatalog for SqliteFitmentStore {
    fn fetch_parts(&self, ids: &[i64], scope: &BrandScope) -> Result<Vec<Part>, CatalogError> {
        if ids.is_empty() || scope.is_empty() {
            return Ok(Vec::new());
        }
        let mut params: SqlParams = Vec::new();
        let mut sql =
            String::from("SELECT id, brand_id, status, short_description FROM part WHERE id IN (");
        push_in_list(&mut sql, &mut params, ids.iter().copied());
        sql.push_str(") AND brand_id IN (");
        push_in_list(&mut sql, &mut params, scope.iter());
        sql.push_str(") ORDER BY id");
        self.query_list(&sql, &params, |row| {
            Ok(Part {
                id: row.get(0)?,
                brand_id: row.get(1)?,
                status: row.get(2)?,
                short_description: row.get(3)?,
            })
        })
        .map_err(|e| match e {
            StoreError::Timeout => CatalogError::Unavailable(e.to_string()),
            _ => CatalogError::Query(e.to_string()),
        })
    }
}
