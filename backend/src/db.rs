use diesel::pg::PgConnection;
use diesel::prelude::*;
use diesel::r2d2::{ConnectionManager, Pool, PoolError};

pub type DbPool = Pool<ConnectionManager<PgConnection>>;

pub fn establish_pool(database_url: &str, max_size: u32) -> Result<DbPool, PoolError> {
    log::info!("Opening database pool (max {} connections)", max_size);
    let manager = ConnectionManager::<PgConnection>::new(database_url);
    match Pool::builder().max_size(max_size).build(manager) {
        Ok(pool) => {
            log::info!("Database pool established successfully");
            Ok(pool)
        }
        Err(e) => {
            log::error!("Failed to establish database pool: {}", e);
            Err(e)
        }
    }
}

/// Runs `SELECT 1` on a pooled connection.
pub fn probe(pool: &DbPool) -> Result<i32, Box<dyn std::error::Error>> {
    let mut conn = pool.get()?;
    let result: i32 = diesel::select(diesel::dsl::sql::<diesel::sql_types::Integer>("1"))
        .get_result(&mut conn)?;
    Ok(result)
}
