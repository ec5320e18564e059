//! Domain record CRUD operations.
//!
//! A domain is one `host` row plus its ordered `server` rows. Every write
//! touching both tables runs in a single transaction.

use super::connection::HostDb;
use crate::Error;
use crate::model::{Domain, HostInfo, Server};
use chrono::{DateTime, Utc};
use tokio_rusqlite::params;
use tokio_rusqlite::rusqlite::{self, Connection, OptionalExtension, Row, types::Type};

const HOST_COLUMNS: &str =
    "id, domain_name, servers_changed, ssl_grade, previous_ssl_grade, logo, title, is_down, created_at";

/// A domain record together with its row id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredDomain {
    pub id: i64,
    pub domain: Domain,
}

/// Fields written back after a revalidation.
///
/// `servers` is `None` when the topology did not change, leaving the stored
/// server rows untouched.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RefreshUpdate {
    pub servers: Option<Vec<Server>>,
    pub servers_changed: bool,
    pub ssl_grade: String,
    pub previous_ssl_grade: String,
    pub refreshed_at: DateTime<Utc>,
}

/// Host row as read, before servers are attached.
struct HostRow {
    id: i64,
    name: String,
    servers_changed: bool,
    ssl_grade: String,
    previous_ssl_grade: String,
    logo: String,
    title: String,
    is_down: bool,
    created_at: String,
}

impl HostRow {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            name: row.get(1)?,
            servers_changed: row.get::<_, i64>(2)? != 0,
            ssl_grade: row.get(3)?,
            previous_ssl_grade: row.get(4)?,
            logo: row.get(5)?,
            title: row.get(6)?,
            is_down: row.get::<_, i64>(7)? != 0,
            created_at: row.get(8)?,
        })
    }

    fn into_stored(self, servers: Vec<Server>) -> Result<StoredDomain, Error> {
        let created_at = parse_timestamp(&self.created_at)?;
        Ok(StoredDomain {
            id: self.id,
            domain: Domain {
                name: self.name,
                host_info: HostInfo {
                    servers,
                    servers_changed: self.servers_changed,
                    ssl_grade: self.ssl_grade,
                    previous_ssl_grade: self.previous_ssl_grade,
                    logo: self.logo,
                    title: self.title,
                    is_down: self.is_down,
                },
                created_at,
            },
        })
    }
}

fn parse_timestamp(raw: &str) -> Result<DateTime<Utc>, Error> {
    DateTime::parse_from_rfc3339(raw)
        .map(|ts| ts.with_timezone(&Utc))
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(8, Type::Text, Box::new(e)).into())
}

fn load_servers(conn: &Connection, host_id: i64) -> Result<Vec<Server>, Error> {
    let mut stmt = conn.prepare_cached(
        "SELECT address, ssl_grade, country, owner FROM server WHERE host_id = ?1 ORDER BY position ASC",
    )?;

    let servers = stmt
        .query_map(params![host_id], |row| {
            Ok(Server { address: row.get(0)?, ssl_grade: row.get(1)?, country: row.get(2)?, owner: row.get(3)? })
        })?
        .collect::<rusqlite::Result<Vec<_>>>()?;

    Ok(servers)
}

fn insert_servers(conn: &Connection, host_id: i64, servers: &[Server]) -> Result<(), Error> {
    let mut stmt = conn.prepare_cached(
        "INSERT INTO server (host_id, position, address, ssl_grade, country, owner)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
    )?;

    for (position, server) in servers.iter().enumerate() {
        stmt.execute(params![
            host_id,
            position as i64,
            &server.address,
            &server.ssl_grade,
            &server.country,
            &server.owner,
        ])?;
    }

    Ok(())
}

impl HostDb {
    /// Insert a brand-new domain with its servers.
    ///
    /// Returns the new host row id. Fails if the domain name already exists.
    pub async fn insert_domain(&self, domain: &Domain) -> Result<i64, Error> {
        let domain = domain.clone();
        self.conn
            .call(move |conn| -> Result<i64, Error> {
                let tx = conn.transaction()?;
                let host = &domain.host_info;

                tx.execute(
                    "INSERT INTO host (
                        domain_name, servers_changed, ssl_grade, previous_ssl_grade,
                        logo, title, is_down, created_at
                    ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
                    params![
                        &domain.name,
                        host.servers_changed as i64,
                        &host.ssl_grade,
                        &host.previous_ssl_grade,
                        &host.logo,
                        &host.title,
                        host.is_down as i64,
                        domain.created_at.to_rfc3339(),
                    ],
                )?;
                let host_id = tx.last_insert_rowid();

                insert_servers(&tx, host_id, &host.servers)?;
                tx.commit()?;

                Ok(host_id)
            })
            .await
            .map_err(Error::from)
    }

    /// Get a domain and its servers by name.
    ///
    /// Returns None if the domain has never been stored.
    pub async fn find_domain(&self, name: &str) -> Result<Option<StoredDomain>, Error> {
        let name = name.to_string();
        self.conn
            .call(move |conn| -> Result<Option<StoredDomain>, Error> {
                let row = conn
                    .query_row(
                        &format!("SELECT {HOST_COLUMNS} FROM host WHERE domain_name = ?1"),
                        params![name],
                        HostRow::from_row,
                    )
                    .optional()?;

                match row {
                    Some(row) => {
                        let servers = load_servers(conn, row.id)?;
                        row.into_stored(servers).map(Some)
                    }
                    None => Ok(None),
                }
            })
            .await
            .map_err(Error::from)
    }

    /// All stored domains in insertion order.
    pub async fn list_domains(&self) -> Result<Vec<Domain>, Error> {
        self.conn
            .call(|conn| -> Result<Vec<Domain>, Error> {
                let rows = {
                    let mut stmt = conn.prepare(&format!("SELECT {HOST_COLUMNS} FROM host ORDER BY id ASC"))?;
                    stmt.query_map([], HostRow::from_row)?
                        .collect::<rusqlite::Result<Vec<_>>>()?
                };

                rows.into_iter()
                    .map(|row| {
                        let servers = load_servers(conn, row.id)?;
                        row.into_stored(servers).map(|stored| stored.domain)
                    })
                    .collect()
            })
            .await
            .map_err(Error::from)
    }

    /// Write the outcome of a revalidation for `host_id`.
    ///
    /// Server rows are replaced only when `update.servers` is set; the grade
    /// fields, change flag and refresh timestamp are always written.
    pub async fn apply_refresh(&self, host_id: i64, update: &RefreshUpdate) -> Result<(), Error> {
        let update = update.clone();
        self.conn
            .call(move |conn| -> Result<(), Error> {
                let tx = conn.transaction()?;

                if let Some(servers) = &update.servers {
                    tx.execute("DELETE FROM server WHERE host_id = ?1", params![host_id])?;
                    insert_servers(&tx, host_id, servers)?;
                }

                let updated = tx.execute(
                    "UPDATE host SET
                        servers_changed = ?1,
                        ssl_grade = ?2,
                        previous_ssl_grade = ?3,
                        created_at = ?4
                    WHERE id = ?5",
                    params![
                        update.servers_changed as i64,
                        &update.ssl_grade,
                        &update.previous_ssl_grade,
                        update.refreshed_at.to_rfc3339(),
                        host_id,
                    ],
                )?;

                if updated == 0 {
                    return Err(rusqlite::Error::QueryReturnedNoRows.into());
                }

                tx.commit()?;
                Ok(())
            })
            .await
            .map_err(Error::from)
    }
}
