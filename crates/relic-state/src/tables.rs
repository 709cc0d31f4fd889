//! redb table definitions for the persisted collections.
//!
//! Each table uses `&str` document ids as keys and `&[u8]` values
//! (the JSON-serialized field map).

use redb::TableDefinition;

use crate::types::Collection;

/// Game server records keyed by document id.
pub const SERVERS: TableDefinition<&str, &[u8]> = TableDefinition::new("servers");

/// Network address leases keyed by document id.
pub const SERVER_IPS: TableDefinition<&str, &[u8]> = TableDefinition::new("server_ips");

/// Table backing a collection.
pub fn table_for(collection: Collection) -> TableDefinition<'static, &'static str, &'static [u8]> {
    match collection {
        Collection::Servers => SERVERS,
        Collection::ServerIps => SERVER_IPS,
    }
}
