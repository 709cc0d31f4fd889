//! The registry of the five cache namespaces.

use std::fmt;

use serde::Serialize;
use tracing::debug;
use uuid::Uuid;

use crate::namespace::Namespace;

/// Identifies one of the registry's namespaces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CacheNamespace {
    Players,
    Servers,
    Documents,
    Subscriptions,
    General,
}

impl CacheNamespace {
    pub const ALL: [CacheNamespace; 5] = [
        CacheNamespace::Players,
        CacheNamespace::Servers,
        CacheNamespace::Documents,
        CacheNamespace::Subscriptions,
        CacheNamespace::General,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            CacheNamespace::Players => "players",
            CacheNamespace::Servers => "servers",
            CacheNamespace::Documents => "documents",
            CacheNamespace::Subscriptions => "subscriptions",
            CacheNamespace::General => "general",
        }
    }
}

impl fmt::Display for CacheNamespace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Per-namespace entry counts.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CacheStats {
    pub players: usize,
    pub servers: usize,
    pub documents: usize,
    pub subscriptions: usize,
    pub general: usize,
}

impl CacheStats {
    pub fn total(&self) -> usize {
        self.players + self.servers + self.documents + self.subscriptions + self.general
    }
}

/// Shared in-memory lookup tables for request-handling code.
///
/// Keys are unique within a namespace only; the same string may be cached
/// in `servers` and `general` without interference.
#[derive(Debug, Default)]
pub struct CacheRegistry {
    /// Player data keyed by player UUID.
    players: Namespace<Uuid>,
    /// Server metadata keyed by server name.
    servers: Namespace<String>,
    /// Document snapshots keyed by document path.
    documents: Namespace<String>,
    /// Live subscription state keyed by subscription handle.
    subscriptions: Namespace<String>,
    general: Namespace<String>,
}

impl CacheRegistry {
    /// Create a registry with all namespaces empty.
    pub fn new() -> Self {
        debug!("cache registry created");
        Self::default()
    }

    pub fn players(&self) -> &Namespace<Uuid> {
        &self.players
    }

    pub fn servers(&self) -> &Namespace<String> {
        &self.servers
    }

    pub fn documents(&self) -> &Namespace<String> {
        &self.documents
    }

    pub fn subscriptions(&self) -> &Namespace<String> {
        &self.subscriptions
    }

    pub fn general(&self) -> &Namespace<String> {
        &self.general
    }

    /// Number of entries in a namespace.
    pub fn len(&self, namespace: CacheNamespace) -> usize {
        match namespace {
            CacheNamespace::Players => self.players.len(),
            CacheNamespace::Servers => self.servers.len(),
            CacheNamespace::Documents => self.documents.len(),
            CacheNamespace::Subscriptions => self.subscriptions.len(),
            CacheNamespace::General => self.general.len(),
        }
    }

    /// Empty a single namespace, returning how many entries it held.
    pub fn clear(&self, namespace: CacheNamespace) -> usize {
        match namespace {
            CacheNamespace::Players => self.players.clear(),
            CacheNamespace::Servers => self.servers.clear(),
            CacheNamespace::Documents => self.documents.clear(),
            CacheNamespace::Subscriptions => self.subscriptions.clear(),
            CacheNamespace::General => self.general.clear(),
        }
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            players: self.players.len(),
            servers: self.servers.len(),
            documents: self.documents.len(),
            subscriptions: self.subscriptions.len(),
            general: self.general.len(),
        }
    }

    /// Empty every namespace. Returns the total number of entries dropped.
    pub fn clear_all(&self) -> usize {
        let dropped: usize = CacheNamespace::ALL
            .into_iter()
            .map(|ns| self.clear(ns))
            .sum();
        debug!(dropped, "cache registry cleared");
        dropped
    }
}
