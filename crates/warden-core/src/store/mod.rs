// ============================================================================
// GateStore - Embedded Record Store (redb)
// ============================================================================
// Durable keyed storage for members, staff, guests, bulletins, the access
// log, and ephemeral pending requests.
// Default path: ~/.gatewarden/warden.redb (override via WARDEN_DB_PATH)
// ============================================================================

pub mod types;

pub use types::{
    AccessLogEntry, Attachment, AttachmentKind, BulletinRecord, GuestRecord, MemberRecord,
    PendingRequest, StaffRecord, StoreStats,
};

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};

use redb::{Database, TableDefinition};
use tracing::{debug, info};
use uuid::Uuid;

use crate::error::{GateError, Result};
use crate::types::{ChannelId, Outcome, RequestVariant, TokenId};

// Table definitions
const MEMBERS: TableDefinition<i64, &[u8]> = TableDefinition::new("members");
const STAFF: TableDefinition<&str, &[u8]> = TableDefinition::new("staff");
const GUESTS: TableDefinition<u64, &[u8]> = TableDefinition::new("guests");
const PENDING: TableDefinition<u64, &[u8]> = TableDefinition::new("pending_requests");
const ACCESS_LOG: TableDefinition<u64, &[u8]> = TableDefinition::new("access_log");
const BULLETINS: TableDefinition<u64, &[u8]> = TableDefinition::new("bulletins");

/// Embedded record store for the gate access workflow.
///
/// Members are keyed by their messaging-channel id, guests and pending
/// requests by token id, staff by internal uuid, and the access log and
/// bulletins by a monotonic sequence number.
pub struct GateStore {
    db: Database,
    path: PathBuf,
    next_log_seq: AtomicU64,
    next_bulletin_seq: AtomicU64,
}

impl GateStore {
    /// Open (or create) the store at the given path.
    /// If `path` is None, uses WARDEN_DB_PATH env var or ~/.gatewarden/warden.redb
    pub fn open(path: Option<&Path>) -> Result<Self> {
        let db_path = if let Some(p) = path {
            p.to_path_buf()
        } else if let Ok(env_path) = std::env::var("WARDEN_DB_PATH") {
            PathBuf::from(env_path)
        } else {
            let home = dirs::home_dir()
                .ok_or_else(|| GateError::Config("cannot determine home directory".into()))?;
            let warden_dir = home.join(".gatewarden");
            std::fs::create_dir_all(&warden_dir).map_err(|e| {
                GateError::Config(format!("cannot create {}: {e}", warden_dir.display()))
            })?;
            warden_dir.join("warden.redb")
        };

        info!("Opening gate store at: {}", db_path.display());

        let db = Database::create(&db_path)?;

        // Ensure tables exist by doing a write transaction
        let write_txn = db.begin_write()?;
        {
            let _ = write_txn.open_table(MEMBERS)?;
            let _ = write_txn.open_table(STAFF)?;
            let _ = write_txn.open_table(GUESTS)?;
            let _ = write_txn.open_table(PENDING)?;
            let _ = write_txn.open_table(ACCESS_LOG)?;
            let _ = write_txn.open_table(BULLETINS)?;
        }
        write_txn.commit()?;

        // Seed sequence counters from the existing table tails
        let read_txn = db.begin_read()?;
        let next_log_seq = {
            let table = read_txn.open_table(ACCESS_LOG)?;
            table
                .range::<u64>(..)?
                .next_back()
                .transpose()?
                .map(|(key, _)| key.value() + 1)
                .unwrap_or(0)
        };
        let next_bulletin_seq = {
            let table = read_txn.open_table(BULLETINS)?;
            table
                .range::<u64>(..)?
                .next_back()
                .transpose()?
                .map(|(key, _)| key.value() + 1)
                .unwrap_or(0)
        };

        info!("Gate store ready");

        Ok(Self {
            db,
            path: db_path,
            next_log_seq: AtomicU64::new(next_log_seq),
            next_bulletin_seq: AtomicU64::new(next_bulletin_seq),
        })
    }

    /// Get the database file path
    pub fn path(&self) -> &Path {
        &self.path
    }

    // ========================================================================
    // Member Operations
    // ========================================================================

    /// Insert a new member. Fails with `AlreadyExists` when the channel id is
    /// already registered.
    pub fn create_member(&self, member: &MemberRecord) -> Result<()> {
        if self.get_member(member.channel_id)?.is_some() {
            return Err(GateError::AlreadyExists(format!(
                "member for channel {}",
                member.channel_id
            )));
        }

        let value = bincode::serialize(member)?;
        let write_txn = self.db.begin_write()?;
        {
            let mut table = write_txn.open_table(MEMBERS)?;
            table.insert(member.channel_id, value.as_slice())?;
        }
        write_txn.commit()?;

        debug!("Stored member for channel {}", member.channel_id);
        Ok(())
    }

    pub fn get_member(&self, channel_id: ChannelId) -> Result<Option<MemberRecord>> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(MEMBERS)?;

        match table.get(channel_id)? {
            Some(value) => Ok(Some(bincode::deserialize(value.value())?)),
            None => Ok(None),
        }
    }

    /// Exact-match lookup by full name (admin credential issuance path).
    pub fn find_member_by_name(&self, full_name: &str) -> Result<Option<MemberRecord>> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(MEMBERS)?;

        let iter = table.range::<i64>(..)?;
        for entry in iter {
            let (_key, value) = entry?;
            let member: MemberRecord = bincode::deserialize(value.value())?;
            if member.full_name == full_name {
                return Ok(Some(member));
            }
        }
        Ok(None)
    }

    /// Overwrite an existing member record. Fails with `NotFound` when the
    /// channel id has no record.
    pub fn update_member(&self, member: &MemberRecord) -> Result<()> {
        if self.get_member(member.channel_id)?.is_none() {
            return Err(GateError::NotFound(format!(
                "member for channel {}",
                member.channel_id
            )));
        }

        let value = bincode::serialize(member)?;
        let write_txn = self.db.begin_write()?;
        {
            let mut table = write_txn.open_table(MEMBERS)?;
            table.insert(member.channel_id, value.as_slice())?;
        }
        write_txn.commit()?;

        debug!("Updated member for channel {}", member.channel_id);
        Ok(())
    }

    pub fn list_members(&self) -> Result<Vec<MemberRecord>> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(MEMBERS)?;

        let mut results = Vec::new();
        let iter = table.range::<i64>(..)?;
        for entry in iter {
            let (_key, value) = entry?;
            results.push(bincode::deserialize(value.value())?);
        }
        Ok(results)
    }

    // ========================================================================
    // Staff Operations
    // ========================================================================

    pub fn create_staff(&self, staff: &StaffRecord) -> Result<()> {
        let key = staff.id.to_string();
        let value = bincode::serialize(staff)?;

        let write_txn = self.db.begin_write()?;
        {
            let mut table = write_txn.open_table(STAFF)?;
            table.insert(key.as_str(), value.as_slice())?;
        }
        write_txn.commit()?;

        debug!("Stored staff record {}", staff.id);
        Ok(())
    }

    pub fn get_staff(&self, id: &Uuid) -> Result<Option<StaffRecord>> {
        let key = id.to_string();

        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(STAFF)?;

        match table.get(key.as_str())? {
            Some(value) => Ok(Some(bincode::deserialize(value.value())?)),
            None => Ok(None),
        }
    }

    pub fn update_staff(&self, staff: &StaffRecord) -> Result<()> {
        if self.get_staff(&staff.id)?.is_none() {
            return Err(GateError::NotFound(format!("staff {}", staff.id)));
        }
        self.create_staff(staff)
    }

    pub fn list_staff(&self) -> Result<Vec<StaffRecord>> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(STAFF)?;

        let mut results = Vec::new();
        let iter = table.range::<&str>(..)?;
        for entry in iter {
            let (_key, value) = entry?;
            results.push(bincode::deserialize(value.value())?);
        }
        Ok(results)
    }

    // ========================================================================
    // Guest Operations
    // ========================================================================

    pub fn create_guest(&self, guest: &GuestRecord) -> Result<()> {
        let value = bincode::serialize(guest)?;

        let write_txn = self.db.begin_write()?;
        {
            let mut table = write_txn.open_table(GUESTS)?;
            table.insert(guest.token_id, value.as_slice())?;
        }
        write_txn.commit()?;

        debug!("Stored guest pass {}", guest.token_id);
        Ok(())
    }

    pub fn get_guest(&self, token_id: TokenId) -> Result<Option<GuestRecord>> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(GUESTS)?;

        match table.get(token_id)? {
            Some(value) => Ok(Some(bincode::deserialize(value.value())?)),
            None => Ok(None),
        }
    }

    pub fn update_guest(&self, guest: &GuestRecord) -> Result<()> {
        if self.get_guest(guest.token_id)?.is_none() {
            return Err(GateError::NotFound(format!("guest pass {}", guest.token_id)));
        }
        self.create_guest(guest)
    }

    /// Find a guest by internal id (admin block/unblock path).
    pub fn find_guest_by_id(&self, id: &Uuid) -> Result<Option<GuestRecord>> {
        let guests = self.list_guests()?;
        Ok(guests.into_iter().find(|g| &g.id == id))
    }

    pub fn list_guests(&self) -> Result<Vec<GuestRecord>> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(GUESTS)?;

        let mut results = Vec::new();
        let iter = table.range::<u64>(..)?;
        for entry in iter {
            let (_key, value) = entry?;
            results.push(bincode::deserialize(value.value())?);
        }
        Ok(results)
    }

    /// Whether a token id is already held by any member or guest.
    /// Staff do not participate in the token namespace.
    pub fn token_in_use(&self, token_id: TokenId) -> Result<bool> {
        if self.get_guest(token_id)?.is_some() {
            return Ok(true);
        }
        let members = self.list_members()?;
        Ok(members.iter().any(|m| m.token_id == token_id))
    }

    // ========================================================================
    // Pending Request Operations
    // ========================================================================

    /// Persist a pending request. An outstanding request for the same token
    /// is superseded.
    pub fn put_pending(&self, request: &PendingRequest) -> Result<()> {
        let value = bincode::serialize(request)?;

        let write_txn = self.db.begin_write()?;
        {
            let mut table = write_txn.open_table(PENDING)?;
            table.insert(request.token_id, value.as_slice())?;
        }
        write_txn.commit()?;

        debug!("Stored pending request for token {}", request.token_id);
        Ok(())
    }

    pub fn get_pending(&self, token_id: TokenId) -> Result<Option<PendingRequest>> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(PENDING)?;

        match table.get(token_id)? {
            Some(value) => Ok(Some(bincode::deserialize(value.value())?)),
            None => Ok(None),
        }
    }

    pub fn remove_pending(&self, token_id: TokenId) -> Result<bool> {
        let write_txn = self.db.begin_write()?;
        let removed;
        {
            let mut table = write_txn.open_table(PENDING)?;
            removed = table.remove(token_id)?.is_some();
        }
        write_txn.commit()?;

        if removed {
            debug!("Removed pending request for token {}", token_id);
        }
        Ok(removed)
    }

    pub fn list_pending(&self) -> Result<Vec<PendingRequest>> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(PENDING)?;

        let mut results = Vec::new();
        let iter = table.range::<u64>(..)?;
        for entry in iter {
            let (_key, value) = entry?;
            results.push(bincode::deserialize(value.value())?);
        }
        Ok(results)
    }

    // ========================================================================
    // Access Log Operations
    // ========================================================================

    /// Append a completed decision. Entries are immutable once written.
    pub fn append_log(
        &self,
        variant: RequestVariant,
        identity_ref: i64,
        outcome: Outcome,
        timestamp: i64,
    ) -> Result<AccessLogEntry> {
        let seq = self.next_log_seq.fetch_add(1, Ordering::SeqCst);
        let entry = AccessLogEntry {
            seq,
            variant,
            identity_ref,
            outcome,
            timestamp,
        };
        let value = bincode::serialize(&entry)?;

        let write_txn = self.db.begin_write()?;
        {
            let mut table = write_txn.open_table(ACCESS_LOG)?;
            table.insert(seq, value.as_slice())?;
        }
        write_txn.commit()?;

        debug!(
            "Logged {} decision for {} ref {}",
            entry.outcome.as_str(),
            entry.variant.as_str(),
            entry.identity_ref
        );
        Ok(entry)
    }

    /// Last `n` entries in insertion order, oldest first within that window.
    pub fn recent_logs(&self, n: usize) -> Result<Vec<AccessLogEntry>> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(ACCESS_LOG)?;

        let mut results: Vec<AccessLogEntry> = Vec::new();
        let iter = table.range::<u64>(..)?;
        for entry in iter {
            let (_key, value) = entry?;
            results.push(bincode::deserialize(value.value())?);
        }

        let start = results.len().saturating_sub(n);
        Ok(results.split_off(start))
    }

    pub fn count_logs(&self) -> Result<usize> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(ACCESS_LOG)?;
        Ok(table.range::<u64>(..)?.count())
    }

    /// Admin bulk reset of the access log.
    pub fn truncate_log(&self) -> Result<()> {
        let write_txn = self.db.begin_write()?;
        write_txn.delete_table(ACCESS_LOG)?;
        {
            let _ = write_txn.open_table(ACCESS_LOG)?;
        }
        write_txn.commit()?;

        info!("Truncated access log");
        Ok(())
    }

    // ========================================================================
    // Bulletin Operations
    // ========================================================================

    pub fn append_bulletin(&self, bulletin: &BulletinRecord) -> Result<u64> {
        let seq = self.next_bulletin_seq.fetch_add(1, Ordering::SeqCst);
        let value = bincode::serialize(bulletin)?;

        let write_txn = self.db.begin_write()?;
        {
            let mut table = write_txn.open_table(BULLETINS)?;
            table.insert(seq, value.as_slice())?;
        }
        write_txn.commit()?;

        debug!("Stored bulletin {}", bulletin.id);
        Ok(seq)
    }

    pub fn latest_bulletin(&self) -> Result<Option<BulletinRecord>> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(BULLETINS)?;

        match table.range::<u64>(..)?.next_back().transpose()? {
            Some((_key, value)) => Ok(Some(bincode::deserialize(value.value())?)),
            None => Ok(None),
        }
    }

    /// All bulletins, newest first.
    pub fn list_bulletins(&self) -> Result<Vec<BulletinRecord>> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(BULLETINS)?;

        let mut results: Vec<BulletinRecord> = Vec::new();
        let iter = table.range::<u64>(..)?;
        for entry in iter {
            let (_key, value) = entry?;
            results.push(bincode::deserialize(value.value())?);
        }
        results.reverse();
        Ok(results)
    }

    pub fn truncate_bulletins(&self) -> Result<()> {
        let write_txn = self.db.begin_write()?;
        write_txn.delete_table(BULLETINS)?;
        {
            let _ = write_txn.open_table(BULLETINS)?;
        }
        write_txn.commit()?;

        info!("Truncated bulletins");
        Ok(())
    }

    // ========================================================================
    // Statistics
    // ========================================================================

    pub fn stats(&self) -> Result<StoreStats> {
        Ok(StoreStats {
            members: self.list_members()?.len(),
            staff: self.list_staff()?.len(),
            guests: self.list_guests()?.len(),
            pending: self.list_pending()?.len(),
            log_entries: self.count_logs()?,
            bulletins: self.list_bulletins()?.len(),
        })
    }
}
