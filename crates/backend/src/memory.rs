// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! In-memory object store backend
//!
//! A faithful stand-in for a consumer cloud drive: flat object namespace
//! with folder parents, per-object ACLs, name-ordered descending listings
//! with pagination, and best-effort deletes. Shared between users through
//! one [`MemoryStore`] so manager pairs in tests exchange real messages.
//!
//! Every listing, download, upload, and delete bumps an API counter; the
//! early-termination and rolling-state tests assert on those counts.

use crate::connection::{BackendConnection, FileCollection, FileMeta, ShareTarget};
use crate::error::{BackendError, BackendResult};
use crate::folders::{
    checkpoints_folder, rolling_state_folder, ArchiveFolder, CollectionFolder, InboxOutboxFolder,
    PEERS_FILE, VERSION_FILE,
};
use async_trait::async_trait;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::Arc;
use syftbox_core::filename::{is_known_object_name, message_timestamp};
use syftbox_core::{
    AcceptedEventsMessage, Checkpoint, Envelope, IncrementalCheckpoint, PeerState,
    ProposedChangeMessage, RollingState, VersionInfo,
};

const DEFAULT_PAGE_SIZE: usize = 100;

/// Store shared by every connection of one simulated backend.
pub type SharedStore = Arc<Mutex<MemoryStore>>;

/// Cumulative API-call counts, one bump per simulated backend round-trip.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ApiCounters {
    pub lists: u64,
    pub downloads: u64,
    pub uploads: u64,
    pub deletes: u64,
}

#[derive(Debug, Clone)]
struct Object {
    id: String,
    name: String,
    parent: Option<String>,
    owner: String,
    is_folder: bool,
    data: Vec<u8>,
    shared_with: HashSet<String>,
    anyone: bool,
}

impl Object {
    fn accessible_by(&self, user: &str) -> bool {
        self.anyone || self.owner == user || self.shared_with.contains(user)
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct PeerEntry {
    state: PeerState,
}

/// The simulated drive.
#[derive(Debug, Default)]
pub struct MemoryStore {
    objects: BTreeMap<String, Object>,
    next_id: u64,
    counters: ApiCounters,
}

impl MemoryStore {
    pub fn shared() -> SharedStore {
        Arc::new(Mutex::new(Self::default()))
    }

    pub fn counters(&self) -> ApiCounters {
        self.counters
    }

    pub fn reset_counters(&mut self) {
        self.counters = ApiCounters::default();
    }

    /// Number of live objects, folders included.
    pub fn object_count(&self) -> usize {
        self.objects.len()
    }

    fn allocate_id(&mut self) -> String {
        self.next_id += 1;
        format!("obj-{}", self.next_id)
    }

    fn create_object(
        &mut self,
        name: &str,
        parent: Option<String>,
        owner: &str,
        is_folder: bool,
        data: Vec<u8>,
    ) -> String {
        let id = self.allocate_id();
        self.objects.insert(
            id.clone(),
            Object {
                id: id.clone(),
                name: name.to_string(),
                parent,
                owner: owner.to_string(),
                is_folder,
                data,
                shared_with: HashSet::new(),
                anyone: false,
            },
        );
        id
    }

    /// Read access: direct grant or a grant on the parent folder.
    fn readable(&self, user: &str, object: &Object) -> bool {
        if object.accessible_by(user) {
            return true;
        }
        object
            .parent
            .as_ref()
            .and_then(|parent| self.objects.get(parent))
            .map_or(false, |parent| parent.accessible_by(user))
    }

    fn find_folder(&self, user: &str, name: &str) -> Option<&Object> {
        self.objects
            .values()
            .find(|object| object.is_folder && object.name == name && self.readable(user, object))
    }

    fn find_child(&self, parent_id: &str, name: &str) -> Option<&Object> {
        self.objects
            .values()
            .find(|object| object.parent.as_deref() == Some(parent_id) && object.name == name)
    }

    /// One page of a name-descending listing.
    fn list_page(&mut self, folder_id: &str, page: usize, page_size: usize) -> Vec<FileMeta> {
        self.counters.lists += 1;
        let mut names: Vec<&Object> = self
            .objects
            .values()
            .filter(|object| object.parent.as_deref() == Some(folder_id) && !object.is_folder)
            .collect();
        names.sort_by(|a, b| b.name.cmp(&a.name));
        names
            .into_iter()
            .skip(page * page_size)
            .take(page_size)
            .map(|object| FileMeta { id: object.id.clone(), name: object.name.clone() })
            .collect()
    }

    fn read_data(&mut self, user: &str, file_id: &str) -> BackendResult<Vec<u8>> {
        self.counters.downloads += 1;
        let object = self
            .objects
            .get(file_id)
            .ok_or_else(|| BackendError::NotFound(file_id.to_string()))?;
        if !self.readable(user, object) {
            return Err(BackendError::PermissionDenied(file_id.to_string()));
        }
        Ok(object.data.clone())
    }
}

/// One user's connection to a [`MemoryStore`].
///
/// Holds per-connection id caches, so `copy()` yields an independent sibling
/// exactly like a real client object would.
pub struct MemoryBackend {
    email: String,
    store: SharedStore,
    page_size: usize,
    folder_id_cache: Mutex<HashMap<String, String>>,
    rolling_state_file_id: Mutex<Option<String>>,
}

impl MemoryBackend {
    pub fn new(store: SharedStore, email: impl Into<String>) -> Self {
        Self {
            email: email.into(),
            store,
            page_size: DEFAULT_PAGE_SIZE,
            folder_id_cache: Mutex::new(HashMap::new()),
            rolling_state_file_id: Mutex::new(None),
        }
    }

    /// Override the listing page size (tests exercise early termination
    /// with tiny pages).
    pub fn with_page_size(mut self, page_size: usize) -> Self {
        self.page_size = page_size;
        self
    }

    pub fn counters(&self) -> ApiCounters {
        self.store.lock().counters()
    }

    pub fn store(&self) -> SharedStore {
        Arc::clone(&self.store)
    }

    /// Find a visible folder id by name, caching hits.
    fn folder_id(&self, name: &str) -> Option<String> {
        if let Some(id) = self.folder_id_cache.lock().get(name) {
            return Some(id.clone());
        }
        let store = self.store.lock();
        let id = store.find_folder(&self.email, name).map(|object| object.id.clone());
        drop(store);
        if let Some(id) = &id {
            self.folder_id_cache.lock().insert(name.to_string(), id.clone());
        }
        id
    }

    /// Find-or-create one of our own root folders.
    fn ensure_own_folder(&self, name: &str) -> String {
        if let Some(id) = self.folder_id(name) {
            return id;
        }
        let mut store = self.store.lock();
        let id = store.create_object(name, None, &self.email, true, Vec::new());
        drop(store);
        self.folder_id_cache.lock().insert(name.to_string(), id.clone());
        id
    }

    fn create_file(&self, parent_id: &str, name: &str, data: Vec<u8>) -> BackendResult<String> {
        let mut store = self.store.lock();
        store.counters.uploads += 1;
        let parent = store
            .objects
            .get(parent_id)
            .ok_or_else(|| BackendError::NotFound(parent_id.to_string()))?;
        if !parent.accessible_by(&self.email) {
            return Err(BackendError::PermissionDenied(parent_id.to_string()));
        }
        Ok(store.create_object(name, Some(parent_id.to_string()), &self.email, false, data))
    }

    /// Full listing: fetch pages until one comes back short.
    fn list_all(&self, folder_id: &str) -> Vec<FileMeta> {
        let mut out = Vec::new();
        let mut page = 0;
        loop {
            let metas = self.store.lock().list_page(folder_id, page, self.page_size);
            let fetched = metas.len();
            out.extend(metas);
            if fetched < self.page_size {
                return out;
            }
            page += 1;
        }
    }

    /// Name-descending listing with early termination at `since`.
    ///
    /// Pagination stops as soon as a page contains a timestamped name at or
    /// below the mark; names without a timestamp are kept.
    fn list_since(&self, folder_id: &str, since: Option<f64>) -> Vec<FileMeta> {
        let Some(since) = since else {
            return self.list_all(folder_id);
        };
        let mut out = Vec::new();
        let mut page = 0;
        loop {
            let metas = self.store.lock().list_page(folder_id, page, self.page_size);
            let fetched = metas.len();
            for meta in metas {
                match message_timestamp(&meta.name) {
                    Some(timestamp) if timestamp <= since => return out,
                    _ => out.push(meta),
                }
            }
            if fetched < self.page_size {
                return out;
            }
            page += 1;
        }
    }

    fn read_peers_json(&self) -> BackendResult<BTreeMap<String, PeerEntry>> {
        let mut store = self.store.lock();
        let Some(file) = store
            .objects
            .values()
            .find(|object| {
                object.name == PEERS_FILE && object.owner == self.email && !object.is_folder
            })
            .map(|object| object.id.clone())
        else {
            return Ok(BTreeMap::new());
        };
        let data = store.read_data(&self.email, &file)?;
        serde_json::from_slice(&data).map_err(|err| BackendError::Malformed {
            name: PEERS_FILE.to_string(),
            reason: err.to_string(),
        })
    }

    fn write_peers_json(&self, peers: &BTreeMap<String, PeerEntry>) -> BackendResult<()> {
        let data = serde_json::to_vec_pretty(peers).map_err(|err| BackendError::Malformed {
            name: PEERS_FILE.to_string(),
            reason: err.to_string(),
        })?;
        let mut store = self.store.lock();
        store.counters.uploads += 1;
        let existing = store
            .objects
            .values()
            .find(|object| {
                object.name == PEERS_FILE && object.owner == self.email && !object.is_folder
            })
            .map(|object| object.id.clone());
        match existing {
            Some(id) => {
                if let Some(object) = store.objects.get_mut(&id) {
                    object.data = data;
                }
            }
            None => {
                store.create_object(PEERS_FILE, None, &self.email, false, data);
            }
        }
        Ok(())
    }

    fn set_peer_state(&self, peer_email: &str, state: PeerState, overwrite: bool) -> BackendResult<()> {
        let mut peers = self.read_peers_json()?;
        if overwrite || !peers.contains_key(peer_email) {
            peers.insert(peer_email.to_string(), PeerEntry { state });
        }
        self.write_peers_json(&peers)
    }

    fn version_file_id(&self, owner: &str) -> Option<String> {
        let store = self.store.lock();
        store
            .objects
            .values()
            .find(|object| {
                object.name == VERSION_FILE && object.owner == owner && !object.is_folder
            })
            .map(|object| object.id.clone())
    }

    fn full_checkpoint_metas(&self) -> Vec<(FileMeta, f64)> {
        let Some(folder) = self.folder_id(&checkpoints_folder(&self.email)) else {
            return Vec::new();
        };
        self.list_all(&folder)
            .into_iter()
            .filter_map(|meta| {
                Checkpoint::file_name_timestamp(&meta.name).map(|timestamp| (meta, timestamp))
            })
            .collect()
    }

    fn delete_object(&self, id: &str) -> BackendResult<()> {
        let mut store = self.store.lock();
        store.counters.deletes += 1;
        let object =
            store.objects.get(id).ok_or_else(|| BackendError::NotFound(id.to_string()))?;
        if !object.accessible_by(&self.email) {
            return Err(BackendError::PermissionDenied(id.to_string()));
        }
        store.objects.remove(id);
        Ok(())
    }
}

#[async_trait]
impl BackendConnection for MemoryBackend {
    fn email(&self) -> &str {
        &self.email
    }

    fn copy(&self) -> Box<dyn BackendConnection> {
        Box::new(Self {
            email: self.email.clone(),
            store: Arc::clone(&self.store),
            page_size: self.page_size,
            folder_id_cache: Mutex::new(self.folder_id_cache.lock().clone()),
            rolling_state_file_id: Mutex::new(self.rolling_state_file_id.lock().clone()),
        })
    }

    fn reset_caches(&self) {
        self.folder_id_cache.lock().clear();
        *self.rolling_state_file_id.lock() = None;
    }

    async fn register_peer_request(&self, owner_email: &str) -> BackendResult<()> {
        let to_owner = InboxOutboxFolder::new(&self.email, owner_email).to_string();
        let from_owner = InboxOutboxFolder::new(owner_email, &self.email).to_string();
        for name in [to_owner, from_owner] {
            let id = self.ensure_own_folder(&name);
            let mut store = self.store.lock();
            if let Some(object) = store.objects.get_mut(&id) {
                object.shared_with.insert(owner_email.to_string());
            }
        }
        self.set_peer_state(owner_email, PeerState::Pending, false)
    }

    async fn peers_as_ds(&self) -> BackendResult<Vec<String>> {
        Ok(self.read_peers_json()?.into_keys().collect())
    }

    async fn approved_peers_as_do(&self) -> BackendResult<Vec<String>> {
        Ok(self
            .read_peers_json()?
            .into_iter()
            .filter(|(_, entry)| entry.state == PeerState::Accepted)
            .map(|(email, _)| email)
            .collect())
    }

    async fn peer_requests_as_do(&self) -> BackendResult<Vec<String>> {
        let peers = self.read_peers_json()?;
        let store = self.store.lock();
        let mut pending: Vec<String> = store
            .objects
            .values()
            .filter(|object| object.is_folder && store.readable(&self.email, object))
            .filter_map(|object| InboxOutboxFolder::from_name(&object.name))
            .filter(|folder| {
                folder.recipient_email == self.email && folder.sender_email != self.email
            })
            .map(|folder| folder.sender_email)
            .filter(|sender| {
                !matches!(
                    peers.get(sender).map(|entry| entry.state),
                    Some(PeerState::Accepted) | Some(PeerState::Rejected)
                )
            })
            .collect();
        pending.sort();
        pending.dedup();
        Ok(pending)
    }

    async fn update_peer_state(&self, peer_email: &str, state: PeerState) -> BackendResult<()> {
        self.set_peer_state(peer_email, state, true)
    }

    async fn send_proposed_message(
        &self,
        recipient: &str,
        message: &ProposedChangeMessage,
    ) -> BackendResult<()> {
        let folder_name = InboxOutboxFolder::new(&self.email, recipient).to_string();
        let folder = self.folder_id(&folder_name).ok_or_else(|| {
            BackendError::Invalid(format!("no inbox/outbox folder toward {recipient}"))
        })?;
        self.create_file(&folder, &message.file_name.to_string(), message.to_compressed()?)?;
        Ok(())
    }

    async fn next_proposed_message(
        &self,
        sender_email: &str,
    ) -> BackendResult<Option<ProposedChangeMessage>> {
        let folder_name = InboxOutboxFolder::new(sender_email, &self.email).to_string();
        let Some(folder) = self.folder_id(&folder_name) else {
            return Ok(None);
        };

        let mut candidates: Vec<(f64, String, FileMeta)> = self
            .list_all(&folder)
            .into_iter()
            .filter_map(|meta| {
                let parsed: syftbox_core::ProposalFileName = meta.name.parse().ok()?;
                Some((parsed.timestamp(), parsed.id().to_string(), meta))
            })
            .collect();
        candidates.sort_by(|a, b| {
            a.0.partial_cmp(&b.0).unwrap_or(std::cmp::Ordering::Equal).then(a.1.cmp(&b.1))
        });

        for (_, _, meta) in candidates {
            let data = self.store.lock().read_data(&self.email, &meta.id)?;
            match ProposedChangeMessage::from_compressed(&data) {
                Ok(message) => return Ok(Some(message)),
                Err(err) => {
                    tracing::warn!(name = %meta.name, error = %err, "skipping malformed proposed message");
                }
            }
        }
        Ok(None)
    }

    async fn archive_proposed_message(
        &self,
        message: &ProposedChangeMessage,
    ) -> BackendResult<()> {
        let sender = &message.sender_email;
        let inbox_name = InboxOutboxFolder::new(sender, &self.email).to_string();
        let inbox = self
            .folder_id(&inbox_name)
            .ok_or_else(|| BackendError::NotFound(inbox_name.clone()))?;

        let file_name = message.file_name.to_string();
        let file_id = self
            .store
            .lock()
            .find_child(&inbox, &file_name)
            .map(|object| object.id.clone())
            .ok_or_else(|| BackendError::NotFound(file_name.clone()))?;

        let archive = self.ensure_own_folder(&ArchiveFolder::new(sender, &self.email).to_string());

        // Atomic parent swap: the message is always intact in exactly one
        // folder, even if we crash here.
        let mut store = self.store.lock();
        store.counters.uploads += 1;
        if let Some(object) = store.objects.get_mut(&file_id) {
            object.parent = Some(archive);
        }
        Ok(())
    }

    async fn write_events_message_to_log(
        &self,
        message: &AcceptedEventsMessage,
    ) -> BackendResult<String> {
        let folder = self.ensure_own_folder(&self.email);
        self.create_file(&folder, &message.file_name.to_string(), message.to_compressed()?)
    }

    async fn write_events_message_to_outbox(
        &self,
        recipient: &str,
        message: &AcceptedEventsMessage,
    ) -> BackendResult<String> {
        let folder_name = InboxOutboxFolder::new(&self.email, recipient).to_string();
        let folder = self.folder_id(&folder_name).ok_or_else(|| {
            BackendError::Invalid(format!("no outbox folder toward {recipient}"))
        })?;
        self.create_file(&folder, &message.file_name.to_string(), message.to_compressed()?)
    }

    async fn accepted_event_ids(
        &self,
        since_timestamp: Option<f64>,
    ) -> BackendResult<Vec<String>> {
        let Some(folder) = self.folder_id(&self.email) else {
            return Ok(Vec::new());
        };
        Ok(self
            .list_since(&folder, since_timestamp)
            .into_iter()
            .filter(|meta| meta.name.parse::<syftbox_core::EventsMessageFileName>().is_ok())
            .map(|meta| meta.id)
            .collect())
    }

    async fn events_messages_since(
        &self,
        since_timestamp: f64,
    ) -> BackendResult<Vec<AcceptedEventsMessage>> {
        let Some(folder) = self.folder_id(&self.email) else {
            return Ok(Vec::new());
        };
        let mut messages = Vec::new();
        for meta in self.list_since(&folder, Some(since_timestamp)) {
            let Ok(name) = meta.name.parse::<syftbox_core::EventsMessageFileName>() else {
                continue;
            };
            if name.timestamp() <= since_timestamp {
                continue;
            }
            let data = self.store.lock().read_data(&self.email, &meta.id)?;
            match AcceptedEventsMessage::from_compressed(&data) {
                Ok(message) => messages.push(message),
                Err(err) => {
                    tracing::warn!(name = %meta.name, error = %err, "skipping malformed events message");
                }
            }
        }
        messages.sort_by(|a, b| {
            a.timestamp()
                .partial_cmp(&b.timestamp())
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| a.id().cmp(&b.id()))
        });
        Ok(messages)
    }

    async fn download_events_message(
        &self,
        file_id: &str,
    ) -> BackendResult<AcceptedEventsMessage> {
        let data = self.store.lock().read_data(&self.email, file_id)?;
        Ok(AcceptedEventsMessage::from_compressed(&data)?)
    }

    async fn outbox_file_metas(
        &self,
        peer_email: &str,
        since_timestamp: Option<f64>,
    ) -> BackendResult<Vec<FileMeta>> {
        let folder_name = InboxOutboxFolder::new(peer_email, &self.email).to_string();
        let folder = self.folder_id(&folder_name).ok_or_else(|| {
            BackendError::Invalid(format!("no inbox folder from {peer_email}"))
        })?;
        Ok(self
            .list_since(&folder, since_timestamp)
            .into_iter()
            .filter(|meta| meta.name.parse::<syftbox_core::EventsMessageFileName>().is_ok())
            .collect())
    }

    async fn upload_checkpoint(&self, checkpoint: &Checkpoint) -> BackendResult<String> {
        let folder = self.ensure_own_folder(&checkpoints_folder(&self.email));
        let id = self.create_file(&folder, &checkpoint.file_name(), checkpoint.to_compressed()?)?;

        // New snapshot is durable; now retire the old ones.
        for (meta, _) in self.full_checkpoint_metas() {
            if meta.id != id {
                if let Err(err) = self.delete_object(&meta.id) {
                    tracing::warn!(name = %meta.name, error = %err, "failed to delete old checkpoint");
                }
            }
        }
        Ok(id)
    }

    async fn latest_checkpoint(&self) -> BackendResult<Option<Checkpoint>> {
        let mut metas = self.full_checkpoint_metas();
        metas.sort_by(|a, b| a.1.partial_cmp(&b.1).unwrap_or(std::cmp::Ordering::Equal));
        let Some((meta, _)) = metas.pop() else {
            return Ok(None);
        };
        let data = self.store.lock().read_data(&self.email, &meta.id)?;
        match Checkpoint::from_compressed(&data) {
            Ok(checkpoint) => Ok(Some(checkpoint)),
            Err(err) => {
                tracing::warn!(name = %meta.name, error = %err, "failed to load checkpoint");
                Ok(None)
            }
        }
    }

    async fn upload_incremental_checkpoint(
        &self,
        checkpoint: &IncrementalCheckpoint,
    ) -> BackendResult<String> {
        let folder = self.ensure_own_folder(&checkpoints_folder(&self.email));
        self.create_file(&folder, &checkpoint.file_name(), checkpoint.to_compressed()?)
    }

    async fn incremental_checkpoints(&self) -> BackendResult<Vec<IncrementalCheckpoint>> {
        let Some(folder) = self.folder_id(&checkpoints_folder(&self.email)) else {
            return Ok(Vec::new());
        };
        let mut checkpoints = Vec::new();
        for meta in self.list_all(&folder) {
            if IncrementalCheckpoint::file_name_sequence(&meta.name).is_none() {
                continue;
            }
            let data = self.store.lock().read_data(&self.email, &meta.id)?;
            match IncrementalCheckpoint::from_compressed(&data) {
                Ok(checkpoint) => checkpoints.push(checkpoint),
                Err(err) => {
                    tracing::warn!(name = %meta.name, error = %err, "skipping malformed incremental checkpoint");
                }
            }
        }
        checkpoints.sort_by_key(|checkpoint| checkpoint.sequence_number);
        Ok(checkpoints)
    }

    async fn incremental_checkpoint_count(&self) -> BackendResult<usize> {
        let Some(folder) = self.folder_id(&checkpoints_folder(&self.email)) else {
            return Ok(0);
        };
        Ok(self
            .list_all(&folder)
            .into_iter()
            .filter(|meta| IncrementalCheckpoint::file_name_sequence(&meta.name).is_some())
            .count())
    }

    async fn next_incremental_sequence_number(&self) -> BackendResult<u64> {
        let Some(folder) = self.folder_id(&checkpoints_folder(&self.email)) else {
            return Ok(1);
        };
        let max = self
            .list_all(&folder)
            .into_iter()
            .filter_map(|meta| IncrementalCheckpoint::file_name_sequence(&meta.name))
            .max()
            .unwrap_or(0);
        Ok(max + 1)
    }

    async fn delete_incremental_checkpoints(&self) -> BackendResult<()> {
        let Some(folder) = self.folder_id(&checkpoints_folder(&self.email)) else {
            return Ok(());
        };
        for meta in self.list_all(&folder) {
            if IncrementalCheckpoint::file_name_sequence(&meta.name).is_some() {
                if let Err(err) = self.delete_object(&meta.id) {
                    tracing::warn!(name = %meta.name, error = %err, "failed to delete incremental checkpoint");
                }
            }
        }
        Ok(())
    }

    async fn upload_rolling_state(&self, state: &RollingState) -> BackendResult<String> {
        let data = state.to_compressed()?;
        let name = state.file_name();

        // In-place update through the cached object id costs one call.
        let cached = self.rolling_state_file_id.lock().clone();
        if let Some(id) = cached {
            let mut store = self.store.lock();
            if store.objects.contains_key(&id) {
                store.counters.uploads += 1;
                if let Some(object) = store.objects.get_mut(&id) {
                    object.data = data;
                    object.name = name;
                }
                return Ok(id);
            }
            drop(store);
            *self.rolling_state_file_id.lock() = None;
        }

        let folder = self.ensure_own_folder(&rolling_state_folder(&self.email));
        let id = self.create_file(&folder, &name, data)?;
        *self.rolling_state_file_id.lock() = Some(id.clone());
        Ok(id)
    }

    async fn rolling_state(&self) -> BackendResult<Option<RollingState>> {
        let Some(folder) = self.folder_id(&rolling_state_folder(&self.email)) else {
            return Ok(None);
        };
        let mut metas: Vec<(f64, FileMeta)> = self
            .list_all(&folder)
            .into_iter()
            .filter_map(|meta| {
                RollingState::file_name_timestamp(&meta.name).map(|timestamp| (timestamp, meta))
            })
            .collect();
        metas.sort_by(|a, b| a.0.partial_cmp(&b.0).unwrap_or(std::cmp::Ordering::Equal));
        let Some((_, meta)) = metas.pop() else {
            return Ok(None);
        };
        let data = self.store.lock().read_data(&self.email, &meta.id)?;
        match RollingState::from_compressed(&data) {
            Ok(state) => {
                *self.rolling_state_file_id.lock() = Some(meta.id);
                Ok(Some(state))
            }
            Err(err) => {
                tracing::warn!(name = %meta.name, error = %err, "failed to load rolling state");
                Ok(None)
            }
        }
    }

    async fn delete_rolling_state(&self) -> BackendResult<()> {
        *self.rolling_state_file_id.lock() = None;
        let Some(folder) = self.folder_id(&rolling_state_folder(&self.email)) else {
            return Ok(());
        };
        for meta in self.list_all(&folder) {
            if RollingState::file_name_timestamp(&meta.name).is_some() {
                if let Err(err) = self.delete_object(&meta.id) {
                    if !err.is_not_found() {
                        tracing::warn!(name = %meta.name, error = %err, "failed to delete rolling state");
                    }
                }
            }
        }
        Ok(())
    }

    async fn create_collection_folder(
        &self,
        tag: &str,
        content_hash: &str,
        private: bool,
    ) -> BackendResult<String> {
        let folder = if private {
            CollectionFolder::private(tag, content_hash)
        } else {
            CollectionFolder::shared(tag, content_hash)
        };
        Ok(self.ensure_own_folder(&folder.to_string()))
    }

    async fn upload_collection_files(
        &self,
        tag: &str,
        content_hash: &str,
        private: bool,
        files: &BTreeMap<String, Vec<u8>>,
    ) -> BackendResult<()> {
        let folder = if private {
            CollectionFolder::private(tag, content_hash)
        } else {
            CollectionFolder::shared(tag, content_hash)
        };
        let folder_id = self
            .folder_id(&folder.to_string())
            .ok_or_else(|| BackendError::NotFound(folder.to_string()))?;
        for (name, data) in files {
            self.create_file(&folder_id, name, data.clone())?;
        }
        Ok(())
    }

    async fn share_collection(
        &self,
        tag: &str,
        content_hash: &str,
        target: &ShareTarget,
    ) -> BackendResult<()> {
        let folder = CollectionFolder::shared(tag, content_hash).to_string();
        let folder_id =
            self.folder_id(&folder).ok_or_else(|| BackendError::NotFound(folder.clone()))?;
        let mut store = self.store.lock();
        let object = store
            .objects
            .get_mut(&folder_id)
            .ok_or_else(|| BackendError::NotFound(folder))?;
        match target {
            ShareTarget::Anyone => object.anyone = true,
            ShareTarget::Users(users) => {
                object.shared_with.extend(users.iter().cloned());
            }
        }
        Ok(())
    }

    async fn collections_as_do(&self, private: bool) -> BackendResult<Vec<FileCollection>> {
        let store = self.store.lock();
        Ok(store
            .objects
            .values()
            .filter(|object| object.is_folder && object.owner == self.email)
            .filter_map(|object| {
                let folder = CollectionFolder::from_name(&object.name)?;
                (folder.private == private).then(|| FileCollection {
                    folder_id: object.id.clone(),
                    owner_email: object.owner.clone(),
                    tag: folder.tag,
                    content_hash: folder.content_hash,
                    shared_with_anyone: object.anyone,
                })
            })
            .collect())
    }

    async fn collections_as_ds(&self) -> BackendResult<Vec<FileCollection>> {
        let store = self.store.lock();
        Ok(store
            .objects
            .values()
            .filter(|object| {
                object.is_folder
                    && object.owner != self.email
                    && object.accessible_by(&self.email)
            })
            .filter_map(|object| {
                let folder = CollectionFolder::from_name(&object.name)?;
                (!folder.private).then(|| FileCollection {
                    folder_id: object.id.clone(),
                    owner_email: object.owner.clone(),
                    tag: folder.tag,
                    content_hash: folder.content_hash,
                    shared_with_anyone: object.anyone,
                })
            })
            .collect())
    }

    async fn collection_file_metas(
        &self,
        owner_email: &str,
        tag: &str,
        content_hash: &str,
        private: bool,
    ) -> BackendResult<Vec<FileMeta>> {
        let folder = if private {
            CollectionFolder::private(tag, content_hash)
        } else {
            CollectionFolder::shared(tag, content_hash)
        };
        let name = folder.to_string();
        let folder_id = {
            let store = self.store.lock();
            store
                .objects
                .values()
                .find(|object| {
                    object.is_folder
                        && object.name == name
                        && object.owner == owner_email
                        && store.readable(&self.email, object)
                })
                .map(|object| object.id.clone())
        };
        let folder_id = folder_id.ok_or_else(|| BackendError::NotFound(name))?;
        Ok(self.list_all(&folder_id))
    }

    async fn download_file(&self, file_id: &str) -> BackendResult<Vec<u8>> {
        self.store.lock().read_data(&self.email, file_id)
    }

    async fn write_version_file(&self, info: &VersionInfo) -> BackendResult<()> {
        let data = info
            .to_json()
            .map_err(|err| BackendError::Malformed {
                name: VERSION_FILE.to_string(),
                reason: err.to_string(),
            })?
            .into_bytes();
        let mut store = self.store.lock();
        store.counters.uploads += 1;
        match self.version_file_id_locked(&store) {
            Some(id) => {
                if let Some(object) = store.objects.get_mut(&id) {
                    object.data = data;
                }
            }
            None => {
                store.create_object(VERSION_FILE, None, &self.email, false, data);
            }
        }
        Ok(())
    }

    async fn read_peer_version_file(
        &self,
        peer_email: &str,
    ) -> BackendResult<Option<VersionInfo>> {
        let Some(id) = self.version_file_id(peer_email) else {
            return Ok(None);
        };
        let data = {
            let mut store = self.store.lock();
            match store.read_data(&self.email, &id) {
                Ok(data) => data,
                Err(err) if err.is_permission_denied() => return Ok(None),
                Err(err) => return Err(err),
            }
        };
        match String::from_utf8(data).ok().and_then(|json| VersionInfo::from_json(&json).ok()) {
            Some(info) => Ok(Some(info)),
            None => {
                tracing::warn!(peer = %peer_email, "failed to parse peer version file");
                Ok(None)
            }
        }
    }

    async fn share_version_file(&self, peer_email: &str) -> BackendResult<()> {
        if self.version_file_id(&self.email).is_none() {
            self.write_version_file(&VersionInfo::current()).await?;
        }
        let id = self
            .version_file_id(&self.email)
            .ok_or_else(|| BackendError::NotFound(VERSION_FILE.to_string()))?;
        let mut store = self.store.lock();
        if let Some(object) = store.objects.get_mut(&id) {
            object.shared_with.insert(peer_email.to_string());
        }
        Ok(())
    }

    async fn all_object_ids(&self) -> BackendResult<Vec<String>> {
        let store = self.store.lock();
        Ok(store
            .objects
            .values()
            .filter(|object| object.owner == self.email)
            .map(|object| object.id.clone())
            .collect())
    }

    async fn delete_objects(
        &self,
        ids: &[String],
        ignore_permission_denied: bool,
        ignore_not_found: bool,
    ) -> BackendResult<()> {
        for id in ids {
            match self.delete_object(id) {
                Ok(()) => {}
                Err(err) if err.is_not_found() && ignore_not_found => {}
                Err(err) if err.is_permission_denied() && ignore_permission_denied => {}
                Err(err) => return Err(err),
            }
        }
        Ok(())
    }

    async fn find_orphaned_message_files(&self) -> BackendResult<Vec<String>> {
        let store = self.store.lock();
        Ok(store
            .objects
            .values()
            .filter(|object| {
                !object.is_folder
                    && object.owner == self.email
                    && is_known_object_name(&object.name)
            })
            .map(|object| object.id.clone())
            .collect())
    }
}

impl MemoryBackend {
    fn version_file_id_locked(&self, store: &MemoryStore) -> Option<String> {
        store
            .objects
            .values()
            .find(|object| {
                object.name == VERSION_FILE && object.owner == self.email && !object.is_folder
            })
            .map(|object| object.id.clone())
    }
}

#[cfg(test)]
#[path = "memory_tests.rs"]
mod tests;
