use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};
use ulid::Ulid;

use crate::error::CalendarError;
use crate::journal::{Journal, JournalRecord};
use crate::limits::{MAX_NOTE_LEN, MAX_PENDING_MUTATIONS};
use crate::model::*;
use crate::session::SessionContext;
use crate::snapshot::Snapshot;

/// A change the user made locally that the backend has not confirmed yet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Mutation {
    PlaceBooking(CalendarEvent),
    CancelBooking { id: Ulid },
    PlaceBlock(CalendarEvent),
    RemoveBlock { id: Ulid },
}

impl Mutation {
    pub fn label(&self) -> &'static str {
        match self {
            Mutation::PlaceBooking(_) => "place_booking",
            Mutation::CancelBooking { .. } => "cancel_booking",
            Mutation::PlaceBlock(_) => "place_block",
            Mutation::RemoveBlock { .. } => "remove_block",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingEntry {
    pub ticket: Ulid,
    pub mutation: Mutation,
}

/// Write-ahead buffer for optimistic updates.
///
/// `stage` records a mutation (journal first, when one is attached) and the
/// overlay shows it immediately. The backend's answer then settles the
/// ticket: `commit` drops it because the base now carries the change,
/// `rollback` drops it so the overlay reverts.
pub struct PendingBuffer {
    entries: Vec<PendingEntry>,
    journal: Option<Journal>,
    compact_threshold: u64,
}

impl Default for PendingBuffer {
    fn default() -> Self {
        Self::new()
    }
}

impl PendingBuffer {
    /// Buffer without durability; pending mutations die with the process.
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
            journal: None,
            compact_threshold: u64::MAX,
        }
    }

    /// Buffer backed by a journal at `path`, restoring whatever was still
    /// pending when it was last closed.
    pub fn open(path: &Path, compact_threshold: u64) -> Result<Self, CalendarError> {
        let entries = replay_entries(Journal::recover(path)?);
        let journal = Journal::open(path)?;
        if !entries.is_empty() {
            info!("restored {} pending mutations from {}", entries.len(), path.display());
        }
        metrics::gauge!(crate::observability::PENDING_MUTATIONS).set(entries.len() as f64);
        Ok(Self {
            entries,
            journal: Some(journal),
            compact_threshold,
        })
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn entries(&self) -> &[PendingEntry] {
        &self.entries
    }

    /// Validate `mutation` against the current overlay and record it.
    pub fn stage(
        &mut self,
        session: &SessionContext,
        base: &Snapshot,
        mutation: Mutation,
    ) -> Result<Ulid, CalendarError> {
        if self.entries.len() >= MAX_PENDING_MUTATIONS {
            return Err(CalendarError::LimitExceeded("too many pending mutations"));
        }
        authorize(session, base, &mutation)?;
        let overlay = self.overlay(base);
        if let Err(e) = check_mutation(&overlay, &mutation) {
            record_outcome(&mutation, "rejected");
            return Err(e);
        }

        let ticket = Ulid::new();
        self.write(&JournalRecord::Staged {
            ticket,
            mutation: mutation.clone(),
        })?;
        debug!("staged {} as {ticket}", mutation.label());
        record_outcome(&mutation, "staged");
        self.entries.push(PendingEntry { ticket, mutation });
        metrics::gauge!(crate::observability::PENDING_MUTATIONS).set(self.entries.len() as f64);
        self.maybe_compact()?;
        Ok(ticket)
    }

    /// `base` with every pending mutation applied in staging order.
    /// Mutations the base already reflects are skipped.
    pub fn overlay(&self, base: &Snapshot) -> Snapshot {
        let mut snapshot = base.clone();
        for entry in &self.entries {
            if let Err(e) = snapshot.apply(&entry.mutation) {
                debug!("pending {} not applied to overlay: {e}", entry.ticket);
            }
        }
        snapshot
    }

    /// The backend accepted the mutation.
    pub fn commit(&mut self, ticket: Ulid) -> Result<Mutation, CalendarError> {
        self.settle(ticket, JournalRecord::Committed { ticket }, "committed")
    }

    /// The backend refused the mutation; the overlay reverts.
    pub fn rollback(&mut self, ticket: Ulid) -> Result<Mutation, CalendarError> {
        self.settle(ticket, JournalRecord::RolledBack { ticket }, "rolled_back")
    }

    fn settle(
        &mut self,
        ticket: Ulid,
        record: JournalRecord,
        outcome: &'static str,
    ) -> Result<Mutation, CalendarError> {
        let pos = self
            .entries
            .iter()
            .position(|e| e.ticket == ticket)
            .ok_or(CalendarError::NotFound(ticket))?;
        self.write(&record)?;
        let entry = self.entries.remove(pos);
        debug!("{outcome} {} ({ticket})", entry.mutation.label());
        record_outcome(&entry.mutation, outcome);
        metrics::gauge!(crate::observability::PENDING_MUTATIONS).set(self.entries.len() as f64);
        self.maybe_compact()?;
        Ok(entry.mutation)
    }

    fn write(&mut self, record: &JournalRecord) -> Result<(), CalendarError> {
        if let Some(journal) = self.journal.as_mut() {
            journal.append(record)?;
        }
        Ok(())
    }

    /// Rewrite the journal down to the live `Staged` records once it has
    /// grown past the threshold, or as soon as nothing is pending.
    fn maybe_compact(&mut self) -> Result<(), CalendarError> {
        let Some(journal) = self.journal.as_mut() else {
            return Ok(());
        };
        let appends = journal.appends_since_compact();
        if appends == 0 || (appends < self.compact_threshold && !self.entries.is_empty()) {
            return Ok(());
        }
        let live: Vec<JournalRecord> = self
            .entries
            .iter()
            .map(|e| JournalRecord::Staged {
                ticket: e.ticket,
                mutation: e.mutation.clone(),
            })
            .collect();
        journal.compact(&live)?;
        debug!("compacted journal {} to {} records", journal.path().display(), live.len());
        Ok(())
    }
}

fn record_outcome(mutation: &Mutation, outcome: &'static str) {
    metrics::counter!(
        crate::observability::MUTATIONS_TOTAL,
        "kind" => mutation.label(),
        "outcome" => outcome
    )
    .increment(1);
}

fn replay_entries(records: Vec<JournalRecord>) -> Vec<PendingEntry> {
    let mut entries: Vec<PendingEntry> = Vec::new();
    for record in records {
        match record {
            JournalRecord::Staged { ticket, mutation } => {
                entries.push(PendingEntry { ticket, mutation })
            }
            JournalRecord::Committed { ticket } | JournalRecord::RolledBack { ticket } => {
                entries.retain(|e| e.ticket != ticket)
            }
        }
    }
    entries
}

fn authorize(
    session: &SessionContext,
    base: &Snapshot,
    mutation: &Mutation,
) -> Result<(), CalendarError> {
    if session.facility_id != base.facility().id {
        return Err(CalendarError::Forbidden("session is bound to another facility"));
    }
    match mutation {
        Mutation::PlaceBlock(_) | Mutation::RemoveBlock { .. } if !session.role.can_manage() => {
            Err(CalendarError::Forbidden("only facility staff manage blocks"))
        }
        _ => Ok(()),
    }
}

/// Check a mutation against the overlay it would be applied to.
///
/// Courts hold one booking at a time: a new booking may not touch any
/// existing booking or block. Blocks may be laid over bookings; display
/// precedence shows the block.
fn check_mutation(overlay: &Snapshot, mutation: &Mutation) -> Result<(), CalendarError> {
    match mutation {
        Mutation::PlaceBooking(event) => {
            let EventKind::Booked { id, .. } = &event.kind else {
                return Err(CalendarError::InvalidMutation("booking must carry a booked event"));
            };
            check_new_event(overlay, *id, event)?;
            for other in overlay.overlapping(event.court_id, event.date, &event.span) {
                if let Some(other_id) = other.id() {
                    return Err(CalendarError::Conflict(other_id));
                }
            }
            Ok(())
        }
        Mutation::PlaceBlock(event) => {
            let EventKind::Blocked { id, note, .. } = &event.kind else {
                return Err(CalendarError::InvalidMutation("block must carry a blocked event"));
            };
            if note.as_ref().is_some_and(|n| n.len() > MAX_NOTE_LEN) {
                return Err(CalendarError::LimitExceeded("block note too long"));
            }
            check_new_event(overlay, *id, event)
        }
        Mutation::CancelBooking { id } => expect_existing(overlay, *id, Category::Booked),
        Mutation::RemoveBlock { id } => expect_existing(overlay, *id, Category::Blocked),
    }
}

fn check_new_event(overlay: &Snapshot, id: Ulid, event: &CalendarEvent) -> Result<(), CalendarError> {
    Span::try_new(event.span.start, event.span.end)?;
    if overlay.find(id).is_some() {
        return Err(CalendarError::AlreadyExists(id));
    }
    if !overlay.range().contains(event.date) {
        return Err(CalendarError::OutOfRange(event.date));
    }
    if overlay.facility().court(event.court_id).is_none() {
        return Err(CalendarError::NotFound(event.court_id));
    }
    Ok(())
}

fn expect_existing(overlay: &Snapshot, id: Ulid, category: Category) -> Result<(), CalendarError> {
    match overlay.find(id) {
        Some(e) if e.category() == category => Ok(()),
        _ => Err(CalendarError::NotFound(id)),
    }
}
