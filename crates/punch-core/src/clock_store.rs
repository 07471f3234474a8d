//! In-memory attendance state with write-through persistence

use chrono::{DateTime, Local};
use punch_store::{NewShift, Store, StoredShift, StoredTime};
use punch_util::{OriginContext, UserId};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::{CoreError, CoreResult, ExclusionList, ShiftRecord};

/// Open shift slot; a row whose clock-in time no longer parses is kept
/// as-is so it still blocks a second shift and can still be closed.
#[derive(Debug, Clone)]
enum OpenSlot {
    Open(ShiftRecord),
    Corrupt { user_id: UserId, raw: String },
}

impl OpenSlot {
    fn user_id(&self) -> &UserId {
        match self {
            OpenSlot::Open(shift) => &shift.user_id,
            OpenSlot::Corrupt { user_id, .. } => user_id,
        }
    }

    fn from_stored(stored: StoredShift) -> Self {
        match stored.clock_in_at {
            StoredTime::Valid(clock_in_at) => OpenSlot::Open(ShiftRecord {
                user_id: stored.user_id,
                clock_in_at,
                origin_context: stored.origin_context,
                display_name: stored.display_name,
            }),
            StoredTime::Corrupt(raw) => {
                warn!(user_id = %stored.user_id, raw = %raw, "Open shift has unparseable clock-in time");
                OpenSlot::Corrupt {
                    user_id: stored.user_id,
                    raw,
                }
            }
        }
    }
}

/// Authoritative attendance state: open shifts, last clock-outs and the
/// exclusion list.
///
/// Every mutation is written to the backing [`Store`] first and applied to
/// memory only once that write succeeded, so a failed write leaves both
/// sides unchanged.
pub struct ClockStore {
    backend: Arc<dyn Store>,
    /// Insertion order
    open: Vec<OpenSlot>,
    last_clock_out: HashMap<UserId, StoredTime>,
    excluded: ExclusionList,
}

impl ClockStore {
    /// Build the in-memory view from persisted state
    pub fn load(backend: Arc<dyn Store>) -> CoreResult<Self> {
        let mut store = Self {
            backend,
            open: Vec::new(),
            last_clock_out: HashMap::new(),
            excluded: ExclusionList::new(),
        };
        store.reload()?;
        Ok(store)
    }

    /// Re-read all state from the backend. On error the current view is kept.
    pub fn reload(&mut self) -> CoreResult<()> {
        let open: Vec<OpenSlot> = self
            .backend
            .load_shifts()?
            .into_iter()
            .map(OpenSlot::from_stored)
            .collect();
        let last_clock_out: HashMap<_, _> =
            self.backend.load_last_clock_outs()?.into_iter().collect();
        let excluded: ExclusionList = self.backend.load_excluded()?.into_iter().collect();

        info!(
            open_shifts = open.len(),
            last_clock_outs = last_clock_out.len(),
            excluded = excluded.len(),
            "Attendance state loaded"
        );

        self.open = open;
        self.last_clock_out = last_clock_out;
        self.excluded = excluded;
        Ok(())
    }

    fn slot_index(&self, user_id: &UserId) -> Option<usize> {
        self.open.iter().position(|slot| slot.user_id() == user_id)
    }

    /// Whether the user has an open shift, readable or not
    pub fn has_open_shift(&self, user_id: &UserId) -> bool {
        self.slot_index(user_id).is_some()
    }

    /// The user's open shift, or `CorruptRecord` if it cannot be read
    pub fn shift_for(&self, user_id: &UserId) -> CoreResult<Option<&ShiftRecord>> {
        match self.open.iter().find(|slot| slot.user_id() == user_id) {
            None => Ok(None),
            Some(OpenSlot::Open(shift)) => Ok(Some(shift)),
            Some(OpenSlot::Corrupt { raw, .. }) => Err(CoreError::CorruptRecord {
                user_id: user_id.clone(),
                field: "clock_in_at",
                value: raw.clone(),
            }),
        }
    }

    /// The user's last clock-out, or `CorruptRecord` if it cannot be read
    pub fn last_clock_out(&self, user_id: &UserId) -> CoreResult<Option<DateTime<Local>>> {
        match self.last_clock_out.get(user_id) {
            None => Ok(None),
            Some(StoredTime::Valid(at)) => Ok(Some(*at)),
            Some(StoredTime::Corrupt(raw)) => Err(CoreError::CorruptRecord {
                user_id: user_id.clone(),
                field: "last_clock_out",
                value: raw.clone(),
            }),
        }
    }

    pub fn is_excluded(&self, user_id: &UserId) -> bool {
        self.excluded.contains(user_id)
    }

    /// Open a shift for `user_id` starting at `now`.
    ///
    /// Does not consult the exclusion list or cooldown; callers check
    /// eligibility first.
    pub fn open_shift(
        &mut self,
        user_id: &UserId,
        now: DateTime<Local>,
        origin_context: Option<OriginContext>,
        display_name: Option<String>,
    ) -> CoreResult<ShiftRecord> {
        if self.has_open_shift(user_id) {
            return Err(CoreError::AlreadyOpen {
                user_id: user_id.clone(),
            });
        }

        let new_shift = NewShift {
            user_id: user_id.clone(),
            clock_in_at: now,
            origin_context,
            display_name,
        };

        if !self.backend.insert_shift(&new_shift)? {
            // Persisted state has a shift memory doesn't know about
            warn!(user_id = %user_id, "Open shift found in storage but not in memory");
            return Err(CoreError::AlreadyOpen {
                user_id: user_id.clone(),
            });
        }

        let shift = ShiftRecord {
            user_id: new_shift.user_id,
            clock_in_at: new_shift.clock_in_at,
            origin_context: new_shift.origin_context,
            display_name: new_shift.display_name,
        };
        self.open.push(OpenSlot::Open(shift.clone()));

        debug!(user_id = %user_id, "Shift opened");
        Ok(shift)
    }

    /// Close the user's open shift (if any) and record `now` as their last
    /// clock-out. The last clock-out never moves backwards: if a later one is
    /// already recorded it is kept.
    ///
    /// Idempotent: with nothing open the last clock-out is still updated and
    /// `None` is returned. A corrupt open shift is removed and also reported
    /// as `None`.
    pub fn close_shift(
        &mut self,
        user_id: &UserId,
        now: DateTime<Local>,
    ) -> CoreResult<Option<ShiftRecord>> {
        let recorded = match self.last_clock_out.get(user_id) {
            Some(StoredTime::Valid(previous)) if *previous > now => {
                debug!(user_id = %user_id, at = %now, kept = %previous, "Clock-out older than the recorded one");
                *previous
            }
            _ => now,
        };

        self.backend.close_shift(user_id, recorded)?;

        self.last_clock_out
            .insert(user_id.clone(), StoredTime::Valid(recorded));

        let closed = match self.slot_index(user_id) {
            Some(index) => match self.open.remove(index) {
                OpenSlot::Open(shift) => Some(shift),
                OpenSlot::Corrupt { raw, .. } => {
                    warn!(user_id = %user_id, raw = %raw, "Closed shift with corrupt clock-in time");
                    None
                }
            },
            None => None,
        };

        debug!(user_id = %user_id, was_open = closed.is_some(), "Shift closed");
        Ok(closed)
    }

    /// Open shifts in insertion order, optionally limited to one scope.
    /// Unreadable shifts are left out.
    pub fn list_open(&self, scope: Option<&OriginContext>) -> Vec<ShiftRecord> {
        self.open
            .iter()
            .filter_map(|slot| match slot {
                OpenSlot::Open(shift) => Some(shift),
                OpenSlot::Corrupt { .. } => None,
            })
            .filter(|shift| scope.is_none() || shift.origin_context.as_ref() == scope)
            .cloned()
            .collect()
    }

    /// Users with an open shift, in insertion order, including unreadable ones
    pub fn open_users(&self) -> Vec<UserId> {
        self.open.iter().map(|slot| slot.user_id().clone()).collect()
    }

    pub fn open_count(&self) -> usize {
        self.open.len()
    }

    /// Add the user to the exclusion list, discarding any open shift without
    /// touching their last clock-out. Returns the discarded shift if it was
    /// readable.
    pub fn exclude(&mut self, user_id: &UserId) -> CoreResult<Option<ShiftRecord>> {
        self.backend.exclude_user(user_id)?;

        self.excluded.insert(user_id.clone());
        let discarded = self
            .slot_index(user_id)
            .map(|index| self.open.remove(index))
            .and_then(|slot| match slot {
                OpenSlot::Open(shift) => Some(shift),
                OpenSlot::Corrupt { .. } => None,
            });

        Ok(discarded)
    }

    /// Remove the user from the exclusion list. Returns whether they were on it.
    pub fn include(&mut self, user_id: &UserId) -> CoreResult<bool> {
        self.backend.include_user(user_id)?;
        Ok(self.excluded.remove(user_id))
    }

    /// Excluded users in id order
    pub fn list_excluded(&self) -> Vec<UserId> {
        self.excluded.to_vec()
    }
}
