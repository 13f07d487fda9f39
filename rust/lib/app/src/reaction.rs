//! Optimistic reaction toggling.
//!
//! A tap flips the displayed like state at once and a create/delete request
//! follows. Per post there is at most one request in flight; taps made while
//! it is pending only move the displayed intent, and once the request
//! settles the latest intent is sent if it differs from what the server now
//! holds. A failed request rolls the post back to its last confirmed state.
//!
//! [`ReactionToggle`] is the pure state machine; [`ReactionSync`] drives it
//! against a [`ReactionApi`] for every post on a screen.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use rede_client::{Post, REACTION_LIKE};
use serde::Serialize;
use tracing::{debug, warn};

use crate::backend::ReactionApi;
use crate::error::AppError;

/// Like flag plus counter, as shown to the user.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ReactionSnapshot {
    pub reacted: bool,
    pub count: u32,
}

impl ReactionSnapshot {
    pub fn new(reacted: bool, count: u32) -> Self {
        Self { reacted, count }
    }

    pub fn of(post: &Post) -> Self {
        Self::new(post.liked(), post.reactions_count)
    }

    /// Write this snapshot onto a post.
    pub fn apply_to(&self, post: &mut Post) {
        post.reactions_count = self.count;
        post.user_reaction = self.reacted.then(|| REACTION_LIKE.to_string());
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReactionPhase {
    Unreacted,
    Reacted,
    /// A request is in flight; the user currently wants the post liked.
    PendingReacted,
    /// A request is in flight; the user currently wants the post unliked.
    PendingUnreacted,
}

/// Request needed to move the server to a new state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReactionCall {
    Create,
    Delete,
}

/// One reversible reaction change.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReactionChange {
    pub before: ReactionSnapshot,
    pub after: ReactionSnapshot,
}

impl ReactionChange {
    /// The change that flips `from`. The counter moves by one and never
    /// goes below zero.
    pub fn flip(from: ReactionSnapshot) -> Self {
        let after = if from.reacted {
            ReactionSnapshot::new(false, from.count.saturating_sub(1))
        } else {
            ReactionSnapshot::new(true, from.count.saturating_add(1))
        };
        Self { before: from, after }
    }

    pub fn apply(&self) -> ReactionSnapshot {
        self.after
    }

    pub fn undo(&self) -> ReactionSnapshot {
        self.before
    }

    pub fn call(&self) -> ReactionCall {
        if self.after.reacted {
            ReactionCall::Create
        } else {
            ReactionCall::Delete
        }
    }
}

/// What the driver must do after a request settles.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Settlement {
    /// Server and display agree; nothing left to send.
    Settled(ReactionSnapshot),
    /// The user changed their mind while the request was in flight.
    Next(ReactionCall),
    /// The request failed; display reverted to this confirmed state.
    RolledBack(ReactionSnapshot),
    /// Nothing was in flight.
    Idle,
}

/// Per-post reaction state machine.
///
/// `confirmed` is what the server last acknowledged, `intent` is what the
/// user last asked for. The displayed state is derived from both.
#[derive(Debug, Clone)]
pub struct ReactionToggle {
    confirmed: ReactionSnapshot,
    intent: bool,
    in_flight: Option<ReactionChange>,
}

impl ReactionToggle {
    pub fn new(initial: ReactionSnapshot) -> Self {
        Self {
            confirmed: initial,
            intent: initial.reacted,
            in_flight: None,
        }
    }

    pub fn displayed(&self) -> ReactionSnapshot {
        if self.intent == self.confirmed.reacted {
            self.confirmed
        } else {
            ReactionChange::flip(self.confirmed).apply()
        }
    }

    pub fn confirmed(&self) -> ReactionSnapshot {
        self.confirmed
    }

    pub fn is_pending(&self) -> bool {
        self.in_flight.is_some()
    }

    pub fn phase(&self) -> ReactionPhase {
        match (self.in_flight.is_some(), self.intent) {
            (false, true) => ReactionPhase::Reacted,
            (false, false) => ReactionPhase::Unreacted,
            (true, true) => ReactionPhase::PendingReacted,
            (true, false) => ReactionPhase::PendingUnreacted,
        }
    }

    /// Register a tap. Returns the request to send, or `None` when one is
    /// already in flight (the new intent is picked up when it settles).
    pub fn toggle(&mut self) -> Option<ReactionCall> {
        self.intent = !self.intent;
        if self.in_flight.is_some() {
            return None;
        }
        self.dispatch()
    }

    /// Record the outcome of the in-flight request.
    pub fn settle(&mut self, succeeded: bool) -> Settlement {
        let Some(change) = self.in_flight.take() else {
            return Settlement::Idle;
        };
        if succeeded {
            self.confirmed = change.apply();
            match self.dispatch() {
                Some(call) => Settlement::Next(call),
                None => Settlement::Settled(self.displayed()),
            }
        } else {
            self.confirmed = change.undo();
            self.intent = self.confirmed.reacted;
            Settlement::RolledBack(self.confirmed)
        }
    }

    /// Replace the confirmed state with fresh server data. Ignored while a
    /// request is in flight. Returns whether the state was replaced.
    pub fn reseed(&mut self, fresh: ReactionSnapshot) -> bool {
        if self.is_pending() {
            return false;
        }
        *self = Self::new(fresh);
        true
    }

    fn dispatch(&mut self) -> Option<ReactionCall> {
        if self.intent == self.confirmed.reacted {
            return None;
        }
        let change = ReactionChange::flip(self.confirmed);
        self.in_flight = Some(change);
        Some(change.call())
    }
}

/// Rolls a post back to its confirmed state if the toggle driving its
/// request is dropped before the request returns.
struct PendingCall<'a> {
    entries: &'a Mutex<HashMap<u64, ReactionToggle>>,
    post_id: u64,
    armed: bool,
}

impl<'a> PendingCall<'a> {
    fn new(entries: &'a Mutex<HashMap<u64, ReactionToggle>>, post_id: u64) -> Self {
        Self {
            entries,
            post_id,
            armed: true,
        }
    }

    fn disarm(mut self) {
        self.armed = false;
    }
}

impl Drop for PendingCall<'_> {
    fn drop(&mut self) {
        if !self.armed {
            return;
        }
        let mut entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(entry) = entries.get_mut(&self.post_id) {
            if let Settlement::RolledBack(s) = entry.settle(false) {
                warn!(post_id = self.post_id, reacted = s.reacted, "reaction abandoned, rolled back");
            }
        }
    }
}

/// Reaction state for every post on a screen, driven against the backend.
pub struct ReactionSync<A: ReactionApi> {
    api: Arc<A>,
    entries: Mutex<HashMap<u64, ReactionToggle>>,
}

impl<A: ReactionApi> ReactionSync<A> {
    pub fn new(api: Arc<A>) -> Self {
        Self {
            api,
            entries: Mutex::new(HashMap::new()),
        }
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<u64, ReactionToggle>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Track a post, or refresh its state from server data unless a
    /// request for it is in flight.
    pub fn seed(&self, post_id: u64, snapshot: ReactionSnapshot) {
        let mut entries = self.lock();
        match entries.get_mut(&post_id) {
            Some(entry) => {
                if !entry.reseed(snapshot) {
                    debug!(post_id, "reaction pending, keeping local state");
                }
            }
            None => {
                entries.insert(post_id, ReactionToggle::new(snapshot));
            }
        }
    }

    pub fn seed_posts<'a>(&self, posts: impl IntoIterator<Item = &'a Post>) {
        for post in posts {
            self.seed(post.id, ReactionSnapshot::of(post));
        }
    }

    pub fn displayed(&self, post_id: u64) -> Option<ReactionSnapshot> {
        self.lock().get(&post_id).map(ReactionToggle::displayed)
    }

    pub fn phase(&self, post_id: u64) -> Option<ReactionPhase> {
        self.lock().get(&post_id).map(ReactionToggle::phase)
    }

    /// Overwrite a post's reaction fields with what should be displayed.
    pub fn overlay(&self, post: &mut Post) {
        if let Some(snapshot) = self.displayed(post.id) {
            snapshot.apply_to(post);
        }
    }

    pub fn clear(&self) {
        self.lock().clear();
    }

    /// Toggle the like on a post.
    ///
    /// Returns as soon as the displayed state has flipped when another call
    /// already owns the post's request; otherwise sends requests until the
    /// server matches the latest intent. A failed request rolls the post
    /// back and is returned as the error; so does dropping the future while
    /// a request is out.
    pub async fn toggle(&self, post_id: u64) -> Result<ReactionSnapshot, AppError> {
        let mut call = {
            let mut entries = self.lock();
            let entry = entries.get_mut(&post_id).ok_or(AppError::NotLoaded(post_id))?;
            match entry.toggle() {
                Some(call) => call,
                None => return Ok(entry.displayed()),
            }
        };

        loop {
            debug!(post_id, ?call, "sending reaction");
            let pending = PendingCall::new(&self.entries, post_id);
            let outcome = match call {
                ReactionCall::Create => self.api.react(post_id).await,
                ReactionCall::Delete => self.api.unreact(post_id).await,
            };
            pending.disarm();
            let settlement = {
                let mut entries = self.lock();
                match entries.get_mut(&post_id) {
                    Some(entry) => entry.settle(outcome.is_ok()),
                    None => Settlement::Idle,
                }
            };
            match (settlement, outcome) {
                (Settlement::Next(next), _) => call = next,
                (Settlement::RolledBack(_), Err(e)) => {
                    warn!(post_id, "reaction failed, rolled back: {}", e);
                    return Err(AppError::Api(e));
                }
                (Settlement::Settled(s), _) | (Settlement::RolledBack(s), Ok(())) => return Ok(s),
                (Settlement::Idle, _) => return Err(AppError::NotLoaded(post_id)),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rede_client::ApiError;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::time::Duration;
    use tokio::sync::Semaphore;
    use tokio::time::timeout;

    // ========================================================================
    // ReactionToggle
    // ========================================================================

    #[test]
    fn tap_flips_display_and_requests_create() {
        let mut t = ReactionToggle::new(ReactionSnapshot::new(false, 3));
        assert_eq!(t.toggle(), Some(ReactionCall::Create));
        assert_eq!(t.displayed(), ReactionSnapshot::new(true, 4));
        assert_eq!(t.phase(), ReactionPhase::PendingReacted);
        assert_eq!(t.confirmed(), ReactionSnapshot::new(false, 3));
    }

    #[test]
    fn success_settles_into_target() {
        let mut t = ReactionToggle::new(ReactionSnapshot::new(false, 3));
        t.toggle();
        assert_eq!(t.settle(true), Settlement::Settled(ReactionSnapshot::new(true, 4)));
        assert_eq!(t.phase(), ReactionPhase::Reacted);
        assert_eq!(t.confirmed(), ReactionSnapshot::new(true, 4));
    }

    #[test]
    fn failure_reverts_flag_and_count() {
        let mut t = ReactionToggle::new(ReactionSnapshot::new(false, 3));
        t.toggle();
        assert_eq!(t.displayed().count, 4);
        assert_eq!(t.settle(false), Settlement::RolledBack(ReactionSnapshot::new(false, 3)));
        assert_eq!(t.displayed(), ReactionSnapshot::new(false, 3));
        assert_eq!(t.phase(), ReactionPhase::Unreacted);
    }

    #[test]
    fn unlike_at_zero_does_not_go_negative() {
        let mut t = ReactionToggle::new(ReactionSnapshot::new(true, 0));
        assert_eq!(t.toggle(), Some(ReactionCall::Delete));
        assert_eq!(t.displayed(), ReactionSnapshot::new(false, 0));
        t.settle(true);
        assert_eq!(t.confirmed(), ReactionSnapshot::new(false, 0));
    }

    #[test]
    fn taps_while_pending_send_no_request() {
        let mut t = ReactionToggle::new(ReactionSnapshot::new(false, 3));
        assert!(t.toggle().is_some());
        assert_eq!(t.toggle(), None);
        assert_eq!(t.phase(), ReactionPhase::PendingUnreacted);
        assert_eq!(t.displayed(), ReactionSnapshot::new(false, 3));
        assert_eq!(t.toggle(), None);
        assert_eq!(t.displayed(), ReactionSnapshot::new(true, 4));
    }

    #[test]
    fn changed_mind_while_pending_sends_follow_up() {
        let mut t = ReactionToggle::new(ReactionSnapshot::new(false, 3));
        t.toggle();
        t.toggle();
        // Server now holds "liked"; the user wants "unliked".
        assert_eq!(t.settle(true), Settlement::Next(ReactionCall::Delete));
        assert_eq!(t.phase(), ReactionPhase::PendingUnreacted);
        assert_eq!(t.settle(true), Settlement::Settled(ReactionSnapshot::new(false, 3)));
    }

    #[test]
    fn failure_discards_queued_intent() {
        let mut t = ReactionToggle::new(ReactionSnapshot::new(true, 5));
        t.toggle();
        t.toggle();
        t.toggle();
        assert_eq!(t.settle(false), Settlement::RolledBack(ReactionSnapshot::new(true, 5)));
        assert!(!t.is_pending());
        assert_eq!(t.displayed(), ReactionSnapshot::new(true, 5));
    }

    #[test]
    fn latest_wins_for_every_tap_sequence() {
        for initial in [false, true] {
            for taps in 1..=7usize {
                let start = ReactionSnapshot::new(initial, 10);
                let mut t = ReactionToggle::new(start);
                let mut pending = t.toggle();
                assert!(pending.is_some());
                for _ in 1..taps {
                    assert_eq!(t.toggle(), None);
                }
                let wanted = initial ^ (taps % 2 == 1);

                let mut confirmed = t.confirmed();
                let mut requests = 0;
                while pending.is_some() {
                    requests += 1;
                    match t.settle(true) {
                        Settlement::Next(call) => pending = Some(call),
                        Settlement::Settled(_) => pending = None,
                        other => panic!("unexpected {:?}", other),
                    }
                    let now = t.confirmed();
                    assert_eq!(now.count.abs_diff(confirmed.count), 1);
                    assert_ne!(now.reacted, confirmed.reacted);
                    confirmed = now;
                }

                assert!(requests <= 2);
                assert_eq!(t.displayed().reacted, wanted, "initial={} taps={}", initial, taps);
                let expected_count = if wanted == initial { 10 } else if wanted { 11 } else { 9 };
                assert_eq!(t.displayed().count, expected_count);
            }
        }
    }

    #[test]
    fn reseed_is_ignored_while_pending() {
        let mut t = ReactionToggle::new(ReactionSnapshot::new(false, 1));
        t.toggle();
        assert!(!t.reseed(ReactionSnapshot::new(false, 9)));
        assert_eq!(t.displayed(), ReactionSnapshot::new(true, 2));
        t.settle(true);
        assert!(t.reseed(ReactionSnapshot::new(false, 9)));
        assert_eq!(t.displayed(), ReactionSnapshot::new(false, 9));
    }

    #[test]
    fn change_is_reversible() {
        let change = ReactionChange::flip(ReactionSnapshot::new(false, 2));
        assert_eq!(change.apply(), ReactionSnapshot::new(true, 3));
        assert_eq!(change.undo(), ReactionSnapshot::new(false, 2));
        assert_eq!(change.call(), ReactionCall::Create);
    }

    // ========================================================================
    // ReactionSync
    // ========================================================================

    /// Each request blocks until the test hands out a permit.
    struct GatedApi {
        calls: Mutex<Vec<ReactionCall>>,
        gate: Semaphore,
        fail: AtomicBool,
    }

    impl GatedApi {
        fn new(permits: usize) -> Arc<Self> {
            Arc::new(Self {
                calls: Mutex::new(Vec::new()),
                gate: Semaphore::new(permits),
                fail: AtomicBool::new(false),
            })
        }

        fn calls(&self) -> Vec<ReactionCall> {
            self.calls.lock().unwrap().clone()
        }

        async fn finish(&self, call: ReactionCall) -> Result<(), ApiError> {
            self.calls.lock().unwrap().push(call);
            self.gate.acquire().await.unwrap().forget();
            if self.fail.load(Ordering::SeqCst) {
                Err(ApiError::Status {
                    status: 500,
                    body: "boom".into(),
                })
            } else {
                Ok(())
            }
        }
    }

    #[async_trait::async_trait]
    impl ReactionApi for GatedApi {
        async fn react(&self, _post_id: u64) -> Result<(), ApiError> {
            self.finish(ReactionCall::Create).await
        }

        async fn unreact(&self, _post_id: u64) -> Result<(), ApiError> {
            self.finish(ReactionCall::Delete).await
        }
    }

    async fn wait_for_calls(api: &GatedApi, n: usize) {
        while api.calls().len() < n {
            tokio::task::yield_now().await;
        }
    }

    #[tokio::test]
    async fn toggle_unknown_post_is_an_error() {
        let sync = ReactionSync::new(GatedApi::new(1));
        assert!(matches!(sync.toggle(1).await, Err(AppError::NotLoaded(1))));
    }

    #[tokio::test]
    async fn toggle_settles_after_success() {
        let api = GatedApi::new(10);
        let sync = ReactionSync::new(api.clone());
        sync.seed(1, ReactionSnapshot::new(false, 3));

        let shown = sync.toggle(1).await.unwrap();
        assert_eq!(shown, ReactionSnapshot::new(true, 4));
        assert_eq!(sync.phase(1), Some(ReactionPhase::Reacted));
        assert_eq!(api.calls(), vec![ReactionCall::Create]);
    }

    #[tokio::test]
    async fn failed_toggle_rolls_back_and_reports() {
        let api = GatedApi::new(10);
        api.fail.store(true, Ordering::SeqCst);
        let sync = ReactionSync::new(api.clone());
        sync.seed(1, ReactionSnapshot::new(false, 3));

        let err = sync.toggle(1).await.unwrap_err();
        assert!(matches!(err, AppError::Api(ApiError::Status { status: 500, .. })));
        assert_eq!(sync.displayed(1), Some(ReactionSnapshot::new(false, 3)));
    }

    #[tokio::test]
    async fn taps_during_flight_resolve_latest_wins() {
        let api = GatedApi::new(0);
        let sync = Arc::new(ReactionSync::new(api.clone()));
        sync.seed(1, ReactionSnapshot::new(false, 3));

        let driver = tokio::spawn({
            let sync = sync.clone();
            async move { sync.toggle(1).await }
        });
        wait_for_calls(&api, 1).await;
        assert_eq!(sync.displayed(1), Some(ReactionSnapshot::new(true, 4)));

        // Three more taps while the create is in flight.
        assert_eq!(sync.toggle(1).await.unwrap(), ReactionSnapshot::new(false, 3));
        assert_eq!(sync.toggle(1).await.unwrap(), ReactionSnapshot::new(true, 4));
        assert_eq!(sync.toggle(1).await.unwrap(), ReactionSnapshot::new(false, 3));
        assert_eq!(api.calls().len(), 1);

        api.gate.add_permits(10);
        let settled = driver.await.unwrap().unwrap();

        assert_eq!(settled, ReactionSnapshot::new(false, 3));
        assert_eq!(sync.phase(1), Some(ReactionPhase::Unreacted));
        assert_eq!(api.calls(), vec![ReactionCall::Create, ReactionCall::Delete]);
    }

    #[tokio::test]
    async fn abandoned_toggle_rolls_back_and_unblocks_the_post() {
        let api = GatedApi::new(0);
        let sync = ReactionSync::new(api.clone());
        sync.seed(1, ReactionSnapshot::new(false, 3));

        assert!(timeout(Duration::from_millis(50), sync.toggle(1)).await.is_err());
        assert_eq!(sync.phase(1), Some(ReactionPhase::Unreacted));
        assert_eq!(sync.displayed(1), Some(ReactionSnapshot::new(false, 3)));

        api.gate.add_permits(1);
        assert_eq!(sync.toggle(1).await.unwrap(), ReactionSnapshot::new(true, 4));
        assert_eq!(api.calls(), vec![ReactionCall::Create, ReactionCall::Create]);
    }

    #[tokio::test]
    async fn seed_does_not_clobber_pending_post() {
        let api = GatedApi::new(0);
        let sync = Arc::new(ReactionSync::new(api.clone()));
        sync.seed(1, ReactionSnapshot::new(false, 3));

        let driver = tokio::spawn({
            let sync = sync.clone();
            async move { sync.toggle(1).await }
        });
        wait_for_calls(&api, 1).await;

        sync.seed(1, ReactionSnapshot::new(false, 3));
        assert_eq!(sync.displayed(1), Some(ReactionSnapshot::new(true, 4)));

        api.gate.add_permits(1);
        driver.await.unwrap().unwrap();
        assert_eq!(sync.displayed(1), Some(ReactionSnapshot::new(true, 4)));
    }

    #[test]
    fn overlay_writes_post_fields() {
        let sync = ReactionSync::new(GatedApi::new(0));
        let mut post: Post = serde_json::from_str(
            r#"{"id":4,"created_at":"2024-01-01T00:00:00","reactions_count":1}"#,
        )
        .unwrap();
        sync.seed(4, ReactionSnapshot::new(true, 2));
        sync.overlay(&mut post);
        assert_eq!(post.reactions_count, 2);
        assert!(post.liked());
    }
}
