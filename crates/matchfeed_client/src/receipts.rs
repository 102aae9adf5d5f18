//! Receipt tracking.
//!
//! Every control frame that asks for a receipt registers the action it will
//! confirm. When the server's `RECEIPT` arrives the action is resolved and
//! anyone waiting on that id is woken.

use std::collections::{BTreeMap, HashMap};
use std::fmt;
use tokio::sync::oneshot;

/// The action a pending receipt confirms.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReceiptAction {
    /// A subscription to the named channel.
    Joined(String),
    /// An unsubscription from the named channel.
    Exited(String),
    /// The end of the session.
    Logout,
}

impl fmt::Display for ReceiptAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReceiptAction::Joined(channel) => write!(f, "Joined channel {channel}"),
            ReceiptAction::Exited(channel) => write!(f, "Exited channel {channel}"),
            ReceiptAction::Logout => f.write_str("Logged out"),
        }
    }
}

/// Outstanding receipts of a session.
#[derive(Debug, Default)]
pub struct ReceiptTracker {
    next_id: u64,
    pending: BTreeMap<u64, ReceiptAction>,
    waiters: HashMap<u64, oneshot::Sender<ReceiptAction>>,
}

impl ReceiptTracker {
    /// Creates an empty tracker.
    pub fn new() -> Self {
        Self::default()
    }

    /// Allocates a receipt id for `action`.
    pub fn expect(&mut self, action: ReceiptAction) -> u64 {
        let id = self.next_id;
        self.next_id += 1;
        self.pending.insert(id, action);
        id
    }

    /// Returns a receiver completed when `id` resolves.
    ///
    /// The receiver errors out if the tracker is cleared first, or
    /// immediately if `id` is not pending.
    pub fn watch(&mut self, id: u64) -> oneshot::Receiver<ReceiptAction> {
        let (tx, rx) = oneshot::channel();
        if self.pending.contains_key(&id) {
            self.waiters.insert(id, tx);
        }
        rx
    }

    /// Resolves a receipt, returning its action if it was pending.
    pub fn resolve(&mut self, id: u64) -> Option<ReceiptAction> {
        let action = self.pending.remove(&id)?;
        if let Some(waiter) = self.waiters.remove(&id) {
            // The waiter may have timed out already.
            let _ = waiter.send(action.clone());
        }
        Some(action)
    }

    /// Returns true if some outstanding receipt confirms `action`.
    pub fn awaits(&self, action: &ReceiptAction) -> bool {
        self.pending.values().any(|pending| pending == action)
    }

    /// Number of outstanding receipts.
    pub fn len(&self) -> usize {
        self.pending.len()
    }

    /// Returns true if nothing is outstanding.
    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    /// Forgets every pending receipt and drops all waiters.
    pub fn clear(&mut self) {
        self.pending.clear();
        self.waiters.clear();
        self.next_id = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn expect_and_resolve() {
        let mut receipts = ReceiptTracker::new();
        let join = receipts.expect(ReceiptAction::Joined("Germany_Japan".into()));
        let exit = receipts.expect(ReceiptAction::Exited("Germany_Japan".into()));

        assert_eq!((join, exit), (0, 1));
        assert_eq!(receipts.len(), 2);

        let action = receipts.resolve(join).unwrap();
        assert_eq!(action.to_string(), "Joined channel Germany_Japan");
        assert_eq!(receipts.len(), 1);
    }

    #[test]
    fn unknown_receipt_is_ignored() {
        let mut receipts = ReceiptTracker::new();
        let id = receipts.expect(ReceiptAction::Logout);

        assert!(receipts.awaits(&ReceiptAction::Logout));
        assert!(receipts.resolve(99).is_none());
        assert!(receipts.resolve(id).is_some());
        assert!(receipts.resolve(id).is_none());
    }

    #[test]
    fn watcher_is_woken() {
        let mut receipts = ReceiptTracker::new();
        let id = receipts.expect(ReceiptAction::Logout);
        let mut rx = receipts.watch(id);

        assert!(rx.try_recv().is_err());
        receipts.resolve(id);
        assert_eq!(rx.try_recv().unwrap(), ReceiptAction::Logout);
    }

    #[test]
    fn clear_drops_waiters() {
        let mut receipts = ReceiptTracker::new();
        let id = receipts.expect(ReceiptAction::Logout);
        let mut rx = receipts.watch(id);

        receipts.clear();
        assert!(matches!(
            rx.try_recv(),
            Err(oneshot::error::TryRecvError::Closed)
        ));
        assert!(receipts.is_empty());
    }

    #[test]
    fn watching_unknown_id_closes_immediately() {
        let mut receipts = ReceiptTracker::new();
        let mut rx = receipts.watch(7);
        assert!(matches!(
            rx.try_recv(),
            Err(oneshot::error::TryRecvError::Closed)
        ));
    }

    #[test]
    fn action_labels() {
        assert_eq!(
            ReceiptAction::Exited("Spain_Germany".into()).to_string(),
            "Exited channel Spain_Germany"
        );
        assert_eq!(ReceiptAction::Logout.to_string(), "Logged out");
    }
}
