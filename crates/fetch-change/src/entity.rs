//! The tracked aggregate-root contract.

use serde::de::DeserializeOwned;
use serde::Serialize;

use fetch_types::{KeyPart, Keys};

use crate::change_set::ChangeSet;
use crate::error::ChangeResult;
use crate::shape::Shape;
use crate::tracker::{self, Trackable};

/// A tracked aggregate root that a repository can persist.
///
/// Implementors are plain structs with statically declared fields plus a
/// `#[serde(skip)]` [`ChangeTracker`](crate::ChangeTracker). Every setter
/// writes the field and appends to the tracker, so all mutations are
/// captured. Because the tracker is never serialized, an entity loaded by an
/// adapter always starts with an empty log.
///
/// ```rust
/// use fetch_change::{ChangeResult, ChangeTracker, ChangeError, Entity, Keys, Shape, Trackable};
/// use serde::{Deserialize, Serialize};
///
/// #[derive(Clone, Debug, Default, Serialize, Deserialize)]
/// struct Account {
///     id: Option<i64>,
///     balance: i64,
///     #[serde(skip)]
///     tracker: ChangeTracker,
/// }
///
/// impl Account {
///     fn set_balance(&mut self, balance: i64) {
///         self.tracker.set("balance", &balance);
///         self.balance = balance;
///     }
/// }
///
/// impl Trackable for Account {
///     fn tracker(&self) -> &ChangeTracker { &self.tracker }
///     fn tracker_mut(&mut self) -> &mut ChangeTracker { &mut self.tracker }
/// }
///
/// impl Entity for Account {
///     fn entity_name() -> &'static str { "accounts" }
///     fn shape() -> Shape { Shape::object([("id", Shape::Scalar), ("balance", Shape::Scalar)]) }
///     fn keys(&self) -> ChangeResult<Keys> {
///         self.id.map(Keys::from).ok_or_else(|| ChangeError::invalid_state("id is not set"))
///     }
///     fn assign_keys(&mut self, keys: &Keys) -> ChangeResult<()> {
///         self.id = keys.first().and_then(|k| k.as_int());
///         Ok(())
///     }
/// }
///
/// let mut account = Account::default();
/// account.set_balance(10);
/// let changes = account.extract_changes().unwrap();
/// assert_eq!(changes.len(), 1);
/// ```
pub trait Entity: Trackable + Serialize + DeserializeOwned + Clone + Send + Sync + 'static {
    /// Name of the set this entity type is stored in.
    fn entity_name() -> &'static str;

    /// Static shape of the entity, for path validation.
    fn shape() -> Shape;

    /// The identity of this entity.
    ///
    /// Must be stable and order-significant. Fails with
    /// [`ChangeError::InvalidState`](crate::ChangeError::InvalidState) when
    /// required key fields are not set yet.
    fn keys(&self) -> ChangeResult<Keys>;

    /// Write generated keys back into the entity. Called by adapters that
    /// assign identities on insert.
    fn assign_keys(&mut self, keys: &Keys) -> ChangeResult<()>;

    /// Write a store-generated key part back into the entity.
    ///
    /// The default treats `part` as the whole identity. Entities whose keys
    /// carry more than one part override this to fill the generated member
    /// only.
    fn assign_generated_key(&mut self, part: KeyPart) -> ChangeResult<()> {
        self.assign_keys(&Keys::single(part))
    }

    /// Opaque encoding of [`Self::keys`], for continuation tokens.
    fn encode_keys(&self) -> ChangeResult<String> {
        Ok(self.keys()?.encode())
    }

    /// Decode a string produced by [`Self::encode_keys`].
    fn decode_keys(encoded: &str) -> ChangeResult<Keys> {
        Ok(Keys::decode(encoded)?)
    }

    /// Snapshot of all pending mutations, in mutation order. Does not clear
    /// the log.
    fn extract_changes(&self) -> ChangeResult<ChangeSet> {
        tracker::collect_changes(self)
    }

    /// Clear all pending mutations after they have been persisted.
    fn accept_changes(&mut self) {
        tracker::accept_changes(self)
    }

    /// Returns `true` if any tracked node has pending mutations.
    fn is_dirty(&self) -> bool {
        fn dirty(node: &dyn Trackable) -> bool {
            node.tracker().is_dirty()
                || node.tracked_members().into_iter().any(|(_, m)| dirty(m))
        }
        dirty(self)
    }
}
