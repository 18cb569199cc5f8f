//! Operand watches that re-trigger the singleton reconcile.
//!
//! Operands report through their `status`; spec or metadata churn on them
//! is noise for the aggregate, so updates only pass when `status` moved.

use std::collections::{HashMap, HashSet};

use futures_util::{Stream, TryStreamExt, future};
use kube::runtime::reflector::ObjectRef;
use kube::runtime::watcher::{self, Event};
use kube::runtime::{WatchStreamExt, watcher::watcher};
use kube::{Api, Client, ResourceExt};
use serde::Serialize;
use serde_json::Value as JsonValue;
use tracing::trace;

use super::operand::Operand;
use crate::crd::SINGLETON_NAME;
use crate::crd::zero_trust_workload_identity_manager::{
    ZeroTrustWorkloadIdentityManager,
};

/// Deep comparison of two `status` objects. Anything that cannot be compared
/// counts as changed.
pub fn status_changed(
    old: Option<&JsonValue>,
    new: Option<&JsonValue>,
) -> bool {
    match (old, new) {
        (Some(old), Some(new)) => old != new,
        _ => true,
    }
}

pub fn status_of<K: Serialize>(obj: &K) -> Option<JsonValue> {
    let mut value = serde_json::to_value(obj).ok()?;
    match value.get_mut("status").map(JsonValue::take) {
        None | Some(JsonValue::Null) => None,
        Some(status) => Some(status),
    }
}

/// Remembers the last seen status per object name for one operand kind.
#[derive(Debug, Default)]
pub struct StatusChangeFilter {
    last: HashMap<String, JsonValue>,
    /// Names listed since the last `Init`, while a relist is in flight.
    relisting: Option<HashSet<String>>,
}

impl StatusChangeFilter {
    /// Returns the object when the event should trigger a reconcile.
    pub fn admit<K>(&mut self, event: Event<K>) -> Option<K>
    where
        K: ResourceExt + Serialize,
    {
        match event {
            Event::Apply(obj) | Event::InitApply(obj) => {
                let name = obj.name_any();
                if let Some(seen) = self.relisting.as_mut() {
                    seen.insert(name.clone());
                }
                let new = status_of(&obj);
                let changed =
                    status_changed(self.last.get(&name), new.as_ref());
                match new {
                    Some(status) => self.last.insert(name.clone(), status),
                    None => self.last.remove(&name),
                };
                if !changed {
                    trace!(%name, "operand status unchanged; not triggering");
                }
                changed.then_some(obj)
            }
            Event::Delete(obj) => {
                self.last.remove(&obj.name_any());
                Some(obj)
            }
            Event::Init => {
                self.relisting = Some(HashSet::new());
                None
            }
            Event::InitDone => {
                // Objects deleted while the watch was down never get a Delete.
                if let Some(seen) = self.relisting.take() {
                    self.last.retain(|name, _| seen.contains(name));
                }
                None
            }
        }
    }
}

/// Watch every `K` and yield the objects whose change should reconcile the
/// top-level resource.
pub fn operand_trigger_stream<K: Operand>(
    client: Client,
) -> impl Stream<Item = Result<K, watcher::Error>> + Send + 'static {
    let mut filter = StatusChangeFilter::default();
    watcher(Api::<K>::all(client), watcher::Config::default())
        .default_backoff()
        .try_filter_map(move |event| future::ready(Ok(filter.admit(event))))
}

/// Every operand event maps to the singleton.
pub fn to_singleton<K>(
    _: K,
) -> Option<ObjectRef<ZeroTrustWorkloadIdentityManager>> {
    Some(ObjectRef::new(SINGLETON_NAME))
}
