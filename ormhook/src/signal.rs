//! Synchronous lifecycle signals.

use crate::common::{
    atomic, Atomic, ReadExecutor, Value, WriteExecutor, CREATED, POST_DELETE, POST_SAVE,
    PRE_DELETE, PRE_SAVE,
};
use crate::errors::{ErrorKind, OrmError, OrmResult};
use indexmap::IndexMap;
use std::any::Any;
use std::fmt::{Debug, Display, Formatter};
use std::str::FromStr;
use std::sync::Arc;
use uuid::Uuid;

/// The four lifecycle events every registered model carries a [`Signal`] for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SignalKind {
    PreSave,
    PostSave,
    PreDelete,
    PostDelete,
}

impl SignalKind {
    pub const ALL: [SignalKind; 4] = [
        SignalKind::PreSave,
        SignalKind::PostSave,
        SignalKind::PreDelete,
        SignalKind::PostDelete,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            SignalKind::PreSave => PRE_SAVE,
            SignalKind::PostSave => POST_SAVE,
            SignalKind::PreDelete => PRE_DELETE,
            SignalKind::PostDelete => POST_DELETE,
        }
    }
}

impl Display for SignalKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl FromStr for SignalKind {
    type Err = OrmError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        SignalKind::ALL
            .into_iter()
            .find(|kind| kind.name() == s)
            .ok_or_else(|| {
                log::error!("Unknown signal name {}", s);
                OrmError::new(
                    &format!("Unknown signal name '{}'", s),
                    ErrorKind::InvalidConfiguration,
                )
            })
    }
}

/// Keyword context passed to every receiver alongside the instance.
///
/// Save signals carry `created`; callers sending a signal by hand may attach any
/// positional or keyword values they like.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SignalContext {
    args: Vec<Value>,
    kwargs: IndexMap<String, Value>,
}

impl SignalContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Context for a save signal.
    pub fn saving(created: bool) -> Self {
        SignalContext::new().with_kwarg(CREATED, created)
    }

    pub fn with_arg(mut self, value: impl Into<Value>) -> Self {
        self.args.push(value.into());
        self
    }

    pub fn with_kwarg(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.kwargs.insert(key.to_string(), value.into());
        self
    }

    /// The `created` flag of a save signal; `None` for delete signals.
    pub fn created(&self) -> Option<bool> {
        self.kwargs.get(CREATED).and_then(Value::as_bool)
    }

    pub fn args(&self) -> &[Value] {
        &self.args
    }

    pub fn kwarg(&self, key: &str) -> Option<&Value> {
        self.kwargs.get(key)
    }

    pub fn kwargs(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.kwargs.iter().map(|(k, v)| (k.as_str(), v))
    }
}

/// Signature of a signal receiver.
///
/// Any `Fn(&M, &SignalContext) -> OrmResult<()>` closure that is `Send + Sync`
/// implements it. Returning an error aborts the rest of the delivery.
pub trait ReceiverFn<M>: Send + Sync + Fn(&M, &SignalContext) -> OrmResult<()> {}

impl<M, F> ReceiverFn<M> for F where F: Send + Sync + Fn(&M, &SignalContext) -> OrmResult<()> {}

/// A connected (or connectable) callback.
///
/// Receivers are compared by identity: clones of one receiver are equal, two receivers
/// built from the same closure are not. Keep the value returned by
/// [`Signal::connect`] to disconnect it later.
pub struct Receiver<M> {
    id: Uuid,
    on_signal: Arc<dyn ReceiverFn<M>>,
}

impl<M> Receiver<M> {
    pub fn new(on_signal: impl ReceiverFn<M> + 'static) -> Self {
        Receiver {
            id: Uuid::new_v4(),
            on_signal: Arc::new(on_signal),
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    #[inline]
    fn call(&self, instance: &M, context: &SignalContext) -> OrmResult<()> {
        (self.on_signal)(instance, context)
    }
}

impl<M> Clone for Receiver<M> {
    fn clone(&self) -> Self {
        Receiver {
            id: self.id,
            on_signal: self.on_signal.clone(),
        }
    }
}

impl<M> PartialEq for Receiver<M> {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl<M> Eq for Receiver<M> {}

impl<M> Debug for Receiver<M> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Receiver").field("id", &self.id).finish()
    }
}

/// Ordered list of receivers invoked synchronously for one lifecycle event.
///
/// Registration order is invocation order and nothing is deduplicated: connecting the same
/// receiver twice delivers to it twice. Delivery walks a snapshot of the list, so a
/// receiver may connect or disconnect others (or itself) without affecting the send in
/// progress.
///
/// ```rust
/// use ormhook::signal::{Receiver, Signal, SignalContext};
///
/// let signal: Signal<String> = Signal::new();
/// let receiver = signal.connect(Receiver::new(|name: &String, _ctx: &SignalContext| {
///     assert_eq!(name, "post");
///     Ok(())
/// }));
/// signal.send(&"post".to_string(), &SignalContext::new()).unwrap();
/// signal.disconnect(&receiver).unwrap();
/// ```
pub struct Signal<M> {
    receivers: Atomic<im::Vector<Receiver<M>>>,
}

impl<M> Signal<M> {
    pub fn new() -> Self {
        Signal {
            receivers: atomic(im::Vector::new()),
        }
    }

    /// Appends `receiver` and hands it back unchanged.
    pub fn connect(&self, receiver: Receiver<M>) -> Receiver<M> {
        self.receivers
            .write_with(|receivers| receivers.push_back(receiver.clone()));
        receiver
    }

    /// Wraps `on_signal` in a new [`Receiver`] and connects it.
    pub fn connect_fn(&self, on_signal: impl ReceiverFn<M> + 'static) -> Receiver<M> {
        self.connect(Receiver::new(on_signal))
    }

    /// Removes the first occurrence of `receiver`.
    pub fn disconnect(&self, receiver: &Receiver<M>) -> OrmResult<()> {
        let removed = self.receivers.write_with(|receivers| {
            match receivers.index_of(receiver) {
                Some(index) => {
                    receivers.remove(index);
                    true
                }
                None => false,
            }
        });

        if removed {
            Ok(())
        } else {
            log::error!("Receiver {} is not connected", receiver.id());
            Err(OrmError::new(
                &format!("Unknown receiver: {}", receiver.id()),
                ErrorKind::UnknownReceiver,
            ))
        }
    }

    /// Delivers `instance` and `context` to every receiver in registration order.
    ///
    /// The first receiver error stops delivery and is returned as is.
    pub fn send(&self, instance: &M, context: &SignalContext) -> OrmResult<()> {
        let snapshot = self.receivers.read_with(|receivers| receivers.clone());
        for receiver in snapshot.iter() {
            receiver.call(instance, context)?;
        }
        Ok(())
    }

    pub fn receivers(&self) -> Vec<Receiver<M>> {
        self.receivers
            .read_with(|receivers| receivers.iter().cloned().collect())
    }

    pub fn receiver_count(&self) -> usize {
        self.receivers.read_with(|receivers| receivers.len())
    }

    pub fn has_receivers(&self) -> bool {
        self.receiver_count() > 0
    }
}

impl<M: 'static> Signal<M> {
    /// Connects a type-erased receiver.
    ///
    /// Used where receivers are wired by name rather than by type, e.g.
    /// [`Orm::connect`](crate::orm::Orm::connect). Fails with
    /// [`ErrorKind::InvalidReceiver`] unless `receiver` holds a `Receiver<M>`.
    pub fn connect_any(&self, receiver: Arc<dyn Any + Send + Sync>) -> OrmResult<Receiver<M>> {
        match receiver.downcast_ref::<Receiver<M>>() {
            Some(receiver) => Ok(self.connect(receiver.clone())),
            None => {
                log::error!(
                    "Invalid receiver: expected a receiver for {}",
                    std::any::type_name::<M>()
                );
                Err(OrmError::new(
                    &format!(
                        "Invalid receiver: not invocable with {}",
                        std::any::type_name::<M>()
                    ),
                    ErrorKind::InvalidReceiver,
                ))
            }
        }
    }
}

impl<M> Default for Signal<M> {
    fn default() -> Self {
        Self::new()
    }
}

impl<M> Debug for Signal<M> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Signal")
            .field("receivers", &self.receiver_count())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;

    fn recorder(log: &Arc<Mutex<Vec<String>>>, tag: &str) -> Receiver<String> {
        let log = log.clone();
        let tag = tag.to_string();
        Receiver::new(move |instance: &String, _ctx: &SignalContext| {
            log.lock().push(format!("{}:{}", tag, instance));
            Ok(())
        })
    }

    #[test]
    fn connected_receiver_gets_instance_and_context() {
        let signal: Signal<String> = Signal::new();
        let seen = Arc::new(Mutex::new(None));
        let seen_clone = seen.clone();
        signal.connect_fn(move |instance: &String, ctx: &SignalContext| {
            *seen_clone.lock() = Some((instance.clone(), ctx.created()));
            Ok(())
        });

        signal.send(&"post-1".to_string(), &SignalContext::saving(true)).unwrap();
        assert_eq!(*seen.lock(), Some(("post-1".to_string(), Some(true))));
    }

    #[test]
    fn receivers_run_in_registration_order() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let signal = Signal::new();
        signal.connect(recorder(&log, "first"));
        signal.connect(recorder(&log, "second"));

        signal.send(&"x".to_string(), &SignalContext::new()).unwrap();
        assert_eq!(*log.lock(), vec!["first:x", "second:x"]);
    }

    #[test]
    fn connect_returns_receiver_unchanged() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let signal = Signal::new();
        let receiver = recorder(&log, "r");
        let returned = signal.connect(receiver.clone());
        assert_eq!(returned, receiver);
        assert_eq!(returned.id(), receiver.id());
    }

    #[test]
    fn same_receiver_twice_is_invoked_twice() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let signal = Signal::new();
        let receiver = recorder(&log, "dup");
        signal.connect(receiver.clone());
        signal.connect(receiver.clone());

        signal.send(&"x".to_string(), &SignalContext::new()).unwrap();
        assert_eq!(log.lock().len(), 2);

        signal.disconnect(&receiver).unwrap();
        assert_eq!(signal.receiver_count(), 1);
    }

    #[test]
    fn disconnect_only_affects_future_sends() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let signal = Signal::new();
        let receiver = signal.connect(recorder(&log, "r"));

        signal.send(&"a".to_string(), &SignalContext::new()).unwrap();
        signal.disconnect(&receiver).unwrap();
        signal.send(&"b".to_string(), &SignalContext::new()).unwrap();

        assert_eq!(*log.lock(), vec!["r:a"]);
    }

    #[test]
    fn disconnect_unknown_receiver_fails() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let signal = Signal::new();
        signal.connect(recorder(&log, "a"));

        let err = signal.disconnect(&recorder(&log, "b")).unwrap_err();
        assert_eq!(err.kind(), &ErrorKind::UnknownReceiver);
        assert_eq!(signal.receiver_count(), 1);
    }

    #[test]
    fn receiver_error_stops_delivery() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let signal = Signal::new();
        signal.connect(recorder(&log, "before"));
        signal.connect_fn(|_: &String, _: &SignalContext| {
            Err(OrmError::new("rejected", ErrorKind::Extension("audit".into())))
        });
        signal.connect(recorder(&log, "after"));

        let err = signal.send(&"x".to_string(), &SignalContext::new()).unwrap_err();
        assert_eq!(err.kind(), &ErrorKind::Extension("audit".into()));
        assert_eq!(*log.lock(), vec!["before:x"]);
    }

    #[test]
    fn receiver_may_disconnect_itself_during_send() {
        let signal: Arc<Signal<String>> = Arc::new(Signal::new());
        let slot: Arc<Mutex<Option<Receiver<String>>>> = Arc::new(Mutex::new(None));
        let calls = Arc::new(Mutex::new(0));

        let signal_clone = signal.clone();
        let slot_clone = slot.clone();
        let calls_clone = calls.clone();
        let receiver = signal.connect_fn(move |_: &String, _: &SignalContext| {
            *calls_clone.lock() += 1;
            if let Some(me) = slot_clone.lock().take() {
                signal_clone.disconnect(&me)?;
            }
            Ok(())
        });
        *slot.lock() = Some(receiver);

        signal.send(&"x".to_string(), &SignalContext::new()).unwrap();
        signal.send(&"y".to_string(), &SignalContext::new()).unwrap();
        assert_eq!(*calls.lock(), 1);
        assert!(!signal.has_receivers());
    }

    #[test]
    fn connect_any_accepts_matching_receiver() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let signal = Signal::new();
        let erased: Arc<dyn Any + Send + Sync> = Arc::new(recorder(&log, "dyn"));

        let receiver = signal.connect_any(erased).unwrap();
        signal.send(&"x".to_string(), &SignalContext::new()).unwrap();
        assert_eq!(*log.lock(), vec!["dyn:x"]);
        assert!(signal.receivers().contains(&receiver));
    }

    #[test]
    fn connect_any_rejects_non_receivers() {
        let signal: Signal<String> = Signal::new();
        let not_callable: Arc<dyn Any + Send + Sync> = Arc::new(42u32);
        let err = signal.connect_any(not_callable).unwrap_err();
        assert_eq!(err.kind(), &ErrorKind::InvalidReceiver);

        let wrong_type: Arc<dyn Any + Send + Sync> =
            Arc::new(Receiver::new(|_: &u64, _: &SignalContext| Ok(())));
        assert_eq!(
            signal.connect_any(wrong_type).unwrap_err().kind(),
            &ErrorKind::InvalidReceiver
        );
        assert!(!signal.has_receivers());
    }

    #[test]
    fn context_carries_args_and_kwargs() {
        let ctx = SignalContext::new()
            .with_arg(1)
            .with_kwarg("reason", "import");
        assert_eq!(ctx.args(), &[Value::I64(1)]);
        assert_eq!(ctx.kwarg("reason"), Some(&Value::from("import")));
        assert_eq!(ctx.created(), None);
        assert_eq!(ctx.kwargs().count(), 1);
    }

    #[test]
    fn signal_kind_names_round_trip() {
        for kind in SignalKind::ALL {
            assert_eq!(kind.name().parse::<SignalKind>().unwrap(), kind);
        }
        assert_eq!(
            "on_save".parse::<SignalKind>().unwrap_err().kind(),
            &ErrorKind::InvalidConfiguration
        );
    }
}
