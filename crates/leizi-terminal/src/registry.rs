use leizi_types::{ConnectionConfig, Session, SessionId, SessionKind};

/// Per-session resources that must be released when the session closes
pub trait Dispose {
    /// Release the resources. Called exactly once per session.
    fn dispose(&mut self);
}

/// Acquires per-session resources when a session is created
pub trait Mount {
    type Handle: Dispose;

    fn mount(&mut self, session: &Session) -> Self::Handle;
}

impl<F, H> Mount for F
where
    F: FnMut(&Session) -> H,
    H: Dispose,
{
    type Handle = H;

    fn mount(&mut self, session: &Session) -> H {
        self(session)
    }
}

struct Entry<H> {
    session: Session,
    handle: H,
}

/// Open sessions in tab order plus the active-session pointer
///
/// The registry is a plain owned collection: every mutation goes through
/// `&mut self`, and the active id, when set, always names an open session.
pub struct SessionRegistry<M: Mount> {
    mounter: M,
    entries: Vec<Entry<M::Handle>>,
    active: Option<SessionId>,
}

impl<M: Mount> std::fmt::Debug for SessionRegistry<M> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionRegistry")
            .field("sessions", &self.entries.iter().map(|e| &e.session.title).collect::<Vec<_>>())
            .field("active", &self.active)
            .finish()
    }
}

impl<M: Mount> SessionRegistry<M> {
    pub fn new(mounter: M) -> Self {
        Self {
            mounter,
            entries: Vec::new(),
            active: None,
        }
    }

    /// Create a session, mount its resources, append it and make it active
    pub fn create_session(&mut self, kind: SessionKind, config: ConnectionConfig) -> &Session {
        let session = Session::new(kind, config);
        let handle = self.mounter.mount(&session);
        log::info!("Opened session {} ({})", session.id, session.title);

        self.active = Some(session.id);
        self.entries.push(Entry { session, handle });
        let last = self.entries.len() - 1;
        &self.entries[last].session
    }

    /// Close a session and dispose its resources.
    ///
    /// Returns the disposed handle so the caller can wait for teardown, or
    /// `None` if no open session has this id. If the active session closes,
    /// the first remaining session becomes active.
    pub fn close_session(&mut self, id: &SessionId) -> Option<M::Handle> {
        let index = self.position(id)?;
        let Entry { session, mut handle } = self.entries.remove(index);
        handle.dispose();
        log::info!("Closed session {} ({})", session.id, session.title);

        if self.active == Some(session.id) {
            self.active = self.entries.first().map(|e| e.session.id);
        }
        Some(handle)
    }

    /// Make an open session active. Returns false if the id is unknown.
    pub fn set_active(&mut self, id: &SessionId) -> bool {
        if self.position(id).is_some() {
            self.active = Some(*id);
            true
        } else {
            false
        }
    }

    /// Activate the next tab, wrapping around
    pub fn activate_next(&mut self) -> Option<&Session> {
        self.step_active(1)
    }

    /// Activate the previous tab, wrapping around
    pub fn activate_previous(&mut self) -> Option<&Session> {
        self.step_active(self.entries.len().saturating_sub(1))
    }

    fn step_active(&mut self, offset: usize) -> Option<&Session> {
        if self.entries.is_empty() {
            return None;
        }
        let current = self.active_index().unwrap_or(0);
        let next = (current + offset) % self.entries.len();
        self.active = Some(self.entries[next].session.id);
        Some(&self.entries[next].session)
    }

    /// Close every session, in tab order
    pub fn close_all(&mut self) -> Vec<M::Handle> {
        let ids: Vec<SessionId> = self.entries.iter().map(|e| e.session.id).collect();
        ids.iter().filter_map(|id| self.close_session(id)).collect()
    }

    pub fn active_id(&self) -> Option<SessionId> {
        self.active
    }

    pub fn active(&self) -> Option<&Session> {
        self.active_index().map(|i| &self.entries[i].session)
    }

    pub fn active_handle(&self) -> Option<&M::Handle> {
        self.active_index().map(|i| &self.entries[i].handle)
    }

    pub fn active_index(&self) -> Option<usize> {
        self.active.and_then(|id| self.position(&id))
    }

    pub fn get(&self, id: &SessionId) -> Option<&Session> {
        self.position(id).map(|i| &self.entries[i].session)
    }

    pub fn handle(&self, id: &SessionId) -> Option<&M::Handle> {
        self.position(id).map(|i| &self.entries[i].handle)
    }

    pub fn contains(&self, id: &SessionId) -> bool {
        self.position(id).is_some()
    }

    /// Open sessions in tab order
    pub fn sessions(&self) -> impl Iterator<Item = &Session> {
        self.entries.iter().map(|e| &e.session)
    }

    /// Open sessions with their handles, in tab order
    pub fn iter(&self) -> impl Iterator<Item = (&Session, &M::Handle)> {
        self.entries.iter().map(|e| (&e.session, &e.handle))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn position(&self, id: &SessionId) -> Option<usize> {
        self.entries.iter().position(|e| &e.session.id == id)
    }
}

impl<M: Mount> Drop for SessionRegistry<M> {
    fn drop(&mut self) {
        for entry in self.entries.iter_mut() {
            entry.handle.dispose();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use proptest::prelude::*;
    use std::cell::RefCell;
    use std::rc::Rc;

    /// Counts disposals per session
    struct Probe {
        id: SessionId,
        log: Rc<RefCell<Vec<SessionId>>>,
    }

    impl Dispose for Probe {
        fn dispose(&mut self) {
            self.log.borrow_mut().push(self.id);
        }
    }

    fn registry() -> (SessionRegistry<impl Mount<Handle = Probe>>, Rc<RefCell<Vec<SessionId>>>) {
        let log = Rc::new(RefCell::new(Vec::new()));
        let mount_log = Rc::clone(&log);
        let registry = SessionRegistry::new(move |session: &Session| Probe {
            id: session.id,
            log: Rc::clone(&mount_log),
        });
        (registry, log)
    }

    fn ssh(host: &str) -> ConnectionConfig {
        ConnectionConfig::network(host, 22)
    }

    #[test]
    fn test_create_appends_and_activates() {
        let (mut registry, _) = registry();
        let a = registry.create_session(SessionKind::Ssh, ssh("a")).id;
        let b = registry.create_session(SessionKind::Telnet, ssh("b")).id;

        assert_ne!(a, b);
        assert_eq!(registry.len(), 2);
        assert_eq!(registry.active_id(), Some(b));
        let titles: Vec<_> = registry.sessions().map(|s| s.title.clone()).collect();
        assert_eq!(titles, vec!["ssh://a", "telnet://b"]);
    }

    #[test]
    fn test_closing_active_activates_first_remaining() {
        let (mut registry, _) = registry();
        let a = registry.create_session(SessionKind::Ssh, ssh("a")).id;
        let b = registry.create_session(SessionKind::Ssh, ssh("b")).id;
        let c = registry.create_session(SessionKind::Ssh, ssh("c")).id;

        assert!(registry.close_session(&c).is_some());
        assert_eq!(registry.active_id(), Some(a));

        registry.set_active(&b);
        registry.close_session(&a);
        assert_eq!(registry.active_id(), Some(b));

        registry.close_session(&b);
        assert_eq!(registry.active_id(), None);
        assert!(registry.is_empty());
    }

    #[test]
    fn test_closing_inactive_keeps_active() {
        let (mut registry, _) = registry();
        let a = registry.create_session(SessionKind::Ssh, ssh("a")).id;
        let b = registry.create_session(SessionKind::Ssh, ssh("b")).id;
        registry.close_session(&a);
        assert_eq!(registry.active_id(), Some(b));
    }

    #[test]
    fn test_close_disposes_exactly_once() {
        let (mut registry, log) = registry();
        let a = registry.create_session(SessionKind::Ssh, ssh("a")).id;

        assert!(registry.close_session(&a).is_some());
        assert!(registry.close_session(&a).is_none());
        assert!(registry.close_session(&SessionId::new_v4()).is_none());
        assert_eq!(*log.borrow(), vec![a]);
    }

    #[test]
    fn test_set_active_unknown_is_noop() {
        let (mut registry, _) = registry();
        let a = registry.create_session(SessionKind::Ssh, ssh("a")).id;
        assert!(!registry.set_active(&SessionId::new_v4()));
        assert_eq!(registry.active_id(), Some(a));
    }

    #[test]
    fn test_tab_cycling_wraps() {
        let (mut registry, _) = registry();
        let a = registry.create_session(SessionKind::Ssh, ssh("a")).id;
        let b = registry.create_session(SessionKind::Ssh, ssh("b")).id;
        let c = registry.create_session(SessionKind::Ssh, ssh("c")).id;

        assert_eq!(registry.activate_next().map(|s| s.id), Some(a));
        assert_eq!(registry.activate_next().map(|s| s.id), Some(b));
        assert_eq!(registry.activate_previous().map(|s| s.id), Some(a));
        assert_eq!(registry.activate_previous().map(|s| s.id), Some(c));
    }

    #[test]
    fn test_close_all_and_drop_dispose_everything() {
        let (mut registry, log) = registry();
        registry.create_session(SessionKind::Ssh, ssh("a"));
        registry.create_session(SessionKind::Ssh, ssh("b"));
        assert_eq!(registry.close_all().len(), 2);
        assert_eq!(registry.active_id(), None);

        registry.create_session(SessionKind::Serial, ConnectionConfig::serial("/dev/ttyS0"));
        drop(registry);
        assert_eq!(log.borrow().len(), 3);
    }

    #[derive(Debug, Clone)]
    enum Op {
        Create,
        Close(usize),
        CloseUnknown,
        Activate(usize),
        Next,
        Previous,
    }

    fn op() -> impl Strategy<Value = Op> {
        prop_oneof![
            3 => Just(Op::Create),
            2 => (0usize..8).prop_map(Op::Close),
            1 => Just(Op::CloseUnknown),
            2 => (0usize..8).prop_map(Op::Activate),
            1 => Just(Op::Next),
            1 => Just(Op::Previous),
        ]
    }

    proptest! {
        #[test]
        fn prop_active_is_always_open(ops in proptest::collection::vec(op(), 0..64)) {
            let (mut registry, log) = registry();
            let mut created = 0usize;
            let mut closed = 0usize;

            for op in ops {
                match op {
                    Op::Create => {
                        registry.create_session(SessionKind::Ssh, ssh("h"));
                        created += 1;
                    }
                    Op::Close(i) => {
                        let id = registry.sessions().nth(i).map(|s| s.id);
                        if let Some(id) = id {
                            prop_assert!(registry.close_session(&id).is_some());
                            closed += 1;
                        }
                    }
                    Op::CloseUnknown => {
                        prop_assert!(registry.close_session(&SessionId::new_v4()).is_none());
                    }
                    Op::Activate(i) => {
                        let id = registry.sessions().nth(i).map(|s| s.id);
                        if let Some(id) = id {
                            prop_assert!(registry.set_active(&id));
                        }
                    }
                    Op::Next => { registry.activate_next(); }
                    Op::Previous => { registry.activate_previous(); }
                }

                match registry.active_id() {
                    Some(id) => prop_assert!(registry.contains(&id)),
                    None => prop_assert!(registry.is_empty()),
                }
                prop_assert_eq!(registry.len(), created - closed);
                prop_assert_eq!(log.borrow().len(), closed);
            }
        }
    }
}
