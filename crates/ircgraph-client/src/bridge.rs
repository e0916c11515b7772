//! Wires the session, the contact model and the router onto one tick driver.
//!
//! [`Bridge`] owns every piece of session-scoped state and the registries
//! they mutate. Everything lives on the calling thread; observers follow
//! changes through the registries' notification channels.

use std::cell::{Ref, RefCell};
use std::rc::Rc;
use std::time::Duration;

use tokio::sync::{mpsc, oneshot};
use tokio::time::Instant;
use tracing::{debug, info};

use ircgraph_net::{Session, SessionError, SessionState, Subscription, Transport};
use ircgraph_shared::ConfigModel;
use ircgraph_store::{ContactEvent, ContactId, ContactRegistry, MessageEvent, MessageId, MessageRegistry};

use crate::contacts::{ContactModel, CONTACT_EVENTS};
use crate::router::{MessageRouter, MESSAGE_EVENTS};

pub struct Bridge<T: Transport> {
    session: Session<T>,
    contacts: Rc<RefCell<ContactRegistry>>,
    messages: Rc<RefCell<MessageRegistry>>,
    model: Rc<RefCell<ContactModel>>,
    router: Rc<RefCell<MessageRouter>>,
    _subscriptions: Vec<Subscription>,
}

impl<T: Transport> Bridge<T> {
    /// Fails only if the config names no server.
    pub fn new(config: Rc<dyn ConfigModel>, transport: T) -> Result<Self, SessionError> {
        let contacts = Rc::new(RefCell::new(ContactRegistry::new()));
        let messages = Rc::new(RefCell::new(MessageRegistry::new()));
        let model = Rc::new(RefCell::new(ContactModel::new(
            contacts.clone(),
            config.as_ref(),
        )));
        let router = Rc::new(RefCell::new(MessageRouter::new(
            model.clone(),
            contacts.clone(),
            messages.clone(),
        )));

        let mut session = Session::new(config, transport)?;
        // The model must see an event before the router resolves names from it.
        let subscriptions = vec![
            session.subscribe(&model, CONTACT_EVENTS),
            session.subscribe(&router, MESSAGE_EVENTS),
        ];
        info!(server = %session.endpoint().server_name(), "Bridge ready");

        Ok(Self {
            session,
            contacts,
            messages,
            model,
            router,
            _subscriptions: subscriptions,
        })
    }

    /// One step of the session. Returns the suggested delay before the next.
    pub fn tick(&mut self, delta: Duration) -> Duration {
        self.session.iterate(delta)
    }

    pub fn join(&mut self, channel: &str) -> bool {
        self.model.borrow_mut().join(&mut self.session, channel)
    }

    pub fn send_text(&mut self, contact: ContactId, text: &str, is_action: bool) -> bool {
        self.router
            .borrow_mut()
            .send_text(&mut self.session, contact, text, is_action)
    }

    pub fn mark_read(&mut self, store: ContactId, message: MessageId) -> bool {
        self.messages
            .borrow_mut()
            .mark_read(store, message, chrono::Utc::now())
    }

    pub fn state(&self) -> SessionState {
        self.session.state()
    }

    pub fn session(&self) -> &Session<T> {
        &self.session
    }

    pub fn contacts(&self) -> Ref<'_, ContactRegistry> {
        self.contacts.borrow()
    }

    pub fn messages(&self) -> Ref<'_, MessageRegistry> {
        self.messages.borrow()
    }

    pub fn model(&self) -> Ref<'_, ContactModel> {
        self.model.borrow()
    }

    pub fn subscribe_contacts(&self) -> mpsc::UnboundedReceiver<ContactEvent> {
        self.contacts.borrow_mut().subscribe()
    }

    pub fn subscribe_messages(&self) -> mpsc::UnboundedReceiver<MessageEvent> {
        self.messages.borrow_mut().subscribe()
    }

    /// Tick until `shutdown` fires or its sender is dropped, sleeping for the
    /// delay each tick suggests.
    pub async fn run_until_shutdown(&mut self, mut shutdown: oneshot::Receiver<()>) {
        let mut last = Instant::now();
        loop {
            let now = Instant::now();
            let delay = self.tick(now.duration_since(last));
            last = now;

            tokio::select! {
                biased;
                _ = &mut shutdown => {
                    info!("Shutdown requested, stopping bridge");
                    break;
                }
                _ = tokio::time::sleep(delay) => {
                    debug!(delay_ms = delay.as_millis() as u64, "Tick");
                }
            }
        }
    }
}
