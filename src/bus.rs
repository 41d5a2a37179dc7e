use crate::models::{TodoItem, TodoList};
use crate::todo::ItemView;
use crate::view_query::{ListSelection, ViewOptions};

/// Something UI code may want to react to
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    ListsChanged(Vec<TodoList>),
    ItemsChanged(Vec<ItemView>),
    ActiveListChanged(ListSelection),
    ItemUpdated(TodoItem),
    ViewOptionsChanged(ViewOptions),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Topic {
    ListsChanged,
    ItemsChanged,
    ActiveListChanged,
    ItemUpdated,
    ViewOptionsChanged,
}

impl Event {
    pub fn topic(&self) -> Topic {
        match self {
            Event::ListsChanged(_) => Topic::ListsChanged,
            Event::ItemsChanged(_) => Topic::ItemsChanged,
            Event::ActiveListChanged(_) => Topic::ActiveListChanged,
            Event::ItemUpdated(_) => Topic::ItemUpdated,
            Event::ViewOptionsChanged(_) => Topic::ViewOptionsChanged,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

type Handler = Box<dyn FnMut(&Event)>;

/// Synchronous publish/subscribe. Handlers run on the publishing thread,
/// in the order they subscribed, before `publish` returns.
#[derive(Default)]
pub struct EventBus {
    next_id: u64,
    subscribers: Vec<(SubscriptionId, Topic, Handler)>,
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe(&mut self, topic: Topic, handler: impl FnMut(&Event) + 'static) -> SubscriptionId {
        self.next_id += 1;
        let id = SubscriptionId(self.next_id);
        self.subscribers.push((id, topic, Box::new(handler)));
        id
    }

    /// Returns whether the subscription existed
    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        let before = self.subscribers.len();
        self.subscribers.retain(|(sub, _, _)| *sub != id);
        self.subscribers.len() != before
    }

    pub fn publish(&mut self, event: &Event) {
        let topic = event.topic();
        tracing::trace!(?topic, "publishing event");
        for (_, _, handler) in self
            .subscribers
            .iter_mut()
            .filter(|(_, subscribed, _)| *subscribed == topic)
        {
            handler(event);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::rc::Rc;

    #[test]
    fn delivers_in_subscription_order_to_matching_topic_only() {
        let seen = Rc::new(RefCell::new(Vec::new()));
        let mut bus = EventBus::new();

        let log = Rc::clone(&seen);
        bus.subscribe(Topic::ActiveListChanged, move |_| log.borrow_mut().push("first"));
        let log = Rc::clone(&seen);
        bus.subscribe(Topic::ListsChanged, move |_| log.borrow_mut().push("lists"));
        let log = Rc::clone(&seen);
        bus.subscribe(Topic::ActiveListChanged, move |_| log.borrow_mut().push("second"));

        bus.publish(&Event::ActiveListChanged(ListSelection::All));
        assert_eq!(*seen.borrow(), vec!["first", "second"]);
    }

    #[test]
    fn unsubscribe_removes_only_that_handler() {
        let count = Rc::new(RefCell::new(0));
        let mut bus = EventBus::new();

        let c = Rc::clone(&count);
        let gone = bus.subscribe(Topic::ItemsChanged, move |_| *c.borrow_mut() += 10);
        let c = Rc::clone(&count);
        bus.subscribe(Topic::ItemsChanged, move |_| *c.borrow_mut() += 1);

        assert!(bus.unsubscribe(gone));
        assert!(!bus.unsubscribe(gone));
        bus.publish(&Event::ItemsChanged(Vec::new()));
        assert_eq!(*count.borrow(), 1);
    }

    #[test]
    fn publishing_without_subscribers_is_fine() {
        let mut bus = EventBus::new();
        bus.publish(&Event::ListsChanged(Vec::new()));
    }
}
