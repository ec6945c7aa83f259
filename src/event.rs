/// Something that reacts to events of type `E`.
pub type Listener<E> = Box<dyn FnMut(&E)>;

/// Gathers events and hands them to registered listeners.
///
/// Events are queued with [`push`][Self::push] and delivered in order by
/// [`flush`][Self::flush], so the producer can finish what it was doing before
/// any listener runs.
pub struct EventSink<E> {
    events: Vec<E>,
    listeners: Vec<Listener<E>>,
}

impl<E> Default for EventSink<E> {
    fn default() -> Self {
        EventSink {
            events: Vec::new(),
            listeners: Vec::new(),
        }
    }
}

impl<E> std::fmt::Debug for EventSink<E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventSink")
            .field("queued", &self.events.len())
            .field("listeners", &self.listeners.len())
            .finish()
    }
}

impl<E> EventSink<E> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a listener that will receive every event flushed from now on.
    pub fn subscribe(&mut self, listener: impl FnMut(&E) + 'static) {
        self.listeners.push(Box::new(listener));
    }

    pub fn push(&mut self, evt: E) {
        self.events.push(evt);
    }

    /// Number of events waiting to be flushed.
    #[inline]
    pub fn queued(&self) -> usize {
        self.events.len()
    }

    /// Deliver all queued events to every listener, in the order they were pushed.
    /// Returns the number of events delivered.
    pub fn flush(&mut self) -> usize {
        let count = self.events.len();
        for evt in self.events.drain(..) {
            for listener in &mut self.listeners {
                listener(&evt);
            }
        }
        count
    }
}
