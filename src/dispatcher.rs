// Copyright 2019 Petar Dambovaliev. All rights reserved.
// This software may be modified and distributed under the terms
// of the BSD license. See the LICENSE file for details.

//! The trait boundary downstream adapters implement (MQTT publisher, shell
//! hook, whatever) to receive decoded panel events and connection-health
//! notifications. The core ships no concrete sink, only this seam and a
//! no-op default used by tests.

use crate::codec::PanelEvent;
use crate::model::ZoneTransition;

/// Receives every decoded unsolicited message, synchronously, on the
/// receive loop's own control flow.
///
/// Implementations must not call back into the `Session`/`LifecycleController`
/// to issue a command: the protocol allows only one command in flight, and
/// a sink is invoked from inside the frame that is currently being
/// processed.
pub trait EventSink {
    fn on_event(&mut self, event: &PanelEvent);

    /// Invoked once per receive-loop tick for every zone whose
    /// `smoothed_active` state changed as a result of [`crate::model::Zone::update`]
    /// rather than a fresh event. Default: ignored.
    fn on_zone_transition(&mut self, _zone_number: u32, _transition: ZoneTransition) {}
}

/// Connection-health notifications, delivered at most once per outage.
pub trait LifecycleHook {
    fn connection_lost(&mut self) {}
    fn connection_regained(&mut self) {}
}

/// An `EventSink`/`LifecycleHook` that does nothing; used by tests and as
/// a placeholder when no downstream adapter is wired up.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullSink;

impl EventSink for NullSink {
    fn on_event(&mut self, _event: &PanelEvent) {}
}

impl LifecycleHook for NullSink {}

/// Drives the zone-update tick and fans a single decoded event out to one
/// sink. Spec does not ask for multi-sink fan-out; an adapter wanting that
/// composes several `EventSink`s itself.
pub struct Dispatcher<'a> {
    sink: &'a mut dyn EventSink,
}

impl<'a> Dispatcher<'a> {
    pub fn new(sink: &'a mut dyn EventSink) -> Dispatcher<'a> {
        Dispatcher { sink }
    }

    pub fn dispatch(&mut self, event: &PanelEvent) {
        self.sink.on_event(event);
    }

    pub fn dispatch_zone_transition(&mut self, zone_number: u32, transition: ZoneTransition) {
        self.sink.on_zone_transition(zone_number, transition);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct Counting {
        events: usize,
        transitions: usize,
    }

    impl EventSink for Counting {
        fn on_event(&mut self, _event: &PanelEvent) {
            self.events += 1;
        }
        fn on_zone_transition(&mut self, _zone_number: u32, _transition: ZoneTransition) {
            self.transitions += 1;
        }
    }

    #[test]
    fn dispatcher_forwards_events_and_transitions() {
        let mut sink = Counting::default();
        let mut dispatcher = Dispatcher::new(&mut sink);
        dispatcher.dispatch(&PanelEvent::Debug(vec![1, 2, 3]));
        dispatcher.dispatch_zone_transition(1, ZoneTransition::Active(true));
        assert_eq!(sink.events, 1);
        assert_eq!(sink.transitions, 1);
    }

    #[test]
    fn null_sink_accepts_everything() {
        let mut sink = NullSink;
        sink.on_event(&PanelEvent::Debug(vec![]));
        sink.connection_lost();
        sink.connection_regained();
    }
}
