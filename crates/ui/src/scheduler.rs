use std::collections::HashMap;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};

use crate::chat::events::{ChatEvent, TimerFired, TimerKey};
use crate::host::EventSink;

/// Deferred and repeating tasks owned by one view-model.
///
/// Each task lives in a [`TimerKey`] slot; scheduling into an occupied slot
/// aborts the previous task. Dropping the scheduler aborts everything, so no
/// timer outlives its view. An event a task already queued before being aborted
/// still arrives and has to be rejected by state checks.
#[derive(Debug)]
pub struct TaskScheduler {
    sink: EventSink,
    tasks: HashMap<TimerKey, JoinHandle<()>>,
}

impl TaskScheduler {
    pub fn new(sink: EventSink) -> Self {
        Self {
            sink,
            tasks: HashMap::new(),
        }
    }

    /// Fires `timer` once after `delay`.
    pub fn schedule(&mut self, delay: Duration, timer: TimerFired) {
        let key = timer.key();
        self.cancel(key);

        // Deadline is fixed now, not when the task is first polled.
        let deadline = Instant::now() + delay;
        let sink = self.sink.clone();
        let handle = tokio::spawn(async move {
            tokio::time::sleep_until(deadline).await;
            sink.send(ChatEvent::Timer(timer));
        });
        self.tasks.insert(key, handle);
    }

    /// Fires `timer` every `period`, first after one full period.
    pub fn schedule_every(&mut self, period: Duration, timer: TimerFired) {
        let key = timer.key();
        self.cancel(key);

        let start = Instant::now() + period;
        let sink = self.sink.clone();
        let handle = tokio::spawn(async move {
            let mut interval = tokio::time::interval_at(start, period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Burst);
            loop {
                interval.tick().await;
                if !sink.send(ChatEvent::Timer(timer.clone())) {
                    break;
                }
            }
        });
        self.tasks.insert(key, handle);
    }

    /// Aborts the task in `key`. Returns true when one was still running.
    pub fn cancel(&mut self, key: TimerKey) -> bool {
        match self.tasks.remove(&key) {
            Some(handle) => {
                let was_running = !handle.is_finished();
                handle.abort();
                was_running
            }
            None => false,
        }
    }

    /// Aborts every task whose key matches `predicate`.
    pub fn cancel_where(&mut self, mut predicate: impl FnMut(&TimerKey) -> bool) -> usize {
        let keys = self
            .tasks
            .keys()
            .filter(|key| predicate(key))
            .copied()
            .collect::<Vec<_>>();
        keys.into_iter().filter(|key| self.cancel(*key)).count()
    }

    pub fn cancel_all(&mut self) {
        for (_, handle) in self.tasks.drain() {
            handle.abort();
        }
    }

    /// Forgets every slot whose task already ran to completion.
    pub fn sweep_finished(&mut self) -> usize {
        let before = self.tasks.len();
        self.tasks.retain(|_, handle| !handle.is_finished());
        before - self.tasks.len()
    }
}

impl Drop for TaskScheduler {
    fn drop(&mut self) {
        self.cancel_all();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chat::events::{ReplyId, ReplyTrigger};

    fn drain(events: &mut crate::host::EventStream) -> Vec<ChatEvent> {
        let mut received = Vec::new();
        while let Ok(Some(event)) = events.try_next() {
            received.push(event);
        }
        received
    }

    #[tokio::test(start_paused = true)]
    async fn one_shot_fires_after_delay() {
        let (sink, mut events) = EventSink::channel();
        let mut scheduler = TaskScheduler::new(sink);

        scheduler.schedule(Duration::from_millis(500), TimerFired::RecordingSettle);
        tokio::time::sleep(Duration::from_millis(499)).await;
        assert!(drain(&mut events).is_empty());

        tokio::time::sleep(Duration::from_millis(2)).await;
        assert_eq!(
            drain(&mut events),
            vec![ChatEvent::Timer(TimerFired::RecordingSettle)]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn rescheduling_a_slot_supersedes_the_previous_task() {
        let (sink, mut events) = EventSink::channel();
        let mut scheduler = TaskScheduler::new(sink);

        scheduler.schedule(
            Duration::from_millis(100),
            TimerFired::PlaybackElapsed { index: 0 },
        );
        scheduler.schedule(
            Duration::from_millis(300),
            TimerFired::PlaybackElapsed { index: 1 },
        );

        tokio::time::sleep(Duration::from_millis(400)).await;
        assert_eq!(
            drain(&mut events),
            vec![ChatEvent::Timer(TimerFired::PlaybackElapsed { index: 1 })]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn repeating_tick_stops_when_cancelled() {
        let (sink, mut events) = EventSink::channel();
        let mut scheduler = TaskScheduler::new(sink);

        scheduler.schedule_every(Duration::from_secs(1), TimerFired::RecordingTick);
        tokio::time::sleep(Duration::from_millis(3_500)).await;
        assert_eq!(drain(&mut events).len(), 3);

        assert!(scheduler.cancel(TimerKey::RecordingTick));
        tokio::time::sleep(Duration::from_secs(5)).await;
        assert!(drain(&mut events).is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn sweep_forgets_only_completed_slots() {
        let (sink, mut events) = EventSink::channel();
        let mut scheduler = TaskScheduler::new(sink);

        scheduler.schedule(Duration::from_millis(100), TimerFired::RecordingSettle);
        scheduler.schedule_every(Duration::from_secs(1), TimerFired::RecordingTick);
        tokio::time::sleep(Duration::from_millis(200)).await;
        assert_eq!(drain(&mut events).len(), 1);

        assert_eq!(scheduler.sweep_finished(), 1);
        assert!(!scheduler.cancel(TimerKey::RecordingSettle));
        assert!(scheduler.cancel(TimerKey::RecordingTick));
    }

    #[tokio::test(start_paused = true)]
    async fn dropping_the_scheduler_aborts_pending_replies() {
        let (sink, mut events) = EventSink::channel();
        let mut scheduler = TaskScheduler::new(sink);

        for raw in 0..3 {
            scheduler.schedule(
                Duration::from_millis(1_500),
                TimerFired::Reply {
                    id: ReplyId(raw),
                    trigger: ReplyTrigger::Voice,
                },
            );
        }
        drop(scheduler);

        tokio::time::sleep(Duration::from_secs(2)).await;
        assert!(drain(&mut events).is_empty());
    }
}
