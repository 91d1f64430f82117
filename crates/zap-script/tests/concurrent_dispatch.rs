// Stress: many producers, many objects, a multi-worker dispatcher.

use std::sync::Arc;
use std::thread;
use std::time::Duration;

use zap_script::testing::RecordingRuntime;
use zap_script::{
    DispatchConfig, Dispatcher, EventArg, EventManager, EventName, EventParams, EventQueue,
    EventTarget, ItemId, LocalId, PartScene,
};

const OBJECTS: u32 = 8;
const PRODUCERS: usize = 6;
const PER_PRODUCER: usize = 200;

fn numbered(n: i32) -> EventParams {
    EventParams::new(EventName::Changed, vec![EventArg::Integer(n)], Vec::new()).unwrap()
}

#[test]
fn one_execution_per_object_at_a_time() {
    let queue = Arc::new(EventQueue::default());
    let runtime = Arc::new(RecordingRuntime::new().with_delay(Duration::from_micros(50)));
    let dispatcher = Dispatcher::start(
        queue.clone(),
        runtime.clone(),
        DispatchConfig::default().with_workers(4).with_idle_wait_ms(1),
    )
    .unwrap();

    let producers: Vec<_> = (0..PRODUCERS)
        .map(|p| {
            let queue = queue.clone();
            thread::spawn(move || {
                for i in 0..PER_PRODUCER {
                    let object = LocalId(((p + i) as u32) % OBJECTS);
                    queue.post_event(object, numbered(i as i32)).unwrap();
                }
            })
        })
        .collect();
    for producer in producers {
        producer.join().unwrap();
    }

    let total = PRODUCERS * PER_PRODUCER;
    assert!(runtime.wait_for_executions(total, Duration::from_secs(30)));
    let counts = dispatcher.shutdown();

    assert_eq!(counts.delivered as usize, total);
    assert_eq!(runtime.max_in_flight_per_object(), 1);
    assert!(queue.is_empty());
}

#[test]
fn single_producer_order_survives_per_object() {
    let queue = Arc::new(EventQueue::default());
    let runtime = Arc::new(RecordingRuntime::new());
    let dispatcher = Dispatcher::start(
        queue.clone(),
        runtime.clone(),
        DispatchConfig::default().with_workers(4).with_idle_wait_ms(1),
    )
    .unwrap();

    for i in 0..400 {
        queue.post_event(LocalId(i % 4), numbered(i as i32)).unwrap();
    }
    assert!(runtime.wait_for_executions(400, Duration::from_secs(30)));
    dispatcher.shutdown();

    for object in 0..4 {
        let seen: Vec<i32> = runtime
            .executions_for(LocalId(object))
            .iter()
            .filter_map(|e| e.event.args()[0].as_integer())
            .collect();
        let mut sorted = seen.clone();
        sorted.sort_unstable();
        assert_eq!(seen, sorted, "object {object} saw events out of order");
        assert_eq!(seen.len(), 100);
    }
}

#[test]
fn nothing_starts_for_a_script_after_its_removal() {
    let queue = Arc::new(EventQueue::default());
    let runtime = Arc::new(RecordingRuntime::new().with_delay(Duration::from_micros(200)));
    let manager = EventManager::new(queue.clone(), Arc::new(PartScene::new()), runtime.clone());
    let dispatcher = Dispatcher::start(
        queue.clone(),
        runtime.clone(),
        DispatchConfig::default().with_workers(4).with_idle_wait_ms(1),
    )
    .unwrap();

    let object = LocalId(3);
    let item = ItemId::new_v4();
    let script = EventTarget::Script { object, item };
    for i in 0..500 {
        queue.post_script_event(object, item, numbered(i)).unwrap();
        queue.post_event(LocalId(4), numbered(i)).unwrap();
    }
    assert!(runtime.wait_for_executions(20, Duration::from_secs(10)));

    manager.on_remove_script(object, item);
    let started = || {
        runtime
            .executions()
            .iter()
            .filter(|e| e.target == script)
            .count()
    };
    let at_removal = started();

    // Every event of the neighbouring object still runs.
    assert!(runtime.wait_for_executions(at_removal + 500, Duration::from_secs(30)));
    thread::sleep(Duration::from_millis(20));
    dispatcher.shutdown();

    assert_eq!(started(), at_removal);
    assert_eq!(runtime.stopped(), vec![(object, item)]);
    assert!(queue.is_empty());
}
