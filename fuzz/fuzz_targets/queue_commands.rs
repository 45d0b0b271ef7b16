#![no_main]

use libfuzzer_sys::fuzz_target;
use streamly::model::{QueueEntry, RepeatMode};
use streamly::queue::QueueStore;

fuzz_target!(|data: &[u8]| {
    let mut queue = QueueStore::new(RepeatMode::Off);
    let mut appended = 0usize;
    let mut removed = 0usize;

    for pair in data.chunks(2) {
        let op = pair[0];
        let arg = usize::from(pair.get(1).copied().unwrap_or_default());
        match op % 9 {
            0 => {
                if queue.append(QueueEntry::new(format!("v{arg}"), "", 0)) {
                    appended += 1;
                }
            }
            1 => {
                if queue.remove_at(arg % (queue.len() + 1)).is_some() {
                    removed += 1;
                }
            }
            2 => {
                let len = queue.len().max(1);
                let _ = queue.move_to(arg % len, (arg / 7) % len);
            }
            3 => {
                let _ = queue.advance();
            }
            4 => {
                let _ = queue.retreat();
            }
            5 => {
                let _ = queue.select(arg % (queue.len() + 1));
            }
            6 => queue.set_repeat(match arg % 3 {
                0 => RepeatMode::Off,
                1 => RepeatMode::One,
                _ => RepeatMode::All,
            }),
            7 => {
                if queue.insert_next(QueueEntry::new(format!("n{arg}"), "", 0)) {
                    appended += 1;
                }
            }
            _ => {
                let _ = queue.resolve_metadata(&format!("v{arg}"), "t", 1);
            }
        }

        assert_eq!(queue.len(), appended - removed);
        let position = queue.position();
        assert!(position >= -1 && position <= queue.len() as isize);
    }
});
