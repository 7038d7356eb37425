use ring::errors::RingError;
use ring::names;
use ring::semaphore::Semaphore;
use ring::SharedRing;
use std::sync::mpsc;
use std::thread;
use std::time::Duration;

fn test_ring_name(tag: &str) -> String {
    format!("/ring_it_{}_{}", std::process::id(), tag)
}

/// Full producer/consumer stream across threads.
///
/// Tests:
/// - The counting semaphores provide flow control (no sleeps anywhere:
///   the writer blocks when the ring is full, the reader when it is empty)
/// - Strict FIFO delivery across the thread boundary
/// - Payload bytes survive the trip bitwise
#[test]
fn test_concurrent_stream_preserves_order() {
    let name = test_ring_name("stream");
    const NUM_MESSAGES: usize = 50;

    let mut owner = SharedRing::create_and_init(&name, 8, 64).unwrap();

    let consumer_name = name.clone();
    let consumer = thread::spawn(move || {
        let mut ring =
            SharedRing::open_existing(&consumer_name).expect("consumer failed to attach");

        let mut out = Vec::new();
        let mut received = Vec::with_capacity(NUM_MESSAGES);
        for _ in 0..NUM_MESSAGES {
            ring.read_message(&mut out).expect("read failed");
            received.push(String::from_utf8(out.clone()).unwrap());
        }
        received
    });

    for i in 0..NUM_MESSAGES {
        owner
            .write_message(format!("msg-{i}").as_bytes())
            .expect("write failed");
    }

    let received = consumer.join().expect("consumer thread panicked");
    for (i, message) in received.iter().enumerate() {
        assert_eq!(
            message,
            &format!("msg-{i}"),
            "messages must be delivered in write order"
        );
    }

    owner.unlink_resources();
}

/// A consumer that races ahead of the producer must still attach: the
/// retry window bridges the gap between its first attempt and the owner
/// finishing initialization.
#[test]
fn test_attach_before_create_race() {
    let name = test_ring_name("race");

    let consumer_name = name.clone();
    let consumer = thread::spawn(move || {
        let mut ring = SharedRing::open_when_ready(&consumer_name)
            .expect("consumer should win the race within its retry window");

        let mut out = Vec::new();
        ring.read_message(&mut out).expect("read failed");
        out
    });

    // the consumer is already knocking by the time the ring exists
    thread::sleep(Duration::from_millis(50));
    let mut owner = SharedRing::create_and_init(&name, 4, 64).unwrap();
    owner.write_message(b"hello").unwrap();

    let out = consumer.join().expect("consumer thread panicked");
    assert_eq!(out, b"hello");

    owner.unlink_resources();
}

/// Writing to a full ring blocks, and exactly one read unblocks it.
#[test]
fn test_blocked_writer_unblocks_after_one_read() {
    let name = test_ring_name("full");
    let mut owner = SharedRing::create_and_init(&name, 2, 8).unwrap();
    let mut reader = SharedRing::open_existing(&name).unwrap();

    owner.write_message(b"a").unwrap();
    owner.write_message(b"bb").unwrap();

    let (done_tx, done_rx) = mpsc::channel();
    let writer = thread::spawn(move || {
        owner.write_message(b"ccc").unwrap();
        done_tx.send(()).unwrap();
        owner
    });

    assert!(
        done_rx.recv_timeout(Duration::from_millis(200)).is_err(),
        "third write into a 2-slot ring must block"
    );

    let mut out = Vec::new();
    reader.read_message(&mut out).unwrap();
    assert_eq!(out, b"a");

    done_rx
        .recv_timeout(Duration::from_secs(2))
        .expect("one read must unblock the writer");

    reader.read_message(&mut out).unwrap();
    assert_eq!(out, b"bb");
    reader.read_message(&mut out).unwrap();
    assert_eq!(out, b"ccc");

    let owner = writer.join().expect("writer thread panicked");
    owner.unlink_resources();
}

/// Reading an empty ring blocks until exactly one write arrives.
#[test]
fn test_blocked_reader_unblocks_after_one_write() {
    let name = test_ring_name("empty");
    let mut owner = SharedRing::create_and_init(&name, 4, 16).unwrap();

    let reader_name = name.clone();
    let (done_tx, done_rx) = mpsc::channel();
    let reader = thread::spawn(move || {
        let mut ring = SharedRing::open_existing(&reader_name).unwrap();
        let mut out = Vec::new();
        ring.read_message(&mut out).unwrap();
        done_tx.send(()).unwrap();
        out
    });

    assert!(
        done_rx.recv_timeout(Duration::from_millis(200)).is_err(),
        "reading an empty ring must block"
    );

    owner.write_message(b"wake").unwrap();

    done_rx
        .recv_timeout(Duration::from_secs(2))
        .expect("one write must unblock the reader");
    let out = reader.join().expect("reader thread panicked");
    assert_eq!(out, b"wake");

    owner.unlink_resources();
}

/// An owner that detaches without unlinking leaves the kernel objects
/// behind: the ring stays attachable and still holds its messages.
#[test]
fn test_dropping_owner_without_unlink_keeps_ring_alive() {
    let name = test_ring_name("persist");
    {
        let mut owner = SharedRing::create_and_init(&name, 2, 16).unwrap();
        owner.write_message(b"survivor").unwrap();
    } // detach only, no unlink

    let mut ring = SharedRing::open_existing(&name).unwrap();
    let mut out = Vec::new();
    ring.read_message(&mut out).unwrap();
    assert_eq!(out, b"survivor");

    // manual namespace cleanup, the way an operator would after a crash
    let sem_names = names::semaphore_names(&name);
    Semaphore::unlink(&sem_names.free).unwrap();
    Semaphore::unlink(&sem_names.filled).unwrap();
    Semaphore::unlink(&sem_names.mutex).unwrap();
    nix::sys::mman::shm_unlink(name.as_str()).unwrap();
}

/// If the region exists but its semaphores never appear, the attach gives
/// up after its bounded window instead of hanging forever.
#[test]
fn test_attach_fails_when_semaphores_never_appear() {
    let name = test_ring_name("no_sems");
    let owner = SharedRing::create_and_init(&name, 2, 16).unwrap();

    // simulate an owner that died after mapping: the names vanish
    let sem_names = names::semaphore_names(&name);
    Semaphore::unlink(&sem_names.free).unwrap();
    Semaphore::unlink(&sem_names.filled).unwrap();
    Semaphore::unlink(&sem_names.mutex).unwrap();

    let err = SharedRing::open_existing(&name)
        .err()
        .expect("attach must fail once the semaphores are gone");
    match err {
        RingError::AttachFailed { attempts, .. } => {
            assert_eq!(attempts, 20, "the retry window is 20 attempts");
        }
        other => panic!("expected AttachFailed, got {other:?}"),
    }

    owner.unlink_resources();
}

/// A region whose first word is not the magic sentinel must be refused.
#[test]
fn test_bad_magic_is_refused() {
    use memmap2::MmapOptions;
    use nix::fcntl::OFlag;
    use nix::sys::mman::shm_open;
    use nix::sys::stat::Mode;

    let name = test_ring_name("bad_magic");
    let owner = SharedRing::create_and_init(&name, 2, 16).unwrap();

    // scribble over the magic through a second mapping
    let fd = shm_open(name.as_str(), OFlag::O_RDWR, Mode::empty()).unwrap();
    let file = std::fs::File::from(fd);
    let mut map = unsafe { MmapOptions::new().map_mut(&file).unwrap() };
    map[..4].copy_from_slice(&0xDEAD_BEEFu32.to_ne_bytes());

    let err = SharedRing::open_existing(&name)
        .err()
        .expect("attach must refuse a corrupted header");
    match err {
        RingError::BadMagic { found, .. } => assert_eq!(found, 0xDEAD_BEEF),
        other => panic!("expected BadMagic, got {other:?}"),
    }

    owner.unlink_resources();
}

/// A region shorter than a header cannot possibly be a ring.
#[test]
fn test_undersized_region_is_refused() {
    use nix::fcntl::OFlag;
    use nix::sys::mman::{shm_open, shm_unlink};
    use nix::sys::stat::Mode;

    let name = test_ring_name("tiny");
    let fd = shm_open(
        name.as_str(),
        OFlag::O_CREAT | OFlag::O_EXCL | OFlag::O_RDWR,
        Mode::from_bits_truncate(0o666),
    )
    .unwrap();
    let file = std::fs::File::from(fd);
    file.set_len(16).unwrap();

    let err = SharedRing::open_existing(&name)
        .err()
        .expect("attach must refuse a region shorter than a header");
    match err {
        RingError::RegionTooSmall { actual, required, .. } => {
            assert_eq!(actual, 16);
            assert_eq!(required, 48);
        }
        other => panic!("expected RegionTooSmall, got {other:?}"),
    }

    shm_unlink(name.as_str()).unwrap();
}
