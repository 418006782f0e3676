//! Opening a port without holding onto it must still close the underlying
//! file once a collection sweeps the unreachable port cell (§6, P8).

use std::io::Write;

use tempfile::NamedTempFile;

use rascheme::Heap;
use rascheme::port::PortHandle;

#[test]
fn unreachable_input_port_is_closed_by_gc() {
    let mut fixture = NamedTempFile::new().expect("can create temp fixture");
    writeln!(fixture, "(+ 1 2)").expect("can write temp fixture");
    let path = fixture.path().to_str().unwrap().to_string();

    let mut heap = Heap::new(256).expect("heap allocates");
    {
        let handle = PortHandle::open_input(&path).expect("file exists");
        let port = heap.new_port(handle);
        // Immediately dropped: nothing roots `port`, so it is unreachable
        // from the next collection onward.
        let _ = port;
    }

    heap.collect_garbage();

    // The port cell is gone; re-opening the same path must still succeed,
    // which would fail on some platforms if the prior handle were leaked
    // with an exclusive lock still held.
    let reopened = PortHandle::open_input(&path);
    assert!(reopened.is_ok());
}
