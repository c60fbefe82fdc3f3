use std::{mem, ptr};

use rheap::{Heap, Status};

/// Backing memory for the demo heap. Must be aligned like the heap payloads.
#[repr(C, align(8))]
struct Region([u8; 1024]);

#[repr(C)]
struct Node {
  value: i32,
  next: *mut Node,
}

/// Prints the chain statistics with a label.
fn print_stats(
  heap: &Heap<'_>,
  label: &str,
) {
  match heap.stats() {
    Ok(stats) => println!("[{label}] {stats}"),
    Err(err) => println!("[{label}] stats unavailable: {err}"),
  }
}

fn main() {
  // Trace every split and coalesce.
  tracing_subscriber::fmt()
    .with_max_level(tracing::Level::TRACE)
    .init();

  let mut region = Region([0; 1024]);
  let heap: Heap = Heap::new();

  // --------------------------------------------------------------------
  // 1) Hand the region to the heap. A second init is only a warning.
  // --------------------------------------------------------------------
  heap.init(&mut region.0).expect("fresh heap accepts the region");
  println!("\n[1] Header size = {} bytes", <Heap>::HEADER_SIZE);
  print_stats(&heap, "after init");

  // --------------------------------------------------------------------
  // 2) Build a linked list of ten nodes, each in its own block.
  // --------------------------------------------------------------------
  let mut head: *mut Node = ptr::null_mut();
  for value in 0..10 {
    let node = heap
      .allocate(mem::size_of::<Node>())
      .expect("room for ten nodes")
      .cast::<Node>();
    unsafe { node.as_ptr().write(Node { value, next: head }) };
    head = node.as_ptr();
  }
  println!("\n[2] Built a list of ten nodes");
  print_stats(&heap, "after list");

  // --------------------------------------------------------------------
  // 3) Walk it. Values come back in reverse insertion order.
  // --------------------------------------------------------------------
  let mut iter = head;
  print!("\n[3] Values:");
  while !iter.is_null() {
    unsafe {
      print!(" {}", (*iter).value);
      iter = (*iter).next;
    }
  }
  println!();

  // --------------------------------------------------------------------
  // 4) Free every second node. The holes stay apart: their neighbours
  //    are still in use.
  // --------------------------------------------------------------------
  let mut iter = head;
  let mut survivors = Vec::new();
  let mut index = 0;
  while !iter.is_null() {
    let next = unsafe { (*iter).next };
    if index % 2 == 0 {
      heap.release(iter.cast()).expect("node came from this heap");
    } else {
      survivors.push(iter);
    }
    iter = next;
    index += 1;
  }
  println!("\n[4] Released every second node");
  print_stats(&heap, "with holes");

  // --------------------------------------------------------------------
  // 5) Mistakes are reported, not trusted.
  // --------------------------------------------------------------------
  let status = Status::from(heap.release(head.cast()));
  println!("\n[5] Releasing the head twice: status {status} ({status:?})");

  let status = Status::from(heap.allocate(4096));
  println!("[5] Oversized request: status {status}");

  // --------------------------------------------------------------------
  // 6) Free the rest. Everything coalesces back into a single block.
  // --------------------------------------------------------------------
  for node in survivors {
    heap.release(node.cast()).expect("node came from this heap");
  }
  println!("\n[6] Released the remaining nodes");
  print_stats(&heap, "end");
  println!("[6] Chain audit: {:?}", heap.check());
}
