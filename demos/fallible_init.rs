use std::sync::atomic::{AtomicUsize, Ordering};

use lazy_value::{LazyError, LazyValue, RetryLazyValue};

static ATTEMPTS: AtomicUsize = AtomicUsize::new(0);

fn mount_disk() -> Result<String, &'static str> {
   let attempt = ATTEMPTS.fetch_add(1, Ordering::SeqCst);
   println!("Mounting disk (attempt {})...", attempt);
   if attempt == 0 {
      Err("disk unavailable")
   } else {
      Ok("/mnt/data".to_string())
   }
}

fn main() {
   // The memoizing value caches the first failure forever.
   let cached = LazyValue::new(mount_disk);
   match cached.get() {
      Ok(_) => panic!("Should have failed"),
      Err(e) => println!("Caught error: {}", e),
   }
   assert_eq!(cached.get(), Err(LazyError::Failed(&"disk unavailable")));
   assert_eq!(ATTEMPTS.load(Ordering::SeqCst), 1); // Not retried

   // The retrying value runs the computation again after a failure.
   let retrying = RetryLazyValue::new(mount_disk);
   match retrying.get() {
      Ok(path) => println!("Mounted at {}", path),
      Err(e) => panic!("Should have succeeded: {}", e),
   }
   assert_eq!(ATTEMPTS.load(Ordering::SeqCst), 2);

   // Subsequent calls return the cached value
   assert_eq!(retrying.get(), Ok(&"/mnt/data".to_string()));
   assert_eq!(ATTEMPTS.load(Ordering::SeqCst), 2);
}
