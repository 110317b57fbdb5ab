use std::sync::atomic::{AtomicUsize, Ordering};

use lazy_value::LazyValue;

static COUNTER: AtomicUsize = AtomicUsize::new(0);

fn load_data() -> Result<String, String> {
   // This runs only once
   COUNTER.fetch_add(1, Ordering::Relaxed);
   println!("Computing data...");
   // Simulate work
   std::thread::sleep(std::time::Duration::from_millis(50));
   Ok("Expensive data".to_string())
}

static DATA: LazyValue<String, String> = LazyValue::new(load_data);

fn main() {
   let threads: Vec<_> = (0..5)
      .map(|_| {
         std::thread::spawn(|| {
            println!("Thread access: {:?}", DATA.get());
         })
      })
      .collect();

   for t in threads {
      t.join().unwrap();
   }

   assert_eq!(DATA.try_get(), Some(Ok(&"Expensive data".to_string())));
   assert_eq!(COUNTER.load(Ordering::Relaxed), 1); // Computation ran only once
   println!("Final data: {:?}", DATA.get());
}
